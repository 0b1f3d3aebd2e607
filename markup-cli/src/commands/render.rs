//! `markup render` — evaluate one template against a context file.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use markup_core::{Template, Value};
use markup_renderer::{Options, Registry, Renderer};

use crate::commands::config::{self, Config};

/// Arguments for `markup render`.
#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Template file, or `-` to read standard input.
    pub template: PathBuf,

    /// Context data: YAML for `.yaml`/`.yml`, JSON otherwise.
    #[arg(short, long, value_name = "FILE")]
    pub context: Option<PathBuf>,

    /// Register an include; repeatable. Overrides config includes.
    #[arg(short, long = "include", value_name = "NAME=FILE", value_parser = parse_include)]
    pub includes: Vec<(String, PathBuf)>,

    /// Drop whitespace between markup tags.
    #[arg(long)]
    pub compact: bool,

    /// Write to FILE instead of standard output.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

fn parse_include(raw: &str) -> std::result::Result<(String, PathBuf), String> {
    match raw.split_once('=') {
        Some((name, path)) if !name.is_empty() && !path.is_empty() => {
            Ok((name.to_string(), PathBuf::from(path)))
        }
        _ => Err(format!("expected NAME=FILE, got '{raw}'")),
    }
}

impl RenderArgs {
    pub fn run(self, config_path: Option<&Path>) -> Result<()> {
        let config = match config_path {
            Some(path) => config::load_file(path)?,
            None => config::load()?,
        };

        let source = read_template(&self.template)?;
        let template = Template::parse(&source)
            .with_context(|| format!("failed to parse {}", self.template.display()))?;
        let context = match &self.context {
            Some(path) => load_context(path)?,
            None => Value::default(),
        };
        let options = build_options(&config, &self.includes, self.compact)?;

        let registry = Registry::new();
        let rendered = Renderer::with_options(&registry, &options).render(&template, &context);
        tracing::debug!(template = %self.template.display(), bytes = rendered.len(), "rendered");

        match &self.output {
            Some(path) => fs::write(path, &rendered)
                .with_context(|| format!("failed to write {}", path.display()))?,
            None => io::stdout()
                .write_all(rendered.as_bytes())
                .context("failed to write to stdout")?,
        }
        Ok(())
    }
}

fn read_template(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut source = String::new();
        io::stdin()
            .read_to_string(&mut source)
            .context("failed to read template from stdin")?;
        return Ok(source);
    }
    fs::read_to_string(path).with_context(|| format!("failed to read template {}", path.display()))
}

/// Parse a context file, choosing the format by extension.
pub fn load_context(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read context {}", path.display()))?;
    let is_yaml = matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml" | "yml")
    );
    if is_yaml {
        serde_yaml::from_str(&text).with_context(|| format!("invalid YAML in {}", path.display()))
    } else {
        serde_json::from_str(&text).with_context(|| format!("invalid JSON in {}", path.display()))
    }
}

fn build_options(config: &Config, cli_includes: &[(String, PathBuf)], compact: bool) -> Result<Options> {
    let mut options = Options::new().compact(compact || config.compact);
    let configured = config.includes.iter().map(|(name, path)| (name.as_str(), path.as_path()));
    let given = cli_includes.iter().map(|(name, path)| (name.as_str(), path.as_path()));

    for (name, path) in configured.chain(given) {
        let source = fs::read_to_string(path)
            .with_context(|| format!("failed to read include '{name}' from {}", path.display()))?;
        options = options
            .include(name, &source)
            .with_context(|| format!("invalid include '{name}'"))?;
    }
    Ok(options)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
