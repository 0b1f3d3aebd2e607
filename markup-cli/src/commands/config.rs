//! Optional YAML configuration.
//!
//! # Layout
//!
//! ```text
//! ~/.markup/
//!   config.yaml     compact: true
//!                   includes:
//!                     header: partials/header.mu   (relative to config.yaml)
//! ```
//!
//! `load_at(home)` takes an explicit home; `load()` derives it from
//! `dirs::home_dir()`. Tests always use the `_at` form.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Drop whitespace between markup tags in rendered output.
    pub compact: bool,
    /// Include name → template file.
    pub includes: BTreeMap<String, PathBuf>,
}

/// `<home>/.markup/config.yaml` — pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    home.join(".markup").join("config.yaml")
}

/// Config under `home`, or the defaults when the file does not exist.
pub fn load_at(home: &Path) -> Result<Config> {
    let path = config_path_at(home);
    if !path.exists() {
        return Ok(Config::default());
    }
    load_file(&path)
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<Config> {
    let home = dirs::home_dir().context("could not determine home directory")?;
    load_at(&home)
}

/// Parse a config file. Relative include paths resolve against its directory.
pub fn load_file(path: &Path) -> Result<Config> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let mut config: Config = serde_yaml::from_str(&text)
        .with_context(|| format!("invalid config {}", path.display()))?;

    let base = path.parent().unwrap_or(Path::new("."));
    for include in config.includes.values_mut() {
        if include.is_relative() {
            *include = base.join(&*include);
        }
    }
    tracing::debug!(path = %path.display(), includes = config.includes.len(), "loaded config");
    Ok(config)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let home = TempDir::new().expect("home");
        assert_eq!(load_at(home.path()).expect("load"), Config::default());
    }

    #[test]
    fn relative_includes_resolve_against_config_dir() {
        let home = TempDir::new().expect("home");
        let path = config_path_at(home.path());
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(&path, "compact: true\nincludes:\n  header: parts/header.mu\n  abs: /tmp/abs.mu\n")
            .expect("write");

        let config = load_at(home.path()).expect("load");
        assert!(config.compact);
        assert_eq!(
            config.includes["header"],
            home.path().join(".markup").join("parts/header.mu")
        );
        assert_eq!(config.includes["abs"], PathBuf::from("/tmp/abs.mu"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = TempDir::new().expect("dir");
        let path = dir.path().join("config.yaml");
        fs::write(&path, "compactt: true\n").expect("write");
        assert!(load_file(&path).is_err());
    }
}
