//! `markup pipes` — the built-in pipe catalog.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use markup_renderer::{catalog, Family, PipeInfo};

/// Arguments for `markup pipes`.
#[derive(Args, Debug)]
pub struct PipesArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct PipeRow {
    #[tabled(rename = "pipe")]
    name: &'static str,
    #[tabled(rename = "family")]
    family: String,
    #[tabled(rename = "usage")]
    usage: &'static str,
    #[tabled(rename = "summary")]
    summary: &'static str,
}

impl From<&PipeInfo> for PipeRow {
    fn from(info: &PipeInfo) -> Self {
        let family = match info.family {
            Family::Predicate => "predicate".cyan().to_string(),
            Family::Transform => "transform".to_string(),
        };
        PipeRow {
            name: info.name,
            family,
            usage: info.usage,
            summary: info.summary,
        }
    }
}

impl PipesArgs {
    pub fn run(self) -> Result<()> {
        let pipes: Vec<&PipeInfo> = catalog().collect();
        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&pipes).context("failed to serialize pipe catalog")?
            );
            return Ok(());
        }

        println!("Markup v{} | {} built-in pipes", env!("CARGO_PKG_VERSION"), pipes.len());
        let mut table = Table::new(pipes.into_iter().map(PipeRow::from));
        table.with(Style::rounded());
        println!("{table}");
        Ok(())
    }
}
