//! `markup check` — parse templates without rendering them.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;
use colored::Colorize;

use markup_core::Template;

/// Arguments for `markup check`.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Template files to check.
    #[arg(required = true)]
    pub templates: Vec<PathBuf>,
}

impl CheckArgs {
    pub fn run(self) -> Result<()> {
        let mut failed = 0usize;
        for path in &self.templates {
            let outcome = fs::read_to_string(path)
                .map_err(|err| err.to_string())
                .and_then(|source| Template::parse(&source).map_err(|err| err.to_string()));
            match outcome {
                Ok(_) => println!("{} {}", "ok".green(), path.display()),
                Err(reason) => {
                    failed += 1;
                    println!("{} {}: {reason}", "error".red().bold(), path.display());
                }
            }
        }

        if failed > 0 {
            bail!("{failed} of {} templates failed", self.templates.len());
        }
        Ok(())
    }
}
