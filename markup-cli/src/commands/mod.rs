//! One module per `markup` subcommand, plus the shared config loader.

pub mod check;
pub mod config;
pub mod pipes;
pub mod render;
