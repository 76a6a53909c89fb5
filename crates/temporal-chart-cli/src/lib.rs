//! temporal-chart CLI library

pub mod commands;
pub mod error;

pub use error::{Error, Result};

use std::io::Write;

use clap::{Parser, Subcommand};

/// Render the Temporal chart without a cluster
#[derive(Parser, Debug)]
#[command(name = "temporal-chart")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render chart templates to Kubernetes manifests
    Template(commands::template::TemplateArgs),
    /// Print the merged chart values
    Values(commands::values::ValuesArgs),
}

impl Cli {
    /// Run the CLI command, writing its output to `out`
    pub fn run(self, out: &mut impl Write) -> Result<()> {
        match self.command {
            Commands::Template(args) => commands::template::run(args, out),
            Commands::Values(args) => commands::values::run(args, out),
        }
    }
}
