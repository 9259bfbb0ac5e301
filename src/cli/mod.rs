//! Command-line interface wiring for onto-crosswalk.

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::Settings;

pub mod index;
pub mod map;

/// Top-level CLI definition.
#[derive(Debug, Parser)]
#[command(author, version, about = "Ontology to clinical terminology crosswalk engine", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Parse CLI arguments from the environment.
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// Dispatch the selected sub-command.
    pub async fn dispatch(self, settings: Settings) -> Result<()> {
        match self.command {
            Commands::Map(args) => map::run(args, settings).await,
            Commands::Index(args) => index::run(args, settings).await,
        }
    }
}

/// Supported sub-commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the full concept matching pipeline and write mapping tables.
    Map(map::Args),
    /// Build and print the hierarchy index for one entity.
    Index(index::Args),
}
