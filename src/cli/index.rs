//! CLI entry-point for inspecting one entity's hierarchy index.

use anyhow::{bail, Result};
use clap::{Args as ClapArgs, ValueEnum};
use tracing::instrument;

use crate::{
    config::Settings,
    hierarchy::{self, Direction},
    model::load,
};

/// Traversal direction flag.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DirectionArg {
    Ancestors,
    Children,
}

impl From<DirectionArg> for Direction {
    fn from(value: DirectionArg) -> Self {
        match value {
            DirectionArg::Ancestors => Direction::Ancestors,
            DirectionArg::Children => Direction::Children,
        }
    }
}

/// Args for the `index` sub-command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    /// Hierarchy adjacency table with child_id,parent_id columns.
    #[arg(long)]
    pub hierarchy: std::path::PathBuf,
    /// Entity id to index from.
    #[arg(long)]
    pub entity: String,
    /// Traversal direction.
    #[arg(long, value_enum, default_value = "ancestors")]
    pub direction: DirectionArg,
    /// Restrict traversal to ids containing this substring.
    #[arg(long)]
    pub namespace: Option<String>,
}

#[instrument(skip(_settings))]
pub async fn run(args: Args, _settings: Settings) -> Result<()> {
    let relation = load::read_adjacency_table(&args.hierarchy)?;
    let index = hierarchy::build_index(
        &args.entity,
        &relation,
        args.direction.into(),
        args.namespace.as_deref(),
    )?;
    let Some(index) = index else {
        bail!("entity {} has no direct relations to index", args.entity);
    };
    for (level, ids) in &index {
        let joined = ids.iter().cloned().collect::<Vec<_>>().join(", ");
        println!("level {level}: {joined}");
    }
    Ok(())
}
