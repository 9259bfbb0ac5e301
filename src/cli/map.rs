//! CLI entry-point for the full mapping pipeline.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use tracing::{info, instrument};

use crate::{
    config::{MatchConfig, Settings},
    hierarchy::HierarchyCatalog,
    matching::{self, PipelineInputs},
    model::load,
    output,
    similarity::FuzzyParams,
};

/// Args for the `map` sub-command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    /// Ontology entity table (csv or tsv).
    #[arg(long)]
    pub ontology: std::path::PathBuf,
    /// Clinical concept table (csv or tsv).
    #[arg(long)]
    pub clinical: std::path::PathBuf,
    /// Hierarchy adjacency table with child_id,parent_id columns.
    #[arg(long)]
    pub hierarchy: std::path::PathBuf,
    /// Filter vocabularies to map against (one pipeline pair each).
    #[arg(long, value_delimiter = ',')]
    pub vocabularies: Vec<String>,
    /// Restrict hierarchy traversal to ids containing this substring.
    #[arg(long)]
    pub namespace: Option<String>,
    /// Override fuzzy candidate count per entity.
    #[arg(long)]
    pub top_n: Option<usize>,
    /// Override fuzzy percentile cut-off.
    #[arg(long)]
    pub percentile: Option<f64>,
}

#[instrument(skip(settings))]
pub async fn run(args: Args, settings: Settings) -> Result<()> {
    let config = MatchConfig::load(&settings)?;

    let ontology = load::read_ontology_table(&args.ontology, &config)?;
    let clinical = load::read_clinical_table(&args.clinical, &config)?;
    let relation = load::read_adjacency_table(&args.hierarchy)?;

    let catalog = HierarchyCatalog::build(
        ontology.classes.keys().map(String::as_str),
        &relation,
        args.namespace.as_deref(),
    )
    .context("building hierarchy catalog")?;
    info!(
        ancestors = catalog.ancestors.len(),
        children = catalog.children.len(),
        "built hierarchy catalog"
    );

    let params = FuzzyParams {
        top_n: args.top_n.unwrap_or(settings.fuzzy_top_n),
        percentile: args.percentile.unwrap_or(settings.fuzzy_percentile),
    };
    let inputs = Arc::new(PipelineInputs {
        ontology,
        clinical,
        catalog,
        config,
        params,
    });

    let outcomes = matching::run_pairs(inputs.clone(), args.vocabularies).await?;

    let run_dir = output::create_run_directory(&settings)?;
    for outcome in &outcomes {
        info!(
            vocabulary = %outcome.vocabulary,
            concept = outcome.stats.concept_matches,
            ancestor = outcome.stats.ancestor_matches,
            child = outcome.stats.child_matches,
            fuzzy = outcome.stats.fuzzy_matches,
            unmatched = outcome.stats.unmatched,
            "pair finished"
        );
        output::write_outcome(&run_dir, outcome, &inputs.clinical)?;
    }
    Ok(())
}
