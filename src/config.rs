//! Runtime configuration utilities for onto-crosswalk.

use std::{
    collections::{HashMap, HashSet},
    env,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::Deserialize;

use crate::{model::aliases, similarity::preprocess};

/// Application configuration resolved from `.env` and defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Root folder for normalized input tables.
    pub data_dir: PathBuf,
    /// Root folder for mapping outputs.
    pub outputs_dir: PathBuf,
    /// Optional newline-delimited stop-word override file.
    pub stopwords_file: Option<PathBuf>,
    /// Optional two-column alias,primary vocabulary normalization file.
    pub vocabulary_alias_file: Option<PathBuf>,
    /// Number of fuzzy candidates retained per entity before filtering.
    pub fuzzy_top_n: usize,
    /// Percentile cut-off applied to surviving fuzzy candidates.
    pub fuzzy_percentile: f64,
}

impl Settings {
    /// Load configuration from environment with reasonable defaults.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let data_dir = env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));
        let outputs_dir = env::var("OUTPUTS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./outputs"));
        let stopwords_file = env::var("STOPWORDS_FILE").ok().map(PathBuf::from);
        let vocabulary_alias_file = env::var("VOCAB_ALIAS_FILE").ok().map(PathBuf::from);
        let fuzzy_top_n = env::var("FUZZY_TOP_N")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);
        let fuzzy_percentile = env::var("FUZZY_PERCENTILE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(75.0);

        std::fs::create_dir_all(&data_dir).context("creating data dir")?;
        std::fs::create_dir_all(&outputs_dir).context("creating outputs dir")?;

        Ok(Self {
            data_dir,
            outputs_dir,
            stopwords_file,
            vocabulary_alias_file,
            fuzzy_top_n,
            fuzzy_percentile,
        })
    }

    /// Convenience helper for derived path segments.
    pub fn join_data<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        self.data_dir.join(path)
    }

    /// Convenience helper for derived output path segments.
    pub fn join_output<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        self.outputs_dir.join(path)
    }
}

/// Lookup tables handed to normalization and text preprocessing.
#[derive(Debug, Clone, Default)]
pub struct MatchConfig {
    /// Tokens removed during similarity preprocessing.
    pub stopwords: HashSet<String>,
    /// Secondary vocabulary tag to primary tag (e.g. SNOMEDCT_US -> SNOMED).
    pub vocabulary_aliases: HashMap<String, String>,
}

impl MatchConfig {
    /// Built-in stop words, no vocabulary aliases.
    pub fn with_defaults() -> Self {
        Self {
            stopwords: preprocess::default_stopwords(),
            vocabulary_aliases: HashMap::new(),
        }
    }

    /// Resolve the config from settings, falling back to defaults.
    pub fn load(settings: &Settings) -> anyhow::Result<Self> {
        let stopwords = match &settings.stopwords_file {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading stop words from {}", path.display()))?;
                raw.lines()
                    .map(|l| l.trim().to_lowercase())
                    .filter(|l| !l.is_empty())
                    .collect()
            }
            None => preprocess::default_stopwords(),
        };
        let vocabulary_aliases = match &settings.vocabulary_alias_file {
            Some(path) => aliases::load_alias_map(path)?,
            None => HashMap::new(),
        };
        Ok(Self {
            stopwords,
            vocabulary_aliases,
        })
    }
}
