//! Source vocabulary alias normalization.
//!
//! Clinical terminologies name the same source many ways (e.g.
//! `SNOMEDCT_US`, `SNOMEDCT`, `SNOMED`). The alias map collapses secondary
//! tags onto one primary tag before any join or filter compares them.

use std::{collections::HashMap, path::Path};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::entity::normalize_code;

#[derive(Debug, Deserialize)]
struct AliasRow {
    alias: String,
    primary: String,
}

/// Read a two-column `alias,primary` CSV into a normalized lookup map.
pub fn load_alias_map(path: &Path) -> Result<HashMap<String, String>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("opening vocabulary alias file {}", path.display()))?;
    let mut map = HashMap::new();
    for row in reader.deserialize() {
        let row: AliasRow = row.context("parsing vocabulary alias row")?;
        if row.alias.trim().is_empty() || row.primary.trim().is_empty() {
            continue;
        }
        map.insert(normalize_code(&row.alias), normalize_code(&row.primary));
    }
    Ok(map)
}

/// Map a raw vocabulary tag onto its primary tag, defaulting to itself.
pub fn normalize_vocabulary(aliases: &HashMap<String, String>, raw: &str) -> String {
    let key = normalize_code(raw);
    aliases.get(&key).cloned().unwrap_or(key)
}
