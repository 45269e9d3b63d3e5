//! Legacy export handling: parse `customqueries.json`, flatten it into
//! `{name, query, category}` records, and hand those off through the
//! intermediate file.
//!
//! # Legacy export shape
//!
//! ```json
//! { "queries": [
//!     { "name": "All Domain Admins", "category": "Domain",
//!       "queryList": [ { "final": true, "query": "MATCH ..." } ] }
//! ] }
//! ```
//!
//! Only `queryList[0]` is kept. Entries whose name contains
//! [`CATEGORY_SEPARATOR`] are category banners from the export, not
//! queries; they survive the transform but are never imported.

use std::path::Path;

use bhmigrate_api_client::NewSavedQuery;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::exit_codes::EXIT_INPUT;
use crate::CliError;

pub const DEFAULT_LEGACY_FILE: &str = "customqueries.json";
pub const DEFAULT_NEW_FILE: &str = "new_customqueries.json";
pub const DEFAULT_WORK_FILE: &str = "queries-toimport.json";

pub const CATEGORY_SEPARATOR: &str = "--------------";

// ── Input schema ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LegacyExport {
    pub queries: Vec<LegacyEntry>,
}

#[derive(Debug, Deserialize)]
pub struct LegacyEntry {
    pub name: String,
    pub category: String,
    #[serde(rename = "queryList")]
    pub query_list: Option<Vec<QueryVariant>>,
}

/// One variant of a legacy query. Extra keys (`final`, `props`, …) are ignored.
#[derive(Debug, Deserialize)]
pub struct QueryVariant {
    pub query: String,
}

// ── Flat record ─────────────────────────────────────────────────────

/// A transformed legacy query, as stored in the intermediate file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorizedQuery {
    pub name: String,
    pub query: String,
    pub category: String,
}

impl CategorizedQuery {
    pub fn is_category_header(&self) -> bool {
        self.name.contains(CATEGORY_SEPARATOR)
    }

    /// `"{category} - {name}"`
    pub fn display_name(&self) -> String {
        format!("{} - {}", self.category, self.name)
    }

    pub fn to_saved_query(&self) -> NewSavedQuery {
        NewSavedQuery { name: self.display_name(), query: self.query.clone() }
    }
}

/// Flatten a legacy export, one record per entry, in input order.
pub fn transform(export: &LegacyExport) -> Result<Vec<CategorizedQuery>, CliError> {
    export
        .queries
        .iter()
        .enumerate()
        .map(|(i, entry)| -> Result<CategorizedQuery, CliError> {
            let first = entry
                .query_list
                .as_deref()
                .and_then(|variants| variants.first())
                .ok_or_else(|| {
                    CliError::input(format!(
                        "legacy entry {} ('{}') has no queryList entries",
                        i, entry.name,
                    ))
                })?;

            Ok(CategorizedQuery {
                name: entry.name.clone(),
                query: first.query.clone(),
                category: entry.category.clone(),
            })
        })
        .collect()
}

// ── Files ───────────────────────────────────────────────────────────

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T, CliError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| CliError::io(format!("cannot read {} {}: {}", what, path.display(), e)))?;

    serde_json::from_str(&contents)
        .map_err(|e| CliError::input(format!("{} {} is malformed: {}", what, path.display(), e)))
}

fn shape_hint(err: CliError, hint: &str) -> CliError {
    if err.code == EXIT_INPUT {
        err.with_hint(hint)
    } else {
        err
    }
}

pub fn load_legacy_export(path: &Path) -> Result<LegacyExport, CliError> {
    read_json(path, "legacy export").map_err(|e| {
        shape_hint(e, "expected {\"queries\": [{\"name\", \"category\", \"queryList\"}]}")
    })
}

/// New-format file: a JSON array of `{name, query}`, imported as-is.
pub fn load_new_queries(path: &Path) -> Result<Vec<NewSavedQuery>, CliError> {
    read_json(path, "query file")
        .map_err(|e| shape_hint(e, "expected a JSON array of {\"name\", \"query\"} objects"))
}

pub fn write_work_file(path: &Path, records: &[CategorizedQuery]) -> Result<(), CliError> {
    let json = serde_json::to_string(records)
        .map_err(|e| CliError::input(format!("cannot serialize transformed queries: {}", e)))?;

    std::fs::write(path, json)
        .map_err(|e| CliError::io(format!("cannot write {}: {}", path.display(), e)))
}

pub fn read_work_file(path: &Path) -> Result<Vec<CategorizedQuery>, CliError> {
    read_json(path, "intermediate file")
}

pub fn remove_work_file(path: &Path) -> Result<(), CliError> {
    std::fs::remove_file(path)
        .map_err(|e| CliError::io(format!("cannot remove {}: {}", path.display(), e)))
}
