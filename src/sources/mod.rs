//! Bibliographic source records.
//!
//! Builds source records for LCA exports from a BibTeX file. Each record
//! gets a deterministic identifier derived from its description, so
//! regenerating sources yields the same ids.

pub mod bibtex;

pub use bibtex::{parse_bibtex, BibEntry};

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::warn;
use uuid::Uuid;

use crate::error::Result;

/// Fields joined into a record's description, in order.
const DESCRIPTION_FIELDS: [&str; 5] = ["author", "publisher", "title", "journal", "year"];

/// A source as exported to LCA tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    #[serde(rename = "@id")]
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "textReference", default)]
    pub text_reference: String,
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub url: String,
}

impl SourceRecord {
    /// Build a record from a parsed entry, displayed as `name`.
    pub fn from_entry(entry: &BibEntry, name: &str) -> Self {
        let description = DESCRIPTION_FIELDS
            .iter()
            .filter_map(|field| entry.plain(field))
            .collect::<Vec<_>>()
            .join(", ");

        Self {
            id: make_uuid(&[&description]),
            name: name.to_string(),
            description,
            text_reference: String::new(),
            year: entry.plain("year").unwrap_or_default(),
            url: entry.fields.get("url").cloned().unwrap_or_default(),
        }
    }
}

/// Source records for `bib_ids`, given as `(citation key, display name)`.
///
/// Keys missing from the file are skipped with a warning. Output order
/// follows `bib_ids`.
pub fn generate_sources(bib_path: &Path, bib_ids: &[(&str, &str)]) -> Result<Vec<SourceRecord>> {
    let text = fs::read_to_string(bib_path)?;
    let entries = parse_bibtex(&text);

    Ok(bib_ids
        .iter()
        .filter_map(|(key, name)| match entries.get(*key) {
            Some(entry) => Some(SourceRecord::from_entry(entry, name)),
            None => {
                warn!("{} not found in {}", key, bib_path.display());
                None
            }
        })
        .collect())
}

/// Deterministic name-based UUID (v3, OID namespace).
///
/// Parts are trimmed, lower-cased and joined with `/` before hashing.
///
/// ```
/// use lcadata::sources::make_uuid;
///
/// assert_eq!(make_uuid(&["Water", " air "]), make_uuid(&["water", "AIR"]));
/// assert_ne!(make_uuid(&["water"]), make_uuid(&["air"]));
/// ```
pub fn make_uuid(parts: &[&str]) -> String {
    let path = parts
        .iter()
        .map(|p| p.trim().to_lowercase())
        .collect::<Vec<_>>()
        .join("/");
    Uuid::new_v3(&Uuid::NAMESPACE_OID, path.as_bytes()).to_string()
}
