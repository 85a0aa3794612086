//! Remote object listings.
//!
//! Two listing shapes are accepted and normalized to [`RemoteEntry`]:
//!
//! - an S3-style XML `ListBucketResult` document
//! - a flat delimited table of `key, last_modified` rows, with or without a
//!   header row
//!
//! Keys are reported relative to the listed prefix.

use chrono::{DateTime, NaiveDateTime, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

use crate::error::{LcaError, Result};

/// One object in a remote listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    /// Object name relative to the listed prefix.
    pub file_name: String,
    /// Last-modified timestamp reported by the store.
    pub last_modified: DateTime<Utc>,
}

impl RemoteEntry {
    pub fn new(file_name: impl Into<String>, last_modified: DateTime<Utc>) -> Self {
        Self {
            file_name: file_name.into(),
            last_modified,
        }
    }
}

/// One page of a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    pub entries: Vec<RemoteEntry>,
    /// Marker to request the next page, if the listing was truncated.
    pub next_marker: Option<String>,
}

/// Parse a listing body of either shape.
pub fn parse_listing(body: &str, prefix: &str) -> Result<ListingPage> {
    let trimmed = body.trim_start();
    if trimmed.is_empty() {
        return Ok(ListingPage::default());
    }
    if trimmed.starts_with('<') {
        parse_bucket_xml(trimmed, prefix)
    } else {
        Ok(ListingPage {
            entries: parse_flat_table(trimmed, prefix)?,
            next_marker: None,
        })
    }
}

/// Parse an S3 `ListBucketResult` document.
pub fn parse_bucket_xml(body: &str, prefix: &str) -> Result<ListingPage> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut path: Vec<String> = Vec::new();
    let mut key: Option<String> = None;
    let mut modified: Option<String> = None;
    let mut last_key: Option<String> = None;
    let mut truncated = false;
    let mut next_marker: Option<String> = None;
    let mut entries = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                path.push(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
            }
            Ok(Event::End(_)) => {
                if path.pop().as_deref() == Some("Contents") {
                    if let Some(raw_key) = key.take() {
                        let stamp = modified.take();
                        push_entry(&mut entries, &raw_key, stamp.as_deref(), prefix);
                        last_key = Some(raw_key);
                    }
                    modified = None;
                }
            }
            Ok(Event::Text(t)) => {
                let text = t
                    .unescape()
                    .map_err(|e| malformed(prefix, e.to_string()))?
                    .into_owned();
                let in_contents = path.iter().any(|p| p == "Contents");
                match path.last().map(String::as_str) {
                    Some("Key") if in_contents => key = Some(text),
                    Some("LastModified") if in_contents => modified = Some(text),
                    Some("IsTruncated") => truncated = text.eq_ignore_ascii_case("true"),
                    Some("NextMarker") => next_marker = Some(text),
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(malformed(prefix, e.to_string())),
            _ => {}
        }
    }

    let next_marker = if truncated {
        next_marker.or(last_key)
    } else {
        None
    };

    Ok(ListingPage {
        entries,
        next_marker,
    })
}

/// Parse a flat `key, last_modified` table (comma or tab delimited).
pub fn parse_flat_table(body: &str, prefix: &str) -> Result<Vec<RemoteEntry>> {
    let first_line = body.lines().next().unwrap_or_default();
    let delimiter = if first_line.contains('\t') && !first_line.contains(',') {
        b'\t'
    } else {
        b','
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .delimiter(delimiter)
        .from_reader(body.as_bytes());

    let mut entries = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(|e| malformed(prefix, e.to_string()))?;
        let (Some(raw_key), Some(stamp)) = (record.get(0), record.get(1)) else {
            continue;
        };
        if row == 0 && parse_timestamp(stamp).is_none() {
            // header row
            continue;
        }
        push_entry(&mut entries, raw_key, Some(stamp), prefix);
    }

    Ok(entries)
}

/// Parse the timestamp formats object stores and exported tables use.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Key relative to the prefix; `None` for directory placeholders.
fn relative_name(key: &str, prefix: &str) -> Option<String> {
    let name = key.strip_prefix(prefix).unwrap_or(key);
    if name.is_empty() || name.ends_with('/') {
        None
    } else {
        Some(name.to_string())
    }
}

fn push_entry(entries: &mut Vec<RemoteEntry>, key: &str, stamp: Option<&str>, prefix: &str) {
    let Some(name) = relative_name(key, prefix) else {
        return;
    };
    match stamp.and_then(parse_timestamp) {
        Some(last_modified) => entries.push(RemoteEntry::new(name, last_modified)),
        None => warn!("Skipping {}: unreadable last-modified {:?}", key, stamp),
    }
}

fn malformed(prefix: &str, message: String) -> LcaError {
    LcaError::Deserialization {
        path: PathBuf::from(prefix),
        message: format!("malformed listing: {}", message),
    }
}
