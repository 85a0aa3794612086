//! Remote index parsing and artifact group selection.
//!
//! Producers name files `name_v{version}[_{hash}][_suffix].{ext}`. The index
//! parser recovers those parts from a listing so the cache can pick the most
//! recent build and every file that shares its version and hash.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;

use super::descriptor::ArtifactDescriptor;
use crate::remote::RemoteEntry;

/// Length of the short build hash producers append to file names.
pub const CONTENT_HASH_LEN: usize = 7;

/// One remote file, split into its naming components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedEntry {
    pub name: String,
    pub version: String,
    pub content_hash: String,
    pub extension: String,
    pub file_name: String,
    pub last_modified: DateTime<Utc>,
}

impl ParsedEntry {
    /// Split a file name into name, version, hash and extension.
    ///
    /// The hash is the last `_` token of the stem when it is exactly
    /// [`CONTENT_HASH_LEN`] characters long. The name is everything before
    /// the first `_v`; the version is the token that follows it.
    ///
    /// ```
    /// use chrono::Utc;
    /// use lcadata::cache::ParsedEntry;
    ///
    /// let e = ParsedEntry::parse("USDA_CoA_Cropland_v1.2_a1b2c3d.parquet", Utc::now());
    /// assert_eq!(e.name, "USDA_CoA_Cropland");
    /// assert_eq!(e.version, "1.2");
    /// assert_eq!(e.content_hash, "a1b2c3d");
    /// assert_eq!(e.extension, "parquet");
    /// ```
    pub fn parse(file_name: &str, last_modified: DateTime<Utc>) -> Self {
        let (stem, extension) = match file_name.rsplit_once('.') {
            Some((stem, ext)) => (stem, ext),
            None => (file_name, ""),
        };

        let content_hash = stem
            .rsplit('_')
            .next()
            .filter(|token| token.len() == CONTENT_HASH_LEN && *token != stem)
            .unwrap_or("");

        let (name, version) = match stem.split_once("_v") {
            Some((name, rest)) => (name, rest.split('_').next().unwrap_or("")),
            None => (stem, ""),
        };

        Self {
            name: name.to_string(),
            version: version.to_string(),
            content_hash: content_hash.to_string(),
            extension: extension.to_string(),
            file_name: file_name.to_string(),
            last_modified,
        }
    }

    /// Text identifying this entry's build: `v2_def5678`, `v2` without a
    /// hash, or the bare hash `def5678` without a version.
    ///
    /// `None` when the entry carries neither a version nor a hash. A bare
    /// hash still only groups entries of the same name and version; see
    /// [`ParsedEntry::shares_build_with`].
    pub fn group_key(&self) -> Option<String> {
        match (self.version.is_empty(), self.content_hash.is_empty()) {
            (true, true) => None,
            (false, true) => Some(format!("v{}", self.version)),
            (true, false) => Some(self.content_hash.clone()),
            (false, false) => Some(format!("v{}_{}", self.version, self.content_hash)),
        }
    }

    /// True when `other` was produced by the same build as `self`.
    ///
    /// Companion files such as `_metadata.json` or `_log.txt` end in a
    /// suffix rather than the hash, so the hash is matched as any token
    /// after the version rather than as the parsed trailing token.
    pub fn shares_build_with(&self, other: &ParsedEntry) -> bool {
        if self.group_key().is_none() {
            return self.file_name == other.file_name;
        }
        if self.name != other.name || self.version != other.version {
            return false;
        }
        let hash = self.build_hash();
        hash.is_empty() || build_tokens(&other.file_name).any(|t| t == hash)
    }

    /// The build hash, also for companions whose stem ends in a suffix.
    ///
    /// Falls back to the first [`CONTENT_HASH_LEN`]-character token after
    /// the version, so `A_v2_def5678_metadata.json` yields `def5678`.
    pub fn build_hash(&self) -> &str {
        if !self.content_hash.is_empty() {
            return &self.content_hash;
        }
        build_tokens(&self.file_name)
            .skip(1)
            .find(|t| t.len() == CONTENT_HASH_LEN)
            .unwrap_or("")
    }

    /// True when this entry belongs to the build `descriptor` pins.
    ///
    /// An empty version or hash on the descriptor matches anything, so a
    /// hash alone selects every version built from it. Extensions are not
    /// compared.
    pub fn matches_pin(&self, descriptor: &ArtifactDescriptor) -> bool {
        self.name == descriptor.name
            && (descriptor.version.is_empty() || self.version == descriptor.version)
            && (descriptor.content_hash.is_empty()
                || self.build_hash() == descriptor.content_hash)
    }
}

/// Tokens of the stem after the version marker, or of the whole stem when
/// there is no marker.
fn build_tokens(file_name: &str) -> impl Iterator<Item = &str> {
    let stem = file_name.rsplit_once('.').map_or(file_name, |(stem, _)| stem);
    let rest = stem.split_once("_v").map_or(stem, |(_, rest)| rest);
    rest.split('_')
}

/// Like [`select_group`], restricted to the build `descriptor` pins when it
/// carries a version or hash.
pub fn select_pinned_group(entries: &[ParsedEntry], descriptor: &ArtifactDescriptor) -> Vec<String> {
    if !descriptor.is_pinned() {
        return select_group(entries, &descriptor.name, &descriptor.extension);
    }
    let pinned: Vec<ParsedEntry> = entries
        .iter()
        .filter(|e| e.matches_pin(descriptor))
        .cloned()
        .collect();
    select_group(&pinned, &descriptor.name, &descriptor.extension)
}

/// Parse every listing entry.
pub fn parse_index(entries: &[RemoteEntry]) -> Vec<ParsedEntry> {
    entries
        .iter()
        .map(|e| ParsedEntry::parse(&e.file_name, e.last_modified))
        .collect()
}

/// Compare dotted versions component-wise, numerically where both
/// components are numbers.
///
/// ```
/// use lcadata::cache::compare_versions;
/// use std::cmp::Ordering;
///
/// assert_eq!(compare_versions("1.10", "1.9"), Ordering::Greater);
/// assert_eq!(compare_versions("2", "2.0.1"), Ordering::Less);
/// ```
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ord = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(x), Ok(y)) => x.cmp(&y),
                    _ => x.cmp(y),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

/// The most recent entry for `name` with extension `extension`.
///
/// Candidates are entries whose parsed name starts with `name`. The highest
/// version wins; ties go to the latest modification time.
pub fn most_recent<'a>(
    entries: &'a [ParsedEntry],
    name: &str,
    extension: &str,
) -> Option<&'a ParsedEntry> {
    entries
        .iter()
        .filter(|e| e.name.starts_with(name) && e.extension == extension)
        .max_by(|a, b| {
            compare_versions(&a.version, &b.version)
                .then(a.last_modified.cmp(&b.last_modified))
                .then_with(|| a.file_name.cmp(&b.file_name))
        })
}

/// File names of the most recent build of `name`, companions included.
///
/// Empty when no entry matches.
pub fn select_group(entries: &[ParsedEntry], name: &str, extension: &str) -> Vec<String> {
    let Some(recent) = most_recent(entries, name, extension) else {
        return Vec::new();
    };

    entries
        .iter()
        .filter(|e| e.name.starts_with(name) && recent.shares_build_with(e))
        .map(|e| e.file_name.clone())
        .collect()
}
