//! The artifact cache.
//!
//! [`ArtifactCache`] ties the pieces together: it resolves the newest build
//! of a dataset from the remote index, downloads it into the local tree,
//! and reads and writes payload tables.

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::descriptor::{ArtifactDescriptor, Format};
use super::index::{parse_index, select_pinned_group, ParsedEntry};
use super::locator::find_local;
use super::reaper::prune_older_versions;
use super::sidecar;
use super::table::{read_table, read_table_with_schema, write_table};
use crate::config::{Paths, Settings};
use crate::error::Result;
use crate::remote::{HttpRemote, RemoteStore};

/// Routes downloaded files to subdirectories by file-name suffix.
///
/// Files that match no rule land in the descriptor's category. When several
/// rules match, the last one added wins.
///
/// ```
/// use lcadata::cache::SubdirRules;
///
/// let rules = SubdirRules::new()
///     .route("_metadata.json", "FBA/meta")
///     .route("_log.txt", "logs");
///
/// assert_eq!(rules.subdir_for("A_v1_metadata.json", "FBA"), "FBA/meta");
/// assert_eq!(rules.subdir_for("A_v1.parquet", "FBA"), "FBA");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubdirRules {
    rules: Vec<(String, String)>,
}

impl SubdirRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule sending files ending in `suffix` to `subdir`.
    pub fn route(mut self, suffix: impl Into<String>, subdir: impl Into<String>) -> Self {
        self.push(suffix, subdir);
        self
    }

    pub fn push(&mut self, suffix: impl Into<String>, subdir: impl Into<String>) {
        self.rules.push((suffix.into(), subdir.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Destination subdirectory for `file_name`.
    pub fn subdir_for<'a>(&'a self, file_name: &str, default: &'a str) -> &'a str {
        self.rules
            .iter()
            .rev()
            .find(|(suffix, _)| file_name.ends_with(suffix.as_str()))
            .map_or(default, |(_, subdir)| subdir.as_str())
    }
}

/// Freshness of the local copy relative to the remote index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactState {
    /// Nothing local.
    Absent,
    /// Every file of the newest remote build is present locally.
    Current,
    /// A local copy exists but the newest remote build is missing.
    Stale,
    /// A local copy exists and the remote has nothing for it.
    LocalOnly,
}

impl ArtifactState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactState::Absent => "absent",
            ArtifactState::Current => "current",
            ArtifactState::Stale => "stale",
            ArtifactState::LocalOnly => "local-only",
        }
    }

    /// True when a fetch would bring the local copy up to date.
    pub fn needs_fetch(&self) -> bool {
        matches!(self, ArtifactState::Absent | ArtifactState::Stale)
    }
}

impl std::fmt::Display for ArtifactState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of [`ArtifactCache::sync`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOutcome {
    /// State observed before syncing.
    pub before: ArtifactState,
    /// Whether any file was downloaded.
    pub fetched: bool,
}

/// Local cache of remote data artifacts.
pub struct ArtifactCache {
    remote: Box<dyn RemoteStore>,
}

impl ArtifactCache {
    /// Create a cache over an explicit remote store.
    pub fn new(remote: impl RemoteStore + 'static) -> Self {
        Self {
            remote: Box::new(remote),
        }
    }

    /// Create a cache reading the HTTP bucket described by `settings`.
    pub fn http(settings: &Settings) -> Result<Self> {
        Ok(Self::new(HttpRemote::from_settings(settings)?))
    }

    /// Load the newest local payload for `descriptor`.
    ///
    /// The reader is chosen from the located file's extension.
    pub fn load(
        &self,
        descriptor: &ArtifactDescriptor,
        paths: &Paths,
    ) -> Result<Option<RecordBatch>> {
        let Some(path) = find_local(descriptor, paths)? else {
            debug!(
                "{} not found in {}",
                descriptor.name,
                paths.category_dir(&descriptor.category).display()
            );
            return Ok(None);
        };
        info!("Loading {} from {}", descriptor.name, path.display());
        read_table(&path).map(Some)
    }

    /// Load the newest local payload, parsing it against `schema`.
    ///
    /// CSV payloads read this way keep the types they were written with.
    pub fn load_with_schema(
        &self,
        descriptor: &ArtifactDescriptor,
        paths: &Paths,
        schema: SchemaRef,
    ) -> Result<Option<RecordBatch>> {
        let Some(path) = find_local(descriptor, paths)? else {
            return Ok(None);
        };
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        info!("Loading {} from {}", descriptor.name, path.display());
        read_table_with_schema(&path, Format::from_extension(&extension)?, schema).map(Some)
    }

    /// Parsed remote index for the descriptor's tool and category.
    pub fn remote_index(
        &self,
        descriptor: &ArtifactDescriptor,
        paths: &Paths,
    ) -> Result<Vec<ParsedEntry>> {
        let prefix = paths.remote_prefix(&descriptor.tool, &descriptor.category);
        let entries = self.remote.list(paths, &prefix)?;
        debug!("{} entries under {}", entries.len(), prefix);
        Ok(parse_index(&entries))
    }

    /// File names of the newest remote build of `descriptor`'s dataset, or
    /// of the build it pins by version or hash.
    ///
    /// Empty when the remote has nothing matching.
    pub fn resolve_remote_group(
        &self,
        descriptor: &ArtifactDescriptor,
        paths: &Paths,
    ) -> Result<Vec<String>> {
        let index = self.remote_index(descriptor, paths)?;
        Ok(select_pinned_group(&index, descriptor))
    }

    /// Download the newest remote build into the local tree.
    ///
    /// Files that fail to download are logged and skipped. Returns `true`
    /// when at least one file was written.
    pub fn fetch(
        &self,
        descriptor: &ArtifactDescriptor,
        paths: &Paths,
        rules: &SubdirRules,
    ) -> Result<bool> {
        let group = self.resolve_remote_group(descriptor, paths)?;
        if group.is_empty() {
            info!(
                "{} not found in {}",
                descriptor.name,
                paths.remote_url(&descriptor.tool, &descriptor.category, "")
            );
            return Ok(false);
        }

        let mut fetched = false;
        for file_name in &group {
            let url = paths.remote_url(&descriptor.tool, &descriptor.category, file_name);
            let bytes = match self.remote.get(&url) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("Skipping {}: {}", file_name, e);
                    continue;
                }
            };

            let dir = paths.category_dir(rules.subdir_for(file_name, &descriptor.category));
            let target = dir.join(file_name);
            store_bytes(&dir, &target, &bytes)?;
            info!("{} saved to {}", file_name, dir.display());
            fetched = true;
        }
        Ok(fetched)
    }

    /// Write `table` as the payload for `descriptor`.
    pub fn write(
        &self,
        table: &RecordBatch,
        paths: &Paths,
        descriptor: &ArtifactDescriptor,
    ) -> Result<PathBuf> {
        let format = descriptor.format()?;
        let dir = paths.category_dir(&descriptor.category);
        fs::create_dir_all(&dir)?;

        let path = dir.join(descriptor.payload_file_name());
        write_table(table, &path, format)?;
        info!("Saved {} to {}", descriptor.name, path.display());
        Ok(path)
    }

    /// Write the descriptor's metadata sidecar.
    pub fn write_metadata(
        &self,
        paths: &Paths,
        descriptor: &ArtifactDescriptor,
    ) -> Result<PathBuf> {
        sidecar::write_metadata(paths, descriptor)
    }

    /// Read the descriptor's metadata sidecar.
    pub fn read_metadata(
        &self,
        paths: &Paths,
        descriptor: &ArtifactDescriptor,
        force_exact_name: bool,
    ) -> Result<Option<Map<String, Value>>> {
        sidecar::read_metadata(paths, descriptor, force_exact_name)
    }

    /// Delete superseded local builds; returns the number removed.
    pub fn prune(&self, descriptor: &ArtifactDescriptor, paths: &Paths) -> Result<usize> {
        prune_older_versions(descriptor, paths)
    }

    /// Compare the local copy with the newest remote build.
    pub fn status(
        &self,
        descriptor: &ArtifactDescriptor,
        paths: &Paths,
        rules: &SubdirRules,
    ) -> Result<ArtifactState> {
        let local = find_local(descriptor, paths)?;
        let group = self.resolve_remote_group(descriptor, paths)?;

        let state = match (local, group.is_empty()) {
            (None, true) => ArtifactState::Absent,
            (Some(_), true) => ArtifactState::LocalOnly,
            (local, false) => {
                let complete = group.iter().all(|file_name| {
                    paths
                        .category_dir(rules.subdir_for(file_name, &descriptor.category))
                        .join(file_name)
                        .is_file()
                });
                match (complete, local) {
                    (true, _) => ArtifactState::Current,
                    (false, Some(_)) => ArtifactState::Stale,
                    (false, None) => ArtifactState::Absent,
                }
            }
        };
        debug!("{} is {}", descriptor.name, state);
        Ok(state)
    }

    /// Fetch when the local copy is absent or stale.
    pub fn sync(
        &self,
        descriptor: &ArtifactDescriptor,
        paths: &Paths,
        rules: &SubdirRules,
    ) -> Result<SyncOutcome> {
        let before = self.status(descriptor, paths, rules)?;
        let fetched = if before.needs_fetch() {
            self.fetch(descriptor, paths, rules)?
        } else {
            false
        };
        Ok(SyncOutcome { before, fetched })
    }

    /// Load locally, downloading first when nothing is cached.
    pub fn load_or_fetch(
        &self,
        descriptor: &ArtifactDescriptor,
        paths: &Paths,
        rules: &SubdirRules,
    ) -> Result<Option<RecordBatch>> {
        if let Some(table) = self.load(descriptor, paths)? {
            return Ok(Some(table));
        }
        if self.fetch(descriptor, paths, rules)? {
            return self.load(descriptor, paths);
        }
        Ok(None)
    }
}

/// Write via a hidden temporary file so readers never see a partial payload.
fn store_bytes(dir: &Path, target: &Path, bytes: &[u8]) -> Result<()> {
    fs::create_dir_all(dir)?;
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let partial = dir.join(format!(".{name}.part"));
    fs::write(&partial, bytes)?;
    fs::rename(&partial, target)?;
    Ok(())
}
