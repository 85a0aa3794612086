//! Locating cached files on disk.

use chrono::{DateTime, Utc};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use super::descriptor::ArtifactDescriptor;
use super::index::ParsedEntry;
use crate::config::Paths;
use crate::error::Result;

/// How file names are matched against a descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchRule {
    /// Name starts with the dataset name and contains the extension
    /// anywhere, case-insensitively.
    #[default]
    Loose,
    /// Name starts with `{name}_v` and ends with `.{extension}`.
    Strict,
}

impl MatchRule {
    pub fn matches(&self, file_name: &str, descriptor: &ArtifactDescriptor) -> bool {
        match self {
            MatchRule::Loose => {
                file_name.starts_with(&descriptor.name)
                    && file_name
                        .to_lowercase()
                        .contains(&descriptor.extension.to_lowercase())
            }
            MatchRule::Strict => {
                file_name.starts_with(&format!("{}_v", descriptor.name))
                    && file_name
                        .rsplit_once('.')
                        .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case(&descriptor.extension))
            }
        }
    }
}

/// A regular file found in a category directory.
#[derive(Debug, Clone)]
pub(crate) struct LocalFile {
    pub path: PathBuf,
    pub name: String,
    pub stamp: SystemTime,
}

/// Finds the most recent local file for a descriptor.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileLocator {
    rule: MatchRule,
}

impl FileLocator {
    pub fn new(rule: MatchRule) -> Self {
        Self { rule }
    }

    pub fn rule(&self) -> MatchRule {
        self.rule
    }

    /// Path of the newest matching file, or `None`.
    ///
    /// "Newest" is by filesystem creation/change time; equal stamps go to
    /// the lexically greatest name. A pinned descriptor (version or hash
    /// set) only matches files of that build, whatever the rule.
    pub fn find(&self, descriptor: &ArtifactDescriptor, paths: &Paths) -> Result<Option<PathBuf>> {
        let dir = paths.category_dir(&descriptor.category);
        let files = if descriptor.is_pinned() {
            scan(&dir, |name| is_pinned_build(name, descriptor))?
        } else {
            scan(&dir, |name| self.rule.matches(name, descriptor))?
        };
        Ok(newest(&files).map(|f| f.path.clone()))
    }
}

/// Newest local file for `descriptor` using loose matching.
pub fn find_local(descriptor: &ArtifactDescriptor, paths: &Paths) -> Result<Option<PathBuf>> {
    FileLocator::default().find(descriptor, paths)
}

/// True when `file_name` is `descriptor`'s pinned build in its extension.
pub(crate) fn is_pinned_build(file_name: &str, descriptor: &ArtifactDescriptor) -> bool {
    let parsed = ParsedEntry::parse(file_name, DateTime::<Utc>::default());
    parsed.extension.eq_ignore_ascii_case(&descriptor.extension) && parsed.matches_pin(descriptor)
}

/// Regular files in `dir` whose names satisfy `keep`.
///
/// A missing directory is an empty cache, not an error.
pub(crate) fn scan(dir: &Path, keep: impl Fn(&str) -> bool) -> Result<Vec<LocalFile>> {
    let read = match fs::read_dir(dir) {
        Ok(read) => read,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut files = Vec::new();
    for entry in read {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !keep(&name) {
            continue;
        }
        let meta = entry.metadata()?;
        if !meta.is_file() {
            continue;
        }
        files.push(LocalFile {
            path: entry.path(),
            name,
            stamp: file_timestamp(&meta),
        });
    }
    Ok(files)
}

pub(crate) fn newest(files: &[LocalFile]) -> Option<&LocalFile> {
    files
        .iter()
        .max_by(|a, b| a.stamp.cmp(&b.stamp).then_with(|| a.name.cmp(&b.name)))
}

#[cfg(unix)]
fn file_timestamp(meta: &fs::Metadata) -> SystemTime {
    use std::os::unix::fs::MetadataExt;
    use std::time::{Duration, UNIX_EPOCH};

    // ctime: the closest thing to a creation time on Unix filesystems.
    match (u64::try_from(meta.ctime()), u32::try_from(meta.ctime_nsec())) {
        (Ok(secs), Ok(nanos)) => UNIX_EPOCH + Duration::new(secs, nanos),
        _ => UNIX_EPOCH,
    }
}

#[cfg(not(unix))]
fn file_timestamp(meta: &fs::Metadata) -> SystemTime {
    meta.created()
        .or_else(|_| meta.modified())
        .unwrap_or(SystemTime::UNIX_EPOCH)
}
