//! Local and remote roots for cached artifacts.

use std::path::{Path, PathBuf};

/// Public bucket the sibling tools publish their outputs to.
pub const DEFAULT_REMOTE_ROOT: &str = "https://dmap-data-commons-ord.s3.amazonaws.com/";

/// Where artifacts live locally and remotely.
///
/// Immutable once built. The remote root always ends in `/` so object keys
/// can be appended directly.
///
/// # Example
///
/// ```
/// use lcadata::config::Paths;
///
/// let paths = Paths::new("/data", "https://bucket.example");
/// assert_eq!(paths.remote_root(), "https://bucket.example/");
/// assert_eq!(paths.remote_prefix("flowsa", "FlowByActivity"), "flowsa/FlowByActivity/");
/// assert_eq!(paths.remote_prefix("stewi", ""), "stewi/");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    local_root: PathBuf,
    remote_root: String,
}

impl Paths {
    /// Create paths from an explicit local directory and remote base URL.
    pub fn new(local_root: impl Into<PathBuf>, remote_root: impl Into<String>) -> Self {
        let mut remote_root = remote_root.into();
        if !remote_root.ends_with('/') {
            remote_root.push('/');
        }
        Self {
            local_root: local_root.into(),
            remote_root,
        }
    }

    /// Platform user-data directory, e.g. `~/.local/share` on Linux.
    pub fn default_local_root() -> PathBuf {
        dirs::data_dir().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Root directory for all cached artifacts.
    pub fn local_root(&self) -> &Path {
        &self.local_root
    }

    /// Base URL of the remote bucket, with trailing slash.
    pub fn remote_root(&self) -> &str {
        &self.remote_root
    }

    /// Local directory for one category.
    pub fn category_dir(&self, category: &str) -> PathBuf {
        if category.is_empty() {
            self.local_root.clone()
        } else {
            self.local_root.join(category)
        }
    }

    /// Object-key prefix for a tool and optional category: `tool/[category/]`.
    pub fn remote_prefix(&self, tool: &str, category: &str) -> String {
        if category.is_empty() {
            format!("{}/", tool)
        } else {
            format!("{}/{}/", tool, category)
        }
    }

    /// Download URL for one file of a tool/category.
    pub fn remote_url(&self, tool: &str, category: &str, file_name: &str) -> String {
        format!(
            "{}{}{}",
            self.remote_root,
            self.remote_prefix(tool, category),
            file_name
        )
    }
}

impl Default for Paths {
    fn default() -> Self {
        Self::new(Self::default_local_root(), DEFAULT_REMOTE_ROOT)
    }
}
