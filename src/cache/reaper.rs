//! Removing superseded local builds.

use chrono::{DateTime, Utc};
use std::fs;
use tracing::{debug, info};

use super::descriptor::ArtifactDescriptor;
use super::index::ParsedEntry;
use super::locator::{is_pinned_build, newest, scan};
use crate::config::Paths;
use crate::error::Result;

/// Delete older local builds of `descriptor`'s dataset.
///
/// Considers every file in the category directory named `{name}_v*`. The
/// newest one (by filesystem timestamp, not by version) is kept along with
/// the companions of its build; everything else is deleted. A pinned
/// descriptor keeps its own build instead of the newest, and removes
/// nothing when that build is not on disk. Returns the number of files
/// removed.
pub fn prune_older_versions(descriptor: &ArtifactDescriptor, paths: &Paths) -> Result<usize> {
    let dir = paths.category_dir(&descriptor.category);
    let prefix = format!("{}_v", descriptor.name);
    let files = scan(&dir, |name| name.starts_with(&prefix))?;

    let keep = if descriptor.is_pinned() {
        let pinned: Vec<_> = files
            .iter()
            .filter(|f| is_pinned_build(&f.name, descriptor))
            .cloned()
            .collect();
        newest(&pinned).cloned()
    } else {
        newest(&files).cloned()
    };
    let Some(keep) = keep else {
        return Ok(0);
    };
    let kept = ParsedEntry::parse(&keep.name, DateTime::<Utc>::default());
    debug!("Keeping {}", keep.name);

    let mut removed = 0;
    for file in &files {
        let parsed = ParsedEntry::parse(&file.name, DateTime::<Utc>::default());
        if file.name == keep.name || kept.shares_build_with(&parsed) {
            continue;
        }
        fs::remove_file(&file.path)?;
        info!("Removed old version {}", file.path.display());
        removed += 1;
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(name), b"x").unwrap();
        thread::sleep(Duration::from_millis(30));
    }

    fn names(dir: &Path) -> Vec<String> {
        let mut names: Vec<_> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn removes_all_but_newest() {
        let temp = TempDir::new().unwrap();
        let paths = Paths::new(temp.path(), "https://example.com/");
        let dir = paths.category_dir("");
        touch(&dir, "A_v1.csv");
        touch(&dir, "A_v2.csv");

        let d = ArtifactDescriptor::new("t", "A", "csv");
        assert_eq!(prune_older_versions(&d, &paths).unwrap(), 1);
        assert_eq!(names(&dir), vec!["A_v2.csv"]);
    }

    #[test]
    fn keeps_companions_of_newest_build() {
        let temp = TempDir::new().unwrap();
        let paths = Paths::new(temp.path(), "https://example.com/");
        let dir = paths.category_dir("FBA");
        touch(&dir, "A_v1_abc1234.parquet");
        touch(&dir, "A_v1_abc1234_metadata.json");
        touch(&dir, "A_v2_def5678_metadata.json");
        touch(&dir, "A_v2_def5678.parquet");
        touch(&dir, "B_v1.parquet");

        let d = ArtifactDescriptor::new("t", "A", "parquet").with_category("FBA");
        assert_eq!(prune_older_versions(&d, &paths).unwrap(), 2);
        assert_eq!(
            names(&dir),
            vec!["A_v2_def5678.parquet", "A_v2_def5678_metadata.json", "B_v1.parquet"]
        );
    }

    #[test]
    fn newest_sidecar_does_not_spare_superseded_build() {
        let temp = TempDir::new().unwrap();
        let paths = Paths::new(temp.path(), "https://example.com/");
        let dir = paths.category_dir("");
        touch(&dir, "A_v2_aaaaaaa.parquet");
        touch(&dir, "A_v2_bbbbbbb.parquet");
        touch(&dir, "A_v2_bbbbbbb_metadata.json");

        let d = ArtifactDescriptor::new("t", "A", "parquet");
        assert_eq!(prune_older_versions(&d, &paths).unwrap(), 1);
        assert_eq!(
            names(&dir),
            vec!["A_v2_bbbbbbb.parquet", "A_v2_bbbbbbb_metadata.json"]
        );
    }

    #[test]
    fn pinned_descriptor_keeps_its_build() {
        let temp = TempDir::new().unwrap();
        let paths = Paths::new(temp.path(), "https://example.com/");
        let dir = paths.category_dir("");
        touch(&dir, "A_v1_abc1234.csv");
        touch(&dir, "A_v1_abc1234_metadata.json");
        touch(&dir, "A_v2_def5678.csv");

        let missing = ArtifactDescriptor::new("t", "A", "csv").with_version("7");
        assert_eq!(prune_older_versions(&missing, &paths).unwrap(), 0);

        let d = ArtifactDescriptor::new("t", "A", "csv").with_version("1");
        assert_eq!(prune_older_versions(&d, &paths).unwrap(), 1);
        assert_eq!(names(&dir), vec!["A_v1_abc1234.csv", "A_v1_abc1234_metadata.json"]);
    }

    #[test]
    fn newest_by_time_wins_over_higher_version() {
        let temp = TempDir::new().unwrap();
        let paths = Paths::new(temp.path(), "https://example.com/");
        let dir = paths.category_dir("");
        touch(&dir, "A_v9.csv");
        touch(&dir, "A_v1.csv");

        let d = ArtifactDescriptor::new("t", "A", "csv");
        prune_older_versions(&d, &paths).unwrap();
        assert_eq!(names(&dir), vec!["A_v1.csv"]);
    }

    #[test]
    fn empty_directory_removes_nothing() {
        let temp = TempDir::new().unwrap();
        let paths = Paths::new(temp.path(), "https://example.com/");
        let d = ArtifactDescriptor::new("t", "A", "csv");
        assert_eq!(prune_older_versions(&d, &paths).unwrap(), 0);
    }
}
