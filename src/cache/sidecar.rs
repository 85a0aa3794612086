//! Metadata sidecars stored next to payloads.

use serde_json::{Map, Value};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::descriptor::ArtifactDescriptor;
use super::locator::find_local;
use crate::config::Paths;
use crate::error::{LcaError, Result};

/// Write `descriptor` as pretty JSON to its sidecar path.
pub fn write_metadata(paths: &Paths, descriptor: &ArtifactDescriptor) -> Result<PathBuf> {
    let dir = paths.category_dir(&descriptor.category);
    fs::create_dir_all(&dir)?;
    let path = dir.join(descriptor.sidecar_file_name());

    let json = serde_json::to_string_pretty(descriptor).map_err(|e| LcaError::Serialization {
        path: path.clone(),
        message: e.to_string(),
    })?;
    fs::write(&path, json).map_err(|e| LcaError::Serialization {
        path: path.clone(),
        message: e.to_string(),
    })?;

    info!("Metadata saved to {}", path.display());
    Ok(path)
}

/// Sidecar path for a payload: `{stem}_metadata.json`.
pub fn sidecar_path(payload: &Path) -> PathBuf {
    let stem = payload
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    payload.with_file_name(format!("{stem}_metadata.json"))
}

/// Read the sidecar belonging to `descriptor`.
///
/// With `force_exact_name` the sidecar is read directly: when the
/// descriptor has a version that is the file named by
/// [`ArtifactDescriptor::sidecar_file_name`], otherwise the newest local
/// `.json` file for the dataset (narrowed to the hash, if set). Without it
/// the payload is located first and its sidecar derived from it. A missing
/// sidecar logs a warning and yields `None`; a sidecar that is not a JSON
/// object is an error.
pub fn read_metadata(
    paths: &Paths,
    descriptor: &ArtifactDescriptor,
    force_exact_name: bool,
) -> Result<Option<Map<String, Value>>> {
    let path = if force_exact_name && !descriptor.version.is_empty() {
        Some(paths.category_dir(&descriptor.category).join(descriptor.sidecar_file_name()))
    } else if force_exact_name {
        find_local(&descriptor.clone().with_extension("json"), paths)?
    } else {
        find_local(descriptor, paths)?.map(|payload| sidecar_path(&payload))
    };

    let Some(path) = path else {
        warn!("Metadata not found for {}", descriptor.name);
        return Ok(None);
    };

    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!("Metadata not found at {}", path.display());
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(map)) => Ok(Some(map)),
        Ok(_) => Err(LcaError::Deserialization {
            path,
            message: "expected a JSON object".into(),
        }),
        Err(e) => Err(LcaError::Deserialization {
            path,
            message: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn descriptor() -> ArtifactDescriptor {
        ArtifactDescriptor::new("flowsa", "A", "parquet")
            .with_category("FBA")
            .with_version("1")
            .with_content_hash("abc1234")
            .with_producer_metadata(json!({"year": 2017}))
    }

    #[test]
    fn sidecar_path_replaces_extension() {
        let p = sidecar_path(Path::new("/x/A_v1_abc1234.parquet"));
        assert_eq!(p, PathBuf::from("/x/A_v1_abc1234_metadata.json"));
    }

    #[test]
    fn written_metadata_is_read_back_via_payload() {
        let temp = TempDir::new().unwrap();
        let paths = Paths::new(temp.path(), "https://example.com/");
        let d = descriptor();
        let dir = paths.category_dir("FBA");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(d.payload_file_name()), b"payload").unwrap();

        write_metadata(&paths, &d).unwrap();
        let map = read_metadata(&paths, &d, false).unwrap().unwrap();

        assert_eq!(map["name_data"], "A");
        assert_eq!(map["git_hash"], "abc1234");
        assert_eq!(map["tool_meta"]["year"], 2017);
    }

    #[test]
    fn force_exact_reads_sidecar_without_payload() {
        let temp = TempDir::new().unwrap();
        let paths = Paths::new(temp.path(), "https://example.com/");
        let d = descriptor();

        write_metadata(&paths, &d).unwrap();

        assert!(read_metadata(&paths, &d, false).unwrap().is_none());
        let map = read_metadata(&paths, &d, true).unwrap().unwrap();
        assert_eq!(map["tool"], "flowsa");
    }

    #[test]
    fn force_exact_reads_the_requested_build() {
        let temp = TempDir::new().unwrap();
        let paths = Paths::new(temp.path(), "https://example.com/");
        let v1 = descriptor();
        let v2 = descriptor().with_version("2").with_content_hash("def5678");

        write_metadata(&paths, &v1).unwrap();
        write_metadata(&paths, &v2).unwrap();

        let map = read_metadata(&paths, &v1, true).unwrap().unwrap();
        assert_eq!(map["tool_version"], "1");
        assert_eq!(map["git_hash"], "abc1234");

        let by_hash = ArtifactDescriptor::new("flowsa", "A", "parquet")
            .with_category("FBA")
            .with_content_hash("abc1234");
        let map = read_metadata(&paths, &by_hash, true).unwrap().unwrap();
        assert_eq!(map["git_hash"], "abc1234");

        let missing = descriptor().with_version("3");
        assert!(read_metadata(&paths, &missing, true).unwrap().is_none());
    }

    #[test]
    fn pinned_payload_lookup_reads_its_own_sidecar() {
        let temp = TempDir::new().unwrap();
        let paths = Paths::new(temp.path(), "https://example.com/");
        let dir = paths.category_dir("FBA");
        fs::create_dir_all(&dir).unwrap();
        let v1 = descriptor();
        let v2 = descriptor().with_version("2").with_content_hash("def5678");
        for d in [&v1, &v2] {
            fs::write(dir.join(d.payload_file_name()), b"payload").unwrap();
            write_metadata(&paths, d).unwrap();
        }

        let map = read_metadata(&paths, &v1, false).unwrap().unwrap();
        assert_eq!(map["git_hash"], "abc1234");
    }

    #[test]
    fn payload_without_sidecar_is_none() {
        let temp = TempDir::new().unwrap();
        let paths = Paths::new(temp.path(), "https://example.com/");
        let d = descriptor();
        let dir = paths.category_dir("FBA");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(d.payload_file_name()), b"payload").unwrap();

        assert!(read_metadata(&paths, &d, false).unwrap().is_none());
    }

    #[test]
    fn corrupt_sidecar_is_an_error() {
        let temp = TempDir::new().unwrap();
        let paths = Paths::new(temp.path(), "https://example.com/");
        let d = descriptor();
        let dir = paths.category_dir("FBA");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(d.sidecar_file_name()), b"{not json").unwrap();

        let err = read_metadata(&paths, &d, true).unwrap_err();
        assert!(matches!(err, LcaError::Deserialization { .. }));
    }
}
