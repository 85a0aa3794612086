//! Artifact descriptors and payload formats.

use serde::{Deserialize, Serialize};

use crate::error::{LcaError, Result};

/// Storage format of a payload file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Apache Parquet (columnar).
    Parquet,
    /// Comma-separated text with a header row.
    Csv,
}

impl Format {
    /// Resolve a format from an extension such as `parquet`, `.CSV`.
    pub fn from_extension(extension: &str) -> Result<Self> {
        match extension.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "parquet" => Ok(Format::Parquet),
            "csv" => Ok(Format::Csv),
            _ => Err(LcaError::UnsupportedFormat {
                extension: extension.to_string(),
            }),
        }
    }

    /// Canonical file extension, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Format::Parquet => "parquet",
            Format::Csv => "csv",
        }
    }
}

/// Identifies one logical dataset instance.
///
/// Serialized field names follow the metadata files the producing tools
/// publish next to their outputs, so sidecars written here and sidecars
/// downloaded from the bucket read the same way.
///
/// # Example
///
/// ```
/// use lcadata::cache::ArtifactDescriptor;
///
/// let d = ArtifactDescriptor::new("flowsa", "USDA_CoA_Cropland", "parquet")
///     .with_category("FlowByActivity")
///     .with_version("1.2")
///     .with_content_hash("a1b2c3d");
///
/// assert_eq!(d.payload_file_name(), "USDA_CoA_Cropland_v1.2_a1b2c3d.parquet");
/// assert_eq!(d.sidecar_file_name(), "USDA_CoA_Cropland_v1.2_a1b2c3d_metadata.json");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactDescriptor {
    /// Producing tool, e.g. "flowsa".
    pub tool: String,
    /// Subdirectory/grouping, e.g. "FlowByActivity". May be empty.
    #[serde(default)]
    pub category: String,
    /// Logical dataset name.
    #[serde(rename = "name_data")]
    pub name: String,
    /// Producer-assigned version.
    #[serde(rename = "tool_version", default)]
    pub version: String,
    /// Short build hash; empty when unknown.
    #[serde(rename = "git_hash", default)]
    pub content_hash: String,
    /// Storage extension without the dot.
    #[serde(rename = "ext")]
    pub extension: String,
    /// Creation timestamp as recorded by the producer.
    #[serde(rename = "date_created", default)]
    pub created_at: String,
    /// Opaque producer metadata, passed through untouched.
    #[serde(rename = "tool_meta", default)]
    pub producer_metadata: serde_json::Value,
}

impl ArtifactDescriptor {
    /// Create a descriptor with the required fields; the rest start empty.
    pub fn new(
        tool: impl Into<String>,
        name: impl Into<String>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            tool: tool.into(),
            category: String::new(),
            name: name.into(),
            version: String::new(),
            content_hash: String::new(),
            extension: extension.into(),
            created_at: String::new(),
            producer_metadata: serde_json::Value::Null,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_content_hash(mut self, hash: impl Into<String>) -> Self {
        self.content_hash = hash.into();
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn with_created_at(mut self, created_at: impl Into<String>) -> Self {
        self.created_at = created_at.into();
        self
    }

    pub fn with_producer_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.producer_metadata = metadata;
        self
    }

    /// Payload format implied by the extension.
    pub fn format(&self) -> Result<Format> {
        Format::from_extension(&self.extension)
    }

    /// `name_v{version}[_{hash}]`.
    pub fn file_stem(&self) -> String {
        let mut stem = format!("{}_v{}", self.name, self.version);
        if !self.content_hash.is_empty() {
            stem.push('_');
            stem.push_str(&self.content_hash);
        }
        stem
    }

    /// `name_v{version}[_{hash}].{ext}`.
    pub fn payload_file_name(&self) -> String {
        format!("{}.{}", self.file_stem(), self.extension)
    }

    /// `name_v{version}[_{hash}]_metadata.json`.
    pub fn sidecar_file_name(&self) -> String {
        format!("{}_metadata.json", self.file_stem())
    }

    /// True when a version or hash narrows lookups to one build.
    pub fn is_pinned(&self) -> bool {
        !self.version.is_empty() || !self.content_hash.is_empty()
    }

    /// True when both describe the same artifact group.
    pub fn same_group(&self, other: &ArtifactDescriptor) -> bool {
        self.name == other.name
            && self.version == other.version
            && self.content_hash == other.content_hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn format_from_extension_is_case_insensitive() {
        assert_eq!(Format::from_extension("parquet").unwrap(), Format::Parquet);
        assert_eq!(Format::from_extension(".CSV").unwrap(), Format::Csv);
    }

    #[test]
    fn unknown_extension_is_unsupported() {
        let err = Format::from_extension("rds").unwrap_err();
        assert!(matches!(err, LcaError::UnsupportedFormat { .. }));
    }

    #[test]
    fn stem_omits_empty_hash() {
        let d = ArtifactDescriptor::new("stewi", "TRI_2019", "csv").with_version("1");
        assert_eq!(d.payload_file_name(), "TRI_2019_v1.csv");
    }

    #[test]
    fn version_or_hash_pins_the_build() {
        let d = ArtifactDescriptor::new("flowsa", "A", "csv");
        assert!(!d.is_pinned());
        assert!(d.clone().with_version("1").is_pinned());
        assert!(d.with_content_hash("abc1234").is_pinned());
    }

    #[test]
    fn same_group_ignores_extension_and_category() {
        let a = ArtifactDescriptor::new("flowsa", "A", "parquet")
            .with_version("2")
            .with_content_hash("def5678");
        let b = a.clone().with_extension("json").with_category("metadata");
        let c = a.clone().with_content_hash("abc1234");

        assert!(a.same_group(&b));
        assert!(!a.same_group(&c));
    }

    #[test]
    fn serializes_with_producer_field_names() {
        let d = ArtifactDescriptor::new("flowsa", "A", "parquet")
            .with_category("FBA")
            .with_version("1")
            .with_content_hash("abc1234")
            .with_created_at("2021-06-01 12:00:00")
            .with_producer_metadata(json!({"source": "USDA"}));

        let value = serde_json::to_value(&d).unwrap();

        assert_eq!(value["name_data"], "A");
        assert_eq!(value["tool_version"], "1");
        assert_eq!(value["git_hash"], "abc1234");
        assert_eq!(value["ext"], "parquet");
        assert_eq!(value["date_created"], "2021-06-01 12:00:00");
        assert_eq!(value["tool_meta"]["source"], "USDA");
    }

    #[test]
    fn deserializes_with_defaults() {
        let d: ArtifactDescriptor =
            serde_json::from_str(r#"{"tool": "flowsa", "name_data": "A", "ext": "csv"}"#).unwrap();
        assert_eq!(d, ArtifactDescriptor::new("flowsa", "A", "csv"));
    }
}
