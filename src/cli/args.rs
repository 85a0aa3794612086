//! CLI argument definitions.
//!
//! The main entry point is the [`Cli`] struct.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::cache::{ArtifactDescriptor, SubdirRules};

/// lcadata - Local cache for published LCA data artifacts.
#[derive(Debug, Parser)]
#[command(name = "lcadata")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to settings file (overrides the default config.yml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Local cache root (overrides settings and LCADATA_LOCAL_ROOT)
    #[arg(long, global = true)]
    pub local_root: Option<PathBuf>,

    /// Remote bucket URL (overrides settings and LCADATA_REMOTE_ROOT)
    #[arg(long, global = true)]
    pub remote_root: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the remote index for a tool and category
    Index(IndexArgs),

    /// Download the newest remote build of a dataset
    Fetch(FetchArgs),

    /// Load the newest local copy of a dataset
    Load(LoadArgs),

    /// Compare the local copy with the remote index
    Status(StatusArgs),

    /// Delete superseded local builds
    Prune(PruneArgs),

    /// Print a dataset's metadata sidecar
    Metadata(MetadataArgs),
}

/// Identifies a dataset.
#[derive(Debug, Clone, Args)]
pub struct DescriptorArgs {
    /// Dataset name (file-name prefix)
    pub name: String,

    /// Producing tool
    #[arg(short, long)]
    pub tool: String,

    /// Category subdirectory
    #[arg(long, default_value = "")]
    pub category: String,

    /// Payload extension
    #[arg(long, default_value = "parquet")]
    pub ext: String,

    /// Use this build version instead of the newest
    #[arg(id = "data_version", long = "data-version")]
    pub version: Option<String>,

    /// Use the build with this content hash instead of the newest
    #[arg(long)]
    pub hash: Option<String>,
}

impl DescriptorArgs {
    pub fn descriptor(&self) -> ArtifactDescriptor {
        let mut descriptor = ArtifactDescriptor::new(&self.tool, &self.name, &self.ext)
            .with_category(&self.category);
        if let Some(version) = &self.version {
            descriptor = descriptor.with_version(version);
        }
        if let Some(hash) = &self.hash {
            descriptor = descriptor.with_content_hash(hash);
        }
        descriptor
    }
}

/// Arguments for `index`.
#[derive(Debug, Clone, Args)]
pub struct IndexArgs {
    /// Producing tool
    #[arg(short, long)]
    pub tool: String,

    /// Category subdirectory
    #[arg(long, default_value = "")]
    pub category: String,

    /// Only entries whose name starts with this
    #[arg(long)]
    pub name: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `fetch`.
#[derive(Debug, Clone, Args)]
pub struct FetchArgs {
    #[command(flatten)]
    pub dataset: DescriptorArgs,

    /// Send files ending in SUFFIX to SUBDIR (repeatable)
    #[arg(long = "route", value_name = "SUFFIX=SUBDIR", value_parser = parse_route)]
    pub routes: Vec<(String, String)>,

    /// Only download when the local copy is absent or stale
    #[arg(long)]
    pub sync: bool,
}

/// Arguments for `load`.
#[derive(Debug, Clone, Args)]
pub struct LoadArgs {
    #[command(flatten)]
    pub dataset: DescriptorArgs,

    /// Rows to print
    #[arg(long, default_value_t = 10)]
    pub head: usize,

    /// Download first when nothing is cached
    #[arg(long)]
    pub fetch: bool,
}

/// Arguments for `status`.
#[derive(Debug, Clone, Args)]
pub struct StatusArgs {
    #[command(flatten)]
    pub dataset: DescriptorArgs,

    /// Send files ending in SUFFIX to SUBDIR (repeatable)
    #[arg(long = "route", value_name = "SUFFIX=SUBDIR", value_parser = parse_route)]
    pub routes: Vec<(String, String)>,
}

/// Arguments for `prune`.
#[derive(Debug, Clone, Args)]
pub struct PruneArgs {
    #[command(flatten)]
    pub dataset: DescriptorArgs,
}

/// Arguments for `metadata`.
#[derive(Debug, Clone, Args)]
pub struct MetadataArgs {
    #[command(flatten)]
    pub dataset: DescriptorArgs,

    /// Read the sidecar directly instead of deriving it from the payload
    #[arg(long)]
    pub exact: bool,
}

/// Build routing rules from `--route` pairs.
pub fn subdir_rules(routes: &[(String, String)]) -> SubdirRules {
    let mut rules = SubdirRules::new();
    for (suffix, subdir) in routes {
        rules.push(suffix, subdir);
    }
    rules
}

fn parse_route(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((suffix, subdir)) if !suffix.is_empty() => {
            Ok((suffix.to_string(), subdir.to_string()))
        }
        _ => Err(format!("expected SUFFIX=SUBDIR, got '{s}'")),
    }
}
