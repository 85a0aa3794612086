//! lcadata - Local cache for published life cycle assessment data.
//!
//! Tools that produce LCA datasets publish them to a shared bucket as
//! versioned files (`name_v{version}_{hash}.parquet` plus companions such as
//! a `_metadata.json` sidecar). This crate keeps a local copy of those
//! artifacts: it parses the remote index, downloads the newest build,
//! reads and writes payload tables, and prunes superseded versions. A few
//! table transformations shared by the producing tools live alongside.
//!
//! # Modules
//!
//! - [`cache`] - Artifact descriptors, index parsing, local lookup and sync
//! - [`cli`] - Command-line interface and argument parsing
//! - [`config`] - Settings loading and the local/remote path record
//! - [`error`] - Error types and result aliases
//! - [`remote`] - Bucket listing and downloads over HTTP
//! - [`sources`] - Bibliographic source records
//! - [`transform`] - Flow mapping, data quality scoring, secondary contexts,
//!   locations
//!
//! # Example
//!
//! ```
//! use lcadata::cache::{ArtifactCache, ArtifactDescriptor};
//! use lcadata::config::Paths;
//! use lcadata::remote::MemoryRemote;
//!
//! let temp = tempfile::tempdir().unwrap();
//! let paths = Paths::new(temp.path(), "memory://bucket/");
//!
//! let mut remote = MemoryRemote::new();
//! remote.insert("flowsa/FBA/A_v1_abc1234.csv", b"Flowable,FlowAmount\nWater,1.5\n".to_vec());
//! let cache = ArtifactCache::new(remote);
//!
//! let descriptor = ArtifactDescriptor::new("flowsa", "A", "csv").with_category("FBA");
//! let table = cache
//!     .load_or_fetch(&descriptor, &paths, &Default::default())
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(table.num_rows(), 1);
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod remote;
pub mod sources;
pub mod transform;

pub use error::{LcaError, Result};
