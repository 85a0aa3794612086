//! Local artifact cache.
//!
//! This module maps remote data artifacts onto a local directory tree:
//! descriptors and file naming ([`descriptor`]), remote index parsing
//! ([`index`]), local lookup ([`locator`]), payload I/O ([`table`]),
//! metadata sidecars ([`sidecar`]), pruning ([`reaper`]) and the
//! [`ArtifactCache`] that coordinates them ([`store`]).

pub mod descriptor;
pub mod index;
pub mod locator;
pub mod reaper;
pub mod sidecar;
pub mod store;
pub mod table;

pub use descriptor::{ArtifactDescriptor, Format};
pub use index::{
    compare_versions, parse_index, select_group, select_pinned_group, ParsedEntry, CONTENT_HASH_LEN,
};
pub use locator::{find_local, FileLocator, MatchRule};
pub use reaper::prune_older_versions;
pub use sidecar::{read_metadata, write_metadata};
pub use store::{ArtifactCache, ArtifactState, SubdirRules, SyncOutcome};
pub use table::{parse_csv, read_table, read_table_with_schema, write_table};
