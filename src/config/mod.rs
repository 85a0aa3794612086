//! Configuration for lcadata.
//!
//! - Local/remote roots in [`paths`]
//! - Settings schema and duration parsing in [`settings`]
//! - File discovery, environment and CLI layering in [`loader`]
//!
//! # Example
//!
//! ```
//! use lcadata::config::{parse_settings, ListingStyle};
//! use std::path::Path;
//!
//! let settings = parse_settings(
//!     "local_root: /data/lca\nremote_root: https://bucket.example\nlisting: bucket\n",
//!     Path::new("config.yml"),
//! )
//! .unwrap();
//! settings.validate().unwrap();
//!
//! let paths = settings.paths();
//! assert_eq!(paths.remote_root(), "https://bucket.example/");
//! assert_eq!(settings.listing, ListingStyle::Bucket);
//! ```

pub mod loader;
pub mod paths;
pub mod settings;

pub use loader::{
    apply_env, default_settings_path, load_settings, load_settings_file, parse_settings,
    SettingsOverrides, ENV_LOCAL_ROOT, ENV_REMOTE_ROOT,
};
pub use paths::{Paths, DEFAULT_REMOTE_ROOT};
pub use settings::{parse_duration, ListingStyle, RetrySettings, Settings};
