//! Error types for lcadata operations.
//!
//! This module defines [`LcaError`], the primary error type used throughout
//! the library, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - An artifact that cannot be found is not an error: cache lookups return
//!   `Ok(None)`, an empty group, or `false`
//! - Remote failures surface as [`LcaError::RemoteUnavailable`] so callers can
//!   tell "the bucket is down" apart from "no such dataset"
//! - Reading or writing a payload in an unknown format is always fatal
//! - Use `anyhow::Error` (via `LcaError::Other`) for unexpected errors

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for lcadata operations.
#[derive(Debug, Error)]
pub enum LcaError {
    /// Remote listing or download failed after exhausting retries.
    #[error("Remote unavailable at {url}: {message}")]
    RemoteUnavailable { url: String, message: String },

    /// File extension has no reader/writer.
    #[error("Unsupported format: '{extension}'")]
    UnsupportedFormat { extension: String },

    /// Writing a table or sidecar failed.
    #[error("Failed to write {path}: {message}")]
    Serialization { path: PathBuf, message: String },

    /// Reading a table or sidecar failed.
    #[error("Failed to read {path}: {message}")]
    Deserialization { path: PathBuf, message: String },

    /// Settings file not found at expected location.
    #[error("Configuration not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Failed to parse settings file.
    #[error("Failed to parse config at {path}: {message}")]
    ConfigParseError { path: PathBuf, message: String },

    /// Invalid settings values.
    #[error("Invalid configuration: {message}")]
    ConfigValidationError { message: String },

    /// A table is missing a column a transformation needs.
    #[error("Missing column: {column}")]
    MissingColumn { column: String },

    /// A column exists but has the wrong type or contents.
    #[error("Invalid column '{column}': {message}")]
    InvalidColumn { column: String, message: String },

    /// No urban-area geometry is available for the requested year.
    #[error("Urban area geometry unavailable for {year}")]
    GeometryUnavailable { year: u16 },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for lcadata operations.
pub type Result<T> = std::result::Result<T, LcaError>;
