//! Settings schema.
//!
//! ```yaml
//! local_root: /data/lca
//! remote_root: https://dmap-data-commons-ord.s3.amazonaws.com/
//! listing: bucket
//! timeout: 30s
//! retry:
//!   attempts: 3
//!   backoff: 5s
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::paths::{Paths, DEFAULT_REMOTE_ROOT};
use crate::error::{LcaError, Result};

/// How the remote object listing is requested.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStyle {
    /// GET `{remote_root}{prefix}`, for servers that render a listing per
    /// directory.
    Path,
    /// S3 ListObjects: GET `{remote_root}?prefix={prefix}` with marker paging.
    /// The default bucket only answers this form.
    #[default]
    Bucket,
}

/// Retry policy for outbound GETs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Total attempts, including the first.
    pub attempts: u32,
    /// Fixed delay between attempts (e.g. "5s").
    pub backoff: String,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: "5s".to_string(),
        }
    }
}

/// Process-wide settings, loaded once and turned into [`Paths`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Local cache root; defaults to the platform data directory.
    pub local_root: Option<PathBuf>,
    /// Remote bucket base URL.
    pub remote_root: String,
    /// Listing request style.
    pub listing: ListingStyle,
    /// HTTP client timeout (e.g. "30s").
    pub timeout: String,
    /// Retry policy for downloads.
    pub retry: RetrySettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            local_root: None,
            remote_root: DEFAULT_REMOTE_ROOT.to_string(),
            listing: ListingStyle::default(),
            timeout: "30s".to_string(),
            retry: RetrySettings::default(),
        }
    }
}

impl Settings {
    /// Build the immutable paths record.
    pub fn paths(&self) -> Paths {
        let local = self
            .local_root
            .clone()
            .unwrap_or_else(Paths::default_local_root);
        Paths::new(local, self.remote_root.clone())
    }

    /// Parsed client timeout.
    pub fn timeout(&self) -> Result<Duration> {
        parse_duration(&self.timeout)
    }

    /// Parsed retry backoff.
    pub fn backoff(&self) -> Result<Duration> {
        parse_duration(&self.retry.backoff)
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<()> {
        if self.remote_root.trim().is_empty() {
            return Err(LcaError::ConfigValidationError {
                message: "remote_root must not be empty".into(),
            });
        }
        if self.retry.attempts == 0 {
            return Err(LcaError::ConfigValidationError {
                message: "retry.attempts must be at least 1".into(),
            });
        }
        self.timeout()?;
        self.backoff()?;
        Ok(())
    }
}

/// Parse a duration string like "5s", "2m", "1h", "1d" or a bare number of seconds.
pub fn parse_duration(value: &str) -> Result<Duration> {
    let value = value.trim().to_lowercase();

    let (digits, unit) = if let Some(n) = value.strip_suffix("ms") {
        (n, 1u64)
    } else if let Some(n) = value.strip_suffix('d') {
        (n, 86_400_000)
    } else if let Some(n) = value.strip_suffix('h') {
        (n, 3_600_000)
    } else if let Some(n) = value.strip_suffix('m') {
        (n, 60_000)
    } else if let Some(n) = value.strip_suffix('s') {
        (n, 1_000)
    } else {
        (value.as_str(), 1_000)
    };

    let invalid = || LcaError::ConfigValidationError {
        message: format!("invalid duration '{}'", value),
    };
    let n: u64 = digits.trim().parse().map_err(|_| invalid())?;
    let millis = n.checked_mul(unit).ok_or_else(invalid)?;
    Ok(Duration::from_millis(millis))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_policy() {
        let settings = Settings::default();
        assert_eq!(settings.retry.attempts, 3);
        assert_eq!(settings.backoff().unwrap(), Duration::from_secs(5));
        assert_eq!(settings.timeout().unwrap(), Duration::from_secs(30));
        assert_eq!(settings.listing, ListingStyle::Bucket);
    }

    #[test]
    fn default_remote_is_listed_as_a_bucket() {
        let settings = Settings::default();
        assert_eq!(settings.remote_root, DEFAULT_REMOTE_ROOT);
        assert_eq!(settings.listing, ListingStyle::Bucket);

        let settings: Settings = serde_yaml::from_str("listing: path\n").unwrap();
        assert_eq!(settings.listing, ListingStyle::Path);
    }

    #[test]
    fn paths_use_explicit_local_root() {
        let settings = Settings {
            local_root: Some(PathBuf::from("/data")),
            remote_root: "https://example.com".into(),
            ..Default::default()
        };
        let paths = settings.paths();
        assert_eq!(paths.local_root(), std::path::Path::new("/data"));
        assert_eq!(paths.remote_root(), "https://example.com/");
    }

    #[test]
    fn parses_partial_yaml() {
        let settings: Settings = serde_yaml::from_str("listing: bucket\nretry:\n  attempts: 5\n").unwrap();
        assert_eq!(settings.listing, ListingStyle::Bucket);
        assert_eq!(settings.retry.attempts, 5);
        assert_eq!(settings.retry.backoff, "5s");
        assert_eq!(settings.remote_root, DEFAULT_REMOTE_ROOT);
    }

    #[test]
    fn validate_rejects_zero_attempts() {
        let mut settings = Settings::default();
        settings.retry.attempts = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_remote() {
        let settings = Settings {
            remote_root: "  ".into(),
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_duration() {
        let settings = Settings {
            timeout: "soon".into(),
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn parse_duration_units() {
        assert_eq!(parse_duration("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("1d").unwrap(), Duration::from_secs(86_400));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("7").unwrap(), Duration::from_secs(7));
    }

    #[test]
    fn parse_duration_overflow_is_invalid() {
        let err = parse_duration("99999999999999999d").unwrap_err();
        assert!(matches!(err, LcaError::ConfigValidationError { .. }));
        assert!(parse_duration("18446744073709551615ms").is_ok());
    }

    #[test]
    fn parse_duration_zero() {
        assert_eq!(parse_duration("0s").unwrap(), Duration::ZERO);
    }
}
