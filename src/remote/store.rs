//! Remote object stores.
//!
//! [`RemoteStore`] is the seam the artifact cache talks to. [`HttpRemote`]
//! reads a real bucket; [`MemoryRemote`] serves objects from memory so
//! callers can exercise the cache offline.

use chrono::{DateTime, Utc};
use reqwest::Url;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use super::http::HttpFetcher;
use super::listing::{parse_listing, RemoteEntry};
use crate::config::{ListingStyle, Paths, Settings};
use crate::error::{LcaError, Result};

/// Read-only access to a bucket-like store.
pub trait RemoteStore {
    /// List objects under `prefix` (`tool/[category/]`).
    fn list(&self, paths: &Paths, prefix: &str) -> Result<Vec<RemoteEntry>>;

    /// Download one object by URL.
    fn get(&self, url: &str) -> Result<Vec<u8>>;
}

/// A bucket reached over HTTP.
pub struct HttpRemote {
    fetcher: HttpFetcher,
    listing: ListingStyle,
}

impl HttpRemote {
    pub fn new(fetcher: HttpFetcher, listing: ListingStyle) -> Self {
        Self { fetcher, listing }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self::new(
            HttpFetcher::from_settings(settings)?,
            settings.listing,
        ))
    }

    pub fn listing_style(&self) -> ListingStyle {
        self.listing
    }

    fn list_by_path(&self, paths: &Paths, prefix: &str) -> Result<Vec<RemoteEntry>> {
        let url = format!("{}{}", paths.remote_root(), prefix);
        debug!("Listing {}", url);
        let body = self.fetcher.get_text(&url)?;
        Ok(parse_listing(&body, prefix)?.entries)
    }

    fn list_bucket(&self, paths: &Paths, prefix: &str) -> Result<Vec<RemoteEntry>> {
        let base = Url::parse(paths.remote_root()).map_err(|e| LcaError::ConfigValidationError {
            message: format!("invalid remote_root '{}': {}", paths.remote_root(), e),
        })?;

        let mut entries = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let mut url = base.clone();
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("prefix", prefix);
                if let Some(marker) = &marker {
                    query.append_pair("marker", marker);
                }
            }

            debug!("Listing {}", url);
            let body = self.fetcher.get_text(url.as_str())?;
            let page = parse_listing(&body, prefix)?;
            entries.extend(page.entries);

            match page.next_marker {
                Some(next) if marker.as_deref() != Some(next.as_str()) => marker = Some(next),
                _ => break,
            }
        }

        Ok(entries)
    }
}

impl RemoteStore for HttpRemote {
    fn list(&self, paths: &Paths, prefix: &str) -> Result<Vec<RemoteEntry>> {
        match self.listing {
            ListingStyle::Path => self.list_by_path(paths, prefix),
            ListingStyle::Bucket => self.list_bucket(paths, prefix),
        }
    }

    fn get(&self, url: &str) -> Result<Vec<u8>> {
        self.fetcher.get_bytes(url)
    }
}

/// An in-memory bucket keyed by object key.
///
/// # Example
///
/// ```
/// use lcadata::config::Paths;
/// use lcadata::remote::{MemoryRemote, RemoteStore};
///
/// let paths = Paths::new("/tmp/cache", "memory://bucket/");
/// let mut remote = MemoryRemote::new();
/// remote.insert("flowsa/FBA/A_v1.csv", b"x\n1\n".to_vec());
///
/// let entries = remote.list(&paths, "flowsa/FBA/").unwrap();
/// assert_eq!(entries[0].file_name, "A_v1.csv");
///
/// let url = paths.remote_url("flowsa", "FBA", "A_v1.csv");
/// assert_eq!(remote.get(&url).unwrap(), b"x\n1\n");
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryRemote {
    objects: BTreeMap<String, (Vec<u8>, DateTime<Utc>)>,
    failing: BTreeSet<String>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object stamped with the current time.
    pub fn insert(&mut self, key: impl Into<String>, bytes: Vec<u8>) {
        self.insert_at(key, bytes, Utc::now());
    }

    /// Add an object with an explicit last-modified time.
    pub fn insert_at(&mut self, key: impl Into<String>, bytes: Vec<u8>, at: DateTime<Utc>) {
        self.objects.insert(key.into(), (bytes, at));
    }

    /// Remove an object.
    pub fn remove(&mut self, key: &str) -> bool {
        self.objects.remove(key).is_some()
    }

    /// Make downloads of `key` fail while it stays listed.
    pub fn fail_download(&mut self, key: impl Into<String>) {
        self.failing.insert(key.into());
    }

    fn key_for(url: &str) -> &str {
        // URLs are `{root}{key}`; the root is everything up to the third '/'.
        url.splitn(4, '/').nth(3).unwrap_or(url)
    }
}

impl RemoteStore for MemoryRemote {
    fn list(&self, _paths: &Paths, prefix: &str) -> Result<Vec<RemoteEntry>> {
        Ok(self
            .objects
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .filter_map(|(key, (_, at))| {
                let name = &key[prefix.len()..];
                (!name.is_empty() && !name.ends_with('/')).then(|| RemoteEntry::new(name, *at))
            })
            .collect())
    }

    fn get(&self, url: &str) -> Result<Vec<u8>> {
        let key = Self::key_for(url);
        if self.failing.contains(key) {
            return Err(LcaError::RemoteUnavailable {
                url: url.to_string(),
                message: "simulated failure".into(),
            });
        }
        self.objects
            .get(key)
            .map(|(bytes, _)| bytes.clone())
            .ok_or_else(|| LcaError::RemoteUnavailable {
                url: url.to_string(),
                message: "HTTP 404 Not Found".into(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::http::RetryPolicy;
    use httpmock::prelude::*;
    use std::time::Duration;

    fn fetcher() -> HttpFetcher {
        HttpFetcher::with_policy(
            Duration::from_secs(10),
            RetryPolicy {
                attempts: 1,
                backoff: Duration::ZERO,
            },
        )
        .unwrap()
    }

    #[test]
    fn path_listing_requests_prefix_url() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/flowsa/FBA/");
            then.status(200)
                .body("key,last_modified\nflowsa/FBA/A_v1.csv,2021-01-01T00:00:00Z\n");
        });

        let paths = Paths::new("/tmp", server.url("/"));
        let remote = HttpRemote::new(fetcher(), ListingStyle::Path);
        let entries = remote.list(&paths, "flowsa/FBA/").unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].file_name, "A_v1.csv");
        mock.assert();
    }

    #[test]
    fn bucket_listing_follows_markers() {
        let server = MockServer::start();
        let first = server.mock(|when, then| {
            when.method(GET)
                .path("/")
                .query_param("prefix", "tool/")
                .query_param_missing("marker");
            then.status(200).body(
                r#"<ListBucketResult><IsTruncated>true</IsTruncated>
<Contents><Key>tool/a.csv</Key><LastModified>2022-01-01T00:00:00Z</LastModified></Contents>
</ListBucketResult>"#,
            );
        });
        let second = server.mock(|when, then| {
            when.method(GET)
                .path("/")
                .query_param("prefix", "tool/")
                .query_param("marker", "tool/a.csv");
            then.status(200).body(
                r#"<ListBucketResult><IsTruncated>false</IsTruncated>
<Contents><Key>tool/b.csv</Key><LastModified>2022-01-02T00:00:00Z</LastModified></Contents>
</ListBucketResult>"#,
            );
        });

        let paths = Paths::new("/tmp", server.url("/"));
        let remote = HttpRemote::new(fetcher(), ListingStyle::Bucket);
        let entries = remote.list(&paths, "tool/").unwrap();

        let names: Vec<_> = entries.iter().map(|e| e.file_name.as_str()).collect();
        assert_eq!(names, vec!["a.csv", "b.csv"]);
        first.assert_calls(1);
        second.assert_calls(1);
    }

    #[test]
    fn listing_failure_is_remote_unavailable() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/tool/");
            then.status(500);
        });

        let paths = Paths::new("/tmp", server.url("/"));
        let remote = HttpRemote::new(fetcher(), ListingStyle::Path);
        let err = remote.list(&paths, "tool/").unwrap_err();

        assert!(matches!(err, LcaError::RemoteUnavailable { .. }));
    }

    #[test]
    fn memory_remote_lists_only_prefix() {
        let paths = Paths::new("/tmp", "memory://bucket/");
        let mut remote = MemoryRemote::new();
        remote.insert("flowsa/FBA/A_v1.csv", vec![1]);
        remote.insert("flowsa/FBS/B_v1.csv", vec![2]);
        remote.insert("flowsa/FBA/", vec![]);

        let entries = remote.list(&paths, "flowsa/FBA/").unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].file_name, "A_v1.csv");
    }

    #[test]
    fn memory_remote_simulated_failure() {
        let paths = Paths::new("/tmp", "memory://bucket/");
        let mut remote = MemoryRemote::new();
        remote.insert("tool/A_v1.csv", vec![1]);
        remote.fail_download("tool/A_v1.csv");

        assert_eq!(remote.list(&paths, "tool/").unwrap().len(), 1);
        let url = paths.remote_url("tool", "", "A_v1.csv");
        assert!(remote.get(&url).is_err());
    }
}
