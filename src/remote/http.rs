//! HTTP fetching with retry.
//!
//! Transport errors, 429 and 5xx responses are retried with a fixed backoff.
//! A 403 gets exactly one more attempt with a browser-like header set, since
//! some hosts reject non-browser user agents outright. Anything else fails
//! immediately.

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::Settings;
use crate::error::{LcaError, Result};

const DEFAULT_USER_AGENT: &str = concat!("lcadata/", env!("CARGO_PKG_VERSION"));

const FALLBACK_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Fixed-count, fixed-delay retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub attempts: u32,
    /// Delay between attempts.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_secs(5),
        }
    }
}

/// Outcome of a single request.
enum Attempt {
    Done(Vec<u8>),
    Forbidden,
    Transient(String),
    Fatal(String),
}

/// Fetches bytes over HTTP/HTTPS.
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
    retry: RetryPolicy,
}

impl HttpFetcher {
    /// Create a fetcher with a 30-second timeout and the default retry policy.
    pub fn new() -> Result<Self> {
        Self::with_policy(Duration::from_secs(30), RetryPolicy::default())
    }

    /// Create a fetcher with custom timeout and retry policy.
    pub fn with_policy(timeout: Duration, retry: RetryPolicy) -> Result<Self> {
        let client = Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| LcaError::Other(anyhow::anyhow!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            timeout,
            retry,
        })
    }

    /// Create a fetcher from settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let retry = RetryPolicy {
            attempts: settings.retry.attempts.max(1),
            backoff: settings.backoff()?,
        };
        Self::with_policy(settings.timeout()?, retry)
    }

    /// Get the configured timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Get the retry policy.
    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }

    /// GET a URL and return the body.
    pub fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let attempts = self.retry.attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match self.attempt(url, false) {
                Attempt::Done(bytes) => return Ok(bytes),
                Attempt::Forbidden => return self.get_with_fallback_headers(url),
                Attempt::Fatal(message) => return Err(unavailable(url, message)),
                Attempt::Transient(message) => {
                    warn!(
                        "Attempt {}/{} for {} failed: {}",
                        attempt, attempts, url, message
                    );
                    last_error = message;
                }
            }

            if attempt < attempts && !self.retry.backoff.is_zero() {
                std::thread::sleep(self.retry.backoff);
            }
        }

        Err(unavailable(url, last_error))
    }

    /// GET a URL and decode the body as UTF-8 (lossy).
    pub fn get_text(&self, url: &str) -> Result<String> {
        let bytes = self.get_bytes(url)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn get_with_fallback_headers(&self, url: &str) -> Result<Vec<u8>> {
        debug!("{} returned 403; retrying with alternate headers", url);
        match self.attempt(url, true) {
            Attempt::Done(bytes) => Ok(bytes),
            Attempt::Forbidden => Err(unavailable(url, "HTTP 403 Forbidden".to_string())),
            Attempt::Transient(message) | Attempt::Fatal(message) => {
                Err(unavailable(url, message))
            }
        }
    }

    fn attempt(&self, url: &str, alternate_headers: bool) -> Attempt {
        let mut request = self.client.get(url);
        if alternate_headers {
            request = request
                .header(USER_AGENT, FALLBACK_USER_AGENT)
                .header(ACCEPT, "*/*")
                .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9");
        }

        let response = match request.send() {
            Ok(response) => response,
            Err(e) => return Attempt::Transient(e.to_string()),
        };

        let status = response.status();
        if status.is_success() {
            return match response.bytes() {
                Ok(bytes) => Attempt::Done(bytes.to_vec()),
                Err(e) => Attempt::Transient(e.to_string()),
            };
        }

        if status == StatusCode::FORBIDDEN {
            Attempt::Forbidden
        } else if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            Attempt::Transient(format!("HTTP {}", status))
        } else {
            Attempt::Fatal(format!("HTTP {}", status))
        }
    }
}

fn unavailable(url: &str, message: String) -> LcaError {
    LcaError::RemoteUnavailable {
        url: url.to_string(),
        message,
    }
}
