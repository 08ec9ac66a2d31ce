#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Extraction of APD offers from the public search API.
//!
//! The API is a Solr-style search endpoint paginated by `start`/`rows`.
//! [`SearchBackend`] abstracts a single page request so the pagination
//! logic in [`extract::Extractor`] can be driven by the HTTP client in
//! [`solr`] or by a scripted backend in tests. Pacing between requests is
//! injected through [`pacing::Pacer`].
//!
//! [`html_table`] holds the small HTML table parser used by the catalog
//! importer.

pub mod extract;
pub mod html_table;
pub mod pacing;
pub mod progress;
pub mod solr;

use std::collections::BTreeMap;

use apd_files::FileError;
use apd_offer_models::{Offer, SearchFilters};

/// Default number of records requested per page.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Default pause between page requests, in milliseconds.
pub const DEFAULT_DELAY_MS: u64 = 500;

/// Default per-request timeout, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default sort clause (newest closing date first).
pub const DEFAULT_SORT: &str = "finoferta desc";

/// Charset the remote server declares for its JSON responses.
pub const DEFAULT_CHARSET: &str = "ISO-8859-1";

/// Errors that can occur during extraction.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    /// The request could not be sent or the body could not be read
    /// (connection failure, timeout, TLS).
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status {
        /// The status returned.
        status: reqwest::StatusCode,
        /// The requested URL.
        url: String,
    },

    /// The response body (or the request configuration) was not usable.
    #[error("Format error: {0}")]
    Format(String),

    /// Writing the extraction file failed.
    #[error(transparent)]
    File(#[from] FileError),
}

impl ScrapeError {
    /// Whether the error came from the network rather than the payload.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Status { .. })
    }
}

/// One page of search results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageResult {
    /// `response.numFound`: total records matching the query at request
    /// time.
    pub total_found: u64,
    /// `response.docs`: the records on this page, in server order.
    pub docs: Vec<Offer>,
}

/// Connection settings for the search API.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    /// Full URL of the search endpoint.
    pub endpoint: String,
    /// HTTP headers sent with every request.
    pub headers: BTreeMap<String, String>,
    /// Records per page.
    pub page_size: u32,
    /// Pause between page requests in milliseconds.
    pub delay_ms: u64,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Sort clause, passed through unchanged.
    pub sort: String,
    /// Charset used to decode response bodies.
    pub charset: String,
    /// Accept certificates that fail verification.
    pub accept_invalid_certs: bool,
}

impl ScrapeConfig {
    /// Creates a configuration for `endpoint` with the default headers and
    /// limits.
    #[must_use]
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_owned(),
            headers: default_headers(),
            page_size: DEFAULT_PAGE_SIZE,
            delay_ms: DEFAULT_DELAY_MS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            sort: DEFAULT_SORT.to_owned(),
            charset: DEFAULT_CHARSET.to_owned(),
            accept_invalid_certs: true,
        }
    }

    /// Sets the page size.
    #[must_use]
    pub const fn with_page_size(mut self, size: u32) -> Self {
        self.page_size = size;
        self
    }

    /// Sets the delay between page fetches.
    #[must_use]
    pub const fn with_delay_ms(mut self, ms: u64) -> Self {
        self.delay_ms = ms;
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub const fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Sets the sort clause.
    #[must_use]
    pub fn with_sort(mut self, sort: &str) -> Self {
        sort.clone_into(&mut self.sort);
        self
    }

    /// Sets the response charset.
    #[must_use]
    pub fn with_charset(mut self, charset: &str) -> Self {
        charset.clone_into(&mut self.charset);
        self
    }

    /// Enables or disables certificate verification.
    #[must_use]
    pub const fn with_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    /// Adds an HTTP header to include in requests.
    #[must_use]
    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.headers.insert(key.to_owned(), value.to_owned());
        self
    }
}

/// Headers the public site expects from a browser.
fn default_headers() -> BTreeMap<String, String> {
    BTreeMap::from([
        (
            "User-Agent".to_owned(),
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_owned(),
        ),
        ("Accept".to_owned(), "application/json".to_owned()),
        ("Referer".to_owned(), "http://servicios.abc.gob.ar/".to_owned()),
    ])
}

/// A paginated search API.
///
/// Implementations fetch exactly one page per call and never retry;
/// pagination, limits, and pacing are the caller's concern.
pub trait SearchBackend: Send + Sync {
    /// Fetches up to `rows` records starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Transport`] or [`ScrapeError::Status`] when the
    /// request fails and [`ScrapeError::Format`] when the body lacks the
    /// expected structure.
    fn fetch_page(
        &self,
        offset: u64,
        rows: u32,
        filters: &SearchFilters,
    ) -> impl std::future::Future<Output = Result<PageResult, ScrapeError>> + Send;

    /// Short name used in log lines.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_match_the_public_site() {
        let config = ScrapeConfig::new("https://example.test/select");
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.sort, "finoferta desc");
        assert_eq!(config.charset, "ISO-8859-1");
        assert!(config.accept_invalid_certs);
        assert_eq!(config.headers.get("Accept").unwrap(), "application/json");
        assert!(config.headers.contains_key("User-Agent"));
        assert!(config.headers.contains_key("Referer"));
    }

    #[test]
    fn builder_overrides() {
        let config = ScrapeConfig::new("https://example.test/select")
            .with_page_size(10)
            .with_delay_ms(0)
            .with_sort("idoferta asc")
            .with_header("Accept", "*/*");
        assert_eq!(config.page_size, 10);
        assert_eq!(config.delay_ms, 0);
        assert_eq!(config.sort, "idoferta asc");
        assert_eq!(config.headers.get("Accept").unwrap(), "*/*");
    }

    #[test]
    fn transport_classification() {
        let err = ScrapeError::Status {
            status: reqwest::StatusCode::BAD_GATEWAY,
            url: "https://example.test".to_owned(),
        };
        assert!(err.is_transport());
        assert!(!ScrapeError::Format("x".to_owned()).is_transport());
    }
}
