//! HTTP client for the Solr-style offer search endpoint.
//!
//! Every request asks for all documents (`q=*:*`) in JSON, one page at a
//! time via `start`/`rows`, sorted by the configured clause and narrowed by
//! the filter query built from [`SearchFilters`]. The server encodes its
//! bodies in Latin-1, so responses are decoded with the configured charset
//! before JSON parsing.

use std::time::Duration;

use apd_offer_models::{Offer, SearchFilters};
use serde_json::Value;

use crate::{PageResult, ScrapeConfig, ScrapeError, SearchBackend};

/// [`SearchBackend`] backed by the public search endpoint.
#[derive(Debug, Clone)]
pub struct SolrSearchClient {
    config: ScrapeConfig,
    client: reqwest::Client,
}

impl SolrSearchClient {
    /// Builds the HTTP client for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Format`] if a configured header is invalid and
    /// [`ScrapeError::Transport`] if the client cannot be built.
    pub fn new(config: ScrapeConfig) -> Result<Self, ScrapeError> {
        let client = Self::build_client(&config)?;
        Ok(Self { config, client })
    }

    /// Returns a reference to the underlying configuration.
    #[must_use]
    pub const fn config(&self) -> &ScrapeConfig {
        &self.config
    }

    /// Builds a [`reqwest::Client`] with the configured headers, timeout,
    /// and certificate policy.
    fn build_client(config: &ScrapeConfig) -> Result<reqwest::Client, ScrapeError> {
        let mut header_map = reqwest::header::HeaderMap::new();
        for (key, value) in &config.headers {
            let name = reqwest::header::HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| ScrapeError::Format(format!("invalid header name '{key}': {e}")))?;
            let val = reqwest::header::HeaderValue::from_str(value)
                .map_err(|e| ScrapeError::Format(format!("invalid header value '{value}': {e}")))?;
            header_map.insert(name, val);
        }
        if config.accept_invalid_certs {
            log::debug!("Certificate verification disabled for {}", config.endpoint);
        }
        reqwest::Client::builder()
            .default_headers(header_map)
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(ScrapeError::Transport)
    }

    /// Query string parameters for one page request.
    #[must_use]
    pub fn query_params(
        &self,
        offset: u64,
        rows: u32,
        filters: &SearchFilters,
    ) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("q", "*:*".to_owned()),
            ("rows", rows.to_string()),
            ("start", offset.to_string()),
            ("wt", "json".to_owned()),
            ("json.nl", "map".to_owned()),
            ("sort", self.config.sort.clone()),
        ];
        if let Some(fq) = filters.filter_query() {
            params.push(("fq", fq));
        }
        params
    }

    /// Asks for zero rows and returns the number of matching records.
    ///
    /// # Errors
    ///
    /// Same as [`SearchBackend::fetch_page`].
    pub async fn probe_total(&self, filters: &SearchFilters) -> Result<u64, ScrapeError> {
        Ok(self.fetch_page(0, 0, filters).await?.total_found)
    }

    /// Navigates a dot-separated path into a [`serde_json::Value`].
    fn resolve_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
        let mut current = value;
        for segment in path.split('.') {
            current = current.get(segment)?;
        }
        Some(current)
    }

    /// Extracts `response.numFound` and `response.docs` from a decoded body.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Format`] if either member is missing or has the
    /// wrong type, or if a document is not a JSON object.
    pub fn parse_response(body: &Value) -> Result<PageResult, ScrapeError> {
        let total_found = Self::resolve_path(body, "response.numFound")
            .and_then(|v| {
                v.as_u64()
                    .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
            })
            .ok_or_else(|| {
                ScrapeError::Format("response does not contain a numeric 'response.numFound'".to_owned())
            })?;

        let docs = Self::resolve_path(body, "response.docs")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                ScrapeError::Format("response does not contain a 'response.docs' array".to_owned())
            })?
            .iter()
            .cloned()
            .map(|doc| {
                Offer::from_value(doc)
                    .map_err(|other| ScrapeError::Format(format!("document is not an object: {other}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PageResult { total_found, docs })
    }
}

impl SearchBackend for SolrSearchClient {
    async fn fetch_page(
        &self,
        offset: u64,
        rows: u32,
        filters: &SearchFilters,
    ) -> Result<PageResult, ScrapeError> {
        let params = self.query_params(offset, rows, filters);
        log::debug!("GET {} start={offset} rows={rows}", self.config.endpoint);

        let response = self
            .client
            .get(&self.config.endpoint)
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Status {
                status,
                url: response.url().to_string(),
            });
        }

        let text = response.text_with_charset(&self.config.charset).await?;
        let body: Value = serde_json::from_str(&text)
            .map_err(|e| ScrapeError::Format(format!("response is not valid JSON: {e}")))?;

        let page = Self::parse_response(&body)?;
        log::debug!(
            "Page at {offset}: {} docs, {} found",
            page.docs.len(),
            page.total_found
        );
        Ok(page)
    }

    fn name(&self) -> &'static str {
        "solr"
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};
    use tokio::net::TcpListener;

    use super::*;

    /// Answers one request on a local port with a canned response and
    /// returns the endpoint URL.
    async fn serve_once(
        status: &'static str,
        content_type: &'static str,
        body: Vec<u8>,
    ) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let head = format!(
                "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(&body).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{addr}/select")
    }

    fn local_client(endpoint: &str) -> SolrSearchClient {
        SolrSearchClient::new(ScrapeConfig::new(endpoint).with_timeout_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn non_success_status_is_status_error() {
        let endpoint =
            serve_once("502 Bad Gateway", "text/html", b"<h1>bad gateway</h1>".to_vec()).await;
        let err = local_client(&endpoint)
            .fetch_page(0, 10, &SearchFilters::new())
            .await
            .unwrap_err();
        match &err {
            ScrapeError::Status { status, url } => {
                assert_eq!(status.as_u16(), 502);
                assert!(url.starts_with(&endpoint));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn latin1_body_is_decoded_with_configured_charset() {
        let mut body = br#"{"response":{"numFound":1,"docs":[{"cargo":"Educaci"#.to_vec();
        body.push(0xF3);
        body.extend_from_slice(br#"n F"#);
        body.push(0xED);
        body.extend_from_slice(br#"sica"}]}}"#);
        let endpoint = serve_once("200 OK", "application/json", body).await;

        let page = local_client(&endpoint)
            .fetch_page(0, 10, &SearchFilters::new())
            .await
            .unwrap();
        assert_eq!(page.total_found, 1);
        assert_eq!(page.docs[0].title().as_deref(), Some("Educación Física"));
    }

    #[tokio::test]
    async fn declared_charset_wins_over_configured_one() {
        let body = r#"{"response":{"numFound":1,"docs":[{"cargo":"Educación"}]}}"#;
        let endpoint = serve_once(
            "200 OK",
            "application/json; charset=utf-8",
            body.as_bytes().to_vec(),
        )
        .await;

        let page = local_client(&endpoint)
            .fetch_page(0, 10, &SearchFilters::new())
            .await
            .unwrap();
        assert_eq!(page.docs[0].title().as_deref(), Some("Educación"));
    }

    #[tokio::test]
    async fn non_json_body_is_format_error() {
        let endpoint = serve_once("200 OK", "text/html", b"<html></html>".to_vec()).await;
        let result = local_client(&endpoint)
            .fetch_page(0, 10, &SearchFilters::new())
            .await;
        assert!(matches!(result, Err(ScrapeError::Format(_))));
    }

    fn client() -> SolrSearchClient {
        SolrSearchClient::new(ScrapeConfig::new("https://example.test/select")).unwrap()
    }

    #[test]
    fn query_params_without_filters() {
        let params = client().query_params(200, 100, &SearchFilters::new());
        assert_eq!(
            params,
            vec![
                ("q", "*:*".to_owned()),
                ("rows", "100".to_owned()),
                ("start", "200".to_owned()),
                ("wt", "json".to_owned()),
                ("json.nl", "map".to_owned()),
                ("sort", "finoferta desc".to_owned()),
            ]
        );
    }

    #[test]
    fn query_params_add_filter_query() {
        let filters = SearchFilters::new()
            .with_district("LA PLATA")
            .with_status("Publicada");
        let params = client().query_params(0, 10, &filters);
        let fq = params.iter().find(|(k, _)| *k == "fq").unwrap();
        assert_eq!(fq.1, r#"descdistrito:"LA PLATA" AND estado:"Publicada""#);
    }

    #[test]
    fn parses_num_found_and_docs() {
        let body = serde_json::json!({
            "responseHeader": {"status": 0},
            "response": {
                "numFound": 2,
                "start": 0,
                "docs": [{"idoferta": 1, "cargo": "Maestro de Grado"}, {"idoferta": 2}]
            }
        });
        let page = SolrSearchClient::parse_response(&body).unwrap();
        assert_eq!(page.total_found, 2);
        assert_eq!(page.docs.len(), 2);
        assert_eq!(page.docs[0].title().as_deref(), Some("Maestro de Grado"));
    }

    #[test]
    fn num_found_may_be_a_string() {
        let body = serde_json::json!({"response": {"numFound": "7", "docs": []}});
        assert_eq!(SolrSearchClient::parse_response(&body).unwrap().total_found, 7);
    }

    #[test]
    fn missing_members_are_format_errors() {
        let no_total = serde_json::json!({"response": {"docs": []}});
        let no_docs = serde_json::json!({"response": {"numFound": 3}});
        let bad_doc = serde_json::json!({"response": {"numFound": 1, "docs": ["x"]}});
        for body in [no_total, no_docs, bad_doc, serde_json::json!({})] {
            assert!(matches!(
                SolrSearchClient::parse_response(&body),
                Err(ScrapeError::Format(_))
            ));
        }
    }
}
