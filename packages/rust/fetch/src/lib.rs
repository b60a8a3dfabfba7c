//! Retrieval of the standard's DocBook sources.
//!
//! A source is either an HTTP(S) URL or a local file path. Part 3 and Part 6
//! are independent, so [`fetch_sources`] retrieves them concurrently before
//! any parsing starts. Retrieved text is run through
//! [`iodschema_docbook::clean_source`] so callers always get parse-ready XML.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, info, instrument};
use url::Url;

use iodschema_shared::{FetchConfig, Result, SchemaError};

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 5;

/// Default timeout in seconds for a single document.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// User-Agent string for retrieval requests.
const USER_AGENT: &str = concat!("iodschema/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// DocumentSource
// ---------------------------------------------------------------------------

/// Where a source document lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    /// Retrieved over HTTP(S).
    Remote(Url),
    /// Read from the local filesystem.
    Local(PathBuf),
}

impl DocumentSource {
    /// Interpret a config/CLI value: `http://` and `https://` are URLs,
    /// anything else is a path.
    pub fn parse(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            let url = Url::parse(trimmed)
                .map_err(|e| SchemaError::config(format!("invalid URL '{trimmed}': {e}")))?;
            return Ok(Self::Remote(url));
        }

        if trimmed.is_empty() {
            return Err(SchemaError::config("empty document source"));
        }

        Ok(Self::Local(PathBuf::from(trimmed)))
    }
}

impl std::fmt::Display for DocumentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Remote(url) => write!(f, "{url}"),
            Self::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

// ---------------------------------------------------------------------------
// Fetch options
// ---------------------------------------------------------------------------

/// Configuration for retrieval.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Timeout for HTTP requests in seconds.
    pub timeout_secs: u64,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl From<&FetchConfig> for FetchOptions {
    fn from(config: &FetchConfig) -> Self {
        Self {
            timeout_secs: config.timeout_secs,
        }
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Retrieve Part 3 and Part 6 concurrently. Returns `(part03, part06)` text.
#[instrument(skip_all, fields(part03 = %part03, part06 = %part06))]
pub async fn fetch_sources(
    part03: &DocumentSource,
    part06: &DocumentSource,
    opts: &FetchOptions,
) -> Result<(String, String)> {
    let client = build_client(opts)?;

    let (part03_result, part06_result) = tokio::join!(
        fetch_with_client(&client, part03),
        fetch_with_client(&client, part06),
    );

    Ok((part03_result?, part06_result?))
}

/// Retrieve a single source document.
#[instrument(skip_all, fields(source = %source))]
pub async fn fetch_source(source: &DocumentSource, opts: &FetchOptions) -> Result<String> {
    let client = build_client(opts)?;
    fetch_with_client(&client, source).await
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a reqwest client with appropriate settings.
fn build_client(opts: &FetchOptions) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .timeout(Duration::from_secs(opts.timeout_secs))
        .build()
        .map_err(|e| SchemaError::Network(format!("failed to build HTTP client: {e}")))
}

async fn fetch_with_client(client: &Client, source: &DocumentSource) -> Result<String> {
    let raw = match source {
        DocumentSource::Remote(url) => fetch_remote(client, url).await?,
        DocumentSource::Local(path) => tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SchemaError::io(path, e))?,
    };

    info!(%source, bytes = raw.len(), "retrieved source document");
    Ok(iodschema_docbook::clean_source(&raw))
}

async fn fetch_remote(client: &Client, url: &Url) -> Result<String> {
    debug!(%url, "requesting document");

    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| SchemaError::Network(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(SchemaError::Network(format!("{url}: HTTP {status}")));
    }

    response
        .text()
        .await
        .map_err(|e| SchemaError::Network(format!("{url}: failed to read body: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_source_url_and_path() {
        let remote = DocumentSource::parse("https://dicom.example.org/part03.xml").unwrap();
        assert!(matches!(remote, DocumentSource::Remote(_)));

        let local = DocumentSource::parse("fixtures/part03.xml").unwrap();
        assert_eq!(local, DocumentSource::Local(PathBuf::from("fixtures/part03.xml")));
    }

    #[test]
    fn parse_source_rejects_empty_and_bad_urls() {
        assert!(DocumentSource::parse("  ").is_err());
        assert!(DocumentSource::parse("http://").is_err());
    }

    #[tokio::test]
    async fn fetch_sources_with_mock_server() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/part03.xml"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_string("<book>\u{200B}<chapter label=\"A\"/></book>"),
            )
            .mount(&server)
            .await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/part06.xml"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string("<book/>"))
            .mount(&server)
            .await;

        let part03 = DocumentSource::parse(&format!("{}/part03.xml", server.uri())).unwrap();
        let part06 = DocumentSource::parse(&format!("{}/part06.xml", server.uri())).unwrap();

        let (part03_text, part06_text) =
            fetch_sources(&part03, &part06, &FetchOptions::default())
                .await
                .unwrap();

        assert_eq!(part03_text, "<book><chapter label=\"A\"/></book>");
        assert_eq!(part06_text, "<book/>");
    }

    #[tokio::test]
    async fn fetch_source_reports_http_errors() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/missing.xml"))
            .respond_with(wiremock::ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let source = DocumentSource::parse(&format!("{}/missing.xml", server.uri())).unwrap();
        let result = fetch_source(&source, &FetchOptions::default()).await;

        match result {
            Err(SchemaError::Network(message)) => assert!(message.contains("404")),
            other => panic!("expected network error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn fetch_source_reads_local_files() {
        let path = std::env::temp_dir().join(format!("iodschema-fetch-{}.xml", uuid::Uuid::now_v7()));
        std::fs::write(&path, "\u{FEFF}<book/>").unwrap();

        let source = DocumentSource::Local(path.clone());
        let text = fetch_source(&source, &FetchOptions::default()).await.unwrap();
        assert_eq!(text, "<book/>");

        std::fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn fetch_source_missing_file_is_io_error() {
        let source = DocumentSource::Local(PathBuf::from("/nonexistent/part03.xml"));
        let result = fetch_source(&source, &FetchOptions::default()).await;
        assert!(matches!(result, Err(SchemaError::Io { .. })));
    }
}
