//! Page transport.
//!
//! [`PageSource`] is the seam between the fetch loop and the network. The
//! production implementation talks to the REST API over reqwest; tests plug
//! in scripted sources.

use std::time::Duration;

use async_trait::async_trait;
use featline_core::config::ApiConfig;
use featline_core::{Error, FetchError, Result};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// One record as returned by the API, before normalization.
pub type RawRecord = Value;

/// A single page request: endpoint path plus query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub path: String,
    pub params: Vec<(String, String)>,
}

impl PageRequest {
    /// Value of a query parameter.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Result payload of a successful page.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub list: Vec<RawRecord>,
    #[serde(rename = "nextPageCursor", default)]
    pub next_page_cursor: Option<String>,
}

impl Page {
    /// Continuation cursor, treating an empty string as absent.
    pub fn cursor(&self) -> Option<&str> {
        self.next_page_cursor.as_deref().filter(|c| !c.is_empty())
    }
}

/// Anything that can answer page requests.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch one page.
    ///
    /// Transport problems map to [`FetchError::Transport`], a non-success API
    /// status to [`FetchError::Api`].
    async fn fetch_page(&self, request: &PageRequest) -> std::result::Result<Page, FetchError>;
}

/// Response envelope of the REST API.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "retCode")]
    ret_code: i64,
    #[serde(rename = "retMsg", default)]
    ret_msg: String,
    #[serde(default)]
    result: Option<Page>,
}

/// REST API page source.
#[derive(Clone)]
pub struct HttpPageSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPageSource {
    /// Create a source from the API configuration.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch_page(&self, request: &PageRequest) -> std::result::Result<Page, FetchError> {
        let url = format!("{}{}", self.base_url, request.path);
        debug!(url = %url, params = ?request.params, "GET page");

        let response = self
            .client
            .get(&url)
            .query(&request.params)
            .send()
            .await
            .map_err(|e| FetchError::transport(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::transport(format!("HTTP {status} from {url}")));
        }

        let envelope: Envelope = response
            .json()
            .await
            .map_err(|e| FetchError::transport(format!("undecodable body from {url}: {e}")))?;

        if envelope.ret_code != 0 {
            return Err(FetchError::api(envelope.ret_code, envelope.ret_msg));
        }
        Ok(envelope.result.unwrap_or_default())
    }
}
