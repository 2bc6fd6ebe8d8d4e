//! Document retrieval. Claims reference documents by an opaque string; the
//! gateway source resolves it over HTTP while the file source reads local
//! paths for the CLI.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::DocumentGatewayConfig;

#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("document not available: {0}")]
    NotAvailable(String),
    #[error("document retrieval timed out")]
    Timeout,
    #[error("retrieved document was empty")]
    Empty,
}

/// Source of raw claim document bytes, keyed by an opaque reference.
pub trait DocumentSource: Send + Sync {
    fn fetch(&self, reference: &str) -> impl Future<Output = Result<Vec<u8>, RetrievalError>> + Send;
}

/// Fetches documents from a content gateway as `{base_url}/{reference}`.
pub struct GatewayDocumentSource {
    client: reqwest::Client,
    base_url: String,
}

impl GatewayDocumentSource {
    pub fn from_config(config: &DocumentGatewayConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl DocumentSource for GatewayDocumentSource {
    async fn fetch(&self, reference: &str) -> Result<Vec<u8>, RetrievalError> {
        let url = format!("{}/{reference}", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(classify)?
            .error_for_status()
            .map_err(classify)?;
        let bytes = response.bytes().await.map_err(classify)?;
        if bytes.is_empty() {
            return Err(RetrievalError::Empty);
        }
        Ok(bytes.to_vec())
    }
}

fn classify(err: reqwest::Error) -> RetrievalError {
    if err.is_timeout() {
        RetrievalError::Timeout
    } else {
        RetrievalError::NotAvailable(err.to_string())
    }
}

/// Reads documents from the local filesystem. The reference is interpreted as
/// a path relative to `root` unless it is absolute.
pub struct FileDocumentSource {
    root: PathBuf,
}

impl FileDocumentSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl DocumentSource for FileDocumentSource {
    async fn fetch(&self, reference: &str) -> Result<Vec<u8>, RetrievalError> {
        let path = self.root.join(reference);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|err| RetrievalError::NotAvailable(format!("{}: {err}", path.display())))?;
        if bytes.is_empty() {
            return Err(RetrievalError::Empty);
        }
        Ok(bytes)
    }
}
