//! Where prompt templates and path maps are read from.
//!
//! A read failure is never an error at this layer: it is logged and comes
//! back as `None`, leaving the caller to decide whether the file mattered.

use reqwest::Client;
use std::future::Future;
use std::time::Duration;

/// Byte-retrieval capability keyed by a file reference.
pub trait TemplateSource: Send + Sync {
    /// Read the reference as UTF-8 text.
    fn fetch_text(&self, reference: &str) -> impl Future<Output = Option<String>> + Send;

    /// Read the reference as raw bytes.
    fn fetch_bytes(&self, reference: &str) -> impl Future<Output = Option<Vec<u8>>> + Send;
}

/// Reads references as paths on the local filesystem.
#[derive(Debug, Clone, Default)]
pub struct FileSource;

impl TemplateSource for FileSource {
    async fn fetch_text(&self, reference: &str) -> Option<String> {
        match tokio::fs::read_to_string(reference).await {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::warn!("Error reading file '{}': {}", reference, e);
                None
            }
        }
    }

    async fn fetch_bytes(&self, reference: &str) -> Option<Vec<u8>> {
        match tokio::fs::read(reference).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::warn!("Error reading file '{}': {}", reference, e);
                None
            }
        }
    }
}

/// Fetches references as URLs over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpSource {
    http: Client,
    request_timeout: Duration,
}

impl HttpSource {
    pub fn new() -> Self {
        Self {
            http: Client::new(),
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Per-request timeout (default 30 s).
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Use a custom `reqwest::Client` (for connection pooling, TLS).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    async fn get(&self, reference: &str) -> Option<reqwest::Response> {
        let resp = match self
            .http
            .get(reference)
            .timeout(self.request_timeout)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Error fetching file '{}': {}", reference, e);
                return None;
            }
        };
        if !resp.status().is_success() {
            tracing::warn!("Failed to fetch file '{}': HTTP {}", reference, resp.status());
            return None;
        }
        Some(resp)
    }
}

impl Default for HttpSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateSource for HttpSource {
    async fn fetch_text(&self, reference: &str) -> Option<String> {
        let resp = self.get(reference).await?;
        match resp.text().await {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::warn!("Error reading body of '{}': {}", reference, e);
                None
            }
        }
    }

    async fn fetch_bytes(&self, reference: &str) -> Option<Vec<u8>> {
        let resp = self.get(reference).await?;
        match resp.bytes().await {
            Ok(bytes) => Some(bytes.to_vec()),
            Err(e) => {
                tracing::warn!("Error reading body of '{}': {}", reference, e);
                None
            }
        }
    }
}

/// A source chosen once at startup.
#[derive(Debug, Clone)]
pub enum Source {
    File(FileSource),
    Http(HttpSource),
}

impl Source {
    /// HTTP for `http://` and `https://` references, the filesystem otherwise.
    pub fn for_reference(reference: &str) -> Self {
        if reference.starts_with("http://") || reference.starts_with("https://") {
            Source::Http(HttpSource::new())
        } else {
            Source::File(FileSource)
        }
    }

    /// Apply a per-request timeout. Filesystem reads are unaffected.
    pub fn with_request_timeout(self, timeout: Duration) -> Self {
        match self {
            Source::Http(http) => Source::Http(http.with_request_timeout(timeout)),
            file => file,
        }
    }
}

impl TemplateSource for Source {
    async fn fetch_text(&self, reference: &str) -> Option<String> {
        match self {
            Source::File(s) => s.fetch_text(reference).await,
            Source::Http(s) => s.fetch_text(reference).await,
        }
    }

    async fn fetch_bytes(&self, reference: &str) -> Option<Vec<u8>> {
        match self {
            Source::File(s) => s.fetch_bytes(reference).await,
            Source::Http(s) => s.fetch_bytes(reference).await,
        }
    }
}
