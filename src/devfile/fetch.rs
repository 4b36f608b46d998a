//! Retrieval of devfiles referenced by URL

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

use crate::error::DetectionError;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to create HTTP client: {0}")]
    Client(String),

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("GET {url} returned {status}")]
    Status { url: String, status: u16 },

    #[error("no content for {0}")]
    NotFound(String),
}

impl FetchError {
    pub fn url(&self) -> Option<&str> {
        match self {
            FetchError::Client(_) => None,
            FetchError::Request { url, .. }
            | FetchError::Status { url, .. }
            | FetchError::NotFound(url) => Some(url),
        }
    }
}

impl From<FetchError> for DetectionError {
    fn from(err: FetchError) -> Self {
        match err.url().map(str::to_string) {
            Some(url) => DetectionError::devfile_fetch_failed(&url).with_source(err),
            None => DetectionError::internal(err.to_string()),
        }
    }
}

/// Fetches text content over HTTP(S)
#[async_trait]
pub trait DevfileFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Production fetcher backed by reqwest
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl DevfileFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        tracing::debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::OK => response.text().await.map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            }),
            status => Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }),
        }
    }
}

/// Fetcher serving canned responses; unknown URLs answer 404
#[derive(Clone, Default)]
pub struct StaticFetcher {
    entries: Arc<Mutex<HashMap<String, String>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, url: &str, body: &str) -> Self {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(url.to_string(), body.to_string());
        }
        self
    }

    /// URLs requested so far, in order
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DevfileFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(url.to_string());
        }
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(url).cloned())
            .ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}
