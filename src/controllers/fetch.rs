//! Controller snapshot fetching

use crate::core::config::BackendConfig;
use controller_tools_protocol::{decode_snapshot, ControllerRecord};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Snapshot fetch failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("controller request failed: {0}")]
    Request(String),
    #[error("backend answered with status {0}")]
    Status(u16),
    #[error("malformed controller list: {0}")]
    Decode(String),
}

/// Source of controller snapshots (poll, not push)
pub trait ControllerSource: Send + Sync {
    fn fetch(&self) -> impl Future<Output = Result<Vec<ControllerRecord>, FetchError>> + Send;
}

/// `GET /controllers` on the local backend
#[derive(Clone)]
pub struct HttpControllerSource {
    client: reqwest::Client,
    url: String,
}

impl HttpControllerSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Request(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn from_config(config: &BackendConfig) -> Result<Self, FetchError> {
        Self::new(config.controllers_url(), config.request_timeout())
    }
}

impl ControllerSource for HttpControllerSource {
    async fn fetch(&self) -> Result<Vec<ControllerRecord>, FetchError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;
        let records = decode_snapshot(&body).map_err(|e| FetchError::Decode(e.to_string()))?;
        debug!("Fetched {} controllers from {}", records.len(), self.url);
        Ok(records)
    }
}
