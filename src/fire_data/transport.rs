//! The network seam of the request executor.

use crate::fire_data::error::FireDataError;
use log::debug;
use reqwest::{Client, StatusCode};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Per-request timeout for FIRMS calls.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Why a single request failed.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("HTTP request failed with status {status}")]
    HttpStatus { status: StatusCode },

    #[error("Request timed out")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Unexpected response: {0}")]
    InvalidBody(String),
}

impl TransportError {
    /// Whether the provider is throttling us. FIRMS answers an exhausted
    /// transaction budget with 403 Forbidden.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            TransportError::HttpStatus { status } => {
                *status == StatusCode::FORBIDDEN || *status == StatusCode::TOO_MANY_REQUESTS
            }
            TransportError::Request(message) | TransportError::Connection(message) => {
                message.contains("403") || message.contains("Forbidden")
            }
            _ => false,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            TransportError::HttpStatus { status }
        } else if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_connect() {
            TransportError::Connection(e.to_string())
        } else {
            TransportError::Request(e.to_string())
        }
    }
}

/// Issues a GET and returns the body of a successful (2xx) response.
pub trait FirmsTransport {
    fn get(&self, url: &str) -> impl Future<Output = Result<String, TransportError>> + Send;
}

/// [`FirmsTransport`] over a `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, FireDataError> {
        Self::with_timeout(REQUEST_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, FireDataError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(FireDataError::HttpClient)?;
        Ok(Self { client })
    }
}

impl FirmsTransport for HttpTransport {
    async fn get(&self, url: &str) -> Result<String, TransportError> {
        let response = self.client.get(url).send().await?;
        let response = response.error_for_status()?;
        debug!("Response status {}", response.status());
        Ok(response.text().await?)
    }
}
