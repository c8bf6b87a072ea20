//! HTTP transport: one request in, one raw response out

use crate::config::{DiscordConfig, HttpConfig};
use crate::error::{Result, ScraperError};
use reqwest::header::{self, HeaderMap, HeaderValue};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

const USER_AGENT: &str = concat!("discord-scraper/", env!("CARGO_PKG_VERSION"));

/// A GET against an API path, relative to the API base
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub path: String,
    pub query: Vec<(String, String)>,
}

impl Request {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: Vec::new(),
        }
    }

    pub fn with_param(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Status, rate-limit hint and body of a completed exchange
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub retry_after: Option<Duration>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            retry_after: None,
            body: body.into(),
        }
    }

    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Failures below the HTTP status level
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    Timeout(String),
    Connect(String),
    Body(String),
    Other(String),
}

impl TransportError {
    /// Connection, timeout and body-read failures
    pub fn is_network(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout(e) => write!(f, "request timed out: {}", e),
            Self::Connect(e) => write!(f, "connection failed: {}", e),
            Self::Body(e) => write!(f, "failed to read response body: {}", e),
            Self::Other(e) => write!(f, "{}", e),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e.to_string())
        } else if e.is_connect() {
            Self::Connect(e.to_string())
        } else if e.is_body() || e.is_decode() || e.is_request() {
            Self::Body(e.to_string())
        } else {
            Self::Other(e.to_string())
        }
    }
}

pub trait Transport: Send + Sync {
    fn get(
        &self,
        request: &Request,
    ) -> impl Future<Output = std::result::Result<RawResponse, TransportError>> + Send;
}

/// Connection-pooled reqwest transport with a cap on requests in flight
pub struct HttpTransport {
    client: reqwest::Client,
    api_base: String,
    connections: Arc<Semaphore>,
}

impl HttpTransport {
    pub fn new(discord: &DiscordConfig, http: &HttpConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&discord.token).map_err(|_| {
            ScraperError::Config("DISCORD_TOKEN is not a valid header value".to_string())
        })?;
        auth.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, auth);
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(http.request_timeout)
            .connect_timeout(http.connect_timeout)
            .pool_max_idle_per_host(http.max_connections)
            .build()?;

        tracing::debug!(
            api_base = %discord.api_base,
            max_connections = http.max_connections,
            timeout_secs = http.request_timeout.as_secs(),
            "HTTP transport created"
        );

        Ok(Self {
            client,
            api_base: discord.api_base.clone(),
            connections: Arc::new(Semaphore::new(http.max_connections.max(1))),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path.trim_start_matches('/'))
    }
}

impl Transport for HttpTransport {
    async fn get(&self, request: &Request) -> std::result::Result<RawResponse, TransportError> {
        let _permit = self
            .connections
            .acquire()
            .await
            .map_err(|e| TransportError::Other(e.to_string()))?;

        let response = self
            .client
            .get(self.url(&request.path))
            .query(&request.query)
            .send()
            .await?;

        let status = response.status().as_u16();
        let retry_after = parse_retry_after(response.headers());
        let body = response.bytes().await?.to_vec();

        Ok(RawResponse {
            status,
            retry_after,
            body,
        })
    }
}

/// `Retry-After` in seconds; Discord may send fractional values.
/// Negative, non-finite and out-of-range values are ignored.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let secs: f64 = headers
        .get(header::RETRY_AFTER)
        .and_then(|h| h.to_str().ok())?
        .trim()
        .parse()
        .ok()?;
    Duration::try_from_secs_f64(secs).ok()
}
