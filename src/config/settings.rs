use crate::error::{Result, ScraperError};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

#[derive(Debug, Clone)]
pub struct Settings {
    pub discord: DiscordConfig,
    pub http: HttpConfig,
    pub retrieval: RetrievalConfig,
}

#[derive(Clone)]
pub struct DiscordConfig {
    pub token: String,
    pub api_base: String,
}

// Keeps the token out of debug logs.
impl std::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("token", &"<redacted>")
            .field("api_base", &self.api_base)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub max_connections: usize,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    pub concurrent_requests: usize,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            concurrent_requests: 5,
            max_retries: 3,
            retry_base_delay: Duration::from_secs(2),
        }
    }
}

pub fn load_settings() -> Result<Settings> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    settings_from(|name| std::env::var(name).ok())
}

/// Build settings from an arbitrary variable lookup
pub fn settings_from(lookup: impl Fn(&str) -> Option<String>) -> Result<Settings> {
    let discord = DiscordConfig {
        token: lookup("DISCORD_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ScraperError::Config("DISCORD_TOKEN not set".to_string()))?,
        api_base: lookup("DISCORD_API_BASE")
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string(),
    };

    let http_defaults = HttpConfig::default();
    let http = HttpConfig {
        max_connections: parse_var(&lookup, "MAX_CONNECTIONS", http_defaults.max_connections)?,
        request_timeout: Duration::from_secs(parse_var(
            &lookup,
            "REQUEST_TIMEOUT_SECS",
            http_defaults.request_timeout.as_secs(),
        )?),
        connect_timeout: Duration::from_secs(parse_var(
            &lookup,
            "CONNECT_TIMEOUT_SECS",
            http_defaults.connect_timeout.as_secs(),
        )?),
    };

    let retrieval_defaults = RetrievalConfig::default();
    let retrieval = RetrievalConfig {
        concurrent_requests: parse_var(
            &lookup,
            "CONCURRENT_REQUESTS",
            retrieval_defaults.concurrent_requests,
        )?,
        max_retries: parse_var(&lookup, "MAX_RETRIES", retrieval_defaults.max_retries)?,
        retry_base_delay: Duration::from_millis(parse_var(
            &lookup,
            "RETRY_BASE_DELAY_MS",
            retrieval_defaults.retry_base_delay.as_millis() as u64,
        )?),
    };

    if retrieval.concurrent_requests == 0 {
        return Err(ScraperError::Config(
            "CONCURRENT_REQUESTS must be at least 1".to_string(),
        ));
    }
    if http.max_connections == 0 {
        return Err(ScraperError::Config(
            "MAX_CONNECTIONS must be at least 1".to_string(),
        ));
    }

    Ok(Settings {
        discord,
        http,
        retrieval,
    })
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T> {
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ScraperError::Config(format!("Invalid {}", name))),
        None => Ok(default),
    }
}
