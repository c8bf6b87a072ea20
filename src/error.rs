use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("{operation}: unauthorized ({status}), check that the Discord token is valid")]
    Unauthorized { operation: String, status: u16 },

    #[error("{operation}: forbidden ({status}), no permission to access this resource")]
    Forbidden { operation: String, status: u16 },

    #[error("{operation}: unexpected status {status}: {body}")]
    Status {
        operation: String,
        status: u16,
        body: String,
    },

    #[error("{operation}: giving up after {attempts} attempts: {cause}")]
    RetriesExhausted {
        operation: String,
        attempts: u32,
        cause: String,
    },

    #[error("{operation}: failed to decode response: {source}")]
    Decode {
        operation: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid channel identifier: {0}")]
    InvalidChannel(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Failed to render export: {0}")]
    Render(#[from] std::fmt::Error),
}

impl ScraperError {
    /// Credential or permission failures that abort the whole run
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Unauthorized { .. } | Self::Forbidden { .. })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unauthorized { .. } => "unauthorized",
            Self::Forbidden { .. } => "forbidden",
            Self::Status { .. } => "status",
            Self::RetriesExhausted { .. } => "retries_exhausted",
            Self::Decode { .. } => "decode",
            Self::Http(_) => "http",
            Self::InvalidChannel(_) => "invalid_channel",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
            Self::Serde(_) => "serde",
            Self::Render(_) => "render",
        }
    }
}

pub type Result<T> = std::result::Result<T, ScraperError>;
