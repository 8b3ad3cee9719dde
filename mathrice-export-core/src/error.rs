use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Date/time parsing failed: {0}")]
    DateTime(#[from] chrono::ParseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Provider error: {provider} - {message}")]
    Provider { provider: String, message: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("ICS generation failed: {0}")]
    IcsGeneration(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Network timeout")]
    Timeout,

    #[error("Provider temporarily unavailable: {0}")]
    Transient(String),

    #[error("Malformed event {id}: {reason}")]
    MalformedRecord { id: String, reason: String },
}

impl Error {
    pub fn malformed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::MalformedRecord {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Worth another attempt: the provider was unreachable or asked us to slow down.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Timeout | Error::Transient(_) => true,
            Error::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// Aborts the whole run, whatever the per-calendar isolation policy.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Authentication(_) | Error::Config(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
