use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;
use url::Url;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP request to {url} failed with status {status}")]
    Status { status: StatusCode, url: Url },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("API error (code {code:?}): {body}")]
    Api { code: Option<i64>, body: Value },

    /// Recoverable; consumed by the single re-login in `SessionClient::call`.
    #[error("Session expired")]
    SessionExpired(Value),

    #[error("Endpoint discovery failed: {0}")]
    Discovery(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    /// Failures raised before a response body could be read.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Http(_) | Error::Status { .. })
    }

    /// Failures in the body of an otherwise successful HTTP exchange.
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            Error::Serialization(_) | Error::Api { .. } | Error::SessionExpired(_)
        )
    }

    pub fn api_code(&self) -> Option<i64> {
        match self {
            Error::Api { code, .. } => *code,
            Error::SessionExpired(_) => Some(crate::api::SESSION_EXPIRED_CODE),
            _ => None,
        }
    }
}
