//! Outbound calls to the automation service.
//!
//! Every call resolves to `Ok(payload)` or a [`TransportError`]; nothing here retries.
//! The dashboard depends only on the [`Transport`] trait so tests can inject a fake.

mod http;

pub use http::HttpTransport;

use crate::model::{Application, RunState, RunStatus, Settings, Stats};
use async_trait::async_trait;

/// Shown when a command fails before any response arrives.
pub const NETWORK_ERROR_MESSAGE: &str = "Network error occurred";

pub type TransportResult<T> = Result<T, TransportError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Connection refused, DNS failure, timeout, reset.
    #[error("network error: {0}")]
    Network(String),
    /// Non-2xx response, with the `error` field of the body when there was one.
    #[error("server rejected request with status {status}")]
    Rejected { status: u16, message: Option<String> },
    /// 2xx response whose body could not be decoded.
    #[error("malformed response: {0}")]
    Decode(String),
}

impl TransportError {
    pub fn server_message(&self) -> Option<&str> {
        match self {
            TransportError::Rejected {
                message: Some(m), ..
            } if !m.trim().is_empty() => Some(m),
            _ => None,
        }
    }

    /// Text to surface for a failed command: the server's own message when it sent one.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            TransportError::Network(_) => NETWORK_ERROR_MESSAGE.to_string(),
            other => other
                .server_message()
                .map(str::to_string)
                .unwrap_or_else(|| fallback.to_string()),
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn status(&self) -> TransportResult<RunStatus>;

    async fn stats(&self) -> TransportResult<Stats>;

    async fn applications(&self, per_page: usize) -> TransportResult<Vec<Application>>;

    async fn settings(&self) -> TransportResult<Settings>;

    async fn save_settings(&self, settings: &Settings) -> TransportResult<()>;

    async fn start(&self) -> TransportResult<()>;

    async fn stop(&self) -> TransportResult<()>;

    /// Ask the service to manufacture one synthetic application record.
    async fn simulate_application(&self) -> TransportResult<()>;

    /// Raw CSV text of the full history.
    async fn export_csv(&self) -> TransportResult<String>;

    /// Send `start` or `stop` so the service ends up in `target`.
    async fn set_run_state(&self, target: RunState) -> TransportResult<()> {
        match target {
            RunState::Running => self.start().await,
            RunState::Stopped => self.stop().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_prefers_server_text() {
        let err = TransportError::Rejected {
            status: 500,
            message: Some("rate limited".into()),
        };
        assert_eq!(err.user_message("Failed to toggle automation"), "rate limited");
    }

    #[test]
    fn user_message_falls_back() {
        let blank = TransportError::Rejected {
            status: 400,
            message: Some("  ".into()),
        };
        assert_eq!(blank.user_message("fallback"), "fallback");
        let decode = TransportError::Decode("eof".into());
        assert_eq!(decode.user_message("fallback"), "fallback");
        let net = TransportError::Network("refused".into());
        assert_eq!(net.user_message("fallback"), NETWORK_ERROR_MESSAGE);
    }
}
