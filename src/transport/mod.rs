//! Transport capability for the resolution wire protocol.
//!
//! The resolver core never talks HTTP directly; it goes through the
//! [`Transport`] trait, which performs one request/response exchange and
//! reports failures through an explicit classification. Retry policy lives
//! in the resolver and keys off [`TransportError::is_retryable`] alone, so
//! the classification boundary is defined here and nowhere else.

mod http;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::types::ConnectionContext;

pub use http::{HttpTransport, HttpTransportFactory};

/// Classified transport failures.
///
/// Exactly one variant is retryable: a timed-out attempt. Everything else
/// resolves to "no result" immediately at the resolver boundary.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The attempt exceeded its wall-clock budget.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The caller's cancellation token fired while the request was in flight.
    #[error("request cancelled")]
    Cancelled,

    /// The server answered with a non-2xx status.
    #[error("server returned status {0}")]
    Status(u16),

    /// Connection, DNS, TLS, or body-decoding failure.
    #[error("network error: {0}")]
    Network(String),

    /// The connection context cannot produce a usable endpoint.
    #[error("invalid connection context: {0}")]
    Connection(String),
}

impl TransportError {
    /// Only timeouts are worth a second attempt; refused connections, bad
    /// statuses, and cancellations are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransportError::Timeout(_))
    }
}

pub type TransportResult<T> = Result<T, TransportError>;

/// One request/response exchange against a resolution server.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `body` as JSON to `path` (relative to the transport's base URL)
    /// and return the parsed 2xx response body.
    ///
    /// The exchange must settle within `timeout` and must abort promptly
    /// when `cancel` fires, reporting [`TransportError::Cancelled`].
    async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> TransportResult<serde_json::Value>;
}

/// Builds a [`Transport`] for a document's connection context.
///
/// Constructed per lookup so the transport always reflects the current
/// connection; nothing is shared or cached across calls.
pub trait TransportFactory: Send + Sync {
    fn create(&self, connection: &ConnectionContext) -> TransportResult<Box<dyn Transport>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_timeouts_are_retryable() {
        assert!(TransportError::Timeout(Duration::from_millis(500)).is_retryable());
        assert!(!TransportError::Cancelled.is_retryable());
        assert!(!TransportError::Status(502).is_retryable());
        assert!(!TransportError::Network("connection refused".into()).is_retryable());
        assert!(!TransportError::Connection("missing host".into()).is_retryable());
    }
}
