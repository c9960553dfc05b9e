//! Remote definition lookups with a bounded-retry timeout contract.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::transport::{TransportError, TransportFactory};
use crate::types::{ConnectionContext, Location};

use super::routes;

/// Wall-clock budget for a single network attempt.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);

/// Total attempts for one logical lookup. Only timeout-classified failures
/// consume the second attempt.
pub const MAX_ATTEMPTS: u32 = 2;

const BACKOFF_FLOOR: Duration = Duration::from_millis(150);
const BACKOFF_CEILING: Duration = Duration::from_millis(500);

/// Delay between a timed-out attempt and its retry: a tenth of the
/// configured timeout, clamped to [150ms, 500ms].
pub fn backoff_interval(timeout: Duration) -> Duration {
    (timeout / 10).clamp(BACKOFF_FLOOR, BACKOFF_CEILING)
}

/// Asks the resolution server where a query's symbol is defined.
///
/// Stateless per call: the transport is built fresh from each lookup's
/// connection context and nothing is cached. All failures degrade to
/// `None` so callers can fall back to their native provider.
pub struct RemoteResolver {
    factory: Arc<dyn TransportFactory>,
    timeout: Duration,
    max_attempts: u32,
}

impl RemoteResolver {
    pub fn new(factory: Arc<dyn TransportFactory>) -> Self {
        Self {
            factory,
            timeout: DEFAULT_TIMEOUT,
            max_attempts: MAX_ATTEMPTS,
        }
    }

    /// Override the per-attempt timeout (the retry backoff scales with it).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Resolve `query` to a location, or `None`.
    ///
    /// Short-circuits without any network call when the connection context
    /// is incomplete or the query is empty. Issues at most
    /// `max_attempts` transport calls, retrying only after a timeout, and
    /// absorbs every failure (timeout, cancellation, transport, malformed
    /// payload) into `None`.
    pub async fn resolve(
        &self,
        query: &str,
        connection: &ConnectionContext,
        cancel: &CancellationToken,
    ) -> Option<Location> {
        if query.is_empty() {
            crate::debug_event!("resolver", "skipped", "empty query");
            return None;
        }
        if !connection.is_complete() {
            crate::debug_event!(
                "resolver",
                "skipped",
                "connection metadata incomplete (active={}, namespace={:?}, host={:?}, port={:?}, credentials={})",
                connection.active,
                connection.namespace,
                connection.host,
                connection.port,
                connection.has_credentials()
            );
            return None;
        }

        let transport = match self.factory.create(connection) {
            Ok(transport) => transport,
            Err(error) => {
                crate::debug_event!("resolver", "no transport", "{error}");
                return None;
            }
        };

        let namespace = connection.namespace.as_deref().unwrap_or_default();
        let path = routes::resolve_definition(namespace);
        let body = serde_json::json!({ "query": query });
        let backoff = backoff_interval(self.timeout);

        for attempt in 1..=self.max_attempts {
            match transport.post_json(&path, &body, self.timeout, cancel).await {
                Ok(payload) => {
                    let location = location_from_payload(&payload);
                    if location.is_none() {
                        crate::debug_event!("resolver", "empty payload", "{payload}");
                    }
                    return location;
                }
                Err(error) if error.is_retryable() && attempt < self.max_attempts => {
                    crate::debug_event!(
                        "resolver",
                        "retrying",
                        "attempt {attempt} timed out, backing off {backoff:?}"
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            crate::debug_event!("resolver", "cancelled", "during backoff");
                            return None;
                        }
                        _ = tokio::time::sleep(backoff) => {}
                    }
                }
                Err(TransportError::Cancelled) => {
                    crate::debug_event!("resolver", "cancelled", "query {query}");
                    return None;
                }
                Err(error) => {
                    crate::debug_event!("resolver", "lookup failed", "{error}");
                    return None;
                }
            }
        }
        None
    }
}

/// Accept a payload only when it carries a non-empty `uri` string and a
/// numeric `line`; anything else is "no result".
fn location_from_payload(payload: &serde_json::Value) -> Option<Location> {
    let uri = payload.get("uri")?.as_str()?;
    if uri.is_empty() {
        return None;
    }
    let line = payload.get("line")?.as_f64()?;
    Some(Location::from_wire(uri, line))
}
