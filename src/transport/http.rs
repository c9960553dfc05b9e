//! HTTP transport over reqwest.
//!
//! Assembles the base URL from a connection context (scheme from the TLS
//! flag, optional normalized path prefix, fixed API base path), attaches
//! basic auth, and runs each exchange under a per-request timeout raced
//! against the caller's cancellation token.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use tokio_util::sync::CancellationToken;

use crate::types::{ConnectionContext, Credentials};

use super::{Transport, TransportError, TransportFactory, TransportResult};

/// Fixed API base path on the resolution server, mounted after any
/// connection-level path prefix.
const API_BASE_PATH: &str = "api/sourcecontrol";

/// [`Transport`] implementation backed by a reqwest client.
pub struct HttpTransport {
    client: reqwest::Client,
    base: Url,
    credentials: Option<Credentials>,
}

impl HttpTransport {
    /// Build a transport for one connection context.
    ///
    /// Requires host and port; everything else is optional here (the
    /// resolver checks the full precondition set before asking for a
    /// transport at all).
    pub fn from_connection(connection: &ConnectionContext) -> TransportResult<Self> {
        let host = connection
            .host
            .as_deref()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| TransportError::Connection("no host configured".into()))?;
        let port = connection
            .port
            .ok_or_else(|| TransportError::Connection("no port configured".into()))?;

        let scheme = if connection.tls { "https" } else { "http" };
        let prefix = normalize_prefix(connection.path_prefix.as_deref());
        let base = format!("{scheme}://{host}:{port}{prefix}/{API_BASE_PATH}");
        let base = Url::parse(&base)
            .map_err(|e| TransportError::Connection(format!("invalid endpoint {base}: {e}")))?;

        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| TransportError::Connection(format!("http client: {e}")))?;

        Ok(Self {
            client,
            base,
            credentials: connection.credentials.clone(),
        })
    }

    /// The assembled endpoint root, ending in the API base path.
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> TransportResult<Url> {
        let mut url = self.base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| TransportError::Connection("endpoint cannot be a base".into()))?;
            segments.pop_if_empty();
            // Pushed segment-wise so namespace characters like `%` get
            // percent-encoded instead of corrupting the path.
            for segment in path.split('/').filter(|s| !s.is_empty()) {
                segments.push(segment);
            }
        }
        Ok(url)
    }
}

fn normalize_prefix(prefix: Option<&str>) -> String {
    match prefix {
        None | Some("") => String::new(),
        Some(p) => {
            let p = p.strip_suffix('/').unwrap_or(p);
            if p.starts_with('/') {
                p.to_string()
            } else {
                format!("/{p}")
            }
        }
    }
}

fn classify(error: reqwest::Error, budget: Duration) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout(budget)
    } else {
        TransportError::Network(error.to_string())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> TransportResult<serde_json::Value> {
        let url = self.endpoint(path)?;

        let mut request = self.client.post(url).json(body).timeout(timeout);
        if let Some(creds) = &self.credentials {
            request = request.basic_auth(&creds.username, Some(&creds.password));
        }

        let exchange = async {
            let response = request.send().await.map_err(|e| classify(e, timeout))?;
            let status = response.status();
            if !status.is_success() {
                return Err(TransportError::Status(status.as_u16()));
            }
            response
                .json::<serde_json::Value>()
                .await
                .map_err(|e| classify(e, timeout))
        };

        // Dropping the in-flight future aborts the underlying request; the
        // token registration is released on every exit path.
        tokio::select! {
            _ = cancel.cancelled() => Err(TransportError::Cancelled),
            result = exchange => result,
        }
    }
}

/// Default factory: one [`HttpTransport`] per lookup, built from the
/// lookup's connection context.
#[derive(Debug, Default)]
pub struct HttpTransportFactory;

impl TransportFactory for HttpTransportFactory {
    fn create(&self, connection: &ConnectionContext) -> TransportResult<Box<dyn Transport>> {
        Ok(Box::new(HttpTransport::from_connection(connection)?))
    }
}
