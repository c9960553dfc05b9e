//! Shared test doubles for the resolution pipeline.
#![allow(dead_code)] // not every test file exercises every double

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use caretnav::transport::TransportResult;
use caretnav::{
    ConnectionContext, ConnectionResolver, Credentials, Transport, TransportError,
    TransportFactory,
};
use tokio_util::sync::CancellationToken;

/// One scripted transport reply, consumed in order.
pub enum Reply {
    Payload(serde_json::Value),
    Timeout,
    Network,
    Status(u16),
    Cancelled,
}

/// Transport double that records every exchange and plays back a script.
pub struct MockTransport {
    calls: AtomicU32,
    requests: Mutex<Vec<(String, serde_json::Value)>>,
    script: Mutex<VecDeque<Reply>>,
}

impl MockTransport {
    pub fn scripted(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
            requests: Mutex::new(Vec::new()),
            script: Mutex::new(replies.into()),
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// `(path, body)` pairs in the order they were issued.
    pub fn requests(&self) -> Vec<(String, serde_json::Value)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn queries(&self) -> Vec<String> {
        self.requests()
            .iter()
            .filter_map(|(_, body)| body.get("query")?.as_str().map(str::to_string))
            .collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
        timeout: Duration,
        _cancel: &CancellationToken,
    ) -> TransportResult<serde_json::Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap()
            .push((path.to_string(), body.clone()));

        match self.script.lock().unwrap().pop_front() {
            Some(Reply::Payload(payload)) => Ok(payload),
            Some(Reply::Timeout) => Err(TransportError::Timeout(timeout)),
            Some(Reply::Network) => Err(TransportError::Network("connection refused".into())),
            Some(Reply::Status(code)) => Err(TransportError::Status(code)),
            Some(Reply::Cancelled) => Err(TransportError::Cancelled),
            None => Err(TransportError::Network("script exhausted".into())),
        }
    }
}

/// Hands every lookup the same shared [`MockTransport`].
pub struct MockFactory {
    pub transport: Arc<MockTransport>,
}

impl MockFactory {
    pub fn new(transport: Arc<MockTransport>) -> Arc<Self> {
        Arc::new(Self { transport })
    }
}

struct SharedTransport(Arc<MockTransport>);

#[async_trait]
impl Transport for SharedTransport {
    async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> TransportResult<serde_json::Value> {
        self.0.post_json(path, body, timeout, cancel).await
    }
}

impl TransportFactory for MockFactory {
    fn create(&self, _connection: &ConnectionContext) -> TransportResult<Box<dyn Transport>> {
        Ok(Box::new(SharedTransport(self.transport.clone())))
    }
}

/// A complete, active connection context.
pub fn full_context() -> ConnectionContext {
    ConnectionContext {
        active: true,
        namespace: Some("USER".into()),
        host: Some("localhost".into()),
        port: Some(52773),
        tls: false,
        path_prefix: None,
        credentials: Some(Credentials {
            username: "dev".into(),
            password: "dev".into(),
        }),
    }
}

/// Connection resolution that always answers with the same context.
pub struct StaticConnections(pub ConnectionContext);

impl ConnectionResolver for StaticConnections {
    fn resolve_connection(&self, _document_uri: &str) -> ConnectionContext {
        self.0.clone()
    }
}
