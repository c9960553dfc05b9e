//! Remote-then-fallback definition provider.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::extract::{QueryMatch, extract_at};
use crate::types::{ConnectionContext, Document, Location, Position};

use super::remote::RemoteResolver;

/// What a resolution produced: the remote path yields a single location,
/// fallback providers may yield several.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Definition {
    Single(Location),
    Many(Vec<Location>),
}

impl Definition {
    pub fn into_locations(self) -> Vec<Location> {
        match self {
            Definition::Single(location) => vec![location],
            Definition::Many(locations) => locations,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Definition::Single(_) => false,
            Definition::Many(locations) => locations.is_empty(),
        }
    }
}

/// Supplies the connection context for a document. Called fresh on every
/// lookup; the provider never caches what it returns.
pub trait ConnectionResolver: Send + Sync {
    fn resolve_connection(&self, document_uri: &str) -> ConnectionContext;
}

/// The host editor's own definition lookup, tried when the remote path
/// yields nothing. Opaque: it may return zero, one, or many candidates.
#[async_trait]
pub trait FallbackResolver: Send + Sync {
    async fn resolve(
        &self,
        document: &Document,
        position: Position,
        cancel: &CancellationToken,
    ) -> Option<Definition>;
}

type MissCallback = Box<dyn Fn(&QueryMatch) + Send + Sync>;

/// Ordered resolution chain: extract a query at the cursor, try the remote
/// resolver, delegate to the fallback only when the remote path produced
/// nothing. A remote hit always wins, even if the fallback would also
/// succeed.
pub struct PrioritizedProvider {
    remote: RemoteResolver,
    connections: Arc<dyn ConnectionResolver>,
    fallback: Option<Arc<dyn FallbackResolver>>,
    on_remote_miss: Option<MissCallback>,
}

impl PrioritizedProvider {
    pub fn new(remote: RemoteResolver, connections: Arc<dyn ConnectionResolver>) -> Self {
        Self {
            remote,
            connections,
            fallback: None,
            on_remote_miss: None,
        }
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn FallbackResolver>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Informational hook fired when an extracted query misses remotely.
    /// Has no effect on control flow.
    pub fn on_remote_miss(mut self, callback: impl Fn(&QueryMatch) + Send + Sync + 'static) -> Self {
        self.on_remote_miss = Some(Box::new(callback));
        self
    }

    /// Resolve the definition for the reference under `position`.
    ///
    /// With no recognizable reference at the cursor there is nothing to ask
    /// the server, so the fallback is consulted directly. A remote miss of
    /// any kind (skip, timeout, error, empty payload) also delegates; the
    /// fallback's answer is returned verbatim, empty or not.
    pub async fn provide_definition(
        &self,
        document: &Document,
        position: Position,
        cancel: &CancellationToken,
    ) -> Option<Definition> {
        let matched = document
            .line(position.line)
            .and_then(|line| extract_at(line, position.character));

        if let Some(matched) = &matched {
            let connection = self.connections.resolve_connection(document.uri());
            if let Some(location) = self
                .remote
                .resolve(&matched.normalized_query, &connection, cancel)
                .await
            {
                crate::debug_event!(
                    "provider",
                    "resolved remotely",
                    "{} -> {}:{}",
                    matched.normalized_query,
                    location.uri,
                    location.line
                );
                return Some(Definition::Single(location));
            }
            if let Some(notify) = &self.on_remote_miss {
                notify(matched);
            }
            crate::debug_event!(
                "provider",
                "remote miss",
                "delegating {}",
                matched.normalized_query
            );
        }

        match &self.fallback {
            Some(fallback) => fallback.resolve(document, position, cancel).await,
            None => None,
        }
    }
}
