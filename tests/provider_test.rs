//! Prioritized provider chain: remote wins, fallback fires exactly once on
//! a miss, and links re-enter the same path on activation.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use caretnav::{
    Definition, Document, FallbackResolver, Location, Position, PrioritizedProvider,
    RemoteResolver, follow_link, provide_links,
};
use common::{MockFactory, MockTransport, Reply, StaticConnections, full_context};
use serde_json::json;
use tokio_util::sync::CancellationToken;

/// Fallback double: counts invocations and returns a fixed answer.
struct CountingFallback {
    calls: AtomicU32,
    answer: Option<Definition>,
}

impl CountingFallback {
    fn returning(answer: Option<Definition>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
            answer,
        })
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FallbackResolver for CountingFallback {
    async fn resolve(
        &self,
        _document: &Document,
        _position: Position,
        _cancel: &CancellationToken,
    ) -> Option<Definition> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer.clone()
    }
}

fn provider(
    transport: &Arc<MockTransport>,
    fallback: Arc<CountingFallback>,
) -> PrioritizedProvider {
    PrioritizedProvider::new(
        RemoteResolver::new(MockFactory::new(transport.clone())),
        Arc::new(StaticConnections(full_context())),
    )
    .with_fallback(fallback)
}

#[tokio::test]
async fn remote_hit_wins_and_fallback_is_never_invoked() {
    let transport = MockTransport::scripted(vec![Reply::Payload(json!({
        "uri": "/src/Foo.mac",
        "line": 7
    }))]);
    // A fallback that would also succeed
    let fallback =
        CountingFallback::returning(Some(Definition::Single(Location::new("/other", 0, 0))));
    let provider = provider(&transport, fallback.clone());

    let document = Document::new("file:///t.mac", "Do ^Foo");
    let result = provider
        .provide_definition(&document, Position::new(0, 4), &CancellationToken::new())
        .await;

    assert_eq!(
        result,
        Some(Definition::Single(Location::new("/src/Foo.mac", 6, 0)))
    );
    assert_eq!(fallback.calls(), 0);
    assert_eq!(transport.queries(), vec!["^Foo"]);
}

#[tokio::test]
async fn remote_miss_delegates_exactly_once_and_returns_verbatim() {
    let transport = MockTransport::scripted(vec![Reply::Status(404)]);
    // Even an empty fallback answer is returned as-is
    let fallback = CountingFallback::returning(Some(Definition::Many(vec![])));
    let provider = provider(&transport, fallback.clone());

    let document = Document::new("file:///t.mac", "Do ^Foo");
    let result = provider
        .provide_definition(&document, Position::new(0, 4), &CancellationToken::new())
        .await;

    assert_eq!(result, Some(Definition::Many(vec![])));
    assert_eq!(fallback.calls(), 1);
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn no_reference_at_cursor_skips_the_remote_entirely() {
    let transport = MockTransport::scripted(vec![]);
    let fallback =
        CountingFallback::returning(Some(Definition::Single(Location::new("/native", 2, 0))));
    let provider = provider(&transport, fallback.clone());

    // Cursor on plain text, not a reference
    let document = Document::new("file:///t.mac", "Set x = 1  ; Do ^Foo later");
    let result = provider
        .provide_definition(&document, Position::new(0, 5), &CancellationToken::new())
        .await;

    assert_eq!(
        result,
        Some(Definition::Single(Location::new("/native", 2, 0)))
    );
    assert_eq!(transport.calls(), 0);
    assert_eq!(fallback.calls(), 1);
}

#[tokio::test]
async fn position_past_the_document_delegates() {
    let transport = MockTransport::scripted(vec![]);
    let fallback = CountingFallback::returning(None);
    let provider = provider(&transport, fallback.clone());

    let document = Document::new("file:///t.mac", "Do ^Foo");
    let result = provider
        .provide_definition(&document, Position::new(9, 0), &CancellationToken::new())
        .await;

    assert_eq!(result, None);
    assert_eq!(transport.calls(), 0);
    assert_eq!(fallback.calls(), 1);
}

#[tokio::test]
async fn without_a_fallback_a_miss_is_absent() {
    let transport = MockTransport::scripted(vec![Reply::Network]);
    let provider = PrioritizedProvider::new(
        RemoteResolver::new(MockFactory::new(transport.clone())),
        Arc::new(StaticConnections(full_context())),
    );

    let document = Document::new("file:///t.mac", "Do ^Foo");
    let result = provider
        .provide_definition(&document, Position::new(0, 4), &CancellationToken::new())
        .await;

    assert_eq!(result, None);
}

#[tokio::test]
async fn miss_callback_is_informational_only() {
    let transport = MockTransport::scripted(vec![Reply::Status(500)]);
    let fallback = CountingFallback::returning(None);
    let missed = Arc::new(AtomicU32::new(0));
    let missed_in_callback = missed.clone();

    let provider = PrioritizedProvider::new(
        RemoteResolver::new(MockFactory::new(transport.clone())),
        Arc::new(StaticConnections(full_context())),
    )
    .with_fallback(fallback.clone())
    .on_remote_miss(move |matched| {
        assert_eq!(matched.normalized_query, "^Foo");
        missed_in_callback.fetch_add(1, Ordering::SeqCst);
    });

    let document = Document::new("file:///t.mac", "Do ^Foo");
    let result = provider
        .provide_definition(&document, Position::new(0, 4), &CancellationToken::new())
        .await;

    assert_eq!(result, None);
    assert_eq!(missed.load(Ordering::SeqCst), 1);
    assert_eq!(fallback.calls(), 1);
}

#[tokio::test]
async fn link_activation_reenters_the_resolution_path() {
    let transport = MockTransport::scripted(vec![Reply::Payload(json!({
        "uri": "/src/Beta.mac",
        "line": 1
    }))]);
    let fallback = CountingFallback::returning(None);
    let provider = provider(&transport, fallback);

    let document = Document::new("file:///t.mac", " Quit\nDo $$Run^Beta");
    let links = provide_links(&document);
    assert_eq!(links.len(), 1);

    let link = &links[0];
    let result = follow_link(
        &provider,
        &document,
        link.args.line,
        link.args.character,
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(
        result,
        Some(Definition::Single(Location::new("/src/Beta.mac", 0, 0)))
    );
    // The query was re-extracted at activation time, normalized form sent
    assert_eq!(transport.queries(), vec!["Run^Beta"]);
}
