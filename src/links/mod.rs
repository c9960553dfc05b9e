//! Clickable reference links across a whole document.
//!
//! Enumeration and navigation are deliberately decoupled: a link only
//! records *where* a reference sits and which command follows it. Activating
//! the link re-enters the position-based resolution path, so the answer
//! always reflects the document text and resolver configuration at
//! activation time, never a cached result.

use tokio_util::sync::CancellationToken;

use crate::extract::extract_all;
use crate::resolve::{Definition, PrioritizedProvider};
use crate::types::{Document, Position, Span};

/// Command identifier hosts bind reference links to.
pub const FOLLOW_LINK_COMMAND: &str = "caretnav.followReference";

/// Arguments the follow command is invoked with: the match's start position
/// in its document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandArgs {
    pub uri: String,
    pub line: u32,
    pub character: u32,
}

/// One clickable range in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentLink {
    pub line: u32,
    pub span: Span,
    pub command: &'static str,
    pub args: CommandArgs,
}

/// Enumerate a clickable link for every recognizable reference in the
/// document. Recomputed from current text on each call.
pub fn provide_links(document: &Document) -> Vec<DocumentLink> {
    extract_all(document)
        .map(|m| DocumentLink {
            line: m.line,
            span: m.query.span,
            command: FOLLOW_LINK_COMMAND,
            args: CommandArgs {
                uri: document.uri().to_string(),
                line: m.line,
                character: m.query.span.start,
            },
        })
        .collect()
}

/// Activate a link: re-extract at the recorded position and resolve through
/// the prioritized chain.
pub async fn follow_link(
    provider: &PrioritizedProvider,
    document: &Document,
    line: u32,
    character: u32,
    cancel: &CancellationToken,
) -> Option<Definition> {
    provider
        .provide_definition(document, Position::new(line, character), cancel)
        .await
}
