//! Definition resolution pipeline for caret-addressed scripting languages.
//!
//! Answers "where is this symbol defined?" by recognizing reference-shaped
//! substrings (`^Routine`, `$$Label^Routine`, `$$$MACRO`,
//! `##class(Class).Method`), asking a remote resolution server, and falling
//! back to the host editor's own lookup when the server has no answer.

pub mod config;
pub mod extract;
pub mod jump;
pub mod links;
pub mod logging;
pub mod resolve;
pub mod transport;
pub mod types;

pub use config::Settings;
pub use extract::{DocumentMatch, QueryKind, QueryMatch, extract_all, extract_at};
pub use jump::{
    DocumentAccess, JumpOutcome, JumpRequest, JumpResolver, JumpTargetError, parse_jump_target,
};
pub use links::{DocumentLink, FOLLOW_LINK_COMMAND, follow_link, provide_links};
pub use resolve::{
    ConnectionResolver, Definition, FallbackResolver, PrioritizedProvider, RemoteResolver,
};
pub use transport::{
    HttpTransport, HttpTransportFactory, Transport, TransportError, TransportFactory,
};
pub use types::{ConnectionContext, Credentials, Document, Location, Position, Span};
