//! Core value types shared across the resolution pipeline.
//!
//! Everything here is a plain value object: no I/O, no shared mutable state.
//! `ConnectionContext` is supplied fresh per call by the host integration and
//! is never cached or mutated by the pipeline.

use serde::{Deserialize, Serialize};

/// A cursor position inside a document. `character` is a byte offset within
/// the line; the recognized reference grammar is ASCII, so integrations
/// using UTF-16 columns can convert at their own boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

/// A half-open byte range `[start, end)` within a single line of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Whether a cursor offset counts as "on" this span. Both boundary
    /// offsets are included: a cursor sitting immediately after the last
    /// character still addresses the reference.
    pub fn covers(&self, offset: u32) -> bool {
        offset >= self.start && offset <= self.end
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// A resolved definition site. `line` and `column` are 0-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub uri: String,
    pub line: u32,
    pub column: u32,
}

impl Location {
    pub fn new(uri: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            uri: uri.into(),
            line,
            column,
        }
    }

    /// Build a location from a wire payload's fields.
    ///
    /// The wire line is 1-based and may be fractional; it is floored and
    /// converted with `max(0, floor(line) - 1)`. Backslash separators are
    /// normalized so Windows-style paths stay clickable. Column is always 0.
    pub fn from_wire(uri: &str, line: f64) -> Self {
        let zero_based = (line.floor() as i64 - 1).max(0) as u32;
        Self {
            uri: uri.replace('\\', "/"),
            line: zero_based,
            column: 0,
        }
    }
}

/// An in-memory document: identity plus current text.
///
/// The pipeline never reads documents from disk itself; the host supplies
/// them (and re-supplies them on change, since nothing here is cached).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    uri: String,
    text: String,
}

impl Document {
    pub fn new(uri: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            text: text.into(),
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.lines()
    }

    /// The text of line `n` (0-based), or `None` past the end.
    pub fn line(&self, n: u32) -> Option<&str> {
        self.text.lines().nth(n as usize)
    }

    pub fn line_count(&self) -> u32 {
        self.text.lines().count() as u32
    }

    /// Index of the last line, 0 for an empty document.
    pub fn last_line(&self) -> u32 {
        self.line_count().saturating_sub(1)
    }
}

/// Basic-auth credentials for the resolution server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Connection metadata for one document's resolution server, supplied by the
/// host per call.
///
/// Resolution is skipped entirely (treated as "no result", not an error)
/// unless the context is active and carries namespace, host, port, and
/// credentials. See [`ConnectionContext::is_complete`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionContext {
    pub active: bool,
    pub namespace: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub tls: bool,
    /// Optional URL path prefix in front of the API base path.
    pub path_prefix: Option<String>,
    pub credentials: Option<Credentials>,
}

impl ConnectionContext {
    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    /// Hard precondition for any remote lookup: active and nothing missing.
    pub fn is_complete(&self) -> bool {
        self.active
            && self.namespace.as_deref().is_some_and(|s| !s.is_empty())
            && self.host.as_deref().is_some_and(|s| !s.is_empty())
            && self.port.is_some()
            && self.has_credentials()
    }
}
