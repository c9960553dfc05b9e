//! Syntactic recognition of code references in source text.
//!
//! Four reference shapes are recognized, tested in a fixed priority order:
//!
//! 1. label+routine: `$$Label^Routine[.Package]*`
//! 2. bare routine: `^Routine[.Package]*` (optionally `%`-prefixed)
//! 3. macro: `$$$NAME`
//! 4. class reference: `##class(Name)[.Method]` (keyword case-insensitive)
//!
//! [`extract_at`] answers "what reference is the cursor on"; [`extract_all`]
//! enumerates every reference in a document for link rendering. Both are
//! pure text analysis with no I/O.

use std::sync::OnceLock;

use regex::Regex;

use crate::types::{Document, Span};

/// Which reference shape matched. Mutually exclusive; when spans of
/// different shapes overlap, the shape earlier in the priority order wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    LabelRoutine,
    Routine,
    Macro,
    Class,
}

impl QueryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKind::LabelRoutine => "label-routine",
            QueryKind::Routine => "routine",
            QueryKind::Macro => "macro",
            QueryKind::Class => "class",
        }
    }
}

/// One recognized reference within a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryMatch {
    /// The matched substring exactly as written.
    pub raw_text: String,
    /// Canonical form sent to the resolution server.
    pub normalized_query: String,
    pub kind: QueryKind,
    /// Primary identifier, for diagnostics: the routine, macro, or class name.
    pub symbol_name: String,
    /// Byte offsets of `raw_text` within the originating line.
    pub span: Span,
}

/// A [`QueryMatch`] anchored to its 0-based line in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMatch {
    pub line: u32,
    pub query: QueryMatch,
}

fn label_routine_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\$\$([%A-Za-z]\w*)\^([%A-Za-z]\w*(?:\.[%A-Za-z]\w*)*)")
            .expect("label-routine pattern compiles")
    })
}

fn routine_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\^(%?[A-Za-z]\w*(?:\.[%A-Za-z]\w*)*)").expect("routine pattern compiles")
    })
}

fn macro_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\$\$\$([%A-Za-z][%A-Za-z0-9_]*)").expect("macro pattern compiles")
    })
}

fn class_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)##class\s*\(\s*([%A-Za-z]\w*(?:\.[%A-Za-z]\w*)*)\s*\)(?:\s*\.\s*([%A-Za-z]\w*))?")
            .expect("class pattern compiles")
    })
}

fn leading_dollars_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\$\$+").expect("dollar-prefix pattern compiles"))
}

const KIND_ORDER: [QueryKind; 4] = [
    QueryKind::LabelRoutine,
    QueryKind::Routine,
    QueryKind::Macro,
    QueryKind::Class,
];

/// All non-overlapping matches of one shape on a line, in text order.
fn matches_of_kind(kind: QueryKind, line: &str) -> Vec<QueryMatch> {
    let mut out = Vec::new();
    match kind {
        QueryKind::LabelRoutine => {
            for caps in label_routine_re().captures_iter(line) {
                let whole = caps.get(0).expect("match has a whole capture");
                let raw = whole.as_str();
                // Only the leading $$ run is stripped; interior ones stay.
                let normalized = leading_dollars_re().replace(raw, "").into_owned();
                out.push(QueryMatch {
                    raw_text: raw.to_string(),
                    normalized_query: normalized,
                    kind,
                    symbol_name: caps[2].to_string(),
                    span: Span::new(whole.start() as u32, whole.end() as u32),
                });
            }
        }
        QueryKind::Routine => {
            for caps in routine_re().captures_iter(line) {
                let whole = caps.get(0).expect("match has a whole capture");
                out.push(QueryMatch {
                    raw_text: whole.as_str().to_string(),
                    normalized_query: whole.as_str().to_string(),
                    kind,
                    symbol_name: caps[1].to_string(),
                    span: Span::new(whole.start() as u32, whole.end() as u32),
                });
            }
        }
        QueryKind::Macro => {
            for caps in macro_re().captures_iter(line) {
                let whole = caps.get(0).expect("match has a whole capture");
                out.push(QueryMatch {
                    raw_text: whole.as_str().to_string(),
                    normalized_query: whole.as_str().to_string(),
                    kind,
                    symbol_name: caps[1].to_string(),
                    span: Span::new(whole.start() as u32, whole.end() as u32),
                });
            }
        }
        QueryKind::Class => {
            for caps in class_re().captures_iter(line) {
                let whole = caps.get(0).expect("match has a whole capture");
                let class_name = caps[1].to_string();
                // Reconstructed canonically: incidental whitespace dropped.
                let normalized = match caps.get(2) {
                    Some(method) => format!("##class({class_name}).{}", method.as_str()),
                    None => format!("##class({class_name})"),
                };
                out.push(QueryMatch {
                    raw_text: whole.as_str().to_string(),
                    normalized_query: normalized,
                    kind,
                    symbol_name: class_name,
                    span: Span::new(whole.start() as u32, whole.end() as u32),
                });
            }
        }
    }
    out
}

/// The reference the cursor is on, if any.
///
/// Each shape is scanned across the whole line; the first shape (in priority
/// order) with a span covering `char_offset` wins. Coverage includes both
/// boundary offsets.
pub fn extract_at(line_text: &str, char_offset: u32) -> Option<QueryMatch> {
    KIND_ORDER.iter().find_map(|&kind| {
        matches_of_kind(kind, line_text)
            .into_iter()
            .find(|m| m.span.covers(char_offset))
    })
}

/// Every reference on one line, with lower-priority matches suppressed when
/// their span overlaps a higher-priority one, ordered by start offset.
fn matches_on_line(line_text: &str) -> Vec<QueryMatch> {
    let mut found: Vec<QueryMatch> = Vec::new();
    for kind in KIND_ORDER {
        for candidate in matches_of_kind(kind, line_text) {
            if found.iter().any(|f| f.span.overlaps(&candidate.span)) {
                continue;
            }
            found.push(candidate);
        }
    }
    found.sort_by_key(|m| m.span.start);
    found
}

/// Enumerate every recognizable reference in a document.
///
/// Recomputed from the document's current text on each call; nothing is
/// cached between invocations.
pub fn extract_all(document: &Document) -> impl Iterator<Item = DocumentMatch> + '_ {
    document.lines().enumerate().flat_map(|(idx, text)| {
        matches_on_line(text).into_iter().map(move |query| DocumentMatch {
            line: idx as u32,
            query,
        })
    })
}
