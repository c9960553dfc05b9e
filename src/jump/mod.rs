//! Label+offset jumps within routines.
//!
//! A jump target names a line by `Label[+Offset]^Routine`: the label's line
//! plus a signed delta. Resolution is two-phase — the label lookup first,
//! then (only on a miss) a bare-routine lookup whose sole purpose is to tell
//! the user *which* name was wrong. The two lookups are strictly
//! sequential, never concurrent.

use std::fmt;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::Regex;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::resolve::{ConnectionResolver, RemoteResolver};
use crate::types::{Document, Location};

/// A parsed jump target. `offset_lines` of 0 addresses the label line
/// itself; the input grammar only produces non-negative offsets, but the
/// field is signed for callers constructing requests directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JumpRequest {
    pub routine: String,
    pub label: String,
    pub offset_lines: i64,
}

/// Rejected jump-target input. User-facing; raised before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JumpTargetError {
    #[error("invalid jump target: expected Label+Offset^Routine")]
    MissingCaret,
    #[error("invalid label segment `{0}`: expected Label or Label+Offset")]
    InvalidLabel(String),
    #[error("invalid routine segment `{0}`: expected a routine name")]
    InvalidRoutine(String),
}

fn label_segment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(%?[A-Za-z]\w*)(?:\+(\d+))?$").expect("label segment pattern compiles")
    })
}

fn routine_segment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^%?[A-Za-z]\w*$").expect("routine segment pattern compiles"))
}

/// Parse raw `Label[+Offset]^Routine` input.
///
/// Split at the first `^`; each segment must match its shape exactly, so
/// embedded whitespace or a missing caret rejects the input with no network
/// traffic.
pub fn parse_jump_target(raw: &str) -> Result<JumpRequest, JumpTargetError> {
    let (label_segment, routine_segment) =
        raw.split_once('^').ok_or(JumpTargetError::MissingCaret)?;

    let caps = label_segment_re()
        .captures(label_segment)
        .ok_or_else(|| JumpTargetError::InvalidLabel(label_segment.to_string()))?;
    if !routine_segment_re().is_match(routine_segment) {
        return Err(JumpTargetError::InvalidRoutine(routine_segment.to_string()));
    }

    let offset_lines = match caps.get(2) {
        Some(digits) => digits
            .as_str()
            .parse::<i64>()
            .map_err(|_| JumpTargetError::InvalidLabel(label_segment.to_string()))?,
        None => 0,
    };

    Ok(JumpRequest {
        routine: routine_segment.to_string(),
        label: caps[1].to_string(),
        offset_lines,
    })
}

/// How a jump ended. The two miss variants are distinct user-facing
/// messages, not generic failures: the second lookup decides which applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JumpOutcome {
    Resolved(Location),
    /// The routine exists (verified by a bare-routine lookup) but the label
    /// does not.
    LabelNotFound { routine: String, label: String },
    RoutineNotFound { routine: String },
}

impl fmt::Display for JumpOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JumpOutcome::Resolved(location) => {
                write!(f, "{} line {}", location.uri, location.line + 1)
            }
            JumpOutcome::LabelNotFound { routine, label } => {
                write!(f, "Label {label} not found in {routine}")
            }
            JumpOutcome::RoutineNotFound { routine } => {
                write!(f, "Routine {routine} not found in the current workspace")
            }
        }
    }
}

/// Host capability for reaching documents: open a target so its length is
/// known, and move the user's cursor. This core only computes targets.
#[async_trait]
pub trait DocumentAccess: Send + Sync {
    async fn open(&self, uri: &str) -> Option<Document>;
    async fn reveal(&self, location: &Location);
}

/// Resolves label+offset jumps through the remote resolver.
pub struct JumpResolver {
    remote: RemoteResolver,
    connections: Arc<dyn ConnectionResolver>,
    documents: Arc<dyn DocumentAccess>,
}

impl JumpResolver {
    pub fn new(
        remote: RemoteResolver,
        connections: Arc<dyn ConnectionResolver>,
        documents: Arc<dyn DocumentAccess>,
    ) -> Self {
        Self {
            remote,
            connections,
            documents,
        }
    }

    /// Resolve a jump scoped to `source` (the document whose connection the
    /// lookup runs under). Without a source document this is a no-op.
    ///
    /// On a label hit the target line is the label's line plus the offset,
    /// clamped to the target document's bounds, and the cursor is revealed
    /// there. On a miss the bare-routine probe decides between the two
    /// not-found outcomes. Each lookup runs under its own cancellation
    /// scope, released when the lookup settles.
    pub async fn resolve_jump(
        &self,
        source: Option<&Document>,
        request: &JumpRequest,
    ) -> Option<JumpOutcome> {
        let source = source?;
        let connection = self.connections.resolve_connection(source.uri());

        let query = format!("{}^{}", request.label, request.routine);
        let cancel = CancellationToken::new();
        let Some(location) = self.remote.resolve(&query, &connection, &cancel).await else {
            let probe = CancellationToken::new();
            let bare = format!("^{}", request.routine);
            let outcome = match self.remote.resolve(&bare, &connection, &probe).await {
                Some(_) => JumpOutcome::LabelNotFound {
                    routine: request.routine.clone(),
                    label: request.label.clone(),
                },
                None => JumpOutcome::RoutineNotFound {
                    routine: request.routine.clone(),
                },
            };
            return Some(outcome);
        };

        let Some(target) = self.documents.open(&location.uri).await else {
            tracing::warn!("[jump] could not open {}", location.uri);
            return None;
        };

        let last_line = i64::from(target.last_line());
        let target_line = (i64::from(location.line) + request.offset_lines).clamp(0, last_line);
        let destination = Location::new(location.uri, target_line as u32, 0);
        self.documents.reveal(&destination).await;
        crate::log_event!(
            "jump",
            "revealed",
            "{} line {}",
            destination.uri,
            destination.line + 1
        );
        Some(JumpOutcome::Resolved(destination))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_label_offset_routine() {
        let req = parse_jump_target("Start+3^Foo").unwrap();
        assert_eq!(req.label, "Start");
        assert_eq!(req.offset_lines, 3);
        assert_eq!(req.routine, "Foo");
    }

    #[test]
    fn offset_defaults_to_zero() {
        let req = parse_jump_target("Start^Foo").unwrap();
        assert_eq!(req.offset_lines, 0);
    }

    #[test]
    fn percent_names_are_accepted() {
        let req = parse_jump_target("%Init^%Monitor").unwrap();
        assert_eq!(req.label, "%Init");
        assert_eq!(req.routine, "%Monitor");
    }

    #[test]
    fn missing_caret_is_rejected() {
        assert_eq!(
            parse_jump_target("StartFoo"),
            Err(JumpTargetError::MissingCaret)
        );
    }

    #[test]
    fn whitespace_is_rejected() {
        assert!(matches!(
            parse_jump_target("Start +3^Foo"),
            Err(JumpTargetError::InvalidLabel(_))
        ));
        assert!(matches!(
            parse_jump_target("Start+3^Foo Bar"),
            Err(JumpTargetError::InvalidRoutine(_))
        ));
    }

    #[test]
    fn malformed_segments_are_rejected() {
        assert!(matches!(
            parse_jump_target("1Start^Foo"),
            Err(JumpTargetError::InvalidLabel(_))
        ));
        assert!(matches!(
            parse_jump_target("Start+^Foo"),
            Err(JumpTargetError::InvalidLabel(_))
        ));
        assert!(matches!(
            parse_jump_target("Start^Foo.Bar"),
            Err(JumpTargetError::InvalidRoutine(_))
        ));
        assert!(matches!(
            parse_jump_target("Start^"),
            Err(JumpTargetError::InvalidRoutine(_))
        ));
    }

    #[test]
    fn splits_at_the_first_caret() {
        // The second caret lands in the routine segment and fails its shape.
        assert!(matches!(
            parse_jump_target("Start^Foo^Bar"),
            Err(JumpTargetError::InvalidRoutine(_))
        ));
    }

    #[test]
    fn outcome_messages_name_the_missing_piece() {
        let label_missing = JumpOutcome::LabelNotFound {
            routine: "Foo".into(),
            label: "Start".into(),
        };
        assert_eq!(label_missing.to_string(), "Label Start not found in Foo");

        let routine_missing = JumpOutcome::RoutineNotFound {
            routine: "Foo".into(),
        };
        assert_eq!(
            routine_missing.to_string(),
            "Routine Foo not found in the current workspace"
        );
    }
}
