//! Moderation metadata handling
//!
//! The moderation service answers with a JSON object carrying at least a
//! `source_name` and a `pass` flag. Failed or partial calls produce empty
//! bodies, `null` or objects without a source; those must never overwrite a
//! previously stored result.

use serde_json::Value;
use tracing::warn;

use super::model::{Question, UpdateQuestionCensorOptions};

/// Parse a raw moderation response, returning it only if it is usable.
///
/// A response is usable when it is a JSON object with a non-empty
/// `source_name` string.
#[must_use]
pub fn parse_response(raw: &str) -> Option<Value> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let has_source = value
        .get("source_name")
        .and_then(Value::as_str)
        .is_some_and(|name| !name.is_empty());
    (value.is_object() && has_source).then_some(value)
}

/// Whether a raw moderation response is usable
#[must_use]
pub fn is_valid_response(raw: &str) -> bool {
    parse_response(raw).is_some()
}

/// Whether stored metadata records a passing result
#[must_use]
pub fn passed(metadata: Option<&Value>) -> bool {
    metadata
        .and_then(|m| m.get("pass"))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// Metadata to store after applying `opts` to `current`.
///
/// Returns `(content, answer)`; each side keeps the stored value unless its
/// candidate is usable.
pub(crate) fn merge(
    current: &Question,
    opts: &UpdateQuestionCensorOptions,
) -> (Option<Value>, Option<Value>) {
    let content = pick(
        current.id,
        "content",
        current.content_censor_metadata.as_ref(),
        opts.content_censor_metadata.as_deref(),
    );
    let answer = pick(
        current.id,
        "answer",
        current.answer_censor_metadata.as_ref(),
        opts.answer_censor_metadata.as_deref(),
    );
    (content, answer)
}

fn pick(
    question_id: i64,
    field: &str,
    stored: Option<&Value>,
    candidate: Option<&str>,
) -> Option<Value> {
    match candidate.map(|raw| (raw, parse_response(raw))) {
        Some((_, Some(parsed))) => Some(parsed),
        Some((raw, None)) => {
            if !raw.is_empty() {
                warn!(
                    question_id,
                    field, "Discarding invalid censor response, keeping stored metadata"
                );
            }
            stored.cloned()
        }
        None => stored.cloned(),
    }
}
