//! Turning raw model completions into records.
//!
//! Completions are free text: the JSON array we asked for usually arrives
//! wrapped in prose or a markdown code fence. Extraction takes the span
//! from the first `[` to the last `]`; each element is then built into a
//! record on its own so one bad element never sinks the batch.

use std::collections::HashSet;

use serde_json::Value;

use crate::error::{CoreError, CoreResult};
use crate::record::{CalendarEvent, User};

/// Valid records built from one completion.
#[derive(Debug)]
pub struct Batch<T> {
    pub records: Vec<T>,
    /// Elements that failed validation.
    pub rejected: usize,
    /// Valid elements dropped because the model returned more than requested.
    pub truncated: usize,
    pub requested: usize,
}

impl<T> Batch<T> {
    /// Requested records that did not arrive.
    pub fn shortfall(&self) -> usize {
        self.requested.saturating_sub(self.records.len())
    }
}

/// Extract the JSON array embedded in a completion.
///
/// An empty array is a valid, empty result. Missing brackets or JSON that
/// cannot be recovered is a `Parse` error.
pub fn extract_array(raw: &str) -> CoreResult<Vec<Value>> {
    let (Some(start), Some(end)) = (raw.find('['), raw.rfind(']')) else {
        return Err(CoreError::Parse(format!(
            "no JSON array in response: {}",
            excerpt(raw)
        )));
    };

    if end < start {
        return Err(CoreError::Parse(format!(
            "no JSON array in response: {}",
            excerpt(raw)
        )));
    }

    let candidate = &raw[start..=end];
    if let Some(values) = decode_array(candidate) {
        return Ok(values);
    }

    // Prose after the array may itself contain brackets; fall back to the
    // balanced span that opens at the first `[`.
    if let Some(balanced) = balanced_span(raw, start) {
        if balanced.len() != candidate.len() {
            if let Some(values) = decode_array(balanced) {
                return Ok(values);
            }
        }
    }

    Err(CoreError::Parse(format!(
        "response is not a valid JSON array: {}",
        excerpt(candidate)
    )))
}

/// Decode as a JSON array, retrying once with trailing commas stripped.
fn decode_array(s: &str) -> Option<Vec<Value>> {
    if let Ok(values) = serde_json::from_str::<Vec<Value>>(s) {
        return Some(values);
    }

    serde_json::from_str::<Vec<Value>>(&strip_trailing_commas(s)).ok()
}

/// Drop commas that directly precede a closing `}` or `]`, outside strings.
fn strip_trailing_commas(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in s.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            out.push(c);
            continue;
        }

        match c {
            '"' => in_string = true,
            ',' => {
                let next = s[offset + 1..].trim_start().chars().next();
                if matches!(next, Some('}') | Some(']')) {
                    continue;
                }
            }
            _ => {}
        }
        out.push(c);
    }

    out
}

/// The substring from `start` up to its matching `]`, skipping brackets inside strings.
fn balanced_span(s: &str, start: usize) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in s[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '[' => depth += 1,
            ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&s[start..=start + offset]);
                }
            }
            _ => {}
        }
    }

    None
}

fn excerpt(s: &str) -> String {
    let trimmed = s.trim();
    match trimmed.char_indices().nth(120) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

/// Build records from decoded elements, keeping at most `requested` of them.
pub fn build_batch<T>(
    entries: Vec<Value>,
    requested: usize,
    mut build: impl FnMut(&Value) -> CoreResult<T>,
) -> Batch<T> {
    let mut batch = Batch {
        records: Vec::new(),
        rejected: 0,
        truncated: 0,
        requested,
    };

    for entry in &entries {
        if batch.records.len() == requested {
            batch.truncated += 1;
            continue;
        }

        match build(entry) {
            Ok(record) => batch.records.push(record),
            Err(e) => {
                tracing::warn!(error = %e, "skipping invalid record");
                batch.rejected += 1;
            }
        }
    }

    batch
}

/// Parse a user-generation completion.
///
/// A user whose email repeats one already accepted from the same
/// completion is rejected.
pub fn parse_users(raw: &str, requested: usize) -> CoreResult<Batch<User>> {
    Ok(build_users(extract_array(raw)?, requested))
}

/// Build users from already extracted elements.
pub fn build_users(entries: Vec<Value>, requested: usize) -> Batch<User> {
    let mut seen_emails = HashSet::new();

    build_batch(entries, requested, |value| {
        let user = User::from_raw(value)?;
        if !seen_emails.insert(user.email.to_lowercase()) {
            return Err(CoreError::Validation(format!(
                "duplicate email '{}' in batch",
                user.email
            )));
        }
        Ok(user)
    })
}

/// Parse an event-generation completion; every event is bound to `user_id`.
pub fn parse_events(raw: &str, requested: usize, user_id: &str) -> CoreResult<Batch<CalendarEvent>> {
    Ok(build_events(extract_array(raw)?, requested, user_id))
}

/// Build events for `user_id` from already extracted elements.
pub fn build_events(entries: Vec<Value>, requested: usize, user_id: &str) -> Batch<CalendarEvent> {
    build_batch(entries, requested, |value| CalendarEvent::from_raw(value, user_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_array_tolerates_surrounding_prose() {
        let batch = parse_events(
            "Here you go:\n[{\"title\":\"A\"}]\nHope that helps!",
            5,
            "user_1",
        )
        .unwrap();

        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.records[0].title, "A");
    }

    #[test]
    fn test_extract_array_without_json_is_parse_error() {
        let err = extract_array("no json here").unwrap_err();
        assert!(matches!(err, CoreError::Parse(_)));

        let err = parse_users("no json here", 3).unwrap_err();
        assert!(matches!(err, CoreError::Parse(_)));
    }

    #[test]
    fn test_extract_array_from_code_fence() {
        let raw = "```json\n[\n  {\"name\": \"Ada\", \"email\": \"ada@example.com\"}\n]\n```";
        let values = extract_array(raw).unwrap();
        assert_eq!(values.len(), 1);
    }

    #[test]
    fn test_empty_array_is_not_an_error() {
        let batch = parse_users("Sorry, nothing today: []", 3).unwrap();
        assert!(batch.records.is_empty());
        assert_eq!(batch.shortfall(), 3);
    }

    #[test]
    fn test_reversed_brackets_are_parse_error() {
        assert!(matches!(extract_array("] oops ["), Err(CoreError::Parse(_))));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        assert!(matches!(
            extract_array("[{\"title\": \"A\", }, {broken]"),
            Err(CoreError::Parse(_))
        ));
    }

    #[test]
    fn test_trailing_commas_are_repaired() {
        let values = extract_array("[{\"title\": \"A\",}, {\"title\": \"B\"},]").unwrap();
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_comma_repair_leaves_strings_alone() {
        let values = extract_array(r#"[{"title": "keep , ] and , }"},]"#).unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0]["title"], "keep , ] and , }");
    }

    #[test]
    fn test_strip_trailing_commas_handles_escaped_quotes() {
        let out = strip_trailing_commas(r#"[{"a": "x\", ]",}, ]"#);
        assert_eq!(out, r#"[{"a": "x\", ]"} ]"#);
    }

    #[test]
    fn test_brackets_in_trailing_prose_fall_back_to_balanced_span() {
        let raw = "[{\"title\": \"A [draft]\"}]\nSee note [1] for details.";
        let values = extract_array(raw).unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0]["title"], "A [draft]");
    }

    #[test]
    fn test_invalid_elements_are_skipped_individually() {
        let raw = r#"[
            {"title": "Kept"},
            {"description": "no title"},
            "not an object",
            {"title": "Also kept"}
        ]"#;
        let batch = parse_events(raw, 10, "user_1").unwrap();

        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.rejected, 2);
    }

    #[test]
    fn test_oversized_array_is_truncated() {
        let raw = r#"[{"title":"1"},{"title":"2"},{"title":"3"},{"title":"4"}]"#;
        let batch = parse_events(raw, 2, "user_1").unwrap();

        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.truncated, 2);
        assert_eq!(batch.shortfall(), 0);
        assert_eq!(batch.records[1].title, "2");
    }

    #[test]
    fn test_duplicate_emails_in_batch_are_rejected() {
        let raw = r#"[
            {"name": "Ada", "email": "ada@example.com"},
            {"name": "Ada Again", "email": "ADA@example.com"},
            {"name": "Grace", "email": "grace@example.com"}
        ]"#;
        let batch = parse_users(raw, 3).unwrap();

        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.rejected, 1);
        assert_eq!(batch.shortfall(), 1);
    }
}
