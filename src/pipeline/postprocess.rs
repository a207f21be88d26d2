//! Post-processing: turn the raw model reply into an [`ExtractedRecord`].
//!
//! The prompt asks for bare JSON, but models still wrap it in a markdown
//! code fence now and then (` ```json … ``` `, ` ```JSON `, or a bare
//! ` ``` `). The rules here are deterministic and idempotent:
//!
//! 1. Drop a leading byte-order mark and surrounding whitespace
//! 2. Strip leading fence lines, with or without a language tag (any case)
//! 3. Strip trailing fences; repeat 2 and 3 until nothing changes
//! 4. Trim again and parse as a JSON object

use crate::error::ClaimsError;
use crate::record::ExtractedRecord;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

// ── Rules 1–3: fence stripping ───────────────────────────────────────────────

static RE_LEADING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^```[a-z0-9_+-]*[ \t]*\r?\n?").unwrap());

static RE_TRAILING_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r?\n?```\s*$").unwrap());

fn trim_reply(input: &str) -> &str {
    input.trim().trim_start_matches('\u{feff}').trim()
}

/// Remove surrounding markdown code fences, however deeply nested.
///
/// Text without a fence is returned trimmed and otherwise unchanged, so
/// applying this twice gives the same result as applying it once.
pub fn strip_code_fence(input: &str) -> String {
    let mut current = trim_reply(input).to_string();
    loop {
        let next = {
            let s = RE_LEADING_FENCE.replace(&current, "");
            let s = RE_TRAILING_FENCE.replace(&s, "");
            trim_reply(&s).to_string()
        };
        if next.len() == current.len() {
            return current;
        }
        current = next;
    }
}

// ── Rule 4: parse ────────────────────────────────────────────────────────────

/// Normalize and parse a model reply.
///
/// Invalid JSON and non-object top-level values are
/// [`ClaimsError::MalformedResponse`]; the error carries the reply exactly
/// as received so the caller can show it.
pub fn parse_reply(raw: &str) -> Result<ExtractedRecord, ClaimsError> {
    let cleaned = strip_code_fence(raw);
    if cleaned.len() != raw.len() {
        debug!("Stripped {} bytes of fence/whitespace", raw.len() - cleaned.len());
    }

    ExtractedRecord::from_json_str(&cleaned).map_err(|e| {
        warn!("Model reply is not a JSON object: {}", e);
        ClaimsError::MalformedResponse {
            detail: e.to_string(),
            raw: raw.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const BARE: &str = r#"{"insured_name": "Jane Doe", "sex": "Female"}"#;

    #[test]
    fn fenced_with_tag_without_tag_and_bare_parse_identically() {
        let tagged = format!("```json\n{BARE}\n```");
        let untagged = format!("```\n{BARE}\n```");
        let upper = format!("  ```JSON\r\n{BARE}\r\n```  \n");

        let expected = parse_reply(BARE).unwrap();
        assert_eq!(parse_reply(&tagged).unwrap(), expected);
        assert_eq!(parse_reply(&untagged).unwrap(), expected);
        assert_eq!(parse_reply(&upper).unwrap(), expected);
    }

    #[test]
    fn single_line_fence() {
        let r = parse_reply(&format!("```json {BARE}```")).unwrap();
        assert_eq!(r.len(), 2);
    }

    #[test]
    fn strip_is_idempotent() {
        for input in [
            format!("```json\n{BARE}\n```"),
            format!("```\n{BARE}\n```"),
            format!("```json\n```json\n{BARE}\n```\n```"),
            "```json\n```json\n{\"a\":1}\n```\n```".to_string(),
            BARE.to_string(),
            "not json".to_string(),
            String::new(),
        ] {
            let once = strip_code_fence(&input);
            assert_eq!(strip_code_fence(&once), once, "input: {input:?}");
        }
    }

    #[test]
    fn doubled_fence_parses() {
        let doubled = format!("```json\n```json\n{BARE}\n```\n```");
        assert_eq!(strip_code_fence(&doubled), BARE);
        assert_eq!(parse_reply(&doubled).unwrap(), parse_reply(BARE).unwrap());

        let r = parse_reply("```json\n```json\n{\"a\":1}\n```\n```").unwrap();
        assert_eq!(r.len(), 1);
    }

    #[test]
    fn byte_order_mark_is_ignored() {
        let r = parse_reply(&format!("\u{feff}{BARE}")).unwrap();
        assert_eq!(r.len(), 2);
    }

    #[test]
    fn invalid_json_keeps_raw_text() {
        let err = parse_reply("not json").unwrap_err();
        match err {
            ClaimsError::MalformedResponse { raw, .. } => assert_eq!(raw, "not json"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn non_object_is_malformed() {
        let err = parse_reply("```json\n[1, 2, 3]\n```").unwrap_err();
        assert!(matches!(err, ClaimsError::MalformedResponse { .. }));
        assert_eq!(err.raw_response(), Some("```json\n[1, 2, 3]\n```"));
    }

    #[test]
    fn empty_reply_is_malformed() {
        assert!(matches!(
            parse_reply("   ").unwrap_err(),
            ClaimsError::MalformedResponse { .. }
        ));
    }
}
