//! Bounded identifier and body views for diagnostics

/// Longest identifier prefix a hint may carry.
const VISIBLE_CHARS: usize = 8;

/// Longest upstream-body prefix a log line may carry.
const SNIPPET_CHARS: usize = 256;

/// Shorten an identifier for logs and error bodies.
///
/// Keeps at most the first eight characters followed by an ellipsis,
/// enough to correlate against an upstream dashboard. Values at or
/// below the cutoff collapse to a bare ellipsis; the full identifier
/// never appears in the output.
pub fn truncate_id(id: &str) -> String {
    if id.chars().count() > VISIBLE_CHARS {
        let prefix: String = id.chars().take(VISIBLE_CHARS).collect();
        format!("{prefix}\u{2026}")
    } else {
        String::from("\u{2026}")
    }
}

/// Bound an upstream response body for a log line.
///
/// A bound, not a redaction: bodies at or below the cutoff pass
/// through whole, longer ones keep the first 256 characters followed
/// by an ellipsis. Upstream rejections are small JSON documents;
/// anything past the cutoff adds nothing to a diagnostic.
pub fn body_snippet(body: &str) -> String {
    match body.char_indices().nth(SNIPPET_CHARS) {
        Some((cut, _)) => format!("{}\u{2026}", &body[..cut]),
        None => String::from(body),
    }
}
