//! Rich-text cleanup for prompt context.

use scraper::{Html, Node};
use serde_json::Value;

/// Longest summary kept, in characters.
pub const SUMMARY_MAX_CHARS: usize = 200;

/// A sentence cut is only used if it keeps more than this many characters.
pub const MIN_SENTENCE_CUT: usize = 50;

/// Returned when a content field is present but is not text.
pub const CONTENT_ERROR: &str = "content processing error";

const ELLIPSIS: &str = "...";
const SENTENCE_TERMINATORS: [char; 3] = ['.', '!', '?'];
const INVISIBLE_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

/// Strip markup from `raw` and bound the result to [`SUMMARY_MAX_CHARS`].
///
/// Text nodes are trimmed and joined with a single space, entities are decoded
/// by the parser, and every run of whitespace (non-breaking spaces included)
/// collapses to one space.
pub fn clean_html(raw: &str) -> String {
    if raw.trim().is_empty() {
        return String::new();
    }
    truncate_summary(&visible_text(raw))
}

/// Clean a JSON content field: strings are cleaned, null yields an empty
/// summary, anything else yields [`CONTENT_ERROR`].
pub fn clean_content(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => clean_html(s),
        Some(_) => CONTENT_ERROR.to_string(),
    }
}

fn visible_text(raw: &str) -> String {
    let fragment = Html::parse_fragment(raw);
    let mut pieces: Vec<&str> = Vec::new();

    for node in fragment.tree.root().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| INVISIBLE_ELEMENTS.contains(&e.name()))
        });
        if hidden {
            continue;
        }
        let piece = text.trim();
        if !piece.is_empty() {
            pieces.push(piece);
        }
    }

    pieces
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Bound `text` to [`SUMMARY_MAX_CHARS`] characters.
///
/// Prefers ending on the last sentence terminator inside the window when that
/// keeps more than [`MIN_SENTENCE_CUT`] characters; otherwise hard-cuts and
/// appends an ellipsis.
pub fn truncate_summary(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= SUMMARY_MAX_CHARS {
        return text.to_string();
    }

    let window = &chars[..SUMMARY_MAX_CHARS];
    if let Some(pos) = window.iter().rposition(|c| SENTENCE_TERMINATORS.contains(c)) {
        if pos > MIN_SENTENCE_CUT {
            return window[..=pos].iter().collect();
        }
    }

    let keep = SUMMARY_MAX_CHARS - ELLIPSIS.len();
    let mut out: String = chars[..keep].iter().collect();
    out.push_str(ELLIPSIS);
    out
}
