//! Inline value extraction.
//!
//! A rule fragment may embed named values as fenced blocks:
//!
//! ````text
//! ``` token.json
//! {"a": 1}
//! ```
//! ````
//!
//! The opening line holds only the fence (three or more backticks) and a key;
//! the closing line holds only the identical fence. Blocks are cut from the
//! text and their bodies collected into the pass's [`InlineValueMap`].

use std::sync::LazyLock;

use regex::Regex;

use crate::traits::InlineValueMap;

const FENCE: &str = "```";

static OPENING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\S\n]*(`{3,})[^\S\n]*(\S+)[^\S\n]*$").expect("valid opening fence regex")
});

/// Bidirectional and format control characters removed from every fragment.
fn is_stripped_control(c: char) -> bool {
    matches!(
        c,
        '\u{001E}'
            | '\u{001F}'
            | '\u{200C}'..='\u{200F}'
            | '\u{202A}'
            | '\u{202C}'..='\u{202E}'
            | '\u{206A}'..='\u{206F}'
    )
}

/// Strip control characters and trim, without extracting anything.
pub fn sanitize(text: &str) -> String {
    let cleaned: String = text.chars().filter(|c| !is_stripped_control(*c)).collect();
    cleaned.trim().to_string()
}

/// Sanitize `text` and cut its fenced value blocks into `values`.
///
/// The first definition of a key wins; later blocks with the same key are
/// still removed from the text. Text without a fence marker is returned
/// sanitized but otherwise unchanged.
pub fn extract_inline_values(text: &str, values: &mut InlineValueMap) -> String {
    let text = sanitize(text);
    if !text.contains(FENCE) {
        return text;
    }

    // Lines keep their trailing `\r` so untouched text round-trips exactly.
    let lines: Vec<&str> = text.split('\n').collect();
    let mut kept: Vec<&str> = Vec::with_capacity(lines.len());
    let mut i = 0;
    while i < lines.len() {
        let Some((fence, key)) = opening(lines[i]) else {
            kept.push(lines[i]);
            i += 1;
            continue;
        };
        match closing_index(&lines, i + 1, fence) {
            Some(close) => {
                let body = body_text(&lines[i + 1..close]);
                if !values.contains_key(key) {
                    let _ = values.insert(key.to_string(), body);
                }
                // The block collapses to an empty line.
                kept.push("");
                i = close + 1;
            }
            None => {
                kept.push(lines[i]);
                i += 1;
            }
        }
    }
    kept.join("\n")
}

fn opening(line: &str) -> Option<(&str, &str)> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let caps = OPENING_RE.captures(line)?;
    Some((caps.get(1)?.as_str(), caps.get(2)?.as_str()))
}

/// Index of the first closing fence after a non-empty body.
fn closing_index(lines: &[&str], body_start: usize, fence: &str) -> Option<usize> {
    (body_start + 1..lines.len()).find(|&idx| {
        is_closing(lines[idx], fence) && !body_text(&lines[body_start..idx]).is_empty()
    })
}

fn is_closing(line: &str, fence: &str) -> bool {
    line.trim_start_matches([' ', '\t']).trim_end() == fence
}

fn body_text(lines: &[&str]) -> String {
    let body = lines.join("\n");
    match body.strip_suffix('\r') {
        Some(stripped) => stripped.to_string(),
        None => body,
    }
}
