//! Line utilities.
//!
//! Rule text arrives with any mix of `\r\n`, `\r` and `\n` line endings.
//! Splitting treats all three as one line break so that reversing line order
//! never produces stray carriage returns.

/// Line separator used when joining composed fragments.
pub const CRLF: &str = "\r\n";

/// Split text on `\r\n`, `\r` or `\n`.
///
/// A trailing line break yields a trailing empty line, and empty input yields
/// a single empty line.
pub fn split_lines(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut lines = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\n' => {
                lines.push(&text[start..i]);
                i += 1;
                start = i;
            }
            b'\r' => {
                lines.push(&text[start..i]);
                i += if bytes.get(i + 1) == Some(&b'\n') { 2 } else { 1 };
                start = i;
            }
            _ => i += 1,
        }
    }
    lines.push(&text[start..]);
    lines
}

/// Reverse the line order of `text` and join the result with `sep`.
///
/// Empty input stays empty.
pub fn reverse_lines(text: &str, sep: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let mut lines = split_lines(text);
    lines.reverse();
    lines.join(sep)
}

/// Whether a token looks like a path (contains a forward slash).
pub fn is_path_like(token: &str) -> bool {
    token.contains('/')
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
