//! Host pair extraction.
//!
//! Pulls `<ip> <host>` pairs out of rule text so they can be mirrored into
//! the system hosts file. Purely advisory: lines that are not host mappings
//! are ignored.

use std::net::IpAddr;

use sluice_core::text::{CRLF, is_path_like, split_lines};

/// Extract host pairs from rule text, joined with `\r\n`.
///
/// Two line shapes are recognised:
/// - `<ip> <host> [<host> ...]` emits one pair per host (path-like tokens are
///   skipped)
/// - `<host> <ip> ...` emits `<ip> <host>`
pub fn extract_hosts(text: &str) -> String {
    let text = text.trim();
    if text.is_empty() {
        return String::new();
    }

    let mut pairs = Vec::new();
    for line in split_lines(text) {
        let line = strip_comment(line).trim();
        if line.is_empty() {
            continue;
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let first = tokens[0];
        if is_ip(first) {
            pairs.extend(
                tokens[1..]
                    .iter()
                    .filter(|token| !is_path_like(token))
                    .map(|token| format!("{first} {token}")),
            );
        } else if !is_path_like(first) {
            if let Some(ip) = tokens.get(1).filter(|t| is_ip(t)) {
                pairs.push(format!("{ip} {first}"));
            }
        }
    }
    pairs.join(CRLF)
}

fn strip_comment(line: &str) -> &str {
    line.split_once('#').map_or(line, |(before, _)| before)
}

fn is_ip(token: &str) -> bool {
    token.parse::<IpAddr>().is_ok()
}
