//! The composition pipeline.
//!
//! Turns the current rule sources into one rule text:
//!
//! 1. Disable-all short-circuits to the shadow rules (or nothing)
//! 2. Selected files, then the default buffer, become fragments
//! 3. Host pairs are collected per source when host sync is on
//! 4. Fragments are joined, line-reversed under precedence inversion
//! 5. Shadow rules are appended (or reversed and prepended)
//! 6. Include directives are resolved
//!
//! [`compose`] reads nothing itself: the caller snapshots persisted state into
//! a [`ComposeInput`], so the same input always composes to the same text.

use sluice_core::constants::DEFAULT_RULES_NAME;
use sluice_core::text::{CRLF, reverse_lines};
use sluice_store::StoredFile;

use crate::hosts::extract_hosts;
use crate::inline_values::extract_inline_values;
use crate::remote::IncludeResolver;
use crate::traits::InlineValueMap;

/// Snapshot of every input a composition pass depends on.
#[derive(Clone, Debug, Default)]
pub struct ComposeInput {
    /// Every rule source except (optionally) the shadow rules is off.
    pub disabled_all: bool,
    /// Disable-all also drops the shadow rules.
    pub allow_disable_shadow_rules: bool,
    /// Collect host pairs for the system hosts file.
    pub sync_hosts: bool,
    /// File selection is controlled externally; selected files are ignored.
    pub multi_env: bool,
    /// Precedence inversion: later rules win, so line order is reversed.
    pub back_rules_first: bool,
    /// Selected files in registry order.
    pub selected: Vec<StoredFile>,
    /// Default buffer text, `None` when disabled.
    pub default_rules: Option<String>,
    /// Operator-mandated rules.
    pub shadow_rules: String,
}

/// Result of one pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Composition {
    /// Final rule text.
    pub text: String,
    /// Inline values collected during this pass.
    pub inline_values: InlineValueMap,
    /// Host block for the system hosts file, when host sync ran.
    pub hosts: Option<String>,
    /// Include directives substituted.
    pub substitutions: usize,
    /// Include directives dropped past the cap.
    pub removed: usize,
}

/// Run one composition pass.
///
/// When no include directive was substituted, the fetcher is told to purge
/// cached fragments nothing references any more.
pub fn compose(input: &ComposeInput, resolver: &IncludeResolver<'_>) -> Composition {
    let mut values = InlineValueMap::new();

    if input.disabled_all {
        let text = if input.allow_disable_shadow_rules {
            String::new()
        } else {
            extract_inline_values(&input.shadow_rules, &mut values)
        };
        return finish(text, values, None, false, resolver);
    }

    let mut fragments: Vec<String> = Vec::new();
    let mut host_blocks: Vec<String> = Vec::new();

    if !input.multi_env {
        for file in &input.selected {
            let fragment = extract_inline_values(&file.data, &mut values);
            if input.sync_hosts {
                push_host_block(&mut host_blocks, &file.name, &fragment);
            }
            fragments.push(fragment);
        }
    }

    let invert = input.back_rules_first;
    if let Some(default) = input.default_rules.as_deref().filter(|d| !d.is_empty()) {
        let fragment = extract_inline_values(default, &mut values);
        if input.sync_hosts && !input.multi_env {
            push_host_block(&mut host_blocks, DEFAULT_RULES_NAME, &fragment);
        }
        if invert {
            fragments.insert(0, fragment);
        } else {
            fragments.push(fragment);
        }
    }

    let body = if invert {
        reverse_lines(&fragments.join("\n"), CRLF)
    } else {
        fragments.join(CRLF)
    };

    let shadow = extract_inline_values(&input.shadow_rules, &mut values);
    let parts = if invert {
        [reverse_lines(&shadow, "\n"), body]
    } else {
        [body, shadow]
    };
    let text = parts
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    let hosts = (input.sync_hosts && !input.multi_env).then(|| host_blocks.join("\r\n\r\n"));
    finish(text, values, hosts, invert, resolver)
}

fn push_host_block(blocks: &mut Vec<String>, source: &str, text: &str) {
    let pairs = extract_hosts(text);
    if !pairs.is_empty() {
        blocks.push(format!("#\r\n# {source}\r\n#\r\n{pairs}"));
    }
}

fn finish(
    text: String,
    mut values: InlineValueMap,
    hosts: Option<String>,
    invert: bool,
    resolver: &IncludeResolver<'_>,
) -> Composition {
    let resolution = resolver.resolve(&text, invert, &mut values);
    if resolution.substitutions == 0 {
        resolver.fetcher().purge_unused();
    } else {
        resolver.fetcher().retain(&resolution.keys);
    }
    Composition {
        text: resolution.text,
        inline_values: values,
        hosts,
        substitutions: resolution.substitutions,
        removed: resolution.removed,
    }
}
