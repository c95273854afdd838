//! Remote include directives.
//!
//! A directive is a rule line of the form `@<token>` or `` @`<token>` ``,
//! optionally followed by a `#` comment. The token is an internal reference
//! (`sluice.<name>[/path]`), a URL, or a filesystem path. Each directive line
//! is replaced with the fragment the [`RemoteFetcher`] currently holds for
//! it.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use sluice_core::constants::MAX_REMOTE_INCLUDES;
use sluice_core::text::reverse_lines;

use crate::inline_values::extract_inline_values;
use crate::traits::{InlineValueMap, RemoteFetcher};

const INTERNAL_PREFIX: &str = "sluice.";

static DIRECTIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    let token = r"(sluice\.[a-z\d_\-]+(?:/[^\s#]*)?|(?:https?://|[a-z]:[\\/]|~?/)[^\s#]+)";
    let pattern = format!(
        r"(?imR)^[^\S\r\n]*@(?:`{token}[^\S\r\n]*`|{token})[^\S\r\n]*(?:#[^\r\n]*)?$"
    );
    Regex::new(&pattern).expect("valid include directive regex")
});

static CONFIG_VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^{}\s]+)\}").expect("valid config var regex"));

/// Outcome of resolving the directives in one text.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Text with every directive line replaced.
    pub text: String,
    /// Directives replaced with fetched text.
    pub substitutions: usize,
    /// Directives past the per-pass cap, replaced with empty text.
    pub removed: usize,
    /// Keys handed to the fetcher.
    pub keys: BTreeSet<String>,
}

/// Resolves include directives against a [`RemoteFetcher`].
pub struct IncludeResolver<'a> {
    fetcher: &'a dyn RemoteFetcher,
    internal_base_url: &'a str,
    home: &'a Path,
    config_vars: &'a BTreeMap<String, String>,
}

impl<'a> IncludeResolver<'a> {
    /// Create a resolver.
    pub fn new(
        fetcher: &'a dyn RemoteFetcher,
        internal_base_url: &'a str,
        home: &'a Path,
        config_vars: &'a BTreeMap<String, String>,
    ) -> Self {
        Self {
            fetcher,
            internal_base_url,
            home,
            config_vars,
        }
    }

    /// The fetcher directives are resolved against.
    pub fn fetcher(&self) -> &dyn RemoteFetcher {
        self.fetcher
    }

    /// Replace every directive in `text`.
    ///
    /// At most [`MAX_REMOTE_INCLUDES`] directives are substituted; the rest
    /// become empty. With `invert` set, fetched fragments are line-reversed.
    /// Inline values found in fetched fragments are added to `values`.
    pub fn resolve(&self, text: &str, invert: bool, values: &mut InlineValueMap) -> Resolution {
        let mut substitutions = 0;
        let mut removed = 0;
        let mut keys = BTreeSet::new();
        let replaced = DIRECTIVE_RE.replace_all(text, |caps: &Captures<'_>| {
            if substitutions >= MAX_REMOTE_INCLUDES {
                removed += 1;
                return String::new();
            }
            substitutions += 1;
            let (token, wrapped) = match caps.get(1) {
                Some(m) => (m.as_str(), true),
                None => (caps.get(2).map_or("", |m| m.as_str()), false),
            };
            let key = self.resolve_key(token, wrapped);
            let fragment = extract_inline_values(&self.fetcher.fetch(&key), values);
            let _ = keys.insert(key);
            if invert {
                reverse_lines(&fragment, "\n")
            } else {
                fragment
            }
        });
        Resolution {
            text: replaced.into_owned(),
            substitutions,
            removed,
            keys,
        }
    }

    /// Turn a directive token into the key handed to the fetcher.
    pub fn resolve_key(&self, token: &str, wrapped: bool) -> String {
        let key = if has_internal_prefix(token) {
            format!("{}/{token}", self.internal_base_url.trim_end_matches('/'))
        } else if let Some(rest) = token.strip_prefix("~/") {
            self.home.join(rest).to_string_lossy().into_owned()
        } else {
            token.to_string()
        };
        if wrapped {
            self.substitute_vars(&key)
        } else {
            key
        }
    }

    fn substitute_vars(&self, key: &str) -> String {
        CONFIG_VAR_RE
            .replace_all(key, |caps: &Captures<'_>| {
                let name = &caps[1];
                self.config_vars
                    .get(name)
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}

fn has_internal_prefix(token: &str) -> bool {
    token
        .get(..INTERNAL_PREFIX.len())
        .is_some_and(|p| p.eq_ignore_ascii_case(INTERNAL_PREFIX))
}
