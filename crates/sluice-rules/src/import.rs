//! Bulk import of rules and values from JSON payloads.

use serde_json::Value;
use sluice_core::constants::{DEFAULT_RULES_NAME, MAX_IMPORT_ENTRIES};
use sluice_store::props::is_truthy;
use tracing::{debug, warn};

use crate::registry::RulesRegistry;
use crate::values::ValuesRegistry;

/// Import rules.
///
/// - a string or array of lines replaces the default buffer
/// - an object maps names to rule text (string or array) or to
///   `{rules, enable, replace}`; `Default` addresses the default buffer
///
/// Only the first [`MAX_IMPORT_ENTRIES`] keys of an object are considered.
/// Existing content is overwritten only when `replace` is set (per item or
/// for the whole call). Returns whether any content changed.
pub fn import_rules(registry: &RulesRegistry, rules: &Value, replace: bool) -> bool {
    match rules {
        Value::Null => false,
        Value::String(_) | Value::Array(_) => {
            if !replace && !registry.get_default().is_empty() {
                return false;
            }
            rules_text(rules).is_some_and(|text| registry.set_default(&text))
        }
        Value::Object(items) => {
            let mut changed = false;
            for (name, item) in items.iter().take(MAX_IMPORT_ENTRIES) {
                if name.is_empty() {
                    continue;
                }
                let Some(item) = ImportItem::parse(item, replace) else {
                    debug!(name = %name, "skipping malformed rules import item");
                    continue;
                };
                changed |= if name == DEFAULT_RULES_NAME {
                    import_default(registry, &item)
                } else {
                    import_file(registry, name, &item)
                };
            }
            changed
        }
        _ => {
            warn!("ignoring rules import of unsupported shape");
            false
        }
    }
}

/// Import values from an object of `name → value`.
///
/// Names containing whitespace and `null` values are skipped; existing names
/// are kept unless `replace` is set. Non-string values are stored as
/// pretty-printed JSON. Returns whether any content changed.
pub fn import_values(registry: &ValuesRegistry, values: &Value, replace: bool) -> bool {
    let Value::Object(items) = values else {
        return false;
    };
    let mut changed = false;
    for (name, value) in items.iter().take(MAX_IMPORT_ENTRIES) {
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            continue;
        }
        if !replace && registry.exists(name) {
            continue;
        }
        let data = match value {
            Value::Null => continue,
            Value::String(s) => s.clone(),
            other => match serde_json::to_string_pretty(other) {
                Ok(json) => json,
                Err(e) => {
                    warn!(name = %name, error = %e, "failed to serialize imported value");
                    continue;
                }
            },
        };
        changed |= registry.add(name, &data);
    }
    changed
}

struct ImportItem {
    text: Option<String>,
    enable: Option<bool>,
    replace: bool,
}

impl ImportItem {
    fn parse(item: &Value, default_replace: bool) -> Option<Self> {
        match item {
            Value::String(_) | Value::Array(_) => Some(Self {
                text: rules_text(item),
                enable: None,
                replace: default_replace,
            }),
            Value::Object(fields) => {
                let enable = match fields.get("enable") {
                    Some(Value::Bool(false)) => Some(false),
                    other if is_truthy(other) => Some(true),
                    _ => None,
                };
                Some(Self {
                    text: fields.get("rules").and_then(rules_text),
                    enable,
                    replace: fields
                        .get("replace")
                        .and_then(Value::as_bool)
                        .unwrap_or(default_replace),
                })
            }
            _ => None,
        }
    }
}

fn import_default(registry: &RulesRegistry, item: &ImportItem) -> bool {
    let mut changed = false;
    if let Some(text) = &item.text {
        if item.replace || registry.get_default().is_empty() {
            changed = registry.set_default(text);
        }
    }
    match item.enable {
        Some(true) => registry.enable_default(),
        Some(false) => registry.disable_default(),
        None => {}
    }
    changed
}

fn import_file(registry: &RulesRegistry, name: &str, item: &ImportItem) -> bool {
    let mut changed = false;
    if let Some(text) = &item.text {
        if item.replace || !registry.exists(name) {
            changed = registry.add(name, text);
        }
    }
    match item.enable {
        Some(true) => {
            let _ = registry.select(name);
        }
        Some(false) => {
            let _ = registry.unselect(name, false);
        }
        None => {}
    }
    changed
}

/// Rule text from a string or an array of lines.
fn rules_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(lines) => Some(
            lines
                .iter()
                .map(|line| match line {
                    Value::String(s) => s.clone(),
                    Value::Null => String::new(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use sluice_core::constants::PROP_ALLOW_MULTIPLE_CHOICE;
    use sluice_store::{MemoryStorage, Storage};

    use super::*;
    use crate::trigger::RecomposeTrigger;

    fn rules_registry() -> RulesRegistry {
        let properties = Arc::new(MemoryStorage::new());
        properties
            .set_property(PROP_ALLOW_MULTIPLE_CHOICE, json!(true))
            .unwrap();
        RulesRegistry::new(
            Arc::new(MemoryStorage::new()),
            properties,
            false,
            RecomposeTrigger::new(),
        )
    }

    #[test]
    fn null_is_noop() {
        let r = rules_registry();
        assert!(!import_rules(&r, &Value::Null, true));
    }

    #[test]
    fn array_replaces_default() {
        let r = rules_registry();
        assert!(import_rules(&r, &json!(["a.com 1.1.1.1", "b.com 2.2.2.2"]), true));
        assert_eq!(r.get_default(), "a.com 1.1.1.1\nb.com 2.2.2.2");
    }

    #[test]
    fn string_kept_without_replace() {
        let r = rules_registry();
        assert!(import_rules(&r, &json!("first"), false));
        assert!(!import_rules(&r, &json!("second"), false));
        assert_eq!(r.get_default(), "first");
    }

    #[test]
    fn object_items() {
        let r = rules_registry();
        let payload = json!({
            "Default": {"rules": "d.com 1.1.1.1", "enable": false},
            "team": ["t.com 2.2.2.2"],
            "mine": {"rules": "m.com 3.3.3.3", "enable": true},
            "": "ignored"
        });
        assert!(import_rules(&r, &payload, true));
        assert_eq!(r.get_default(), "d.com 1.1.1.1");
        assert!(r.default_is_disabled());
        assert_eq!(r.get("team").as_deref(), Some("t.com 2.2.2.2"));
        assert_eq!(r.selected_list(), vec!["mine"]);
    }

    #[test]
    fn per_item_replace_overrides_call() {
        let r = rules_registry();
        assert!(r.add("keep", "old"));
        let payload = json!({
            "keep": {"rules": "new", "replace": false},
        });
        assert!(!import_rules(&r, &payload, true));
        assert_eq!(r.get("keep").as_deref(), Some("old"));
    }

    #[test]
    fn enable_false_unselects() {
        let r = rules_registry();
        assert!(r.add("x", "x"));
        let _ = r.select("x");
        assert!(!import_rules(&r, &json!({"x": {"enable": false}}), true));
        assert!(r.selected_list().is_empty());
    }

    #[test]
    fn object_is_capped() {
        let r = rules_registry();
        let mut payload = serde_json::Map::new();
        for i in 0..70 {
            let _ = payload.insert(format!("file{i:02}"), json!(format!("rule {i}")));
        }
        assert!(import_rules(&r, &Value::Object(payload), true));
        assert_eq!(r.list().len(), 60);
        assert!(r.exists("file59"));
        assert!(!r.exists("file60"));
    }

    #[test]
    fn values_import() {
        let r = ValuesRegistry::new(Arc::new(MemoryStorage::new()));
        assert!(r.add("existing", "old"));
        let payload = json!({
            "existing": "new",
            "has space": "skipped",
            "empty": null,
            "obj": {"a": 1},
            "text": "plain"
        });
        assert!(import_values(&r, &payload, false));
        assert_eq!(r.get("existing").as_deref(), Some("old"));
        assert!(!r.exists("has space"));
        assert!(!r.exists("empty"));
        assert_eq!(r.get("obj").as_deref(), Some("{\n  \"a\": 1\n}"));
        assert_eq!(r.get("text").as_deref(), Some("plain"));

        assert!(import_values(&r, &json!({"existing": "new"}), true));
        assert_eq!(r.get("existing").as_deref(), Some("new"));
    }

    #[test]
    fn values_array_is_noop() {
        let r = ValuesRegistry::new(Arc::new(MemoryStorage::new()));
        assert!(!import_values(&r, &json!(["a"]), true));
        assert!(!import_values(&r, &Value::Null, true));
    }
}
