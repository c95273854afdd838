//! Rule file registry and selection.
//!
//! Rule files live in the rules namespace. The selection is an ordered,
//! duplicate-free list of file names stored as the `selectedList` property of
//! the same namespace; a file's "selected" flag is derived from it. The
//! default rule buffer is kept as rules-namespace properties too.
//!
//! Mutations that can affect the composed text request a recomposition
//! through the [`RecomposeTrigger`].

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Value, json};
use sluice_core::constants::{
    PROP_ALLOW_MULTIPLE_CHOICE, PROP_DEFAULT_RULES, PROP_DISABLED_DEFAULT_RULES,
    PROP_SELECTED_LIST,
};
use sluice_store::props::{is_truthy, string_list, string_value};
use sluice_store::{Storage, StoredFile};
use tracing::{debug, warn};

use crate::trigger::RecomposeTrigger;

/// A rule file annotated with its selection state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RuleFileEntry {
    /// File name.
    pub name: String,
    /// File content.
    pub data: String,
    /// Whether the file is in the selection.
    pub selected: bool,
}

/// Registry of named rule files plus the default buffer.
pub struct RulesRegistry {
    rules: Arc<dyn Storage>,
    properties: Arc<dyn Storage>,
    multi_env: bool,
    trigger: RecomposeTrigger,
}

impl RulesRegistry {
    /// Create a registry over the rules and properties namespaces.
    pub fn new(
        rules: Arc<dyn Storage>,
        properties: Arc<dyn Storage>,
        multi_env: bool,
        trigger: RecomposeTrigger,
    ) -> Self {
        Self {
            rules,
            properties,
            multi_env,
            trigger,
        }
    }

    /// Whether selection is controlled externally.
    pub fn multi_env(&self) -> bool {
        self.multi_env
    }

    // ── Files ───────────────────────────────────────────────────────

    /// All files in registry order with their selection flag.
    pub fn list(&self) -> Vec<RuleFileEntry> {
        let selected = self.selected_list();
        self.rules
            .list()
            .into_iter()
            .map(|file| RuleFileEntry {
                selected: selected.contains(&file.name),
                name: file.name,
                data: file.data,
            })
            .collect()
    }

    /// Selected files in registry order.
    pub fn selected_files(&self) -> Vec<StoredFile> {
        let selected = self.selected_list();
        if selected.is_empty() {
            return Vec::new();
        }
        self.rules
            .list()
            .into_iter()
            .filter(|file| selected.contains(&file.name))
            .collect()
    }

    /// Read a file.
    pub fn get(&self, name: &str) -> Option<String> {
        self.rules.read(name)
    }

    /// Whether a file exists.
    pub fn exists(&self, name: &str) -> bool {
        self.rules.exists(name)
    }

    /// Create or overwrite a file. Recomposes when the file is selected.
    pub fn add(&self, name: &str, data: &str) -> bool {
        let changed = logged("add", name, self.rules.write(name, data));
        if changed && self.selected_list().iter().any(|n| n == name) {
            self.trigger.request();
        }
        changed
    }

    /// Delete a file, unselecting it first.
    pub fn remove(&self, name: &str) -> bool {
        let _ = self.unselect(name, true);
        logged("remove", name, self.rules.remove(name))
    }

    /// Rename a file, keeping its place in the selection.
    pub fn rename(&self, from: &str, to: &str) -> bool {
        if !logged("rename", from, self.rules.rename(from, to)) {
            return false;
        }
        let mut selected = self.selected_list();
        let affected = selected.iter().any(|n| n == from || n == to);
        if let Some(slot) = selected.iter_mut().find(|n| *n == from) {
            *slot = to.to_string();
            self.store_selection(&selected);
        }
        if affected {
            self.trigger.request();
        }
        true
    }

    /// Move `from` into the position held by `to`.
    pub fn move_to(&self, from: &str, to: &str) -> bool {
        if !logged("move", from, self.rules.move_to(from, to)) {
            return false;
        }
        let selected = self.selected_list();
        if selected.iter().any(|n| n == from || n == to) {
            self.trigger.request();
        }
        true
    }

    // ── Selection ───────────────────────────────────────────────────

    /// Select a file.
    ///
    /// Without multiple choice the selection becomes just `name`. Returns the
    /// new selection, or `None` when the file does not exist or selection is
    /// controlled externally.
    pub fn select(&self, name: &str) -> Option<Vec<String>> {
        if self.multi_env || !self.rules.exists(name) {
            return None;
        }
        let mut selected = if self.allow_multiple_choice() {
            self.selected_list()
        } else {
            Vec::new()
        };
        if !selected.iter().any(|n| n == name) {
            selected.push(name.to_string());
            self.store_selection(&selected);
        }
        self.trigger.request();
        Some(selected)
    }

    /// Unselect a file. `force` overrides externally controlled selection.
    pub fn unselect(&self, name: &str, force: bool) -> Option<Vec<String>> {
        if self.multi_env && !force {
            return None;
        }
        let mut selected = self.selected_list();
        if let Some(idx) = selected.iter().position(|n| n == name) {
            let _ = selected.remove(idx);
            self.store_selection(&selected);
        }
        self.trigger.request();
        Some(selected)
    }

    /// Empty the selection.
    pub fn clear_selection(&self) {
        if self.multi_env {
            return;
        }
        self.store_selection(&[]);
        self.trigger.request();
    }

    /// The selection in selection order.
    ///
    /// A stored value that is not a list of names is reset to empty.
    pub fn selected_list(&self) -> Vec<String> {
        if self.multi_env {
            return Vec::new();
        }
        if let Some(list) = string_list(self.rules.property(PROP_SELECTED_LIST).as_ref()) {
            return list;
        }
        debug!("selection missing or malformed, resetting");
        self.store_selection(&[]);
        Vec::new()
    }

    fn allow_multiple_choice(&self) -> bool {
        is_truthy(self.properties.property(PROP_ALLOW_MULTIPLE_CHOICE).as_ref())
    }

    fn store_selection(&self, selected: &[String]) {
        if let Err(e) = self.rules.set_property(PROP_SELECTED_LIST, json!(selected)) {
            warn!(error = %e, "failed to persist selection");
        }
    }

    // ── Default buffer ──────────────────────────────────────────────

    /// Default buffer text (empty when unset).
    pub fn get_default(&self) -> String {
        string_value(self.rules.property(PROP_DEFAULT_RULES).as_ref()).unwrap_or_default()
    }

    /// Replace the default buffer. Returns whether the text changed.
    ///
    /// Always recomposes.
    pub fn set_default(&self, text: &str) -> bool {
        let previous = self.get_default();
        if let Err(e) = self
            .rules
            .set_property(PROP_DEFAULT_RULES, Value::String(text.to_string()))
        {
            warn!(error = %e, "failed to persist default rules");
            self.trigger.request();
            return false;
        }
        self.trigger.request();
        previous != text
    }

    /// Include the default buffer in compositions.
    pub fn enable_default(&self) {
        self.set_default_disabled(false);
    }

    /// Exclude the default buffer from compositions.
    pub fn disable_default(&self) {
        self.set_default_disabled(true);
    }

    /// Whether the default buffer is excluded.
    pub fn default_is_disabled(&self) -> bool {
        is_truthy(self.rules.property(PROP_DISABLED_DEFAULT_RULES).as_ref())
    }

    /// Default buffer text when enabled.
    pub fn active_default(&self) -> Option<String> {
        (!self.default_is_disabled()).then(|| self.get_default())
    }

    fn set_default_disabled(&self, disabled: bool) {
        if let Err(e) = self
            .rules
            .set_property(PROP_DISABLED_DEFAULT_RULES, Value::Bool(disabled))
        {
            warn!(error = %e, "failed to persist default rules flag");
        }
        self.trigger.request();
    }
}

/// Unwrap a storage result, logging failures as "no change".
pub(crate) fn logged(op: &str, name: &str, result: sluice_store::Result<bool>) -> bool {
    result.unwrap_or_else(|e| {
        warn!(op, name, error = %e, "storage operation failed");
        false
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sluice_store::MemoryStorage;

    struct Fixture {
        rules: Arc<MemoryStorage>,
        properties: Arc<MemoryStorage>,
        trigger: RecomposeTrigger,
        registry: RulesRegistry,
    }

    fn fixture(multi_env: bool) -> Fixture {
        let rules = Arc::new(MemoryStorage::new());
        let properties = Arc::new(MemoryStorage::new());
        let trigger = RecomposeTrigger::new();
        let registry =
            RulesRegistry::new(rules.clone(), properties.clone(), multi_env, trigger.clone());
        Fixture {
            rules,
            properties,
            trigger,
            registry,
        }
    }

    fn seeded(multi_env: bool) -> Fixture {
        let f = fixture(multi_env);
        for name in ["a", "b", "c"] {
            assert!(f.registry.add(name, &format!("{name}.com 1.1.1.1")));
        }
        f
    }

    #[test]
    fn single_choice_replaces_selection() {
        let f = seeded(false);
        assert_eq!(f.registry.select("a").unwrap(), vec!["a"]);
        assert_eq!(f.registry.select("b").unwrap(), vec!["b"]);
        assert_eq!(f.registry.selected_list(), vec!["b"]);
    }

    #[test]
    fn multiple_choice_appends_once() {
        let f = seeded(false);
        f.properties
            .set_property(PROP_ALLOW_MULTIPLE_CHOICE, json!(true))
            .unwrap();
        let _ = f.registry.select("b");
        let _ = f.registry.select("a");
        assert_eq!(f.registry.select("b").unwrap(), vec!["b", "a"]);
    }

    #[test]
    fn select_missing_file_is_noop() {
        let f = seeded(false);
        let before = f.trigger.requests();
        assert!(f.registry.select("zzz").is_none());
        assert_eq!(f.trigger.requests(), before);
    }

    #[test]
    fn list_marks_selected() {
        let f = seeded(false);
        let _ = f.registry.select("b");
        let flags: Vec<_> = f.registry.list().into_iter().map(|e| e.selected).collect();
        assert_eq!(flags, vec![false, true, false]);
    }

    #[test]
    fn remove_cascades_to_selection() {
        let f = seeded(false);
        let _ = f.registry.select("a");
        assert!(f.registry.remove("a"));
        assert!(f.registry.selected_list().is_empty());
        assert!(!f.registry.remove("a"));
    }

    #[test]
    fn rename_keeps_selection_position() {
        let f = seeded(false);
        f.properties
            .set_property(PROP_ALLOW_MULTIPLE_CHOICE, json!(1))
            .unwrap();
        let _ = f.registry.select("a");
        let _ = f.registry.select("b");
        let before = f.trigger.requests();
        assert!(f.registry.rename("a", "z"));
        assert_eq!(f.registry.selected_list(), vec!["z", "b"]);
        assert_eq!(f.trigger.requests(), before + 1);
    }

    #[test]
    fn rename_unselected_does_not_recompose() {
        let f = seeded(false);
        let _ = f.registry.select("a");
        let before = f.trigger.requests();
        assert!(f.registry.rename("c", "d"));
        assert!(!f.registry.rename("missing", "e"));
        assert_eq!(f.trigger.requests(), before);
    }

    #[test]
    fn move_recomposes_only_for_selected() {
        let f = seeded(false);
        let _ = f.registry.select("a");
        let before = f.trigger.requests();
        assert!(f.registry.move_to("c", "b"));
        assert_eq!(f.trigger.requests(), before);
        assert!(f.registry.move_to("c", "a"));
        assert_eq!(f.trigger.requests(), before + 1);
        let names: Vec<_> = f.registry.list().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }

    #[test]
    fn add_recomposes_only_when_selected() {
        let f = seeded(false);
        let _ = f.registry.select("a");
        let before = f.trigger.requests();
        assert!(f.registry.add("b", "changed"));
        assert_eq!(f.trigger.requests(), before);
        assert!(f.registry.add("a", "changed"));
        assert_eq!(f.trigger.requests(), before + 1);
    }

    #[test]
    fn multi_env_disables_selection() {
        let f = seeded(true);
        assert!(f.registry.select("a").is_none());
        assert!(f.registry.unselect("a", false).is_none());
        assert!(f.registry.unselect("a", true).is_some());
        assert!(f.registry.list().iter().all(|e| !e.selected));
    }

    #[test]
    fn malformed_selection_resets() {
        let f = seeded(false);
        f.rules
            .set_property(PROP_SELECTED_LIST, json!("not a list"))
            .unwrap();
        assert!(f.registry.selected_list().is_empty());
        assert_eq!(f.rules.property(PROP_SELECTED_LIST), Some(json!([])));
    }

    #[test]
    fn clear_selection() {
        let f = seeded(false);
        let _ = f.registry.select("a");
        f.registry.clear_selection();
        assert!(f.registry.selected_list().is_empty());
    }

    #[test]
    fn default_buffer() {
        let f = fixture(false);
        assert_eq!(f.registry.get_default(), "");
        assert!(f.registry.set_default("x.com 1.1.1.1"));
        assert!(!f.registry.set_default("x.com 1.1.1.1"));
        assert_eq!(f.registry.active_default().as_deref(), Some("x.com 1.1.1.1"));
        f.registry.disable_default();
        assert!(f.registry.default_is_disabled());
        assert!(f.registry.active_default().is_none());
        f.registry.enable_default();
        assert!(!f.registry.default_is_disabled());
    }

    #[test]
    fn storage_failure_reports_no_change() {
        let f = seeded(false);
        f.rules.set_fail_writes(true);
        assert!(!f.registry.add("d", "x"));
        assert!(!f.registry.remove("a"));
        assert!(!f.registry.rename("a", "q"));
    }
}
