//! Rules service: registries, composition passes, and the recompose worker.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Value, json};
use sluice_core::constants::{
    PROP_BACK_RULES_FIRST, PROP_DISABLED_ALL_RULES, PROP_SYNC_WITH_SYS_HOSTS,
};
use sluice_core::text::split_lines;
use sluice_settings::RulesSettings;
use sluice_store::Storage;
use sluice_store::props::is_truthy;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::compose::{ComposeInput, Composition, compose};
use crate::import;
use crate::registry::RulesRegistry;
use crate::remote::IncludeResolver;
use crate::traits::{RemoteFetcher, RuleInterpreter, SystemHosts};
use crate::trigger::RecomposeTrigger;
use crate::values::ValuesRegistry;

/// The three storage namespaces.
pub struct Stores {
    /// Rule files, selection, and default buffer.
    pub rules: Arc<dyn Storage>,
    /// Value files.
    pub values: Arc<dyn Storage>,
    /// Global properties and the composer history file.
    pub properties: Arc<dyn Storage>,
}

/// External collaborators of the composition pipeline.
pub struct Collaborators {
    /// Remote include fetcher.
    pub fetcher: Arc<dyn RemoteFetcher>,
    /// Consumer of the composed text.
    pub interpreter: Arc<dyn RuleInterpreter>,
    /// System hosts file access.
    pub hosts: Arc<dyn SystemHosts>,
}

/// Summary of one composition pass.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositionReport {
    /// Composed text length in bytes.
    pub text_len: usize,
    /// Composed line count.
    pub line_count: usize,
    /// Include directives substituted.
    pub substitutions: usize,
    /// Include directives dropped past the cap.
    pub removed: usize,
    /// Inline value keys collected.
    pub value_keys: Vec<String>,
    /// Whether a host block was handed to the hosts file.
    pub hosts_synced: bool,
}

impl CompositionReport {
    fn from_composition(composition: &Composition) -> Self {
        Self {
            text_len: composition.text.len(),
            line_count: if composition.text.is_empty() {
                0
            } else {
                split_lines(&composition.text).len()
            },
            substitutions: composition.substitutions,
            removed: composition.removed,
            value_keys: composition.inline_values.keys().cloned().collect(),
            hosts_synced: composition.hosts.is_some(),
        }
    }
}

/// Owns the rule and value registries and runs composition passes.
pub struct RulesService {
    settings: RulesSettings,
    home: PathBuf,
    registry: RulesRegistry,
    values: ValuesRegistry,
    properties: Arc<dyn Storage>,
    collaborators: Collaborators,
    trigger: RecomposeTrigger,
    last_report: Mutex<Option<CompositionReport>>,
}

impl RulesService {
    /// Wire a service. No pass runs until one is requested.
    pub fn new(
        settings: RulesSettings,
        home: PathBuf,
        stores: Stores,
        collaborators: Collaborators,
    ) -> Self {
        let trigger = RecomposeTrigger::new();
        let registry = RulesRegistry::new(
            stores.rules,
            stores.properties.clone(),
            settings.multi_env,
            trigger.clone(),
        );
        Self {
            settings,
            home,
            registry,
            values: ValuesRegistry::new(stores.values),
            properties: stores.properties,
            collaborators,
            trigger,
            last_report: Mutex::new(None),
        }
    }

    /// Rule file registry.
    pub fn registry(&self) -> &RulesRegistry {
        &self.registry
    }

    /// Value file registry.
    pub fn values(&self) -> &ValuesRegistry {
        &self.values
    }

    /// Properties namespace.
    pub fn properties(&self) -> &Arc<dyn Storage> {
        &self.properties
    }

    /// Recompose signal shared with the registry.
    pub fn trigger(&self) -> &RecomposeTrigger {
        &self.trigger
    }

    /// Report of the most recent pass.
    pub fn last_report(&self) -> Option<CompositionReport> {
        self.last_report.lock().clone()
    }

    /// Ask the worker for a pass.
    pub fn request_recompose(&self) {
        self.trigger.request();
    }

    /// Snapshot the persisted state a pass depends on.
    pub fn snapshot(&self) -> ComposeInput {
        let prop = |key: &str| self.properties.property(key);
        ComposeInput {
            disabled_all: is_truthy(prop(PROP_DISABLED_ALL_RULES).as_ref()),
            allow_disable_shadow_rules: self.settings.allow_disable_shadow_rules,
            sync_hosts: is_truthy(prop(PROP_SYNC_WITH_SYS_HOSTS).as_ref()),
            multi_env: self.settings.multi_env,
            back_rules_first: prop(PROP_BACK_RULES_FIRST) == Some(Value::Bool(true)),
            selected: self.registry.selected_files(),
            default_rules: self.registry.active_default(),
            shadow_rules: self.settings.shadow_rules.clone(),
        }
    }

    /// Run one pass now and hand the result to the interpreter.
    pub fn recompose(&self) -> CompositionReport {
        let input = self.snapshot();
        let resolver = IncludeResolver::new(
            self.collaborators.fetcher.as_ref(),
            &self.settings.internal_base_url,
            &self.home,
            &self.settings.config_vars,
        );
        let composition = compose(&input, &resolver);

        if let Some(hosts) = &composition.hosts {
            if let Err(e) = self.collaborators.hosts.set_hosts(hosts) {
                warn!(error = %e, "failed to sync system hosts");
            }
        }

        self.collaborators
            .interpreter
            .load(&composition.text, &composition.inline_values);

        let report = CompositionReport::from_composition(&composition);
        debug!(
            text_len = report.text_len,
            lines = report.line_count,
            substitutions = report.substitutions,
            removed = report.removed,
            values = report.value_keys.len(),
            "rules composed"
        );
        *self.last_report.lock() = Some(report.clone());
        report
    }

    /// Start the worker that runs a pass per (coalesced) request.
    pub fn spawn_recomposer(self: &Arc<Self>) -> JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                service.trigger.wait().await;
                let pass = Arc::clone(&service);
                if let Err(e) = tokio::task::spawn_blocking(move || pass.recompose()).await {
                    warn!(error = %e, "composition pass failed");
                }
            }
        })
    }

    /// Set precedence inversion. Recomposes only when the flag changes.
    pub fn enable_back_rules_first(&self, enabled: bool) -> bool {
        let current = self.properties.property(PROP_BACK_RULES_FIRST) == Some(Value::Bool(true));
        if current == enabled {
            return false;
        }
        if let Err(e) = self
            .properties
            .set_property(PROP_BACK_RULES_FIRST, json!(enabled))
        {
            warn!(error = %e, "failed to persist precedence flag");
            return false;
        }
        info!(enabled, "precedence inversion changed");
        self.trigger.request();
        true
    }

    /// Read the system hosts text.
    pub fn get_sys_hosts(&self) -> std::io::Result<String> {
        self.collaborators.hosts.get_hosts()
    }

    /// Replace the system hosts text.
    pub fn set_sys_hosts(&self, text: &str) -> std::io::Result<()> {
        self.collaborators.hosts.set_hosts(text)
    }

    /// Bulk-import rules.
    pub fn import_rules(&self, rules: &Value, replace: bool) -> bool {
        import::import_rules(&self.registry, rules, replace)
    }

    /// Bulk-import values.
    pub fn import_values(&self, values: &Value, replace: bool) -> bool {
        import::import_values(&self.values, values, replace)
    }
}
