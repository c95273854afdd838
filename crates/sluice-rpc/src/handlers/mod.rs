//! RPC method handlers, one struct per method.

pub mod properties;
pub mod rules;
pub mod system;
pub mod values;

use serde_json::Value;

use crate::context::RpcContext;
use crate::errors::RpcError;
use crate::registry::MethodRegistry;

/// Register every handler with the registry.
pub fn register_all(registry: &mut MethodRegistry) {
    // System
    registry.register("system.ping", system::PingHandler);
    registry.register("system.getModified", system::GetModifiedHandler);

    // Rules
    registry.register("rules.list", rules::ListHandler);
    registry.register("rules.get", rules::GetHandler);
    registry.register("rules.add", rules::AddHandler);
    registry.register("rules.remove", rules::RemoveHandler);
    registry.register("rules.rename", rules::RenameHandler);
    registry.register("rules.moveTo", rules::MoveToHandler);
    registry.register("rules.select", rules::SelectHandler);
    registry.register("rules.unselect", rules::UnselectHandler);
    registry.register("rules.clearSelection", rules::ClearSelectionHandler);
    registry.register("rules.getSelectedList", rules::GetSelectedListHandler);
    registry.register("rules.getDefault", rules::GetDefaultHandler);
    registry.register("rules.setDefault", rules::SetDefaultHandler);
    registry.register("rules.enableDefault", rules::EnableDefaultHandler);
    registry.register("rules.disableDefault", rules::DisableDefaultHandler);
    registry.register(
        "rules.defaultRulesIsDisabled",
        rules::DefaultRulesIsDisabledHandler,
    );
    registry.register("rules.getSysHosts", rules::GetSysHostsHandler);
    registry.register("rules.setSysHosts", rules::SetSysHostsHandler);
    registry.register(
        "rules.enableBackRulesFirst",
        rules::EnableBackRulesFirstHandler,
    );
    registry.register("rules.parseRules", rules::ParseRulesHandler);
    registry.register("rules.import", rules::ImportHandler);

    // Values
    registry.register("values.list", values::ListHandler);
    registry.register("values.get", values::GetHandler);
    registry.register("values.add", values::AddHandler);
    registry.register("values.remove", values::RemoveHandler);
    registry.register("values.rename", values::RenameHandler);
    registry.register("values.moveTo", values::MoveToHandler);
    registry.register("values.select", values::SelectHandler);
    registry.register("values.unselect", values::UnselectHandler);
    registry.register("values.import", values::ImportHandler);

    // Properties
    registry.register("properties.get", properties::GetHandler);
    registry.register("properties.set", properties::SetHandler);
    registry.register("properties.remove", properties::RemoveHandler);
    registry.register("properties.getHistory", properties::GetHistoryHandler);
    registry.register("properties.addHistory", properties::AddHistoryHandler);
}

/// Extract a required parameter from the params object.
pub(crate) fn require_param<'a>(
    params: Option<&'a Value>,
    key: &str,
) -> Result<&'a Value, RpcError> {
    params
        .and_then(|p| p.get(key))
        .ok_or_else(|| RpcError::InvalidParams {
            message: format!("Missing required parameter: {key}"),
        })
}

/// Extract a required string parameter.
pub(crate) fn require_string_param(params: Option<&Value>, key: &str) -> Result<String, RpcError> {
    require_param(params, key)?
        .as_str()
        .map(ToOwned::to_owned)
        .ok_or_else(|| RpcError::InvalidParams {
            message: format!("Parameter '{key}' must be a string"),
        })
}

/// Extract an optional string parameter. Non-strings count as absent.
pub(crate) fn opt_string(params: Option<&Value>, key: &str) -> Option<String> {
    params
        .and_then(|p| p.get(key))
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
}

/// Extract an optional boolean parameter. Non-booleans count as absent.
pub(crate) fn opt_bool(params: Option<&Value>, key: &str) -> Option<bool> {
    params.and_then(|p| p.get(key)).and_then(Value::as_bool)
}

/// Record a modification when `changed`, attributing it to `clientId`.
pub(crate) fn record_change(ctx: &RpcContext, params: Option<&Value>, changed: bool, rules: bool) {
    if changed {
        ctx.changes.record(opt_string(params, "clientId"), rules);
    }
}
