//! Rules handlers: rule files, selection, default buffer, hosts, and composition.

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::instrument;

use crate::context::RpcContext;
use crate::errors::RpcError;
use crate::handlers::{opt_bool, record_change, require_param, require_string_param};
use crate::registry::MethodHandler;

/// Lists rule files with their selected flag.
pub struct ListHandler;

#[async_trait]
impl MethodHandler for ListHandler {
    #[instrument(skip_all, fields(method = "rules.list"))]
    async fn handle(&self, _params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let list = ctx.rules.registry().list();
        Ok(json!({ "list": list }))
    }
}

/// Returns a rule file's text, or null.
pub struct GetHandler;

#[async_trait]
impl MethodHandler for GetHandler {
    #[instrument(skip_all, fields(method = "rules.get"))]
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let name = require_string_param(params.as_ref(), "name")?;
        Ok(json!({ "value": ctx.rules.registry().get(&name) }))
    }
}

/// Creates or overwrites a rule file.
pub struct AddHandler;

#[async_trait]
impl MethodHandler for AddHandler {
    #[instrument(skip_all, fields(method = "rules.add"))]
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let name = require_string_param(params.as_ref(), "name")?;
        let value = require_string_param(params.as_ref(), "value")?;
        let changed = ctx.rules.registry().add(&name, &value);
        record_change(ctx, params.as_ref(), changed, true);
        Ok(json!({ "changed": changed }))
    }
}

/// Deletes a rule file, unselecting it first.
pub struct RemoveHandler;

#[async_trait]
impl MethodHandler for RemoveHandler {
    #[instrument(skip_all, fields(method = "rules.remove"))]
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let name = require_string_param(params.as_ref(), "name")?;
        let changed = ctx.rules.registry().remove(&name);
        record_change(ctx, params.as_ref(), changed, true);
        Ok(json!({ "changed": changed }))
    }
}

/// Renames a rule file in place.
pub struct RenameHandler;

#[async_trait]
impl MethodHandler for RenameHandler {
    #[instrument(skip_all, fields(method = "rules.rename"))]
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let name = require_string_param(params.as_ref(), "name")?;
        let new_name = require_string_param(params.as_ref(), "newName")?;
        let changed = ctx.rules.registry().rename(&name, &new_name);
        record_change(ctx, params.as_ref(), changed, true);
        Ok(json!({ "changed": changed }))
    }
}

/// Moves a rule file to another file's position.
pub struct MoveToHandler;

#[async_trait]
impl MethodHandler for MoveToHandler {
    #[instrument(skip_all, fields(method = "rules.moveTo"))]
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let from = require_string_param(params.as_ref(), "from")?;
        let to = require_string_param(params.as_ref(), "to")?;
        let changed = ctx.rules.registry().move_to(&from, &to);
        record_change(ctx, params.as_ref(), changed, true);
        Ok(json!({ "changed": changed }))
    }
}

/// Selects a rule file. Returns the new selection, or null when nothing happened.
pub struct SelectHandler;

#[async_trait]
impl MethodHandler for SelectHandler {
    #[instrument(skip_all, fields(method = "rules.select"))]
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let name = require_string_param(params.as_ref(), "name")?;
        Ok(json!({ "selectedList": ctx.rules.registry().select(&name) }))
    }
}

/// Unselects a rule file.
pub struct UnselectHandler;

#[async_trait]
impl MethodHandler for UnselectHandler {
    #[instrument(skip_all, fields(method = "rules.unselect"))]
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let name = require_string_param(params.as_ref(), "name")?;
        let force = opt_bool(params.as_ref(), "force").unwrap_or(false);
        Ok(json!({ "selectedList": ctx.rules.registry().unselect(&name, force) }))
    }
}

/// Clears the selection.
pub struct ClearSelectionHandler;

#[async_trait]
impl MethodHandler for ClearSelectionHandler {
    #[instrument(skip_all, fields(method = "rules.clearSelection"))]
    async fn handle(&self, _params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        ctx.rules.registry().clear_selection();
        Ok(json!({ "acknowledged": true }))
    }
}

/// Returns the ordered selection list.
pub struct GetSelectedListHandler;

#[async_trait]
impl MethodHandler for GetSelectedListHandler {
    #[instrument(skip_all, fields(method = "rules.getSelectedList"))]
    async fn handle(&self, _params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        Ok(json!({ "selectedList": ctx.rules.registry().selected_list() }))
    }
}

/// Returns the default buffer text.
pub struct GetDefaultHandler;

#[async_trait]
impl MethodHandler for GetDefaultHandler {
    #[instrument(skip_all, fields(method = "rules.getDefault"))]
    async fn handle(&self, _params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        Ok(json!({ "value": ctx.rules.registry().get_default() }))
    }
}

/// Replaces the default buffer. A non-string value clears it.
pub struct SetDefaultHandler;

#[async_trait]
impl MethodHandler for SetDefaultHandler {
    #[instrument(skip_all, fields(method = "rules.setDefault"))]
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let value = params
            .as_ref()
            .and_then(|p| p.get("value"))
            .and_then(Value::as_str)
            .unwrap_or_default();
        let changed = ctx.rules.registry().set_default(value);
        record_change(ctx, params.as_ref(), changed, true);
        Ok(json!({ "changed": changed }))
    }
}

/// Enables the default buffer.
pub struct EnableDefaultHandler;

#[async_trait]
impl MethodHandler for EnableDefaultHandler {
    #[instrument(skip_all, fields(method = "rules.enableDefault"))]
    async fn handle(&self, _params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        ctx.rules.registry().enable_default();
        Ok(json!({ "disabled": false }))
    }
}

/// Disables the default buffer.
pub struct DisableDefaultHandler;

#[async_trait]
impl MethodHandler for DisableDefaultHandler {
    #[instrument(skip_all, fields(method = "rules.disableDefault"))]
    async fn handle(&self, _params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        ctx.rules.registry().disable_default();
        Ok(json!({ "disabled": true }))
    }
}

/// Reports whether the default buffer is disabled.
pub struct DefaultRulesIsDisabledHandler;

#[async_trait]
impl MethodHandler for DefaultRulesIsDisabledHandler {
    #[instrument(skip_all, fields(method = "rules.defaultRulesIsDisabled"))]
    async fn handle(&self, _params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        Ok(json!({ "disabled": ctx.rules.registry().default_is_disabled() }))
    }
}

/// Reads the system hosts text.
pub struct GetSysHostsHandler;

#[async_trait]
impl MethodHandler for GetSysHostsHandler {
    #[instrument(skip_all, fields(method = "rules.getSysHosts"))]
    async fn handle(&self, _params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        Ok(json!({ "hosts": ctx.rules.get_sys_hosts()? }))
    }
}

/// Replaces the system hosts text.
pub struct SetSysHostsHandler;

#[async_trait]
impl MethodHandler for SetSysHostsHandler {
    #[instrument(skip_all, fields(method = "rules.setSysHosts"))]
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let hosts = require_string_param(params.as_ref(), "hosts")?;
        ctx.rules.set_sys_hosts(&hosts)?;
        Ok(json!({ "acknowledged": true }))
    }
}

/// Toggles precedence inversion.
pub struct EnableBackRulesFirstHandler;

#[async_trait]
impl MethodHandler for EnableBackRulesFirstHandler {
    #[instrument(skip_all, fields(method = "rules.enableBackRulesFirst"))]
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let enabled = require_param(params.as_ref(), "enabled")?
            .as_bool()
            .ok_or_else(|| RpcError::InvalidParams {
                message: "Parameter 'enabled' must be a boolean".into(),
            })?;
        Ok(json!({ "changed": ctx.rules.enable_back_rules_first(enabled) }))
    }
}

/// Runs a composition pass now and returns its report.
pub struct ParseRulesHandler;

#[async_trait]
impl MethodHandler for ParseRulesHandler {
    #[instrument(skip_all, fields(method = "rules.parseRules"))]
    async fn handle(&self, _params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let service = ctx.rules.clone();
        let report = tokio::task::spawn_blocking(move || service.recompose())
            .await
            .map_err(|e| RpcError::Internal {
                message: format!("composition pass failed: {e}"),
            })?;
        serde_json::to_value(report).map_err(|e| RpcError::Internal {
            message: e.to_string(),
        })
    }
}

/// Bulk-imports rule files and the default buffer.
pub struct ImportHandler;

#[async_trait]
impl MethodHandler for ImportHandler {
    #[instrument(skip_all, fields(method = "rules.import"))]
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let rules = params
            .as_ref()
            .and_then(|p| p.get("rules"))
            .cloned()
            .unwrap_or(Value::Null);
        let replace = opt_bool(params.as_ref(), "replace").unwrap_or(true);
        let changed = ctx.rules.import_rules(&rules, replace);
        record_change(ctx, params.as_ref(), changed, true);
        Ok(json!({ "changed": changed }))
    }
}
