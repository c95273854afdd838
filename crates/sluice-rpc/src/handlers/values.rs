//! Values handlers.

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::instrument;

use crate::context::RpcContext;
use crate::errors::RpcError;
use crate::handlers::{opt_bool, record_change, require_string_param};
use crate::registry::MethodHandler;

/// Lists value files with their selected flag.
pub struct ListHandler;

#[async_trait]
impl MethodHandler for ListHandler {
    #[instrument(skip_all, fields(method = "values.list"))]
    async fn handle(&self, _params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        Ok(json!({ "list": ctx.rules.values().list() }))
    }
}

/// Returns a value file's text, or null.
pub struct GetHandler;

#[async_trait]
impl MethodHandler for GetHandler {
    #[instrument(skip_all, fields(method = "values.get"))]
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let name = require_string_param(params.as_ref(), "name")?;
        Ok(json!({ "value": ctx.rules.values().get(&name) }))
    }
}

/// Creates or overwrites a value file.
pub struct AddHandler;

#[async_trait]
impl MethodHandler for AddHandler {
    #[instrument(skip_all, fields(method = "values.add"))]
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let name = require_string_param(params.as_ref(), "name")?;
        let value = require_string_param(params.as_ref(), "value")?;
        let changed = ctx.rules.values().add(&name, &value);
        record_change(ctx, params.as_ref(), changed, false);
        Ok(json!({ "changed": changed }))
    }
}

/// Deletes a value file.
pub struct RemoveHandler;

#[async_trait]
impl MethodHandler for RemoveHandler {
    #[instrument(skip_all, fields(method = "values.remove"))]
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let name = require_string_param(params.as_ref(), "name")?;
        let changed = ctx.rules.values().remove(&name);
        record_change(ctx, params.as_ref(), changed, false);
        Ok(json!({ "changed": changed }))
    }
}

/// Renames a value file.
pub struct RenameHandler;

#[async_trait]
impl MethodHandler for RenameHandler {
    #[instrument(skip_all, fields(method = "values.rename"))]
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let name = require_string_param(params.as_ref(), "name")?;
        let new_name = require_string_param(params.as_ref(), "newName")?;
        let changed = ctx.rules.values().rename(&name, &new_name);
        record_change(ctx, params.as_ref(), changed, false);
        Ok(json!({ "changed": changed }))
    }
}

/// Moves a value file to another file's position.
pub struct MoveToHandler;

#[async_trait]
impl MethodHandler for MoveToHandler {
    #[instrument(skip_all, fields(method = "values.moveTo"))]
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let from = require_string_param(params.as_ref(), "from")?;
        let to = require_string_param(params.as_ref(), "to")?;
        let changed = ctx.rules.values().move_to(&from, &to);
        record_change(ctx, params.as_ref(), changed, false);
        Ok(json!({ "changed": changed }))
    }
}

/// Records the selected value file.
pub struct SelectHandler;

#[async_trait]
impl MethodHandler for SelectHandler {
    #[instrument(skip_all, fields(method = "values.select"))]
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let name = require_string_param(params.as_ref(), "name")?;
        ctx.rules.values().select(&name);
        Ok(json!({ "acknowledged": true }))
    }
}

/// Clears the selected value file.
pub struct UnselectHandler;

#[async_trait]
impl MethodHandler for UnselectHandler {
    #[instrument(skip_all, fields(method = "values.unselect"))]
    async fn handle(&self, _params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        ctx.rules.values().unselect();
        Ok(json!({ "acknowledged": true }))
    }
}

/// Bulk-imports value files.
pub struct ImportHandler;

#[async_trait]
impl MethodHandler for ImportHandler {
    #[instrument(skip_all, fields(method = "values.import"))]
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let values = params
            .as_ref()
            .and_then(|p| p.get("values"))
            .cloned()
            .unwrap_or(Value::Null);
        let replace = opt_bool(params.as_ref(), "replace").unwrap_or(true);
        let changed = ctx.rules.import_values(&values, replace);
        record_change(ctx, params.as_ref(), changed, false);
        Ok(json!({ "changed": changed }))
    }
}
