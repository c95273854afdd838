//! Properties handlers: the global property bag and composer history.

use async_trait::async_trait;
use serde_json::{Value, json};
use sluice_core::constants::{
    PROP_BACK_RULES_FIRST, PROP_DISABLED_ALL_RULES, PROP_SYNC_WITH_SYS_HOSTS,
};
use sluice_store::StoreError;
use tracing::{debug, instrument};

use crate::context::RpcContext;
use crate::errors::RpcError;
use crate::handlers::{require_param, require_string_param};
use crate::registry::MethodHandler;

/// Property keys the composition pass reads.
const COMPOSITION_KEYS: [&str; 3] = [
    PROP_DISABLED_ALL_RULES,
    PROP_SYNC_WITH_SYS_HOSTS,
    PROP_BACK_RULES_FIRST,
];

fn store_error(e: &StoreError) -> RpcError {
    RpcError::Internal {
        message: format!("property store: {e}"),
    }
}

fn affects_composition<'a>(mut keys: impl Iterator<Item = &'a str>) -> bool {
    keys.any(|key| COMPOSITION_KEYS.contains(&key))
}

/// Returns one property value, or null.
pub struct GetHandler;

#[async_trait]
impl MethodHandler for GetHandler {
    #[instrument(skip_all, fields(method = "properties.get"))]
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let name = require_string_param(params.as_ref(), "name")?;
        let value = ctx.rules.properties().property(&name);
        Ok(json!({ "value": value }))
    }
}

/// Sets `name` to `value`, or every key of an object passed as `name`.
pub struct SetHandler;

#[async_trait]
impl MethodHandler for SetHandler {
    #[instrument(skip_all, fields(method = "properties.set"))]
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let properties = ctx.rules.properties();
        let recompose = match require_param(params.as_ref(), "name")? {
            Value::String(name) => {
                let value = params
                    .as_ref()
                    .and_then(|p| p.get("value"))
                    .cloned()
                    .unwrap_or(Value::Null);
                properties
                    .set_property(name, value)
                    .map_err(|e| store_error(&e))?;
                affects_composition(std::iter::once(name.as_str()))
            }
            Value::Object(map) => {
                let recompose = affects_composition(map.keys().map(String::as_str));
                properties
                    .set_properties(map.clone())
                    .map_err(|e| store_error(&e))?;
                recompose
            }
            _ => {
                return Err(RpcError::InvalidParams {
                    message: "Parameter 'name' must be a string or an object".into(),
                });
            }
        };
        if recompose {
            debug!("composition property changed");
            ctx.rules.request_recompose();
        }
        Ok(json!({ "acknowledged": true }))
    }
}

/// Removes a property.
pub struct RemoveHandler;

#[async_trait]
impl MethodHandler for RemoveHandler {
    #[instrument(skip_all, fields(method = "properties.remove"))]
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let name = require_string_param(params.as_ref(), "name")?;
        ctx.rules
            .properties()
            .remove_property(&name)
            .map_err(|e| store_error(&e))?;
        if affects_composition(std::iter::once(name.as_str())) {
            ctx.rules.request_recompose();
        }
        Ok(json!({ "acknowledged": true }))
    }
}

/// Returns the composer history, newest first.
pub struct GetHistoryHandler;

#[async_trait]
impl MethodHandler for GetHistoryHandler {
    #[instrument(skip_all, fields(method = "properties.getHistory"))]
    async fn handle(&self, _params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        Ok(json!({ "list": ctx.history.entries() }))
    }
}

/// Records a composed request. The params object is the request.
pub struct AddHistoryHandler;

#[async_trait]
impl MethodHandler for AddHistoryHandler {
    #[instrument(skip_all, fields(method = "properties.addHistory"))]
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let data = params.unwrap_or(Value::Null);
        Ok(json!({ "accepted": ctx.history.add(&data) }))
    }
}
