//! System handlers: ping, getModified.

use async_trait::async_trait;
use serde_json::Value;
use tracing::instrument;

use crate::context::RpcContext;
use crate::errors::RpcError;
use crate::registry::MethodHandler;

/// Returns a pong with the current server timestamp.
pub struct PingHandler;

#[async_trait]
impl MethodHandler for PingHandler {
    #[instrument(skip_all, fields(method = "system.ping"))]
    async fn handle(&self, _params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        Ok(serde_json::json!({
            "pong": true,
            "version": env!("CARGO_PKG_VERSION"),
            "uptime": ctx.start_time.elapsed().as_secs(),
            "timestamp": chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        }))
    }
}

/// Returns the modification tracker state.
pub struct GetModifiedHandler;

#[async_trait]
impl MethodHandler for GetModifiedHandler {
    #[instrument(skip_all, fields(method = "system.getModified"))]
    async fn handle(&self, _params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        serde_json::to_value(ctx.changes.snapshot()).map_err(|e| RpcError::Internal {
            message: e.to_string(),
        })
    }
}
