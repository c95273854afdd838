//! Method registry and async dispatch.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::context::RpcContext;
use crate::errors::{self, RpcError};
use crate::handlers::opt_string;
use crate::types::{RpcRequest, RpcResponse};

/// Trait implemented by every RPC method handler.
#[async_trait]
pub trait MethodHandler: Send + Sync {
    /// Execute the handler with the given params and context.
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError>;
}

/// Registry mapping method names to handlers.
pub struct MethodRegistry {
    handlers: HashMap<String, Arc<dyn MethodHandler>>,
}

impl MethodRegistry {
    /// Handlers only touch local stores; a call running this long is stuck.
    const HANDLER_TIMEOUT: Duration = Duration::from_secs(30);

    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler for a method name.
    pub fn register(&mut self, method: &str, handler: impl MethodHandler + 'static) {
        let _ = self.handlers.insert(method.to_owned(), Arc::new(handler));
    }

    /// Dispatch a request to its handler.
    ///
    /// Outcomes are logged with the caller's `clientId` and the parameter
    /// shape. Parameter values are never logged.
    pub async fn dispatch(&self, request: RpcRequest, ctx: &RpcContext) -> RpcResponse {
        let RpcRequest { id, method, params } = request;
        let client = opt_string(params.as_ref(), "clientId");
        let client = client.as_deref();

        let Some(handler) = self.handlers.get(&method) else {
            debug!(method, client, "unknown method");
            return RpcResponse::error(
                &id,
                errors::METHOD_NOT_FOUND,
                format!("Method '{method}' not found"),
            );
        };

        let shape = params_shape(params.as_ref());
        let started = Instant::now();
        let result = tokio::time::timeout(Self::HANDLER_TIMEOUT, handler.handle(params, ctx)).await;
        let elapsed = started.elapsed();

        match result {
            Ok(Ok(result)) => {
                debug!(method, client, ?elapsed, "command handled");
                RpcResponse::success(&id, result)
            }
            Ok(Err(err)) => {
                if err.code() == errors::INVALID_PARAMS {
                    debug!(method, client, params = %shape, error = %err, "rejected params");
                } else {
                    warn!(
                        method,
                        client,
                        params = %shape,
                        code = err.code(),
                        error = %err,
                        "command failed"
                    );
                }
                RpcResponse {
                    id,
                    success: false,
                    result: None,
                    error: Some(err.to_error_body()),
                }
            }
            Err(_elapsed) => {
                error!(
                    method,
                    client,
                    params = %shape,
                    "command timed out after {:?}",
                    Self::HANDLER_TIMEOUT
                );
                RpcResponse::error(
                    &id,
                    errors::INTERNAL_ERROR,
                    format!("Handler for '{method}' timed out"),
                )
            }
        }
    }

    /// List all registered method names (sorted).
    pub fn methods(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check whether a method is registered.
    pub fn has_method(&self, method: &str) -> bool {
        self.handlers.contains_key(method)
    }
}

impl Default for MethodRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// `{key,key}` for object params, the JSON kind otherwise.
fn params_shape(params: Option<&Value>) -> String {
    match params {
        None | Some(Value::Null) => "none".into(),
        Some(Value::Object(map)) => {
            let keys: Vec<&str> = map.keys().map(String::as_str).collect();
            format!("{{{}}}", keys.join(","))
        }
        Some(Value::Array(items)) => format!("array[{}]", items.len()),
        Some(Value::String(_)) => "string".into(),
        Some(Value::Bool(_)) => "bool".into(),
        Some(Value::Number(_)) => "number".into(),
    }
}
