//! # sluice-rpc
//!
//! JSON command surface for the Sluice service.
//!
//! - **Types**: `RpcRequest`, `RpcResponse`, `RpcErrorBody` wire types
//! - **Registry**: `MethodRegistry` with async dispatch and a per-call timeout
//! - **Context**: `RpcContext` handed to every handler, plus the
//!   modification tracker UI clients poll
//! - **Handlers**: one struct per method in the `rules`, `values`,
//!   `properties` and `system` namespaces

#![deny(unsafe_code)]

pub mod context;
pub mod errors;
pub mod handlers;
pub mod registry;
pub mod types;

pub use context::{ChangeTracker, Modification, RpcContext};
pub use errors::RpcError;
pub use handlers::register_all;
pub use registry::{MethodHandler, MethodRegistry};
pub use types::{RpcErrorBody, RpcRequest, RpcResponse};
