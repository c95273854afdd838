//! # sluice-remote
//!
//! [`RemoteRulesCache`] backs the `@url` / `@path` include directives of the
//! composition pipeline. Lookups are served from memory, loads and refreshes
//! run on the Tokio runtime, and changed includes are announced on a
//! broadcast channel. Each composition pass decides which entries stay.

#![deny(unsafe_code)]

pub mod cache;
pub mod errors;

pub use cache::RemoteRulesCache;
pub use errors::{RemoteError, Result};
