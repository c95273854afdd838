//! # sluice-core
//!
//! Foundation pieces shared by every Sluice crate:
//!
//! - **Constants**: composition limits, history caps, and the well-known
//!   property keys persisted in the stores
//! - **Text**: line splitting and line-order reversal used by the
//!   composition pipeline and the remote include resolver
//! - **Logging**: `tracing` subscriber setup

#![deny(unsafe_code)]

pub mod constants;
pub mod logging;
pub mod text;

pub use logging::{LogFormat, init_subscriber};
