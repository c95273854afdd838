//! # sluice-rules
//!
//! Rule management and composition.
//!
//! - [`registry`]: rule files, the ordered selection, and the default buffer
//! - [`values`]: value files with single selection
//! - [`compose`]: the deterministic composition pipeline
//! - [`remote`], [`inline_values`], [`hosts`]: the pipeline's text passes
//! - [`import`]: bulk import of rules and values
//! - [`service`]: wiring plus the coalescing recompose worker
//!
//! Network fetching, interpretation of the composed text, and the system
//! hosts file sit behind the traits in [`traits`].

#![deny(unsafe_code)]

pub mod compose;
pub mod hosts;
pub mod import;
pub mod inline_values;
pub mod registry;
pub mod remote;
pub mod service;
pub mod traits;
pub mod trigger;
pub mod values;

pub use compose::{ComposeInput, Composition, compose};
pub use registry::{RuleFileEntry, RulesRegistry};
pub use service::{Collaborators, CompositionReport, RulesService, Stores};
pub use traits::{InlineValueMap, NoRemote, RemoteFetcher, RuleInterpreter, SystemHosts};
pub use trigger::RecomposeTrigger;
pub use values::{ValueFileEntry, ValuesRegistry};
