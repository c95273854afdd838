//! # sluice-store
//!
//! Persistent namespaces of named text blobs.
//!
//! Each namespace (rules, values, properties) is one [`Storage`] instance
//! holding:
//!
//! - an **ordered** list of named text entries (order is user-visible and
//!   changed with [`Storage::move_to`])
//! - a **property bag** of JSON values for settings and selection state
//! - auxiliary **raw files** for data that is not a named entry (the
//!   composer history)
//!
//! [`FileStorage`] keeps a namespace in a directory; [`MemoryStorage`] keeps
//! it in memory and is used by tests across the workspace.

#![deny(unsafe_code)]

mod catalog;
pub mod errors;
pub mod file;
pub mod memory;
pub mod props;
pub mod storage;

pub use errors::{Result, StoreError};
pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use storage::{Storage, StoredFile, is_valid_name};
