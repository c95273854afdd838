//! # sluice-history
//!
//! Composer request history: the last 36 distinct requests sent from the
//! request composer, newest first.
//!
//! The in-memory list is authoritative. Writes to the `composerHistory` file
//! of the properties namespace are debounced (one pending write per window)
//! and best-effort: failures are logged and dropped.

#![deny(unsafe_code)]

pub mod entry;
pub mod store;

pub use entry::HistoryEntry;
pub use store::ComposerHistory;
