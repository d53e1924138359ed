//! Persistent build state: artifact -> dependency set -> content hash.

mod entry;
mod store;

pub use entry::{BuildStateEntry, Provenance};
pub use store::{BuildStateStore, STATE_DIR, Staleness};
