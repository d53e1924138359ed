//! Folio - an incremental static site build engine.
//!
//! A build turns a content tree (`content/`, one directory per record)
//! into output files, rebuilding only what changed since the last run:
//!
//! ```text
//! content tree → artifact set → plan (state store) → produce → prune
//! ```
//!
//! Every artifact carries the set of inputs it read while being produced;
//! the [`state::BuildStateStore`] keeps those sets between runs, and the
//! reverse index over them decides what a change invalidates.

pub mod builder;
pub mod config;
pub mod content;
pub mod core;
pub mod deps;
pub mod error;
pub mod freshness;
pub mod hooks;
pub mod logger;
pub mod render;
pub mod resolve;
pub mod state;
pub mod utils;
pub mod watch;

pub use builder::{BuildOptions, BuildOutcome, BuildReport, Project, build, clean, prune};
pub use error::BuildError;
pub use watch::{WatchHandle, watch};
