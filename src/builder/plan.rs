//! Plan phase: split the discovered artifacts into stale and fresh.
//!
//! - Full plan: every artifact is checked against its state entry
//! - Incremental plan: only artifacts affected by the change set, plus
//!   artifacts without a usable entry (new, or failed last time), are
//!   checked
//!
//! Either way an artifact is built only when its entry is not fresh.

use std::path::PathBuf;

use rayon::prelude::*;

use crate::content::Pad;
use crate::core::ArtifactPath;
use crate::deps::PadProbe;
use crate::resolve::ArtifactSet;
use crate::state::BuildStateStore;

use super::incremental::{Affected, affected_artifacts};

/// Artifacts to produce, in artifact path order.
#[derive(Debug, Default)]
pub struct Plan {
    pub must_build: Vec<ArtifactPath>,
    pub skipped: usize,
    pub incremental: bool,
}

pub fn plan(
    artifacts: &ArtifactSet,
    store: &BuildStateStore,
    pad: &Pad,
    changed: Option<&[PathBuf]>,
) -> Plan {
    let incremental = changed.and_then(|changes| {
        match affected_artifacts(changes, pad, &store.dependency_graph()) {
            Affected::Full => None,
            Affected::Artifacts(affected) => Some(affected),
        }
    });

    let candidates: Vec<&ArtifactPath> = match &incremental {
        None => artifacts.paths().collect(),
        Some(affected) => artifacts
            .paths()
            .filter(|path| {
                affected.contains(*path) || store.get(path).is_none_or(|entry| entry.failed)
            })
            .collect(),
    };

    let must_build = stale_among(&candidates, store, pad);
    Plan {
        skipped: artifacts.len() - must_build.len(),
        must_build,
        incremental: incremental.is_some(),
    }
}

/// Candidates whose state entry is not fresh, checked in parallel (reads only).
fn stale_among(candidates: &[&ArtifactPath], store: &BuildStateStore, pad: &Pad) -> Vec<ArtifactPath> {
    let probe = PadProbe::new(pad);
    candidates
        .par_iter()
        .filter_map(|path| {
            let reason = store.staleness(path, &probe)?;
            crate::debug!("plan"; "{} is stale: {:?}", path, reason);
            Some((*path).clone())
        })
        .collect()
}
