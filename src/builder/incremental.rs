//! Change sets to affected artifacts.
//!
//! For each changed path:
//! - the config file forces a full plan
//! - artifacts recording the file as an input are affected
//! - for content paths, everything that read the owning record or a record
//!   below it, and everything that listed the owner's parent's children
//!
//! The result over-approximates; Plan still checks each affected artifact
//! against its state entry. The lookups use the reverse index derived from
//! stored entries.

use std::path::PathBuf;

use rustc_hash::FxHashSet;

use crate::content::Pad;
use crate::core::{ArtifactPath, RecordPath};
use crate::deps::{DepKey, DependencyGraph};
use crate::utils::fs::dep_key;

#[derive(Debug, PartialEq, Eq)]
pub enum Affected {
    /// Plan everything (config changed)
    Full,
    Artifacts(FxHashSet<ArtifactPath>),
}

pub fn affected_artifacts(changes: &[PathBuf], pad: &Pad, graph: &DependencyGraph) -> Affected {
    let config = pad.config();
    let alts = config.alts();
    let mut affected = FxHashSet::default();

    let add_users = |key: DepKey, affected: &mut FxHashSet<ArtifactPath>| {
        if let Some(users) = graph.used_by(&key) {
            affected.extend(users.iter().cloned());
        }
    };

    for change in changes {
        if config.is_config_file(change) {
            crate::debug!("incremental"; "config changed, planning everything");
            return Affected::Full;
        }

        add_users(DepKey::File(dep_key(&config.root, change)), &mut affected);

        let Some((as_record, parent)) = pad.tree().owners_of(change) else {
            continue;
        };
        for record in owner_candidates(as_record, parent) {
            affected.extend(graph.record_users_within(&record).cloned());
            if let Some(parent) = record.parent() {
                for alt in &alts {
                    add_users(DepKey::Children(parent.clone(), alt.clone()), &mut affected);
                }
            }
        }
    }

    crate::debug!("incremental"; "{} changed paths affect {} artifacts", changes.len(), affected.len());
    Affected::Artifacts(affected)
}

/// A changed path is either a record directory or a file inside one.
fn owner_candidates(as_record: RecordPath, parent: RecordPath) -> Vec<RecordPath> {
    if as_record == parent {
        vec![as_record]
    } else {
        vec![as_record, parent]
    }
}
