//! Prune phase and clean: the only places outputs are deleted.

use std::fs;
use std::path::Path;

use crate::core::ArtifactPath;
use crate::error::{PruneError, StoreError};
use crate::resolve::ArtifactSet;
use crate::state::BuildStateStore;
use crate::utils::fs::remove_with_empty_parents;

use super::report::BuildReport;

/// Known outputs the current tree no longer produces.
///
/// Outputs whose record is currently invalid are kept: fixing a typo in
/// `contents.lr` must not unpublish the page in between.
pub fn orphans(store: &BuildStateStore, artifacts: &ArtifactSet) -> Vec<ArtifactPath> {
    store
        .entries()
        .into_iter()
        .filter(|entry| !artifacts.contains(&entry.artifact))
        .filter(|entry| {
            let retained = entry
                .record
                .as_ref()
                .is_some_and(|record| artifacts.in_invalid_record(record));
            if retained {
                crate::debug!("prune"; "keeping {} of invalid record", entry.artifact);
            }
            !retained
        })
        .map(|entry| entry.artifact)
        .collect()
}

/// Delete outputs and their entries.
///
/// A file that cannot be deleted is reported and its entry kept, so the
/// next run retries it. Store failures are fatal.
pub fn remove_outputs(
    store: &BuildStateStore,
    output_root: &Path,
    paths: &[ArtifactPath],
    report: &mut BuildReport,
) -> Result<(), StoreError> {
    for path in paths {
        let file = path.to_fs_path(output_root);
        if let Err(source) = remove_with_empty_parents(&file, output_root) {
            report.prune_errors.push(PruneError {
                artifact: path.clone(),
                source,
            });
            continue;
        }
        store.remove(path)?;
        crate::debug!("prune"; "removed {}", path);
        report.pruned += 1;
        report.pruned_paths.push(path.clone());
    }
    Ok(())
}

/// Delete every known output and entry.
pub fn clean_all(
    store: &BuildStateStore,
    output_root: &Path,
    report: &mut BuildReport,
) -> Result<(), StoreError> {
    let known: Vec<ArtifactPath> = store.all_known_paths().into_iter().collect();
    remove_outputs(store, output_root, &known, report)
}

/// Remove the state directory once it holds no entries.
pub fn remove_state_dir(output_root: &Path) -> Result<(), StoreError> {
    let state_dir = BuildStateStore::state_dir(output_root);
    match fs::remove_dir_all(&state_dir) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(StoreError::Io(state_dir, e)),
    }
    // `.folio` itself, when nothing else lives there
    if let Some(parent) = state_dir.parent()
        && parent != output_root
    {
        let _ = fs::remove_dir(parent);
    }
    Ok(())
}
