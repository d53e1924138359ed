//! Build state store: one JSON document per artifact.
//!
//! # Layout
//!
//! ```text
//! <output>/.folio/state/entries/<blake3(artifact path)>.json
//! ```
//!
//! Every document is replaced through temp file + rename, so a crash
//! leaves each entry either at its previous or its new content, and never
//! touches other entries. Temp files left by an interrupted run are
//! removed on open. Unreadable documents are reported and treated as
//! missing, which makes their artifacts stale.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use crate::core::ArtifactPath;
use crate::deps::{DepKey, DependencyGraph, DependencyProbe, DependencySet};
use crate::error::StoreError;
use crate::freshness::{ContentHash, compute_file_hash, hash_bytes};
use crate::utils::fs::{atomic_write, is_temp_name};

use super::entry::{BuildStateEntry, Provenance, current_timestamp};

/// State directory below the output root.
pub const STATE_DIR: &str = ".folio/state";
const ENTRIES_DIR: &str = "entries";

/// Why an artifact has to be rebuilt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Staleness {
    /// No entry (never built, or the entry was unreadable)
    Missing,
    /// The last production failed
    Failed,
    /// The output was changed or deleted out of band
    OutputChanged,
    /// The entry references a dependency kind this version does not know
    UnknownDependency,
    /// A recorded input no longer matches
    DependencyChanged(DepKey),
}

pub struct BuildStateStore {
    output_root: PathBuf,
    entries_dir: PathBuf,
    entries: RwLock<BTreeMap<ArtifactPath, BuildStateEntry>>,
    generation: u64,
    warnings: Vec<String>,
}

impl BuildStateStore {
    /// Open (or create) the store of `output_root` and load every entry.
    pub fn open(output_root: &Path) -> Result<Self, StoreError> {
        let entries_dir = Self::state_dir(output_root).join(ENTRIES_DIR);
        fs::create_dir_all(&entries_dir).map_err(|e| StoreError::Io(entries_dir.clone(), e))?;

        let listing = fs::read_dir(&entries_dir).map_err(|e| StoreError::Io(entries_dir.clone(), e))?;
        let mut entries = BTreeMap::new();
        let mut warnings = Vec::new();

        for dir_entry in listing.filter_map(Result::ok) {
            let path = dir_entry.path();
            let name = dir_entry.file_name().to_string_lossy().into_owned();

            if is_temp_name(&name) {
                crate::debug!("state"; "removing leftover {}", name);
                let _ = fs::remove_file(&path);
                continue;
            }
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }

            match Self::read_entry(&path) {
                Ok(entry) if entry_file_name(&entry.artifact) == name => {
                    entries.insert(entry.artifact.clone(), entry);
                }
                Ok(entry) => warnings.push(format!(
                    "state entry `{name}` does not belong to `{}`, ignoring",
                    entry.artifact
                )),
                Err(err) => warnings.push(format!("{err}, treating as missing")),
            }
        }

        let generation = entries.values().map(|e| e.generation).max().unwrap_or(0) + 1;
        crate::debug!("state"; "loaded {} entries, generation {}", entries.len(), generation);

        Ok(Self {
            output_root: output_root.to_path_buf(),
            entries_dir,
            entries: RwLock::new(entries),
            generation,
            warnings,
        })
    }

    fn read_entry(path: &Path) -> Result<BuildStateEntry, StoreError> {
        let content = fs::read(path).map_err(|e| StoreError::Io(path.to_path_buf(), e))?;
        serde_json::from_slice(&content).map_err(|e| StoreError::Corrupt(path.to_path_buf(), e))
    }

    pub fn state_dir(output_root: &Path) -> PathBuf {
        let mut dir = output_root.to_path_buf();
        dir.extend(STATE_DIR.split('/'));
        dir
    }

    /// Generation stamped on entries written through this handle.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Problems met while loading (unreadable entries).
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn get(&self, artifact: &ArtifactPath) -> Option<BuildStateEntry> {
        self.entries.read().get(artifact).cloned()
    }

    // ========================================================================
    // Freshness
    // ========================================================================

    pub fn is_fresh(&self, artifact: &ArtifactPath, probe: &dyn DependencyProbe) -> bool {
        self.staleness(artifact, probe).is_none()
    }

    /// `None` when fresh, otherwise the first reason found.
    pub fn staleness(&self, artifact: &ArtifactPath, probe: &dyn DependencyProbe) -> Option<Staleness> {
        let entries = self.entries.read();
        let Some(entry) = entries.get(artifact) else {
            return Some(Staleness::Missing);
        };
        if entry.failed {
            return Some(Staleness::Failed);
        }
        if entry.dependencies.has_unknown() {
            return Some(Staleness::UnknownDependency);
        }
        if compute_file_hash(&artifact.to_fs_path(&self.output_root)) != entry.content_hash {
            return Some(Staleness::OutputChanged);
        }
        entry
            .dependencies
            .iter()
            .find(|dep| !probe.is_current(dep))
            .map(|dep| Staleness::DependencyChanged(dep.key()))
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Commit a successful production, replacing any previous entry.
    pub fn record(
        &self,
        artifact: &ArtifactPath,
        content_hash: ContentHash,
        dependencies: DependencySet,
        provenance: Provenance,
    ) -> Result<(), StoreError> {
        self.write(BuildStateEntry {
            artifact: artifact.clone(),
            source: provenance.source,
            record: provenance.record,
            alt: provenance.alt,
            content_hash,
            dependencies,
            generation: self.generation,
            built_at: current_timestamp(),
            failed: false,
        })
    }

    /// Replace the entry with a failed marker: the output stays known for
    /// pruning but is never fresh.
    pub fn mark_failed(&self, artifact: &ArtifactPath, provenance: Provenance) -> Result<(), StoreError> {
        self.write(BuildStateEntry {
            artifact: artifact.clone(),
            source: provenance.source,
            record: provenance.record,
            alt: provenance.alt,
            content_hash: ContentHash::empty(),
            dependencies: DependencySet::new(),
            generation: self.generation,
            built_at: current_timestamp(),
            failed: true,
        })
    }

    fn write(&self, entry: BuildStateEntry) -> Result<(), StoreError> {
        let path = self.entry_path(&entry.artifact);
        let json = serde_json::to_vec_pretty(&entry)
            .map_err(|e| StoreError::Encode(entry.artifact.clone(), e))?;
        atomic_write(&path, &json).map_err(|e| StoreError::Io(path, e))?;
        self.entries.write().insert(entry.artifact.clone(), entry);
        Ok(())
    }

    /// Delete an entry. Missing entries are not an error.
    pub fn remove(&self, artifact: &ArtifactPath) -> Result<(), StoreError> {
        let path = self.entry_path(artifact);
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(StoreError::Io(path, e)),
        }
        self.entries.write().remove(artifact);
        Ok(())
    }

    // ========================================================================
    // Enumeration
    // ========================================================================

    pub fn all_known_paths(&self) -> BTreeSet<ArtifactPath> {
        self.entries.read().keys().cloned().collect()
    }

    pub fn entries(&self) -> Vec<BuildStateEntry> {
        self.entries.read().values().cloned().collect()
    }

    /// Reverse index over the recorded dependency sets.
    pub fn dependency_graph(&self) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for entry in self.entries.read().values() {
            graph.record(&entry.artifact, &entry.dependencies);
        }
        graph
    }

    fn entry_path(&self, artifact: &ArtifactPath) -> PathBuf {
        self.entries_dir.join(entry_file_name(artifact))
    }
}

fn entry_file_name(artifact: &ArtifactPath) -> String {
    format!("{}.json", hash_bytes(artifact.as_str().as_bytes()).to_hex())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Alt, RecordPath};
    use crate::deps::Dependency;
    use tempfile::TempDir;

    /// Probe with a fixed answer.
    struct Always(bool);

    impl DependencyProbe for Always {
        fn is_current(&self, _dep: &Dependency) -> bool {
            self.0
        }
    }

    fn provenance(source: &str) -> Provenance {
        Provenance {
            source: source.to_string(),
            record: Some(RecordPath::new(source)),
            alt: Alt::implicit(),
        }
    }

    fn deps() -> DependencySet {
        vec![Dependency::ConfigKey {
            key: "project.name".to_string(),
            value: None,
        }]
        .into()
    }

    /// Write an output and record it as built.
    fn built(store: &BuildStateStore, output: &Path, path: &str, data: &[u8]) -> ArtifactPath {
        let artifact = ArtifactPath::new(path);
        atomic_write(&artifact.to_fs_path(output), data).unwrap();
        store
            .record(&artifact, hash_bytes(data), deps(), provenance("/"))
            .unwrap();
        artifact
    }

    #[test]
    fn record_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let store = BuildStateStore::open(dir.path()).unwrap();
        assert_eq!(store.generation(), 1);
        let artifact = built(&store, dir.path(), "index.html", b"<p>hi</p>");

        let reopened = BuildStateStore::open(dir.path()).unwrap();
        assert_eq!(reopened.generation(), 2);
        assert_eq!(reopened.get(&artifact), store.get(&artifact));
        assert!(reopened.is_fresh(&artifact, &Always(true)));
    }

    #[test]
    fn staleness_reasons() {
        let dir = TempDir::new().unwrap();
        let store = BuildStateStore::open(dir.path()).unwrap();
        let artifact = built(&store, dir.path(), "a/index.html", b"one");

        assert_eq!(
            store.staleness(&ArtifactPath::new("nope.html"), &Always(true)),
            Some(Staleness::Missing)
        );
        assert!(matches!(
            store.staleness(&artifact, &Always(false)),
            Some(Staleness::DependencyChanged(DepKey::Config(_)))
        ));

        // Out-of-band edit of the output
        fs::write(artifact.to_fs_path(dir.path()), b"edited").unwrap();
        assert_eq!(
            store.staleness(&artifact, &Always(true)),
            Some(Staleness::OutputChanged)
        );

        store.mark_failed(&artifact, provenance("/a")).unwrap();
        assert_eq!(store.staleness(&artifact, &Always(true)), Some(Staleness::Failed));
        assert!(store.all_known_paths().contains(&artifact));
    }

    #[test]
    fn corrupt_entries_degrade_to_missing() {
        let dir = TempDir::new().unwrap();
        let store = BuildStateStore::open(dir.path()).unwrap();
        let good = built(&store, dir.path(), "good.html", b"good");
        let bad = built(&store, dir.path(), "bad.html", b"bad");

        let entries_dir = BuildStateStore::state_dir(dir.path()).join(ENTRIES_DIR);
        fs::write(entries_dir.join(entry_file_name(&bad)), b"{ not json").unwrap();
        fs::write(entries_dir.join(".partial.json.1.0.tmp"), b"{").unwrap();

        let reopened = BuildStateStore::open(dir.path()).unwrap();
        assert_eq!(reopened.warnings().len(), 1);
        assert!(reopened.get(&good).is_some());
        assert!(!reopened.is_fresh(&bad, &Always(true)));
        assert!(!entries_dir.join(".partial.json.1.0.tmp").exists());
    }

    #[test]
    fn remove_and_enumerate() {
        let dir = TempDir::new().unwrap();
        let store = BuildStateStore::open(dir.path()).unwrap();
        let a = built(&store, dir.path(), "a.html", b"a");
        let b = built(&store, dir.path(), "b.html", b"b");

        store.remove(&a).unwrap();
        store.remove(&a).unwrap();
        assert_eq!(store.all_known_paths().into_iter().collect::<Vec<_>>(), [b.clone()]);

        let graph = store.dependency_graph();
        assert!(
            graph
                .used_by(&DepKey::Config("project.name".to_string()))
                .unwrap()
                .contains(&b)
        );
        assert_eq!(BuildStateStore::open(dir.path()).unwrap().len(), 1);
    }
}
