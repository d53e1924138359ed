//! Per-artifact dependency scope.
//!
//! A scope is opened before an artifact is produced and owned by that
//! production alone. It ends through exactly one of [`TrackingScope::commit`]
//! (success) or [`TrackingScope::discard`] (failure); a scope dropped any
//! other way records nothing.

use std::path::Path;

use crate::config::ProjectConfig;
use crate::content::Pad;
use crate::core::{Alt, ArtifactPath, RecordPath};
use crate::utils::fs::dep_key;

use super::{Dependency, DependencySet};

pub struct TrackingScope {
    artifact: ArtifactPath,
    deps: DependencySet,
    closed: bool,
}

impl TrackingScope {
    /// Open a scope for producing `artifact`.
    pub fn begin(artifact: ArtifactPath) -> Self {
        Self {
            artifact,
            deps: DependencySet::new(),
            closed: false,
        }
    }

    pub fn artifact(&self) -> &ArtifactPath {
        &self.artifact
    }

    pub fn len(&self) -> usize {
        self.deps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deps.is_empty()
    }

    pub fn record(&mut self, dep: Dependency) {
        self.deps.insert(dep);
    }

    /// A file read (template, content file, attachment, data file).
    pub fn record_file(&mut self, pad: &Pad, file: &Path) {
        let (hash, size) = pad.file_signature(file);
        self.record(Dependency::File {
            path: dep_key(&pad.config().root, file),
            hash,
            size,
        });
    }

    /// Access to another record's existence or fields.
    pub fn record_record(&mut self, pad: &Pad, path: &RecordPath, alt: &Alt) {
        self.record(Dependency::Record {
            path: path.clone(),
            alt: alt.clone(),
            fingerprint: pad.record_fingerprint(path, alt),
        });
    }

    /// Enumeration of a record's children.
    pub fn record_children(&mut self, pad: &Pad, path: &RecordPath, alt: &Alt) {
        self.record(Dependency::RecordChildren {
            path: path.clone(),
            alt: alt.clone(),
            fingerprint: pad.children_fingerprint(path, alt),
        });
    }

    /// Read of a dotted config key.
    pub fn record_config(&mut self, config: &ProjectConfig, key: &str) {
        self.record(Dependency::ConfigKey {
            key: key.to_string(),
            value: config.value_hash(key),
        });
    }

    /// End the scope successfully, handing over the recorded set.
    pub fn commit(mut self) -> DependencySet {
        self.closed = true;
        std::mem::take(&mut self.deps)
    }

    /// End the scope after a failure; nothing is kept.
    pub fn discard(mut self) {
        self.closed = true;
        crate::debug!("deps"; "discarded {} dependencies of {}", self.deps.len(), self.artifact);
    }
}

impl Drop for TrackingScope {
    fn drop(&mut self) {
        if !self.closed {
            crate::debug!("deps"; "scope for {} dropped without commit", self.artifact);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::LrParser;
    use crate::freshness::ContentHash;
    use crate::resolve::GeneratorRegistry;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn pad(dir: &TempDir) -> Pad {
        let root = dir.path();
        fs::write(root.join("folio.toml"), "[project]\nname = \"Demo\"\n").unwrap();
        fs::create_dir_all(root.join("content/blog")).unwrap();
        fs::create_dir_all(root.join("templates")).unwrap();
        fs::write(root.join("templates/page.html"), "{{ this.title }}").unwrap();
        let config = Arc::new(ProjectConfig::load(root).unwrap());
        Pad::open(config, Arc::new(LrParser), Arc::new(GeneratorRegistry::new()))
    }

    #[test]
    fn commit_returns_recorded_inputs() {
        let dir = TempDir::new().unwrap();
        let pad = pad(&dir);
        let alt = Alt::implicit();

        let mut scope = TrackingScope::begin(ArtifactPath::new("index.html"));
        scope.record_file(&pad, &dir.path().join("templates/page.html"));
        scope.record_file(&pad, &dir.path().join("templates/page.html"));
        scope.record_record(&pad, &RecordPath::new("/blog"), &alt);
        scope.record_children(&pad, &RecordPath::root(), &alt);
        scope.record_config(pad.config(), "project.name");

        let deps = scope.commit();
        assert_eq!(deps.len(), 4);
        assert!(deps.references_file("templates/page.html"));
    }

    #[test]
    fn missing_file_records_empty_hash() {
        let dir = TempDir::new().unwrap();
        let pad = pad(&dir);

        let mut scope = TrackingScope::begin(ArtifactPath::new("index.html"));
        scope.record_file(&pad, &dir.path().join("templates/missing.html"));
        let deps = scope.commit();

        let Some(Dependency::File { hash, size, .. }) = deps.iter().next() else {
            panic!("expected file dependency");
        };
        assert_eq!(*hash, ContentHash::empty());
        assert_eq!(*size, 0);
    }

    #[test]
    fn discard_and_drop_record_nothing() {
        let mut scope = TrackingScope::begin(ArtifactPath::new("a.html"));
        scope.record(Dependency::Unknown);
        scope.discard();

        let mut dropped = TrackingScope::begin(ArtifactPath::new("b.html"));
        dropped.record(Dependency::Unknown);
        assert_eq!(dropped.len(), 1);
        drop(dropped);
    }
}
