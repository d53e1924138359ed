//! Reverse dependency index.
//!
//! Derived from build state entries at the start of a pass; the entries
//! stay the only source of truth.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::core::{ArtifactPath, RecordPath};

use super::{DepKey, DependencySet};

/// `input -> artifacts that read it`, plus the forward sets needed to
/// re-record an artifact.
///
/// Recording an artifact replaces its previous inputs; the two directions
/// never disagree.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    inputs: FxHashMap<ArtifactPath, Vec<DepKey>>,
    users: FxHashMap<DepKey, FxHashSet<ArtifactPath>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, artifact: &ArtifactPath, deps: &DependencySet) {
        self.forget(artifact);

        let mut keys: Vec<DepKey> = deps.keys().collect();
        keys.dedup();
        for key in &keys {
            self.users
                .entry(key.clone())
                .or_default()
                .insert(artifact.clone());
        }
        self.inputs.insert(artifact.clone(), keys);
    }

    /// Artifacts whose last successful production read `key`.
    pub fn used_by(&self, key: &DepKey) -> Option<&FxHashSet<ArtifactPath>> {
        self.users.get(key)
    }

    /// Artifacts that read `ancestor` or any record below it, as a record
    /// or as a children list, in any alternate.
    ///
    /// A record's state folds in inherited properties (URL, model, hidden),
    /// so a change to a record can reach readers of its descendants.
    pub fn record_users_within<'a>(
        &'a self,
        ancestor: &'a RecordPath,
    ) -> impl Iterator<Item = &'a ArtifactPath> + 'a {
        self.users
            .iter()
            .filter(move |(key, _)| match key {
                DepKey::Record(path, _) | DepKey::Children(path, _) => path.is_within(ancestor),
                _ => false,
            })
            .flat_map(|(_, artifacts)| artifacts.iter())
    }

    fn forget(&mut self, artifact: &ArtifactPath) {
        for key in self.inputs.remove(artifact).into_iter().flatten() {
            if let Some(set) = self.users.get_mut(&key) {
                set.remove(artifact);
                if set.is_empty() {
                    self.users.remove(&key);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deps::Dependency;
    use crate::freshness::ContentHash;

    fn reads(paths: &[&str]) -> DependencySet {
        let deps: Vec<Dependency> = paths
            .iter()
            .map(|p| Dependency::File {
                path: p.to_string(),
                hash: ContentHash::empty(),
                size: 0,
            })
            .collect();
        deps.into()
    }

    fn file(path: &str) -> DepKey {
        DepKey::File(path.to_string())
    }

    #[test]
    fn shared_template_has_all_users() {
        let mut graph = DependencyGraph::new();
        let a = ArtifactPath::new("a/index.html");
        let b = ArtifactPath::new("b/index.html");
        graph.record(&a, &reads(&["templates/page.html", "content/a/contents.lr"]));
        graph.record(&b, &reads(&["templates/page.html"]));

        let users = graph.used_by(&file("templates/page.html")).unwrap();
        assert_eq!(users.len(), 2);
        assert!(users.contains(&a) && users.contains(&b));
        assert_eq!(graph.used_by(&file("content/a/contents.lr")).unwrap().len(), 1);
        assert!(graph.used_by(&file("content/c/contents.lr")).is_none());
    }

    #[test]
    fn record_users_within_covers_descendants() {
        use crate::core::Alt;

        let mut graph = DependencyGraph::new();
        let reader = ArtifactPath::new("about/index.html");
        let listing = ArtifactPath::new("index.html");
        let other = ArtifactPath::new("docs/index.html");
        let record = |path: &str| Dependency::Record {
            path: RecordPath::new(path),
            alt: Alt::implicit(),
            fingerprint: ContentHash::empty(),
        };
        graph.record(&reader, &vec![record("/blog/p1")].into());
        graph.record(
            &listing,
            &vec![Dependency::RecordChildren {
                path: RecordPath::new("/blog"),
                alt: Alt::new("de"),
                fingerprint: ContentHash::empty(),
            }]
            .into(),
        );
        graph.record(&other, &vec![record("/blogroll")].into());

        let blog = RecordPath::new("/blog");
        let mut found: Vec<&ArtifactPath> = graph.record_users_within(&blog).collect();
        found.sort();
        assert_eq!(found, [&reader, &listing]);

        let p1 = RecordPath::new("/blog/p1");
        assert_eq!(graph.record_users_within(&p1).count(), 1);
    }

    #[test]
    fn rerecording_replaces_inputs() {
        let mut graph = DependencyGraph::new();
        let index = ArtifactPath::new("index.html");
        graph.record(&index, &reads(&["templates/old.html"]));
        graph.record(&index, &reads(&["templates/new.html"]));

        assert!(graph.used_by(&file("templates/old.html")).is_none());
        assert!(graph.used_by(&file("templates/new.html")).unwrap().contains(&index));
        assert!(graph.users.keys().all(|k| *k == file("templates/new.html")));
    }
}
