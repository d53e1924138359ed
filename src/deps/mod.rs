//! Dependency tracking for incremental builds.
//!
//! - [`Dependency`]: one recorded input of an artifact (persisted)
//! - [`DependencySet`]: deduplicated inputs of one artifact
//! - [`TrackingScope`]: accumulates inputs while one artifact is produced
//! - [`DependencyGraph`]: reverse index `input -> artifacts`
//! - [`DependencyProbe`]: compares recorded inputs with current reality

mod graph;
mod probe;
mod tracker;

pub use graph::DependencyGraph;
pub use probe::{DependencyProbe, PadProbe};
pub use tracker::TrackingScope;

use serde::{Deserialize, Serialize};

use crate::core::{Alt, RecordPath};
use crate::freshness::ContentHash;

/// One input an artifact's content was derived from.
///
/// Persisted in build state entries. Kinds written by a newer version
/// deserialize to [`Dependency::Unknown`], which is never current.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Dependency {
    /// A file, keyed project-relative (`templates/page.html`).
    /// An empty hash records that the file was absent.
    File {
        path: String,
        hash: ContentHash,
        size: u64,
    },
    /// Existence and fields of another record.
    Record {
        path: RecordPath,
        alt: Alt,
        fingerprint: ContentHash,
    },
    /// Identity, order and fields of a record's visible children.
    RecordChildren {
        path: RecordPath,
        alt: Alt,
        fingerprint: ContentHash,
    },
    /// A dotted project config key; `None` when the key was absent.
    ConfigKey {
        key: String,
        value: Option<ContentHash>,
    },
    #[serde(other)]
    Unknown,
}

/// Identity of a dependency, without its recorded value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DepKey {
    File(String),
    Record(RecordPath, Alt),
    Children(RecordPath, Alt),
    Config(String),
    Unknown,
}

impl Dependency {
    pub fn key(&self) -> DepKey {
        match self {
            Self::File { path, .. } => DepKey::File(path.clone()),
            Self::Record { path, alt, .. } => DepKey::Record(path.clone(), alt.clone()),
            Self::RecordChildren { path, alt, .. } => DepKey::Children(path.clone(), alt.clone()),
            Self::ConfigKey { key, .. } => DepKey::Config(key.clone()),
            Self::Unknown => DepKey::Unknown,
        }
    }
}

/// Inputs of one artifact, first value per key wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Dependency>", into = "Vec<Dependency>")]
pub struct DependencySet {
    deps: Vec<Dependency>,
}

impl DependencySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `dep` unless a dependency with the same key is already present.
    ///
    /// Sources are immutable during a pass, so a repeated read observes the
    /// same value.
    pub fn insert(&mut self, dep: Dependency) -> bool {
        let key = dep.key();
        if self.deps.iter().any(|d| d.key() == key) {
            return false;
        }
        self.deps.push(dep);
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = &Dependency> {
        self.deps.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = DepKey> + '_ {
        self.deps.iter().map(Dependency::key)
    }

    pub fn len(&self) -> usize {
        self.deps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deps.is_empty()
    }

    /// Whether any dependency is of a kind this version does not understand.
    pub fn has_unknown(&self) -> bool {
        self.deps.iter().any(|d| matches!(d, Dependency::Unknown))
    }

    /// Whether a file with this project-relative key is an input.
    pub fn references_file(&self, key: &str) -> bool {
        self.deps
            .iter()
            .any(|d| matches!(d, Dependency::File { path, .. } if path == key))
    }
}

impl From<Vec<Dependency>> for DependencySet {
    fn from(deps: Vec<Dependency>) -> Self {
        let mut set = Self::new();
        for dep in deps {
            set.insert(dep);
        }
        set
    }
}

impl From<DependencySet> for Vec<Dependency> {
    fn from(set: DependencySet) -> Self {
        set.deps
    }
}
