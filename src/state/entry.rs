//! Persisted per-artifact build state.

use serde::{Deserialize, Serialize};

use crate::core::{Alt, ArtifactPath, RecordPath};
use crate::deps::DependencySet;
use crate::freshness::ContentHash;

/// Where an artifact came from, stored next to its state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    /// Source path including any virtual suffix
    pub source: String,
    /// Owning record (the parent for attachments)
    pub record: Option<RecordPath>,
    pub alt: Alt,
}

/// State of one artifact as of its last production.
///
/// Replaced as a whole on every rebuild. Fields added by newer versions
/// are ignored on read; missing optional fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStateEntry {
    pub artifact: ArtifactPath,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub record: Option<RecordPath>,
    #[serde(default = "Alt::implicit")]
    pub alt: Alt,
    /// Hash of the output as written
    #[serde(default)]
    pub content_hash: ContentHash,
    #[serde(default)]
    pub dependencies: DependencySet,
    /// Build run that produced this entry
    #[serde(default)]
    pub generation: u64,
    /// Unix timestamp (seconds)
    #[serde(default)]
    pub built_at: u64,
    /// Last production failed; never fresh
    #[serde(default)]
    pub failed: bool,
}

impl BuildStateEntry {
    pub fn provenance(&self) -> Provenance {
        Provenance {
            source: self.source.clone(),
            record: self.record.clone(),
            alt: self.alt.clone(),
        }
    }
}

/// Current Unix timestamp in seconds
pub(crate) fn current_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
