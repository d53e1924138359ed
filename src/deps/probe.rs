//! Checking recorded dependencies against the current pass.

use crate::content::Pad;
use crate::utils::fs::resolve_dep_key;

use super::Dependency;

/// Answers "does this recorded input still hold?".
pub trait DependencyProbe {
    fn is_current(&self, dep: &Dependency) -> bool;
}

/// Probe backed by the pass's [`Pad`] (tree, config and hash cache).
pub struct PadProbe<'a> {
    pad: &'a Pad,
}

impl<'a> PadProbe<'a> {
    pub fn new(pad: &'a Pad) -> Self {
        Self { pad }
    }
}

impl DependencyProbe for PadProbe<'_> {
    fn is_current(&self, dep: &Dependency) -> bool {
        match dep {
            Dependency::File { path, hash, size } => {
                let file = resolve_dep_key(&self.pad.config().root, path);
                self.pad.file_signature(&file) == (*hash, *size)
            }
            Dependency::Record {
                path,
                alt,
                fingerprint,
            } => self.pad.record_fingerprint(path, alt) == *fingerprint,
            Dependency::RecordChildren {
                path,
                alt,
                fingerprint,
            } => self.pad.children_fingerprint(path, alt) == *fingerprint,
            Dependency::ConfigKey { key, value } => self.pad.config().value_hash(key) == *value,
            Dependency::Unknown => false,
        }
    }
}
