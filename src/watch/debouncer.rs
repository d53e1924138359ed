//! Event coalescing for watch mode.
//!
//! Raw notify events arrive in bursts (an editor save is often
//! remove + create + modify). They are folded per path into one
//! [`ChangeKind`] and released as a batch once the tree has been quiet for
//! [`QUIET`], and no sooner than [`COOLDOWN`] after the previous batch.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use notify::EventKind;
use notify::event::ModifyKind;
use rustc_hash::FxHashMap;

use crate::utils::fs::is_temp_name;

/// Quiet period before a batch is released.
pub(super) const QUIET: Duration = Duration::from_millis(300);
/// Minimum gap between two released batches.
pub(super) const COOLDOWN: Duration = Duration::from_millis(800);
/// Sleep hint when nothing is pending.
const IDLE: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ChangeKind {
    Created,
    Modified,
    Removed,
}

impl ChangeKind {
    fn from_event(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::Create(_) => Some(Self::Created),
            EventKind::Remove(_) => Some(Self::Removed),
            // mtime/permission updates never change content
            EventKind::Modify(ModifyKind::Metadata(_)) => None,
            EventKind::Modify(_) => Some(Self::Modified),
            _ => None,
        }
    }

    /// Fold a later event into an earlier one. `None` drops the path.
    fn then(self, later: Self) -> Option<Self> {
        use ChangeKind::*;
        match (self, later) {
            (Created, Removed) => None,
            (Removed, Created | Modified) => Some(Modified),
            (Modified, Removed) => Some(Removed),
            (earlier, _) => Some(earlier),
        }
    }
}

#[derive(Debug, Default)]
pub(super) struct Debouncer {
    pending: FxHashMap<PathBuf, ChangeKind>,
    last_event: Option<Instant>,
    last_release: Option<Instant>,
}

impl Debouncer {
    pub(super) fn new() -> Self {
        Self::default()
    }

    pub(super) fn add_event(&mut self, event: &notify::Event) {
        let Some(kind) = ChangeKind::from_event(&event.kind) else {
            return;
        };

        let mut touched = false;
        for path in event.paths.iter().filter(|p| !is_temp_file(p)) {
            touched = true;
            match self.pending.get(path).copied() {
                None => {
                    crate::debug!("watch"; "{kind:?}: {}", path.display());
                    self.pending.insert(path.clone(), kind);
                }
                Some(earlier) => match earlier.then(kind) {
                    Some(folded) => {
                        self.pending.insert(path.clone(), folded);
                    }
                    None => {
                        self.pending.remove(path);
                    }
                },
            }
        }
        if touched {
            self.last_event = Some(Instant::now());
        }
    }

    /// Release the pending paths once quiet and cooldown have elapsed.
    pub(super) fn take_if_ready(&mut self) -> Option<Vec<PathBuf>> {
        if !self.wait().is_zero() {
            return None;
        }
        self.last_event = None;
        if self.pending.is_empty() {
            return None;
        }
        self.last_release = Some(Instant::now());

        let mut paths: Vec<PathBuf> = self.pending.drain().map(|(path, _)| path).collect();
        paths.sort();
        Some(paths)
    }

    /// How long until [`take_if_ready`](Self::take_if_ready) can succeed.
    pub(super) fn sleep_duration(&self) -> Duration {
        match self.wait() {
            wait if wait.is_zero() => Duration::from_millis(1),
            wait => wait,
        }
    }

    fn wait(&self) -> Duration {
        let Some(last_event) = self.last_event else {
            return IDLE;
        };
        let quiet = QUIET.saturating_sub(last_event.elapsed());
        let cooldown = self
            .last_release
            .map_or(Duration::ZERO, |t| COOLDOWN.saturating_sub(t.elapsed()));
        quiet.max(cooldown)
    }
}

/// Editor backups, swap files and in-flight atomic writes.
pub(super) fn is_temp_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let backup_ext = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| matches!(ext, "bak" | "swp" | "swo" | "tmp"));

    backup_ext || name.ends_with('~') || name.starts_with(".#") || is_temp_name(name)
}
