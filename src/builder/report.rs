//! Build run results.

use std::fmt;
use std::time::Duration;

use crate::core::ArtifactPath;
use crate::error::{BuildError, PruneError, RecordError};
use crate::utils::plural_count;

/// Phases of one build run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildPhase {
    #[default]
    Discover,
    Plan,
    Produce,
    Prune,
    Done,
    Failed,
}

impl fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Discover => "discover",
            Self::Plan => "plan",
            Self::Produce => "produce",
            Self::Prune => "prune",
            Self::Done => "done",
            Self::Failed => "failed",
        })
    }
}

/// Overall result of a run that did not hit a fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    Success,
    /// Some artifacts failed or some records are invalid
    PartialFailure,
    /// Stopped before completion; committed entries are kept
    Cancelled,
}

impl BuildOutcome {
    /// Process exit code for the CLI.
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::PartialFailure => 2,
            Self::Cancelled => 130,
        }
    }
}

/// A per-artifact failure.
#[derive(Debug)]
pub struct ArtifactError {
    pub artifact: ArtifactPath,
    /// Source path including any virtual suffix
    pub source: String,
    pub error: BuildError,
}

impl fmt::Display for ArtifactError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.artifact, self.source, error_chain(&self.error))
    }
}

/// Render an error with its source chain (`a: b: c`).
fn error_chain(error: &BuildError) -> String {
    let mut message = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

#[derive(Debug, Default)]
pub struct BuildReport {
    pub built: usize,
    pub skipped: usize,
    pub failed: usize,
    pub pruned: usize,
    pub errors: Vec<ArtifactError>,
    pub record_errors: Vec<RecordError>,
    pub prune_errors: Vec<PruneError>,
    pub warnings: Vec<String>,
    pub built_paths: Vec<ArtifactPath>,
    pub pruned_paths: Vec<ArtifactPath>,
    pub cancelled: bool,
    /// Whether this run planned only the artifacts affected by a change set
    pub incremental: bool,
    pub phase: BuildPhase,
    pub generation: u64,
    pub elapsed: Duration,
}

impl BuildReport {
    pub fn outcome(&self) -> BuildOutcome {
        if self.cancelled {
            BuildOutcome::Cancelled
        } else if self.failed > 0 || !self.record_errors.is_empty() || !self.prune_errors.is_empty() {
            BuildOutcome::PartialFailure
        } else {
            BuildOutcome::Success
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome() == BuildOutcome::Success
    }

    /// Whether the run changed the output tree.
    pub fn has_changes(&self) -> bool {
        self.built > 0 || self.pruned > 0
    }

    /// One-line summary: `built 3 artifacts, skipped 2, failed 0, pruned 1`.
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "built {}, skipped {}, failed {}, pruned {}",
            plural_count(self.built, "artifact"),
            self.skipped,
            self.failed,
            self.pruned
        );
        if !self.record_errors.is_empty() {
            summary.push_str(&format!(
                ", {}",
                plural_count(self.record_errors.len(), "invalid record")
            ));
        }
        if self.cancelled {
            summary.push_str(" (cancelled)");
        }
        summary
    }

    /// Every problem as a printable line.
    pub fn problems(&self) -> Vec<String> {
        self.record_errors
            .iter()
            .map(ToString::to_string)
            .chain(self.errors.iter().map(ToString::to_string))
            .chain(self.prune_errors.iter().map(|e| format!("{e}: {}", e.source)))
            .collect()
    }
}
