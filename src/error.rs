//! Error taxonomy for build runs.
//!
//! | Error         | Scope        | Effect                                    |
//! |---------------|--------------|-------------------------------------------|
//! | `ConfigError` | fatal        | aborts before Discover                    |
//! | `RecordError` | per record   | record excluded, tree load continues      |
//! | `ParseError`  | per artifact | artifact fails, run continues             |
//! | `RenderError` | per artifact | artifact fails, run continues             |
//! | `StoreError`  | fatal/degr.  | fatal on commit, "assume stale" on read   |
//! | `PruneError`  | per output   | reported, rest of Prune continues         |

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::content::ParseError;
use crate::core::{ArtifactPath, RecordPath};
use crate::render::RenderError;

/// A content record that cannot take part in the build.
#[derive(Debug, Clone, Error)]
pub enum RecordError {
    #[error("record `{path}` is malformed: {source}")]
    Malformed {
        path: RecordPath,
        #[source]
        source: ParseError,
    },

    #[error("record `{path}` uses unknown model `{model}` (in `{}`)", file.display())]
    UnknownModel {
        path: RecordPath,
        model: String,
        file: PathBuf,
    },

    #[error("field `{field}` is not declared by model `{model}` (in `{}`)", file.display())]
    UndeclaredField {
        path: RecordPath,
        model: String,
        field: String,
        file: PathBuf,
    },
}

impl RecordError {
    /// The record this error excludes.
    pub fn record(&self) -> &RecordPath {
        match self {
            Self::Malformed { path, .. }
            | Self::UnknownModel { path, .. }
            | Self::UndeclaredField { path, .. } => path,
        }
    }

    /// The offending content file.
    pub fn file(&self) -> &std::path::Path {
        match self {
            Self::Malformed { source, .. } => &source.path,
            Self::UnknownModel { file, .. } | Self::UndeclaredField { file, .. } => file,
        }
    }
}

/// Build state persistence failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access build state at `{}`", .0.display())]
    Io(PathBuf, #[source] io::Error),

    #[error("unreadable build state entry `{}`", .0.display())]
    Corrupt(PathBuf, #[source] serde_json::Error),

    #[error("failed to encode build state entry for `{0}`")]
    Encode(ArtifactPath, #[source] serde_json::Error),
}

/// Failure deleting an orphaned output.
#[derive(Debug, Error)]
#[error("failed to remove orphaned output `{artifact}`")]
pub struct PruneError {
    pub artifact: ArtifactPath,
    #[source]
    pub source: io::Error,
}

/// Any error a build run can produce.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Prune(#[from] PruneError),

    #[error("failed to read source `{}`", .0.display())]
    Source(PathBuf, #[source] io::Error),

    #[error("failed to write output `{}`", .0.display())]
    Output(PathBuf, #[source] io::Error),

    #[error("failed to start file watcher")]
    Watch(#[from] notify::Error),

    #[error("failed to start worker pool: {0}")]
    Pool(String),
}

impl BuildError {
    /// Fatal errors abort the run; everything else is scoped to one artifact.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::Store(_) | Self::Watch(_) | Self::Pool(_)
        )
    }

    /// Short label for log prefixes.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Record(_) => "record",
            Self::Parse(_) => "parse",
            Self::Render(_) => "render",
            Self::Store(_) => "store",
            Self::Prune(_) => "prune",
            Self::Source(..) => "source",
            Self::Output(..) => "output",
            Self::Watch(_) => "watch",
            Self::Pool(_) => "pool",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_error_names_file() {
        let err = RecordError::Malformed {
            path: RecordPath::new("/blog"),
            source: ParseError::new("/site/content/blog/contents.lr", "bad block"),
        };
        assert_eq!(
            err.file(),
            std::path::Path::new("/site/content/blog/contents.lr")
        );
        assert!(err.to_string().contains("/blog"));
    }

    #[test]
    fn fatal_classification() {
        let store = BuildError::Store(StoreError::Io(
            PathBuf::from("/x"),
            io::Error::other("disk"),
        ));
        assert!(store.is_fatal());

        let render = BuildError::Render(RenderError::new("page.html", "boom"));
        assert!(!render.is_fatal());
        assert_eq!(render.kind(), "render");
    }
}
