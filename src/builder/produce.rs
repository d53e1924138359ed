//! Produce phase: render or copy every planned artifact.
//!
//! Each artifact owns one [`TrackingScope`] from start to commit. The
//! state entry is written only after the output file is in place, so an
//! entry never vouches for output that does not exist. Per-artifact
//! failures replace the entry with a failed marker; a store failure stops
//! scheduling and fails the run.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use rayon::prelude::*;

use crate::content::Pad;
use crate::core::{ArtifactPath, CancelToken};
use crate::deps::TrackingScope;
use crate::error::{BuildError, StoreError};
use crate::freshness::hash_bytes;
use crate::log;
use crate::logger::ProgressLine;
use crate::render::{RenderContext, Renderer};
use crate::resolve::{Artifact, ArtifactSet, Producer};
use crate::state::{BuildStateStore, Provenance};
use crate::utils::fs::atomic_write;

use super::report::ArtifactError;

/// What the Produce phase did.
#[derive(Debug, Default)]
pub struct Produced {
    pub built: Vec<ArtifactPath>,
    pub errors: Vec<ArtifactError>,
}

/// Shared, read-only inputs of the Produce phase.
pub struct Workshop<'a> {
    pub pad: &'a Pad,
    pub renderer: &'a dyn Renderer,
    pub store: &'a BuildStateStore,
    pub artifacts: &'a ArtifactSet,
    pub output_root: &'a Path,
    pub cancel: &'a CancelToken,
    pub quiet: bool,
}

enum Failure {
    /// Scoped to one artifact, the run continues
    Artifact(BuildError),
    /// The store cannot commit, the run stops
    Store(StoreError),
}

impl Workshop<'_> {
    /// Produce `must_build` on a pool of `jobs` workers.
    pub fn run(&self, must_build: &[ArtifactPath], jobs: usize) -> Result<Produced, BuildError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .thread_name(|i| format!("folio-produce-{i}"))
            .build()
            .map_err(|e| BuildError::Pool(e.to_string()))?;

        let progress = self.create_progress(must_build);
        let aborted = AtomicBool::new(false);
        let built = Mutex::new(Vec::new());
        let errors = Mutex::new(Vec::new());

        let result = pool.install(|| {
            must_build.par_iter().try_for_each(|path| {
                if self.cancel.is_cancelled() || aborted.load(Ordering::Relaxed) {
                    return Ok(());
                }
                let Some(artifact) = self.artifacts.get(path) else {
                    return Ok(());
                };

                match self.produce_one(artifact) {
                    Ok(()) => built.lock().push(path.clone()),
                    Err(Failure::Artifact(error)) => {
                        if !self.quiet {
                            log!("error"; "{}: {}", path, error);
                        }
                        if let Err(e) = self.store.mark_failed(path, provenance(artifact)) {
                            aborted.store(true, Ordering::Relaxed);
                            return Err(e);
                        }
                        errors.lock().push(ArtifactError {
                            artifact: path.clone(),
                            source: artifact.source_path(),
                            error,
                        });
                    }
                    Err(Failure::Store(e)) => {
                        aborted.store(true, Ordering::Relaxed);
                        return Err(e);
                    }
                }

                if let Some(p) = &progress {
                    p.inc(if artifact.is_render() { "pages" } else { "assets" });
                }
                Ok(())
            })
        });

        if let Some(p) = progress {
            p.finish();
        }
        result?;

        let mut built = built.into_inner();
        let mut errors = errors.into_inner();
        built.sort();
        errors.sort_by(|a, b| a.artifact.cmp(&b.artifact));
        Ok(Produced { built, errors })
    }

    fn create_progress(&self, must_build: &[ArtifactPath]) -> Option<ProgressLine> {
        if self.quiet || must_build.is_empty() {
            return None;
        }
        let pages = must_build
            .iter()
            .filter_map(|path| self.artifacts.get(path))
            .filter(|a| a.is_render())
            .count();
        Some(ProgressLine::new(&[
            ("pages", pages),
            ("assets", must_build.len() - pages),
        ]))
    }

    fn produce_one(&self, artifact: &Artifact) -> Result<(), Failure> {
        let scope = TrackingScope::begin(artifact.path.clone());

        let (bytes, scope) = match &artifact.producer {
            Producer::Copy { file } => self.copy(file, scope)?,
            Producer::Render { template } => self.render(artifact, template, scope)?,
        };

        let output = artifact.path.to_fs_path(self.output_root);
        if let Err(e) = atomic_write(&output, &bytes) {
            scope.discard();
            return Err(Failure::Artifact(BuildError::Output(output, e)));
        }

        let deps = scope.commit();
        crate::debug!("produce"; "{} ({} deps)", artifact.path, deps.len());
        self.store
            .record(&artifact.path, hash_bytes(&bytes), deps, provenance(artifact))
            .map_err(Failure::Store)
    }

    fn copy(&self, file: &Path, mut scope: TrackingScope) -> Result<(Vec<u8>, TrackingScope), Failure> {
        scope.record_file(self.pad, file);
        match fs::read(file) {
            Ok(bytes) => Ok((bytes, scope)),
            Err(e) => {
                scope.discard();
                Err(Failure::Artifact(BuildError::Source(file.to_path_buf(), e)))
            }
        }
    }

    fn render(
        &self,
        artifact: &Artifact,
        template: &str,
        scope: TrackingScope,
    ) -> Result<(Vec<u8>, TrackingScope), Failure> {
        let mut ctx = RenderContext::new(self.pad, &artifact.source, artifact.alt.clone(), scope);
        let rendered = self.renderer.render(template, &mut ctx);
        let (scope, parse_error) = ctx.finish();

        match (rendered, parse_error) {
            (Ok(bytes), None) => Ok((bytes, scope)),
            (_, Some(err)) => {
                scope.discard();
                Err(Failure::Artifact(err.into()))
            }
            (Err(err), None) => {
                scope.discard();
                Err(Failure::Artifact(err.into()))
            }
        }
    }
}

fn provenance(artifact: &Artifact) -> Provenance {
    Provenance {
        source: artifact.source_path(),
        record: Some(artifact.record_path().clone()),
        alt: artifact.alt.clone(),
    }
}
