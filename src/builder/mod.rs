//! Build runs.
//!
//! A run moves through `Discover -> Plan -> Produce -> Prune -> Done`:
//! - **Discover** - scan the content tree, enumerate every artifact
//! - **Plan** - split artifacts into stale (build) and fresh (skip)
//! - **Produce** - render or copy stale artifacts in parallel, commit state
//! - **Prune** - delete outputs that no source produces anymore
//!
//! `Failed` is entered from Produce when the state store cannot commit.
//! Per-artifact failures never stop a run; they are collected in the
//! [`BuildReport`].

mod cleanup;
mod incremental;
mod plan;
mod produce;
mod report;


pub use report::{ArtifactError, BuildOutcome, BuildPhase, BuildReport};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::config::{ConfigError, ProjectConfig};
use crate::content::{FieldParser, LrParser, Pad};
use crate::core::{ArtifactPath, CancelToken};
use crate::error::BuildError;
use crate::hooks::{HookEvent, HookPoint, HookRegistry};
use crate::log;
use crate::render::{Renderer, SimpleRenderer};
use crate::resolve::{ArtifactSet, GeneratorRegistry};
use crate::state::BuildStateStore;

use produce::Workshop;

// ============================================================================
// Project
// ============================================================================

/// A loaded project and its collaborators.
///
/// Defaults to the `.lr` field parser and the built-in template renderer.
#[derive(Clone)]
pub struct Project {
    root: PathBuf,
    config: Arc<ProjectConfig>,
    parser: Arc<dyn FieldParser>,
    renderer: Arc<dyn Renderer>,
    generators: Arc<GeneratorRegistry>,
    hooks: HookRegistry,
}

impl Project {
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        Ok(Self::from_config(ProjectConfig::load(root)?))
    }

    pub fn from_config(config: ProjectConfig) -> Self {
        Self {
            root: config.root.clone(),
            config: Arc::new(config),
            parser: Arc::new(LrParser),
            renderer: Arc::new(SimpleRenderer),
            generators: Arc::new(GeneratorRegistry::new()),
            hooks: HookRegistry::new(),
        }
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_parser(mut self, parser: Arc<dyn FieldParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_generators(mut self, generators: GeneratorRegistry) -> Self {
        self.generators = Arc::new(generators);
        self
    }

    pub fn with_hooks(mut self, hooks: HookRegistry) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Arc<ProjectConfig> {
        &self.config
    }

    /// Re-read `folio.toml`; the previous config stays on failure.
    pub fn reload_config(&mut self) -> Result<(), ConfigError> {
        self.config = Arc::new(ProjectConfig::load(&self.root)?);
        Ok(())
    }

    /// Fresh view of the content tree for one build pass.
    pub fn open_pad(&self) -> Pad {
        Pad::open(
            Arc::clone(&self.config),
            Arc::clone(&self.parser),
            Arc::clone(&self.generators),
        )
    }

    pub fn build(&self, output_root: &Path, options: &BuildOptions) -> Result<BuildReport, BuildError> {
        Builder::new(self, output_root, options).run()
    }

    pub fn prune(&self, output_root: &Path) -> Result<BuildReport, BuildError> {
        let options = BuildOptions {
            quiet: true,
            ..BuildOptions::default()
        };
        Builder::new(self, output_root, &options).prune_only()
    }
}

// ============================================================================
// Entry points
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Remove every known output before building
    pub clean: bool,
    /// Worker count, `None` = `[build] jobs` from the config
    pub jobs: Option<usize>,
    /// Changed paths for an incremental plan, `None` = full plan
    pub changed: Option<Vec<PathBuf>>,
    pub cancel: CancelToken,
    /// No progress line or per-artifact log output
    pub quiet: bool,
}

/// Build `project_root` into `output_root`.
pub fn build(project_root: &Path, output_root: &Path, options: &BuildOptions) -> Result<BuildReport, BuildError> {
    Project::load(project_root)?.build(output_root, options)
}

/// Delete orphaned outputs without producing anything.
pub fn prune(project_root: &Path, output_root: &Path) -> Result<BuildReport, BuildError> {
    Project::load(project_root)?.prune(output_root)
}

/// Delete every known output and the build state.
pub fn clean(output_root: &Path) -> Result<BuildReport, BuildError> {
    let started = Instant::now();
    let store = BuildStateStore::open(output_root)?;
    let mut report = BuildReport {
        warnings: store.warnings().to_vec(),
        ..BuildReport::default()
    };

    cleanup::clean_all(&store, output_root, &mut report)?;
    if report.prune_errors.is_empty() {
        cleanup::remove_state_dir(output_root)?;
    }

    report.phase = BuildPhase::Done;
    report.elapsed = started.elapsed();
    Ok(report)
}

// ============================================================================
// Builder
// ============================================================================

/// One build run over a project.
pub struct Builder<'a> {
    project: &'a Project,
    output_root: PathBuf,
    options: &'a BuildOptions,
    report: BuildReport,
}

impl<'a> Builder<'a> {
    pub fn new(project: &'a Project, output_root: &Path, options: &'a BuildOptions) -> Self {
        Self {
            project,
            output_root: output_root.to_path_buf(),
            options,
            report: BuildReport::default(),
        }
    }

    pub fn run(mut self) -> Result<BuildReport, BuildError> {
        let started = Instant::now();
        let store = self.open_store()?;

        if self.options.clean {
            cleanup::clean_all(&store, &self.output_root, &mut self.report)?;
        }
        self.emit(HookPoint::BeforeBuild, &[]);

        // Discover
        let pad = self.project.open_pad();
        let artifacts = self.discover(&pad);

        // Plan
        self.enter(BuildPhase::Plan);
        let plan = plan::plan(&artifacts, &store, &pad, self.options.changed.as_deref());
        self.report.skipped = plan.skipped;
        self.report.incremental = plan.incremental;
        crate::debug!(
            "plan";
            "{} to build, {} fresh{}",
            plan.must_build.len(),
            plan.skipped,
            if plan.incremental { " (incremental)" } else { "" }
        );

        // Produce
        self.enter(BuildPhase::Produce);
        let workshop = Workshop {
            pad: &pad,
            renderer: self.project.renderer.as_ref(),
            store: &store,
            artifacts: &artifacts,
            output_root: &self.output_root,
            cancel: &self.options.cancel,
            quiet: self.options.quiet,
        };
        let produced = match workshop.run(&plan.must_build, self.jobs()) {
            Ok(produced) => produced,
            Err(err) => {
                self.enter(BuildPhase::Failed);
                log!("failed"; "{}", err);
                return Err(err);
            }
        };
        self.report.built = produced.built.len();
        self.report.failed = produced.errors.len();
        self.report.built_paths = produced.built;
        self.report.errors = produced.errors;

        // Stop scheduling after a cancel; Prune needs a complete Produce
        if self.options.cancel.is_cancelled() {
            self.report.cancelled = true;
            self.report.skipped = artifacts.len() - self.report.built - self.report.failed;
            crate::debug!("build"; "cancelled after {} artifacts", self.report.built);
        } else {
            self.prune_phase(&store, &artifacts)?;
        }

        let built = self.report.built_paths.clone();
        self.emit(HookPoint::AfterBuild, &built);

        self.enter(BuildPhase::Done);
        self.report.elapsed = started.elapsed();
        if !self.options.quiet {
            log!("build"; "{} in {:.2?}", self.report.summary(), self.report.elapsed);
        }
        Ok(self.report)
    }

    /// Discover + Prune only.
    pub fn prune_only(mut self) -> Result<BuildReport, BuildError> {
        let started = Instant::now();
        let store = self.open_store()?;
        let pad = self.project.open_pad();
        let artifacts = self.discover(&pad);

        self.prune_phase(&store, &artifacts)?;

        self.enter(BuildPhase::Done);
        self.report.elapsed = started.elapsed();
        Ok(self.report)
    }

    fn open_store(&mut self) -> Result<BuildStateStore, BuildError> {
        let store = BuildStateStore::open(&self.output_root)?;
        self.report.generation = store.generation();
        for warning in store.warnings() {
            self.warn(warning.clone());
        }
        Ok(store)
    }

    fn discover(&mut self, pad: &Pad) -> ArtifactSet {
        self.enter(BuildPhase::Discover);
        let artifacts = ArtifactSet::discover(pad);

        for err in artifacts.record_errors() {
            if !self.options.quiet {
                log!("error"; "{}", err);
            }
            self.report.record_errors.push(err.clone());
        }
        for conflict in artifacts.conflicts() {
            self.warn(conflict.to_string());
        }
        crate::debug!("discover"; "{} artifacts", artifacts.len());
        artifacts
    }

    fn prune_phase(&mut self, store: &BuildStateStore, artifacts: &ArtifactSet) -> Result<(), BuildError> {
        self.enter(BuildPhase::Prune);
        let orphans = cleanup::orphans(store, artifacts);
        if orphans.is_empty() {
            return Ok(());
        }

        self.emit(HookPoint::BeforePrune, &orphans);
        cleanup::remove_outputs(store, &self.output_root, &orphans, &mut self.report)?;

        if !self.options.quiet {
            for err in &self.report.prune_errors {
                log!("error"; "{}: {}", err, err.source);
            }
        }
        Ok(())
    }

    fn emit(&mut self, point: HookPoint, artifacts: &[ArtifactPath]) {
        if self.project.hooks.is_empty() {
            return;
        }
        let event = HookEvent {
            point,
            project_root: &self.project.root,
            output_root: &self.output_root,
            artifacts,
        };
        for warning in self.project.hooks.emit(&event) {
            self.warn(warning);
        }
    }

    fn enter(&mut self, phase: BuildPhase) {
        crate::debug!("build"; "{} -> {}", self.report.phase, phase);
        self.report.phase = phase;
    }

    fn warn(&mut self, message: String) {
        if !self.options.quiet {
            log!("warning"; "{}", message);
        }
        self.report.warnings.push(message);
    }

    fn jobs(&self) -> usize {
        self.options
            .jobs
            .filter(|&n| n > 0)
            .unwrap_or_else(|| self.project.config.jobs())
    }
}
