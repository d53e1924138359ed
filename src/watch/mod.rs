//! Watch mode: rebuild on file changes.
//!
//! ```text
//! notify → Debouncer (timing) → coordinator → build thread → reports
//! ```
//!
//! The watcher is attached before the initial build, so edits made while
//! it runs are not lost. A change batch arriving during a build cancels
//! that build; the next one covers both change sets. A change to
//! `folio.toml` reloads the configuration and plans everything.

mod debouncer;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};

use crate::builder::{BuildOptions, BuildReport, Project};
use crate::core::CancelToken;
use crate::error::BuildError;
use crate::log;

use debouncer::Debouncer;

/// Longest wait between two checks of the stop token.
const POLL_MS: u64 = 100;

pub type WatchResult = Result<BuildReport, BuildError>;

/// Running watch loop. Dropping the handle stops it.
pub struct WatchHandle {
    reports: Receiver<WatchResult>,
    stop: CancelToken,
    thread: Option<JoinHandle<()>>,
}

impl WatchHandle {
    /// One result per completed build, the initial build first.
    /// Builds superseded by a newer change batch report nothing.
    pub fn reports(&self) -> &Receiver<WatchResult> {
        &self.reports
    }

    /// Stop watching; an in-flight build stops scheduling new work.
    pub fn cancel(&self) {
        self.stop.cancel();
    }

    /// Wait for the loop to end (after [`cancel`](Self::cancel) or the
    /// cancel token of the options firing).
    pub fn join(mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.stop.cancel();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Build `project_root` into `output_root`, then keep rebuilding on change.
///
/// `options.cancel` stops the watch loop; `options.changed` is ignored.
pub fn watch(project_root: &Path, output_root: &Path, options: &BuildOptions) -> Result<WatchHandle, BuildError> {
    watch_project(Project::load(project_root)?, output_root, options)
}

pub fn watch_project(
    project: Project,
    output_root: &Path,
    options: &BuildOptions,
) -> Result<WatchHandle, BuildError> {
    let (event_tx, event_rx) = channel::unbounded();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        let _ = event_tx.send(res);
    })?;
    watcher.watch(project.root(), RecursiveMode::Recursive)?;
    crate::debug!("watch"; "watching {}", project.root().display());

    let (report_tx, report_rx) = channel::unbounded();
    let stop = options.cancel.clone();
    let coordinator = Coordinator {
        project,
        output_root: output_root.to_path_buf(),
        options: BuildOptions {
            changed: None,
            cancel: CancelToken::new(),
            ..options.clone()
        },
        events: event_rx,
        reports: report_tx,
        stop: stop.clone(),
        debouncer: Debouncer::new(),
    };

    let thread = thread::Builder::new()
        .name("folio-watch".into())
        .spawn(move || coordinator.run(watcher))
        .map_err(|e| BuildError::Pool(e.to_string()))?;

    Ok(WatchHandle {
        reports: report_rx,
        stop,
        thread: Some(thread),
    })
}

// ============================================================================
// Change sets
// ============================================================================

/// What the next build has to look at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Changes {
    /// Plan everything (initial build)
    full: bool,
    paths: BTreeSet<PathBuf>,
}

impl Changes {
    fn full() -> Self {
        Self {
            full: true,
            paths: BTreeSet::new(),
        }
    }

    fn merge(mut self, other: Changes) -> Self {
        self.full |= other.full;
        self.paths.extend(other.paths);
        self
    }
}

struct InFlight {
    cancel: CancelToken,
    changes: Changes,
    thread: JoinHandle<()>,
}

// ============================================================================
// Coordinator
// ============================================================================

struct Coordinator {
    project: Project,
    output_root: PathBuf,
    options: BuildOptions,
    events: Receiver<notify::Result<notify::Event>>,
    reports: Sender<WatchResult>,
    stop: CancelToken,
    debouncer: Debouncer,
}

impl Coordinator {
    /// Event loop; `_watcher` must stay alive for events to arrive.
    fn run(mut self, _watcher: RecommendedWatcher) {
        let events = self.events.clone();
        let (done_tx, done_rx) = channel::unbounded::<WatchResult>();
        let mut in_flight = self.start(Changes::full(), &done_tx);
        let mut pending: Option<Changes> = None;

        while !self.stop.is_cancelled() {
            let timeout = self
                .debouncer
                .sleep_duration()
                .min(Duration::from_millis(POLL_MS));
            let mut disconnected = false;

            channel::select! {
                recv(events) -> msg => match msg {
                    Ok(Ok(event)) => self.add_event(event),
                    Ok(Err(e)) => log!("watch"; "notify error: {}", e),
                    Err(_) => disconnected = true,
                },
                recv(done_rx) -> msg => {
                    if let Ok(result) = msg {
                        in_flight = self.finish(result, in_flight.take(), pending.take(), &done_tx);
                    }
                },
                default(timeout) => {}
            }
            if disconnected {
                break;
            }

            let Some(raw) = self.debouncer.take_if_ready() else {
                continue;
            };
            let batch = Changes {
                full: false,
                paths: raw.into_iter().collect(),
            };
            crate::debug!("watch"; "{} changed paths", batch.paths.len());

            match &in_flight {
                Some(build) => {
                    build.cancel.cancel();
                    let base = pending.take().unwrap_or_else(|| build.changes.clone());
                    pending = Some(base.merge(batch));
                }
                None => in_flight = self.start(batch, &done_tx),
            }
        }

        if let Some(build) = in_flight {
            build.cancel.cancel();
            let _ = build.thread.join();
        }
        crate::debug!("watch"; "stopped");
    }

    /// A build ended: report it, or start the build superseding it.
    fn finish(
        &mut self,
        result: WatchResult,
        finished: Option<InFlight>,
        pending: Option<Changes>,
        done: &Sender<WatchResult>,
    ) -> Option<InFlight> {
        if let Some(build) = finished {
            let _ = build.thread.join();
        }
        match pending {
            Some(next) => {
                crate::debug!("watch"; "build superseded, rebuilding");
                self.start(next, done)
            }
            None => {
                let _ = self.reports.send(result);
                None
            }
        }
    }

    /// Keep only paths a build can depend on.
    fn add_event(&mut self, mut event: notify::Event) {
        event.paths.retain(|path| self.is_relevant(path));
        if !event.paths.is_empty() {
            self.debouncer.add_event(&event);
        }
    }

    /// Outputs, build state and hidden entries never trigger a build.
    fn is_relevant(&self, path: &Path) -> bool {
        if path.starts_with(&self.output_root) {
            return false;
        }
        let Ok(rel) = path.strip_prefix(self.project.root()) else {
            return false;
        };
        !rel.components()
            .any(|c| c.as_os_str().to_string_lossy().starts_with('.'))
    }

    /// Spawn a build for `changes`. `None` when nothing could be started.
    fn start(&mut self, changes: Changes, done: &Sender<WatchResult>) -> Option<InFlight> {
        let config_changed = changes
            .paths
            .iter()
            .any(|path| self.project.config().is_config_file(path));

        if config_changed {
            crate::debug!("watch"; "config changed, reloading");
            if let Err(err) = self.project.reload_config() {
                let _ = self.reports.send(Err(err.into()));
                return None;
            }
        }

        let cancel = CancelToken::new();
        let options = BuildOptions {
            changed: (!changes.full && !config_changed)
                .then(|| changes.paths.iter().cloned().collect()),
            cancel: cancel.clone(),
            ..self.options.clone()
        };
        let project = self.project.clone();
        let output_root = self.output_root.clone();
        let done = done.clone();

        let spawned = thread::Builder::new()
            .name("folio-build".into())
            .spawn(move || {
                let _ = done.send(project.build(&output_root, &options));
            });

        match spawned {
            Ok(thread) => Some(InFlight {
                cancel,
                changes,
                thread,
            }),
            Err(e) => {
                let _ = self.reports.send(Err(BuildError::Pool(e.to_string())));
                None
            }
        }
    }
}
