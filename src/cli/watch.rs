//! `watch` command.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use crossbeam::channel::RecvTimeoutError;
use folio::builder::{BuildOptions, BuildReport, Project};
use folio::core::CancelToken;
use folio::log;
use folio::logger::{Status, watch_status, watch_status_detach};
use folio::watch::watch_project;

/// How often the Ctrl+C token is checked while idle.
const POLL_MS: u64 = 200;

pub fn watch(project: Project, output: &Path, jobs: Option<usize>, cancel: CancelToken) -> Result<i32> {
    let options = BuildOptions {
        jobs,
        cancel: cancel.clone(),
        quiet: true,
        ..BuildOptions::default()
    };
    let handle = watch_project(project, output, &options).context("failed to start watching")?;
    log!("watch"; "watching for changes, press Ctrl+C to stop");

    loop {
        match handle.reports().recv_timeout(Duration::from_millis(POLL_MS)) {
            Ok(Ok(report)) => show_report(&report),
            Ok(Err(err)) => watch_status(Status::Failed {
                summary: &format!("{} error", err.kind()),
                detail: &err.to_string(),
            }),
            Err(RecvTimeoutError::Timeout) => {
                if cancel.is_cancelled() {
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    watch_status_detach();
    handle.join();
    log!("watch"; "stopped");
    Ok(0)
}

fn show_report(report: &BuildReport) {
    if report.cancelled {
        return;
    }
    let summary = report.summary();
    if !report.is_success() {
        watch_status(Status::Failed {
            summary: &summary,
            detail: &report.problems().join("\n"),
        });
    } else if report.has_changes() {
        watch_status(Status::Built(&summary));
    } else {
        watch_status(Status::Unchanged);
    }
}
