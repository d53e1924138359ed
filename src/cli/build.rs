//! `build`, `prune` and `clean` commands.

use std::path::Path;

use anyhow::{Context, Result};
use folio::builder::{self, BuildOptions, BuildReport, Project};
use folio::core::CancelToken;
use folio::log;
use folio::utils::plural_count;

use super::BuildArgs;

/// Build the project; the exit code reflects partial failures.
pub fn build(project: &Project, output: &Path, args: &BuildArgs, cancel: CancelToken) -> Result<i32> {
    let options = BuildOptions {
        clean: args.clean,
        jobs: args.jobs,
        changed: None,
        cancel,
        quiet: false,
    };
    let report = project
        .build(output, &options)
        .with_context(|| format!("failed to build into {}", output.display()))?;

    log_report_tail(&report);
    Ok(report.outcome().exit_code())
}

pub fn prune(project: &Project, output: &Path) -> Result<i32> {
    let report = project
        .prune(output)
        .with_context(|| format!("failed to prune {}", output.display()))?;

    log!("prune"; "removed {}", plural_count(report.pruned, "orphaned output"));
    log_report_tail(&report);
    Ok(report.outcome().exit_code())
}

pub fn clean(output: &Path) -> Result<i32> {
    let report = builder::clean(output)
        .with_context(|| format!("failed to clean {}", output.display()))?;

    log!("clean"; "removed {}", plural_count(report.pruned, "output"));
    log_report_tail(&report);
    Ok(report.outcome().exit_code())
}

/// Problems not already logged while the run was in progress.
fn log_report_tail(report: &BuildReport) {
    for err in &report.prune_errors {
        log!("error"; "{}: {}", err, err.source);
    }
    if report.failed > 0 {
        log!(
            "failed";
            "{} failed: {}",
            plural_count(report.failed, "artifact"),
            report
                .errors
                .iter()
                .map(|e| e.artifact.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
}
