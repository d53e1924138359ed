//! Command-line interface module.

mod args;
pub mod build;
pub mod watch;

pub use args::{BuildArgs, Cli, Commands};

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use folio::builder::Project;
use folio::core::CancelToken;

/// Run a parsed command line, returning the process exit code.
pub fn run(cli: &Cli, cancel: CancelToken) -> Result<i32> {
    let root = project_root(cli.project.as_deref())?;

    match &cli.command {
        Commands::Build { build_args } => {
            let (project, output) = open(&root, cli.output.as_deref())?;
            build::build(&project, &output, build_args, cancel)
        }
        Commands::Prune => {
            let (project, output) = open(&root, cli.output.as_deref())?;
            build::prune(&project, &output)
        }
        Commands::Clean => {
            // An explicit output works without a loadable project
            let output = match &cli.output {
                Some(output) => root.join(output),
                None => load(&root)?.config().output_dir(),
            };
            build::clean(&output)
        }
        Commands::Watch { jobs } => {
            let (project, output) = open(&root, cli.output.as_deref())?;
            watch::watch(project, &output, *jobs, cancel)
        }
    }
}

fn load(root: &Path) -> Result<Project> {
    Project::load(root).with_context(|| format!("failed to load project at {}", root.display()))
}

fn open(root: &Path, output: Option<&Path>) -> Result<(Project, PathBuf)> {
    let project = load(root)?;
    let output = output_root(&project, output)?;
    Ok((project, output))
}

fn project_root(project: Option<&Path>) -> Result<PathBuf> {
    let root = match project {
        Some(path) => path.to_path_buf(),
        None => std::env::current_dir().context("failed to read current directory")?,
    };
    root.canonicalize()
        .with_context(|| format!("project directory {} not found", root.display()))
}

/// Absolute output root, created if missing so that watch mode can
/// recognize events below it.
fn output_root(project: &Project, output: Option<&Path>) -> Result<PathBuf> {
    let output = match output {
        Some(path) => project.root().join(path),
        None => project.config().output_dir(),
    };
    fs::create_dir_all(&output)
        .with_context(|| format!("failed to create output directory {}", output.display()))?;
    output
        .canonicalize()
        .with_context(|| format!("failed to resolve output directory {}", output.display()))
}
