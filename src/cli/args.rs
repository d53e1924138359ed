//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Folio incremental static site builder
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Project root containing folio.toml (default: current directory)
    #[arg(short, long, global = true, value_hint = clap::ValueHint::DirPath)]
    pub project: Option<PathBuf>,

    /// Output directory (relative to project root, default: `[project] output`)
    #[arg(short, long, global = true, value_hint = clap::ValueHint::DirPath)]
    pub output: Option<PathBuf>,

    /// Print debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Build stale artifacts and prune orphaned outputs
    #[command(visible_alias = "b")]
    Build {
        #[command(flatten)]
        build_args: BuildArgs,
    },

    /// Remove outputs no source produces anymore
    Prune,

    /// Remove every known output and the build state
    Clean,

    /// Build, then rebuild on every change until Ctrl+C
    #[command(visible_alias = "w")]
    Watch {
        /// Worker threads (default: `[build] jobs`, 0 = number of CPUs)
        #[arg(short, long)]
        jobs: Option<usize>,
    },
}

/// Build command arguments
#[derive(clap::Args, Debug, Clone)]
pub struct BuildArgs {
    /// Remove every known output before building
    #[arg(short, long)]
    pub clean: bool,

    /// Worker threads (default: `[build] jobs`, 0 = number of CPUs)
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_flags_after_command() {
        let cli = Cli::parse_from(["folio", "build", "--clean", "-j", "4", "--project", "site"]);
        assert_eq!(cli.project, Some(PathBuf::from("site")));
        let Commands::Build { build_args } = cli.command else {
            panic!("expected build");
        };
        assert!(build_args.clean);
        assert_eq!(build_args.jobs, Some(4));
    }

    #[test]
    fn watch_alias() {
        let cli = Cli::parse_from(["folio", "w", "--verbose"]);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Watch { jobs: None }));
    }
}
