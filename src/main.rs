//! Folio - incremental static site builder.

mod cli;

use anyhow::{Context, Result};
use clap::{ColorChoice, Parser};
use cli::Cli;
use folio::core::CancelToken;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    folio::logger::set_verbose(cli.verbose);

    let cancel = setup_shutdown_handler()?;
    let code = cli::run(&cli, cancel)?;
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

/// First Ctrl+C cancels the run (committed state is kept), a second one exits.
fn setup_shutdown_handler() -> Result<CancelToken> {
    let cancel = CancelToken::new();
    let token = cancel.clone();
    ctrlc::set_handler(move || {
        if token.is_cancelled() {
            std::process::exit(130);
        }
        folio::log!("build"; "stopping after in-flight artifacts...");
        token.cancel();
    })
    .context("failed to set Ctrl+C handler")?;
    Ok(cancel)
}
