//! Completion command implementation.

use std::io;

use anyhow::Result;
use clap::CommandFactory as _;
use clap_complete::generate;

use crate::cli::{Cli, CompletionOpts};

/// Write a completion script for the requested shell to stdout.
///
/// # Errors
///
/// Currently infallible.
pub fn run(opts: &CompletionOpts) -> Result<()> {
    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();

    generate(opts.shell, &mut cmd, bin_name, &mut io::stdout());

    Ok(())
}
