//! Install command implementation.

use std::collections::BTreeSet;

use anyhow::Result;

use crate::cli::{GlobalOpts, InstallOpts};
use crate::commands::{self, CommandSetup};
use crate::exec::{DryRunExecutor, Executor, SystemExecutor};
use crate::logging::Logger;
use crate::workflow::Workflow;

/// Run the install command.
///
/// # Errors
///
/// Returns an error if catalog loading, package resolution, or dependency
/// validation fails, or if any lifecycle phase recorded a failure.
pub fn run(global: &GlobalOpts, opts: &InstallOpts, log: &Logger) -> Result<()> {
    let version = option_env!("RIGUP_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"));
    log.info(&format!("rigup {version}"));

    let setup = CommandSetup::init(global, log)?;
    let home = commands::home_dir()?;

    let executor: Box<dyn Executor> = if global.dry_run {
        log.dry_run("dry-run mode: no changes will be made");
        Box::new(DryRunExecutor)
    } else {
        Box::new(SystemExecutor)
    };

    let workflow = Workflow::new(
        &setup.catalog,
        setup.platform,
        executor.as_ref(),
        log,
        home,
        global.dry_run,
    );
    // Dependency validation assumes a clean slate: nothing is treated as
    // already installed.
    workflow.install(&opts.ids, &BTreeSet::new())?;

    log.print_summary();

    let count = log.failure_count();
    if count > 0 {
        anyhow::bail!("{count} task(s) failed");
    }
    Ok(())
}
