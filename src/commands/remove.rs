//! Remove command implementation.

use anyhow::Result;

use crate::cli::{GlobalOpts, RemoveOpts};
use crate::commands::{self, CommandSetup};
use crate::exec::{DryRunExecutor, Executor, SystemExecutor};
use crate::logging::Logger;
use crate::workflow::Workflow;

/// Run the remove command.
///
/// Removal tears layers down in reverse lifecycle order and does not run
/// dependency validation: removing a package other things depend on is the
/// operator's call.
///
/// # Errors
///
/// Returns an error if catalog loading or package resolution fails, or if
/// any lifecycle phase recorded a failure.
pub fn run(global: &GlobalOpts, opts: &RemoveOpts, log: &Logger) -> Result<()> {
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
    workflow.remove(&opts.ids)?;

    log.print_summary();

    let count = log.failure_count();
    if count > 0 {
        anyhow::bail!("{count} task(s) failed");
    }
    Ok(())
}
