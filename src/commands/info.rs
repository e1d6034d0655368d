//! Info command implementation.

use anyhow::{Result, bail};

use crate::cli::{GlobalOpts, InfoOpts};
use crate::commands::{self, CommandSetup};
use crate::exec::SystemExecutor;
use crate::installer::create_installer;
use crate::logging::Logger;

/// Run the info command: print one package's metadata and install state.
///
/// # Errors
///
/// Returns an error if the catalog cannot be loaded or the package id is
/// unknown.
#[allow(clippy::print_stdout)]
pub fn run(global: &GlobalOpts, opts: &InfoOpts, log: &Logger) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    let Some(record) = setup.catalog.get(&opts.id) else {
        bail!("package '{}' not found (try 'rigup list')", opts.id);
    };

    let meta = &record.meta;
    println!();
    println!("{} ({})", meta.name, record.id);
    println!("  category:     {}", record.category.slug());
    if let Some(version) = &meta.version {
        println!("  version:      {version}");
    }
    if let Some(homepage) = &meta.homepage {
        println!("  homepage:     {homepage}");
    }
    if let Some(repository) = &meta.repository {
        println!("  repository:   {repository}");
    }
    if !meta.tags.is_empty() {
        println!("  tags:         {}", meta.tags.join(", "));
    }
    if !meta.dependencies.is_empty() {
        println!("  depends on:   {}", meta.dependencies.join(", "));
    }
    if !meta.conflicts.is_empty() {
        println!("  conflicts:    {}", meta.conflicts.join(", "));
    }
    if !meta.supports.os.is_empty() {
        println!("  os support:   {}", meta.supports.os.join(", "));
    }
    if !meta.supports.arch.is_empty() {
        println!("  arch support: {}", meta.supports.arch.join(", "));
    }
    if let Some(note) = &meta.post_install {
        println!("  post-install: {note}");
    }
    println!();
    println!("  {}", meta.description());

    // Resolving the installer re-checks the package structure, so a broken
    // package reports its problem here instead of a bogus status.
    let home = commands::home_dir()?;
    match create_installer(&setup.catalog, &opts.id, setup.platform, home) {
        Ok(installer) => match installer.status(&SystemExecutor, setup.platform) {
            Ok(status) => {
                println!();
                let software = if status.software {
                    "installed"
                } else {
                    "not installed"
                };
                let config = if status.config { "linked" } else { "not linked" };
                println!("  software: {software}");
                println!("  config:   {config}");
            }
            Err(err) => log.warn(&format!("cannot determine config state: {err}")),
        },
        Err(err) => log.warn(&format!("cannot determine status: {err}")),
    }
    Ok(())
}
