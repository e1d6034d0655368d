//! Subcommand implementations.

pub mod completion;
pub mod info;
pub mod install;
pub mod list;
pub mod remove;
pub mod search;

use std::path::PathBuf;

use anyhow::{Context as _, Result};

use crate::catalog::Catalog;
use crate::cli::GlobalOpts;
use crate::logging::Logger;
use crate::platform::Platform;

/// State every command needs before it can do real work.
///
/// Bundles platform detection and catalog discovery so the individual
/// commands do not repeat that boilerplate.
#[derive(Debug)]
pub struct CommandSetup {
    /// Detected host platform.
    pub platform: Platform,
    /// Discovered package catalog.
    pub catalog: Catalog,
}

impl CommandSetup {
    /// Detect the platform and discover the package catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the packages root does not exist or a package
    /// descriptor fails to parse.
    pub fn init(global: &GlobalOpts, log: &Logger) -> Result<Self> {
        let platform = Platform::detect();
        let root = resolve_packages_root(global);

        log.stage("Loading package catalog");
        let catalog = Catalog::discover(&root)
            .with_context(|| format!("cannot load package catalog from '{}'", root.display()))?;
        log.debug(&format!("platform: {platform}"));
        log.info(&format!(
            "{} package(s) in {}",
            catalog.len(),
            catalog.root().display()
        ));

        Ok(Self { platform, catalog })
    }
}

/// Resolve the packages root: the `--packages-root` flag wins, then the
/// `RIGUP_PACKAGES` environment variable, then `./packages`.
#[must_use]
pub fn resolve_packages_root(global: &GlobalOpts) -> PathBuf {
    if let Some(root) = &global.packages_root {
        return root.clone();
    }
    if let Some(root) = std::env::var_os("RIGUP_PACKAGES") {
        return PathBuf::from(root);
    }
    PathBuf::from("packages")
}

/// Resolve the home directory that config linking and profile patching
/// operate on.
///
/// # Errors
///
/// Returns an error if neither `HOME` nor `USERPROFILE` is set.
pub fn home_dir() -> Result<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .context("cannot determine home directory (HOME is not set)")
}
