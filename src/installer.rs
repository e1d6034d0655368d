//! Installer construction and the package lifecycle surface.
//!
//! [`create_installer`] is the single entry point from a package id to a
//! runnable [`Installer`]. Resolution walks a fixed sequence: catalog
//! lookup, structure check, platform check (warn only), kind lookup in
//! the registration table, recipe construction. Each step maps to one
//! [`RegistryError`] variant so callers can tell a typo from a broken
//! package directory.
//!
//! The [`Installer`] bundles the record, the home directory and the
//! constructed recipe, and exposes one method per lifecycle step. Phase
//! ordering lives in the workflow, not here.

use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::Result;

use crate::catalog::{Catalog, PackageRecord};
use crate::error::{LinkError, RegistryError};
use crate::exec::Executor;
use crate::linker::{ConfigLinker, LinkChange};
use crate::platform::Platform;
use crate::profile::{self, ProfileChange};
use crate::recipe::{self, Recipe, RecipeContext, RecipeSpec, SoftwareChange};

/// Installed state of a package's layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageStatus {
    /// Software layer present.
    pub software: bool,
    /// Config tree linked into the home directory.
    pub config: bool,
}

/// A resolved package, ready to run lifecycle steps.
#[derive(Debug)]
pub struct Installer {
    record: PackageRecord,
    home: PathBuf,
    recipe: Box<dyn Recipe>,
}

/// Resolve a package id into an [`Installer`].
///
/// A package that does not support `platform` logs a warning but still
/// resolves; the caller decides whether to proceed.
///
/// # Errors
///
/// - [`RegistryError::NotFound`] when the id is not in the catalog (the
///   error lists the available ids),
/// - [`RegistryError::InvalidStructure`] when `recipe.toml` or `config/`
///   is missing, or the recipe does not parse,
/// - [`RegistryError::ImplementationNotFound`] when the recipe names an
///   unregistered kind,
/// - [`RegistryError::ContractViolation`] when the kind's required fields
///   are missing.
pub fn create_installer(
    catalog: &Catalog,
    id: &str,
    platform: Platform,
    home: impl Into<PathBuf>,
) -> Result<Installer, RegistryError> {
    let Some(record) = catalog.get(id) else {
        return Err(RegistryError::NotFound {
            id: id.to_string(),
            available: catalog.ids(),
        });
    };

    let recipe_path = record.recipe_path();
    if !recipe_path.is_file() {
        return Err(RegistryError::InvalidStructure {
            id: id.to_string(),
            reason: format!("missing {}", crate::catalog::RECIPE_FILE),
        });
    }
    if !record.config_dir().is_dir() {
        return Err(RegistryError::InvalidStructure {
            id: id.to_string(),
            reason: format!("missing {}/ directory", crate::catalog::CONFIG_DIR),
        });
    }

    if !record.supports_platform(platform) {
        tracing::warn!("package '{id}' is not marked as supporting {platform}");
    }

    let content =
        std::fs::read_to_string(&recipe_path).map_err(|err| RegistryError::InvalidStructure {
            id: id.to_string(),
            reason: format!("unreadable {}: {err}", crate::catalog::RECIPE_FILE),
        })?;
    let spec = RecipeSpec::parse(&content).map_err(|err| RegistryError::InvalidStructure {
        id: id.to_string(),
        reason: format!("invalid {}: {err}", crate::catalog::RECIPE_FILE),
    })?;

    let Some(constructor) = recipe::constructor_for(&spec.kind) else {
        return Err(RegistryError::ImplementationNotFound {
            id: id.to_string(),
            kind: spec.kind.clone(),
        });
    };
    let recipe = constructor(id, &spec)?;

    Ok(Installer {
        record: record.clone(),
        home: home.into(),
        recipe,
    })
}

impl Installer {
    /// Package id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.record.id
    }

    /// The catalog record this installer was built from.
    #[must_use]
    pub const fn record(&self) -> &PackageRecord {
        &self.record
    }

    /// Whether the software layer is already present.
    #[must_use]
    pub fn is_software_installed(&self, executor: &dyn Executor, platform: Platform) -> bool {
        self.recipe
            .is_software_installed(&self.context(executor, platform))
    }

    /// Install the software layer.
    ///
    /// # Errors
    ///
    /// Propagates recipe failures (no installation route, failed command).
    pub fn install_software(
        &self,
        executor: &dyn Executor,
        platform: Platform,
    ) -> Result<SoftwareChange> {
        self.recipe
            .install_software(&self.context(executor, platform))
    }

    /// Remove the software layer.
    ///
    /// # Errors
    ///
    /// Propagates recipe failures.
    pub fn uninstall_software(
        &self,
        executor: &dyn Executor,
        platform: Platform,
    ) -> Result<SoftwareChange> {
        self.recipe
            .uninstall_software(&self.context(executor, platform))
    }

    /// Whether the config tree is linked into the home directory.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Io`] if the config tree cannot be inspected.
    pub fn is_config_installed(&self, executor: &dyn Executor) -> Result<bool, LinkError> {
        ConfigLinker::new(executor, &self.home, false).is_installed(&self.record)
    }

    /// Link the config tree into the home directory.
    ///
    /// # Errors
    ///
    /// Propagates linker failures, including pre-scan conflicts.
    pub fn install_config(
        &self,
        executor: &dyn Executor,
        platform: Platform,
        dry_run: bool,
    ) -> Result<LinkChange, LinkError> {
        ConfigLinker::new(executor, &self.home, dry_run).install(&self.record, platform)
    }

    /// Remove the config links from the home directory.
    ///
    /// # Errors
    ///
    /// Propagates linker failures.
    pub fn uninstall_config(
        &self,
        executor: &dyn Executor,
        platform: Platform,
        dry_run: bool,
    ) -> Result<LinkChange, LinkError> {
        ConfigLinker::new(executor, &self.home, dry_run).uninstall(&self.record, platform)
    }

    /// Whether the recipe ships a shell integration block.
    #[must_use]
    pub fn has_integration(&self) -> bool {
        self.recipe.integration().is_some()
    }

    /// Patch shell profiles with the integration block.
    ///
    /// # Errors
    ///
    /// Returns an error if a profile file cannot be read or written.
    pub fn setup_integration(&self, dry_run: bool) -> Result<ProfileChange> {
        match self.recipe.integration() {
            Some(spec) => profile::apply_to_profiles(
                &self.home,
                &spec.profiles,
                &spec.marker,
                &spec.lines,
                dry_run,
            ),
            None => Ok(ProfileChange::Unchanged),
        }
    }

    /// Remove the integration block from shell profiles.
    ///
    /// # Errors
    ///
    /// Returns an error if a profile file cannot be read or written.
    pub fn remove_integration(&self, dry_run: bool) -> Result<ProfileChange> {
        match self.recipe.integration() {
            Some(spec) => {
                profile::remove_from_profiles(&self.home, &spec.profiles, &spec.marker, dry_run)
            }
            None => Ok(ProfileChange::Unchanged),
        }
    }

    /// Installed state of both layers.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Io`] if the config tree cannot be inspected.
    pub fn status(
        &self,
        executor: &dyn Executor,
        platform: Platform,
    ) -> Result<PackageStatus, LinkError> {
        Ok(PackageStatus {
            software: self.is_software_installed(executor, platform),
            config: self.is_config_installed(executor)?,
        })
    }

    /// Message to print after a successful install, if any.
    #[must_use]
    pub fn post_install_message(&self) -> Option<String> {
        self.recipe
            .post_install_message()
            .or_else(|| self.record.meta.post_install.clone())
    }

    fn context<'a>(&'a self, executor: &'a dyn Executor, platform: Platform) -> RecipeContext<'a> {
        RecipeContext {
            executor,
            platform,
            home: &self.home,
        }
    }
}

/// Outcome of the pure dependency and conflict validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Declared dependencies absent from the installed set.
    pub missing_dependencies: Vec<String>,
    /// Declared conflicts present in the installed set.
    pub conflicts: Vec<String>,
    /// Non-blocking findings, currently platform support.
    pub warnings: Vec<String>,
}

impl ValidationReport {
    /// Whether any blocking issue was found.
    #[must_use]
    pub fn is_blocking(&self) -> bool {
        !self.missing_dependencies.is_empty() || !self.conflicts.is_empty()
    }
}

/// Validate a package against a caller-supplied installed set.
///
/// Pure: no system state is consulted. Dependencies missing from
/// `installed` and conflicts present in it are blocking; an unsupported
/// platform is only a warning.
#[must_use]
pub fn validate_dependencies_and_conflicts(
    record: &PackageRecord,
    platform: Platform,
    installed: &BTreeSet<String>,
) -> ValidationReport {
    let mut report = ValidationReport::default();
    for dependency in &record.meta.dependencies {
        if !installed.contains(dependency) {
            report.missing_dependencies.push(dependency.clone());
        }
    }
    for conflict in &record.meta.conflicts {
        if installed.contains(conflict) {
            report.conflicts.push(conflict.clone());
        }
    }
    if !record.supports_platform(platform) {
        report
            .warnings
            .push(format!("package is not marked as supporting {platform}"));
    }
    report
}
