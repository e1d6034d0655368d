//! Software recipes: how a package's software layer is managed.
//!
//! Every package ships a `recipe.toml` whose `kind` selects one of the
//! registered implementations in [`RECIPE_KINDS`]:
//!
//! - `system` installs through the resolved platform package manager,
//! - `script` runs vendor-provided shell commands per OS,
//! - `config-only` has no software layer at all.
//!
//! All kinds share the optional `[integration]` block, which describes a
//! sentinel-guarded snippet for shell profiles.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use serde::Deserialize;

use crate::error::RegistryError;
use crate::exec::Executor;
use crate::platform::{self, PackageManager, Platform};

/// Parsed `recipe.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecipeSpec {
    /// Implementation to construct, looked up in [`RECIPE_KINDS`].
    pub kind: String,
    /// Probe deciding whether the software is present: a binary name, or
    /// `path:~/...` for a file check. Required by the `script` kind.
    pub detect: Option<String>,
    /// Fields for the `system` kind.
    pub system: Option<SystemSpec>,
    /// Per-OS command sets for the `script` kind, keyed by OS slug
    /// (`debian`, `macos`, ...) or the generic `linux`.
    #[serde(default)]
    pub commands: BTreeMap<String, CommandSet>,
    /// Shell integration block shared by all kinds.
    pub integration: Option<IntegrationSpec>,
}

impl RecipeSpec {
    /// Parse a `recipe.toml` document.
    ///
    /// # Errors
    ///
    /// Returns the TOML error for malformed documents or unknown fields.
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

/// `[system]` table of a recipe.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SystemSpec {
    /// Package name handed to the package manager.
    pub package: String,
    /// Binary whose presence marks the software installed. Defaults to the
    /// package name.
    pub bin: Option<String>,
    /// Package name overrides keyed by package manager name.
    #[serde(default)]
    pub overrides: BTreeMap<String, String>,
}

/// One `[commands.<os>]` table of a recipe.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandSet {
    /// Shell command that installs the software.
    pub install: String,
    /// Shell command that removes it again, if the vendor supports that.
    pub uninstall: Option<String>,
}

/// `[integration]` table of a recipe.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IntegrationSpec {
    /// Sentinel comment marking the managed block.
    pub marker: String,
    /// Lines appended under the sentinel.
    pub lines: Vec<String>,
    /// Profile files under the home directory to patch.
    #[serde(default = "default_profiles")]
    pub profiles: Vec<String>,
}

fn default_profiles() -> Vec<String> {
    vec![".bashrc".to_string(), ".zshrc".to_string()]
}

/// Outcome of a software phase operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoftwareChange {
    /// The software was installed or removed.
    Applied,
    /// The layer was already in the desired state.
    AlreadyCorrect,
    /// Nothing to do.
    Skipped {
        /// Reason why the operation was skipped.
        reason: String,
    },
}

/// Shared state handed to every recipe operation.
#[derive(Debug, Clone, Copy)]
pub struct RecipeContext<'a> {
    /// Process runner, dry-run aware.
    pub executor: &'a dyn Executor,
    /// Detected host platform.
    pub platform: Platform,
    /// Home directory used to expand `~` in path probes.
    pub home: &'a Path,
}

/// Management of a package's software layer.
///
/// Config linking and profile patching are shared machinery and live
/// outside the trait; recipes only decide how the software itself is
/// installed, removed and detected.
pub trait Recipe: fmt::Debug {
    /// Install the software layer.
    ///
    /// # Errors
    ///
    /// Returns an error if no installation route exists on this platform
    /// or the install command fails.
    fn install_software(&self, ctx: &RecipeContext<'_>) -> Result<SoftwareChange>;

    /// Remove the software layer.
    ///
    /// # Errors
    ///
    /// Returns an error if the removal command fails.
    fn uninstall_software(&self, ctx: &RecipeContext<'_>) -> Result<SoftwareChange>;

    /// Whether the software layer is already present.
    fn is_software_installed(&self, ctx: &RecipeContext<'_>) -> bool;

    /// Shell integration block, if the recipe ships one.
    fn integration(&self) -> Option<&IntegrationSpec> {
        None
    }

    /// Message shown after a successful install, overriding the
    /// descriptor's `post_install`.
    fn post_install_message(&self) -> Option<String> {
        None
    }
}

/// Constructor registered for a recipe kind.
///
/// Takes the package id (for error context) and the parsed spec.
pub type RecipeConstructor = fn(&str, &RecipeSpec) -> Result<Box<dyn Recipe>, RegistryError>;

/// Registration table mapping recipe kinds to constructors.
pub const RECIPE_KINDS: &[(&str, RecipeConstructor)] = &[
    ("system", SystemRecipe::from_spec),
    ("script", ScriptRecipe::from_spec),
    ("config-only", ConfigOnlyRecipe::from_spec),
];

/// Look up the constructor registered for `kind`.
#[must_use]
pub fn constructor_for(kind: &str) -> Option<RecipeConstructor> {
    RECIPE_KINDS
        .iter()
        .find(|(name, _)| *name == kind)
        .map(|&(_, ctor)| ctor)
}

/// Names of all registered kinds, in registration order.
#[must_use]
pub fn kind_names() -> Vec<&'static str> {
    RECIPE_KINDS.iter().map(|&(name, _)| name).collect()
}

/// Software managed by the platform package manager.
#[derive(Debug)]
pub struct SystemRecipe {
    package: String,
    bin: String,
    overrides: BTreeMap<String, String>,
    integration: Option<IntegrationSpec>,
}

impl SystemRecipe {
    /// Build from a spec with a `[system]` table.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::ContractViolation`] if the table is missing.
    pub fn from_spec(id: &str, spec: &RecipeSpec) -> Result<Box<dyn Recipe>, RegistryError> {
        let Some(system) = &spec.system else {
            return Err(RegistryError::ContractViolation {
                id: id.to_string(),
                kind: spec.kind.clone(),
                detail: "missing [system] table".to_string(),
            });
        };
        Ok(Box::new(Self {
            package: system.package.clone(),
            bin: system.bin.clone().unwrap_or_else(|| system.package.clone()),
            overrides: system.overrides.clone(),
            integration: spec.integration.clone(),
        }))
    }

    fn package_for(&self, manager: &PackageManager) -> &str {
        self.overrides
            .get(manager.name)
            .map_or(self.package.as_str(), String::as_str)
    }
}

impl Recipe for SystemRecipe {
    fn install_software(&self, ctx: &RecipeContext<'_>) -> Result<SoftwareChange> {
        let Some(manager) = platform::resolve_package_manager(ctx.platform, ctx.executor) else {
            bail!(
                "no package manager available on {} to install '{}'",
                ctx.platform,
                self.package
            );
        };
        let result = ctx
            .executor
            .run_shell(&manager.install_command(self.package_for(manager)))?;
        if !result.success {
            bail!("{} install failed: {}", manager.name, result.failure_detail());
        }
        Ok(SoftwareChange::Applied)
    }

    fn uninstall_software(&self, ctx: &RecipeContext<'_>) -> Result<SoftwareChange> {
        let Some(manager) = platform::resolve_package_manager(ctx.platform, ctx.executor) else {
            bail!(
                "no package manager available on {} to remove '{}'",
                ctx.platform,
                self.package
            );
        };
        let result = ctx
            .executor
            .run_shell(&manager.remove_command(self.package_for(manager)))?;
        if !result.success {
            bail!("{} remove failed: {}", manager.name, result.failure_detail());
        }
        Ok(SoftwareChange::Applied)
    }

    fn is_software_installed(&self, ctx: &RecipeContext<'_>) -> bool {
        ctx.executor.which(&self.bin)
    }

    fn integration(&self) -> Option<&IntegrationSpec> {
        self.integration.as_ref()
    }
}

/// Software installed by vendor-provided shell commands.
#[derive(Debug)]
pub struct ScriptRecipe {
    commands: BTreeMap<String, CommandSet>,
    detect: Detect,
    integration: Option<IntegrationSpec>,
}

impl ScriptRecipe {
    /// Build from a spec with `[commands.<os>]` tables and a `detect` probe.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::ContractViolation`] if either is missing.
    pub fn from_spec(id: &str, spec: &RecipeSpec) -> Result<Box<dyn Recipe>, RegistryError> {
        if spec.commands.is_empty() {
            return Err(RegistryError::ContractViolation {
                id: id.to_string(),
                kind: spec.kind.clone(),
                detail: "missing [commands.<os>] tables".to_string(),
            });
        }
        let Some(detect) = &spec.detect else {
            return Err(RegistryError::ContractViolation {
                id: id.to_string(),
                kind: spec.kind.clone(),
                detail: "missing 'detect' probe".to_string(),
            });
        };
        Ok(Box::new(Self {
            commands: spec.commands.clone(),
            detect: Detect::parse(detect),
            integration: spec.integration.clone(),
        }))
    }

    /// Command set for the platform: exact OS slug first, then the generic
    /// `linux` entry.
    fn command_set(&self, platform: Platform) -> Option<&CommandSet> {
        self.commands.get(&platform.os.to_string()).or_else(|| {
            if platform.os.is_linux() {
                self.commands.get("linux")
            } else {
                None
            }
        })
    }
}

impl Recipe for ScriptRecipe {
    fn install_software(&self, ctx: &RecipeContext<'_>) -> Result<SoftwareChange> {
        let Some(set) = self.command_set(ctx.platform) else {
            bail!("recipe has no install command for {}", ctx.platform.os);
        };
        let result = ctx.executor.run_shell(&set.install)?;
        if !result.success {
            bail!("install script failed: {}", result.failure_detail());
        }
        Ok(SoftwareChange::Applied)
    }

    fn uninstall_software(&self, ctx: &RecipeContext<'_>) -> Result<SoftwareChange> {
        let Some(set) = self.command_set(ctx.platform) else {
            bail!("recipe has no commands for {}", ctx.platform.os);
        };
        let Some(uninstall) = &set.uninstall else {
            return Ok(SoftwareChange::Skipped {
                reason: "recipe defines no uninstall command".to_string(),
            });
        };
        let result = ctx.executor.run_shell(uninstall)?;
        if !result.success {
            bail!("uninstall script failed: {}", result.failure_detail());
        }
        Ok(SoftwareChange::Applied)
    }

    fn is_software_installed(&self, ctx: &RecipeContext<'_>) -> bool {
        self.detect.probe(ctx)
    }

    fn integration(&self) -> Option<&IntegrationSpec> {
        self.integration.as_ref()
    }
}

/// Package that ships only configuration.
#[derive(Debug)]
pub struct ConfigOnlyRecipe {
    integration: Option<IntegrationSpec>,
}

impl ConfigOnlyRecipe {
    /// Build from a spec. No fields are required.
    ///
    /// # Errors
    ///
    /// Never fails; the signature matches [`RecipeConstructor`].
    pub fn from_spec(_id: &str, spec: &RecipeSpec) -> Result<Box<dyn Recipe>, RegistryError> {
        Ok(Box::new(Self {
            integration: spec.integration.clone(),
        }))
    }
}

impl Recipe for ConfigOnlyRecipe {
    fn install_software(&self, _ctx: &RecipeContext<'_>) -> Result<SoftwareChange> {
        Ok(SoftwareChange::Skipped {
            reason: "no software layer".to_string(),
        })
    }

    fn uninstall_software(&self, _ctx: &RecipeContext<'_>) -> Result<SoftwareChange> {
        Ok(SoftwareChange::Skipped {
            reason: "no software layer".to_string(),
        })
    }

    fn is_software_installed(&self, _ctx: &RecipeContext<'_>) -> bool {
        true
    }

    fn integration(&self) -> Option<&IntegrationSpec> {
        self.integration.as_ref()
    }
}

/// Presence probe for script-installed software.
#[derive(Debug, Clone)]
enum Detect {
    /// Binary resolvable on PATH.
    Binary(String),
    /// File that exists after `~` expansion.
    Path(String),
}

impl Detect {
    fn parse(raw: &str) -> Self {
        raw.strip_prefix("path:").map_or_else(
            || Self::Binary(raw.to_string()),
            |path| Self::Path(path.to_string()),
        )
    }

    fn probe(&self, ctx: &RecipeContext<'_>) -> bool {
        match self {
            Self::Binary(bin) => ctx.executor.which(bin),
            Self::Path(raw) => expand_home(raw, ctx.home).exists(),
        }
    }
}

/// Expand a leading `~` against the given home directory.
fn expand_home(raw: &str, home: &Path) -> PathBuf {
    if raw == "~" {
        return home.to_path_buf();
    }
    raw.strip_prefix("~/")
        .map_or_else(|| PathBuf::from(raw), |rest| home.join(rest))
}
