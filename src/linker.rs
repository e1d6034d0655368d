//! Config tree linking into the home directory.
//!
//! Each package ships its dotfiles under `config/`, mirroring the layout
//! they should have under `$HOME`. Linking shells out to GNU `stow`
//! (`stow -d <package_dir> -t <home> config`), which is installed on
//! demand through the platform package manager when missing.
//!
//! State inspection never shells out: [`ConfigLinker::is_installed`] walks
//! the config tree natively and checks whether any corresponding `$HOME`
//! path is a symlink resolving into the tree. Before linking, a pre-scan
//! collects targets that already exist as regular files or foreign
//! symlinks; on any hit the operation aborts without modifying anything.

use std::path::{Path, PathBuf};

use crate::catalog::PackageRecord;
use crate::error::LinkError;
use crate::exec::Executor;
use crate::platform::{self, Platform};

/// Binary used to manage the symlink farm.
const LINK_TOOL: &str = "stow";

/// Outcome of a link or unlink operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkChange {
    /// Links were created or removed.
    Applied,
    /// The tree was already in the desired state.
    AlreadyCorrect,
    /// Nothing to do.
    Skipped {
        /// Reason why the operation was skipped.
        reason: String,
    },
}

/// Links package config trees into a target home directory.
#[derive(Debug)]
pub struct ConfigLinker<'a> {
    executor: &'a dyn Executor,
    home: PathBuf,
    dry_run: bool,
}

impl<'a> ConfigLinker<'a> {
    /// Create a linker targeting `home`.
    #[must_use]
    pub fn new(executor: &'a dyn Executor, home: impl Into<PathBuf>, dry_run: bool) -> Self {
        Self {
            executor,
            home: home.into(),
            dry_run,
        }
    }

    /// Make sure the link tool is available, installing it if a package
    /// manager can be resolved.
    ///
    /// [`install`](Self::install) and [`uninstall`](Self::uninstall) call
    /// this right before running the tool, so config-less packages never
    /// require it.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::ToolUnavailable`] if the tool is missing and
    /// cannot be installed.
    pub fn ensure_link_tool(&self, platform: Platform) -> Result<(), LinkError> {
        if self.executor.which(LINK_TOOL) {
            return Ok(());
        }

        let Some(manager) = platform::resolve_package_manager(platform, self.executor) else {
            return Err(LinkError::ToolUnavailable {
                tool: LINK_TOOL.to_string(),
                hint: "no package manager found to install it".to_string(),
            });
        };

        if self.dry_run {
            tracing::info!(target: "rigup::dry_run", "would install {LINK_TOOL} via {}", manager.name);
            return Ok(());
        }

        tracing::info!("installing {LINK_TOOL} via {}", manager.name);
        let result = self
            .executor
            .run_shell(&manager.install_command(LINK_TOOL))
            .map_err(|err| LinkError::ToolUnavailable {
                tool: LINK_TOOL.to_string(),
                hint: err.to_string(),
            })?;
        if !result.success {
            return Err(LinkError::ToolUnavailable {
                tool: LINK_TOOL.to_string(),
                hint: format!("install via {} failed: {}", manager.name, result.failure_detail()),
            });
        }

        if self.executor.which(LINK_TOOL) {
            Ok(())
        } else {
            Err(LinkError::ToolUnavailable {
                tool: LINK_TOOL.to_string(),
                hint: format!("still missing after install via {}", manager.name),
            })
        }
    }

    /// Link the package's config tree into the home directory.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Conflict`] if any target already exists as a
    /// regular file or a foreign symlink (nothing is modified),
    /// [`LinkError::ToolUnavailable`] if the link tool cannot be provided,
    /// or [`LinkError::CommandFailed`] if it reports failure.
    pub fn install(
        &self,
        record: &PackageRecord,
        platform: Platform,
    ) -> Result<LinkChange, LinkError> {
        let config_dir = record.config_dir();
        let entries = walk_config(&config_dir)?;
        if entries.is_empty() {
            return Ok(LinkChange::Skipped {
                reason: "no config files shipped".to_string(),
            });
        }

        if self.is_installed(record)? {
            return Ok(LinkChange::AlreadyCorrect);
        }

        let conflicts = self.scan_conflicts(&config_dir, &entries);
        if !conflicts.is_empty() {
            return Err(LinkError::Conflict { targets: conflicts });
        }

        self.ensure_link_tool(platform)?;
        let command = format!(
            "{LINK_TOOL} -d '{}' -t '{}' {}",
            record.package_dir.display(),
            self.home.display(),
            crate::catalog::CONFIG_DIR,
        );
        let result = self
            .executor
            .run_shell(&command)
            .map_err(|err| LinkError::CommandFailed {
                detail: err.to_string(),
            })?;
        if !result.success {
            return Err(LinkError::CommandFailed {
                detail: result.failure_detail(),
            });
        }
        Ok(LinkChange::Applied)
    }

    /// Remove the package's config links from the home directory.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::ToolUnavailable`] if the link tool cannot be
    /// provided, or [`LinkError::CommandFailed`] if it reports failure.
    pub fn uninstall(
        &self,
        record: &PackageRecord,
        platform: Platform,
    ) -> Result<LinkChange, LinkError> {
        let config_dir = record.config_dir();
        let entries = walk_config(&config_dir)?;
        if entries.is_empty() {
            return Ok(LinkChange::Skipped {
                reason: "no config files shipped".to_string(),
            });
        }

        if !self.is_installed(record)? {
            return Ok(LinkChange::AlreadyCorrect);
        }

        self.ensure_link_tool(platform)?;
        let command = format!(
            "{LINK_TOOL} -D -d '{}' -t '{}' {}",
            record.package_dir.display(),
            self.home.display(),
            crate::catalog::CONFIG_DIR,
        );
        let result = self
            .executor
            .run_shell(&command)
            .map_err(|err| LinkError::CommandFailed {
                detail: err.to_string(),
            })?;
        if !result.success {
            return Err(LinkError::CommandFailed {
                detail: result.failure_detail(),
            });
        }
        Ok(LinkChange::Applied)
    }

    /// Whether any home path corresponding to the config tree is a symlink
    /// resolving into the tree.
    ///
    /// Plain files, dangling links and symlinks into other trees do not
    /// count.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Io`] if the config tree cannot be walked.
    pub fn is_installed(&self, record: &PackageRecord) -> Result<bool, LinkError> {
        let config_dir = record.config_dir();
        for entry in walk_config(&config_dir)? {
            let target = self.home.join(&entry.rel);
            if !is_symlink(&target) {
                continue;
            }
            let source = config_dir.join(&entry.rel);
            if let (Ok(resolved), Ok(source)) =
                (std::fs::canonicalize(&target), std::fs::canonicalize(&source))
                && resolved == source
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Targets that would block linking: existing regular files where a
    /// link should go, foreign symlinks, and files standing where the tree
    /// needs a directory.
    fn scan_conflicts(&self, config_dir: &Path, entries: &[ConfigEntry]) -> Vec<PathBuf> {
        let mut conflicts = Vec::new();
        for entry in entries {
            let target = self.home.join(&entry.rel);
            let Ok(meta) = target.symlink_metadata() else {
                continue;
            };

            if meta.is_symlink() {
                let source = config_dir.join(&entry.rel);
                let links_here = matches!(
                    (std::fs::canonicalize(&target), std::fs::canonicalize(&source)),
                    (Ok(resolved), Ok(source)) if resolved == source
                );
                if !links_here {
                    conflicts.push(target);
                }
            } else if entry.is_dir {
                // A regular directory is fine: the link tool descends into it.
                if meta.is_file() {
                    conflicts.push(target);
                }
            } else if meta.is_file() || meta.is_dir() {
                conflicts.push(target);
            }
        }
        conflicts
    }
}

struct ConfigEntry {
    rel: PathBuf,
    is_dir: bool,
}

/// Collect every entry of the config tree as a path relative to it.
///
/// A missing config directory yields an empty list.
fn walk_config(config_dir: &Path) -> Result<Vec<ConfigEntry>, LinkError> {
    let mut entries = Vec::new();
    if !config_dir.is_dir() {
        return Ok(entries);
    }
    walk_into(config_dir, config_dir, &mut entries)?;
    entries.sort_by(|a, b| a.rel.cmp(&b.rel));
    Ok(entries)
}

fn walk_into(
    root: &Path,
    dir: &Path,
    entries: &mut Vec<ConfigEntry>,
) -> Result<(), LinkError> {
    let read = std::fs::read_dir(dir).map_err(|source| LinkError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    for entry in read {
        let entry = entry.map_err(|source| LinkError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        let rel = path
            .strip_prefix(root)
            .map_or_else(|_| path.clone(), Path::to_path_buf);
        let is_dir = path.is_dir();
        entries.push(ConfigEntry { rel, is_dir });
        if is_dir {
            walk_into(root, &path, entries)?;
        }
    }
    Ok(())
}

fn is_symlink(path: &Path) -> bool {
    path.symlink_metadata().is_ok_and(|m| m.is_symlink())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing, clippy::panic)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, DESCRIPTOR_FILE};
    use crate::exec::test_helpers::MockExecutor;
    use crate::platform::{CpuArch, OsFamily};
    use std::fs;
    use tempfile::TempDir;

    const DEBIAN: Platform = Platform::new(OsFamily::Debian, CpuArch::X86_64);

    /// Build a packages root with one package carrying the given config
    /// files, and a separate home dir. Returns (root guard, home guard,
    /// record).
    fn fixture(config_files: &[&str]) -> (TempDir, TempDir, PackageRecord) {
        let root = TempDir::new().unwrap();
        let home = TempDir::new().unwrap();
        let pkg = root.path().join("shell").join("demo");
        fs::create_dir_all(pkg.join("config")).unwrap();
        fs::write(pkg.join(DESCRIPTOR_FILE), "name = \"Demo\"\nsummary = \"s\"\n").unwrap();
        for rel in config_files {
            let path = pkg.join("config").join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "content\n").unwrap();
        }
        let catalog = Catalog::discover(root.path()).unwrap();
        let record = catalog.get("demo").unwrap().clone();
        (root, home, record)
    }

    #[test]
    fn install_skips_without_config_files() {
        let (_root, home, record) = fixture(&[]);
        let mock = MockExecutor::always_ok();
        let linker = ConfigLinker::new(&mock, home.path(), false);

        let change = linker.install(&record, DEBIAN).unwrap();
        assert!(matches!(change, LinkChange::Skipped { .. }));
        assert!(mock.commands().is_empty());
    }

    #[test]
    fn install_invokes_link_tool_with_package_and_home() {
        let (_root, home, record) = fixture(&[".bashrc.d/demo.sh"]);
        let mock = MockExecutor::always_ok();
        let linker = ConfigLinker::new(&mock, home.path(), false);

        let change = linker.install(&record, DEBIAN).unwrap();
        assert_eq!(change, LinkChange::Applied);

        let commands = mock.commands();
        assert_eq!(commands.len(), 1);
        assert!(commands[0].starts_with("stow -d "));
        assert!(commands[0].contains(&record.package_dir.display().to_string()));
        assert!(commands[0].contains(&home.path().display().to_string()));
        assert!(commands[0].ends_with(" config"));
    }

    #[test]
    fn install_aborts_on_conflicting_regular_file() {
        let (_root, home, record) = fixture(&[".vimrc"]);
        fs::write(home.path().join(".vimrc"), "user's own\n").unwrap();
        let mock = MockExecutor::always_ok();
        let linker = ConfigLinker::new(&mock, home.path(), false);

        let err = linker.install(&record, DEBIAN).unwrap_err();
        match err {
            LinkError::Conflict { targets } => {
                assert_eq!(targets, vec![home.path().join(".vimrc")]);
            }
            other => panic!("expected Conflict, got {other}"),
        }
        assert!(mock.commands().is_empty(), "nothing may run after a conflict");
        let kept = fs::read_to_string(home.path().join(".vimrc")).unwrap();
        assert_eq!(kept, "user's own\n");
    }

    #[cfg(unix)]
    #[test]
    fn install_aborts_on_foreign_symlink() {
        let (_root, home, record) = fixture(&[".vimrc"]);
        fs::write(home.path().join("other"), "elsewhere\n").unwrap();
        std::os::unix::fs::symlink(home.path().join("other"), home.path().join(".vimrc"))
            .unwrap();
        let mock = MockExecutor::always_ok();
        let linker = ConfigLinker::new(&mock, home.path(), false);

        assert!(matches!(
            linker.install(&record, DEBIAN),
            Err(LinkError::Conflict { .. })
        ));
    }

    #[test]
    fn install_surfaces_link_tool_failure() {
        let (_root, home, record) = fixture(&[".vimrc"]);
        let mock = MockExecutor::with_responses(vec![(false, String::new())]).with_binary("stow");
        let linker = ConfigLinker::new(&mock, home.path(), false);

        assert!(matches!(
            linker.install(&record, DEBIAN),
            Err(LinkError::CommandFailed { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn is_installed_true_for_link_into_tree() {
        let (_root, home, record) = fixture(&[".vimrc"]);
        std::os::unix::fs::symlink(
            record.config_dir().join(".vimrc"),
            home.path().join(".vimrc"),
        )
        .unwrap();
        let mock = MockExecutor::always_ok();
        let linker = ConfigLinker::new(&mock, home.path(), false);

        assert!(linker.is_installed(&record).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn is_installed_ignores_foreign_links_and_plain_files() {
        let (_root, home, record) = fixture(&[".vimrc", ".inputrc"]);
        // Plain file at one target, foreign symlink at the other.
        fs::write(home.path().join(".vimrc"), "plain\n").unwrap();
        fs::write(home.path().join("elsewhere"), "x\n").unwrap();
        std::os::unix::fs::symlink(home.path().join("elsewhere"), home.path().join(".inputrc"))
            .unwrap();
        let mock = MockExecutor::always_ok();
        let linker = ConfigLinker::new(&mock, home.path(), false);

        assert!(!linker.is_installed(&record).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn is_installed_ignores_dangling_links() {
        let (_root, home, record) = fixture(&[".vimrc"]);
        std::os::unix::fs::symlink(home.path().join("gone"), home.path().join(".vimrc"))
            .unwrap();
        let mock = MockExecutor::always_ok();
        let linker = ConfigLinker::new(&mock, home.path(), false);

        assert!(!linker.is_installed(&record).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn install_when_already_linked_is_already_correct() {
        let (_root, home, record) = fixture(&[".vimrc"]);
        std::os::unix::fs::symlink(
            record.config_dir().join(".vimrc"),
            home.path().join(".vimrc"),
        )
        .unwrap();
        let mock = MockExecutor::always_ok();
        let linker = ConfigLinker::new(&mock, home.path(), false);

        assert_eq!(linker.install(&record, DEBIAN).unwrap(), LinkChange::AlreadyCorrect);
        assert!(mock.commands().is_empty());
    }

    #[test]
    fn uninstall_when_not_linked_is_already_correct() {
        let (_root, home, record) = fixture(&[".vimrc"]);
        let mock = MockExecutor::always_ok();
        let linker = ConfigLinker::new(&mock, home.path(), false);

        assert_eq!(linker.uninstall(&record, DEBIAN).unwrap(), LinkChange::AlreadyCorrect);
        assert!(mock.commands().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn uninstall_invokes_link_tool_delete() {
        let (_root, home, record) = fixture(&[".vimrc"]);
        std::os::unix::fs::symlink(
            record.config_dir().join(".vimrc"),
            home.path().join(".vimrc"),
        )
        .unwrap();
        let mock = MockExecutor::always_ok();
        let linker = ConfigLinker::new(&mock, home.path(), false);

        assert_eq!(linker.uninstall(&record, DEBIAN).unwrap(), LinkChange::Applied);
        let commands = mock.commands();
        assert_eq!(commands.len(), 1);
        assert!(commands[0].starts_with("stow -D -d "));
    }

    #[test]
    fn ensure_link_tool_noop_when_present() {
        let mock = MockExecutor::default().with_binary("stow");
        let home = TempDir::new().unwrap();
        let linker = ConfigLinker::new(&mock, home.path(), false);
        let platform = Platform::new(OsFamily::Debian, CpuArch::X86_64);

        linker.ensure_link_tool(platform).unwrap();
        assert!(mock.commands().is_empty());
    }

    #[test]
    fn ensure_link_tool_errors_without_manager() {
        let mock = MockExecutor::default();
        let home = TempDir::new().unwrap();
        let linker = ConfigLinker::new(&mock, home.path(), false);
        let platform = Platform::new(OsFamily::LinuxOther, CpuArch::X86_64);

        let err = linker.ensure_link_tool(platform).unwrap_err();
        assert!(matches!(err, LinkError::ToolUnavailable { .. }));
    }

    #[test]
    fn ensure_link_tool_attempts_install_then_rechecks() {
        // apt is present, stow is not; the install succeeds but stow still
        // does not appear on PATH, so the error reports that.
        let mock = MockExecutor::default().with_binary("apt");
        let home = TempDir::new().unwrap();
        let linker = ConfigLinker::new(&mock, home.path(), false);
        let platform = Platform::new(OsFamily::Debian, CpuArch::X86_64);

        let err = linker.ensure_link_tool(platform).unwrap_err();
        assert_eq!(mock.commands(), vec!["sudo apt update && sudo apt install -y stow"]);
        assert!(err.to_string().contains("still missing"));
    }

    #[test]
    fn ensure_link_tool_dry_run_pretends_install() {
        let mock = MockExecutor::default().with_binary("apt");
        let home = TempDir::new().unwrap();
        let linker = ConfigLinker::new(&mock, home.path(), true);
        let platform = Platform::new(OsFamily::Debian, CpuArch::X86_64);

        linker.ensure_link_tool(platform).unwrap();
        assert!(mock.commands().is_empty());
    }
}
