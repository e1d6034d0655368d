//! Domain-specific error types for the package engine.
//!
//! This module provides a structured error hierarchy using [`thiserror`].
//! Internal modules return typed errors (e.g., [`RegistryError`],
//! [`CatalogError`]) while command handlers at the CLI boundary convert them
//! to [`anyhow::Error`] via the standard `?` operator.
//!
//! A command that runs and exits non-zero is *not* an error at this layer:
//! the executor reports it as a [`crate::exec::CommandResult`] with
//! `success: false`, and the workflow records the phase as failed. Only
//! infrastructure problems (a process that cannot be spawned, unreadable
//! descriptors) surface as `Err`.
//!
//! # Error hierarchy
//!
//! ```text
//! RigupError
//! ├── Registry(RegistryError)   package id resolution, installer construction
//! ├── Catalog(CatalogError)     descriptor tree discovery
//! ├── Exec(ExecError)           process launch failures
//! └── Link(LinkError)           config symlink management
//! ```

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the package engine.
///
/// Aggregates domain-specific sub-errors and is convertible to
/// [`anyhow::Error`] for use at CLI command boundaries.
#[derive(Error, Debug)]
pub enum RigupError {
    /// Installer resolution error (unknown id, bad structure, missing kind).
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Catalog discovery error (unreadable root, I/O failure).
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Process execution error (the command could not be launched).
    #[error("Execution error: {0}")]
    Exec(#[from] ExecError),

    /// Config linking error (link tool missing, target conflicts).
    #[error("Link error: {0}")]
    Link(#[from] LinkError),
}

/// Errors that arise while resolving a package id to an installer.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// The requested package id does not exist in the catalog.
    ///
    /// The message enumerates every known id so a typo is immediately
    /// recoverable from the error text alone.
    #[error("package '{id}' not found (available: {})", available.join(", "))]
    NotFound {
        /// The id that was requested.
        id: String,
        /// All ids the catalog knows, sorted.
        available: Vec<String>,
    },

    /// The package directory is missing a required entry point.
    #[error("package '{id}' has invalid structure: {reason}")]
    InvalidStructure {
        /// Id of the malformed package.
        id: String,
        /// What is missing or malformed.
        reason: String,
    },

    /// The descriptor names an installer kind with no registered constructor.
    #[error("package '{id}' requests unknown installer kind '{kind}'")]
    ImplementationNotFound {
        /// Id of the package.
        id: String,
        /// The unrecognized kind name.
        kind: String,
    },

    /// The recipe data does not satisfy the contract of its installer kind.
    #[error("package '{id}' violates the '{kind}' recipe contract: {detail}")]
    ContractViolation {
        /// Id of the package.
        id: String,
        /// Installer kind whose contract was violated.
        kind: String,
        /// Which required field or table is missing.
        detail: String,
    },
}

/// Errors that arise from walking the package descriptor tree.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The packages root directory does not exist or is not a directory.
    #[error("packages root not found: {}", path.display())]
    RootNotFound {
        /// The path that was probed.
        path: PathBuf,
    },

    /// An I/O error occurred while walking the descriptor tree.
    #[error("IO error reading {}: {source}", path.display())]
    Io {
        /// Path of the entry that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Errors that arise when a process cannot be launched at all.
#[derive(Error, Debug)]
pub enum ExecError {
    /// The shell or command binary could not be spawned.
    #[error("failed to launch '{command}': {source}")]
    Launch {
        /// The command string that was handed to the shell.
        command: String,
        /// Underlying OS error.
        source: std::io::Error,
    },
}

/// Errors that arise from config symlink management.
#[derive(Error, Debug)]
pub enum LinkError {
    /// The link tool is not on PATH and could not be installed.
    #[error("'{tool}' is not available: {hint}")]
    ToolUnavailable {
        /// Name of the required binary.
        tool: String,
        /// What the user can do about it.
        hint: String,
    },

    /// Link targets already exist as regular files; nothing was modified.
    #[error("link targets already exist: {}", paths_list(targets))]
    Conflict {
        /// The conflicting paths under the target directory.
        targets: Vec<PathBuf>,
    },

    /// The link tool ran and reported failure.
    #[error("link command failed: {detail}")]
    CommandFailed {
        /// Captured stderr or a short diagnosis.
        detail: String,
    },

    /// An I/O error occurred while inspecting the config tree.
    #[error("IO error inspecting {}: {source}", path.display())]
    Io {
        /// Path of the entry that could not be inspected.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

fn paths_list(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use std::io;

    // -----------------------------------------------------------------------
    // RegistryError
    // -----------------------------------------------------------------------

    #[test]
    fn registry_error_not_found_lists_available_ids() {
        let e = RegistryError::NotFound {
            id: "ripgrep".to_string(),
            available: vec!["fzf".to_string(), "starship".to_string()],
        };
        assert_eq!(
            e.to_string(),
            "package 'ripgrep' not found (available: fzf, starship)"
        );
    }

    #[test]
    fn registry_error_invalid_structure_display() {
        let e = RegistryError::InvalidStructure {
            id: "starship".to_string(),
            reason: "missing recipe.toml".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "package 'starship' has invalid structure: missing recipe.toml"
        );
    }

    #[test]
    fn registry_error_implementation_not_found_display() {
        let e = RegistryError::ImplementationNotFound {
            id: "starship".to_string(),
            kind: "snap".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "package 'starship' requests unknown installer kind 'snap'"
        );
    }

    #[test]
    fn registry_error_contract_violation_display() {
        let e = RegistryError::ContractViolation {
            id: "starship".to_string(),
            kind: "script".to_string(),
            detail: "missing [commands] table".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "package 'starship' violates the 'script' recipe contract: missing [commands] table"
        );
    }

    // -----------------------------------------------------------------------
    // CatalogError
    // -----------------------------------------------------------------------

    #[test]
    fn catalog_error_root_not_found_display() {
        let e = CatalogError::RootNotFound {
            path: PathBuf::from("/nonexistent/packages"),
        };
        assert_eq!(e.to_string(), "packages root not found: /nonexistent/packages");
    }

    #[test]
    fn catalog_error_io_has_source() {
        use std::error::Error as StdError;
        let e = CatalogError::Io {
            path: PathBuf::from("/packages/shell"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"),
        };
        assert!(e.source().is_some());
        assert!(e.to_string().contains("/packages/shell"));
    }

    // -----------------------------------------------------------------------
    // ExecError
    // -----------------------------------------------------------------------

    #[test]
    fn exec_error_launch_display() {
        let e = ExecError::Launch {
            command: "stow -t /home/u config".to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
        };
        assert!(e.to_string().contains("failed to launch"));
        assert!(e.to_string().contains("stow -t /home/u config"));
    }

    #[test]
    fn exec_error_launch_has_source() {
        use std::error::Error as StdError;
        let e = ExecError::Launch {
            command: "sh -c true".to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
        };
        assert!(e.source().is_some());
    }

    // -----------------------------------------------------------------------
    // LinkError
    // -----------------------------------------------------------------------

    #[test]
    fn link_error_tool_unavailable_display() {
        let e = LinkError::ToolUnavailable {
            tool: "stow".to_string(),
            hint: "no package manager found to install it".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "'stow' is not available: no package manager found to install it"
        );
    }

    #[test]
    fn link_error_conflict_lists_targets() {
        let e = LinkError::Conflict {
            targets: vec![PathBuf::from("/home/u/.bashrc"), PathBuf::from("/home/u/.vimrc")],
        };
        assert_eq!(
            e.to_string(),
            "link targets already exist: /home/u/.bashrc, /home/u/.vimrc"
        );
    }

    // -----------------------------------------------------------------------
    // RigupError conversions
    // -----------------------------------------------------------------------

    #[test]
    fn rigup_error_from_registry_error() {
        let inner = RegistryError::NotFound {
            id: "x".to_string(),
            available: vec![],
        };
        let e: RigupError = inner.into();
        assert!(e.to_string().contains("Registry error"));
        assert!(e.to_string().contains("'x'"));
    }

    #[test]
    fn rigup_error_from_catalog_error() {
        let inner = CatalogError::RootNotFound {
            path: PathBuf::from("/p"),
        };
        let e: RigupError = inner.into();
        assert!(e.to_string().contains("Catalog error"));
    }

    #[test]
    fn rigup_error_from_exec_error() {
        let inner = ExecError::Launch {
            command: "true".to_string(),
            source: io::Error::other("boom"),
        };
        let e: RigupError = inner.into();
        assert!(e.to_string().contains("Execution error"));
    }

    #[test]
    fn rigup_error_from_link_error() {
        let inner = LinkError::CommandFailed {
            detail: "stow exited with code 1".to_string(),
        };
        let e: RigupError = inner.into();
        assert!(e.to_string().contains("Link error"));
    }

    // -----------------------------------------------------------------------
    // Send + Sync bounds
    // -----------------------------------------------------------------------

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn all_error_types_are_send_sync() {
        assert_send_sync::<RigupError>();
        assert_send_sync::<RegistryError>();
        assert_send_sync::<CatalogError>();
        assert_send_sync::<ExecError>();
        assert_send_sync::<LinkError>();
    }

    // -----------------------------------------------------------------------
    // anyhow conversion
    // -----------------------------------------------------------------------

    #[test]
    fn registry_error_converts_to_anyhow() {
        let e = RegistryError::ImplementationNotFound {
            id: "x".to_string(),
            kind: "y".to_string(),
        };
        let _anyhow_err: anyhow::Error = e.into();
    }

    #[test]
    fn link_error_converts_to_anyhow() {
        let e = LinkError::CommandFailed {
            detail: "oops".to_string(),
        };
        let _anyhow_err: anyhow::Error = e.into();
    }
}
