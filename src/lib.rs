//! Workstation bootstrapping engine.
//!
//! Cross-platform tool that brings curated packages to a fully installed
//! state: system software, stow-linked dotfiles and shell profile
//! integration, driven by `package.toml` descriptors in a packages tree
//! and filtered by host platform.
//!
//! The public API is organised into four layers:
//!
//! - **[`catalog`]**: discover and query the packages tree
//! - **[`recipe`]**, **[`linker`]**, **[`profile`]**: the three lifecycle
//!   layers (software, config links, profile integration)
//! - **[`installer`]**, **[`workflow`]**: per-package orchestration and the
//!   install/remove pipeline
//! - **[`commands`]**: top-level subcommand orchestration (`install`,
//!   `remove`, `list`, `info`, `search`, `completion`)
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod catalog;
pub mod cli;
pub mod commands;
pub mod error;
pub mod exec;
pub mod installer;
pub mod linker;
pub mod logging;
pub mod platform;
pub mod profile;
pub mod recipe;
pub mod workflow;
