//! Idempotent shell-profile patching.
//!
//! Integration hooks (eval lines, PATH exports) are written into profile
//! files like `~/.bashrc` as a *block*: a `# marker` comment line followed
//! by the hook lines, separated from surrounding content by a blank line.
//! The marker line doubles as the sentinel that makes patching idempotent
//! and removal exact.
//!
//! The string-level functions are pure; [`apply_to_profiles`] and
//! [`remove_from_profiles`] add the file handling on top. Missing profile
//! files are skipped, never created.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

/// Result of patching a set of profile files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileChange {
    /// These profile files were modified (or would be, in dry-run).
    Changed(Vec<PathBuf>),
    /// Every existing profile file was already in the desired state.
    Unchanged,
    /// None of the candidate profile files exist.
    NoProfiles,
}

fn sentinel(marker: &str) -> String {
    format!("# {marker}")
}

/// Append a sentinel-guarded block to `content`.
///
/// Returns `None` if the marker line is already present (the block is
/// applied at most once). The block body must not contain blank lines;
/// a blank line is what terminates a block on removal.
///
/// A missing trailing newline on `content` is normalized to one.
#[must_use]
pub fn apply_block(content: &str, marker: &str, lines: &[String]) -> Option<String> {
    let sentinel = sentinel(marker);
    if content.lines().any(|l| l.trim() == sentinel) {
        return None;
    }

    let mut out = content.to_string();
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    if !out.is_empty() {
        out.push('\n');
    }
    out.push_str(&sentinel);
    out.push('\n');
    for line in lines {
        out.push_str(line);
        out.push('\n');
    }
    Some(out)
}

/// Remove the block guarded by `marker` from `content`.
///
/// The block is the marker line and every following line up to the next
/// blank line (or end of input). The blank separator above the marker is
/// collapsed as well, so a remove after [`apply_block`] restores the
/// original content. Returns `None` if the marker is not present.
#[must_use]
pub fn remove_block(content: &str, marker: &str) -> Option<String> {
    let sentinel = sentinel(marker);
    let lines: Vec<&str> = content.lines().collect();
    let start = lines.iter().position(|l| l.trim() == sentinel)?;

    let mut end = start + 1;
    while lines.get(end).is_some_and(|l| !l.trim().is_empty()) {
        end += 1;
    }
    // Collapse the blank separator above the block.
    let start = if start > 0 && lines.get(start - 1).is_some_and(|l| l.trim().is_empty()) {
        start - 1
    } else {
        start
    };

    let mut kept: Vec<&str> = Vec::with_capacity(lines.len());
    kept.extend(lines.get(..start).unwrap_or_default());
    kept.extend(lines.get(end..).unwrap_or_default());

    let mut out = kept.join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    Some(out)
}

/// Whether `content` already carries the block guarded by `marker`.
#[must_use]
pub fn has_block(content: &str, marker: &str) -> bool {
    let sentinel = sentinel(marker);
    content.lines().any(|l| l.trim() == sentinel)
}

/// Apply a block to each existing profile file under `home`.
///
/// Files that do not exist are skipped. With `dry_run` the files that
/// would change are reported but left untouched.
///
/// # Errors
///
/// Returns an error if an existing profile file cannot be read or written.
pub fn apply_to_profiles(
    home: &Path,
    profiles: &[String],
    marker: &str,
    lines: &[String],
    dry_run: bool,
) -> Result<ProfileChange> {
    patch_profiles(home, profiles, dry_run, |content| apply_block(content, marker, lines))
}

/// Remove a block from each existing profile file under `home`.
///
/// # Errors
///
/// Returns an error if an existing profile file cannot be read or written.
pub fn remove_from_profiles(
    home: &Path,
    profiles: &[String],
    marker: &str,
    dry_run: bool,
) -> Result<ProfileChange> {
    patch_profiles(home, profiles, dry_run, |content| remove_block(content, marker))
}

fn patch_profiles(
    home: &Path,
    profiles: &[String],
    dry_run: bool,
    patch: impl Fn(&str) -> Option<String>,
) -> Result<ProfileChange> {
    let mut changed = Vec::new();
    let mut seen_any = false;

    for profile in profiles {
        let path = home.join(profile);
        if !path.is_file() {
            continue;
        }
        seen_any = true;

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let Some(patched) = patch(&content) else {
            continue;
        };

        if dry_run {
            tracing::info!(target: "rigup::dry_run", "would patch {}", path.display());
        } else {
            std::fs::write(&path, patched)
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::debug!("patched {}", path.display());
        }
        changed.push(path);
    }

    if !seen_any {
        return Ok(ProfileChange::NoProfiles);
    }
    if changed.is_empty() {
        return Ok(ProfileChange::Unchanged);
    }
    Ok(ProfileChange::Changed(changed))
}
