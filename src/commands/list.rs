//! List command implementation.

use anyhow::Result;

use crate::cli::{GlobalOpts, ListOpts};
use crate::commands::CommandSetup;
use crate::logging::{self, Logger};

/// Run the list command: print the catalog grouped by category.
///
/// Packages whose descriptors do not admit the current platform are hidden
/// unless `--all-platforms` is given, in which case they are shown with a
/// marker.
///
/// # Errors
///
/// Returns an error if the package catalog cannot be loaded.
#[allow(clippy::print_stdout)]
pub fn run(global: &GlobalOpts, opts: &ListOpts, log: &Logger) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    let columns = logging::terminal_columns();

    let mut shown = 0usize;
    for (category, records) in setup.catalog.by_category() {
        if opts.category.is_some_and(|filter| filter != category) {
            continue;
        }
        let visible: Vec<_> = records
            .into_iter()
            .filter(|r| opts.all_platforms || r.supports_platform(setup.platform))
            .collect();
        if visible.is_empty() {
            continue;
        }

        println!();
        println!("{}: {}", category.slug(), category.description());

        let width = visible.iter().map(|r| r.id.len()).max().unwrap_or(0);
        for record in visible {
            let id = &record.id;
            let summary = &record.meta.summary;
            let mut line = format!("  {id:<width$}  {summary}");
            if !record.supports_platform(setup.platform) {
                line.push_str("  [unsupported on this platform]");
            }
            println!("{}", fit(&line, columns));
            shown += 1;
        }
    }

    if shown == 0 {
        log.info("no packages found");
    }
    Ok(())
}

/// Truncate `line` to `columns` characters, marking the cut with an ellipsis.
fn fit(line: &str, columns: usize) -> String {
    if line.chars().count() <= columns {
        return line.to_owned();
    }
    let mut out: String = line.chars().take(columns.saturating_sub(1)).collect();
    out.push('…');
    out
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn fit_keeps_short_lines() {
        assert_eq!(fit("  fzf  fuzzy finder", 80), "  fzf  fuzzy finder");
    }

    #[test]
    fn fit_truncates_long_lines() {
        let line = "x".repeat(100);
        let out = fit(&line, 10);
        assert_eq!(out.chars().count(), 10);
        assert!(out.ends_with('…'));
    }

    #[test]
    fn fit_counts_characters_not_bytes() {
        let line = "é".repeat(20);
        let out = fit(&line, 10);
        assert_eq!(out.chars().count(), 10);
    }
}
