//! Search command implementation.

use std::str::FromStr as _;

use anyhow::Result;

use crate::catalog::SearchQuery;
use crate::cli::{GlobalOpts, SearchOpts};
use crate::commands::CommandSetup;
use crate::logging::Logger;
use crate::platform::{OsFamily, Platform};

/// Run the search command: filter the catalog by text, category, tag and
/// platform, conjunctively.
///
/// # Errors
///
/// Returns an error if the catalog cannot be loaded or `--platform` names
/// an unknown OS family.
#[allow(clippy::print_stdout)]
pub fn run(global: &GlobalOpts, opts: &SearchOpts, log: &Logger) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;

    let query = SearchQuery {
        text: opts.query.clone(),
        category: opts.category,
        tags: opts.tag.clone(),
    };
    let platform = platform_filter(opts.platform.as_deref(), setup.platform)?;

    let matches = setup.catalog.search(&query, platform);
    if matches.is_empty() {
        log.info("no packages matched");
        return Ok(());
    }

    let id_width = matches.iter().map(|r| r.id.len()).max().unwrap_or(0);
    let cat_width = matches
        .iter()
        .map(|r| r.category.slug().len())
        .max()
        .unwrap_or(0);
    println!();
    for record in matches {
        let id = &record.id;
        let slug = record.category.slug();
        let summary = &record.meta.summary;
        println!("  {id:<id_width$}  {slug:<cat_width$}  {summary}");
    }
    Ok(())
}

/// Interpret `--platform`: absent means the current host, `all` disables
/// the filter, anything else must be an OS family slug.
fn platform_filter(arg: Option<&str>, current: Platform) -> Result<Option<Platform>> {
    match arg {
        None => Ok(Some(current)),
        Some("all") => Ok(None),
        Some(slug) => {
            let os = OsFamily::from_str(slug).map_err(anyhow::Error::msg)?;
            Ok(Some(Platform::new(os, current.arch)))
        }
    }
}
