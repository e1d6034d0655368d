//! Package catalog: descriptor discovery, categories, and search.
//!
//! A packages root is a two-level tree, `<root>/<category>/<id>/`, where
//! each package directory carries a `package.toml` descriptor, a
//! `recipe.toml` naming its installer kind, and a `config/` subtree of
//! dotfiles. The catalog walks the tree once, keeps the parsed records in
//! memory, and exposes lookup and search over them. Entries that fail to
//! parse are logged and excluded; they never abort discovery.
//!
//! The catalog is an explicit value. Callers that need to observe on-disk
//! changes call [`Catalog::refresh`]; nothing is memoized process-wide.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context as _, Result};
use serde::Deserialize;

use crate::error::CatalogError;
use crate::platform::Platform;

/// File name of the per-package descriptor.
pub const DESCRIPTOR_FILE: &str = "package.toml";
/// File name of the per-package installer recipe.
pub const RECIPE_FILE: &str = "recipe.toml";
/// Directory name of the per-package dotfiles tree.
pub const CONFIG_DIR: &str = "config";

/// Closed set of package categories.
///
/// The declaration order is the display order used by `list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Category {
    /// Bootstrapping and package managers.
    Core,
    /// Shell environments and command line prompts.
    Shell,
    /// Terminal emulators and session multiplexers.
    Terminal,
    /// Code editors and development tools.
    Editors,
    /// Programming language runtimes and version managers.
    Runtimes,
    /// Git tools and code quality utilities.
    Git,
    /// Container and containerization tools.
    Containers,
    /// Kubernetes toolbelt and orchestration.
    K8s,
    /// Cloud and infrastructure tools.
    Cloud,
    /// Security and networking utilities.
    Security,
    /// macOS productivity and automation tools.
    Macos,
    /// Fonts and visual themes.
    Theme,
    /// Data tools and extras.
    Data,
}

impl Category {
    /// Every category, in display order.
    pub const ALL: [Self; 13] = [
        Self::Core,
        Self::Shell,
        Self::Terminal,
        Self::Editors,
        Self::Runtimes,
        Self::Git,
        Self::Containers,
        Self::K8s,
        Self::Cloud,
        Self::Security,
        Self::Macos,
        Self::Theme,
        Self::Data,
    ];

    /// Directory name of the category under the packages root.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Core => "core",
            Self::Shell => "shell",
            Self::Terminal => "terminal",
            Self::Editors => "editors",
            Self::Runtimes => "runtimes",
            Self::Git => "git",
            Self::Containers => "containers",
            Self::K8s => "k8s",
            Self::Cloud => "cloud",
            Self::Security => "security",
            Self::Macos => "macos",
            Self::Theme => "theme",
            Self::Data => "data",
        }
    }

    /// Human description shown by `list`.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Core => "Bootstrapping and package managers",
            Self::Shell => "Shell environments and command line prompts",
            Self::Terminal => "Terminal emulators and session multiplexers",
            Self::Editors => "Code editors and development tools",
            Self::Runtimes => "Programming language runtimes and version managers",
            Self::Git => "Git tools and code quality utilities",
            Self::Containers => "Container and containerization tools",
            Self::K8s => "Kubernetes toolbelt and orchestration",
            Self::Cloud => "Cloud and infrastructure tools",
            Self::Security => "Security and networking utilities",
            Self::Macos => "macOS productivity and automation tools",
            Self::Theme => "Fonts and visual themes",
            Self::Data => "Data tools and extras",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.slug())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.slug() == s)
            .ok_or_else(|| {
                let slugs: Vec<&str> = Self::ALL.iter().map(|c| c.slug()).collect();
                format!("unknown category '{s}' (expected one of: {})", slugs.join(", "))
            })
    }
}

/// OS/architecture allow-lists from a descriptor's `[supports]` table.
///
/// Empty lists place no restriction.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SupportMatrix {
    /// OS family tags (`debian`, `macos`, plus the generic `linux`).
    #[serde(default)]
    pub os: Vec<String>,
    /// Architecture tags (`x86_64`/`amd64`, `arm64`/`aarch64`).
    #[serde(default)]
    pub arch: Vec<String>,
}

/// Parsed `package.toml` descriptor.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageMetadata {
    /// Display name.
    pub name: String,
    /// One-line description.
    pub summary: String,
    /// Long-form description; falls back to `summary` when absent.
    #[serde(default)]
    description: Option<String>,
    /// Upstream version the recipe targets, if pinned.
    #[serde(default)]
    pub version: Option<String>,
    /// Upstream project page.
    #[serde(default)]
    pub homepage: Option<String>,
    /// Source repository URL.
    #[serde(default)]
    pub repository: Option<String>,
    /// Lowercase search facets.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Package ids that must already be installed.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Package ids that must not be installed alongside this one.
    #[serde(default)]
    pub conflicts: Vec<String>,
    /// Message printed after a successful install.
    #[serde(default)]
    pub post_install: Option<String>,
    /// Platform allow-lists; absent means any platform.
    #[serde(default)]
    pub supports: SupportMatrix,
}

impl PackageMetadata {
    /// Long description, falling back to the summary.
    #[must_use]
    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or(&self.summary)
    }
}

/// A discovered package: descriptor plus its location in the tree.
#[derive(Debug, Clone)]
pub struct PackageRecord {
    /// Package id (the directory name).
    pub id: String,
    /// Category (the parent directory name).
    pub category: Category,
    /// Absolute path of the package directory.
    pub package_dir: PathBuf,
    /// Parsed descriptor.
    pub meta: PackageMetadata,
}

impl PackageRecord {
    /// Path of the package's `recipe.toml`.
    #[must_use]
    pub fn recipe_path(&self) -> PathBuf {
        self.package_dir.join(RECIPE_FILE)
    }

    /// Path of the package's `config/` tree.
    #[must_use]
    pub fn config_dir(&self) -> PathBuf {
        self.package_dir.join(CONFIG_DIR)
    }

    /// Whether the descriptor's allow-lists admit `platform`.
    ///
    /// Both lists must accept; an empty list accepts everything.
    #[must_use]
    pub fn supports_platform(&self, platform: Platform) -> bool {
        let os_ok = self.meta.supports.os.is_empty()
            || self.meta.supports.os.iter().any(|tag| platform.os.matches_tag(tag));
        let arch_ok = self.meta.supports.arch.is_empty()
            || self.meta.supports.arch.iter().any(|tag| platform.arch.matches_tag(tag));
        os_ok && arch_ok
    }
}

/// Search filters, combined conjunctively.
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    /// Case-insensitive substring matched against name, summary,
    /// description and tags.
    pub text: Option<String>,
    /// Exact category.
    pub category: Option<Category>,
    /// Tag facets; a package matches if it carries any of them.
    pub tags: Vec<String>,
}

/// In-memory view of a packages root.
#[derive(Debug)]
pub struct Catalog {
    root: PathBuf,
    records: BTreeMap<String, PackageRecord>,
}

impl Catalog {
    /// Walk `root` and build a catalog from every valid descriptor.
    ///
    /// Malformed descriptors and unknown category directories are logged at
    /// `warn` and excluded. Directories without a `package.toml` are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::RootNotFound`] if `root` is not a directory,
    /// or [`CatalogError::Io`] if the tree cannot be read.
    pub fn discover(root: impl Into<PathBuf>) -> Result<Self, CatalogError> {
        let root = root.into();
        let mut catalog = Self {
            root,
            records: BTreeMap::new(),
        };
        catalog.refresh()?;
        Ok(catalog)
    }

    /// Re-walk the packages root, replacing the in-memory records.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Catalog::discover`].
    pub fn refresh(&mut self) -> Result<(), CatalogError> {
        if !self.root.is_dir() {
            return Err(CatalogError::RootNotFound {
                path: self.root.clone(),
            });
        }

        let mut records = BTreeMap::new();
        for category_entry in read_dir_sorted(&self.root)? {
            if !category_entry.is_dir() {
                continue;
            }
            let category_name = dir_name(&category_entry);
            let Ok(category) = Category::from_str(&category_name) else {
                tracing::warn!(
                    "skipping '{}': not a known category",
                    category_entry.display()
                );
                continue;
            };

            for package_entry in read_dir_sorted(&category_entry)? {
                let descriptor = package_entry.join(DESCRIPTOR_FILE);
                if !package_entry.is_dir() || !descriptor.is_file() {
                    continue;
                }
                let id = dir_name(&package_entry);
                match load_descriptor(&descriptor) {
                    Ok(meta) => {
                        tracing::debug!("discovered {category}/{id}");
                        records.insert(
                            id.clone(),
                            PackageRecord {
                                id,
                                category,
                                package_dir: package_entry,
                                meta,
                            },
                        );
                    }
                    Err(err) => {
                        tracing::warn!("skipping {category}/{id}: {err:#}");
                    }
                }
            }
        }

        tracing::debug!("catalog holds {} packages", records.len());
        self.records = records;
        Ok(())
    }

    /// The packages root this catalog was built from.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Look up a package by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&PackageRecord> {
        self.records.get(id)
    }

    /// All known ids, sorted.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.records.keys().cloned().collect()
    }

    /// All records, ordered by id.
    pub fn records(&self) -> impl Iterator<Item = &PackageRecord> {
        self.records.values()
    }

    /// Number of discovered packages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the catalog holds no packages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records grouped by category, in category display order.
    #[must_use]
    pub fn by_category(&self) -> BTreeMap<Category, Vec<&PackageRecord>> {
        let mut grouped: BTreeMap<Category, Vec<&PackageRecord>> = BTreeMap::new();
        for record in self.records.values() {
            grouped.entry(record.category).or_default().push(record);
        }
        grouped
    }

    /// Apply `query` and return matches sorted by display name.
    ///
    /// When `platform` is given, packages whose descriptors do not admit it
    /// are dropped from the results.
    #[must_use]
    pub fn search(&self, query: &SearchQuery, platform: Option<Platform>) -> Vec<&PackageRecord> {
        let needle = query.text.as_deref().map(str::to_lowercase);
        let mut results: Vec<&PackageRecord> = self
            .records
            .values()
            .filter(|r| platform.is_none_or(|p| r.supports_platform(p)))
            .filter(|r| query.category.is_none_or(|c| r.category == c))
            .filter(|r| {
                query.tags.is_empty() || query.tags.iter().any(|t| r.meta.tags.contains(t))
            })
            .filter(|r| {
                needle.as_deref().is_none_or(|needle| {
                    let haystack = format!(
                        "{} {} {} {}",
                        r.meta.name,
                        r.meta.summary,
                        r.meta.description(),
                        r.meta.tags.join(" ")
                    )
                    .to_lowercase();
                    haystack.contains(needle)
                })
            })
            .collect();
        results.sort_by(|a, b| a.meta.name.cmp(&b.meta.name).then_with(|| a.id.cmp(&b.id)));
        results
    }
}

fn load_descriptor(path: &Path) -> Result<PackageMetadata> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read descriptor: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("failed to parse descriptor: {}", path.display()))
}

fn read_dir_sorted(dir: &Path) -> Result<Vec<PathBuf>, CatalogError> {
    let entries = std::fs::read_dir(dir).map_err(|source| CatalogError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| CatalogError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        paths.push(entry.path());
    }
    paths.sort();
    Ok(paths)
}

fn dir_name(path: &Path) -> String {
    path.file_name().map_or_else(String::new, |n| n.to_string_lossy().to_string())
}
