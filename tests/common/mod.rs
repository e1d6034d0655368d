// Shared helpers for integration tests.
//
// Gives every test an isolated packages root and home directory backed by
// temp dirs, with a fluent builder for laying out package fixtures.
//
// Pulled in by each integration test binary through `mod common;`.
#![allow(dead_code)]
#![allow(clippy::expect_used)]

use std::path::{Path, PathBuf};

use rigup::catalog::Catalog;

/// Descriptor for a package with no dependencies and no platform limits.
pub const MINIMAL_DESCRIPTOR: &str = "name = \"Pkg\"\nsummary = \"A test package\"\n";

/// Recipe with no software layer and no integration block.
pub const CONFIG_ONLY_RECIPE: &str = "kind = \"config-only\"\n";

/// An isolated packages root and home directory backed by temp dirs.
///
/// Both directories are deleted when the context is dropped (via the
/// underlying [`tempfile::TempDir`]).
pub struct IntegrationTestContext {
    /// Temporary packages root.
    pub root: tempfile::TempDir,
    /// Temporary home directory for link and profile operations.
    pub home: tempfile::TempDir,
}

impl IntegrationTestContext {
    /// Path to the packages root.
    pub fn root_path(&self) -> &Path {
        self.root.path()
    }

    /// Path to the temporary home directory.
    pub fn home_path(&self) -> &Path {
        self.home.path()
    }

    /// Path of a package directory under the root.
    pub fn package_dir(&self, category: &str, id: &str) -> PathBuf {
        self.root.path().join(category).join(id)
    }

    /// Discover a catalog over the packages root.
    pub fn catalog(&self) -> Catalog {
        Catalog::discover(self.root.path()).expect("discover catalog")
    }
}

/// Builder for [`IntegrationTestContext`].
///
/// Lets a test lay out packages, config files and home files before the
/// context is handed over.
pub struct TestContextBuilder {
    ctx: IntegrationTestContext,
}

impl TestContextBuilder {
    /// Begin building a new context with an empty packages root.
    pub fn new() -> Self {
        Self {
            ctx: IntegrationTestContext {
                root: tempfile::tempdir().expect("create packages root"),
                home: tempfile::tempdir().expect("create home dir"),
            },
        }
    }

    /// Add a complete package: descriptor, recipe and an empty `config/`.
    pub fn with_package(self, category: &str, id: &str, descriptor: &str, recipe: &str) -> Self {
        let dir = self.ctx.package_dir(category, id);
        std::fs::create_dir_all(dir.join("config")).expect("create package dirs");
        std::fs::write(dir.join("package.toml"), descriptor).expect("write package.toml");
        std::fs::write(dir.join("recipe.toml"), recipe).expect("write recipe.toml");
        self
    }

    /// Write a file into a package's `config/` tree.
    pub fn with_config_file(self, category: &str, id: &str, rel: &str, content: &str) -> Self {
        let path = self.ctx.package_dir(category, id).join("config").join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create config parent");
        }
        std::fs::write(&path, content).expect("write config file");
        self
    }

    /// Write a file into the temporary home directory.
    pub fn with_home_file(self, rel: &str, content: &str) -> Self {
        let path = self.ctx.home.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create home parent");
        }
        std::fs::write(&path, content).expect("write home file");
        self
    }

    /// Hand over the populated context.
    pub fn build(self) -> IntegrationTestContext {
        self.ctx
    }
}
