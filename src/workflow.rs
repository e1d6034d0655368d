//! Lifecycle orchestration for install and remove runs.
//!
//! A run works through three gates before touching the system: every id
//! must resolve to an installer (a single typo aborts the whole request),
//! and for installs the dependency/conflict validation must pass. After
//! that, phases are best-effort: a failed phase is recorded and the
//! remaining phases and packages still run, so one broken vendor script
//! does not strand the rest of a new-machine bootstrap.
//!
//! Install order is software, config, integration; removal tears down in
//! reverse. Every phase records a [`TaskEntry`](crate::logging::TaskEntry)
//! so the summary and exit code reflect exactly what happened.

use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{Result, bail};

use crate::catalog::Catalog;
use crate::exec::Executor;
use crate::installer::{Installer, create_installer, validate_dependencies_and_conflicts};
use crate::linker::LinkChange;
use crate::logging::{Logger, TaskStatus};
use crate::platform::Platform;
use crate::profile::ProfileChange;
use crate::recipe::SoftwareChange;

/// Shared state for one install or remove run.
#[derive(Debug)]
pub struct Workflow<'a> {
    catalog: &'a Catalog,
    platform: Platform,
    executor: &'a dyn Executor,
    log: &'a Logger,
    home: PathBuf,
    dry_run: bool,
}

impl<'a> Workflow<'a> {
    /// Create a workflow over the given catalog and home directory.
    #[must_use]
    pub fn new(
        catalog: &'a Catalog,
        platform: Platform,
        executor: &'a dyn Executor,
        log: &'a Logger,
        home: impl Into<PathBuf>,
        dry_run: bool,
    ) -> Self {
        Self {
            catalog,
            platform,
            executor,
            log,
            home: home.into(),
            dry_run,
        }
    }

    /// Install packages: software, then config, then shell integration.
    ///
    /// `installed` is the set of package ids considered present for
    /// dependency and conflict checks.
    ///
    /// Phase failures are recorded in the logger, not returned; inspect
    /// [`Logger::has_failures`] afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if any id fails to resolve or validation finds
    /// missing dependencies or conflicts. Nothing has been changed in
    /// that case.
    pub fn install(&self, ids: &[String], installed: &BTreeSet<String>) -> Result<()> {
        self.log.stage("Resolving packages");
        let installers = self.resolve(ids)?;
        self.log
            .info(&format!("resolved {} package(s)", installers.len()));

        self.log.stage("Validating packages");
        self.validate(&installers, installed)?;

        for installer in &installers {
            self.install_one(installer);
        }
        Ok(())
    }

    /// Remove packages: shell integration, then config, then software.
    ///
    /// Phase failures are recorded in the logger, not returned.
    ///
    /// # Errors
    ///
    /// Returns an error if any id fails to resolve. Nothing has been
    /// changed in that case.
    pub fn remove(&self, ids: &[String]) -> Result<()> {
        self.log.stage("Resolving packages");
        let installers = self.resolve(ids)?;
        self.log
            .info(&format!("resolved {} package(s)", installers.len()));

        for installer in &installers {
            self.remove_one(installer);
        }
        Ok(())
    }

    fn resolve(&self, ids: &[String]) -> Result<Vec<Installer>> {
        let mut installers = Vec::with_capacity(ids.len());
        for id in ids {
            installers.push(create_installer(self.catalog, id, self.platform, &self.home)?);
        }
        Ok(installers)
    }

    /// Render the validation report for every package; missing
    /// dependencies and conflicts block the run, warnings do not.
    fn validate(&self, installers: &[Installer], installed: &BTreeSet<String>) -> Result<()> {
        let mut blocked = false;
        for installer in installers {
            let id = installer.id();
            let report =
                validate_dependencies_and_conflicts(installer.record(), self.platform, installed);
            for dependency in &report.missing_dependencies {
                self.log
                    .error(&format!("missing dependency for '{id}': {dependency}"));
                blocked = true;
            }
            for conflict in &report.conflicts {
                self.log
                    .error(&format!("'{id}' conflicts with installed package '{conflict}'"));
                blocked = true;
            }
            for warning in &report.warnings {
                self.log.warn(&format!("{id}: {warning}"));
            }
        }
        if blocked {
            bail!("blocking issues found; nothing was changed");
        }
        Ok(())
    }

    fn install_one(&self, installer: &Installer) {
        let id = installer.id();
        self.log.stage(&format!("Installing {id}"));
        let mut failed = false;

        let name = format!("software: {id}");
        if installer.is_software_installed(self.executor, self.platform) {
            self.log.debug(&format!("{id} software already present"));
            self.log.record_task(&name, TaskStatus::Unchanged, None);
        } else {
            match installer.install_software(self.executor, self.platform) {
                Ok(change) => self.record_software(&name, change),
                Err(err) => {
                    self.record_failure(&name, &err);
                    failed = true;
                }
            }
        }

        let name = format!("config: {id}");
        match installer.install_config(self.executor, self.platform, self.dry_run) {
            Ok(change) => self.record_link(&name, change),
            Err(err) => {
                self.record_failure(&name, &err.into());
                failed = true;
            }
        }

        if installer.has_integration() {
            let name = format!("integration: {id}");
            match installer.setup_integration(self.dry_run) {
                Ok(change) => self.record_profile(&name, change),
                Err(err) => {
                    self.record_failure(&name, &err);
                    failed = true;
                }
            }
        }

        if !failed
            && let Some(message) = installer.post_install_message()
        {
            self.log.info(&format!("note: {message}"));
        }
    }

    fn remove_one(&self, installer: &Installer) {
        let id = installer.id();
        self.log.stage(&format!("Removing {id}"));

        if installer.has_integration() {
            let name = format!("integration: {id}");
            match installer.remove_integration(self.dry_run) {
                Ok(change) => self.record_profile(&name, change),
                Err(err) => {
                    self.record_failure(&name, &err);
                }
            }
        }

        let name = format!("config: {id}");
        match installer.uninstall_config(self.executor, self.platform, self.dry_run) {
            Ok(change) => self.record_link(&name, change),
            Err(err) => {
                self.record_failure(&name, &err.into());
            }
        }

        let name = format!("software: {id}");
        if installer.is_software_installed(self.executor, self.platform) {
            match installer.uninstall_software(self.executor, self.platform) {
                Ok(change) => self.record_software(&name, change),
                Err(err) => {
                    self.record_failure(&name, &err);
                }
            }
        } else {
            self.log.debug(&format!("{id} software already absent"));
            self.log.record_task(&name, TaskStatus::Unchanged, None);
        }
    }

    /// Map an applied change to `Ok`, or `DryRun` when nothing really ran.
    const fn applied_status(&self) -> TaskStatus {
        if self.dry_run {
            TaskStatus::DryRun
        } else {
            TaskStatus::Ok
        }
    }

    fn record_software(&self, name: &str, change: SoftwareChange) {
        match change {
            SoftwareChange::Applied => {
                self.log.record_task(name, self.applied_status(), None);
            }
            SoftwareChange::AlreadyCorrect => {
                self.log.record_task(name, TaskStatus::Unchanged, None);
            }
            SoftwareChange::Skipped { reason } => {
                self.log.debug(&format!("skipped: {reason}"));
                self.log
                    .record_task(name, TaskStatus::Skipped, Some(&reason));
            }
        }
    }

    fn record_link(&self, name: &str, change: LinkChange) {
        match change {
            LinkChange::Applied => {
                self.log.record_task(name, self.applied_status(), None);
            }
            LinkChange::AlreadyCorrect => {
                self.log.record_task(name, TaskStatus::Unchanged, None);
            }
            LinkChange::Skipped { reason } => {
                self.log.debug(&format!("skipped: {reason}"));
                self.log
                    .record_task(name, TaskStatus::Skipped, Some(&reason));
            }
        }
    }

    fn record_profile(&self, name: &str, change: ProfileChange) {
        match change {
            ProfileChange::Changed(paths) => {
                for path in &paths {
                    self.log.debug(&format!("patched {}", path.display()));
                }
                self.log.record_task(name, self.applied_status(), None);
            }
            ProfileChange::Unchanged => {
                self.log.record_task(name, TaskStatus::Unchanged, None);
            }
            ProfileChange::NoProfiles => {
                self.log
                    .record_task(name, TaskStatus::Skipped, Some("no profile files found"));
            }
        }
    }

    fn record_failure(&self, name: &str, err: &anyhow::Error) {
        self.log.error(&format!("{name}: {err:#}"));
        self.log
            .record_task(name, TaskStatus::Failed, Some(&format!("{err:#}")));
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::catalog::{CONFIG_DIR, DESCRIPTOR_FILE, RECIPE_FILE};
    use crate::exec::test_helpers::MockExecutor;
    use crate::platform::{CpuArch, OsFamily};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    const DEBIAN: Platform = Platform::new(OsFamily::Debian, CpuArch::X86_64);

    fn write_package(root: &Path, category: &str, id: &str, descriptor: &str, recipe: &str) {
        let dir = root.join(category).join(id);
        fs::create_dir_all(dir.join(CONFIG_DIR)).unwrap();
        fs::write(dir.join(DESCRIPTOR_FILE), descriptor).unwrap();
        fs::write(dir.join(RECIPE_FILE), recipe).unwrap();
    }

    fn write_config_file(root: &Path, category: &str, id: &str, rel: &str) {
        let path = root.join(category).join(id).join(CONFIG_DIR).join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "content\n").unwrap();
    }

    const MINIMAL: &str = "name = \"Demo\"\nsummary = \"s\"\n";

    const SYSTEM_WITH_INTEGRATION: &str = concat!(
        "kind = \"system\"\n\n",
        "[system]\n",
        "package = \"demo\"\n\n",
        "[integration]\n",
        "marker = \"demo initialization\"\n",
        "lines = [\"source ~/.demo/env\"]\n",
    );

    struct Fixture {
        _root: TempDir,
        home: TempDir,
        catalog: Catalog,
        log: Logger,
    }

    impl Fixture {
        fn new(packages: &[(&str, &str, &str, &str)]) -> Self {
            let root = TempDir::new().unwrap();
            let home = TempDir::new().unwrap();
            for &(category, id, descriptor, recipe) in packages {
                write_package(root.path(), category, id, descriptor, recipe);
                write_config_file(root.path(), category, id, &format!(".{id}rc"));
            }
            let catalog = Catalog::discover(root.path()).unwrap();
            Self {
                _root: root,
                home,
                catalog,
                log: Logger::new("test"),
            }
        }

        fn workflow<'a>(&'a self, executor: &'a MockExecutor, dry_run: bool) -> Workflow<'a> {
            Workflow::new(
                &self.catalog,
                DEBIAN,
                executor,
                &self.log,
                self.home.path(),
                dry_run,
            )
        }

        fn statuses(&self) -> Vec<(String, TaskStatus)> {
            self.log
                .task_entries()
                .into_iter()
                .map(|entry| (entry.name, entry.status))
                .collect()
        }
    }

    #[test]
    fn install_runs_software_then_config_then_integration() {
        let fixture = Fixture::new(&[("shell", "demo", MINIMAL, SYSTEM_WITH_INTEGRATION)]);
        fs::write(fixture.home.path().join(".bashrc"), "# mine\n").unwrap();
        let mock = MockExecutor::default().with_binary("apt").with_binary("stow");
        let workflow = fixture.workflow(&mock, false);

        workflow
            .install(&["demo".to_string()], &BTreeSet::new())
            .unwrap();

        let commands = mock.commands();
        assert_eq!(commands.len(), 2);
        assert!(commands[0].contains("apt install"));
        assert!(commands[1].starts_with("stow -d "));

        let bashrc = fs::read_to_string(fixture.home.path().join(".bashrc")).unwrap();
        assert!(bashrc.contains("# demo initialization"));

        assert_eq!(
            fixture.statuses(),
            vec![
                ("software: demo".to_string(), TaskStatus::Ok),
                ("config: demo".to_string(), TaskStatus::Ok),
                ("integration: demo".to_string(), TaskStatus::Ok),
            ]
        );
        assert!(!fixture.log.has_failures());
    }

    #[cfg(unix)]
    #[test]
    fn remove_tears_down_in_reverse_order() {
        let fixture = Fixture::new(&[("shell", "demo", MINIMAL, SYSTEM_WITH_INTEGRATION)]);

        // Pre-state: integration applied, config linked, software present.
        fs::write(
            fixture.home.path().join(".bashrc"),
            "# mine\n\n# demo initialization\nsource ~/.demo/env\n",
        )
        .unwrap();
        let config_dir = fixture
            .catalog
            .get("demo")
            .unwrap()
            .config_dir();
        std::os::unix::fs::symlink(
            config_dir.join(".demorc"),
            fixture.home.path().join(".demorc"),
        )
        .unwrap();
        let mock = MockExecutor::default()
            .with_binary("apt")
            .with_binary("stow")
            .with_binary("demo");
        let workflow = fixture.workflow(&mock, false);

        workflow.remove(&["demo".to_string()]).unwrap();

        let commands = mock.commands();
        assert_eq!(commands.len(), 2);
        assert!(commands[0].starts_with("stow -D "), "config teardown first: {commands:?}");
        assert!(commands[1].contains("apt remove"), "software teardown last: {commands:?}");

        let bashrc = fs::read_to_string(fixture.home.path().join(".bashrc")).unwrap();
        assert_eq!(bashrc, "# mine\n", "integration block removed first");

        assert_eq!(
            fixture.statuses(),
            vec![
                ("integration: demo".to_string(), TaskStatus::Ok),
                ("config: demo".to_string(), TaskStatus::Ok),
                ("software: demo".to_string(), TaskStatus::Ok),
            ]
        );
    }

    #[test]
    fn phase_failure_does_not_stop_later_phases() {
        let fixture = Fixture::new(&[("shell", "demo", MINIMAL, SYSTEM_WITH_INTEGRATION)]);
        fs::write(fixture.home.path().join(".bashrc"), String::new()).unwrap();
        // First command (apt install) fails, second (stow) succeeds.
        let mock = MockExecutor::with_responses(vec![
            (false, String::new()),
            (true, String::new()),
        ])
        .with_binary("apt")
        .with_binary("stow");
        let workflow = fixture.workflow(&mock, false);

        workflow
            .install(&["demo".to_string()], &BTreeSet::new())
            .unwrap();

        assert_eq!(mock.commands().len(), 2, "config phase still ran");
        assert_eq!(
            fixture.statuses(),
            vec![
                ("software: demo".to_string(), TaskStatus::Failed),
                ("config: demo".to_string(), TaskStatus::Ok),
                ("integration: demo".to_string(), TaskStatus::Ok),
            ]
        );
        assert!(fixture.log.has_failures());
        assert_eq!(fixture.log.failure_count(), 1);
    }

    #[test]
    fn unknown_id_aborts_the_whole_request() {
        let fixture = Fixture::new(&[("shell", "demo", MINIMAL, SYSTEM_WITH_INTEGRATION)]);
        let mock = MockExecutor::always_ok();
        let workflow = fixture.workflow(&mock, false);

        let err = workflow
            .install(
                &["demo".to_string(), "missing".to_string()],
                &BTreeSet::new(),
            )
            .unwrap_err();
        assert!(err.to_string().contains("'missing' not found"));
        assert!(mock.commands().is_empty(), "nothing may run");
        assert!(fixture.log.task_entries().is_empty());
    }

    #[test]
    fn missing_dependencies_block_the_install() {
        let descriptor = "name = \"Demo\"\nsummary = \"s\"\ndependencies = [\"git\"]\n";
        let fixture = Fixture::new(&[("shell", "demo", descriptor, SYSTEM_WITH_INTEGRATION)]);
        let mock = MockExecutor::default().with_binary("apt").with_binary("stow");
        let workflow = fixture.workflow(&mock, false);

        let err = workflow
            .install(&["demo".to_string()], &BTreeSet::new())
            .unwrap_err();
        assert!(err.to_string().contains("nothing was changed"));
        assert!(mock.commands().is_empty());

        // The same request passes once the dependency is in the installed set.
        let installed: BTreeSet<String> = ["git".to_string()].into_iter().collect();
        workflow.install(&["demo".to_string()], &installed).unwrap();
        assert!(!mock.commands().is_empty());
    }

    #[test]
    fn dry_run_records_dry_run_statuses_and_writes_nothing() {
        let fixture = Fixture::new(&[("shell", "demo", MINIMAL, SYSTEM_WITH_INTEGRATION)]);
        fs::write(fixture.home.path().join(".bashrc"), "# mine\n").unwrap();
        let mock = MockExecutor::default().with_binary("apt").with_binary("stow");
        let workflow = fixture.workflow(&mock, true);

        workflow
            .install(&["demo".to_string()], &BTreeSet::new())
            .unwrap();

        assert_eq!(
            fixture.statuses(),
            vec![
                ("software: demo".to_string(), TaskStatus::DryRun),
                ("config: demo".to_string(), TaskStatus::DryRun),
                ("integration: demo".to_string(), TaskStatus::DryRun),
            ]
        );
        let bashrc = fs::read_to_string(fixture.home.path().join(".bashrc")).unwrap();
        assert_eq!(bashrc, "# mine\n", "dry-run must not patch profiles");
    }

    #[test]
    fn config_only_package_reports_software_unchanged() {
        let fixture = Fixture::new(&[("theme", "fonts", MINIMAL, "kind = \"config-only\"\n")]);
        let mock = MockExecutor::default().with_binary("stow");
        let workflow = fixture.workflow(&mock, false);

        workflow
            .install(&["fonts".to_string()], &BTreeSet::new())
            .unwrap();

        assert_eq!(
            fixture.statuses(),
            vec![
                ("software: fonts".to_string(), TaskStatus::Unchanged),
                ("config: fonts".to_string(), TaskStatus::Ok),
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn remove_of_absent_software_still_tears_down_config() {
        let fixture = Fixture::new(&[("shell", "demo", MINIMAL, SYSTEM_WITH_INTEGRATION)]);
        let config_dir = fixture.catalog.get("demo").unwrap().config_dir();
        std::os::unix::fs::symlink(
            config_dir.join(".demorc"),
            fixture.home.path().join(".demorc"),
        )
        .unwrap();
        // No `demo` binary: software layer is absent.
        let mock = MockExecutor::default().with_binary("apt").with_binary("stow");
        let workflow = fixture.workflow(&mock, false);

        workflow.remove(&["demo".to_string()]).unwrap();

        let commands = mock.commands();
        assert_eq!(commands.len(), 1);
        assert!(commands[0].starts_with("stow -D "));
        assert_eq!(
            fixture.statuses(),
            vec![
                ("integration: demo".to_string(), TaskStatus::Skipped),
                ("config: demo".to_string(), TaskStatus::Ok),
                ("software: demo".to_string(), TaskStatus::Unchanged),
            ]
        );
    }
}
