//! Process execution seam.
//!
//! Every external command in the engine funnels through the [`Executor`]
//! trait so that orchestration code can be exercised against a scripted
//! mock and so `--dry-run` can swap in an executor that only logs.
//!
//! A command that launches and exits non-zero is a *result*
//! ([`CommandResult`] with `success: false`), not an `Err`. Only a command
//! that cannot be launched at all (missing shell, OS error) produces
//! [`ExecError::Launch`].

use std::process::{Command, Output};

use crate::error::ExecError;

/// Captured outcome of a shell command.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Captured standard output, lossily decoded.
    pub stdout: String,
    /// Captured standard error, lossily decoded.
    pub stderr: String,
    /// Whether the command exited with status zero.
    pub success: bool,
    /// Raw exit code, if the process exited normally.
    pub code: Option<i32>,
}

impl From<Output> for CommandResult {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        }
    }
}

impl CommandResult {
    /// A synthetic successful result with no output.
    #[must_use]
    pub fn ok() -> Self {
        Self {
            stdout: String::new(),
            stderr: String::new(),
            success: true,
            code: Some(0),
        }
    }

    /// Short failure description suitable for log lines: trimmed stderr,
    /// falling back to the exit code when stderr is empty.
    #[must_use]
    pub fn failure_detail(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            format!("exit code {}", self.code.unwrap_or(-1))
        } else {
            stderr.to_string()
        }
    }
}

/// Single choke point for process execution.
///
/// The `Debug` bound lets structs holding `&dyn Executor` derive `Debug`.
pub trait Executor: std::fmt::Debug {
    /// Run a command line through the platform shell and capture its output.
    ///
    /// Non-zero exit is reported through the returned [`CommandResult`],
    /// never as `Err`.
    ///
    /// # Errors
    ///
    /// Returns [`ExecError::Launch`] if the shell itself cannot be spawned.
    fn run_shell(&self, command: &str) -> Result<CommandResult, ExecError>;

    /// Check whether a binary is available on PATH.
    fn which(&self, binary: &str) -> bool;
}

/// Executor backed by the real system shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemExecutor;

impl Executor for SystemExecutor {
    fn run_shell(&self, command: &str) -> Result<CommandResult, ExecError> {
        #[cfg(windows)]
        let output = Command::new("cmd").args(["/C", command]).output();

        #[cfg(not(windows))]
        let output = Command::new("sh").args(["-c", command]).output();

        let output = output.map_err(|source| ExecError::Launch {
            command: command.to_string(),
            source,
        })?;
        Ok(CommandResult::from(output))
    }

    fn which(&self, binary: &str) -> bool {
        which::which(binary).is_ok()
    }
}

/// Executor that logs what it would run and touches nothing.
///
/// `which` still consults the real PATH so detection checks stay truthful
/// during a dry run.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunExecutor;

impl Executor for DryRunExecutor {
    fn run_shell(&self, command: &str) -> Result<CommandResult, ExecError> {
        tracing::info!(target: "rigup::dry_run", "would run: {command}");
        Ok(CommandResult::ok())
    }

    fn which(&self, binary: &str) -> bool {
        SystemExecutor.which(binary)
    }
}

/// Shared test helpers for executor-driven unit tests.
///
/// Provides a configurable [`MockExecutor`](test_helpers::MockExecutor) so
/// individual test modules do not have to duplicate the boilerplate.
#[cfg(test)]
pub mod test_helpers {
    use std::collections::{HashSet, VecDeque};
    use std::sync::Mutex;

    use super::{CommandResult, Executor};
    use crate::error::ExecError;

    /// A configurable mock executor.
    ///
    /// Maintains a queue of `(success, stdout)` responses consumed in FIFO
    /// order. Once the queue is empty every call succeeds with empty output,
    /// so tests only script the commands they care about.
    ///
    /// Every command line handed to [`Executor::run_shell`] is recorded and
    /// can be inspected with [`commands`](Self::commands), which is how
    /// ordering assertions are written.
    ///
    /// Use [`with_which`](Self::with_which) to make every `which` call
    /// succeed, or [`with_binary`](Self::with_binary) to mark individual
    /// binaries as present (default: nothing is on PATH).
    #[derive(Debug, Default)]
    pub struct MockExecutor {
        responses: Mutex<VecDeque<(bool, String)>>,
        which_all: bool,
        known_binaries: HashSet<String>,
        commands: Mutex<Vec<String>>,
    }

    impl MockExecutor {
        /// Create a mock where every command succeeds with empty output.
        #[must_use]
        pub fn always_ok() -> Self {
            Self {
                which_all: true,
                ..Self::default()
            }
        }

        /// Create a mock from an ordered list of `(success, stdout)` pairs.
        #[must_use]
        pub fn with_responses(responses: Vec<(bool, String)>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                ..Self::default()
            }
        }

        /// Make every [`Executor::which`] call return `result`.
        #[must_use]
        pub fn with_which(mut self, result: bool) -> Self {
            self.which_all = result;
            self
        }

        /// Mark a single binary as present on PATH.
        #[must_use]
        pub fn with_binary(mut self, binary: &str) -> Self {
            self.known_binaries.insert(binary.to_string());
            self
        }

        /// Every command line passed to `run_shell` so far, in order.
        #[must_use]
        pub fn commands(&self) -> Vec<String> {
            self.commands.lock().map_or_else(|_| Vec::new(), |g| g.clone())
        }

        fn next(&self) -> (bool, String) {
            self.responses.lock().map_or_else(
                |_| (false, "mutex poisoned".to_string()),
                |mut guard| guard.pop_front().unwrap_or((true, String::new())),
            )
        }
    }

    impl Executor for MockExecutor {
        fn run_shell(&self, command: &str) -> Result<CommandResult, ExecError> {
            if let Ok(mut guard) = self.commands.lock() {
                guard.push(command.to_string());
            }
            let (success, stdout) = self.next();
            Ok(CommandResult {
                stdout,
                stderr: if success { String::new() } else { "mock failure".to_string() },
                success,
                code: Some(i32::from(!success)),
            })
        }

        fn which(&self, binary: &str) -> bool {
            self.which_all || self.known_binaries.contains(binary)
        }
    }
}
