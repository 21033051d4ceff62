//! External command execution.
//!
//! Every tool invocation (`xbuild`, `mdtool`, `xcrun`, `xcodebuild`, `zip`,
//! `security`, `envman`) goes through the [`CommandRunner`] trait. The real
//! implementation is [`SystemRunner`]; tests use [`RecordingRunner`], which
//! records each [`CommandSpec`] and replays canned outputs.

use std::collections::VecDeque;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;

use crate::types::BuildError;

/// A fully described external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub current_dir: Option<PathBuf>,
    /// Short human-readable label used in logs and error messages.
    pub description: String,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            description: description.into(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy())
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Returns `true` if any argument equals `needle`.
    pub fn has_arg(&self, needle: &str) -> bool {
        self.args.iter().any(|a| a == needle)
    }
}

impl fmt::Display for CommandSpec {
    /// Shell-like rendering, quoting arguments that contain whitespace.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", quote(arg))?;
        }
        Ok(())
    }
}

fn quote(s: &str) -> String {
    if s.is_empty() || s.chars().any(char::is_whitespace) {
        format!("\"{}\"", s)
    } else {
        s.to_string()
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub status: String,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            status: "exit status: 0".to_string(),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            status: format!("exit status: {}", code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

/// Runs external commands.
///
/// Implementations return `Ok` for any command that started, whatever its
/// exit status. Use [`run_checked`] to turn a non-zero exit into
/// [`BuildError::Command`].
pub trait CommandRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, BuildError>;
}

/// Spawns real processes and waits for them to finish.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, BuildError> {
        tracing::info!("{}", spec);

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args);
        if let Some(dir) = &spec.current_dir {
            cmd.current_dir(dir);
        }

        let output = cmd.output().map_err(|e| BuildError::Spawn {
            description: spec.description.clone(),
            source: e,
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !stdout.is_empty() {
            tracing::debug!(target: "xabuild::command", "{}", stdout.trim_end());
        }

        Ok(CommandOutput {
            success: output.status.success(),
            status: output.status.to_string(),
            stdout,
            stderr,
        })
    }
}

/// Runs `spec` and fails with [`BuildError::Command`] on a non-zero exit.
pub fn run_checked<R: CommandRunner + ?Sized>(
    runner: &R,
    spec: &CommandSpec,
) -> Result<CommandOutput, BuildError> {
    let output = runner.run(spec)?;
    if !output.success {
        return Err(command_failed(spec, output));
    }
    Ok(output)
}

fn command_failed(spec: &CommandSpec, output: CommandOutput) -> BuildError {
    BuildError::Command {
        description: spec.description.clone(),
        status: output.status,
        stdout: output.stdout,
        stderr: output.stderr,
    }
}

/// How often a flaky command is reissued before its failure is fatal.
///
/// Only applied to the legacy `mdtool` build, which is known to hang and
/// exit non-zero on otherwise healthy projects. Failing to start the
/// process is never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
}

impl RetryPolicy {
    /// Run once; the first failure is fatal.
    pub fn none() -> Self {
        Self { max_attempts: 1 }
    }

    /// Run up to `max_attempts` times in total (at least once).
    pub fn attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Runs `spec` until it succeeds or the attempt budget is spent.
    pub fn run<R: CommandRunner + ?Sized>(
        &self,
        runner: &R,
        spec: &CommandSpec,
    ) -> Result<CommandOutput, BuildError> {
        let mut attempt = 1;
        loop {
            let output = runner.run(spec)?;
            if output.success {
                return Ok(output);
            }
            if attempt >= self.max_attempts {
                return Err(command_failed(spec, output));
            }
            tracing::warn!(
                attempt,
                max_attempts = self.max_attempts,
                "{} failed ({}), retrying",
                spec.description,
                output.status
            );
            attempt += 1;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

type Hook = Box<dyn Fn(&CommandSpec) + Send + Sync>;

/// A [`CommandRunner`] that records commands instead of running them.
///
/// Queued outputs are returned in order; once the queue is empty every
/// command succeeds with empty output. An optional hook runs before each
/// response so tests can create the files a real tool would produce.
pub struct RecordingRunner {
    calls: Mutex<Vec<CommandSpec>>,
    responses: Mutex<VecDeque<CommandOutput>>,
    hook: Option<Hook>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            responses: Mutex::new(VecDeque::new()),
            hook: None,
        }
    }

    pub fn with_hook(hook: impl Fn(&CommandSpec) + Send + Sync + 'static) -> Self {
        Self {
            hook: Some(Box::new(hook)),
            ..Self::new()
        }
    }

    pub fn push_response(&self, output: CommandOutput) {
        self.responses.lock().unwrap().push_back(output);
    }

    pub fn push_responses(&self, outputs: impl IntoIterator<Item = CommandOutput>) {
        let mut queue = self.responses.lock().unwrap();
        queue.extend(outputs);
    }

    /// All commands run so far, in order.
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of recorded commands whose program is `program`.
    pub fn count(&self, program: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.program == program)
            .count()
    }
}

impl Default for RecordingRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, BuildError> {
        self.calls.lock().unwrap().push(spec.clone());
        if let Some(hook) = &self.hook {
            hook(spec);
        }
        let output = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| CommandOutput::success(""));
        Ok(output)
    }
}
