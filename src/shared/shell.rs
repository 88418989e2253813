//! Every subprocess goes through [`CommandRunner`]. Commands are handed to
//! bash as a single script (`cd '<dir>' && <command>`), either directly on
//! Linux or through `wsl bash -c` on Windows hosts.

use crate::error::{DriftError, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Mutex;
use std::time::Duration;
use tokio::process::Command;

static DRIVE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z]):").expect("Invalid drive regex"));

/// Captured result of a finished command. A non-zero exit is not an error at
/// this level; callers decide what each exit code means.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// stdout followed by stderr, the way the CLI tools interleave them for a human.
    pub fn combined(&self) -> String {
        format!("{}{}", self.stdout, self.stderr)
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, dir: &str, command: &str, timeout: Duration) -> Result<CommandOutput>;
}

/// How bash is reached on this host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellMode {
    Local,
    Wsl,
}

impl ShellMode {
    pub fn detect() -> Self {
        if cfg!(windows) {
            ShellMode::Wsl
        } else {
            ShellMode::Local
        }
    }
}

pub struct ShellRunner {
    mode: ShellMode,
    program: PathBuf,
}

impl ShellRunner {
    /// Resolve `bash` (or `wsl`) on PATH.
    pub fn detect() -> Result<Self> {
        let mode = ShellMode::detect();
        let binary = match mode {
            ShellMode::Local => "bash",
            ShellMode::Wsl => "wsl",
        };
        let program = which::which(binary)
            .map_err(|_| DriftError::Config(format!("'{}' not found in PATH", binary)))?;
        tracing::debug!(program = %program.display(), ?mode, "shell runner ready");
        Ok(Self { mode, program })
    }

    fn build(&self, script: String) -> Command {
        let mut cmd = Command::new(&self.program);
        if self.mode == ShellMode::Wsl {
            cmd.arg("bash");
        }
        cmd.arg("-c").arg(script);
        cmd
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, dir: &str, command: &str, timeout: Duration) -> Result<CommandOutput> {
        let script = format!("cd {} && {}", shell_quote(&to_wsl_path(dir)), command);
        tracing::info!(mode = ?self.mode, "executing: {}", script);

        let child = self
            .build(script)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::error!("command timed out after {}s: {}", timeout.as_secs(), command);
                return Err(DriftError::Timeout {
                    command: command.to_string(),
                    seconds: timeout.as_secs(),
                });
            }
        };

        let result = CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };
        tracing::debug!(exit_code = result.exit_code, "command finished: {}", command);
        Ok(result)
    }
}

/// Map `C:\work\infra` to `/mnt/c/work/infra`. POSIX paths pass through.
pub fn to_wsl_path(path: &str) -> String {
    let forward = path.replace('\\', "/");
    DRIVE_REGEX
        .replace(&forward, |caps: &regex::Captures| {
            format!("/mnt/{}", caps[1].to_lowercase())
        })
        .to_string()
}

/// Single-quote a value for interpolation into a bash script.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// A command observed by [`ScriptedRunner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCommand {
    pub dir: String,
    pub command: String,
}

/// Replays canned results instead of spawning processes. Commands with no
/// scripted result succeed with empty output. Backs `--dry-run` and the tests.
#[derive(Default)]
pub struct ScriptedRunner {
    responses: Mutex<VecDeque<(String, Result<CommandOutput>)>>,
    recorded: Mutex<Vec<RecordedCommand>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer the next command containing `needle` with `output`.
    pub fn respond(self, needle: &str, output: CommandOutput) -> Self {
        self.push(needle, Ok(output))
    }

    /// Answer the next command containing `needle` with a spawn-level error.
    pub fn fail(self, needle: &str, error: DriftError) -> Self {
        self.push(needle, Err(error))
    }

    fn push(self, needle: &str, result: Result<CommandOutput>) -> Self {
        if let Ok(mut responses) = self.responses.lock() {
            responses.push_back((needle.to_string(), result));
        }
        self
    }

    pub fn recorded(&self) -> Vec<RecordedCommand> {
        self.recorded
            .lock()
            .map(|recorded| recorded.clone())
            .unwrap_or_default()
    }

    pub fn commands(&self) -> Vec<String> {
        self.recorded().into_iter().map(|r| r.command).collect()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, dir: &str, command: &str, _timeout: Duration) -> Result<CommandOutput> {
        tracing::info!("[dry-run] cd {} && {}", dir, command);
        if let Ok(mut recorded) = self.recorded.lock() {
            recorded.push(RecordedCommand {
                dir: dir.to_string(),
                command: command.to_string(),
            });
        }

        let mut responses = self
            .responses
            .lock()
            .map_err(|_| DriftError::CommandFailed("scripted runner poisoned".to_string()))?;
        match responses
            .iter()
            .position(|(needle, _)| command.contains(needle.as_str()))
        {
            Some(index) => match responses.remove(index) {
                Some((_, result)) => result,
                None => Ok(CommandOutput::default()),
            },
            None => Ok(CommandOutput::default()),
        }
    }
}
