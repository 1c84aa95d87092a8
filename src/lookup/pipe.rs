//! Pipe Lookup Plugin
//!
//! Runs each term as a shell command and returns its standard output.
//! Similar to Ansible's `pipe` lookup plugin.
//!
//! # Usage
//!
//! ```yaml
//! revision: "{{ lookup('pipe', 'git rev-parse HEAD') }}"
//! listing: "{{ lookup('pipe', 'ls -1', cwd='/etc', rstrip=false) }}"
//! ```
//!
//! # Options
//!
//! - `rstrip` (bool): Strip trailing whitespace from the output (default: true)
//! - `cwd` (path): Directory to run in (default: the context working directory)
//!
//! Commands go through a [`CommandRunner`] so callers can substitute the
//! execution backend; the default is a [`ShellRunner`] on the configured shell.

use super::{
    FromLookupOptions, LookupContext, LookupError, LookupOptionInfo, LookupOptions, LookupPlugin,
    LookupResult, PluginDescriptor, Variables,
};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Captured result of a finished command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `-1` when terminated by a signal
    pub exit_code: i32,
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
}

impl CommandOutput {
    /// Whether the command exited with status zero
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Executes a command line on behalf of the pipe lookup
#[async_trait]
pub trait CommandRunner: Send + Sync + fmt::Debug {
    /// Run `command`, optionally in `cwd`, aborting when `cancel` fires
    async fn run(
        &self,
        command: &str,
        cwd: Option<&Path>,
        cancel: &CancellationToken,
    ) -> LookupResult<CommandOutput>;
}

/// Runs commands through a system shell
#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: String,
}

impl ShellRunner {
    /// Create a runner for the given shell binary
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }

    fn build_command(&self, command: &str, cwd: Option<&Path>) -> Command {
        let flag = if cfg!(windows) { "/C" } else { "-c" };
        let mut cmd = Command::new(&self.shell);
        cmd.arg(flag)
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        cmd
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(
        &self,
        command: &str,
        cwd: Option<&Path>,
        cancel: &CancellationToken,
    ) -> LookupResult<CommandOutput> {
        debug!(command = %command, shell = %self.shell, "Executing pipe command");

        let child = self
            .build_command(command, cwd)
            .spawn()
            .map_err(|e| LookupError::source_unavailable(command, e))?;

        // Dropping the child on cancellation kills it.
        let output = tokio::select! {
            result = child.wait_with_output() => {
                result.map_err(|e| LookupError::source_unavailable(command, e))?
            }
            _ = cancel.cancelled() => return Err(LookupError::Cancelled),
        };

        let output = CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        trace!(
            exit_code = output.exit_code,
            stdout_len = output.stdout.len(),
            stderr_len = output.stderr.len(),
            "Command completed"
        );
        Ok(output)
    }
}

/// Typed options for [`PipeLookup`]
#[derive(Debug, Clone, PartialEq)]
pub struct PipeOptions {
    /// Strip trailing whitespace
    pub rstrip: bool,
    /// Working directory for the command
    pub cwd: Option<PathBuf>,
}

impl FromLookupOptions for PipeOptions {
    fn from_options(options: &LookupOptions, ctx: &LookupContext) -> Self {
        Self {
            rstrip: options.get_bool_or("rstrip", true),
            cwd: options
                .get_string("cwd")
                .map(|dir| ctx.resolve_path(&dir))
                .or_else(|| ctx.work_dir.clone()),
        }
    }
}

/// Pipe lookup plugin for executing commands
#[derive(Debug, Clone)]
pub struct PipeLookup {
    descriptor: PluginDescriptor,
    runner: Option<Arc<dyn CommandRunner>>,
}

impl PipeLookup {
    /// Create a new PipeLookup instance using the configured shell
    pub fn new() -> Self {
        Self {
            descriptor: PluginDescriptor::builtin("pipe", "Runs commands and returns their output"),
            runner: None,
        }
    }

    /// Use a custom command runner
    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    fn runner(&self, ctx: &LookupContext) -> Arc<dyn CommandRunner> {
        match self.runner {
            Some(ref runner) => Arc::clone(runner),
            None => Arc::new(ShellRunner::new(ctx.config.pipe.shell.clone())),
        }
    }
}

impl Default for PipeLookup {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LookupPlugin for PipeLookup {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    async fn run(
        &self,
        ctx: &LookupContext,
        terms: &[String],
        _variables: &Variables,
        options: &LookupOptions,
    ) -> LookupResult<Vec<Value>> {
        let opts = PipeOptions::from_options(options, ctx);
        let runner = self.runner(ctx);
        let mut results = Vec::with_capacity(terms.len());

        for term in terms {
            ctx.check_cancelled()?;

            let output = runner
                .run(term, opts.cwd.as_deref(), &ctx.cancellation)
                .await?;

            if !output.success() {
                return Err(LookupError::source_unavailable(
                    term.as_str(),
                    format!(
                        "command exited with code {}: {}",
                        output.exit_code,
                        output.stderr.trim()
                    ),
                ));
            }

            let stdout = if opts.rstrip {
                output.stdout.trim_end().to_string()
            } else {
                output.stdout
            };
            results.push(Value::String(stdout));
        }

        Ok(results)
    }

    fn examples(&self) -> Vec<&'static str> {
        vec!["date +%Y-%m-%d", "git rev-parse HEAD"]
    }

    fn available_options(&self) -> Vec<LookupOptionInfo> {
        vec![
            LookupOptionInfo::new("rstrip", "Strip trailing whitespace", "bool").with_default("true"),
            LookupOptionInfo::new("cwd", "Directory to run the command in", "path"),
        ]
    }
}
