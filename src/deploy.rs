//! Build and restart commands
//!
//! Configured command strings are trusted: they are passed verbatim to
//! `<shell> -c`, so pipes, redirects and `&&` chains all work and nothing is
//! sanitized.

use nix::errno::Errno;
use nix::sys::signal::{Signal, killpg};
use nix::unistd::Pid;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use crate::error::{RelayError, Result};
use crate::notifier::{InlineKeyboardMarkup, TelegramNotifier};

/// Outcome of one deploy step, as reported to the chat.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Skipped,
    Succeeded,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: String,
    timeout: Option<Duration>,
}

impl ShellRunner {
    pub fn new(shell: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self {
            shell: shell.into(),
            timeout,
        }
    }

    /// Run `command` through the shell. Output is only logged.
    ///
    /// The shell leads its own process group; on timeout the whole group is
    /// killed so nothing the command forked outlives it.
    pub async fn run(&self, command: &str) -> Result<()> {
        info!("Running: {} -c {:?}", self.shell, command);
        let child = Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .kill_on_drop(true)
            .spawn()
            .map_err(RelayError::CommandSpawn)?;
        let pgid = child.id();

        let output = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(output) => output,
                Err(_) => {
                    warn!("Command timed out after {:?}: {}", limit, command);
                    if let Some(pgid) = pgid {
                        kill_process_group(pgid);
                    }
                    return Err(RelayError::CommandTimeout(limit));
                }
            },
            None => child.wait_with_output().await,
        }
        .map_err(RelayError::CommandSpawn)?;

        debug!("stdout:\n{}", String::from_utf8_lossy(&output.stdout));
        if output.status.success() {
            return Ok(());
        }

        debug!("stderr:\n{}", String::from_utf8_lossy(&output.stderr));
        let reason = match output.status.code() {
            Some(code) => format!("exit status {}", code),
            None => "terminated by signal".to_string(),
        };
        Err(RelayError::CommandFailed(reason))
    }
}

fn kill_process_group(pgid: u32) {
    let Ok(raw) = i32::try_from(pgid) else {
        return;
    };
    match killpg(Pid::from_raw(raw), Signal::SIGKILL) {
        Ok(()) => debug!("Killed process group {}", pgid),
        // ESRCH: every process in the group already exited
        Err(Errno::ESRCH) => {}
        Err(e) => error!("Failed to kill process group {}: {}", pgid, e),
    }
}

/// Runs a command and reports the result to the chat.
#[derive(Debug, Clone)]
pub struct Deployer {
    runner: ShellRunner,
    notifier: TelegramNotifier,
}

impl Deployer {
    pub fn new(runner: ShellRunner, notifier: TelegramNotifier) -> Self {
        Self { runner, notifier }
    }

    /// Empty commands are skipped silently. Otherwise one notification is sent:
    /// the error text on failure, or `success_text` with a single link button.
    pub async fn execute_command(
        &self,
        command: &str,
        success_text: &str,
        link_url: &str,
        link_label: &str,
    ) -> StepOutcome {
        if command.is_empty() {
            info!("No command provided");
            return StepOutcome::Skipped;
        }

        match self.runner.run(command).await {
            Ok(()) => {
                self.notifier
                    .notify(
                        success_text,
                        Some(InlineKeyboardMarkup::single_link(link_label, link_url)),
                    )
                    .await;
                StepOutcome::Succeeded
            }
            Err(e) => {
                error!("Command failed: {}", e);
                let text = format!("Error executing command: {}", e);
                self.notifier.notify(&text, None).await;
                StepOutcome::Failed(e.to_string())
            }
        }
    }
}
