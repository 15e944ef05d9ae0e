// Bounded-time external command execution for the WLAN sources.

use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::trace;

use super::ProbeError;

/// Runs read-only platform tools with a hard time limit.
///
/// The child is killed if the timeout fires or the calling future is
/// dropped (engine cancellation).
#[derive(Debug, Clone)]
pub struct CommandRunner {
    timeout: Duration,
}

impl CommandRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `program args..` and return its stdout (lossy UTF-8).
    ///
    /// A missing binary, a non-zero exit and the timeout are all errors.
    pub async fn run(&self, program: &str, args: &[&str]) -> Result<String, ProbeError> {
        trace!(program, ?args, "running command");

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| ProbeError::ToolTimeout {
                program: program.to_owned(),
                timeout: self.timeout,
            })?
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => ProbeError::ToolMissing {
                    program: program.to_owned(),
                },
                _ => ProbeError::Io {
                    program: program.to_owned(),
                    source: e,
                },
            })?;

        if !output.status.success() {
            return Err(ProbeError::ToolFailed {
                program: program.to_owned(),
                status: output.status.to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
