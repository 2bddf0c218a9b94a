//! External command execution with a hard timeout.

use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::error::{Error, Result};

/// Captured output of a finished command.
#[derive(Debug, Clone)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Replaces `{key}` placeholders in every argument.
pub fn expand_args(args: &[String], vars: &HashMap<&str, String>) -> Vec<String> {
    args.iter()
        .map(|arg| {
            vars.iter().fold(arg.clone(), |acc, (key, value)| {
                acc.replace(&format!("{{{key}}}"), value)
            })
        })
        .collect()
}

/// Runs `program args...`, failing on spawn errors, nonzero exit or timeout.
///
/// The child is killed if the timeout elapses.
pub async fn run(program: &str, args: &[String], timeout: Duration) -> Result<ExecOutput> {
    tracing::debug!(program, ?args, "Executing command");

    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| Error::tool(program, format!("could not start: {e}")))?;

    let output = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| Error::tool(program, format!("timed out after {timeout:?}")))?
        .map_err(|e| Error::tool(program, format!("could not collect output: {e}")))?;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

    if !output.status.success() {
        let code = output
            .status
            .code()
            .map_or_else(|| "signal".to_string(), |c| c.to_string());
        tracing::warn!(program, exit_code = %code, stderr = %stderr, "Command failed");
        return Err(Error::tool(
            program,
            format!("exited with status {code}: {stderr}"),
        ));
    }

    tracing::trace!(program, "Command succeeded");
    Ok(ExecOutput { stdout, stderr })
}
