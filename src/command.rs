use std::path::Path;
use std::process::{Command, Stdio};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("command failed: {command}: {message}")]
    Failed { command: String, message: String },
    #[error("command io error: {command}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// Runs `command args...` and returns its stdout, failing on a non-zero exit
/// status or empty output.
pub(crate) fn run_command_output(command: &str, args: &[String]) -> Result<String, CommandError> {
    let output = Command::new(command)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|err| CommandError::Io {
            command: command.to_string(),
            source: err,
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if !output.status.success() {
        let message = format!("exit status: {}; stderr: {}", output.status, stderr.trim());
        return Err(CommandError::Failed {
            command: command.to_string(),
            message,
        });
    }

    if stdout.trim().is_empty() {
        return Err(CommandError::Failed {
            command: command.to_string(),
            message: "command produced no stdout output".to_string(),
        });
    }

    Ok(stdout)
}

/// Runs `command args... output` and only checks the exit status.
pub(crate) fn run_command_status(
    command: &str,
    args: &[String],
    output: &Path,
) -> Result<(), CommandError> {
    let result = Command::new(command)
        .args(args)
        .arg(output)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .map_err(|err| CommandError::Io {
            command: command.to_string(),
            source: err,
        })?;

    if result.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&result.stderr);
        Err(CommandError::Failed {
            command: command.to_string(),
            message: format!(
                "command exited with status: {}; stderr: {}",
                result.status,
                stderr.trim()
            ),
        })
    }
}
