//! External command execution with a bounded wait.

use crate::error::ProcessError;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

/// Default time an external command may run.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Resolve `name` on `PATH`.
pub fn find_program(name: &str) -> Result<PathBuf, ProcessError> {
    which::which(name).map_err(|_| ProcessError::NotFound(name.to_string()))
}

/// Run `program` with `args` and return its trimmed standard output.
///
/// The child is killed if it outlives `limit`.
///
/// # Errors
///
/// - [`ProcessError::Timeout`] if the command takes longer than `limit`
/// - [`ProcessError::PermissionDenied`] if it cannot be executed
/// - [`ProcessError::Io`] for other spawn failures
/// - [`ProcessError::Failed`] on a non-zero exit status
/// - [`ProcessError::NotUtf8`] if the output is not valid UTF-8
pub async fn run(program: &Path, args: &[&str], limit: Duration) -> Result<String, ProcessError> {
    let mut command = Command::new(program);
    command.args(args).kill_on_drop(true);

    let output = timeout(limit, command.output())
        .await
        .map_err(|_| ProcessError::Timeout(limit.as_millis() as u64))?
        .map_err(|e| {
            if e.kind() == io::ErrorKind::PermissionDenied {
                ProcessError::PermissionDenied
            } else {
                ProcessError::Io(e.to_string())
            }
        })?;

    if !output.status.success() {
        debug!(program = %program.display(), status = %output.status, "command failed");
        return Err(ProcessError::Failed {
            code: output.status.code(),
        });
    }

    let text = String::from_utf8(output.stdout).map_err(|_| ProcessError::NotUtf8)?;
    Ok(text.trim_end().to_string())
}

/// Run `future` to completion on a fresh current-thread runtime.
///
/// # Errors
///
/// Fails only if the runtime cannot be built.
pub fn block_on<F: Future>(future: F) -> io::Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    Ok(runtime.block_on(future))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_captures_stdout() {
        let Ok(sh) = find_program("sh") else {
            return;
        };
        let output = run(&sh, &["-c", "echo hello"], DEFAULT_TIMEOUT).await;
        assert_eq!(output, Ok("hello".to_string()));
    }

    #[tokio::test]
    async fn test_run_reports_exit_status() {
        let Ok(sh) = find_program("sh") else {
            return;
        };
        let output = run(&sh, &["-c", "exit 3"], DEFAULT_TIMEOUT).await;
        assert_eq!(output, Err(ProcessError::Failed { code: Some(3) }));
    }

    #[tokio::test]
    async fn test_run_times_out() {
        let Ok(sh) = find_program("sh") else {
            return;
        };
        let output = run(&sh, &["-c", "sleep 5"], Duration::from_millis(100)).await;
        assert_eq!(output, Err(ProcessError::Timeout(100)));
    }

    #[tokio::test]
    async fn test_run_nonexistent() {
        let output = run(
            Path::new("/nonexistent/path/to/executable"),
            &[],
            DEFAULT_TIMEOUT,
        )
        .await;
        assert!(matches!(output, Err(ProcessError::Io(_))));
    }

    #[test]
    fn test_find_program_missing() {
        assert_eq!(
            find_program("definitely_not_a_real_executable_12345"),
            Err(ProcessError::NotFound(
                "definitely_not_a_real_executable_12345".to_string()
            ))
        );
    }

    #[test]
    fn test_block_on() {
        assert_eq!(block_on(async { 1 + 1 }).unwrap(), 2);
    }
}
