//! Bounded execution of the external HTML-to-PDF program.
//!
//! The child gets no stdin. Its stdout and stderr are read concurrently so
//! neither pipe can fill up and stall it, and each is capped. On timeout the
//! child is killed and reaped before the error is returned.

use std::io;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

/// Default cap on captured stdout.
pub const DEFAULT_MAX_OUTPUT: usize = 64 * 1024 * 1024;

const STDERR_LIMIT: usize = 16 * 1024;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("cannot start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} timed out after {} ms", timeout.as_millis())]
    TimedOut { program: String, timeout: Duration },

    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("{program} wrote more than {limit} bytes")]
    OutputTooLarge { program: String, limit: usize },

    #[error("I/O error while running {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// Runs one program to completion under a time limit and an output cap.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    timeout: Duration,
    max_output: usize,
}

struct Captured {
    bytes: Vec<u8>,
    truncated: bool,
}

impl CommandExecutor {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            max_output: DEFAULT_MAX_OUTPUT,
        }
    }

    pub fn with_max_output(mut self, max_output: usize) -> Self {
        self.max_output = max_output;
        self
    }

    /// Run `program` and return its stdout.
    pub async fn run(
        &self,
        program: &str,
        args: &[String],
        working_dir: Option<&Path>,
    ) -> Result<Vec<u8>, ExecError> {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = working_dir {
            cmd.current_dir(dir);
        }

        tracing::debug!(
            program = %program,
            args = ?args,
            timeout_ms = self.timeout.as_millis() as u64,
            max_output = self.max_output,
            "Starting compositor process"
        );

        let mut child = cmd.spawn().map_err(|source| ExecError::Spawn {
            program: program.to_string(),
            source,
        })?;

        let io_error = |source: io::Error| ExecError::Io {
            program: program.to_string(),
            source,
        };
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io_error(io::Error::new(io::ErrorKind::Other, "stdout not piped")))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| io_error(io::Error::new(io::ErrorKind::Other, "stderr not piped")))?;

        let finished = tokio::time::timeout(self.timeout, async {
            tokio::try_join!(
                read_capped(stdout, self.max_output),
                read_capped(stderr, STDERR_LIMIT),
                child.wait(),
            )
        })
        .await;

        let (out, err, status) = match finished {
            Ok(result) => result.map_err(io_error)?,
            Err(_) => {
                if let Err(e) = child.kill().await {
                    tracing::warn!(program = %program, error = %e, "Could not kill timed-out process");
                }
                tracing::error!(
                    program = %program,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Compositor process timed out"
                );
                return Err(ExecError::TimedOut {
                    program: program.to_string(),
                    timeout: self.timeout,
                });
            }
        };

        if !status.success() {
            let stderr = String::from_utf8_lossy(&err.bytes).trim().to_string();
            tracing::error!(program = %program, status = %status, stderr = %stderr, "Compositor process failed");
            return Err(ExecError::Failed {
                program: program.to_string(),
                status,
                stderr,
            });
        }

        if out.truncated {
            tracing::error!(program = %program, limit = self.max_output, "Compositor output exceeded limit");
            return Err(ExecError::OutputTooLarge {
                program: program.to_string(),
                limit: self.max_output,
            });
        }

        tracing::debug!(program = %program, output_size = out.bytes.len(), "Compositor process finished");
        Ok(out.bytes)
    }
}

/// Keep at most `limit` bytes and drain the rest so the writer never blocks.
async fn read_capped<R: AsyncRead + Unpin>(reader: R, limit: usize) -> io::Result<Captured> {
    let mut bytes = Vec::new();
    let mut head = reader.take(limit as u64);
    head.read_to_end(&mut bytes).await?;
    let excess = tokio::io::copy(&mut head.into_inner(), &mut tokio::io::sink()).await?;
    Ok(Captured {
        bytes,
        truncated: excess > 0,
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn returns_stdout() {
        let executor = CommandExecutor::new(Duration::from_secs(5));
        let out = executor.run("echo", &args(&["hello"]), None).await.unwrap();
        assert_eq!(String::from_utf8_lossy(&out).trim(), "hello");
    }

    #[tokio::test]
    async fn non_zero_exit_carries_stderr() {
        let executor = CommandExecutor::new(Duration::from_secs(5));
        let err = executor
            .run("sh", &args(&["-c", "echo boom >&2; exit 3"]), None)
            .await
            .unwrap_err();

        match err {
            ExecError::Failed { status, stderr, .. } => {
                assert_eq!(status.code(), Some(3));
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_program_is_killed_on_timeout() {
        let executor = CommandExecutor::new(Duration::from_millis(100));
        let started = std::time::Instant::now();
        let err = executor.run("sleep", &args(&["5"]), None).await.unwrap_err();

        assert!(matches!(err, ExecError::TimedOut { .. }));
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn oversized_output_is_refused() {
        let executor = CommandExecutor::new(Duration::from_secs(5)).with_max_output(100);
        let err = executor
            .run("sh", &args(&["-c", "printf '%0200d' 0"]), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::OutputTooLarge { limit: 100, .. }));
    }

    #[tokio::test]
    async fn noisy_stderr_does_not_stall_the_process() {
        let executor = CommandExecutor::new(Duration::from_secs(5));
        let out = executor
            .run(
                "sh",
                &args(&["-c", "head -c 200000 /dev/zero >&2; echo done"]),
                None,
            )
            .await
            .unwrap();
        assert_eq!(String::from_utf8_lossy(&out).trim(), "done");
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let executor = CommandExecutor::new(Duration::from_secs(5));
        let err = executor
            .run("definitely-not-a-real-program", &[], None)
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Spawn { .. }));
    }
}
