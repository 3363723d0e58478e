//! Command execution primitives with consistent error handling.
//!
//! Every external tool invocation in the crate flows through [`Runner`].
//! Execution is direct (no shell); one command is spawned and fully
//! awaited before the next begins.

use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::error::{CommandFailedDetails, Error, Result};

/// How often the runner polls the child process and the cancellation flag.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Cooperative cancellation handle, created once at the CLI entry point
/// and passed down to every spawn. Clones share the underlying flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// External command execution.
///
/// The one seam orchestrators are mocked through in tests; production
/// code always uses [`ProcessRunner`].
pub trait Runner {
    /// Run `program` with `args` in `dir`, applying `env` overrides to the
    /// spawned process only (the ambient environment is never touched).
    ///
    /// On exit status 0, returns stdout with leading and trailing newline
    /// characters trimmed; stderr is discarded. On a non-zero exit, the
    /// error message combines the exit description with trimmed stderr.
    /// Cancelling `ctx` terminates an in-flight process and returns
    /// promptly; a token cancelled up front prevents the spawn entirely.
    fn run(
        &self,
        ctx: &CancelToken,
        dir: &Path,
        program: &str,
        args: &[&str],
        env: Option<&[(&str, &str)]>,
    ) -> Result<String>;
}

/// Spawns real processes via `std::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl Runner for ProcessRunner {
    fn run(
        &self,
        ctx: &CancelToken,
        dir: &Path,
        program: &str,
        args: &[&str],
        env: Option<&[(&str, &str)]>,
    ) -> Result<String> {
        if ctx.is_cancelled() {
            return Err(Error::command_cancelled(render_command(program, args)));
        }

        let mut cmd = Command::new(program);
        cmd.args(args)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(pairs) = env {
            cmd.envs(pairs.iter().copied());
        }

        let mut child = cmd.spawn().map_err(|e| {
            Error::command_spawn_failed(render_command(program, args), e.to_string())
        })?;

        let (Some(out_pipe), Some(err_pipe)) = (child.stdout.take(), child.stderr.take()) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(Error::internal_unexpected(format!(
                "failed to acquire output pipes for {}",
                render_command(program, args)
            )));
        };

        // Drain both pipes off-thread so a chatty child never blocks on a
        // full pipe buffer while the parent is polling.
        let out_reader = spawn_reader(out_pipe);
        let err_reader = spawn_reader(err_pipe);

        let status = loop {
            let polled = child.try_wait().map_err(|e| {
                Error::internal_io(
                    e.to_string(),
                    Some(format!("wait for {}", render_command(program, args))),
                )
            })?;

            if let Some(status) = polled {
                break status;
            }

            if ctx.is_cancelled() {
                let _ = child.kill();
                let _ = child.wait();
                let _ = out_reader.join();
                let _ = err_reader.join();
                return Err(Error::command_cancelled(render_command(program, args)));
            }

            thread::sleep(POLL_INTERVAL);
        };

        let stdout = join_reader(out_reader);
        let stderr = join_reader(err_reader);

        if status.success() {
            return Ok(trim_newlines(&stdout).to_string());
        }

        Err(Error::command_failed(
            status.to_string(),
            CommandFailedDetails {
                command: render_command(program, args),
                exit_code: status.code().unwrap_or(-1),
                stdout,
                stderr,
            },
        ))
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn join_reader(handle: JoinHandle<Vec<u8>>) -> String {
    let bytes = handle.join().unwrap_or_default();
    String::from_utf8_lossy(&bytes).to_string()
}

/// Trim leading and trailing newline characters only; interior content and
/// trailing spaces are preserved.
pub fn trim_newlines(s: &str) -> &str {
    s.trim_matches(|c| c == '\n' || c == '\r')
}

fn render_command(program: &str, args: &[&str]) -> String {
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args.join(" "))
    }
}
