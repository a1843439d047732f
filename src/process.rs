#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    ffi::{OsStr, OsString},
    path::Path,
    process::{ExitStatus, Stdio},
    time::Duration,
};

use anyhow::{Context, Result};
use tokio::{
    io::{AsyncRead, AsyncReadExt, BufReader},
    process::{Child, Command},
    task::JoinHandle,
    time::timeout,
};
use tracing::debug;

/// Drop guard that terminates a spawned child process if the future driving
/// it is dropped before the child exits.
struct ChildDropGuard(Option<Child>);

impl ChildDropGuard {
    /// Wraps the provided child process with the drop guard.
    fn new(child: Child) -> Self {
        Self(Some(child))
    }

    /// Returns a mutable reference to the underlying child process.
    fn child_mut(&mut self) -> Result<&mut Child> {
        self.0
            .as_mut()
            .context("child process already taken from guard")
    }

    /// Prevents the guard from killing the process on drop.
    fn disarm(mut self) {
        self.0 = None;
    }
}

impl Drop for ChildDropGuard {
    fn drop(&mut self) {
        if let Some(child) = self.0.as_mut() {
            let _ = child.start_kill();
        }
    }
}

/// Captured result of a finished subprocess.
#[derive(Debug)]
pub struct Collected {
    /// Exit status returned by the process.
    pub status: ExitStatus,
    /// Contents written to stdout.
    pub stdout: Vec<u8>,
    /// Contents written to stderr.
    pub stderr: Vec<u8>,
}

impl Collected {
    /// Exit code, or `-1` when the process was ended by a signal.
    pub fn exit_code(&self) -> i32 {
        self.status.code().unwrap_or(-1)
    }
}

/// How a subprocess run ended.
#[derive(Debug)]
pub enum Outcome {
    /// The process exited on its own.
    Finished(Collected),
    /// The deadline elapsed first; the process was killed.
    TimedOut,
}

/// Reads a child pipe to the end on its own task.
fn drain<R>(pipe: R, label: &'static str) -> JoinHandle<Result<Vec<u8>>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(pipe);
        let mut buf = Vec::new();
        reader
            .read_to_end(&mut buf)
            .await
            .with_context(|| format!("failed to read {label}"))?;
        Ok(buf)
    })
}

/// Spawns `program` with `args` and no stdin, collects stdout and stderr, and
/// waits for it to exit.
///
/// With a `deadline`, a process still running when it elapses is killed and
/// [`Outcome::TimedOut`] is returned; nothing it printed is kept.
pub async fn run_collect(
    program: impl AsRef<OsStr>,
    args: &[OsString],
    cwd: Option<&Path>,
    deadline: Option<Duration>,
) -> Result<Outcome> {
    let mut cmd = Command::new(program.as_ref());
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    let child = cmd
        .spawn()
        .with_context(|| format!("failed to spawn {}", program.as_ref().to_string_lossy()))?;
    let mut guard = ChildDropGuard::new(child);

    let stdout = guard
        .child_mut()?
        .stdout
        .take()
        .context("missing stdout pipe")?;
    let stderr = guard
        .child_mut()?
        .stderr
        .take()
        .context("missing stderr pipe")?;

    let out_task = drain(stdout, "stdout");
    let err_task = drain(stderr, "stderr");

    let out_abort = out_task.abort_handle();
    let err_abort = err_task.abort_handle();

    // Covers the drains too: a backgrounded grandchild can hold the pipes open
    // after the child itself has exited.
    let wait_future = async move {
        let mut guard = guard;
        let status = guard
            .child_mut()?
            .wait()
            .await
            .context("failed to wait on process")?;
        let stdout = out_task.await.context("stdout task join error")??;
        let stderr = err_task.await.context("stderr task join error")??;
        guard.disarm();
        Ok::<Collected, anyhow::Error>(Collected {
            status,
            stdout,
            stderr,
        })
    };

    match deadline {
        Some(limit) => match timeout(limit, wait_future).await {
            Ok(collected) => collected.map(Outcome::Finished),
            Err(_) => {
                // dropping the future dropped the guard, which kills the child
                debug!("process exceeded {:?}; killing it", limit);
                out_abort.abort();
                err_abort.abort();
                Ok(Outcome::TimedOut)
            }
        },
        None => wait_future.await.map(Outcome::Finished),
    }
}
