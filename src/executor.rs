#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{fs, path::Path, time::Duration};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::{
    constants::{COULD_NOT_RUN, DEFAULT_TIMEOUT_SECS, timed_out_message},
    process::{Outcome, run_collect},
};

/// How one run of a compiled program ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Execution {
    /// Exited with status zero; stdout is kept verbatim.
    Completed(String),
    /// Exited non-zero (or could not start); its output is discarded.
    Crashed {
        /// exit code, `-1` when killed by a signal or never started
        exit_code: i32,
    },
    /// Still running when the time budget ran out.
    TimedOut {
        /// the budget that was exceeded
        seconds: u64,
    },
}

impl Execution {
    /// The text a report shows for this run: the program's output, or a
    /// sentinel sentence when it crashed or timed out.
    pub fn text(&self) -> String {
        match self {
            Execution::Completed(output) => output.clone(),
            Execution::Crashed { .. } => COULD_NOT_RUN.to_string(),
            Execution::TimedOut { seconds } => timed_out_message(*seconds),
        }
    }

    /// True when the program exited normally.
    pub fn completed(&self) -> bool {
        matches!(self, Execution::Completed(_))
    }
}

/// Anything that can run a compiled program.
#[async_trait]
pub trait Execute: Send + Sync {
    /// Runs `executable` with no arguments and no input.
    async fn execute(&self, executable: &Path) -> Execution;
}

/// Runs executables as child processes under a wall-clock timeout.
#[derive(Debug, Clone, Copy)]
pub struct Executor {
    /// seconds a program may run before it is killed
    timeout_secs: u64,
}

impl Default for Executor {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT_SECS)
    }
}

impl Executor {
    /// Creates an executor that kills programs after `timeout_secs`.
    pub fn new(timeout_secs: u64) -> Self {
        Self { timeout_secs }
    }

    /// Returns the configured timeout in seconds.
    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }
}

#[async_trait]
impl Execute for Executor {
    async fn execute(&self, executable: &Path) -> Execution {
        let deadline = Duration::from_secs(self.timeout_secs);
        // An absolute path keeps the program from being looked up on PATH.
        let program = fs::canonicalize(executable).unwrap_or_else(|_| executable.to_path_buf());
        // Programs run from their own directory so they can open data files
        // that sit next to them.
        let cwd = program.parent().filter(|p| !p.as_os_str().is_empty());

        match run_collect(&program, &[], cwd, Some(deadline)).await {
            Ok(Outcome::Finished(out)) if out.status.success() => {
                let text = match String::from_utf8(out.stdout) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("Output of {} is not valid UTF-8", executable.display());
                        String::from_utf8_lossy(e.as_bytes()).into_owned()
                    }
                };
                Execution::Completed(text)
            }
            Ok(Outcome::Finished(out)) => {
                debug!(
                    "{} exited with code {}: {}",
                    executable.display(),
                    out.exit_code(),
                    String::from_utf8_lossy(&out.stderr)
                );
                Execution::Crashed {
                    exit_code: out.exit_code(),
                }
            }
            Ok(Outcome::TimedOut) => {
                warn!("{} timed out after {}s", executable.display(), self.timeout_secs);
                Execution::TimedOut {
                    seconds: self.timeout_secs,
                }
            }
            Err(e) => {
                warn!("Could not run {}: {e:#}", executable.display());
                Execution::Crashed { exit_code: -1 }
            }
        }
    }
}
