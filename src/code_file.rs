#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{
    compiler::Compile,
    constants::{DID_NOT_COMPILE, EXECUTABLE_EXTENSION},
    error::GradeError,
    executor::{Execute, Execution},
};

/// Where a unit stands with the compiler.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CompileStatus {
    /// `compile` has not been called yet.
    #[default]
    Unattempted,
    /// An executable was produced; warnings, if any, are kept.
    Succeeded {
        /// compiler stderr
        diagnostics: String,
    },
    /// The compiler exited non-zero.
    Failed {
        /// compiler exit code
        exit_code:   i32,
        /// compiler stderr
        diagnostics: String,
    },
}

/// Where a unit stands with the executor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RunState {
    /// Output has not been requested yet.
    #[default]
    NotRun,
    /// The program was run once; this is the remembered result.
    Ran(Execution),
    /// Running was not attempted.
    Skipped(String),
}

/// One student source file and everything learned about it while grading.
///
/// The unit moves one way only: it is compiled at most once, and run at most
/// once after a successful compile. Later requests for output return the
/// remembered result.
#[derive(Debug, Clone)]
pub struct CodeFile {
    /// path to the source file
    source:     PathBuf,
    /// path the compiler writes the executable to
    executable: PathBuf,
    /// compile progress
    status:     CompileStatus,
    /// run progress
    run:        RunState,
}

impl CodeFile {
    /// Creates a unit for the source file at `source`.
    ///
    /// Fails with [`GradeError::MissingSource`] when `source` is not an
    /// existing file.
    pub fn new(source: impl Into<PathBuf>) -> Result<Self, GradeError> {
        let source = source.into();
        if !source.is_file() {
            return Err(GradeError::MissingSource(source));
        }

        let executable = Self::executable_for(&source);
        Ok(Self {
            source,
            executable,
            status: CompileStatus::Unattempted,
            run: RunState::NotRun,
        })
    }

    /// Executable path for a source path: same directory and stem, `.out`
    /// extension.
    pub fn executable_for(source: &Path) -> PathBuf {
        source.with_extension(EXECUTABLE_EXTENSION)
    }

    /// Compiles the source with `compiler`, once.
    ///
    /// Calling this again after a compile has happened leaves the recorded
    /// status unchanged.
    pub async fn compile(&mut self, compiler: &dyn Compile) -> &CompileStatus {
        if self.status != CompileStatus::Unattempted {
            debug!("{} is already compiled", self.source.display());
            return &self.status;
        }

        let out = compiler.compile(&self.source, &self.executable).await;
        self.status = if out.exit_code == 0 {
            CompileStatus::Succeeded {
                diagnostics: out.diagnostics,
            }
        } else {
            CompileStatus::Failed {
                exit_code:   out.exit_code,
                diagnostics: out.diagnostics,
            }
        };
        &self.status
    }

    /// Returns the program's output, running it with `executor` on the first
    /// call only.
    ///
    /// Units that failed to compile answer [`DID_NOT_COMPILE`] and are never
    /// run. Once a result is remembered it is returned as is, whichever
    /// executor is passed later.
    pub async fn get_output(&mut self, executor: &dyn Execute) -> String {
        match &self.run {
            RunState::Ran(execution) => return execution.text(),
            RunState::Skipped(reason) => return reason.clone(),
            RunState::NotRun => {}
        }

        match self.status {
            CompileStatus::Succeeded { .. } => {
                let execution = executor.execute(&self.executable).await;
                let text = execution.text();
                self.run = RunState::Ran(execution);
                text
            }
            CompileStatus::Failed { .. } => {
                self.run = RunState::Skipped(DID_NOT_COMPILE.to_string());
                DID_NOT_COMPILE.to_string()
            }
            // A later compile may still succeed, so nothing is remembered.
            CompileStatus::Unattempted => DID_NOT_COMPILE.to_string(),
        }
    }

    /// The remembered run result, if the program has been run.
    pub fn execution(&self) -> Option<&Execution> {
        match &self.run {
            RunState::Ran(execution) => Some(execution),
            _ => None,
        }
    }

    /// Returns the run progress.
    pub fn run_state(&self) -> &RunState {
        &self.run
    }

    /// Returns the compile progress.
    pub fn status(&self) -> &CompileStatus {
        &self.status
    }

    /// True once the compiler has produced an executable.
    pub fn compiled(&self) -> bool {
        matches!(self.status, CompileStatus::Succeeded { .. })
    }

    /// Compiler exit code, if `compile` has run.
    pub fn exit_code(&self) -> Option<i32> {
        match &self.status {
            CompileStatus::Unattempted => None,
            CompileStatus::Succeeded { .. } => Some(0),
            CompileStatus::Failed { exit_code, .. } => Some(*exit_code),
        }
    }

    /// Compiler stderr; empty before compiling.
    pub fn diagnostics(&self) -> &str {
        match &self.status {
            CompileStatus::Unattempted => "",
            CompileStatus::Succeeded { diagnostics } => diagnostics,
            CompileStatus::Failed { diagnostics, .. } => diagnostics,
        }
    }

    /// Returns the source path.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Returns the executable path.
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Base name of the source file.
    pub fn file_name(&self) -> String {
        self.source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}
