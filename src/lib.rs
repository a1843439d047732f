//! # gradebook
//!
//! Batch grader for C and C++ homework. Sorts a directory of submitted files
//! by student id, unpacks archives, compiles and runs every source file, and
//! writes one plain-text feedback report per student.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Unpacking zip, rar and 7z submissions
pub mod archive;
/// One source file's compile and run lifecycle
pub mod code_file;
/// Compiler families, flag profiles and invocation
pub mod compiler;
/// Batch settings from the environment and command line
pub mod config;
/// A module defining a bunch of constant values to be used throughout
pub mod constants;
/// Error types
pub mod error;
/// Running compiled programs under a time limit
pub mod executor;
/// Report sections and the pipeline that writes them
pub mod feedback;
/// Driving a whole batch from intake to reports
pub mod gradebook;
/// Student ids and names from file contents and names
pub mod identity;
/// Spawning subprocesses and collecting their output
pub mod process;
/// Per-student intake, working directories and flattening
pub mod student;
/// Utility functions for convenience
pub mod util;

pub use code_file::CodeFile;
pub use compiler::{Compile, Compiler, CompilerFamily, CompilerProfile};
pub use config::GraderConfig;
pub use executor::{Execute, Execution, Executor};
pub use gradebook::{GradeBook, StudentSummary};
pub use identity::{DisplayName, Identifier};
pub use student::Student;
