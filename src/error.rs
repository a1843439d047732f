#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::path::PathBuf;

/// Errors raised while classifying, compiling, or reporting on submissions.
///
/// Only [`GradeError::InputDirectory`], [`GradeError::UnknownCompilerFamily`]
/// and [`GradeError::ToolchainMissing`] stop a batch; every other variant is
/// local to one file or one student and is logged by the caller.
#[derive(thiserror::Error, Debug)]
pub enum GradeError {
    /// The batch input directory does not exist or cannot be listed.
    #[error("input directory {path} is missing or unreadable")]
    InputDirectory {
        /// directory that was requested
        path:   PathBuf,
        /// underlying I/O error
        #[source]
        source: std::io::Error,
    },
    /// A compiler family name that is neither `gnu` nor `clang`.
    #[error("unknown compiler family `{0}` (expected `gnu` or `clang`)")]
    UnknownCompilerFamily(String),
    /// The compiler program for a source language is not on PATH.
    #[error("cannot find `{program}` on PATH")]
    ToolchainMissing {
        /// program name that was looked up
        program: String,
    },
    /// A compilation unit was requested for a path that is not a file.
    #[error("{0} is not a file")]
    MissingSource(PathBuf),
    /// A source file whose extension has no toolchain.
    #[error("{0} is not a .c or .cpp file")]
    UnsupportedSource(PathBuf),
    /// Bytes that are not valid UTF-8 where text was expected.
    #[error("{path} contains text that is not valid UTF-8")]
    UndecodableText {
        /// file the bytes came from
        path: PathBuf,
    },
    /// Flattening found a top-level file with the same name.
    #[error("a file named {name} already exists in {dir}")]
    FilenameCollision {
        /// colliding file name
        name: String,
        /// directory that already holds the name
        dir:  PathBuf,
    },
    /// Any other I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
