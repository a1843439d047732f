#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use glob::glob;
use tracing::{debug, warn};
use which::which;

use crate::error::GradeError;

/// Finds and returns the path to `program` on PATH.
pub fn program_path(program: &str) -> Result<OsString, GradeError> {
    which(program)
        .map(PathBuf::into_os_string)
        .map_err(|_| GradeError::ToolchainMissing {
            program: program.to_string(),
        })
}

/// Escapes glob metacharacters in a directory so it can prefix a pattern.
fn glob_root(root_dir: &Path) -> Result<String> {
    let root = root_dir
        .to_str()
        .context("Could not convert root_dir to string")?;
    Ok(glob::Pattern::escape(root))
}

/// A glob utility function to find paths to files with certain suffix
///
/// * `suffix`: file suffix including the dot, e.g. `.c`; empty matches all
/// * `recursive`: search the whole tree instead of only the top level
/// * `root_dir`: the root directory where search starts
///
/// Results come back in lexical order.
pub fn find_files(suffix: &str, recursive: bool, root_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut pattern = PathBuf::from(glob_root(root_dir)?);
    if recursive {
        pattern.push("**");
    }
    pattern.push(format!("*{}", glob::Pattern::escape(suffix)));

    let pattern = pattern
        .to_str()
        .context("Could not convert pattern to string")?
        .to_string();

    Ok(glob(&pattern)
        .context("Could not create glob")?
        .filter_map(Result::ok)
        .filter(|p| p.is_file())
        .collect())
}

/// Returns the suffix of a file name in `.ext` form, if it has one made of
/// letters only.
pub fn suffix_of(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?;
    if ext.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(format!(".{ext}"))
    } else {
        None
    }
}

/// Replaces every whitespace character in `name` with an underscore.
pub fn underscore_whitespace(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

/// Renames every file directly inside `dir` so that its name contains no
/// whitespace.
///
/// A rename that would replace an existing file is skipped with a warning.
/// Returns the number of files renamed.
pub fn normalize_file_names(dir: &Path) -> Result<usize> {
    let mut renamed = 0;
    let entries = fs::read_dir(dir).with_context(|| format!("Could not list {}", dir.display()))?;

    for entry in entries {
        let entry = entry.with_context(|| format!("Could not list {}", dir.display()))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().to_string();
        let normalized = underscore_whitespace(&name);
        if normalized == name {
            continue;
        }

        let target = dir.join(&normalized);
        if target.exists() {
            warn!("Not renaming {name}: {normalized} already exists");
            continue;
        }

        fs::rename(&path, &target)
            .with_context(|| format!("Could not rename {} to {}", path.display(), normalized))?;
        debug!("Renamed {name} to {normalized}");
        renamed += 1;
    }

    Ok(renamed)
}
