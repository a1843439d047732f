#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    fmt::{self, Display},
    fs,
    path::Path,
    sync::LazyLock,
};

use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;

use crate::constants::{ID_PATTERN, NAME_PATTERN, UNRESOLVED_ID};

/// Compiled form of [`ID_PATTERN`].
static ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(ID_PATTERN).expect("student id pattern is valid"));

/// Compiled form of [`NAME_PATTERN`].
static NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(NAME_PATTERN).expect("student name pattern is valid"));

/// The student a file belongs to, as derived from its name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Identifier {
    /// A two-letter, five-digit student id such as `ab12345`.
    Student(String),
    /// Shared bucket for files without a recognizable id.
    Unresolved,
}

impl Identifier {
    /// Returns the id as it appears in directory and report names.
    pub fn as_str(&self) -> &str {
        match self {
            Identifier::Student(id) => id,
            Identifier::Unresolved => UNRESOLVED_ID,
        }
    }

    /// True for the shared bucket of files without an id.
    pub fn is_unresolved(&self) -> bool {
        matches!(self, Identifier::Unresolved)
    }
}

impl Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Finds the student id in the base name of `path`.
///
/// Returns the first match, or [`Identifier::Unresolved`] when the name
/// contains none.
pub fn resolve(path: &Path) -> Identifier {
    let base = path
        .file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default();

    match ID_REGEX.find(&base) {
        Some(m) => Identifier::Student(m.as_str().to_string()),
        None => Identifier::Unresolved,
    }
}

/// First and last name of a student, both empty when unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DisplayName {
    /// given name
    pub first: String,
    /// family name
    pub last:  String,
}

impl DisplayName {
    /// Builds a name from its two parts.
    pub fn new(first: impl Into<String>, last: impl Into<String>) -> Self {
        Self {
            first: first.into(),
            last:  last.into(),
        }
    }

    /// True when neither part is known.
    pub fn is_empty(&self) -> bool {
        self.first.is_empty() && self.last.is_empty()
    }
}

impl Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.first, self.last)
    }
}

/// Pulls a "First Last" pair out of a greeting line such as
/// `Jane Doe has submitted...`.
pub fn parse_name(line: &str) -> DisplayName {
    match NAME_REGEX.captures(line) {
        Some(caps) => DisplayName::new(&caps[1], &caps[2]),
        None => DisplayName::default(),
    }
}

/// Reads the first line of a cover file and parses the student's name from
/// it.
pub fn read_name(cover: &Path) -> Result<DisplayName> {
    let bytes = fs::read(cover).with_context(|| format!("Could not read {}", cover.display()))?;
    let text = String::from_utf8_lossy(&bytes);
    Ok(parse_name(text.lines().next().unwrap_or_default()))
}
