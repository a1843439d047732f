use std::{fmt, fs, path::Path};

use anyhow::{Context, Result};

use super::make_header;
use crate::identity::{DisplayName, Identifier};

/// Text of one student's report, built in memory and written in one go.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    /// everything written so far
    text: String,
}

impl Report {
    /// Creates an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a report that opens with the student banner and a note on
    /// what the report contains.
    pub fn for_student(name: &DisplayName, id: &Identifier) -> Self {
        let mut report = Self::new();
        report.push_str(&format!(
            "*** homework for {} {} ({}) ***\n\n",
            name.first, name.last, id
        ));
        report.push_str(
            "\nThis report contains all code you submitted, warnings and errors from the \
             compiler (if any), program output (if your code compiled), followed by \
             feedback.\n\n",
        );
        report
    }

    /// Appends raw text.
    pub fn push_str(&mut self, text: &str) {
        self.text.push_str(text);
    }

    /// Appends a framed header; see [`make_header`].
    pub fn push_header(&mut self, header_text: &str, size: Option<usize>) {
        self.text.push_str(&make_header(header_text, size));
    }

    /// Returns the report text.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Writes the report to `path`, replacing any previous file.
    pub fn persist(&self, path: &Path) -> Result<()> {
        fs::write(path, self.text.as_bytes())
            .with_context(|| format!("Could not write report {}", path.display()))
    }
}

impl fmt::Write for Report {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.text.push_str(s);
        Ok(())
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
