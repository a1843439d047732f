use std::fs;

use anyhow::{Context, Result};
use async_trait::async_trait;
use bon::Builder;

use super::{FeedbackStep, Report};
use crate::{code_file::CodeFile, error::GradeError};

#[derive(Debug, Clone, Builder)]
/// Echoes the unit's source code under a header naming the file.
pub struct SourceEcho {
    /// prefix each line with its 1-based number
    #[builder(default = true)]
    line_numbers: bool,
    /// width of the header rule; sized to the file name when unset
    width:        Option<usize>,
}

impl Default for SourceEcho {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl SourceEcho {
    /// Renders `source` as it appears in the report.
    pub fn format_source(&self, source: &str) -> String {
        if !self.line_numbers {
            return source.to_string();
        }

        source
            .split_inclusive('\n')
            .enumerate()
            .map(|(n, line)| format!("{:<3} {line}", n + 1))
            .collect()
    }
}

#[async_trait]
impl FeedbackStep for SourceEcho {
    fn name(&self) -> &str {
        "source listing"
    }

    async fn render(&self, report: &mut Report, unit: &mut CodeFile) -> Result<()> {
        report.push_header(&unit.file_name(), self.width);

        let bytes = fs::read(unit.source())
            .with_context(|| format!("Could not read {}", unit.source().display()))?;
        let source = String::from_utf8(bytes).map_err(|_| GradeError::UndecodableText {
            path: unit.source().to_path_buf(),
        })?;

        report.push_str(&self.format_source(&source));
        Ok(())
    }
}
