use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use bon::Builder;
use itertools::Itertools;

use super::{FeedbackStep, Report};
use crate::{
    code_file::CodeFile,
    constants::{DEFAULT_LINE_LENGTH, DEFAULT_LINE_LIMIT, OUTPUT_HEADER},
    executor::{Execute, Executor},
};

/// Cuts each line of `output` to `line_length` characters and the whole text
/// to `line_limit` lines. Zero disables either cap.
///
/// When lines are dropped a notice naming the cap is appended.
pub fn truncate_output(output: &str, line_limit: usize, line_length: usize) -> String {
    let mut lines = output.lines().map(|line| {
        if line_length == 0 {
            line.to_string()
        } else {
            line.chars().take(line_length).collect::<String>()
        }
    });

    if line_limit > 0 && output.lines().count() > line_limit {
        format!(
            "{}\n\n(Output truncated at {line_limit} lines.)\n\n",
            lines.take(line_limit).join("\n")
        )
    } else {
        lines.join("\n")
    }
}

#[derive(Clone, Builder)]
/// Runs the unit (once) and writes what it printed.
pub struct ExecutionEcho {
    /// header text
    #[builder(into, default = OUTPUT_HEADER.to_string())]
    header:      String,
    /// most lines kept; zero keeps all
    #[builder(default = DEFAULT_LINE_LIMIT)]
    line_limit:  usize,
    /// most characters kept per line; zero keeps all
    #[builder(default = DEFAULT_LINE_LENGTH)]
    line_length: usize,
    /// runs the program if the unit has not been run yet
    #[builder(default = Arc::new(Executor::default()) as Arc<dyn Execute>)]
    executor:    Arc<dyn Execute>,
}

impl Default for ExecutionEcho {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[async_trait]
impl FeedbackStep for ExecutionEcho {
    fn name(&self) -> &str {
        "program output"
    }

    async fn render(&self, report: &mut Report, unit: &mut CodeFile) -> Result<()> {
        report.push_header(&self.header, None);
        let output = unit.get_output(self.executor.as_ref()).await;
        report.push_str(&truncate_output(&output, self.line_limit, self.line_length));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_output_passes_through() {
        assert_eq!(truncate_output("hello\nworld\n", 50, 120), "hello\nworld");
    }

    #[test]
    fn long_lines_are_cut() {
        assert_eq!(truncate_output("abcdef\nxy\n", 0, 3), "abc\nxy");
    }

    #[test]
    fn too_many_lines_adds_notice() {
        let output = "1\n2\n3\n4\n";
        assert_eq!(truncate_output(output, 2, 0), "1\n2\n\n(Output truncated at 2 lines.)\n\n");
    }

    #[test]
    fn exactly_at_limit_is_not_truncated() {
        assert_eq!(truncate_output("1\n2\n", 2, 0), "1\n2");
    }

    #[test]
    fn unterminated_last_line_counts() {
        assert_eq!(truncate_output("1\n2\n3", 2, 0), "1\n2\n\n(Output truncated at 2 lines.)\n\n");
    }

    #[test]
    fn cuts_on_characters_not_bytes() {
        assert_eq!(truncate_output("héllo", 0, 2), "hé");
    }
}
