use anyhow::Result;
use async_trait::async_trait;

use super::{FeedbackStep, Report};
use crate::{
    code_file::{CodeFile, CompileStatus},
    constants::FEEDBACK_HEADER,
};

/// Writes a bare header, leaving room for a grader's own notes.
#[derive(Debug, Clone)]
pub struct SectionMarker {
    /// header text
    header: String,
}

impl SectionMarker {
    /// A marker with the given header.
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
        }
    }
}

impl Default for SectionMarker {
    fn default() -> Self {
        Self::new(FEEDBACK_HEADER)
    }
}

#[async_trait]
impl FeedbackStep for SectionMarker {
    fn name(&self) -> &str {
        "section marker"
    }

    async fn render(&self, report: &mut Report, _unit: &mut CodeFile) -> Result<()> {
        report.push_header(&self.header, None);
        Ok(())
    }
}

/// Writes one sentence describing how compilation went.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompileSummary;

impl CompileSummary {
    /// The sentence for a compile status.
    pub fn sentence(status: &CompileStatus) -> &'static str {
        match status {
            CompileStatus::Unattempted => "Your code was not compiled.",
            CompileStatus::Succeeded { diagnostics } if diagnostics.trim().is_empty() => {
                "Your code compiles without warnings."
            }
            CompileStatus::Succeeded { .. } => {
                "Your code compiles, but there are some warnings from the compiler."
            }
            CompileStatus::Failed { diagnostics, .. } if diagnostics.trim().is_empty() => {
                "Your code doesn't compile. Unfortunately, the compiler doesn't seem to have \
                 any feedback."
            }
            CompileStatus::Failed { .. } => {
                "Your code doesn't compile. The compiler messages explain some of the issues \
                 with your code."
            }
        }
    }
}

#[async_trait]
impl FeedbackStep for CompileSummary {
    fn name(&self) -> &str {
        "compile summary"
    }

    async fn render(&self, report: &mut Report, unit: &mut CodeFile) -> Result<()> {
        report.push_str(&format!("\n{}\n", Self::sentence(unit.status())));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_compile() {
        let status = CompileStatus::Succeeded {
            diagnostics: String::new(),
        };
        assert_eq!(CompileSummary::sentence(&status), "Your code compiles without warnings.");
    }

    #[test]
    fn warnings_only() {
        let status = CompileStatus::Succeeded {
            diagnostics: "main.c:1:1: warning: unused".into(),
        };
        assert!(CompileSummary::sentence(&status).contains("some warnings"));
    }

    #[test]
    fn failure_with_and_without_messages() {
        let silent = CompileStatus::Failed {
            exit_code:   1,
            diagnostics: "  \n".into(),
        };
        let noisy = CompileStatus::Failed {
            exit_code:   1,
            diagnostics: "main.c:2:1: error: expected ';'".into(),
        };
        assert!(CompileSummary::sentence(&silent).contains("doesn't seem to have any feedback"));
        assert!(CompileSummary::sentence(&noisy).contains("compiler messages explain"));
    }
}
