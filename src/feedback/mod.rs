#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Assignment-specific output checks and the step that reports them.
pub mod check;
/// Compiler diagnostics section.
pub mod diagnostics;
/// Program output section.
pub mod output;
/// The in-memory report a pipeline writes into.
pub mod report;
/// Header-only and compile-summary sections.
pub mod section;
/// Source listing section.
pub mod source;

use anyhow::Result;
use async_trait::async_trait;
use tracing::warn;

pub use check::{
    CorrectnessCheck, CountCheck, NumericPrefixCheck, OutputCheck, PatternSequenceCheck, Verdict,
};
pub use diagnostics::{DiagnosticsEcho, PathShortener};
pub use output::{ExecutionEcho, truncate_output};
pub use report::Report;
pub use section::{CompileSummary, SectionMarker};
pub use source::SourceEcho;

use crate::code_file::CodeFile;

/// Returns `header_text` framed above and below by a rule of `=`.
///
/// The rule is two characters wider than the text unless `size` is given.
///
/// ```
/// assert_eq!(gradebook::feedback::make_header("Hi", None), "\n\n====\nHi\n====\n\n");
/// ```
pub fn make_header(header_text: &str, size: Option<usize>) -> String {
    let width = size.unwrap_or_else(|| header_text.chars().count() + 2);
    let rule = format!("\n{}\n", "=".repeat(width));
    format!("\n{rule}{header_text}{rule}\n")
}

/// One section generator of a report.
///
/// A step reads what it needs from the unit (source, diagnostics, output)
/// and appends text to the report. Steps keep no state between calls.
#[async_trait]
pub trait FeedbackStep: Send + Sync {
    /// Short name used in log messages.
    fn name(&self) -> &str;

    /// Appends this step's section for `unit` to `report`.
    async fn render(&self, report: &mut Report, unit: &mut CodeFile) -> Result<()>;
}

/// An ordered list of feedback steps.
#[derive(Default)]
pub struct Pipeline {
    /// steps, run in order
    steps: Vec<Box<dyn FeedbackStep>>,
}

impl Pipeline {
    /// Creates an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a step to the end of the pipeline.
    pub fn step(mut self, step: impl FeedbackStep + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Appends an already boxed step.
    pub fn push(&mut self, step: Box<dyn FeedbackStep>) {
        self.steps.push(step);
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// True when the pipeline has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Runs every step against `unit`, in order.
    ///
    /// A failing step is logged and noted in the report; the remaining steps
    /// still run.
    pub async fn run(&self, report: &mut Report, unit: &mut CodeFile) {
        for step in &self.steps {
            if let Err(e) = step.render(report, unit).await {
                warn!("{} failed for {}: {e:#}", step.name(), unit.source().display());
                report.push_str(&format!("\n({} could not be written: {e})\n", step.name()));
            }
        }
    }
}
