#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::sync::{Arc, LazyLock};

use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;

use super::{FeedbackStep, Report};
use crate::{code_file::CodeFile, executor::Execute};

/// Sentence written when the output matches.
pub const LOOKS_CORRECT: &str = "The output of your program looks correct, good job!";
/// Sentence written when the output does not match and no reference is shown.
pub const SEEMS_INCORRECT: &str = "The output of your program seems incorrect.";

/// Runs of ASCII digits, the default number pattern.
static DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[0-9]+").expect("digit pattern is valid"));

/// Result of checking one program's output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    /// whether the output is acceptable
    pub passed:  bool,
    /// what the student is told
    pub message: String,
}

impl Verdict {
    /// A passing verdict.
    pub fn pass(message: impl Into<String>) -> Self {
        Self {
            passed:  true,
            message: message.into(),
        }
    }

    /// A failing verdict.
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            passed:  false,
            message: message.into(),
        }
    }
}

/// Decides whether a program's output is correct for an assignment.
pub trait OutputCheck: Send + Sync {
    /// Judges `output`, the program's complete standard output.
    fn check(&self, output: &str) -> Verdict;
}

impl<F> OutputCheck for F
where
    F: Fn(&str) -> Verdict + Send + Sync,
{
    fn check(&self, output: &str) -> Verdict {
        self(output)
    }
}

/// Passes when the matches of `pattern` in the lower-cased output are
/// exactly `expected`, in order.
#[derive(Debug, Clone)]
pub struct PatternSequenceCheck {
    /// what to look for
    pattern:        Regex,
    /// the matches a correct program produces
    expected:       Vec<String>,
    /// shown to the student on failure
    correct_output: Option<String>,
}

impl PatternSequenceCheck {
    /// Builds the check; fails when `pattern` is not a valid regex.
    pub fn new<I, S>(pattern: &str, expected: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let pattern =
            Regex::new(pattern).with_context(|| format!("Invalid check pattern {pattern:?}"))?;
        Ok(Self {
            pattern,
            expected: expected.into_iter().map(Into::into).collect(),
            correct_output: None,
        })
    }

    /// Shows `correct_output` to students whose output does not match.
    pub fn with_correct_output(mut self, correct_output: impl Into<String>) -> Self {
        self.correct_output = Some(correct_output.into());
        self
    }
}

impl OutputCheck for PatternSequenceCheck {
    fn check(&self, output: &str) -> Verdict {
        let lowered = output.to_lowercase();
        let found = self
            .pattern
            .find_iter(&lowered)
            .map(|m| m.as_str())
            .collect::<Vec<_>>();

        if found == self.expected {
            Verdict::pass(LOOKS_CORRECT)
        } else {
            match &self.correct_output {
                Some(correct) => Verdict::fail(format!(
                    "The output of your program is incorrect. The correct output is:\n\n{correct}"
                )),
                None => Verdict::fail(SEEMS_INCORRECT),
            }
        }
    }
}

/// Passes when the integers found in the output start with `expected`.
#[derive(Debug, Clone)]
pub struct NumericPrefixCheck {
    /// how a number is recognized
    pattern:  Regex,
    /// the numbers a correct program prints first
    expected: Vec<i64>,
}

impl NumericPrefixCheck {
    /// Checks for `expected` using runs of ASCII digits as numbers.
    pub fn new(expected: Vec<i64>) -> Self {
        Self {
            pattern: DIGITS.clone(),
            expected,
        }
    }

    /// Recognizes numbers with `pattern` instead, e.g. `[0-9]{2,}`.
    pub fn with_pattern(mut self, pattern: &str) -> Result<Self> {
        self.pattern =
            Regex::new(pattern).with_context(|| format!("Invalid number pattern {pattern:?}"))?;
        Ok(self)
    }
}

impl OutputCheck for NumericPrefixCheck {
    fn check(&self, output: &str) -> Verdict {
        let numbers = self
            .pattern
            .find_iter(output)
            .map_while(|m| m.as_str().parse::<i64>().ok())
            .take(self.expected.len())
            .collect::<Vec<_>>();

        if numbers == self.expected {
            Verdict::pass(LOOKS_CORRECT)
        } else {
            Verdict::fail(SEEMS_INCORRECT)
        }
    }
}

/// Passes when `needle` occurs exactly `expected` times.
#[derive(Debug, Clone)]
pub struct CountCheck {
    /// the text counted, case-sensitively
    needle:   String,
    /// how many times it must appear
    expected: usize,
}

impl CountCheck {
    /// Creates the check.
    pub fn new(needle: impl Into<String>, expected: usize) -> Self {
        Self {
            needle: needle.into(),
            expected,
        }
    }
}

impl OutputCheck for CountCheck {
    fn check(&self, output: &str) -> Verdict {
        if self.needle.is_empty() {
            return Verdict::fail(SEEMS_INCORRECT);
        }
        if output.matches(self.needle.as_str()).count() == self.expected {
            Verdict::pass(LOOKS_CORRECT)
        } else {
            Verdict::fail(SEEMS_INCORRECT)
        }
    }
}

/// Runs an [`OutputCheck`] against the unit's output and writes the verdict.
pub struct CorrectnessCheck {
    /// optional header above the verdict
    header:   Option<String>,
    /// the assignment's criteria
    check:    Box<dyn OutputCheck>,
    /// runs the program if the unit has not been run yet
    executor: Arc<dyn Execute>,
}

impl CorrectnessCheck {
    /// Creates the step without a header.
    pub fn new(check: impl OutputCheck + 'static, executor: Arc<dyn Execute>) -> Self {
        Self {
            header: None,
            check: Box::new(check),
            executor,
        }
    }

    /// Writes `header` above the verdict.
    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = Some(header.into());
        self
    }
}

#[async_trait]
impl FeedbackStep for CorrectnessCheck {
    fn name(&self) -> &str {
        "correctness check"
    }

    async fn render(&self, report: &mut Report, unit: &mut CodeFile) -> Result<()> {
        if let Some(header) = &self.header {
            report.push_header(header, None);
        }

        let message = if !unit.compiled() {
            "Your code did not compile, so its output could not be checked.".to_string()
        } else {
            let output = unit.get_output(self.executor.as_ref()).await;
            match unit.execution() {
                Some(execution) if execution.completed() => self.check.check(&output).message,
                _ => "Your program did not finish normally, so its output could not be checked."
                    .to_string(),
            }
        };

        report.push_str(&format!("\n{}\n", message.trim_end()));
        Ok(())
    }
}
