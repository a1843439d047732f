use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;

use super::{FeedbackStep, Report};
use crate::{code_file::CodeFile, constants::DIAGNOSTICS_HEADER};

/// Removes machine-specific path prefixes from compiler messages so a
/// student sees `main.c:3:5: error` instead of the marker's directory
/// layout.
#[derive(Debug, Clone)]
pub enum PathShortener {
    /// Strip the directory the source file lives in.
    UnitDirectory,
    /// Strip every match of a pattern.
    Pattern(Regex),
}

impl PathShortener {
    /// Applies the shortening to `diagnostics` produced for `unit`.
    ///
    /// Text that never matches comes back unchanged.
    pub fn apply(&self, diagnostics: &str, unit: &CodeFile) -> String {
        match self {
            PathShortener::UnitDirectory => {
                let Some(dir) = unit.source().parent().filter(|d| !d.as_os_str().is_empty())
                else {
                    return diagnostics.to_string();
                };
                let prefix = format!("{}{}", dir.display(), std::path::MAIN_SEPARATOR);
                diagnostics.replace(&prefix, "")
            }
            PathShortener::Pattern(pattern) => pattern.replace_all(diagnostics, "").into_owned(),
        }
    }
}

/// Extra rewrite applied to diagnostics after path shortening.
pub type DiagnosticTransform = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Writes the compiler's diagnostics under a header.
#[derive(Clone)]
pub struct DiagnosticsEcho {
    /// header text
    header:    String,
    /// optional path shortening
    shortener: Option<PathShortener>,
    /// final rewrite; identity unless replaced
    transform: DiagnosticTransform,
}

impl Default for DiagnosticsEcho {
    fn default() -> Self {
        Self {
            header:    DIAGNOSTICS_HEADER.to_string(),
            shortener: None,
            transform: Arc::new(str::to_string),
        }
    }
}

impl DiagnosticsEcho {
    /// Creates the step with the default header and no rewriting.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the header text.
    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into();
        self
    }

    /// Shortens file paths in diagnostics before writing them.
    pub fn with_shortener(mut self, shortener: PathShortener) -> Self {
        self.shortener = Some(shortener);
        self
    }

    /// Rewrites diagnostics with `transform` just before writing them.
    pub fn with_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.transform = Arc::new(transform);
        self
    }

    /// The diagnostics text as it appears in the report.
    pub fn format_diagnostics(&self, unit: &CodeFile) -> String {
        let text = match &self.shortener {
            Some(shortener) => shortener.apply(unit.diagnostics(), unit),
            None => unit.diagnostics().to_string(),
        };
        (self.transform)(&text)
    }
}

#[async_trait]
impl FeedbackStep for DiagnosticsEcho {
    fn name(&self) -> &str {
        "compiler output"
    }

    async fn render(&self, report: &mut Report, unit: &mut CodeFile) -> Result<()> {
        report.push_header(&self.header, None);
        report.push_str(&self.format_diagnostics(unit));
        Ok(())
    }
}
