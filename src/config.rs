#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
    time::Duration,
};

use anyhow::{Context, Result};
use bon::Builder;
use regex::Regex;
use serde::Serialize;

use crate::{
    compiler::{CompilerFamily, CompilerProfile},
    constants::{
        DEFAULT_LINE_LENGTH, DEFAULT_LINE_LIMIT, DEFAULT_MAX_ERRORS, DEFAULT_SOURCE_SUFFIXES,
        DEFAULT_TIMEOUT_SECS,
    },
    error::GradeError,
    executor::{Execute, Executor},
    feedback::{
        CorrectnessCheck, DiagnosticsEcho, ExecutionEcho, PathShortener, Pipeline, SectionMarker,
        SourceEcho,
    },
};

/// Name of the directory reports go to when no output directory is given.
pub const DEFAULT_OUT_DIR_NAME: &str = "processed";

/// Everything a batch run can be tuned with.
///
/// Values come from [`GraderConfig::from_env`] and are then overridden by
/// command-line flags.
#[derive(Debug, Clone, Builder, Serialize)]
pub struct GraderConfig {
    /// Suffixes of files treated as source code, dot included.
    #[builder(default = default_suffixes())]
    pub source_suffixes:              Vec<String>,
    /// Flag dialect of the compiler.
    #[builder(default)]
    pub compiler_family:              CompilerFamily,
    /// Program used for C sources instead of the family default.
    pub c_program:                    Option<String>,
    /// Program used for C++ sources instead of the family default.
    pub cpp_program:                  Option<String>,
    /// Flags passed before the family-specific ones.
    #[builder(default = vec!["-Wall".to_string()])]
    pub extra_flags:                  Vec<String>,
    /// Compiler error cap; zero lets the compiler report every error.
    #[builder(default = DEFAULT_MAX_ERRORS)]
    pub max_errors:                   u32,
    /// Silence the warning about `main`'s return type.
    #[builder(default = true)]
    pub suppress_main_return_warning: bool,
    /// Seconds a student program may run.
    #[builder(default = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs:                 u64,
    /// Output lines kept in a report; zero keeps all.
    #[builder(default = DEFAULT_LINE_LIMIT)]
    pub line_limit:                   usize,
    /// Characters kept per output line; zero keeps all.
    #[builder(default = DEFAULT_LINE_LENGTH)]
    pub line_length:                  usize,
    /// Number the lines of echoed source.
    #[builder(default = true)]
    pub line_numbers:                 bool,
    /// Strip directory prefixes from compiler messages.
    #[builder(default = true)]
    pub shorten_paths:                bool,
    /// Pattern stripped from compiler messages instead of the unit's
    /// directory.
    pub shorten_pattern:              Option<String>,
    /// Directory whose files are copied next to every submission.
    pub extras_dir:                   Option<PathBuf>,
    /// Students graded at the same time.
    #[builder(default = available_workers())]
    pub workers:                      usize,
}

impl Default for GraderConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// The built-in source suffixes as owned strings.
fn default_suffixes() -> Vec<String> {
    DEFAULT_SOURCE_SUFFIXES.iter().map(|s| s.to_string()).collect()
}

/// One worker per available core.
fn available_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Reads a trimmed, non-empty string from `env`.
fn read_string(env: &str) -> Option<String> {
    std::env::var(env)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

/// Reads a number from `env`, falling back to `default` when it is unset or
/// not a number.
fn read_number<T: FromStr>(env: &str, default: T) -> T {
    read_string(env)
        .and_then(|value| value.parse::<T>().ok())
        .unwrap_or(default)
}

/// Reads a flag from `env`; `1`, `true`, `yes` and `on` are true.
fn read_flag(env: &str, default: bool) -> bool {
    match read_string(env).map(|v| v.to_ascii_lowercase()).as_deref() {
        Some("1" | "true" | "yes" | "on") => true,
        Some("0" | "false" | "no" | "off") => false,
        _ => default,
    }
}

/// Splits a comma or whitespace separated list of suffixes, adding the
/// leading dot where it is missing.
pub fn parse_suffixes(list: &str) -> Vec<String> {
    list.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|s| {
            if s.starts_with('.') {
                s.to_string()
            } else {
                format!(".{s}")
            }
        })
        .collect()
}

/// Directory reports go to when none is given: `processed` next to
/// `in_dir`, so a rerun never reads its own output.
pub fn default_out_dir(in_dir: &Path) -> PathBuf {
    let in_dir = std::path::absolute(in_dir).unwrap_or_else(|_| in_dir.to_path_buf());
    match in_dir.parent() {
        Some(parent) => parent.join(DEFAULT_OUT_DIR_NAME),
        None => in_dir.join(DEFAULT_OUT_DIR_NAME),
    }
}

impl GraderConfig {
    /// Builds a configuration from `GRADEBOOK_*` environment variables.
    ///
    /// Unset or unparsable numbers fall back to their defaults. An unknown
    /// compiler family is an error.
    pub fn from_env() -> Result<Self, GradeError> {
        let compiler_family = match read_string("GRADEBOOK_COMPILER") {
            Some(family) => family.parse()?,
            None => CompilerFamily::default(),
        };
        let source_suffixes = read_string("GRADEBOOK_SOURCE_TYPES")
            .map(|list| parse_suffixes(&list))
            .filter(|list| !list.is_empty())
            .unwrap_or_else(default_suffixes);
        let extra_flags = read_string("GRADEBOOK_FLAGS")
            .map(|flags| flags.split_whitespace().map(str::to_string).collect())
            .unwrap_or_else(|| vec!["-Wall".to_string()]);

        Ok(Self::builder()
            .source_suffixes(source_suffixes)
            .compiler_family(compiler_family)
            .maybe_c_program(read_string("GRADEBOOK_CC"))
            .maybe_cpp_program(read_string("GRADEBOOK_CXX"))
            .extra_flags(extra_flags)
            .max_errors(read_number("GRADEBOOK_MAX_ERRORS", DEFAULT_MAX_ERRORS))
            .suppress_main_return_warning(read_flag("GRADEBOOK_SUPPRESS_MAIN_WARNING", true))
            .timeout_secs(read_number("GRADEBOOK_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS))
            .line_limit(read_number("GRADEBOOK_LINE_LIMIT", DEFAULT_LINE_LIMIT))
            .line_length(read_number("GRADEBOOK_LINE_LENGTH", DEFAULT_LINE_LENGTH))
            .line_numbers(read_flag("GRADEBOOK_LINE_NUMBERS", true))
            .shorten_paths(read_flag("GRADEBOOK_SHORTEN_PATHS", true))
            .maybe_shorten_pattern(read_string("GRADEBOOK_SHORTEN_PATTERN"))
            .maybe_extras_dir(read_string("GRADEBOOK_EXTRAS_DIR").map(PathBuf::from))
            .workers(read_number("GRADEBOOK_WORKERS", available_workers()).max(1))
            .build())
    }

    /// The toolchain settings this configuration describes.
    pub fn compiler_profile(&self) -> CompilerProfile {
        CompilerProfile::new(self.compiler_family)
            .with_extra_flags(self.extra_flags.iter().cloned())
            .with_max_errors(Some(self.max_errors).filter(|max| *max > 0))
            .with_main_return_warning_suppressed(self.suppress_main_return_warning)
            .with_c_program(self.c_program.clone())
            .with_cpp_program(self.cpp_program.clone())
    }

    /// Checks that a compiler exists for every configured suffix.
    pub fn verify(&self) -> Result<(), GradeError> {
        self.compiler_profile().verify(&self.source_suffixes)
    }

    /// The executor for student programs.
    pub fn executor(&self) -> Executor {
        Executor::new(self.timeout_secs)
    }

    /// Wall-clock budget of one program run.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// How compiler messages are shortened, if at all.
    pub fn shortener(&self) -> Result<Option<PathShortener>> {
        if !self.shorten_paths {
            return Ok(None);
        }
        match &self.shorten_pattern {
            Some(pattern) => {
                let pattern = Regex::new(pattern)
                    .with_context(|| format!("Invalid path pattern {pattern:?}"))?;
                Ok(Some(PathShortener::Pattern(pattern)))
            }
            None => Ok(Some(PathShortener::UnitDirectory)),
        }
    }

    /// The standard report layout: source, compiler output, program output,
    /// an optional correctness verdict, then a blank feedback section.
    pub fn pipeline(
        &self,
        executor: Arc<dyn Execute>,
        check: Option<CorrectnessCheck>,
    ) -> Result<Pipeline> {
        let mut diagnostics = DiagnosticsEcho::new();
        if let Some(shortener) = self.shortener()? {
            diagnostics = diagnostics.with_shortener(shortener);
        }

        let mut pipeline = Pipeline::new()
            .step(SourceEcho::builder().line_numbers(self.line_numbers).build())
            .step(diagnostics)
            .step(
                ExecutionEcho::builder()
                    .line_limit(self.line_limit)
                    .line_length(self.line_length)
                    .executor(executor)
                    .build(),
            );
        if let Some(check) = check {
            pipeline = pipeline.step(check);
        }
        Ok(pipeline.step(SectionMarker::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = GraderConfig::default();
        assert_eq!(config.source_suffixes, vec![".c", ".cpp"]);
        assert_eq!(config.extra_flags, vec!["-Wall"]);
        assert_eq!(config.max_errors, 10);
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.line_limit, 50);
        assert_eq!(config.line_length, 120);
        assert!(config.line_numbers);
        assert!(config.workers >= 1);
    }

    #[test]
    fn suffix_lists_gain_dots() {
        assert_eq!(parse_suffixes("c, .cpp  cc"), vec![".c", ".cpp", ".cc"]);
        assert!(parse_suffixes(" , ").is_empty());
    }

    #[test]
    fn zero_max_errors_means_unlimited() {
        let config = GraderConfig::builder().max_errors(0).build();
        let flags = config.compiler_profile().flags();
        assert!(!flags.iter().any(|f| f.starts_with("-fmax-errors")));
        assert_eq!(flags[0], "-Wall");
    }

    #[test]
    fn out_dir_is_next_to_input() {
        let out = default_out_dir(Path::new("/srv/hw1/submissions"));
        assert_eq!(out, PathBuf::from("/srv/hw1/processed"));
    }

    #[test]
    fn pipeline_has_standard_steps() {
        let config = GraderConfig::default();
        let pipeline = config
            .pipeline(Arc::new(config.executor()), None)
            .expect("default pipeline builds");
        assert_eq!(pipeline.len(), 4);
    }

    #[test]
    fn bad_shorten_pattern_is_reported() {
        let config = GraderConfig::builder()
            .shorten_pattern("(".to_string())
            .build();
        assert!(config.shortener().is_err());
    }
}
