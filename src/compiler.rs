#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    ffi::OsString,
    fmt::{self, Display},
    path::Path,
    str::FromStr,
};

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::{
    constants::{DEFAULT_MAX_ERRORS, UNDECODABLE_DIAGNOSTICS},
    error::GradeError,
    process::{Outcome, run_collect},
    util::program_path,
};

/// The two compiler families whose flag spellings we know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum CompilerFamily {
    /// gcc / g++
    #[default]
    Gnu,
    /// clang / clang++
    Clang,
}

impl FromStr for CompilerFamily {
    type Err = GradeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gnu" | "gcc" => Ok(CompilerFamily::Gnu),
            "clang" | "llvm" => Ok(CompilerFamily::Clang),
            other => Err(GradeError::UnknownCompilerFamily(other.to_string())),
        }
    }
}

impl Display for CompilerFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompilerFamily::Gnu => f.write_str("gnu"),
            CompilerFamily::Clang => f.write_str("clang"),
        }
    }
}

/// Source languages the toolchain can build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    /// `.c`
    C,
    /// `.cpp`
    Cpp,
}

impl Language {
    /// Picks the language from a suffix such as `.c`.
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            ".c" => Some(Language::C),
            ".cpp" => Some(Language::Cpp),
            _ => None,
        }
    }

    /// Picks the language from a source path's extension.
    pub fn from_path(path: &Path) -> Result<Self, GradeError> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| Self::from_suffix(&format!(".{ext}")))
            .ok_or_else(|| GradeError::UnsupportedSource(path.to_path_buf()))
    }
}

/// Toolchain settings shared by every compilation in a batch.
#[derive(Debug, Clone, Serialize)]
pub struct CompilerProfile {
    /// Which flag dialect to speak.
    family:                       CompilerFamily,
    /// Flags passed before the family-specific ones, e.g. `-Wall`.
    extra_flags:                  Vec<String>,
    /// Stop after this many errors; `None` reports all of them.
    max_errors:                   Option<u32>,
    /// Silence the warning about `main`'s declared return type.
    suppress_main_return_warning: bool,
    /// Program used for C sources instead of the family default.
    c_program:                    Option<String>,
    /// Program used for C++ sources instead of the family default.
    cpp_program:                  Option<String>,
}

impl Default for CompilerProfile {
    fn default() -> Self {
        Self::new(CompilerFamily::default())
    }
}

impl CompilerProfile {
    /// Creates a profile for `family` with an error cap of
    /// [`DEFAULT_MAX_ERRORS`] and the main-return warning suppressed.
    pub fn new(family: CompilerFamily) -> Self {
        Self {
            family,
            extra_flags: Vec::new(),
            max_errors: Some(DEFAULT_MAX_ERRORS),
            suppress_main_return_warning: true,
            c_program: None,
            cpp_program: None,
        }
    }

    /// sets the flags passed before the family-specific ones
    pub fn with_extra_flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_flags = flags.into_iter().map(Into::into).collect();
        self
    }

    /// sets the error cap; `None` lets the compiler report every error
    pub fn with_max_errors(mut self, max_errors: Option<u32>) -> Self {
        self.max_errors = max_errors;
        self
    }

    /// sets whether the main-return-type warning is silenced
    pub fn with_main_return_warning_suppressed(mut self, suppress: bool) -> Self {
        self.suppress_main_return_warning = suppress;
        self
    }

    /// overrides the program used for C sources
    pub fn with_c_program(mut self, program: Option<String>) -> Self {
        self.c_program = program;
        self
    }

    /// overrides the program used for C++ sources
    pub fn with_cpp_program(mut self, program: Option<String>) -> Self {
        self.cpp_program = program;
        self
    }

    /// Returns the family this profile was built for.
    pub fn family(&self) -> CompilerFamily {
        self.family
    }

    /// Program invoked for `language`.
    pub fn program(&self, language: Language) -> &str {
        let custom = match language {
            Language::C => self.c_program.as_deref(),
            Language::Cpp => self.cpp_program.as_deref(),
        };
        if let Some(program) = custom {
            return program;
        }

        match (language, self.family) {
            (Language::C, CompilerFamily::Gnu) => "gcc",
            (Language::Cpp, CompilerFamily::Gnu) => "g++",
            (Language::C, CompilerFamily::Clang) => "clang",
            (Language::Cpp, CompilerFamily::Clang) => "clang++",
        }
    }

    /// Flags appended after `<source> -o <executable>`.
    pub fn flags(&self) -> Vec<String> {
        let mut flags = self.extra_flags.clone();

        match self.family {
            CompilerFamily::Gnu => {
                flags.push("-lm".into());
                if let Some(max) = self.max_errors {
                    flags.push(format!("-fmax-errors={max}"));
                }
                if self.suppress_main_return_warning {
                    flags.push("-Wno-main".into());
                }
            }
            CompilerFamily::Clang => {
                if let Some(max) = self.max_errors {
                    flags.push(format!("-ferror-limit={max}"));
                }
                if self.suppress_main_return_warning {
                    flags.push("-Wno-main-return-type".into());
                }
            }
        }

        flags
    }

    /// Builds the full command line that compiles `source` into
    /// `executable`.
    pub fn invocation(&self, source: &Path, executable: &Path) -> Result<Invocation, GradeError> {
        let language = Language::from_path(source)?;
        let mut args: Vec<OsString> = vec![
            source.as_os_str().to_owned(),
            "-o".into(),
            executable.as_os_str().to_owned(),
        ];
        args.extend(self.flags().into_iter().map(OsString::from));

        Ok(Invocation {
            program: self.program(language).to_string(),
            args,
        })
    }

    /// Checks that a compiler exists on PATH for every suffix in `suffixes`.
    pub fn verify(&self, suffixes: &[String]) -> Result<(), GradeError> {
        for suffix in suffixes {
            let language = Language::from_suffix(suffix)
                .ok_or_else(|| GradeError::UnsupportedSource(suffix.into()))?;
            program_path(self.program(language))?;
        }
        Ok(())
    }
}

/// A program plus the arguments to run it with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// program name, resolved through PATH
    pub program: String,
    /// arguments in order
    pub args:    Vec<OsString>,
}

/// Exit status and diagnostics of one compiler run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOutput {
    /// compiler exit code; zero means an executable was produced
    pub exit_code:   i32,
    /// everything the compiler wrote to stderr
    pub diagnostics: String,
}

impl CompileOutput {
    /// Builds an output from an exit code and diagnostic text.
    pub fn new(exit_code: i32, diagnostics: impl Into<String>) -> Self {
        Self {
            exit_code,
            diagnostics: diagnostics.into(),
        }
    }
}

/// Anything that can turn a source file into an executable.
#[async_trait]
pub trait Compile: Send + Sync {
    /// Compiles `source` into `executable`.
    ///
    /// Never fails: problems are reported through a non-zero exit code and
    /// the diagnostic text.
    async fn compile(&self, source: &Path, executable: &Path) -> CompileOutput;
}

/// Compiles by invoking the external toolchain described by a
/// [`CompilerProfile`].
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    /// toolchain settings
    profile: CompilerProfile,
}

impl Compiler {
    /// Creates a compiler for `profile`.
    pub fn new(profile: CompilerProfile) -> Self {
        Self { profile }
    }

    /// Returns the profile this compiler uses.
    pub fn profile(&self) -> &CompilerProfile {
        &self.profile
    }
}

#[async_trait]
impl Compile for Compiler {
    async fn compile(&self, source: &Path, executable: &Path) -> CompileOutput {
        let invocation = match self.profile.invocation(source, executable) {
            Ok(invocation) => invocation,
            Err(e) => {
                warn!("{e}");
                return CompileOutput::new(1, e.to_string());
            }
        };

        debug!("{} {:?}", invocation.program, invocation.args);
        // The compiler's own error limit bounds its run time.
        match run_collect(&invocation.program, &invocation.args, None, None).await {
            Ok(Outcome::Finished(out)) => match String::from_utf8(out.stderr.clone()) {
                Ok(diagnostics) => CompileOutput::new(out.exit_code(), diagnostics),
                Err(_) => {
                    warn!("Unicode decode error in compiler output for {}", source.display());
                    CompileOutput::new(1, UNDECODABLE_DIAGNOSTICS)
                }
            },
            Ok(Outcome::TimedOut) => CompileOutput::new(1, "Compiler timed out."),
            Err(e) => {
                error!("Could not run {} on {}: {e:#}", invocation.program, source.display());
                CompileOutput::new(1, format!("Could not run the compiler: {e}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn gnu_flags_follow_extra_flags() {
        let profile = CompilerProfile::default().with_extra_flags(["-Wall"]);
        assert_eq!(profile.flags(), ["-Wall", "-lm", "-fmax-errors=10", "-Wno-main"]);
    }

    #[test]
    fn clang_flags_use_clang_spelling() {
        let profile = CompilerProfile::new(CompilerFamily::Clang).with_max_errors(Some(3));
        assert_eq!(profile.flags(), ["-ferror-limit=3", "-Wno-main-return-type"]);
    }

    #[test]
    fn unlimited_errors_and_no_suppression_drop_flags() {
        let profile = CompilerProfile::default()
            .with_max_errors(None)
            .with_main_return_warning_suppressed(false);
        assert_eq!(profile.flags(), ["-lm"]);
    }

    #[test]
    fn invocation_picks_program_by_extension() {
        let profile = CompilerProfile::default();
        let inv = profile
            .invocation(&PathBuf::from("dir/main.cpp"), &PathBuf::from("dir/main.out"))
            .expect("cpp is supported");
        assert_eq!(inv.program, "g++");
        assert_eq!(inv.args[0], OsString::from("dir/main.cpp"));
        assert_eq!(inv.args[1], OsString::from("-o"));
        assert_eq!(inv.args[2], OsString::from("dir/main.out"));
    }

    #[test]
    fn program_override_wins() {
        let profile =
            CompilerProfile::new(CompilerFamily::Clang).with_c_program(Some("cc".into()));
        assert_eq!(profile.program(Language::C), "cc");
        assert_eq!(profile.program(Language::Cpp), "clang++");
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let err = CompilerProfile::default()
            .invocation(&PathBuf::from("main.py"), &PathBuf::from("main.out"))
            .unwrap_err();
        assert!(matches!(err, GradeError::UnsupportedSource(_)));
    }

    #[test]
    fn family_parses_case_insensitively() {
        assert_eq!("GNU".parse::<CompilerFamily>().ok(), Some(CompilerFamily::Gnu));
        assert_eq!("clang".parse::<CompilerFamily>().ok(), Some(CompilerFamily::Clang));
        assert!("msvc".parse::<CompilerFamily>().is_err());
    }
}
