#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Identifier used for files whose name carries no student id.
pub const UNRESOLVED_ID: &str = "noid";

/// Pattern of a student id: two lowercase letters followed by five digits.
pub const ID_PATTERN: &str = r"[a-z]{2}[0-9]{5}";

/// Pattern of a "First Last" greeting on the first line of a cover file.
pub const NAME_PATTERN: &str = r"([A-Z][a-z]+)\s+([A-Z][a-z]+)";

/// Suffix of the plain-text cover file that accompanies each submission.
pub const COVER_SUFFIX: &str = ".txt";

/// Source suffixes recognized when none are configured.
pub const DEFAULT_SOURCE_SUFFIXES: [&str; 2] = [".c", ".cpp"];

/// Extension given to every compiled executable.
pub const EXECUTABLE_EXTENSION: &str = "out";

/// Reported in place of program output when the unit did not compile.
pub const DID_NOT_COMPILE: &str = "Code did not compile.";

/// Reported in place of program output when the program exits non-zero.
pub const COULD_NOT_RUN: &str = "Couldn't run file.";

/// Placeholder diagnostics when the compiler wrote bytes that are not UTF-8.
pub const UNDECODABLE_DIAGNOSTICS: &str = "Unicode error, no compiler output recorded.";

/// Returns the sentinel reported when a program exceeds its time budget.
pub fn timed_out_message(seconds: u64) -> String {
    format!("Timed out: execution took more than {seconds} seconds.")
}

/// Default wall-clock budget for one program run, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Default cap on compiler errors before the compiler gives up.
pub const DEFAULT_MAX_ERRORS: u32 = 10;

/// Default number of output lines kept in a report.
pub const DEFAULT_LINE_LIMIT: usize = 50;

/// Default number of characters kept per output line.
pub const DEFAULT_LINE_LENGTH: usize = 120;

/// Header of the compiler diagnostics section.
pub const DIAGNOSTICS_HEADER: &str = "Compiler output";

/// Header of the program output section.
pub const OUTPUT_HEADER: &str = "Program output";

/// Header of the free-text feedback section.
pub const FEEDBACK_HEADER: &str = "Feedback";

/// Directory name under which archive-extraction leftovers from macOS live.
pub const MACOS_METADATA_DIR: &str = "__MACOSX";
