#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! # gradebook
//!
//! Grades a directory of C/C++ submissions and writes one feedback report per
//! student.
//!
//! ```text
//! gradebook submissions/ -o reports/ --timeout 10
//! ```
//!
//! Every flag has a `GRADEBOOK_*` environment counterpart, which may also be
//! set in a `.env` file.

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use bpaf::*;
use colored::Colorize;
use dotenvy::dotenv;
use gradebook::{
    Compiler, GradeBook, GraderConfig,
    executor::Execute,
    feedback::{CorrectnessCheck, PatternSequenceCheck},
    gradebook::summary_table,
};
use tracing::{Level, metadata::LevelFilter, warn};
use tracing_subscriber::{fmt, prelude::*, util::SubscriberInitExt};

/// Command line options.
#[derive(Debug, Clone)]
struct Options {
    /// log at debug level
    verbose:         bool,
    /// print the summary as JSON
    json:            bool,
    /// where reports go
    out_dir:         Option<PathBuf>,
    /// files copied next to every submission
    extras:          Option<PathBuf>,
    /// compiler family
    compiler:        Option<String>,
    /// run time limit in seconds
    timeout:         Option<u64>,
    /// characters kept per output line
    line_length:     Option<usize>,
    /// output lines kept
    line_limit:      Option<usize>,
    /// students graded at once
    workers:         Option<usize>,
    /// echo source without line numbers
    no_line_numbers: bool,
    /// regex whose matches in the output are checked
    check_pattern:   Option<String>,
    /// expected matches, in order
    check_expected:  Vec<String>,
    /// file holding the correct output, shown on a failed check
    check_correct:   Option<PathBuf>,
    /// directory of submitted files
    in_dir:          PathBuf,
}

/// Parse the command line arguments and return `Options`
fn options() -> Options {
    let verbose = short('v')
        .long("verbose")
        .help("Log what happens to every file")
        .switch();
    let json = long("json")
        .help("Print the batch summary as JSON instead of a table")
        .switch();
    let out_dir = short('o')
        .long("out-dir")
        .help("Directory for working copies and reports [default: ../processed]")
        .argument::<PathBuf>("DIR")
        .optional();
    let extras = short('a')
        .long("extras")
        .help("Directory of files copied next to every submission")
        .argument::<PathBuf>("DIR")
        .optional();
    let compiler = long("compiler")
        .help("Compiler family: gnu or clang")
        .argument::<String>("FAMILY")
        .optional();
    let timeout = long("timeout")
        .help("Seconds a program may run before it is stopped")
        .argument::<u64>("SECS")
        .optional();
    let line_length = long("line-length")
        .help("Characters kept per line of program output, 0 for all")
        .argument::<usize>("CHARS")
        .optional();
    let line_limit = long("line-limit")
        .help("Lines of program output kept, 0 for all")
        .argument::<usize>("LINES")
        .optional();
    let workers = long("workers")
        .help("Students graded at the same time")
        .argument::<usize>("N")
        .optional();
    let no_line_numbers = long("no-line-numbers")
        .help("Echo source code without line numbers")
        .switch();
    let check_pattern = long("check-pattern")
        .help("Regex matched against the lower-cased program output")
        .argument::<String>("REGEX")
        .optional();
    let check_expected = long("check-expected")
        .help("Expected match, repeat once per match in order")
        .argument::<String>("TOKEN")
        .many();
    let check_correct = long("check-correct")
        .help("File with the correct output, shown when the check fails")
        .argument::<PathBuf>("FILE")
        .optional();
    let in_dir = positional::<PathBuf>("IN_DIR").help("Directory of submitted files");

    construct!(Options {
        verbose,
        json,
        out_dir,
        extras,
        compiler,
        timeout,
        line_length,
        line_limit,
        workers,
        no_line_numbers,
        check_pattern,
        check_expected,
        check_correct,
        in_dir
    })
    .to_options()
    .descr("Compile, run and write feedback for a batch of C/C++ submissions")
    .run()
}

/// Applies command line overrides on top of the environment configuration.
fn configure(opts: &Options) -> Result<GraderConfig> {
    let mut config = GraderConfig::from_env()?;

    if let Some(family) = &opts.compiler {
        config.compiler_family = family.parse()?;
    }
    if let Some(extras) = &opts.extras {
        config.extras_dir = Some(extras.clone());
    }
    if let Some(timeout) = opts.timeout {
        config.timeout_secs = timeout;
    }
    if let Some(line_length) = opts.line_length {
        config.line_length = line_length;
    }
    if let Some(line_limit) = opts.line_limit {
        config.line_limit = line_limit;
    }
    if let Some(workers) = opts.workers {
        config.workers = workers.max(1);
    }
    if opts.no_line_numbers {
        config.line_numbers = false;
    }

    Ok(config)
}

/// Builds the correctness step requested on the command line, if any.
fn correctness_check(
    opts: &Options,
    executor: Arc<dyn Execute>,
) -> Result<Option<CorrectnessCheck>> {
    let Some(pattern) = &opts.check_pattern else {
        if !opts.check_expected.is_empty() {
            warn!("--check-expected has no effect without --check-pattern");
        }
        return Ok(None);
    };

    let mut check = PatternSequenceCheck::new(pattern, opts.check_expected.iter().cloned())?;
    if let Some(path) = &opts.check_correct {
        let correct = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        check = check.with_correct_output(correct);
    }

    Ok(Some(CorrectnessCheck::new(check, executor).with_header("Correctness")))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let opts = options();

    let level = if opts.verbose { Level::DEBUG } else { Level::INFO };
    let fmt = fmt::layer()
        .without_time()
        .with_file(false)
        .with_line_number(false);
    let filter_layer = LevelFilter::from_level(level);
    tracing_subscriber::registry()
        .with(fmt)
        .with(filter_layer)
        .init();

    let config = configure(&opts)?;
    config
        .verify()
        .context("The configured compiler cannot be used")?;

    let executor: Arc<dyn Execute> = Arc::new(config.executor());
    let check = correctness_check(&opts, Arc::clone(&executor))?;
    let pipeline = config.pipeline(executor, check)?;
    let compiler = Compiler::new(config.compiler_profile());

    let mut book = GradeBook::new(opts.in_dir.clone(), opts.out_dir.clone(), config)?;
    let summaries = book.run(&pipeline, &compiler).await?;

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        println!("{}", summary_table(&summaries));
        let compiled = summaries
            .iter()
            .filter(|s| s.sources > 0 && s.compiled == s.sources)
            .count();
        eprintln!(
            "{}",
            format!(
                "{compiled}/{} students compiled everything; reports are in {}",
                summaries.len(),
                book.out_dir().display()
            )
            .bright_green()
        );
    }

    Ok(())
}
