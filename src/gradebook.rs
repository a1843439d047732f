#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use futures::{StreamExt, stream};
use serde::Serialize;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Panel, Style, object::Rows},
};
use tracing::{debug, info, warn};

use crate::{
    code_file::CodeFile,
    compiler::Compile,
    config::{GraderConfig, default_out_dir},
    error::GradeError,
    feedback::{Pipeline, Report},
    identity::Identifier,
    student::{self, Student},
    util::{find_files, normalize_file_names},
};

/// One row of the batch summary.
#[derive(Tabled, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct StudentSummary {
    /// student identifier
    #[tabled(rename = "Identifier")]
    pub id:       String,
    /// name from the cover file
    #[tabled(rename = "Name")]
    pub name:     String,
    /// number of source files found
    #[tabled(rename = "Sources")]
    pub sources:  usize,
    /// number of them that compiled
    #[tabled(rename = "Compiled")]
    pub compiled: usize,
    /// report file name
    #[tabled(rename = "Report")]
    pub report:   String,
}

/// Renders the batch summary as a table.
pub fn summary_table(rows: &[StudentSummary]) -> String {
    Table::new(rows)
        .with(Panel::header(format!("Graded {} submissions", rows.len())))
        .with(
            Modify::new(Rows::first())
                .with(Alignment::center())
                .with(Alignment::center_vertical()),
        )
        .with(Style::modern())
        .to_string()
}

/// A batch of submissions: where they come from, where reports go, and who
/// submitted what.
#[derive(Debug)]
pub struct GradeBook {
    /// directory of raw submitted files
    in_dir:   PathBuf,
    /// directory for working copies and reports
    out_dir:  PathBuf,
    /// batch settings
    config:   GraderConfig,
    /// students by identifier; filled by [`GradeBook::get_files_by_id`]
    students: BTreeMap<Identifier, Student>,
}

impl GradeBook {
    /// Opens the batch in `in_dir` and removes whitespace from its file
    /// names.
    ///
    /// Reports go to `out_dir`, or to [`default_out_dir`] when `None`. Fails
    /// when `in_dir` is not a readable directory.
    pub fn new(
        in_dir: impl Into<PathBuf>,
        out_dir: Option<PathBuf>,
        config: GraderConfig,
    ) -> Result<Self> {
        let in_dir = in_dir.into();
        fs::read_dir(&in_dir).map_err(|source| GradeError::InputDirectory {
            path: in_dir.clone(),
            source,
        })?;

        let renamed = normalize_file_names(&in_dir)?;
        if renamed > 0 {
            info!("Renamed {renamed} files to remove whitespace");
        }

        let out_dir = out_dir.unwrap_or_else(|| default_out_dir(&in_dir));
        Ok(Self {
            in_dir,
            out_dir,
            config,
            students: BTreeMap::new(),
        })
    }

    /// Returns the input directory.
    pub fn in_dir(&self) -> &Path {
        &self.in_dir
    }

    /// Returns the output directory.
    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Returns the batch settings.
    pub fn config(&self) -> &GraderConfig {
        &self.config
    }

    /// Looks up one student.
    pub fn student(&self, id: &Identifier) -> Option<&Student> {
        self.students.get(id)
    }

    /// All students, ordered by identifier.
    pub fn students(&self) -> impl Iterator<Item = &Student> {
        self.students.values()
    }

    /// Groups the input files by student identifier.
    pub fn get_files_by_id(&mut self) -> Result<&BTreeMap<Identifier, Student>> {
        self.students = student::classify(&self.in_dir)?;
        info!(
            "Found {} students in {}",
            self.students.len(),
            self.in_dir.display()
        );
        Ok(&self.students)
    }

    /// Files copied next to every submission.
    fn extra_files(&self) -> Vec<PathBuf> {
        let Some(dir) = self.config.extras_dir.as_deref() else {
            return Vec::new();
        };
        match find_files("", false, dir) {
            Ok(files) => files,
            Err(e) => {
                warn!("Could not list extra files in {}: {e:#}", dir.display());
                Vec::new()
            }
        }
    }

    /// Creates the output directory and one working directory per student.
    ///
    /// A student whose directory cannot be built is logged and left without
    /// sources; the rest of the batch continues.
    pub fn make_folders(&mut self) -> Result<()> {
        fs::create_dir_all(&self.out_dir)
            .with_context(|| format!("Could not create {}", self.out_dir.display()))?;

        let extras = self.extra_files();
        for student in self.students.values_mut() {
            match student.make_folder(&self.out_dir, &self.config.source_suffixes, &extras) {
                Ok(dir) => debug!("Prepared {}", dir.display()),
                Err(e) => warn!("Could not prepare files for {}: {e:#}", student.id()),
            }
        }
        Ok(())
    }

    /// Compiles every student's sources, runs `pipeline` on each, and writes
    /// one report per student.
    ///
    /// Students are graded concurrently, up to the configured worker count.
    /// A student whose report cannot be written is logged and left out of
    /// the returned summary.
    pub async fn write_feedback(
        &self,
        pipeline: &Pipeline,
        compiler: &dyn Compile,
    ) -> Result<Vec<StudentSummary>> {
        fs::create_dir_all(&self.out_dir)
            .with_context(|| format!("Could not create {}", self.out_dir.display()))?;

        let results = stream::iter(self.students.values())
            .map(|student| async move {
                (student.id(), self.grade_student(student, pipeline, compiler).await)
            })
            .buffer_unordered(self.config.workers.max(1))
            .collect::<Vec<_>>()
            .await;

        let mut summaries = Vec::with_capacity(results.len());
        for (id, result) in results {
            match result {
                Ok(summary) => summaries.push(summary),
                Err(e) => warn!("No report for {id}: {e:#}"),
            }
        }
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(summaries)
    }

    /// Writes the report for one student.
    async fn grade_student(
        &self,
        student: &Student,
        pipeline: &Pipeline,
        compiler: &dyn Compile,
    ) -> Result<StudentSummary> {
        let mut report = Report::for_student(student.name(), student.id());
        let sources = student.source_files(&self.config.source_suffixes)?;

        let mut compiled = 0;
        for source in &sources {
            let mut unit = match CodeFile::new(source) {
                Ok(unit) => unit,
                Err(e) => {
                    warn!("{e}");
                    continue;
                }
            };
            unit.compile(compiler).await;
            if unit.compiled() {
                compiled += 1;
            }
            pipeline.run(&mut report, &mut unit).await;
        }

        let report_name = student.report_name();
        let path = self.out_dir.join(&report_name);
        report.persist(&path)?;
        info!("Wrote {}", path.display());

        Ok(StudentSummary {
            id: student.id().to_string(),
            name: student.name().to_string().trim().to_string(),
            sources: sources.len(),
            compiled,
            report: report_name,
        })
    }

    /// Classifies, materializes and reports on the whole batch.
    pub async fn run(
        &mut self,
        pipeline: &Pipeline,
        compiler: &dyn Compile,
    ) -> Result<Vec<StudentSummary>> {
        self.get_files_by_id()?;
        self.make_folders()?;
        self.write_feedback(pipeline, compiler).await
    }
}
