#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    collections::BTreeMap,
    fs,
    path::{Component, Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    archive,
    constants::{COVER_SUFFIX, MACOS_METADATA_DIR},
    error::GradeError,
    identity::{self, DisplayName, Identifier},
    util::{find_files, suffix_of},
};

/// Everything one student submitted, and the directory it is unpacked to.
#[derive(Debug, Clone, Serialize)]
pub struct Student {
    /// who the files belong to
    id:    Identifier,
    /// name parsed from the cover file
    name:  DisplayName,
    /// raw submitted files, in listing order
    files: Vec<PathBuf>,
    /// working directory, once materialized
    dir:   Option<PathBuf>,
}

impl Student {
    /// Creates a student with no files yet.
    pub fn new(id: Identifier) -> Self {
        Self {
            id,
            name: DisplayName::default(),
            files: Vec::new(),
            dir: None,
        }
    }

    /// Appends a raw file to this student's submission.
    pub fn add_file(&mut self, path: impl Into<PathBuf>) {
        self.files.push(path.into());
    }

    /// Returns the student's identifier.
    pub fn id(&self) -> &Identifier {
        &self.id
    }

    /// Returns the student's name; empty parts when unknown.
    pub fn name(&self) -> &DisplayName {
        &self.name
    }

    /// Returns the raw files in the order they were added.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Returns the working directory, if it has been made.
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// File name of this student's report: `{First}{Last}{Identifier}.txt`.
    pub fn report_name(&self) -> String {
        format!("{}{}{}.txt", self.name.first, self.name.last, self.id)
    }

    /// Builds the student's working directory under `out_dir`.
    ///
    /// Cover files and sources are copied in, archives are unpacked into a
    /// subdirectory named after the archive and also copied verbatim, and
    /// `extras` are copied alongside. Finally every nested source is
    /// [flattened](flatten) to the top level. Running this twice gives the
    /// same directory.
    pub fn make_folder(
        &mut self,
        out_dir: &Path,
        suffixes: &[String],
        extras: &[PathBuf],
    ) -> Result<&Path> {
        let dir = out_dir.join(self.id.as_str());
        fs::create_dir_all(&dir).with_context(|| format!("Could not create {}", dir.display()))?;

        for file in &self.files {
            let suffix = suffix_of(file);
            let suffix = suffix.as_deref();

            if suffix == Some(COVER_SUFFIX) {
                match identity::read_name(file) {
                    Ok(name) if self.name.is_empty() => self.name = name,
                    Ok(_) => {}
                    Err(e) => warn!("{e:#}"),
                }
            } else if archive::is_archive(file) {
                let stem = file.file_stem().unwrap_or_default();
                match archive::extract(file, &dir.join(stem)) {
                    Ok(()) => debug!("Extracted {}", file.display()),
                    Err(e) => warn!("Couldn't extract {}: {e}", file.display()),
                }
            } else if !suffix.is_some_and(|s| suffixes.iter().any(|t| t == s)) {
                debug!("Copying {} without unpacking", file.display());
            }

            copy_into(file, &dir)?;
        }

        for extra in extras {
            copy_into(extra, &dir)?;
        }

        flatten(&dir, suffixes)?;

        Ok(self.dir.insert(dir).as_path())
    }

    /// Top-level source files in the working directory, grouped by suffix in
    /// the order of `suffixes` and sorted by name within each group.
    pub fn source_files(&self, suffixes: &[String]) -> Result<Vec<PathBuf>> {
        let Some(dir) = self.dir.as_deref() else {
            return Ok(Vec::new());
        };

        let mut sources = Vec::new();
        for suffix in suffixes {
            sources.extend(find_files(suffix, false, dir)?);
        }
        Ok(sources)
    }
}

/// Copies `file` into `dir`, keeping its name and replacing any earlier copy.
fn copy_into(file: &Path, dir: &Path) -> Result<()> {
    let name = file
        .file_name()
        .with_context(|| format!("{} has no file name", file.display()))?;
    fs::copy(file, dir.join(name))
        .with_context(|| format!("Could not copy {} to {}", file.display(), dir.display()))?;
    Ok(())
}

/// Groups the raw files of `in_dir` by the student id found in each name.
///
/// Every file lands in exactly one [`Student`]; files without an id share
/// the [`Identifier::Unresolved`] student. Hidden files are ignored.
pub fn classify(in_dir: &Path) -> Result<BTreeMap<Identifier, Student>, GradeError> {
    let mut entries = fs::read_dir(in_dir)
        .map_err(|source| GradeError::InputDirectory {
            path: in_dir.to_path_buf(),
            source,
        })?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .filter(|path| {
            !path
                .file_name()
                .is_some_and(|name| name.to_string_lossy().starts_with('.'))
        })
        .collect::<Vec<_>>();
    entries.sort();

    let mut students: BTreeMap<Identifier, Student> = BTreeMap::new();
    for path in entries {
        let id = identity::resolve(&path);
        if id.is_unresolved() {
            debug!("No student id in {}", path.display());
        }
        students
            .entry(id.clone())
            .or_insert_with(|| Student::new(id))
            .add_file(path);
    }

    Ok(students)
}

/// What a flattening pass did.
#[derive(Debug, Default)]
pub struct Flattened {
    /// sources moved to the top level, at their new paths
    pub moved:   Vec<PathBuf>,
    /// nested sources left in place because a different file has the name
    pub skipped: Vec<GradeError>,
}

/// True when both files exist and hold the same bytes.
fn same_contents(a: &Path, b: &Path) -> bool {
    match (fs::read(a), fs::read(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// True when `path` lies inside a macOS resource-fork directory.
fn in_macos_metadata(path: &Path) -> bool {
    path.components()
        .any(|c| matches!(c, Component::Normal(name) if name == MACOS_METADATA_DIR))
}

/// Moves every source file nested anywhere below `dir` up to `dir` itself.
///
/// Files already at the top level and files with other suffixes stay where
/// they are. A move that would replace an existing top-level file is skipped
/// and logged, so both files survive.
pub fn flatten(dir: &Path, suffixes: &[String]) -> Result<Flattened> {
    let mut result = Flattened::default();

    for suffix in suffixes {
        for path in find_files(suffix, true, dir)? {
            let Ok(relative) = path.strip_prefix(dir) else {
                continue;
            };
            if relative.components().count() < 2 || in_macos_metadata(relative) {
                continue;
            }
            let Some(name) = path.file_name() else {
                continue;
            };

            let target = dir.join(name);
            if same_contents(&path, &target) {
                debug!("{} is already at the top level", relative.display());
                fs::remove_file(&path)
                    .with_context(|| format!("Could not remove {}", path.display()))?;
                continue;
            }
            if target.exists() {
                let collision = GradeError::FilenameCollision {
                    name: name.to_string_lossy().into_owned(),
                    dir:  dir.to_path_buf(),
                };
                warn!("{collision}; could not move {}", relative.display());
                result.skipped.push(collision);
                continue;
            }

            fs::rename(&path, &target).with_context(|| {
                format!("Could not move {} to {}", path.display(), dir.display())
            })?;
            result.moved.push(target);
        }
    }

    Ok(result)
}
