#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    fs::{self, File},
    io,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use tracing::debug;
use zip::ZipArchive;

/// An enum to represent possible errors while unpacking an archive
#[derive(thiserror::Error, Debug)]
pub enum ExtractionError {
    /// The file extension does not name an archive format we can unpack.
    #[error("{0} is not a supported archive")]
    Unsupported(PathBuf),
    /// The external tool could not be started.
    #[error("could not start `{tool}`: {source}")]
    Spawn {
        /// tool name
        tool:   &'static str,
        /// spawn error
        #[source]
        source: io::Error,
    },
    /// The external tool ran and exited non-zero.
    #[error("`{tool}` exited with code {code} while extracting {archive}: {stderr}")]
    ToolFailed {
        /// tool name
        tool:    &'static str,
        /// exit code, `-1` when killed by a signal
        code:    i32,
        /// archive being extracted
        archive: PathBuf,
        /// what the tool printed to stderr
        stderr:  String,
    },
    /// The zip reader rejected the archive.
    #[error("could not read zip archive {archive}: {source}")]
    Zip {
        /// archive being extracted
        archive: PathBuf,
        /// reader error
        #[source]
        source:  zip::result::ZipError,
    },
    /// Creating directories or writing entries failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Archive formats recognized by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    /// `.zip`, unpacked in-process
    Zip,
    /// `.rar`
    Rar,
    /// `.7z`, `.tar`, `.gz`, `.tgz`, `.bz2`, `.xz`, handed to `7z`
    SevenZip,
}

impl ArchiveKind {
    /// Recognizes the archive format of `path` from its extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "zip" => Some(ArchiveKind::Zip),
            "rar" => Some(ArchiveKind::Rar),
            "7z" | "tar" | "gz" | "tgz" | "bz2" | "xz" => Some(ArchiveKind::SevenZip),
            _ => None,
        }
    }
}

/// True when `path` has an archive extension.
pub fn is_archive(path: &Path) -> bool {
    ArchiveKind::from_path(path).is_some()
}

/// Unpacks `archive` into `destination`, creating the directory if needed.
///
/// Zip files are read in-process. `.rar` files go to `unrar` on macOS; every
/// other format goes to `7z`. A tool that exits zero is treated as success
/// even if it printed warnings.
pub fn extract(archive: &Path, destination: &Path) -> Result<(), ExtractionError> {
    let kind = ArchiveKind::from_path(archive)
        .ok_or_else(|| ExtractionError::Unsupported(archive.to_path_buf()))?;
    fs::create_dir_all(destination)?;

    match kind {
        ArchiveKind::Zip => extract_zip(archive, destination),
        ArchiveKind::Rar if cfg!(target_os = "macos") => {
            let mut dest = destination.as_os_str().to_owned();
            dest.push("/");
            run_tool("unrar", archive, |cmd| {
                cmd.arg("x").arg("-o+").arg(archive).arg(&dest);
            })
        }
        ArchiveKind::Rar | ArchiveKind::SevenZip => {
            let mut out_flag = std::ffi::OsString::from("-o");
            out_flag.push(destination.as_os_str());
            run_tool("7z", archive, |cmd| {
                cmd.arg("x").arg("-y").arg(&out_flag).arg(archive);
            })
        }
    }
}

/// Writes every entry of a zip archive below `destination`.
///
/// Entries whose names would escape `destination` are skipped.
fn extract_zip(archive: &Path, destination: &Path) -> Result<(), ExtractionError> {
    let zip_err = |source| ExtractionError::Zip {
        archive: archive.to_path_buf(),
        source,
    };
    let mut zip = ZipArchive::new(File::open(archive)?).map_err(zip_err)?;

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).map_err(zip_err)?;
        let Some(relative) = entry.enclosed_name() else {
            debug!("Skipping unsafe entry {} in {}", entry.name(), archive.display());
            continue;
        };
        let outpath = destination.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&outpath)?;
        } else {
            if let Some(parent) = outpath.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut outfile = File::create(&outpath)?;
            io::copy(&mut entry, &mut outfile)?;
        }
    }

    Ok(())
}

/// Runs an external extraction tool configured by `configure` and maps its
/// exit status.
fn run_tool(
    tool: &'static str,
    archive: &Path,
    configure: impl FnOnce(&mut Command),
) -> Result<(), ExtractionError> {
    let mut cmd = Command::new(tool);
    configure(&mut cmd);
    let output = cmd
        .stdin(Stdio::null())
        .output()
        .map_err(|source| ExtractionError::Spawn { tool, source })?;

    if output.status.success() {
        Ok(())
    } else {
        Err(ExtractionError::ToolFailed {
            tool,
            code: output.status.code().unwrap_or(-1),
            archive: archive.to_path_buf(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}
