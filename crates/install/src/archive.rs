//! Archive format detection, executable selection and entry extraction
//!
//! Everything here is blocking I/O; callers run it on the blocking pool.

use flate2::read::GzDecoder;
use pinst_errors::{Error, InstallError};
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Component, Path};
use tokio_util::sync::CancellationToken;

const COPY_CHUNK: usize = 64 * 1024;
const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const USTAR_OFFSET: usize = 257;

/// Supported archive layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    TarGz,
    Tar,
    Zip,
    /// Not an archive: the download is the executable itself
    Raw,
}

impl ArchiveFormat {
    /// Guess from the file name alone
    #[must_use]
    pub fn from_file_name(name: &str) -> Option<Self> {
        let name = name.to_ascii_lowercase();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if name.ends_with(".tar") {
            Some(Self::Tar)
        } else if name.ends_with(".zip") {
            Some(Self::Zip)
        } else {
            None
        }
    }

    /// Guess from the leading bytes of the file
    #[must_use]
    pub fn from_magic(header: &[u8]) -> Self {
        if header.starts_with(GZIP_MAGIC) {
            Self::TarGz
        } else if header.starts_with(ZIP_MAGIC) {
            Self::Zip
        } else if header.get(USTAR_OFFSET..USTAR_OFFSET + 5) == Some(b"ustar") {
            Self::Tar
        } else {
            Self::Raw
        }
    }

    /// Detect the format of a downloaded file, name first, then content
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn detect(path: &Path) -> Result<Self, Error> {
        if let Some(format) = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(Self::from_file_name)
        {
            return Ok(format);
        }

        let mut header = Vec::with_capacity(512);
        File::open(path)
            .and_then(|f| f.take(512).read_to_end(&mut header))
            .map_err(|e| Error::io_with_path(&e, path))?;
        Ok(Self::from_magic(&header))
    }
}

/// A regular file inside an archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Normalized relative path, `/`-separated
    pub path: String,
    pub mode: Option<u32>,
    pub size: u64,
    index: usize,
}

impl ArchiveEntry {
    #[must_use]
    pub fn is_executable(&self) -> bool {
        self.mode.is_some_and(|mode| mode & 0o111 != 0)
    }

    fn matches_name(&self, name: &str) -> bool {
        let name = name.trim_start_matches("./");
        self.path == name || self.path.ends_with(&format!("/{name}"))
    }
}

fn malformed(message: impl Into<String>) -> Error {
    InstallError::MalformedArchive {
        message: message.into(),
    }
    .into()
}

/// Relative `/`-joined path; absolute paths and `..` are refused
fn normalize(path: &Path) -> Result<String, Error> {
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(malformed(format!(
                    "entry '{}' escapes the archive root",
                    path.display()
                )));
            }
        }
    }
    Ok(parts.join("/"))
}

fn open_tar(path: &Path, format: ArchiveFormat) -> Result<tar::Archive<Box<dyn Read>>, Error> {
    let file = File::open(path).map_err(|e| Error::io_with_path(&e, path))?;
    let reader: Box<dyn Read> = if format == ArchiveFormat::TarGz {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };
    Ok(tar::Archive::new(reader))
}

fn open_zip(path: &Path) -> Result<zip::ZipArchive<File>, Error> {
    let file = File::open(path).map_err(|e| Error::io_with_path(&e, path))?;
    zip::ZipArchive::new(file).map_err(|e| malformed(format!("cannot read zip archive: {e}")))
}

fn tar_error(e: &io::Error) -> Error {
    malformed(format!("cannot read tar archive: {e}"))
}

/// List every regular file in the archive
///
/// # Errors
///
/// Returns `MalformedArchive` for unreadable archives or entries whose path
/// is absolute or contains `..`.
pub fn list_files(path: &Path, format: ArchiveFormat) -> Result<Vec<ArchiveEntry>, Error> {
    match format {
        ArchiveFormat::TarGz | ArchiveFormat::Tar => {
            let mut archive = open_tar(path, format)?;
            let mut files = Vec::new();
            for (index, entry) in archive.entries().map_err(|e| tar_error(&e))?.enumerate() {
                let entry = entry.map_err(|e| tar_error(&e))?;
                let entry_path = entry.path().map_err(|e| tar_error(&e))?;
                let normalized = normalize(&entry_path)?;
                if !entry.header().entry_type().is_file() {
                    continue;
                }
                files.push(ArchiveEntry {
                    path: normalized,
                    mode: entry.header().mode().ok(),
                    size: entry.size(),
                    index,
                });
            }
            Ok(files)
        }
        ArchiveFormat::Zip => {
            let mut archive = open_zip(path)?;
            let mut files = Vec::new();
            for index in 0..archive.len() {
                let file = archive
                    .by_index(index)
                    .map_err(|e| malformed(format!("cannot read zip entry {index}: {e}")))?;
                let Some(enclosed) = file.enclosed_name() else {
                    return Err(malformed(format!(
                        "entry '{}' escapes the archive root",
                        file.name()
                    )));
                };
                let normalized = normalize(&enclosed)?;
                if !file.is_file() {
                    continue;
                }
                files.push(ArchiveEntry {
                    path: normalized,
                    mode: file.unix_mode(),
                    size: file.size(),
                    index,
                });
            }
            Ok(files)
        }
        ArchiveFormat::Raw => Err(malformed("not an archive")),
    }
}

/// Pick the single installable entry.
///
/// With a name, entries whose path is the name or ends in `/<name>` qualify
/// whatever their mode. Without one, every executable file qualifies.
///
/// # Errors
///
/// `MalformedArchive` unless exactly one entry qualifies.
pub fn select_entry(files: Vec<ArchiveEntry>, name: Option<&str>) -> Result<ArchiveEntry, Error> {
    let candidates: Vec<ArchiveEntry> = match name {
        Some(name) => files.into_iter().filter(|f| f.matches_name(name)).collect(),
        None => files.into_iter().filter(ArchiveEntry::is_executable).collect(),
    };

    let mut candidates = candidates.into_iter();
    match (candidates.next(), candidates.next()) {
        (Some(only), None) => Ok(only),
        (None, _) => Err(match name {
            Some(name) => malformed(format!("no file named '{name}' in archive")),
            None => malformed("no executable file in archive"),
        }),
        (Some(first), Some(second)) => {
            let mut names = vec![first.path, second.path];
            names.extend(candidates.map(|c| c.path));
            Err(malformed(format!(
                "{} candidate executables ({}); pick one with --entry",
                names.len(),
                names.join(", ")
            )))
        }
    }
}

/// Limits applied while an entry is copied out
#[derive(Debug, Clone, Copy)]
pub struct CopyLimits<'a> {
    /// Largest number of bytes written before the entry is refused
    pub max_size: u64,
    /// Checked between chunks
    pub cancel: &'a CancellationToken,
}

/// Copy `reader` into `out` chunk by chunk, stopping on cancellation or
/// when the entry grows past `limits.max_size`.
///
/// # Errors
///
/// `Cancelled`, `MalformedArchive` for oversized entries, `ExtractionFailed`
/// for read failures, or an I/O error if writing fails.
pub fn copy_bounded(
    name: &str,
    reader: &mut dyn Read,
    out: &mut dyn Write,
    limits: &CopyLimits<'_>,
) -> Result<u64, Error> {
    let mut buf = vec![0u8; COPY_CHUNK];
    let mut written: u64 = 0;
    loop {
        if limits.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let n = match reader.read(&mut buf) {
            Ok(0) => return Ok(written),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(InstallError::ExtractionFailed {
                    message: format!("{name}: {e}"),
                }
                .into())
            }
        };
        written += n as u64;
        if written > limits.max_size {
            return Err(malformed(format!(
                "entry '{name}' expands beyond {} bytes",
                limits.max_size
            )));
        }
        out.write_all(&buf[..n])?;
    }
}

/// Stream one entry's content into `out`
///
/// # Errors
///
/// Returns `ExtractionFailed` if the entry disappeared or cannot be read,
/// `MalformedArchive` if it exceeds the size limit, `Cancelled`, or an I/O
/// error if writing fails.
pub fn copy_entry(
    path: &Path,
    format: ArchiveFormat,
    wanted: &ArchiveEntry,
    out: &mut dyn Write,
    limits: &CopyLimits<'_>,
) -> Result<u64, Error> {
    let extraction = |e: &dyn std::fmt::Display| -> Error {
        InstallError::ExtractionFailed {
            message: format!("{}: {e}", wanted.path),
        }
        .into()
    };

    match format {
        ArchiveFormat::TarGz | ArchiveFormat::Tar => {
            let mut archive = open_tar(path, format)?;
            let entries = archive.entries().map_err(|e| extraction(&e))?;
            for (index, entry) in entries.enumerate() {
                let mut entry = entry.map_err(|e| extraction(&e))?;
                if index == wanted.index {
                    return copy_bounded(&wanted.path, &mut entry, out, limits);
                }
            }
            Err(extraction(&"entry not found on second read"))
        }
        ArchiveFormat::Zip => {
            let mut archive = open_zip(path)?;
            let mut file = archive
                .by_index(wanted.index)
                .map_err(|e| extraction(&e))?;
            copy_bounded(&wanted.path, &mut file, out, limits)
        }
        ArchiveFormat::Raw => {
            let mut file = File::open(path).map_err(|e| Error::io_with_path(&e, path))?;
            copy_bounded(&wanted.path, &mut file, out, limits)
        }
    }
}
