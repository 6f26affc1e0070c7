//! Atomic placement: stage next to the target, then rename over it

use crate::archive::{
    copy_bounded, copy_entry, list_files, select_entry, ArchiveFormat, CopyLimits,
};
use crate::lock::DestinationLock;
use pinst_errors::{Error, InstallError};
use pinst_types::{InstallTarget, MODE_MASK};
use std::fs::Permissions;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio_util::sync::CancellationToken;

/// What to extract and where to stage it
#[derive(Debug, Clone)]
pub struct StageRequest {
    pub archive: PathBuf,
    pub format: ArchiveFormat,
    /// Executable to pick inside the archive
    pub entry: Option<String>,
    pub target: InstallTarget,
    /// Largest executable accepted, in bytes
    pub max_size: u64,
}

/// Extract the selected executable into a temporary file inside the
/// destination directory.
///
/// The copy runs on the blocking pool and checks `cancel` between chunks;
/// a cancelled copy deletes its temporary file before this returns. If
/// this future is dropped instead, the copy is cancelled and `lock` stays
/// held until the blocking task has removed its temporary file.
///
/// # Errors
///
/// Returns `Cancelled`, `MalformedArchive` if no single executable can be
/// selected or it exceeds `max_size`, or a filesystem error if the staging
/// file cannot be written.
pub async fn stage_entry(
    request: StageRequest,
    lock: Arc<DestinationLock>,
    cancel: &CancellationToken,
) -> Result<NamedTempFile, Error> {
    let token = cancel.child_token();
    // fires if this future is dropped mid-copy
    let _abort_on_drop = token.clone().drop_guard();

    tokio::task::spawn_blocking(move || {
        let _lock = lock;
        stage_blocking(&request, &token)
    })
    .await
    .map_err(|e| InstallError::TaskError {
        message: e.to_string(),
    })?
}

fn stage_blocking(
    request: &StageRequest,
    cancel: &CancellationToken,
) -> Result<NamedTempFile, Error> {
    let StageRequest {
        archive,
        format,
        entry,
        target,
        max_size,
    } = request;

    let selected = match format {
        ArchiveFormat::Raw => None,
        _ => Some(select_entry(list_files(archive, *format)?, entry.as_deref())?),
    };
    if let Some(selected) = &selected {
        tracing::debug!(entry = %selected.path, ?format, "selected executable");
    }

    let dir = &target.directory;
    let mut staged = tempfile::Builder::new()
        .prefix(&format!(".{}.", target.file_name))
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| InstallError::from_io("create staging file", dir, &e))?;

    let limits = CopyLimits {
        max_size: *max_size,
        cancel,
    };
    let copied = match &selected {
        Some(selected) => {
            copy_entry(archive, *format, selected, staged.as_file_mut(), &limits)
        }
        None => open_raw(archive).and_then(|mut source| {
            copy_bounded(&target.file_name, &mut source, staged.as_file_mut(), &limits)
        }),
    };
    if let Err(e) = copied {
        if matches!(e, Error::Cancelled) {
            tracing::debug!(staging = %staged.path().display(), "staging cancelled");
        }
        // dropping `staged` removes the partial file
        return Err(e);
    }

    std::fs::set_permissions(staged.path(), Permissions::from_mode(target.mode & MODE_MASK))
        .map_err(|e| InstallError::from_io("chmod", staged.path(), &e))?;
    staged
        .as_file()
        .sync_all()
        .map_err(|e| InstallError::from_io("sync", staged.path(), &e))?;

    Ok(staged)
}

fn open_raw(archive: &Path) -> Result<std::fs::File, Error> {
    std::fs::File::open(archive).map_err(|e| Error::io_with_path(&e, archive))
}

/// Rename the staged file onto the target path. Returns whether a previous
/// file was replaced.
///
/// # Errors
///
/// Returns a filesystem error if the rename fails; the target is untouched
/// in that case.
pub fn persist(staged: NamedTempFile, target: &InstallTarget) -> Result<bool, Error> {
    let path = target.path();
    let replaced = path.exists();

    let file = staged
        .persist(&path)
        .map_err(|e| InstallError::from_io("rename", &path, &e.error))?;
    // exec fails with ETXTBSY while a writable handle is open
    drop(file);

    if let Ok(dir) = std::fs::File::open(&target.directory) {
        let _ = dir.sync_all();
    }

    Ok(replaced)
}
