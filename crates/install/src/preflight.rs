use pinst_errors::{Error, InstallError};
use pinst_types::InstallTarget;

/// Make sure the destination can receive the executable before anything is
/// downloaded: the directory exists (it is created if missing), is writable,
/// and the target name is not taken by a directory.
///
/// # Errors
///
/// Returns `PermissionDenied` when the directory cannot be written and a
/// filesystem error for anything else.
pub async fn check_destination(target: &InstallTarget) -> Result<(), Error> {
    let dir = &target.directory;
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| InstallError::from_io("create directory", dir, &e))?;

    let scratch = tempfile::Builder::new()
        .prefix(".pinst-write-check.")
        .tempfile_in(dir)
        .map_err(|e| InstallError::from_io("write", dir, &e))?;
    drop(scratch);

    let path = target.path();
    if let Ok(meta) = tokio::fs::symlink_metadata(&path).await {
        if meta.is_dir() {
            return Err(InstallError::FilesystemError {
                operation: "install".to_string(),
                path: path.display().to_string(),
                message: "target exists and is a directory".to_string(),
            }
            .into());
        }
    }
    Ok(())
}
