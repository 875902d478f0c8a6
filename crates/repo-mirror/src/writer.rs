use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{SyncError, io_err};

/// Classification of a single mirrored file write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// No local file existed; it was created.
    Added,
    /// Local content differed and was overwritten.
    Updated,
    /// Local content already matched; nothing was written.
    Unchanged,
}

/// Map a forward-slash remote path onto `local_root`.
///
/// Rejects empty, `.` and `..` segments so the result always stays under
/// the root.
pub fn local_path(local_root: &Path, relative_path: &str) -> Result<PathBuf, SyncError> {
    let mut path = local_root.to_path_buf();

    for segment in relative_path.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." || segment.contains('\\') {
            return Err(SyncError::InvalidPath(relative_path.to_owned()));
        }
        path.push(segment);
    }

    Ok(path)
}

/// Write `content` to `relative_path` under `local_root` if it differs from
/// what is on disk. Never deletes anything.
pub async fn write_file(
    local_root: &Path,
    relative_path: &str,
    content: &[u8],
) -> Result<(PathBuf, WriteOutcome), SyncError> {
    let path = local_path(local_root, relative_path)?;

    let outcome = match tokio::fs::read(&path).await {
        Ok(existing) if existing == content => WriteOutcome::Unchanged,
        Ok(_) => {
            tokio::fs::write(&path, content)
                .await
                .map_err(|e| io_err(&path, e))?;
            WriteOutcome::Updated
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| io_err(parent, e))?;
            }
            tokio::fs::write(&path, content)
                .await
                .map_err(|e| io_err(&path, e))?;
            WriteOutcome::Added
        }
        Err(e) => return Err(io_err(&path, e)),
    };

    tracing::trace!(path = %path.display(), ?outcome, "mirrored file");

    Ok((path, outcome))
}
