use std::path::{Path, PathBuf};

use crate::remote::RemoteError;

/// Terminal error of a synchronization run.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid remote path: {0}")]
    InvalidPath(String),
}

pub(crate) fn io_err(path: &Path, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.to_path_buf(),
        source,
    }
}
