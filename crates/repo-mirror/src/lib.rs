pub mod blob;
pub mod collect;
pub mod error;
pub mod mirror;
pub mod remote;
pub mod stale;
pub mod sync;
pub mod writer;

pub use collect::{RemoteFile, collect};
pub use error::SyncError;
pub use mirror::Mirror;
pub use remote::{Blob, ContentId, DirectoryEntry, RemoteError, RemoteRepository, TreeEntry};
pub use sync::{DEFAULT_CONCURRENCY, SyncOptions, SyncResult, SyncStage, synchronize};
pub use writer::WriteOutcome;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
