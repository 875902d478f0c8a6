pub mod format;
pub mod list;
pub mod sync;
