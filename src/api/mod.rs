//! Remote API facade

mod client;
pub mod folders;
pub mod types;

pub use client::SilverClient;
pub use folders::{decorate_lists, FolderIndex, ListEntry};
pub use types::{ExportFormat, ExportKind, ListType, RawExportTarget};
