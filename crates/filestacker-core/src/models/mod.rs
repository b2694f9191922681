//! Data models for FileStacker

mod account;
mod file;
mod session;

pub use account::{SettingsUpdate, StorageStats, ThemeMode, UserSettings};
pub use file::{derive_kind, human_size, FileId, FileKind, FileRecord, OwnerRef, RawFileRecord};
pub use session::{Session, StoredSession};
