// File I/O: the PROFSAVE text document, backup snapshots, config discovery

pub mod atomic;
pub mod backup;
pub mod document;
pub mod format;
pub mod locate;

pub use backup::{BackupHandle, BackupInfo, BackupLayout, BackupMetadata, BackupStore, RestoreReport};
pub use document::{ConfigDocument, LineEnding};
pub use format::{sniff_format, FileFormat};

/// File name the game uses for the user settings profile.
pub const PROFILE_FILE_NAME: &str = "PROFSAVE_profile";
