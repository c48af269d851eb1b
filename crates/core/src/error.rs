use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

pub type Result<T> = std::result::Result<T, FieldTunerError>;

/// What a `NotFound` error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    ConfigFile,
    Backup,
    /// The backup exists but holds no config file to copy back.
    BackupContent,
    Preset,
    Setting,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigFile => write!(f, "config file"),
            Self::Backup => write!(f, "backup"),
            Self::BackupContent => write!(f, "config file in backup"),
            Self::Preset => write!(f, "preset"),
            Self::Setting => write!(f, "setting"),
        }
    }
}

#[derive(Debug)]
pub enum FieldTunerError {
    /// Unsupported file format (binary PROFSAVE variant).
    Format { path: PathBuf, reason: String },
    /// Missing file, backup, preset or setting.
    NotFound { resource: Resource, name: String },
    /// Write blocked by an external guard (target application running).
    Precondition(String),
    /// Filesystem failure. `op` names what was being attempted.
    Io {
        op: &'static str,
        path: PathBuf,
        source: io::Error,
    },
    /// Value rejected by the registered setting's type or range, or one that
    /// cannot be stored as a single `KEY VALUE` line.
    Validation { key: String, reason: String },
    /// Malformed registry or preset table.
    Catalog(String),
}

impl FieldTunerError {
    pub fn io(op: &'static str, path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Io {
            op,
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn not_found(resource: Resource, name: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            name: name.into(),
        }
    }

    pub fn validation(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Map a read failure on `path`: a missing file becomes `NotFound`,
    /// anything else stays an `Io` error.
    pub fn from_read(path: impl AsRef<Path>, source: io::Error) -> Self {
        let path = path.as_ref();
        if source.kind() == io::ErrorKind::NotFound {
            Self::not_found(Resource::ConfigFile, path.display().to_string())
        } else {
            Self::io("read", path, source)
        }
    }
}

/// Plain-words reason for an I/O failure.
fn describe_io(err: &io::Error) -> String {
    match err.kind() {
        io::ErrorKind::NotFound => "not found".to_string(),
        io::ErrorKind::PermissionDenied => "permission denied".to_string(),
        io::ErrorKind::AlreadyExists => "already exists".to_string(),
        io::ErrorKind::InvalidData => "corrupted or unreadable data".to_string(),
        // Windows reports sharing violations (file held open by the game) as raw OS error 32.
        _ if err.raw_os_error() == Some(32) => "in use by another process".to_string(),
        _ => err.to_string(),
    }
}

impl fmt::Display for FieldTunerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Format { path, reason } => {
                write!(f, "unsupported file format '{}': {reason}", path.display())
            }
            Self::NotFound { resource, name } => write!(f, "{resource} not found: {name}"),
            Self::Precondition(msg) => write!(f, "cannot write: {msg}"),
            Self::Io { op, path, source } => {
                write!(f, "cannot {op} '{}': {}", path.display(), describe_io(source))
            }
            Self::Validation { key, reason } => write!(f, "invalid value for {key}: {reason}"),
            Self::Catalog(msg) => write!(f, "catalog error: {msg}"),
        }
    }
}

impl std::error::Error for FieldTunerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_resource_and_reason() {
        let err = FieldTunerError::not_found(Resource::Backup, "backup_20250101_120000_000");
        assert_eq!(err.to_string(), "backup not found: backup_20250101_120000_000");

        let err = FieldTunerError::io(
            "write",
            "/tmp/PROFSAVE_profile",
            io::Error::from(io::ErrorKind::PermissionDenied),
        );
        assert_eq!(
            err.to_string(),
            "cannot write '/tmp/PROFSAVE_profile': permission denied"
        );

        let err = FieldTunerError::validation("GstRender.FullscreenMode", "out of range 0..=2");
        assert_eq!(
            err.to_string(),
            "invalid value for GstRender.FullscreenMode: out of range 0..=2"
        );
    }

    #[test]
    fn read_of_missing_file_is_not_found() {
        let err = FieldTunerError::from_read(
            "PROFSAVE_profile",
            io::Error::from(io::ErrorKind::NotFound),
        );
        assert!(matches!(
            err,
            FieldTunerError::NotFound { resource: Resource::ConfigFile, .. }
        ));
    }

    #[test]
    fn io_error_keeps_source() {
        use std::error::Error;
        let err = FieldTunerError::io("copy", "a", io::Error::new(io::ErrorKind::Other, "disk full"));
        assert!(err.source().is_some());
    }
}
