// Backup snapshots of the config file
//
// Layout: one directory per backup under the root, holding a copy of the
// config file (original name kept) and a `metadata.json` sidecar. Flat files
// directly under the root (`<name>_<YYYYMMDD>_<HHMMSS>[.ext]`, written by older
// tools or by hand) are listed too, with metadata synthesized from the name.
// Anything else under the root is not a backup and is never listed or removed.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use fieldtuner_core::{FieldTunerError, Resource, Result};

use crate::atomic::copy_atomic;

pub const METADATA_FILE: &str = "metadata.json";

/// Longest description fragment kept in a backup identifier.
pub const DESCRIPTION_MAX: usize = 30;

const NO_METADATA: &str = "No metadata";

/// Sidecar record written next to each backup copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupMetadata {
    /// `YYYYMMDD_HHMMSS_mmm`, local time
    pub timestamp: String,
    /// RFC 3339
    pub datetime: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub original_path: String,
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub file_size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupLayout {
    /// Directory with copy + sidecar
    Directory,
    /// Single legacy file, no sidecar
    Flat,
}

/// Identifier and location of a freshly created backup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupHandle {
    pub id: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct BackupInfo {
    pub id: String,
    pub path: PathBuf,
    pub layout: BackupLayout,
    pub created: DateTime<Local>,
    pub description: String,
    pub original_path: Option<String>,
    pub file_name: Option<String>,
    pub size: u64,
    /// False when the metadata was synthesized.
    pub has_metadata: bool,
}

impl BackupInfo {
    pub fn size_display(&self) -> String {
        human_size(self.size)
    }
}

#[derive(Debug, Clone)]
pub struct RestoreReport {
    pub restored: String,
    /// Snapshot of the target taken just before it was overwritten.
    pub safety_backup: Option<BackupHandle>,
    pub bytes: u64,
}

impl RestoreReport {
    pub fn message(&self) -> String {
        match &self.safety_backup {
            Some(safety) => format!("Restored from {} (previous file kept as {})", self.restored, safety.id),
            None => format!("Restored from {}", self.restored),
        }
    }
}

/// Creates, lists, restores and deletes snapshots under one root directory.
#[derive(Debug, Clone)]
pub struct BackupStore {
    root: PathBuf,
}

impl BackupStore {
    /// Open (and create if needed) the backup root.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| FieldTunerError::io("create backup directory", &root, e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Snapshot `source` with a human description.
    pub fn create(&self, source: impl AsRef<Path>, description: &str) -> Result<BackupHandle> {
        let source = source.as_ref();
        let source_meta = fs::metadata(source).map_err(|e| FieldTunerError::from_read(source, e))?;
        if !source_meta.is_file() {
            return Err(FieldTunerError::not_found(
                Resource::ConfigFile,
                source.display().to_string(),
            ));
        }

        let now = Local::now();
        let timestamp = now.format("%Y%m%d_%H%M%S_%3f").to_string();
        let mut base = format!("backup_{timestamp}");
        let safe = sanitize_description(description);
        if !safe.is_empty() {
            base.push('_');
            base.push_str(&safe);
        }
        let (id, dir) = self.claim_dir(&base)?;

        let file_name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| crate::PROFILE_FILE_NAME.to_string());
        let copy = dir.join(&file_name);

        let written = fs::copy(source, &copy)
            .map_err(|e| FieldTunerError::io("copy", source, e))
            .and_then(|_| verify_copy(&copy, source_meta.len()))
            .and_then(|_| {
                let metadata = BackupMetadata {
                    timestamp,
                    datetime: now.to_rfc3339(),
                    description: description.to_string(),
                    original_path: source.display().to_string(),
                    file_name: file_name.clone(),
                    file_size: source_meta.len(),
                };
                write_metadata(&dir, &metadata)
            });

        if let Err(e) = written {
            let _ = fs::remove_dir_all(&dir);
            return Err(e);
        }

        log::info!("created backup {id} of {}", source.display());
        Ok(BackupHandle { id, path: dir })
    }

    /// Claim a fresh directory for `base`, suffixing `-2`, `-3`, ... on collision.
    fn claim_dir(&self, base: &str) -> Result<(String, PathBuf)> {
        let mut n = 1u32;
        loop {
            let id = if n == 1 {
                base.to_string()
            } else {
                format!("{base}-{n}")
            };
            let dir = self.root.join(&id);
            match fs::create_dir(&dir) {
                Ok(()) => return Ok((id, dir)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => n += 1,
                Err(e) => return Err(FieldTunerError::io("create backup", &dir, e)),
            }
        }
    }

    /// All backups, newest first.
    pub fn list(&self) -> Result<Vec<BackupInfo>> {
        let entries = fs::read_dir(&self.root).map_err(|e| FieldTunerError::io("list", &self.root, e))?;

        let mut backups = Vec::new();
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            match describe(&entry.path(), &name) {
                Ok(Some(info)) => backups.push(info),
                Ok(None) => log::debug!("ignoring {name}: not a backup"),
                Err(e) => log::warn!("skipping unreadable backup {name}: {e}"),
            }
        }

        backups.sort_by(|a, b| b.created.cmp(&a.created).then_with(|| b.id.cmp(&a.id)));
        Ok(backups)
    }

    /// Metadata for one backup.
    pub fn get(&self, id: &str) -> Result<BackupInfo> {
        let path = self.locate(id)?;
        describe(&path, id)
            .map_err(|e| FieldTunerError::io("read backup", &path, e))?
            .ok_or_else(|| FieldTunerError::not_found(Resource::Backup, id))
    }

    fn locate(&self, id: &str) -> Result<PathBuf> {
        let valid = !id.is_empty()
            && !id.starts_with('.')
            && !id.contains(['/', '\\'])
            && Path::new(id).file_name().is_some();
        let path = self.root.join(id);
        if !valid || fs::symlink_metadata(&path).is_err() {
            return Err(FieldTunerError::not_found(Resource::Backup, id));
        }
        Ok(path)
    }

    /// Copy backup `id` over `target`. The current `target` is backed up first
    /// (described as `pre-restore <id>`); if that fails nothing is overwritten.
    pub fn restore(&self, id: &str, target: impl AsRef<Path>) -> Result<RestoreReport> {
        let target = target.as_ref();
        let info = self.get(id)?;
        let content = content_file(&info)
            .ok_or_else(|| FieldTunerError::not_found(Resource::BackupContent, id))?;

        let safety_backup = if target.is_file() {
            Some(self.create(target, &format!("pre-restore {id}"))?)
        } else {
            None
        };

        let bytes = copy_atomic(&content, target).map_err(|e| FieldTunerError::io("restore", target, e))?;
        log::info!("restored backup {id} to {}", target.display());

        Ok(RestoreReport {
            restored: id.to_string(),
            safety_backup,
            bytes,
        })
    }

    /// Remove a backup (copy and sidecar) permanently.
    pub fn delete(&self, id: &str) -> Result<()> {
        let path = self.get(id)?.path;
        let removed = if path.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        removed.map_err(|e| FieldTunerError::io("delete", &path, e))?;
        log::info!("deleted backup {id}");
        Ok(())
    }

    /// Keep the `keep_count` newest backups, delete the rest. Returns how many were removed.
    pub fn cleanup(&self, keep_count: usize) -> Result<usize> {
        let backups = self.list()?;
        if backups.len() <= keep_count {
            return Ok(0);
        }

        let mut removed = 0;
        for backup in &backups[keep_count..] {
            self.delete(&backup.id)?;
            removed += 1;
        }
        log::info!("backup cleanup removed {removed}, kept {keep_count}");
        Ok(removed)
    }

    /// Delete backups created more than `max_age` ago.
    pub fn cleanup_older_than(&self, max_age: chrono::Duration) -> Result<usize> {
        let cutoff = Local::now() - max_age;
        let mut removed = 0;
        for backup in self.list()?.iter().filter(|b| b.created < cutoff) {
            self.delete(&backup.id)?;
            removed += 1;
        }
        Ok(removed)
    }
}

/// Keep ASCII alphanumerics, `-` and `_`; map everything else to `_`; truncate.
pub fn sanitize_description(description: &str) -> String {
    description
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .take(DESCRIPTION_MAX)
        .collect()
}

pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{size:.1} {}", UNITS[unit])
}

fn verify_copy(copy: &Path, expected: u64) -> Result<()> {
    match fs::metadata(copy) {
        Ok(meta) if meta.len() == expected => Ok(()),
        Ok(meta) => Err(FieldTunerError::io(
            "verify",
            copy,
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("copied {} bytes, expected {expected}", meta.len()),
            ),
        )),
        Err(e) => Err(FieldTunerError::io("verify", copy, e)),
    }
}

fn write_metadata(dir: &Path, metadata: &BackupMetadata) -> Result<()> {
    let path = dir.join(METADATA_FILE);
    let json = serde_json::to_string_pretty(metadata)
        .map_err(|e| FieldTunerError::io("write", &path, io::Error::new(io::ErrorKind::InvalidData, e)))?;
    fs::write(&path, json).map_err(|e| FieldTunerError::io("write", &path, e))
}

/// Build a `BackupInfo` for a directory or flat file under the root.
/// `None` for entries that are not backups: a flat file without a timestamp
/// in its name, or a directory with neither a sidecar nor a timestamped name.
fn describe(path: &Path, id: &str) -> io::Result<Option<BackupInfo>> {
    let fs_meta = fs::metadata(path)?;

    if fs_meta.is_file() {
        let Some(created) = name_timestamp(id) else {
            return Ok(None);
        };
        return Ok(Some(BackupInfo {
            id: id.to_string(),
            path: path.to_path_buf(),
            layout: BackupLayout::Flat,
            created,
            description: NO_METADATA.to_string(),
            original_path: None,
            file_name: Some(id.to_string()),
            size: fs_meta.len(),
            has_metadata: false,
        }));
    }

    let sidecar = fs::read_to_string(path.join(METADATA_FILE))
        .ok()
        .and_then(|json| match serde_json::from_str::<BackupMetadata>(&json) {
            Ok(meta) => Some(meta),
            Err(e) => {
                log::warn!("ignoring malformed {METADATA_FILE} in {id}: {e}");
                None
            }
        });
    let named = name_timestamp(id);
    if sidecar.is_none() && named.is_none() {
        return Ok(None);
    }

    let mut info = BackupInfo {
        id: id.to_string(),
        path: path.to_path_buf(),
        layout: BackupLayout::Directory,
        created: named.unwrap_or_else(|| modified(&fs_meta)),
        description: NO_METADATA.to_string(),
        original_path: None,
        file_name: None,
        size: 0,
        has_metadata: false,
    };

    if let Some(meta) = sidecar {
        if let Ok(dt) = DateTime::parse_from_rfc3339(&meta.datetime) {
            info.created = dt.with_timezone(&Local);
        }
        info.description = meta.description;
        info.original_path = Some(meta.original_path).filter(|p| !p.is_empty());
        info.file_name = Some(meta.file_name).filter(|n| !n.is_empty());
        info.size = meta.file_size;
        info.has_metadata = true;
    }

    if let Some(content) = content_file(&info) {
        if info.file_name.is_none() {
            info.file_name = content.file_name().map(|n| n.to_string_lossy().into_owned());
        }
        if !info.has_metadata {
            info.size = fs::metadata(&content).map(|m| m.len()).unwrap_or(0);
        }
    }

    Ok(Some(info))
}

/// The config copy inside a backup: the sidecar's file name if present,
/// else the first regular file that is not the sidecar.
fn content_file(info: &BackupInfo) -> Option<PathBuf> {
    if info.layout == BackupLayout::Flat {
        return Some(info.path.clone());
    }

    if let Some(name) = &info.file_name {
        let named = info.path.join(name);
        if named.is_file() {
            return Some(named);
        }
    }

    let mut files: Vec<PathBuf> = fs::read_dir(&info.path)
        .ok()?
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.file_name().map_or(false, |n| n != METADATA_FILE))
        .collect();
    files.sort();
    files.into_iter().next()
}

/// `YYYYMMDD_HHMMSS[_mmm]` embedded anywhere in a backup name.
fn name_timestamp(name: &str) -> Option<DateTime<Local>> {
    let parts: Vec<&str> = name.split(['_', '-', '.']).collect();
    let digits = |s: &str, n: usize| s.len() == n && s.bytes().all(|b| b.is_ascii_digit());

    let i = parts
        .windows(2)
        .position(|w| digits(w[0], 8) && digits(w[1], 6))?;
    let mut naive =
        NaiveDateTime::parse_from_str(&format!("{}{}", parts[i], parts[i + 1]), "%Y%m%d%H%M%S").ok()?;
    if let Some(ms) = parts.get(i + 2).filter(|s| digits(**s, 3)) {
        naive += chrono::Duration::milliseconds(ms.parse().ok()?);
    }
    Local.from_local_datetime(&naive).earliest()
}

fn modified(meta: &fs::Metadata) -> DateTime<Local> {
    meta.modified()
        .map(DateTime::<Local>::from)
        .unwrap_or_else(|_| Local::now())
}
