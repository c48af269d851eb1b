// Application settings
// Loaded from ~/.config/fieldtuner/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use fieldtuner_core::ValidationPolicy;

/// Process names that mean the game is running.
pub const DEFAULT_GUARDED_PROCESSES: [&str; 4] =
    ["bf6.exe", "bf2042.exe", "battlefield6.exe", "battlefield2042.exe"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    // Config file
    /// Preferred PROFSAVE path; auto-discovery when unset
    #[serde(rename = "config.path", skip_serializing_if = "Option::is_none")]
    pub config_path: Option<PathBuf>,

    // Backups
    #[serde(rename = "backup.directory", skip_serializing_if = "Option::is_none")]
    pub backup_directory: Option<PathBuf>,

    #[serde(rename = "backup.keepCount")]
    pub keep_count: usize,

    #[serde(rename = "backup.retentionDays")]
    pub retention_days: u32,

    // Run-state guard
    #[serde(rename = "guard.processNames")]
    pub guarded_processes: Vec<String>,

    // Editing
    #[serde(rename = "editor.validation")]
    pub validation: ValidationPolicy,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            config_path: None,
            backup_directory: None,
            keep_count: 20,
            retention_days: 30,
            guarded_processes: DEFAULT_GUARDED_PROCESSES.iter().map(|s| s.to_string()).collect(),
            validation: ValidationPolicy::Reject,
        }
    }
}

impl AppSettings {
    /// Get the settings file path
    pub fn file_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fieldtuner")
            .join("settings.json")
    }

    /// Backup root used when `backup.directory` is unset.
    pub fn default_backup_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fieldtuner")
            .join("backups")
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.backup_directory
            .clone()
            .unwrap_or_else(Self::default_backup_dir)
    }

    /// Load settings from disk, falling back to defaults
    pub fn load() -> Self {
        Self::load_from(&Self::file_path())
    }

    pub fn load_from(path: &Path) -> Self {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                log::warn!("error reading {}: {e}; using default settings", path.display());
                return Self::default();
            }
        };

        // Strip comments (lines starting with //)
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");

        match serde_json::from_str(&cleaned) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("error parsing {}: {e}; using default settings", path.display());
                Self::default()
            }
        }
    }

    /// Save current settings to disk
    pub fn save(&self) -> io::Result<()> {
        self.save_to(&Self::file_path())
    }

    pub fn save_to(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, json)
    }
}
