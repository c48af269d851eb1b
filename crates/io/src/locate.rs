// Discovery of the game's settings profile under the user's home directory.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::format::{sniff_format, FileFormat, SNIFF_LEN};
use crate::PROFILE_FILE_NAME;

/// Game folders under Documents, newest title first.
const GAME_FOLDERS: [&str; 2] = ["Battlefield 6", "Battlefield 2042"];

/// Spelling used by some backup folders.
const ALT_PROFILE_FILE_NAME: &str = "ProfSave_profile";

/// Documents roots in priority order: OneDrive-synced first.
fn document_roots(home: &Path) -> [PathBuf; 2] {
    [home.join("OneDrive").join("Documents"), home.join("Documents")]
}

/// Every candidate location that exists, in priority order.
pub fn candidates_in(home: &Path) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    let roots = document_roots(home);

    for root in roots.iter().filter(|r| r.is_dir()) {
        for game in GAME_FOLDERS {
            let settings = root.join(game).join("settings");
            paths.push(settings.join("steam").join(PROFILE_FILE_NAME));
            paths.push(settings.join(PROFILE_FILE_NAME));
        }
    }

    // Backup folders the game (or the user) left next to the live profile
    for root in roots.iter().filter(|r| r.is_dir()) {
        for game in GAME_FOLDERS {
            let Ok(entries) = fs::read_dir(root.join(game).join("settings")) else {
                continue;
            };
            let mut dirs: Vec<PathBuf> = entries
                .flatten()
                .map(|e| e.path())
                .filter(|p| {
                    p.is_dir()
                        && p.file_name()
                            .map_or(false, |n| n.to_string_lossy().to_lowercase().contains("backup"))
                })
                .collect();
            dirs.sort();
            for dir in dirs {
                paths.push(dir.join(PROFILE_FILE_NAME));
                paths.push(dir.join(ALT_PROFILE_FILE_NAME));
            }
        }
    }

    paths.retain(|p| p.is_file());
    paths.dedup();
    paths
}

/// True if the file exists and its head does not look like the binary variant.
pub fn is_text_profile(path: &Path) -> bool {
    let Ok(file) = fs::File::open(path) else {
        return false;
    };
    let mut head = Vec::with_capacity(SNIFF_LEN);
    if file.take(SNIFF_LEN as u64).read_to_end(&mut head).is_err() {
        return false;
    }
    sniff_format(&head) == FileFormat::Text
}

/// First text-format profile in priority order.
pub fn detect_in(home: &Path) -> Option<PathBuf> {
    candidates_in(home).into_iter().find(|p| is_text_profile(p))
}

/// All text-format profiles, most recently modified first.
pub fn discover_in(home: &Path) -> Vec<PathBuf> {
    let mut found: Vec<(SystemTime, PathBuf)> = candidates_in(home)
        .into_iter()
        .filter(|p| is_text_profile(p))
        .map(|p| {
            let modified = fs::metadata(&p)
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (modified, p)
        })
        .collect();
    found.sort_by(|a, b| b.0.cmp(&a.0));
    log::debug!("discovered {} text profile(s) under {}", found.len(), home.display());
    found.into_iter().map(|(_, p)| p).collect()
}

pub fn detect() -> Option<PathBuf> {
    dirs::home_dir().and_then(|home| detect_in(&home))
}

pub fn discover() -> Vec<PathBuf> {
    dirs::home_dir()
        .map(|home| discover_in(&home))
        .unwrap_or_default()
}
