// Atomic file replacement: write a sibling temp file, then rename over the target.
// A failed write leaves the target untouched.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "fieldtuner".to_string());
    path.with_file_name(format!(".{name}.tmp"))
}

/// Replace `path` with `contents` in one rename.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let temp = temp_path(path);

    let written = (|| {
        let mut file = fs::File::create(&temp)?;
        file.write_all(contents)?;
        file.sync_all()
    })();
    if let Err(e) = written {
        let _ = fs::remove_file(&temp);
        return Err(e);
    }

    if let Err(e) = fs::rename(&temp, path) {
        log::debug!("rename {} -> {} failed: {e}", temp.display(), path.display());
        let _ = fs::remove_file(&temp);
        return Err(e);
    }
    Ok(())
}

/// Copy `from` over `to` atomically.
pub fn copy_atomic(from: &Path, to: &Path) -> io::Result<u64> {
    let bytes = fs::read(from)?;
    write_atomic(to, &bytes)?;
    Ok(bytes.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn replaces_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("PROFSAVE_profile");
        fs::write(&path, "old\n").unwrap();

        write_atomic(&path, b"new\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new\n");
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn failed_write_leaves_target() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("no-such-dir").join("PROFSAVE_profile");
        assert!(write_atomic(&missing, b"x").is_err());
        assert!(!missing.exists());
    }

    #[test]
    fn copy_reports_size() {
        let dir = TempDir::new().unwrap();
        let from = dir.path().join("a");
        let to = dir.path().join("b");
        fs::write(&from, "GstRender.VSyncMode 1\n").unwrap();
        assert_eq!(copy_atomic(&from, &to).unwrap(), 22);
        assert_eq!(fs::read(&from).unwrap(), fs::read(&to).unwrap());
    }
}
