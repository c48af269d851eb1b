// End-to-end editing: preset, save, backup pruning, restore.

use std::fs;

use fieldtuner_core::{NeverRunning, PresetCatalog, SettingsRegistry, ValidationPolicy};
use fieldtuner_editor::{EditSession, SaveOutcome, SessionParts, SessionState};
use fieldtuner_io::{BackupStore, ConfigDocument};
use tempfile::TempDir;

const PROFILE: &str = "GstRender.VSyncMode 1\r\nGstRender.FullscreenMode 0\r\nGstRender.VSyncMode 1\r\nNoValueLine\r\n";

fn session(dir: &TempDir, keep_count: usize) -> EditSession {
    let path = dir.path().join("PROFSAVE_profile");
    if !path.exists() {
        fs::write(&path, PROFILE).unwrap();
    }
    let registry = SettingsRegistry::builtin().unwrap();
    let presets = PresetCatalog::builtin(&registry).unwrap();
    let parts = SessionParts {
        registry,
        presets,
        backups: BackupStore::open(dir.path().join("backups")).unwrap(),
        guard: Box::new(NeverRunning),
        policy: ValidationPolicy::Reject,
        keep_count,
    };
    EditSession::open(&path, parts).unwrap()
}

#[test]
fn preset_save_keeps_unknown_lines_and_line_endings() {
    let dir = TempDir::new().unwrap();
    let mut session = session(&dir, 20);

    let report = session.apply_preset("competitive").unwrap();
    assert!(report.applied() > 0);
    assert_eq!(session.state(), SessionState::Dirty);

    let outcome = session.save().unwrap();
    assert!(matches!(outcome, SaveOutcome::Saved { backup: Some(_), .. }));

    let written = fs::read_to_string(session.path()).unwrap();
    assert!(written.contains("NoValueLine\r\n"));
    assert_eq!(written.matches("\r\n").count(), written.matches('\n').count());

    // Duplicate line after the owner passes through unchanged
    let doc = ConfigDocument::load(session.path()).unwrap();
    assert_eq!(doc.get("GstRender.VSyncMode"), session.get("GstRender.VSyncMode"));
    assert_eq!(written.matches("GstRender.VSyncMode").count(), 2);
}

#[test]
fn saves_prune_backups_to_keep_count() {
    let dir = TempDir::new().unwrap();
    let mut session = session(&dir, 2);

    for mode in ["1", "2", "0", "1"] {
        session.set_value("GstRender.FullscreenMode", mode).unwrap();
        session.save().unwrap();
    }
    assert_eq!(session.list_backups().unwrap().len(), 2);
}

#[test]
fn restore_after_save_recovers_original() {
    let dir = TempDir::new().unwrap();
    let mut session = session(&dir, 20);

    session.set_value("GstRender.FullscreenMode", "2").unwrap();
    let SaveOutcome::Saved { backup: Some(before), .. } = session.save().unwrap() else {
        panic!("expected a backup before save");
    };

    let report = session.restore_backup(&before.id).unwrap();
    assert_eq!(fs::read_to_string(session.path()).unwrap(), PROFILE);
    assert_eq!(session.get("GstRender.FullscreenMode"), Some("0"));

    // The saved state went into the pre-restore backup
    let safety = report.safety_backup.unwrap();
    session.restore_backup(&safety.id).unwrap();
    assert_eq!(session.get("GstRender.FullscreenMode"), Some("2"));
}
