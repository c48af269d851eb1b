// Edit session: pending changes against the saved file, guarded save.
//
// States: Clean (nothing pending) and Dirty. The document always holds the
// pending values, so `document().serialize()` previews what `save()` writes.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use fieldtuner_core::guard::running_message;
use fieldtuner_core::{
    check_entry, FieldTunerError, PresetCatalog, PresetReport, Resource, Result, RunStateGuard,
    SettingsRegistry, ValidationPolicy,
};
use fieldtuner_io::{BackupHandle, BackupInfo, BackupStore, ConfigDocument, RestoreReport};

use crate::view::SettingView;

/// Description given to the automatic backup taken before each save.
pub const SAVE_BACKUP_DESCRIPTION: &str = "before-save";

/// Collaborators an `EditSession` works with. Nothing is looked up globally.
pub struct SessionParts {
    pub registry: SettingsRegistry,
    pub presets: PresetCatalog,
    pub backups: BackupStore,
    pub guard: Box<dyn RunStateGuard>,
    pub policy: ValidationPolicy,
    /// Backups kept after each save. Zero behaves as one.
    pub keep_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Clean,
    Dirty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingChange {
    /// Value in the saved file; `None` for a key the file does not have.
    pub old: Option<String>,
    pub new: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Nothing was pending; disk untouched.
    Unchanged,
    Saved {
        /// `None` only when the file had vanished from disk before the save.
        backup: Option<BackupHandle>,
        changes: usize,
    },
}

pub struct EditSession {
    path: PathBuf,
    document: ConfigDocument,
    registry: SettingsRegistry,
    presets: PresetCatalog,
    backups: BackupStore,
    guard: Box<dyn RunStateGuard>,
    policy: ValidationPolicy,
    keep_count: usize,
    pending: BTreeMap<String, PendingChange>,
    flagged: BTreeSet<String>,
}

impl EditSession {
    pub fn open(path: impl AsRef<Path>, parts: SessionParts) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let document = ConfigDocument::load(&path)?;
        Ok(Self {
            path,
            document,
            registry: parts.registry,
            presets: parts.presets,
            backups: parts.backups,
            guard: parts.guard,
            policy: parts.policy,
            keep_count: parts.keep_count,
            pending: BTreeMap::new(),
            flagged: BTreeSet::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn document(&self) -> &ConfigDocument {
        &self.document
    }

    pub fn registry(&self) -> &SettingsRegistry {
        &self.registry
    }

    pub fn presets(&self) -> &PresetCatalog {
        &self.presets
    }

    pub fn backups(&self) -> &BackupStore {
        &self.backups
    }

    pub fn policy(&self) -> ValidationPolicy {
        self.policy
    }

    pub fn state(&self) -> SessionState {
        if self.pending.is_empty() {
            SessionState::Clean
        } else {
            SessionState::Dirty
        }
    }

    pub fn pending(&self) -> &BTreeMap<String, PendingChange> {
        &self.pending
    }

    /// Keys holding values their setting rejects (`ValidationPolicy::Flag` only).
    pub fn flagged(&self) -> &BTreeSet<String> {
        &self.flagged
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.document.get(key)
    }

    /// Stage `value` for `key`. Setting a key back to its saved value drops it
    /// from the pending set. Blank values and line breaks are refused for
    /// every key, documented or not, under both policies.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        check_entry(key, value)?;
        if let Some(setting) = self.registry.lookup(key) {
            match setting.validate(value) {
                Ok(_) => {
                    self.flagged.remove(key);
                }
                Err(e) => match self.policy {
                    ValidationPolicy::Reject => return Err(e),
                    ValidationPolicy::Flag => {
                        log::warn!("accepting flagged value: {e}");
                        self.flagged.insert(key.to_string());
                    }
                },
            }
        }

        let saved = self.document.saved_value(key).map(str::to_string);
        if saved.as_deref() == Some(value) {
            self.document.reset(key);
            self.pending.remove(key);
        } else {
            self.document.set(key, value);
            self.pending.insert(
                key.to_string(),
                PendingChange {
                    old: saved,
                    new: value.to_string(),
                },
            );
        }
        log::debug!("set {key} = {value} ({} pending)", self.pending.len());
        Ok(())
    }

    /// Drop the pending change for `key`. Returns false if nothing was pending.
    pub fn revert(&mut self, key: &str) -> bool {
        if self.pending.remove(key).is_none() {
            return false;
        }
        self.document.reset(key);
        self.flagged.remove(key);
        true
    }

    /// Apply a preset. Every key it touches becomes pending, including keys
    /// whose value already matches the file.
    pub fn apply_preset(&mut self, id: &str) -> Result<PresetReport> {
        let mut saved = BTreeMap::new();
        if let Some(preset) = self.presets.get(id) {
            for key in preset.settings.keys() {
                saved.insert(key.clone(), self.document.saved_value(key).map(str::to_string));
            }
        }

        let report = self.presets.apply(id, &mut self.document)?;
        for key in &report.keys {
            let new = self.document.get(key).unwrap_or_default().to_string();
            let old = saved.remove(key).flatten();
            self.flagged.remove(key);
            self.pending.insert(key.clone(), PendingChange { old, new });
        }
        log::info!("{}", report.message());
        Ok(report)
    }

    fn check_guard(&self) -> Result<()> {
        match self.guard.running_process() {
            Some(process) => Err(FieldTunerError::Precondition(running_message(&process))),
            None => Ok(()),
        }
    }

    /// Back up the file, write the document and clear pending changes.
    /// On error nothing is cleared and the file is untouched.
    pub fn save(&mut self) -> Result<SaveOutcome> {
        if self.pending.is_empty() {
            return Ok(SaveOutcome::Unchanged);
        }
        self.check_guard()?;

        let backup = if self.path.is_file() {
            Some(self.backups.create(&self.path, SAVE_BACKUP_DESCRIPTION)?)
        } else {
            log::warn!("{} no longer exists; saving without a backup", self.path.display());
            None
        };

        self.document.save(&self.path, self.guard.as_ref())?;

        let changes = self.pending.len();
        self.pending.clear();
        log::info!("saved {changes} change(s) to {}", self.path.display());

        // The backup just taken is always kept, whatever the configured count.
        if let Err(e) = self.backups.cleanup(self.keep_count.max(1)) {
            log::warn!("backup cleanup failed: {e}");
        }

        Ok(SaveOutcome::Saved { backup, changes })
    }

    /// Throw away pending changes and re-read the file.
    pub fn discard(&mut self) -> Result<()> {
        self.document.reload()?;
        self.pending.clear();
        self.flagged.clear();
        Ok(())
    }

    pub fn create_backup(&self, description: &str) -> Result<BackupHandle> {
        self.backups.create(&self.path, description)
    }

    pub fn list_backups(&self) -> Result<Vec<BackupInfo>> {
        self.backups.list()
    }

    pub fn delete_backup(&self, id: &str) -> Result<()> {
        self.backups.delete(id)
    }

    /// Restore backup `id` over the session's file and reload it. Pending
    /// changes are dropped.
    pub fn restore_backup(&mut self, id: &str) -> Result<RestoreReport> {
        self.check_guard()?;
        let report = self.backups.restore(id, &self.path)?;
        self.discard()?;
        Ok(report)
    }

    /// One view per document key, in document order.
    pub fn views(&self) -> Vec<SettingView<'_>> {
        self.document
            .entries()
            .map(|(key, raw)| self.make_view(key, raw))
            .collect()
    }

    pub fn view(&self, key: &str) -> Result<SettingView<'_>> {
        let (key, raw) = self
            .document
            .entries()
            .find(|(k, _)| *k == key)
            .ok_or_else(|| FieldTunerError::not_found(Resource::Setting, key))?;
        Ok(self.make_view(key, raw))
    }

    fn make_view<'a>(&'a self, key: &'a str, raw: &'a str) -> SettingView<'a> {
        let mut view = SettingView::new(key, raw, self.registry.lookup(key));
        view.pending = self.pending.contains_key(key);
        view.flagged = self.flagged.contains(key);
        view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldtuner_core::{NeverRunning, SettingValue};
    use std::cell::Cell;
    use std::fs;
    use std::rc::Rc;
    use tempfile::TempDir;

    const PROFILE: &str = "GstRender.VSyncMode 0\nGstRender.FrameRateLimit 0.000000\nGstRender.FullscreenMode 1\nModded.Thing 7\n";

    fn parts(dir: &TempDir, policy: ValidationPolicy, guard: Box<dyn RunStateGuard>) -> SessionParts {
        let registry = SettingsRegistry::builtin().unwrap();
        let presets = PresetCatalog::builtin(&registry).unwrap();
        SessionParts {
            registry,
            presets,
            backups: BackupStore::open(dir.path().join("backups")).unwrap(),
            guard,
            policy,
            keep_count: 20,
        }
    }

    fn open(policy: ValidationPolicy) -> (TempDir, PathBuf, EditSession) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("PROFSAVE_profile");
        fs::write(&path, PROFILE).unwrap();
        let parts = parts(&dir, policy, Box::new(NeverRunning));
        let session = EditSession::open(&path, parts).unwrap();
        (dir, path, session)
    }

    #[test]
    fn set_and_set_back_returns_to_clean() {
        let (_dir, _path, mut session) = open(ValidationPolicy::Reject);
        assert_eq!(session.state(), SessionState::Clean);

        session.set_value("GstRender.VSyncMode", "1").unwrap();
        assert_eq!(session.state(), SessionState::Dirty);
        assert_eq!(
            session.pending()["GstRender.VSyncMode"],
            PendingChange { old: Some("0".into()), new: "1".into() }
        );

        session.set_value("GstRender.VSyncMode", "0").unwrap();
        assert_eq!(session.state(), SessionState::Clean);
        assert!(!session.document().has_changes());
    }

    #[test]
    fn reject_policy_refuses_invalid_value() {
        let (_dir, _path, mut session) = open(ValidationPolicy::Reject);
        let err = session.set_value("GstRender.FullscreenMode", "9").unwrap_err();
        assert!(matches!(err, FieldTunerError::Validation { .. }));
        assert_eq!(session.get("GstRender.FullscreenMode"), Some("1"));
        assert_eq!(session.state(), SessionState::Clean);
    }

    #[test]
    fn flag_policy_accepts_and_flags() {
        let (_dir, _path, mut session) = open(ValidationPolicy::Flag);
        session.set_value("GstRender.FullscreenMode", "9").unwrap();
        assert!(session.flagged().contains("GstRender.FullscreenMode"));
        assert_eq!(session.get("GstRender.FullscreenMode"), Some("9"));

        session.set_value("GstRender.FullscreenMode", "2").unwrap();
        assert!(session.flagged().is_empty());
    }

    #[test]
    fn revert_clears_flag() {
        let (_dir, _path, mut session) = open(ValidationPolicy::Flag);
        session.set_value("GstRender.VSyncMode", "maybe").unwrap();
        assert!(session.revert("GstRender.VSyncMode"));
        assert!(session.flagged().is_empty());
        assert_eq!(session.get("GstRender.VSyncMode"), Some("0"));
        assert!(!session.revert("GstRender.VSyncMode"));
    }

    #[test]
    fn undocumented_keys_are_accepted_raw() {
        let (_dir, _path, mut session) = open(ValidationPolicy::Reject);
        session.set_value("Modded.Thing", "not a number").unwrap();
        session.set_value("Brand.New", "x y z").unwrap();
        assert_eq!(session.pending().len(), 2);
        assert_eq!(session.pending()["Brand.New"].old, None);
    }

    #[test]
    fn save_backs_up_then_writes() {
        let (_dir, path, mut session) = open(ValidationPolicy::Reject);
        assert_eq!(session.save().unwrap(), SaveOutcome::Unchanged);
        assert!(session.list_backups().unwrap().is_empty());

        session.set_value("GstRender.VSyncMode", "1").unwrap();
        let outcome = session.save().unwrap();
        let SaveOutcome::Saved { backup: Some(backup), changes } = outcome else {
            panic!("expected a saved outcome with a backup");
        };
        assert_eq!(changes, 1);
        assert!(backup.id.ends_with("_before-save"));
        assert_eq!(
            fs::read_to_string(backup.path.join("PROFSAVE_profile")).unwrap(),
            PROFILE
        );
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            PROFILE.replace("VSyncMode 0", "VSyncMode 1")
        );
        assert_eq!(session.state(), SessionState::Clean);
    }

    #[test]
    fn guarded_save_changes_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("PROFSAVE_profile");
        fs::write(&path, PROFILE).unwrap();
        let running = Rc::new(Cell::new(true));
        let flag = running.clone();
        let guard = Box::new(move || flag.get().then(|| "bf6.exe".to_string()));
        let mut session = EditSession::open(&path, parts(&dir, ValidationPolicy::Reject, guard)).unwrap();

        session.set_value("GstRender.VSyncMode", "1").unwrap();
        let err = session.save().unwrap_err();
        assert!(matches!(err, FieldTunerError::Precondition(_)));
        assert!(err.to_string().contains("bf6.exe"));
        assert_eq!(fs::read_to_string(&path).unwrap(), PROFILE);
        assert_eq!(session.state(), SessionState::Dirty);
        assert_eq!(session.pending().len(), 1);
        assert!(session.list_backups().unwrap().is_empty());

        running.set(false);
        assert!(matches!(session.save().unwrap(), SaveOutcome::Saved { .. }));
    }

    #[test]
    fn blank_values_are_refused_for_every_key() {
        for policy in [ValidationPolicy::Reject, ValidationPolicy::Flag] {
            let (_dir, path, mut session) = open(policy);
            for key in ["GstRender.VSyncMode", "Modded.Thing", "Brand.New"] {
                for value in ["", "   ", "\t"] {
                    let err = session.set_value(key, value).unwrap_err();
                    assert!(matches!(err, FieldTunerError::Validation { key: ref k, .. } if k == key));
                }
            }
            assert_eq!(session.state(), SessionState::Clean);
            assert!(session.flagged().is_empty());
            assert_eq!(session.document().serialize(), PROFILE);
            assert_eq!(session.save().unwrap(), SaveOutcome::Unchanged);
            assert_eq!(fs::read_to_string(&path).unwrap(), PROFILE);
        }
    }

    #[test]
    fn line_breaks_cannot_inject_settings() {
        let (_dir, path, mut session) = open(ValidationPolicy::Flag);
        for value in ["x\nGstRender.FullscreenMode 9", "x\rGstRender.FullscreenMode 9", "1\r\n"] {
            let err = session.set_value("Custom.Key", value).unwrap_err();
            assert!(err.to_string().contains("Custom.Key"), "{err}");
            let err = session.set_value("GstRender.VSyncMode", value).unwrap_err();
            assert!(matches!(err, FieldTunerError::Validation { .. }));
        }
        assert_eq!(session.state(), SessionState::Clean);
        assert_eq!(session.get("Custom.Key"), None);

        session.set_value("GstRender.VSyncMode", "1").unwrap();
        session.save().unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written.matches("GstRender.FullscreenMode").count(), 1);
        assert!(written.contains("GstRender.FullscreenMode 1\n"));
    }

    #[test]
    fn zero_keep_count_still_keeps_the_save_backup() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("PROFSAVE_profile");
        fs::write(&path, PROFILE).unwrap();
        let mut parts = parts(&dir, ValidationPolicy::Reject, Box::new(NeverRunning));
        parts.keep_count = 0;
        let mut session = EditSession::open(&path, parts).unwrap();

        for value in ["1", "0"] {
            session.set_value("GstRender.FullscreenMode", value).unwrap();
            let SaveOutcome::Saved { backup: Some(backup), .. } = session.save().unwrap() else {
                panic!("save with an existing file takes a backup");
            };
            assert!(backup.path.join("PROFSAVE_profile").is_file());
            let listed = session.list_backups().unwrap();
            assert_eq!(listed.len(), 1);
            assert_eq!(listed[0].id, backup.id);
        }
    }

    #[test]
    fn guarded_restore_changes_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("PROFSAVE_profile");
        fs::write(&path, PROFILE).unwrap();
        let running = Rc::new(Cell::new(false));
        let flag = running.clone();
        let guard = Box::new(move || flag.get().then(|| "bf6.exe".to_string()));
        let mut session = EditSession::open(&path, parts(&dir, ValidationPolicy::Reject, guard)).unwrap();

        let snapshot = session.create_backup("manual").unwrap();
        session.set_value("GstRender.VSyncMode", "1").unwrap();
        session.save().unwrap();
        let saved = fs::read_to_string(&path).unwrap();
        session.set_value("GstRender.FullscreenMode", "2").unwrap();
        let backups_before = session.list_backups().unwrap().len();

        running.set(true);
        let err = session.restore_backup(&snapshot.id).unwrap_err();
        assert!(matches!(err, FieldTunerError::Precondition(_)));
        assert!(err.to_string().contains("bf6.exe"));
        assert_eq!(fs::read_to_string(&path).unwrap(), saved);
        assert_eq!(session.list_backups().unwrap().len(), backups_before);
        assert_eq!(session.state(), SessionState::Dirty);
        assert_eq!(session.get("GstRender.FullscreenMode"), Some("2"));
    }

    #[test]
    fn failed_write_keeps_pending_changes() {
        let (dir, path, mut session) = open(ValidationPolicy::Reject);
        session.set_value("GstRender.VSyncMode", "1").unwrap();
        session.set_value("Brand.New", "x").unwrap();

        // A directory squatting on the temp name makes the write fail after the backup
        let blocker = dir.path().join(".PROFSAVE_profile.tmp");
        fs::create_dir(&blocker).unwrap();

        let err = session.save().unwrap_err();
        assert!(matches!(err, FieldTunerError::Io { .. }), "{err}");
        assert_eq!(fs::read_to_string(&path).unwrap(), PROFILE);
        assert_eq!(session.state(), SessionState::Dirty);
        assert_eq!(session.pending().len(), 2);
        assert_eq!(session.get("GstRender.VSyncMode"), Some("1"));
        assert_eq!(session.list_backups().unwrap().len(), 1);

        fs::remove_dir(&blocker).unwrap();
        assert!(matches!(session.save().unwrap(), SaveOutcome::Saved { changes: 2, .. }));
        assert_eq!(session.state(), SessionState::Clean);
    }

    #[test]
    fn preset_marks_every_key_pending() {
        let (_dir, _path, mut session) = open(ValidationPolicy::Reject);
        let report = session.apply_preset("esports").unwrap();
        assert_eq!(session.pending().len(), report.applied());

        // Already-equal values still count as pending
        let vsync = &session.pending()["GstRender.VSyncMode"];
        assert_eq!(vsync.old.as_deref(), Some("0"));
        assert_eq!(vsync.new, "0");

        assert!(session.apply_preset("nope").is_err());
    }

    #[test]
    fn discard_reloads_file() {
        let (_dir, _path, mut session) = open(ValidationPolicy::Flag);
        session.set_value("GstRender.FullscreenMode", "7").unwrap();
        session.discard().unwrap();
        assert_eq!(session.state(), SessionState::Clean);
        assert!(session.flagged().is_empty());
        assert_eq!(session.get("GstRender.FullscreenMode"), Some("1"));
    }

    #[test]
    fn restore_reloads_and_clears_pending() {
        let (_dir, path, mut session) = open(ValidationPolicy::Reject);
        let snapshot = session.create_backup("manual").unwrap();

        session.set_value("GstRender.VSyncMode", "1").unwrap();
        session.save().unwrap();
        session.set_value("GstRender.FullscreenMode", "2").unwrap();

        let report = session.restore_backup(&snapshot.id).unwrap();
        assert!(report.safety_backup.is_some());
        assert_eq!(fs::read_to_string(&path).unwrap(), PROFILE);
        assert_eq!(session.get("GstRender.VSyncMode"), Some("0"));
        assert_eq!(session.state(), SessionState::Clean);
    }

    #[test]
    fn views_carry_metadata_and_typed_values() {
        let (_dir, _path, mut session) = open(ValidationPolicy::Reject);
        session.set_value("GstRender.FullscreenMode", "2").unwrap();

        let views = session.views();
        assert_eq!(views.len(), 4);

        let fullscreen = session.view("GstRender.FullscreenMode").unwrap();
        assert_eq!(fullscreen.value, SettingValue::Int(2));
        assert_eq!(fullscreen.display_value(), "Fullscreen (2)");
        assert!(fullscreen.pending);

        let fps = session.view("GstRender.FrameRateLimit").unwrap();
        assert_eq!(fps.value, SettingValue::Float(0.0));

        let modded = session.view("Modded.Thing").unwrap();
        assert!(!modded.is_documented());
        assert_eq!(modded.value, SettingValue::Text("7".into()));

        assert!(session.view("Missing.Key").is_err());
    }
}
