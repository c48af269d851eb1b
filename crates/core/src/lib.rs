//! `fieldtuner-core`: settings metadata, presets, and the error taxonomy.
//!
//! Pure crate: no filesystem access. Documents and backups live in
//! `fieldtuner-io`, the editing workflow in `fieldtuner-editor`.

pub mod error;
pub mod guard;
pub mod policy;
pub mod preset;
pub mod registry;
pub mod setting;
pub mod store;

pub use error::{FieldTunerError, Resource, Result};
pub use guard::{NeverRunning, RunStateGuard};
pub use policy::ValidationPolicy;
pub use preset::{Preset, PresetCatalog, PresetReport};
pub use registry::SettingsRegistry;
pub use setting::{Setting, SettingKind, SettingOption, SettingValue};
pub use store::{check_entry, SettingStore};
