// Presets: named bundles of setting overrides
// Built-in table: data/presets.toml, embedded at build time.

use serde::Deserialize;
use std::collections::BTreeMap;

use crate::error::{FieldTunerError, Resource, Result};
use crate::registry::SettingsRegistry;
use crate::store::SettingStore;

const BUILTIN_PRESETS: &str = include_str!("../data/presets.toml");

#[derive(Debug, Clone, Deserialize)]
pub struct Preset {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Display-only
    #[serde(default)]
    pub icon: String,
    /// Display-only
    #[serde(default)]
    pub color: String,
    /// setting key -> value in file representation
    pub settings: BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct PresetTable {
    #[serde(default)]
    preset: Vec<Preset>,
}

/// Result of applying a preset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresetReport {
    pub preset_id: String,
    pub name: String,
    /// Every key the preset assigned, in application order.
    pub keys: Vec<String>,
}

impl PresetReport {
    pub fn applied(&self) -> usize {
        self.keys.len()
    }

    pub fn message(&self) -> String {
        format!("Applied '{}' preset ({} settings)", self.name, self.applied())
    }
}

/// Static, validated collection of presets.
///
/// Preset entries are independent assignments with no ordering between keys,
/// so application is not transactional: a fault midway leaves earlier keys set.
#[derive(Debug, Clone)]
pub struct PresetCatalog {
    presets: Vec<Preset>,
}

impl PresetCatalog {
    pub fn builtin(registry: &SettingsRegistry) -> Result<Self> {
        Self::from_toml(BUILTIN_PRESETS, registry)
    }

    /// Parse a `[[preset]]` table. Every key must be documented in `registry`
    /// and every value must validate against it.
    pub fn from_toml(source: &str, registry: &SettingsRegistry) -> Result<Self> {
        let table: PresetTable = toml::from_str(source)
            .map_err(|e| FieldTunerError::Catalog(format!("preset table: {e}")))?;

        let mut seen = Vec::with_capacity(table.preset.len());
        for preset in &table.preset {
            if seen.contains(&preset.id.as_str()) {
                return Err(FieldTunerError::Catalog(format!(
                    "duplicate preset id '{}'",
                    preset.id
                )));
            }
            seen.push(preset.id.as_str());

            for (key, value) in &preset.settings {
                let setting = registry.lookup(key).ok_or_else(|| {
                    FieldTunerError::Catalog(format!(
                        "preset '{}' sets undocumented key '{key}'",
                        preset.id
                    ))
                })?;
                setting.validate(value).map_err(|e| {
                    FieldTunerError::Catalog(format!("preset '{}': {e}", preset.id))
                })?;
            }
        }

        Ok(Self {
            presets: table.preset,
        })
    }

    pub fn get(&self, id: &str) -> Option<&Preset> {
        self.presets.iter().find(|p| p.id == id)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.presets.iter().map(|p| p.id.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Preset> {
        self.presets.iter()
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    /// Assign every entry of preset `id` into `store`.
    pub fn apply(&self, id: &str, store: &mut impl SettingStore) -> Result<PresetReport> {
        let preset = self
            .get(id)
            .ok_or_else(|| FieldTunerError::not_found(Resource::Preset, id))?;

        let mut keys = Vec::with_capacity(preset.settings.len());
        for (key, value) in &preset.settings {
            store.set(key, value);
            keys.push(key.clone());
        }

        Ok(PresetReport {
            preset_id: preset.id.clone(),
            name: preset.name.clone(),
            keys,
        })
    }
}
