// Settings registry
// Built-in table: data/settings.toml, embedded at build time.

use serde::Deserialize;
use std::collections::{HashMap, HashSet};

use crate::error::{FieldTunerError, Result};
use crate::setting::Setting;

const BUILTIN_SETTINGS: &str = include_str!("../data/settings.toml");

#[derive(Deserialize)]
struct SettingsTable {
    #[serde(default)]
    setting: Vec<Setting>,
}

/// Read-only metadata for documented settings.
///
/// Lookups of undocumented keys return `None`; callers edit those as raw strings.
#[derive(Debug, Clone)]
pub struct SettingsRegistry {
    settings: Vec<Setting>,
    index: HashMap<String, usize>,
}

impl SettingsRegistry {
    /// The registry shipped with the editor.
    pub fn builtin() -> Result<Self> {
        Self::from_toml(BUILTIN_SETTINGS)
    }

    /// Parse a `[[setting]]` table and check it for consistency.
    pub fn from_toml(source: &str) -> Result<Self> {
        let table: SettingsTable = toml::from_str(source)
            .map_err(|e| FieldTunerError::Catalog(format!("settings table: {e}")))?;
        Self::from_settings(table.setting)
    }

    pub fn from_settings(settings: Vec<Setting>) -> Result<Self> {
        let mut index = HashMap::with_capacity(settings.len());
        for (i, setting) in settings.iter().enumerate() {
            setting.check().map_err(FieldTunerError::Catalog)?;
            if index.insert(setting.key.clone(), i).is_some() {
                return Err(FieldTunerError::Catalog(format!(
                    "duplicate setting identifier '{}'",
                    setting.key
                )));
            }
        }
        Ok(Self { settings, index })
    }

    pub fn lookup(&self, key: &str) -> Option<&Setting> {
        self.index.get(key).map(|&i| &self.settings[i])
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Case-insensitive substring search over name, category, subcategory,
    /// key and aliases. Results keep table order; a blank query matches nothing.
    pub fn search(&self, query: &str) -> Vec<&Setting> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        self.settings
            .iter()
            .filter(|s| {
                s.name.to_lowercase().contains(&needle)
                    || s.category.to_lowercase().contains(&needle)
                    || s.subcategory.to_lowercase().contains(&needle)
                    || s.key.to_lowercase().contains(&needle)
                    || s.aliases.iter().any(|a| a.to_lowercase().contains(&needle))
            })
            .collect()
    }

    pub fn by_category(&self, category: &str) -> Vec<&Setting> {
        self.settings
            .iter()
            .filter(|s| s.category == category)
            .collect()
    }

    /// Unique category names, sorted.
    pub fn categories(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = self
            .settings
            .iter()
            .map(|s| s.category.as_str())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        seen.sort_unstable();
        seen
    }

    /// Subcategories of `category` in table order.
    pub fn subcategories(&self, category: &str) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for s in self.by_category(category) {
            if !out.contains(&s.subcategory.as_str()) {
                out.push(&s.subcategory);
            }
        }
        out
    }

    pub fn iter(&self) -> impl Iterator<Item = &Setting> {
        self.settings.iter()
    }

    pub fn len(&self) -> usize {
        self.settings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }
}
