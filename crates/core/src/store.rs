use crate::error::{FieldTunerError, Result};

/// Anything that holds raw key/value settings. `ConfigDocument` is the
/// production implementation; presets are applied through this seam.
pub trait SettingStore {
    fn get(&self, key: &str) -> Option<&str>;
    fn set(&mut self, key: &str, value: &str);
}

impl SettingStore for std::collections::BTreeMap<String, String> {
    fn get(&self, key: &str) -> Option<&str> {
        std::collections::BTreeMap::get(self, key).map(String::as_str)
    }

    fn set(&mut self, key: &str, value: &str) {
        self.insert(key.to_string(), value.to_string());
    }
}

/// A pair that survives being written as one `KEY VALUE` line and read back:
/// the key is a single token, the value is non-blank and has no line breaks.
pub fn check_entry(key: &str, value: &str) -> Result<()> {
    if key.is_empty() || key.contains(char::is_whitespace) {
        return Err(FieldTunerError::validation(key, "key must be a single word"));
    }
    if value.contains(['\n', '\r']) {
        return Err(FieldTunerError::validation(key, "value must not contain line breaks"));
    }
    if value.trim().is_empty() {
        return Err(FieldTunerError::validation(key, "value is empty"));
    }
    Ok(())
}
