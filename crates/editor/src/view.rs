// Typed view of one document entry, for building editor controls.

use fieldtuner_core::{Setting, SettingValue};

#[derive(Debug, Clone)]
pub struct SettingView<'a> {
    pub key: &'a str,
    /// Current value as it would be written.
    pub raw: &'a str,
    /// Registry metadata; `None` for undocumented keys.
    pub setting: Option<&'a Setting>,
    /// Interpretation through the declared kind. Undocumented keys and values
    /// the kind cannot parse fall back to `Text`.
    pub value: SettingValue,
    pub pending: bool,
    pub flagged: bool,
}

impl<'a> SettingView<'a> {
    pub(crate) fn new(key: &'a str, raw: &'a str, setting: Option<&'a Setting>) -> Self {
        let value = setting
            .and_then(|s| s.interpret(raw).ok())
            .unwrap_or_else(|| SettingValue::Text(raw.to_string()));
        Self {
            key,
            raw,
            setting,
            value,
            pending: false,
            flagged: false,
        }
    }

    pub fn is_documented(&self) -> bool {
        self.setting.is_some()
    }

    /// Human label: the option label when the setting has discrete options.
    pub fn display_value(&self) -> String {
        self.setting
            .and_then(|s| s.option_label(self.raw))
            .map(|label| format!("{label} ({})", self.raw))
            .unwrap_or_else(|| self.raw.to_string())
    }
}
