// Setting metadata and typed values
// Values live in the file as plain strings; the declared kind is an overlay.

use serde::Deserialize;
use std::fmt;

use crate::error::{FieldTunerError, Result};

/// Declared type of a setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingKind {
    Bool,
    Int,
    Float,
    #[serde(rename = "string")]
    Text,
}

impl fmt::Display for SettingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => write!(f, "boolean"),
            Self::Int => write!(f, "integer"),
            Self::Float => write!(f, "float"),
            Self::Text => write!(f, "string"),
        }
    }
}

/// A raw string interpreted through its setting's declared kind.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl SettingValue {
    /// File representation. Floats use six decimals like the game writes them.
    pub fn render(&self) -> String {
        match self {
            Self::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            Self::Int(n) => n.to_string(),
            Self::Float(x) => format!("{x:.6}"),
            Self::Text(s) => s.clone(),
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Self::Int(n) => Some(*n as f64),
            Self::Float(x) => Some(*x),
            Self::Text(_) => None,
        }
    }
}

/// One discrete choice of an integer setting.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SettingOption {
    pub value: i64,
    pub label: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Setting {
    /// Dotted identifier as it appears in the file, e.g. `GstRender.VSyncMode`.
    pub key: String,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub subcategory: String,
    #[serde(rename = "type")]
    pub kind: SettingKind,
    /// Default in file representation.
    pub default: String,
    /// Inclusive bounds.
    #[serde(default)]
    pub range: Option<[f64; 2]>,
    #[serde(default)]
    pub options: Vec<SettingOption>,
    #[serde(default)]
    pub tooltip: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl Setting {
    /// Parse `raw` according to the declared kind, without range checks.
    pub fn interpret(&self, raw: &str) -> Result<SettingValue> {
        let trimmed = raw.trim();
        match self.kind {
            SettingKind::Bool => match trimmed.to_ascii_lowercase().as_str() {
                "1" | "true" => Ok(SettingValue::Bool(true)),
                "0" | "false" => Ok(SettingValue::Bool(false)),
                _ => Err(FieldTunerError::validation(
                    &self.key,
                    format!("'{raw}' is not a boolean (expected 0 or 1)"),
                )),
            },
            SettingKind::Int => trimmed.parse::<i64>().map(SettingValue::Int).map_err(|_| {
                FieldTunerError::validation(&self.key, format!("'{raw}' is not an integer"))
            }),
            SettingKind::Float => match trimmed.parse::<f64>() {
                Ok(x) if x.is_finite() => Ok(SettingValue::Float(x)),
                _ => Err(FieldTunerError::validation(
                    &self.key,
                    format!("'{raw}' is not a number"),
                )),
            },
            SettingKind::Text => Ok(SettingValue::Text(raw.to_string())),
        }
    }

    /// Interpret `raw` and check it against the declared range and options.
    pub fn validate(&self, raw: &str) -> Result<SettingValue> {
        let value = self.interpret(raw)?;

        if let (Some([min, max]), Some(n)) = (self.range, value.as_number()) {
            if n < min || n > max {
                return Err(FieldTunerError::validation(
                    &self.key,
                    format!("{raw} is out of range {}..={}", fmt_bound(min), fmt_bound(max)),
                ));
            }
        }

        if let SettingValue::Int(n) = value {
            if !self.options.is_empty() && !self.options.iter().any(|o| o.value == n) {
                return Err(FieldTunerError::validation(
                    &self.key,
                    format!("{n} is not one of the allowed options"),
                ));
            }
        }

        Ok(value)
    }

    /// Display label for a discrete option value, if the setting has options.
    pub fn option_label(&self, raw: &str) -> Option<&str> {
        let n: i64 = raw.trim().parse().ok()?;
        self.options
            .iter()
            .find(|o| o.value == n)
            .map(|o| o.label.as_str())
    }

    pub fn default_value(&self) -> Result<SettingValue> {
        self.interpret(&self.default)
    }

    /// The default as the file would hold it, with its option label if any.
    pub fn default_display(&self) -> String {
        let raw = self
            .default_value()
            .map(|v| v.render())
            .unwrap_or_else(|_| self.default.clone());
        match self.option_label(&raw) {
            Some(label) => format!("{label} ({raw})"),
            None => raw,
        }
    }

    /// Table consistency: bounds ordered and matching the kind, default and
    /// options inside the bounds.
    pub(crate) fn check(&self) -> std::result::Result<(), String> {
        if self.key.trim().is_empty() || self.key.contains(char::is_whitespace) {
            return Err(format!("invalid setting identifier '{}'", self.key));
        }

        if let Some([min, max]) = self.range {
            if min > max {
                return Err(format!("{}: range minimum exceeds maximum", self.key));
            }
            match self.kind {
                SettingKind::Text => {
                    return Err(format!("{}: string settings cannot declare a range", self.key))
                }
                SettingKind::Bool | SettingKind::Int if min.fract() != 0.0 || max.fract() != 0.0 => {
                    return Err(format!("{}: {} range must use whole numbers", self.key, self.kind))
                }
                _ => {}
            }
        }

        if !self.options.is_empty() && self.kind != SettingKind::Int {
            return Err(format!("{}: options require an integer setting", self.key));
        }
        if let Some([min, max]) = self.range {
            if let Some(o) = self
                .options
                .iter()
                .find(|o| (o.value as f64) < min || (o.value as f64) > max)
            {
                return Err(format!("{}: option {} lies outside the range", self.key, o.value));
            }
        }

        self.validate(&self.default)
            .map(|_| ())
            .map_err(|e| format!("{}: default: {e}", self.key))
    }
}

fn fmt_bound(x: f64) -> String {
    if x.fract() == 0.0 {
        format!("{x:.0}")
    } else {
        x.to_string()
    }
}
