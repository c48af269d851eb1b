// PROFSAVE text document
// One `KEY VALUE` setting per line. Blank lines and anything that does not
// fit the grammar pass through untouched; edits rewrite only their own line.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use fieldtuner_core::guard::{running_message, RunStateGuard};
use fieldtuner_core::{check_entry, FieldTunerError, Resource, Result, SettingStore};

use crate::atomic::write_atomic;
use crate::format::{sniff_format, FileFormat};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
}

impl LineEnding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
        }
    }

    fn detect(text: &str) -> Self {
        if text.contains("\r\n") {
            Self::CrLf
        } else {
            Self::Lf
        }
    }
}

/// A source line as read, plus its split form.
#[derive(Debug, Clone)]
struct RawLine {
    text: String,
    /// First token; `None` for blank lines.
    key: Option<String>,
    /// Remainder after the first whitespace run; `None` when the line has no value.
    value: Option<String>,
}

impl RawLine {
    fn split(text: &str) -> Self {
        let trimmed = text.trim();
        let (key, value) = if trimmed.is_empty() {
            (None, None)
        } else {
            match trimmed.find(char::is_whitespace) {
                Some(i) => (
                    Some(trimmed[..i].to_string()),
                    Some(trimmed[i..].trim_start().to_string()),
                ),
                None => (Some(trimmed.to_string()), None),
            }
        };
        Self {
            text: text.to_string(),
            key,
            value,
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    key: String,
    value: String,
    /// Line this key is written back to; `None` for keys appended on serialize.
    owner: Option<usize>,
}

/// In-memory config file: the original lines plus the key -> value mapping.
///
/// Mutations only touch the mapping. The lines are rewritten from it by
/// [`serialize`](Self::serialize) and replaced on a successful [`save`](Self::save).
#[derive(Debug, Clone, Default)]
pub struct ConfigDocument {
    path: Option<PathBuf>,
    lines: Vec<RawLine>,
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
    line_ending: LineEnding,
    /// Serialized form of the last loaded/saved content.
    baseline: String,
}

impl ConfigDocument {
    /// Parse text that did not come from a file.
    pub fn parse(text: &str) -> Self {
        let line_ending = LineEnding::detect(text);
        let lines: Vec<RawLine> = text.lines().map(RawLine::split).collect();

        let mut entries = Vec::new();
        let mut index = HashMap::new();
        for (i, line) in lines.iter().enumerate() {
            // First parseable occurrence owns the key; later duplicates pass through.
            if let (Some(key), Some(value)) = (&line.key, &line.value) {
                if !index.contains_key(key) {
                    index.insert(key.clone(), entries.len());
                    entries.push(Entry {
                        key: key.clone(),
                        value: value.clone(),
                        owner: Some(i),
                    });
                }
            }
        }

        let mut doc = Self {
            path: None,
            lines,
            entries,
            index,
            line_ending,
            baseline: String::new(),
        };
        doc.baseline = doc.serialize();
        doc
    }

    /// Read and parse a text profile. The binary variant is rejected with
    /// `FieldTunerError::Format`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| FieldTunerError::from_read(path, e))?;

        if sniff_format(&bytes) == FileFormat::Binary {
            return Err(FieldTunerError::Format {
                path: path.to_path_buf(),
                reason: "binary PROFSAVE profile detected; only the text format can be edited \
                         (use a text profile from a settings backup folder)"
                    .to_string(),
            });
        }

        let text = String::from_utf8_lossy(&bytes);
        let mut doc = Self::parse(&text);
        doc.path = Some(path.to_path_buf());
        log::info!("loaded {} settings from {}", doc.len(), path.display());
        Ok(doc)
    }

    /// Re-read the bound file, discarding in-memory edits.
    pub fn reload(&mut self) -> Result<()> {
        let path = self
            .path
            .clone()
            .ok_or_else(|| FieldTunerError::not_found(Resource::ConfigFile, "<unsaved document>"))?;
        *self = Self::load(path)?;
        Ok(())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.index
            .get(key)
            .map(|&i| self.entries[i].value.as_str())
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// Upsert into the mapping. Lines and disk are untouched until save.
    /// A pair that cannot be written back as one line is refused and leaves
    /// the document unchanged; callers check with `check_entry` first.
    pub fn set(&mut self, key: &str, value: &str) {
        if let Err(e) = check_entry(key, value) {
            log::warn!("refusing {e}");
            return;
        }
        if let Some(&i) = self.index.get(key) {
            self.entries[i].value = value.to_string();
            return;
        }

        // A value-less line with this key is rewritten in place rather than appended.
        let owner = self
            .lines
            .iter()
            .position(|l| l.key.as_deref() == Some(key) && l.value.is_none());
        self.index.insert(key.to_string(), self.entries.len());
        self.entries.push(Entry {
            key: key.to_string(),
            value: value.to_string(),
            owner,
        });
    }

    /// Value as it stands in the last loaded/saved content.
    pub fn saved_value(&self, key: &str) -> Option<&str> {
        let entry = &self.entries[*self.index.get(key)?];
        self.lines[entry.owner?].value.as_deref()
    }

    /// Drop the in-memory edit of `key`: restore the saved value, or forget the
    /// key if the saved content never had one. Returns whether anything changed.
    pub fn reset(&mut self, key: &str) -> bool {
        let Some(&i) = self.index.get(key) else {
            return false;
        };

        if let Some(saved) = self.entries[i].owner.and_then(|l| self.lines[l].value.clone()) {
            let changed = self.entries[i].value != saved;
            self.entries[i].value = saved;
            return changed;
        }

        self.entries.remove(i);
        self.index = self
            .entries
            .iter()
            .enumerate()
            .map(|(n, e)| (e.key.clone(), n))
            .collect();
        true
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Keys in mapping order: file order, then keys added at runtime.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.key.as_str())
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|e| (e.key.as_str(), e.value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rebuild the file text: each owning line is kept verbatim while its value
    /// is unchanged and rewritten as `key value` otherwise; other lines pass
    /// through; new keys are appended in insertion order.
    pub fn serialize(&self) -> String {
        let mut out: Vec<String> = Vec::with_capacity(self.lines.len() + 4);

        for (n, line) in self.lines.iter().enumerate() {
            let owned = line
                .key
                .as_deref()
                .and_then(|k| self.index.get(k))
                .map(|&i| &self.entries[i])
                .filter(|e| e.owner == Some(n));

            match owned {
                Some(entry) if line.value.as_deref() != Some(entry.value.as_str()) => {
                    out.push(format!("{} {}", entry.key, entry.value));
                }
                _ => out.push(line.text.clone()),
            }
        }

        for entry in self.entries.iter().filter(|e| e.owner.is_none()) {
            out.push(format!("{} {}", entry.key, entry.value));
        }

        if out.is_empty() {
            return String::new();
        }
        let eol = self.line_ending.as_str();
        let mut text = out.join(eol);
        text.push_str(eol);
        text
    }

    /// True iff serializing now would produce different text than was loaded/saved.
    pub fn has_changes(&self) -> bool {
        self.serialize() != self.baseline
    }

    /// Write the serialized document to `path` unless `guard` reports the
    /// game running. On success the document is rebound to `path` and its
    /// lines match the disk again.
    pub fn save(&mut self, path: impl AsRef<Path>, guard: &dyn RunStateGuard) -> Result<()> {
        let path = path.as_ref();
        if let Some(process) = guard.running_process() {
            return Err(FieldTunerError::Precondition(running_message(&process)));
        }

        let text = self.serialize();
        write_atomic(path, text.as_bytes()).map_err(|e| FieldTunerError::io("write", path, e))?;

        let fresh = Self::parse(&text);
        self.lines = fresh.lines;
        self.entries = fresh.entries;
        self.index = fresh.index;
        self.baseline = fresh.baseline;
        self.path = Some(path.to_path_buf());
        log::info!("saved {} settings to {}", self.len(), path.display());
        Ok(())
    }
}

impl SettingStore for ConfigDocument {
    fn get(&self, key: &str) -> Option<&str> {
        ConfigDocument::get(self, key)
    }

    fn set(&mut self, key: &str, value: &str) {
        ConfigDocument::set(self, key, value)
    }
}
