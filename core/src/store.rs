use std::cell::RefCell;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::models::MealEntry;

/// Where the meal history lives between sessions.
///
/// `load` never fails: missing or unreadable state is an empty history.
/// `save_all` replaces the whole persisted collection.
pub trait MealStore {
    fn load(&self) -> Vec<MealEntry>;
    fn save_all(&self, entries: &[MealEntry]) -> Result<()>;
}

/// Decode a JSON snapshot, skipping entries that fail validation.
///
/// Returns `None` when the document is not a JSON array at all.
#[must_use]
pub fn decode_snapshot(raw: &str) -> Option<Vec<MealEntry>> {
    match serde_json::from_str::<Vec<Value>>(raw) {
        Ok(values) => Some(decode_values(values)),
        Err(e) => {
            tracing::warn!(error = %e, "meal history is not a JSON array");
            None
        }
    }
}

/// Decode already-parsed snapshot values, skipping invalid entries.
#[must_use]
pub fn decode_values(values: Vec<Value>) -> Vec<MealEntry> {
    values
        .into_iter()
        .enumerate()
        .filter_map(|(i, value)| decode_entry(i, value))
        .collect()
}

fn decode_entry(position: usize, value: Value) -> Option<MealEntry> {
    let entry = match serde_json::from_value::<MealEntry>(value) {
        Ok(entry) => entry,
        Err(e) => {
            tracing::warn!(position, error = %e, "skipping unreadable meal entry");
            return None;
        }
    };
    match entry.canonicalize() {
        Ok(entry) => Some(entry),
        Err(e) => {
            tracing::warn!(position, error = %e, "skipping invalid meal entry");
            None
        }
    }
}

pub fn encode_snapshot(entries: &[MealEntry]) -> Result<String> {
    serde_json::to_string_pretty(entries).context("Failed to serialize meal history")
}

/// Whole-history snapshot in a single JSON file.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl MealStore for JsonFileStore {
    fn load(&self) -> Vec<MealEntry> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "could not read meal history");
                return Vec::new();
            }
        };
        if raw.trim().is_empty() {
            return Vec::new();
        }
        decode_snapshot(&raw).unwrap_or_default()
    }

    fn save_all(&self, entries: &[MealEntry]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let json = encode_snapshot(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .with_context(|| format!("Failed to write meal history: {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace meal history: {}", self.path.display()))?;
        tracing::debug!(path = %self.path.display(), entries = entries.len(), "saved meal history");
        Ok(())
    }
}

/// In-process store, for embedding and tests.
#[derive(Default)]
pub struct MemoryStore {
    entries: RefCell<Vec<MealEntry>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_entries(entries: Vec<MealEntry>) -> Self {
        Self {
            entries: RefCell::new(entries),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl MealStore for MemoryStore {
    fn load(&self) -> Vec<MealEntry> {
        self.entries.borrow().clone()
    }

    fn save_all(&self, entries: &[MealEntry]) -> Result<()> {
        *self.entries.borrow_mut() = entries.to_vec();
        Ok(())
    }
}

impl<S: MealStore + ?Sized> MealStore for &S {
    fn load(&self) -> Vec<MealEntry> {
        (**self).load()
    }

    fn save_all(&self, entries: &[MealEntry]) -> Result<()> {
        (**self).save_all(entries)
    }
}

impl<S: MealStore + ?Sized> MealStore for Box<S> {
    fn load(&self) -> Vec<MealEntry> {
        (**self).load()
    }

    fn save_all(&self, entries: &[MealEntry]) -> Result<()> {
        (**self).save_all(entries)
    }
}
