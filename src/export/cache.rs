use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::CacheError;
use crate::record::ClassRecord;

type Entries = BTreeMap<String, Vec<ClassRecord>>;

/// Selections waiting for the OAuth redirect, keyed by the `state` value
/// sent with the authorization request.
#[derive(Debug, Clone)]
pub struct PendingSelections {
    path: PathBuf,
}

impl PendingSelections {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn stash(&self, state: &str, records: &[ClassRecord]) -> Result<(), CacheError> {
        let mut entries = self.read();
        entries.insert(state.to_string(), records.to_vec());
        self.write(&entries)
    }

    /// Remove and return the selection for `state`; empty if none is stored.
    pub fn take(&self, state: &str) -> Result<Vec<ClassRecord>, CacheError> {
        let mut entries = self.read();
        let Some(records) = entries.remove(state) else {
            return Ok(Vec::new());
        };
        self.write(&entries)?;
        Ok(records)
    }

    /// Missing file is empty; an unreadable one is logged and treated as empty.
    fn read(&self) -> Entries {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Entries::new(),
            Err(e) => {
                warn!("Cannot read {}: {}", self.path.display(), e);
                return Entries::new();
            }
        };
        serde_json::from_str(&text).unwrap_or_else(|e| {
            warn!("Ignoring corrupt cache {}: {}", self.path.display(), e);
            Entries::new()
        })
    }

    fn write(&self, entries: &Entries) -> Result<(), CacheError> {
        let json = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

// ── Tests ──
