//! JSON-backed stores for controller maps
//!
//! Files are small and read in full on every access, then rewritten in full
//! on every mutation. A per-store mutex serializes read-modify-write cycles.

use crate::ControlsError;
use crate::position::{ControllerPositionMap, PositionKey};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

type RawEntries = BTreeMap<String, Map<String, Value>>;

/// Read a JSON file; missing or unreadable files are a soft miss
fn read_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    if !path.exists() {
        return None;
    }

    let parsed = std::fs::read_to_string(path)
        .map_err(ControlsError::from)
        .and_then(|contents| serde_json::from_str(&contents).map_err(ControlsError::from));

    match parsed {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Failed to read {}: {}", path.display(), e);
            None
        }
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ControlsError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent)?;
        tracing::info!("Created data directory {}", parent.display());
    }

    std::fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

fn into_maps(raw: RawEntries) -> BTreeMap<String, ControllerPositionMap> {
    raw.into_iter()
        .map(|(title, object)| (title, ControllerPositionMap::from_json_object(&object)))
        .collect()
}

/// Manually authored maps, keyed by exact title. Unversioned.
pub struct OverrideStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl OverrideStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All overrides currently on disk
    pub fn entries(&self) -> BTreeMap<String, ControllerPositionMap> {
        read_json::<RawEntries>(&self.path)
            .map(into_maps)
            .unwrap_or_default()
    }

    /// Override for a title; an entry with no usable positions is a miss
    pub fn get(&self, title: &str) -> Option<ControllerPositionMap> {
        self.entries().remove(title).filter(|map| !map.is_empty())
    }

    /// Merge one position into a title's override and persist immediately.
    ///
    /// An empty label removes the position; a title left with no positions
    /// is dropped from the store. Returns the title's resulting override.
    pub fn save_override(
        &self,
        title: &str,
        key: PositionKey,
        label: &str,
    ) -> Result<ControllerPositionMap, ControlsError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut entries = self.entries();
        let mut map = entries.remove(title).unwrap_or_default();

        let label = label.trim();
        if label.is_empty() {
            map.remove(key);
        } else {
            map.insert(key, label);
        }

        if !map.is_empty() {
            entries.insert(title.to_string(), map.clone());
        }

        write_json(&self.path, &entries)?;
        tracing::info!("Saved override for \"{}\" {}=\"{}\"", title, key, label);
        Ok(map)
    }
}

#[derive(Debug, Deserialize)]
struct RawCacheFile {
    #[serde(default)]
    version: Option<u32>,
    #[serde(default)]
    entries: RawEntries,
}

#[derive(Debug, Serialize)]
struct CacheFile<'a> {
    version: u32,
    entries: &'a BTreeMap<String, ControllerPositionMap>,
}

/// Generated maps, keyed by exact title, gated by a schema version.
///
/// A file written under any other version (or none) reads as empty, so
/// every title is regenerated on its next miss.
pub struct GeneratedCache {
    path: PathBuf,
    version: u32,
    lock: Mutex<()>,
}

impl GeneratedCache {
    pub fn new(path: impl Into<PathBuf>, version: u32) -> Self {
        Self {
            path: path.into(),
            version,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Entries valid under the current version
    pub fn entries(&self) -> BTreeMap<String, ControllerPositionMap> {
        let Some(raw) = read_json::<RawCacheFile>(&self.path) else {
            return BTreeMap::new();
        };

        if raw.version != Some(self.version) {
            tracing::info!(
                "Cache version mismatch (have {}, want {}), discarding",
                raw.version
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "none".into()),
                self.version
            );
            return BTreeMap::new();
        }

        into_maps(raw.entries)
    }

    pub fn get(&self, title: &str) -> Option<ControllerPositionMap> {
        self.entries().remove(title).filter(|map| !map.is_empty())
    }

    /// Store a map under the current version, dropping stale entries
    pub fn insert(&self, title: &str, map: &ControllerPositionMap) -> Result<(), ControlsError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut entries = self.entries();
        entries.insert(title.to_string(), map.clone());

        write_json(
            &self.path,
            &CacheFile {
                version: self.version,
                entries: &entries,
            },
        )?;
        tracing::info!("Cached controls for \"{}\"", title);
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CredentialsFile {
    #[serde(default)]
    anthropic_api_key: Option<String>,
}

/// Generation-service credential from the companion's JSON config file.
///
/// Read on every call so a key added while running is picked up.
pub fn read_api_key(path: &Path) -> Option<String> {
    read_json::<CredentialsFile>(path)?
        .anthropic_api_key
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
}
