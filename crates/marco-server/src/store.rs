//! Persistent compatibility store.
//!
//! A single JSON object mapping `group:artifact:version` to the versions
//! found compatible with it. Sets only grow: a merge is a union with what is
//! already stored.

use crate::error::{CompatError, Result};
use marco_core::compare_versions;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

pub type CompatibilityMap = BTreeMap<String, BTreeSet<String>>;

#[derive(Debug, Clone)]
pub struct CompatibilityStore {
    path: PathBuf,
}

impl CompatibilityStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the whole store. A missing or blank file is an empty store.
    pub async fn load(&self) -> Result<CompatibilityMap> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(CompatibilityMap::new()),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(CompatibilityMap::new());
        }

        serde_json::from_str(&content).map_err(|e| CompatError::Store {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }

    pub async fn get(&self, key: &str) -> Result<Option<BTreeSet<String>>> {
        Ok(self.load().await?.remove(key))
    }

    /// Writes the store, each set listed newest first.
    pub async fn save(&self, map: &CompatibilityMap) -> Result<()> {
        let ordered: BTreeMap<&str, Vec<&str>> = map
            .iter()
            .map(|(key, versions)| (key.as_str(), newest_first(versions)))
            .collect();
        let json = serde_json::to_string_pretty(&ordered)?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Unions `versions` into the set stored under `key` and returns the result.
    pub async fn merge(
        &self,
        key: &str,
        versions: impl IntoIterator<Item = String>,
    ) -> Result<BTreeSet<String>> {
        let mut map = self.load().await?;
        let entry = map.entry(key.to_string()).or_default();
        entry.extend(versions);
        let merged = entry.clone();
        self.save(&map).await?;

        tracing::debug!("stored {} compatible versions for {}", merged.len(), key);
        Ok(merged)
    }
}

/// Versions of a set ordered newest first.
pub fn newest_first(versions: &BTreeSet<String>) -> Vec<&str> {
    let mut ordered: Vec<&str> = versions.iter().map(String::as_str).collect();
    ordered.sort_by(|a, b| compare_versions(b, a));
    ordered
}
