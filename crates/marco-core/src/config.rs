//! Tool configuration.
//!
//! Every field has a default; a JSON file only needs the keys it overrides.

use crate::error::{MarcoError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming an optional JSON configuration file.
pub const CONFIG_ENV: &str = "MARCO_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarcoConfig {
    /// Base URL of the compatibility query service.
    pub server_url: String,
    /// JSON file holding discovered compatibility sets.
    pub compatibility_store: PathBuf,
    /// Remote repository used for version lists.
    pub repository_url: String,
    /// Local repository used with `--use_local`.
    pub local_repository: PathBuf,
    /// Build tool executable.
    pub maven: String,
    /// Program turning version lists into a range, e.g. `["jython", "range_converter.py"]`.
    pub range_converter: Vec<String>,
    pub oracle: OracleConfig,
    pub search: SearchConfig,
    pub rewrite: RewriteConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Invoked as `<cmd...> <group> <artifact> <base> <candidate>`.
    pub static_command: Vec<String>,
    pub dynamic_command: Vec<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Candidates examined per direction before the walk gives up.
    pub index_limit: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewriteConfig {
    /// Maximum number of dependency-injection rounds.
    pub injection_rounds: usize,
}

impl Default for MarcoConfig {
    fn default() -> Self {
        let local_repository = dirs::home_dir()
            .map(|home| home.join(".m2").join("repository"))
            .unwrap_or_else(|| PathBuf::from(".m2/repository"));

        Self {
            server_url: "http://127.0.0.1:5000".into(),
            compatibility_store: PathBuf::from("compatibility_store.json"),
            repository_url: crate::registry::MAVEN_CENTRAL.into(),
            local_repository,
            maven: "mvn".into(),
            range_converter: vec!["jython".into(), "range_converter.py".into()],
            oracle: OracleConfig::default(),
            search: SearchConfig::default(),
            rewrite: RewriteConfig::default(),
        }
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            static_command: vec!["marco-static-check".into()],
            dynamic_command: vec!["marco-dynamic-check".into()],
            timeout_secs: 1800,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { index_limit: 50 }
    }
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            injection_rounds: 5,
        }
    }
}

impl MarcoConfig {
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| MarcoError::Config(e.to_string()))
    }

    pub async fn from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            MarcoError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&content)
    }

    /// Loads `explicit`, else the file named by `MARCO_CONFIG`, else defaults.
    pub async fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path).await;
        }
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path)).await,
            None => Ok(Self::default()),
        }
    }
}
