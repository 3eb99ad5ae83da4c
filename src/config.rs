use std::fs;
use std::num::NonZeroUsize;

use camino::Utf8PathBuf;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::IngressError;
use crate::fetch::BioIndexEndpoint;
use crate::reference::ReferencePaths;

pub const DEFAULT_CONFIG_FILE: &str = "kg-ingress.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub bioindex: Option<BioIndexEntry>,
    #[serde(default)]
    pub references: Option<ReferencesEntry>,
    #[serde(default)]
    pub store: Option<StoreEntry>,
    #[serde(default)]
    pub normalize: Option<NormalizeEntry>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct BioIndexEntry {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub index: Option<String>,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ReferencesEntry {
    #[serde(default)]
    pub ontology: Option<Utf8PathBuf>,
    #[serde(default)]
    pub catalog: Option<Utf8PathBuf>,
    #[serde(default)]
    pub portal: Option<Utf8PathBuf>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct StoreEntry {
    #[serde(default)]
    pub path: Option<Utf8PathBuf>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct NormalizeEntry {
    #[serde(default)]
    pub workers: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub bioindex: BioIndexEndpoint,
    pub references: ReferencePaths,
    pub store_path: Utf8PathBuf,
    pub workers: usize,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Reads the given config file, or `kg-ingress.json` in the current
    /// directory when present. Without either, every setting takes its default.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, IngressError> {
        let config_path = Utf8PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_FILE));
        if path.is_none() && !config_path.as_std_path().exists() {
            return Self::resolve_config(Config::default());
        }

        let content = fs::read_to_string(config_path.as_std_path())
            .map_err(|_| IngressError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| IngressError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, IngressError> {
        let schema_version = config.schema_version.unwrap_or(1);

        let defaults = BioIndexEndpoint::default();
        let bioindex = config.bioindex.unwrap_or_default();
        let bioindex = BioIndexEndpoint {
            base_url: bioindex.base_url.unwrap_or(defaults.base_url),
            index: bioindex.index.unwrap_or(defaults.index),
            query: bioindex.query.unwrap_or(defaults.query),
            timeout_secs: bioindex.timeout_secs.unwrap_or(defaults.timeout_secs),
        };
        if bioindex.base_url.trim().is_empty() || bioindex.index.trim().is_empty() {
            return Err(IngressError::ConfigValue(
                "bioindex base_url and index must not be empty".to_string(),
            ));
        }

        let defaults = ReferencePaths::default();
        let references = config.references.unwrap_or_default();
        let references = ReferencePaths {
            ontology: references.ontology.unwrap_or(defaults.ontology),
            catalog: references.catalog.unwrap_or(defaults.catalog),
            portal: references.portal.unwrap_or(defaults.portal),
        };

        let store_path = match config.store.and_then(|store| store.path) {
            Some(path) => path,
            None => default_store_path()?,
        };

        let workers = match config.normalize.and_then(|normalize| normalize.workers) {
            Some(0) => {
                return Err(IngressError::ConfigValue(
                    "normalize.workers must be at least 1".to_string(),
                ));
            }
            Some(workers) => workers,
            None => default_workers(),
        };

        Ok(ResolvedConfig {
            schema_version,
            bioindex,
            references,
            store_path,
            workers,
        })
    }
}

pub fn default_store_path() -> Result<Utf8PathBuf, IngressError> {
    let Some(dirs) = ProjectDirs::from("org", "hugeamp", "kg-ingress") else {
        return Ok(Utf8PathBuf::from(".kg-ingress/graph.db"));
    };
    Utf8PathBuf::from_path_buf(dirs.data_dir().join("graph.db"))
        .map_err(|_| IngressError::Filesystem("data directory is not valid UTF-8".to_string()))
}

pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}
