//! In-memory store configuration and region directory.
//!
//! Values are looked up in the order's store scope first and fall back to the
//! default scope, the same way store views inherit configuration.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use ordersync_core::StoreScope;
use ordersync_orders::{RegionDirectory, StoreConfigProvider};

#[derive(Debug, thiserror::Error)]
pub enum StoreConfigLoadError {
    #[error("failed to read store configuration file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid store configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid store scope `{0}` (expected a non-negative integer)")]
    InvalidScope(String),
}

/// On-disk shape of the store configuration file.
///
/// ```json
/// {
///   "scopes": {
///     "0": { "general/store_information/city": "Leipzig" },
///     "1": { "general/store_information/name": "Print Shop" }
///   },
///   "regions": { "91": "SN" }
/// }
/// ```
#[derive(Debug, Default, Deserialize)]
struct StoreConfigFile {
    #[serde(default)]
    scopes: HashMap<String, HashMap<String, String>>,
    #[serde(default)]
    regions: HashMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryStoreConfig {
    values: HashMap<(StoreScope, String), String>,
}

impl InMemoryStoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, scope: StoreScope, path: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(scope, path, value);
        self
    }

    pub fn set(&mut self, scope: StoreScope, path: impl Into<String>, value: impl Into<String>) {
        self.values.insert((scope, path.into()), value.into());
    }
}

impl StoreConfigProvider for InMemoryStoreConfig {
    fn config_value(&self, path: &str, scope: StoreScope) -> Option<String> {
        self.values
            .get(&(scope, path.to_string()))
            .or_else(|| self.values.get(&(StoreScope::DEFAULT, path.to_string())))
            .cloned()
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryRegionDirectory {
    codes: HashMap<String, String>,
}

impl InMemoryRegionDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_region(mut self, region_id: impl Into<String>, code: impl Into<String>) -> Self {
        self.codes.insert(region_id.into(), code.into());
        self
    }
}

impl RegionDirectory for InMemoryRegionDirectory {
    fn region_code(&self, region_id: &str) -> Option<String> {
        self.codes.get(region_id).cloned()
    }
}

/// Parse a store configuration document.
pub fn parse_store_config(
    json: &str,
) -> Result<(InMemoryStoreConfig, InMemoryRegionDirectory), StoreConfigLoadError> {
    let file: StoreConfigFile = serde_json::from_str(json)?;

    let mut config = InMemoryStoreConfig::new();
    for (scope, values) in file.scopes {
        let scope_id = scope
            .trim()
            .parse::<u32>()
            .map_err(|_| StoreConfigLoadError::InvalidScope(scope.clone()))?;
        for (path, value) in values {
            config.set(StoreScope(scope_id), path, value);
        }
    }

    let regions = InMemoryRegionDirectory { codes: file.regions };
    Ok((config, regions))
}

/// Load a store configuration file from disk.
pub fn load_store_config(
    path: impl AsRef<Path>,
) -> Result<(InMemoryStoreConfig, InMemoryRegionDirectory), StoreConfigLoadError> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path).map_err(|source| StoreConfigLoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_store_config(&json)
}
