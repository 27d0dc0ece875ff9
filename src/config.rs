use std::{
    collections::{BTreeMap, BTreeSet},
    path::PathBuf,
};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{error::ConfigError, level::Level};

pub const DEFAULT_NAME: &str = "ulog";

/// Per-sink settings. `threshold` is the minimum severity the sink accepts;
/// 0 means "everything, plus a free-memory record after each message".
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SinkConfig {
    #[serde(alias = "level")]
    pub threshold: i64,

    /// Factory used to build the sink. Falls back to the sink's own name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SinkConfig {
    pub fn new(threshold: i64) -> Self {
        Self {
            threshold,
            kind: None,
            host: None,
            extra: Map::new(),
        }
    }

    pub fn with_kind(self, kind: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            ..self
        }
    }

    pub fn with_host(self, host: impl Into<String>) -> Self {
        Self {
            host: Some(host.into()),
            ..self
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn kind_or<'a>(&'a self, name: &'a str) -> &'a str {
        self.kind.as_deref().unwrap_or(name)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.extra.get(key).and_then(Value::as_u64)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.extra.get(key).and_then(Value::as_bool)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub name: String,
    pub levels: BTreeSet<Level>,
    pub sinks: BTreeMap<String, SinkConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            levels: Level::ALL.into_iter().collect(),
            sinks: BTreeMap::from([("console".to_string(), SinkConfig::new(1))]),
        }
    }
}

impl EngineConfig {
    pub fn with_name(self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self
        }
    }

    pub fn with_levels(self, levels: impl IntoIterator<Item = Level>) -> Self {
        Self {
            levels: levels.into_iter().collect(),
            ..self
        }
    }

    pub fn with_sink(mut self, name: impl Into<String>, config: SinkConfig) -> Self {
        self.sinks.insert(name.into(), config);
        self
    }

    pub fn without_sinks(self) -> Self {
        Self {
            sinks: BTreeMap::new(),
            ..self
        }
    }
}

/// Something that can produce top-level config fields to lay over the
/// defaults.
pub trait OverrideSource {
    fn load(&self) -> Result<Map<String, Value>, ConfigError>;
}

impl OverrideSource for Map<String, Value> {
    fn load(&self) -> Result<Map<String, Value>, ConfigError> {
        Ok(self.clone())
    }
}

/// A JSON object on disk, e.g. `{"name": "node-1", "sinks": {...}}`.
#[derive(Clone, Debug)]
pub struct JsonFile {
    path: PathBuf,
}

impl JsonFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl OverrideSource for JsonFile {
    fn load(&self) -> Result<Map<String, Value>, ConfigError> {
        let contents = std::fs::read_to_string(&self.path).map_err(|source| ConfigError::Read {
            path: self.path.display().to_string(),
            source,
        })?;

        match serde_json::from_str(&contents)? {
            Value::Object(map) => Ok(map),
            _ => Err(ConfigError::NotAnObject),
        }
    }
}

/// Lays `overrides` over `defaults` one top-level key at a time. A key present
/// in `overrides` replaces the default value wholesale, so an overriding
/// `sinks` map is not merged with the default sinks.
pub fn merge(
    defaults: &EngineConfig,
    overrides: &Map<String, Value>,
) -> Result<EngineConfig, ConfigError> {
    let mut merged = match serde_json::to_value(defaults).map_err(ConfigError::Merge)? {
        Value::Object(map) => map,
        _ => return Err(ConfigError::NotAnObject),
    };

    for (key, value) in overrides {
        merged.insert(key.clone(), value.clone());
    }

    serde_json::from_value(Value::Object(merged)).map_err(ConfigError::Merge)
}

/// Builds the engine config from the defaults and an optional override. Any
/// failure to read or apply the override is reported and the defaults win.
pub fn build_config(source: Option<&dyn OverrideSource>) -> EngineConfig {
    let defaults = EngineConfig::default();

    let Some(source) = source else {
        return defaults;
    };

    match source.load().and_then(|overrides| merge(&defaults, &overrides)) {
        Ok(config) => config,
        Err(err) => {
            log::warn!(target: "ulog", "ignoring config override: {}", err);
            log::debug!(target: "ulog", "{:?}", err);
            defaults
        }
    }
}
