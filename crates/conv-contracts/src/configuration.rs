//! Configuration contract
//!
//! Configuration conventions append sources to a [`ConfigurationBuilder`].
//! Building merges the sources in order, later sources overriding earlier
//! ones, into a flat [`Configuration`] keyed by `section:key` paths.
//!
//! File-format adapters (JSON, YAML, INI) live outside this crate; they only
//! need to implement [`ConfigurationSource`].

use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Separator between path segments in configuration keys.
pub const KEY_DELIMITER: &str = ":";

/// A provider of flat key/value configuration data.
pub trait ConfigurationSource: Send + Sync {
    /// Name used in diagnostics.
    fn name(&self) -> &str;

    /// Load all values exposed by this source.
    fn load(&self) -> Result<BTreeMap<String, String>>;
}

/// Fixed in-memory values.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    values: BTreeMap<String, String>,
}

impl MemorySource {
    pub fn new<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: values
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl ConfigurationSource for MemorySource {
    fn name(&self) -> &str {
        "memory"
    }

    fn load(&self) -> Result<BTreeMap<String, String>> {
        Ok(self.values.clone())
    }
}

/// Process environment variables, optionally filtered by prefix.
///
/// The prefix is stripped and `__` is translated to the key delimiter, so
/// `APP_Logging__Level` with prefix `APP_` becomes `Logging:Level`.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentSource {
    prefix: Option<String>,
}

impl EnvironmentSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }

    fn collect<I>(&self, vars: I) -> BTreeMap<String, String>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        vars.into_iter()
            .filter_map(|(key, value)| {
                let key = match &self.prefix {
                    Some(prefix) => key.strip_prefix(prefix.as_str())?.to_string(),
                    None => key,
                };
                if key.is_empty() {
                    return None;
                }
                Some((key.replace("__", KEY_DELIMITER), value))
            })
            .collect()
    }
}

impl ConfigurationSource for EnvironmentSource {
    fn name(&self) -> &str {
        "environment"
    }

    fn load(&self) -> Result<BTreeMap<String, String>> {
        Ok(self.collect(std::env::vars()))
    }
}

/// Ordered list of configuration sources.
#[derive(Default)]
pub struct ConfigurationBuilder {
    sources: Vec<Box<dyn ConfigurationSource>>,
}

impl ConfigurationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a source. Later sources override earlier ones.
    pub fn add_source(&mut self, source: impl ConfigurationSource + 'static) -> &mut Self {
        self.sources.push(Box::new(source));
        self
    }

    pub fn add_in_memory<I, K, V>(&mut self, values: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.add_source(MemorySource::new(values))
    }

    pub fn add_environment_variables(&mut self, prefix: Option<&str>) -> &mut Self {
        match prefix {
            Some(prefix) => self.add_source(EnvironmentSource::with_prefix(prefix)),
            None => self.add_source(EnvironmentSource::new()),
        }
    }

    /// Names of the registered sources, in order.
    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Load every source and merge them into a [`Configuration`].
    pub fn build(&self) -> Result<Configuration> {
        let mut configuration = Configuration::default();
        for source in &self.sources {
            let values = source.load()?;
            tracing::debug!(
                source = source.name(),
                count = values.len(),
                "Loaded configuration source"
            );
            for (key, value) in values {
                configuration.insert(&key, value);
            }
        }
        Ok(configuration)
    }
}

impl fmt::Debug for ConfigurationBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigurationBuilder")
            .field("sources", &self.source_names())
            .finish()
    }
}

/// Merged configuration values.
///
/// Keys are case-insensitive; the casing of the first occurrence is kept for
/// display through [`Configuration::keys`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Configuration {
    values: BTreeMap<String, (String, String)>,
}

impl Configuration {
    fn normalize(key: &str) -> String {
        key.to_ascii_lowercase()
    }

    fn insert(&mut self, key: &str, value: String) {
        self.values
            .entry(Self::normalize(key))
            .and_modify(|(_, existing)| *existing = value.clone())
            .or_insert_with(|| (key.to_string(), value));
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(&Self::normalize(key))
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(&Self::normalize(key))
    }

    /// Keys in sorted order, with their original casing.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.values().map(|(key, _)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values below `path`, with the `path:` prefix removed.
    pub fn section(&self, path: &str) -> Configuration {
        let prefix = format!("{}{}", Self::normalize(path), KEY_DELIMITER);
        let mut section = Configuration::default();
        for (normalized, (key, value)) in &self.values {
            if normalized.starts_with(&prefix) {
                section.insert(&key[prefix.len()..], value.clone());
            }
        }
        section
    }

    /// Deserialize the section at `path` (or the whole configuration when
    /// `path` is empty) into `T`.
    ///
    /// Values that parse as JSON numbers or booleans are bound as such;
    /// everything else is bound as a string.
    pub fn bind<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let scope = if path.is_empty() {
            self.clone()
        } else {
            self.section(path)
        };

        let mut root = Map::new();
        for (key, value) in scope.values.values() {
            let segments: Vec<&str> = key.split(KEY_DELIMITER).collect();
            insert_path(&mut root, &segments, scalar(value));
        }

        serde_json::from_value(Value::Object(root)).map_err(|source| Error::Bind {
            section: path.to_string(),
            source,
        })
    }
}

fn scalar(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ (Value::Number(_) | Value::Bool(_))) => value,
        _ => Value::String(raw.to_string()),
    }
}

fn insert_path(map: &mut Map<String, Value>, segments: &[&str], value: Value) {
    match segments {
        [] => {}
        [last] => {
            map.insert(last.to_string(), value);
        }
        [head, rest @ ..] => {
            let child = map
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            if let Value::Object(child) = child {
                insert_path(child, rest, value);
            }
        }
    }
}
