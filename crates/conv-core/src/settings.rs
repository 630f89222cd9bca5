//! Host settings with layered resolution
//!
//! Settings pick the environment, the host type and which conventions run.
//! They are loaded from a hierarchy of sources, later sources overriding
//! earlier ones:
//!
//! 1. Built-in defaults
//! 2. Global settings (`<config_dir>/conventions/settings.toml`)
//! 3. Content-root settings (`<content_root>/conventions.toml`)
//! 4. Environment variables (`CONVENTIONS_ENVIRONMENT`,
//!    `CONVENTIONS_HOST_TYPE`, `CONVENTIONS_CONTENT_ROOT`)
//!
//! ```toml
//! [host]
//! environment = "Development"
//! host_type = "unit-test"
//!
//! [conventions]
//! scan = true
//! seeds = ["app-core"]
//! exclude = ["app_core::TelemetryConvention"]
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::context::{HostEnvironment, HostType};
use crate::error::{Error, Result};

pub const GLOBAL_DIR_NAME: &str = "conventions";
pub const GLOBAL_FILE_NAME: &str = "settings.toml";
pub const LOCAL_FILE_NAME: &str = "conventions.toml";

pub const ENV_ENVIRONMENT: &str = "CONVENTIONS_ENVIRONMENT";
pub const ENV_HOST_TYPE: &str = "CONVENTIONS_HOST_TYPE";
pub const ENV_CONTENT_ROOT: &str = "CONVENTIONS_CONTENT_ROOT";

/// `[host]` table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostSection {
    pub environment: Option<String>,
    pub host_type: Option<HostType>,
    pub content_root: Option<PathBuf>,
}

/// `[conventions]` table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConventionSettings {
    /// Convention names that never run.
    ///
    /// A name matches a convention's full name or its short name, the full
    /// name minus its leading module path. Generic arguments stay in full:
    /// `Wrap<app::Db>`, not `Wrap`.
    pub exclude: Vec<String>,
    /// Discover conventions from linked modules.
    pub scan: Option<bool>,
    /// Seed modules for discovery.
    pub seeds: Vec<String>,
}

/// Effective host settings after merging every layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostSettings {
    pub host: HostSection,
    pub conventions: ConventionSettings,
}

impl HostSettings {
    /// Parse settings from TOML. `path` is used for error reporting only.
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|source| Error::Settings {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content, path)
    }

    /// Merge `other` over `self`. Scalars are overridden when set; lists are
    /// combined without duplicates.
    pub fn merge(&mut self, other: &HostSettings) {
        if other.host.environment.is_some() {
            self.host.environment = other.host.environment.clone();
        }
        if other.host.host_type.is_some() {
            self.host.host_type = other.host.host_type;
        }
        if other.host.content_root.is_some() {
            self.host.content_root = other.host.content_root.clone();
        }
        if other.conventions.scan.is_some() {
            self.conventions.scan = other.conventions.scan;
        }
        merge_unique(&mut self.conventions.exclude, &other.conventions.exclude);
        merge_unique(&mut self.conventions.seeds, &other.conventions.seeds);
    }

    pub fn environment_name(&self) -> &str {
        self.host
            .environment
            .as_deref()
            .unwrap_or(HostEnvironment::PRODUCTION)
    }

    pub fn host_type(&self) -> HostType {
        self.host.host_type.unwrap_or_default()
    }

    pub fn content_root(&self) -> &Path {
        self.host
            .content_root
            .as_deref()
            .unwrap_or_else(|| Path::new("."))
    }

    pub fn scan_enabled(&self) -> bool {
        self.conventions.scan.unwrap_or(false)
    }

    pub fn environment(&self) -> HostEnvironment {
        HostEnvironment::new(self.environment_name(), self.content_root())
    }
}

fn merge_unique(target: &mut Vec<String>, items: &[String]) {
    for item in items {
        if !target.contains(item) {
            target.push(item.clone());
        }
    }
}

type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Resolves [`HostSettings`] from every layer.
pub struct SettingsResolver {
    content_root: PathBuf,
    /// Override for the global settings directory (used for testing).
    global_config_dir_override: Option<PathBuf>,
    env_lookup: EnvLookup,
}

impl SettingsResolver {
    /// Create a resolver for `content_root`, reading the process environment.
    pub fn new(content_root: impl Into<PathBuf>) -> Self {
        Self {
            content_root: content_root.into(),
            global_config_dir_override: None,
            env_lookup: Arc::new(|name| std::env::var(name).ok()),
        }
    }

    /// Use `dir` instead of `<config_dir>/conventions`.
    pub fn with_global_config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.global_config_dir_override = Some(dir.into());
        self
    }

    /// Replace the environment variable lookup.
    pub fn with_env_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env_lookup = Arc::new(lookup);
        self
    }

    fn global_config_dir(&self) -> Option<PathBuf> {
        if let Some(ref dir) = self.global_config_dir_override {
            return Some(dir.clone());
        }
        dirs::config_dir().map(|d| d.join(GLOBAL_DIR_NAME))
    }

    pub fn content_root(&self) -> &Path {
        &self.content_root
    }

    /// Merge every layer. Missing files are skipped; malformed files and
    /// invalid environment values are errors.
    pub fn resolve(&self) -> Result<HostSettings> {
        let mut settings = HostSettings::default();
        settings.host.content_root = Some(self.content_root.clone());

        if let Some(global_dir) = self.global_config_dir() {
            let global_path = global_dir.join(GLOBAL_FILE_NAME);
            if global_path.is_file() {
                tracing::debug!(?global_path, "Loading global settings (layer 2)");
                settings.merge(&HostSettings::load(&global_path)?);
            } else {
                tracing::debug!(?global_path, "No global settings found (layer 2), skipping");
            }
        }

        let local_path = self.content_root.join(LOCAL_FILE_NAME);
        if local_path.is_file() {
            tracing::debug!(?local_path, "Loading content-root settings (layer 3)");
            settings.merge(&HostSettings::load(&local_path)?);
        }

        let mut overrides = HostSettings::default();
        if let Some(environment) = (self.env_lookup)(ENV_ENVIRONMENT) {
            overrides.host.environment = Some(environment);
        }
        if let Some(host_type) = (self.env_lookup)(ENV_HOST_TYPE) {
            overrides.host.host_type = Some(host_type.parse()?);
        }
        if let Some(content_root) = (self.env_lookup)(ENV_CONTENT_ROOT) {
            overrides.host.content_root = Some(PathBuf::from(content_root));
        }
        if overrides != HostSettings::default() {
            tracing::debug!(?overrides, "Applying environment overrides (layer 4)");
            settings.merge(&overrides);
        }

        Ok(settings)
    }
}

impl fmt::Debug for SettingsResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingsResolver")
            .field("content_root", &self.content_root)
            .field("global_config_dir_override", &self.global_config_dir_override)
            .finish_non_exhaustive()
    }
}
