//! Per-run convention context
//!
//! A [`ConventionContext`] is created at the start of every composition run
//! and dropped when the run ends. Every convention in the run receives the
//! same context, so values written to its properties by one convention are
//! visible to all later ones.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::properties::{PropertyBag, PropertyKey};

/// Distinguishes production composition from test composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HostType {
    #[default]
    Undefined,
    Live,
    UnitTest,
}

impl HostType {
    pub fn as_str(&self) -> &'static str {
        match self {
            HostType::Undefined => "undefined",
            HostType::Live => "live",
            HostType::UnitTest => "unit-test",
        }
    }
}

impl FromStr for HostType {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "undefined" => Ok(HostType::Undefined),
            "live" => Ok(HostType::Live),
            "unit-test" | "unittest" | "test" => Ok(HostType::UnitTest),
            _ => Err(Error::InvalidHostType {
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Well-known property key holding the environment name, seeded into every
/// context so conventions can read it without a reference to the
/// environment itself.
pub const ENVIRONMENT_NAME: PropertyKey<String> = PropertyKey::new("environment-name");

/// Read-only view of the hosting environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEnvironment {
    name: String,
    content_root: PathBuf,
}

impl HostEnvironment {
    pub const DEVELOPMENT: &'static str = "Development";
    pub const STAGING: &'static str = "Staging";
    pub const PRODUCTION: &'static str = "Production";

    pub fn new(name: impl Into<String>, content_root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            content_root: content_root.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content_root(&self) -> &Path {
        &self.content_root
    }

    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    pub fn is_development(&self) -> bool {
        self.is(Self::DEVELOPMENT)
    }

    pub fn is_production(&self) -> bool {
        self.is(Self::PRODUCTION)
    }
}

impl Default for HostEnvironment {
    fn default() -> Self {
        Self::new(Self::PRODUCTION, ".")
    }
}

/// Write-only log sink for conventions.
///
/// Events are emitted through `tracing` inside the span of the current
/// composition run.
#[derive(Debug, Clone)]
pub struct ConventionLogger {
    span: tracing::Span,
}

impl ConventionLogger {
    pub fn new(span: tracing::Span) -> Self {
        Self { span }
    }

    /// A logger that is not attached to any run span.
    pub fn disabled() -> Self {
        Self::new(tracing::Span::none())
    }

    pub fn span(&self) -> &tracing::Span {
        &self.span
    }

    pub fn debug(&self, message: &str) {
        self.span.in_scope(|| tracing::debug!(target: "conventions", "{message}"));
    }

    pub fn info(&self, message: &str) {
        self.span.in_scope(|| tracing::info!(target: "conventions", "{message}"));
    }

    pub fn warn(&self, message: &str) {
        self.span.in_scope(|| tracing::warn!(target: "conventions", "{message}"));
    }

    pub fn error(&self, message: &str) {
        self.span.in_scope(|| tracing::error!(target: "conventions", "{message}"));
    }
}

/// State shared by all conventions of one composition run.
#[derive(Debug)]
pub struct ConventionContext {
    properties: PropertyBag,
    host_type: HostType,
    environment: HostEnvironment,
    logger: ConventionLogger,
}

impl ConventionContext {
    pub fn new(
        environment: HostEnvironment,
        logger: ConventionLogger,
        properties: PropertyBag,
    ) -> Self {
        let mut properties = properties;
        properties.insert_keyed(&ENVIRONMENT_NAME, environment.name().to_string());
        Self {
            properties,
            host_type: HostType::Undefined,
            environment,
            logger,
        }
    }

    pub fn with_host_type(mut self, host_type: HostType) -> Self {
        self.host_type = host_type;
        self.properties.insert(host_type);
        self
    }

    pub fn host_type(&self) -> HostType {
        self.host_type
    }

    pub fn environment(&self) -> &HostEnvironment {
        &self.environment
    }

    pub fn logger(&self) -> &ConventionLogger {
        &self.logger
    }

    pub fn properties(&self) -> &PropertyBag {
        &self.properties
    }

    pub fn properties_mut(&mut self) -> &mut PropertyBag {
        &mut self.properties
    }

    /// End the run, keeping what the conventions stored.
    pub fn into_properties(self) -> PropertyBag {
        self.properties
    }

    pub fn get<T: 'static>(&self) -> Option<&T> {
        self.properties.get()
    }

    pub fn set<T: Clone + Send + Sync + 'static>(&mut self, value: T) -> &mut Self {
        self.properties.insert(value);
        self
    }

    pub fn get_or_add<T, F>(&mut self, factory: F) -> &mut T
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> T,
    {
        self.properties.get_or_insert_with(factory)
    }

    pub fn get_keyed<T: 'static>(&self, key: &PropertyKey<T>) -> Option<&T> {
        self.properties.get_keyed(key)
    }

    pub fn set_keyed<T: Clone + Send + Sync + 'static>(
        &mut self,
        key: &PropertyKey<T>,
        value: T,
    ) -> &mut Self {
        self.properties.insert_keyed(key, value);
        self
    }

    pub fn get_or_add_keyed<T, F>(&mut self, key: &PropertyKey<T>, factory: F) -> &mut T
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> T,
    {
        self.properties.get_or_insert_keyed(key, factory)
    }
}
