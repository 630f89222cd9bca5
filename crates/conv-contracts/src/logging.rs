//! Logging contract
//!
//! Logging conventions adjust a [`LoggingBuilder`]: the minimum level and any
//! per-target filter directives. The host turns the result into a
//! `tracing_subscriber` filter and installs it.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::error::{Error, Result};

/// Accumulated logging settings.
#[derive(Debug, Clone)]
pub struct LoggingBuilder {
    minimum_level: LevelFilter,
    directives: Vec<String>,
    honor_env: bool,
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self {
            minimum_level: LevelFilter::INFO,
            directives: Vec::new(),
            honor_env: true,
        }
    }
}

impl LoggingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_minimum_level(&mut self, level: LevelFilter) -> &mut Self {
        self.minimum_level = level;
        self
    }

    pub fn minimum_level(&self) -> LevelFilter {
        self.minimum_level
    }

    /// Add a filter directive such as `conv_core=debug`.
    pub fn add_directive(&mut self, directive: impl Into<String>) -> &mut Self {
        self.directives.push(directive.into());
        self
    }

    pub fn directives(&self) -> &[String] {
        &self.directives
    }

    /// Whether `RUST_LOG` directives are appended after the configured ones.
    pub fn honor_env(&mut self, honor: bool) -> &mut Self {
        self.honor_env = honor;
        self
    }

    /// Build the filter. Directives from `RUST_LOG` come last so they win.
    pub fn build_filter(&self) -> Result<EnvFilter> {
        let mut filter = EnvFilter::builder()
            .with_default_directive(self.minimum_level.into())
            .parse("")
            .map_err(|e| Error::InvalidDirective(e.to_string()))?;

        let env_directives = if self.honor_env {
            std::env::var(EnvFilter::DEFAULT_ENV).ok()
        } else {
            None
        };

        let configured = self.directives.iter().map(String::as_str);
        let from_env = env_directives.iter().flat_map(|raw| raw.split(','));
        for directive in configured.chain(from_env) {
            let directive = directive.trim();
            if directive.is_empty() {
                continue;
            }
            let parsed = directive
                .parse()
                .map_err(|_| Error::InvalidDirective(directive.to_string()))?;
            filter = filter.add_directive(parsed);
        }
        Ok(filter)
    }

    /// Install a compact `fmt` subscriber with the built filter.
    pub fn try_init(&self) -> Result<()> {
        let fmt_layer = fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_file(true)
            .with_line_number(true)
            .compact();

        tracing_subscriber::registry()
            .with(self.build_filter()?)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| Error::LoggingInit(e.to_string()))
    }
}
