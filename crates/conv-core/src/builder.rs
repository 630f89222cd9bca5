//! Builder façade
//!
//! [`ConventionHostBuilder`] is the entry point of the engine. It collects
//! conventions (explicitly, or by scanning linked modules), owns the property
//! bag that seeds every run, and builds: plan, fresh context, compose, then
//! the terminal step.
//!
//! ```
//! use conv_core::{ConventionHostBuilder, Delegate, ConventionMetadata, SetupTerminal};
//!
//! let mut builder = ConventionHostBuilder::new();
//! builder.append_delegate(
//!     Delegate::setup(|ctx| {
//!         ctx.set(42u32);
//!         Ok(())
//!     }),
//!     ConventionMetadata::new(),
//! );
//!
//! let context = builder.build_blocking(SetupTerminal).unwrap();
//! assert_eq!(context.get::<u32>(), Some(&42));
//! ```

use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::catalog::Catalog;
use crate::composer::Composer;
use crate::context::{ConventionContext, ConventionLogger, HostEnvironment, HostType};
use crate::diagnostics::Diagnostic;
use crate::discovery::{CandidateFinder, Direction, InventorySource, ModuleSource, Scanner};
use crate::entry::{ConventionEntry, ConventionMetadata, Delegate};
use crate::error::{Error, Result};
use crate::id::ConventionId;
use crate::properties::{PropertyBag, PropertyKey};
use crate::resolver::{Resolution, Resolver};
use crate::settings::HostSettings;
use crate::terminal::Terminal;

/// The ordered entries of one build, with everything worth reporting.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    resolution: Resolution,
}

impl Plan {
    pub fn entries(&self) -> &[ConventionEntry] {
        self.resolution.entries()
    }

    pub fn ids(&self) -> Vec<ConventionId> {
        self.resolution.ids()
    }

    /// Discovery, duplicate and ordering diagnostics, in that order.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.resolution.diagnostics()
    }

    pub fn len(&self) -> usize {
        self.resolution.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolution.is_empty()
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.resolution, f)
    }
}

struct Scanning {
    source: Arc<dyn ModuleSource>,
    seeds: Vec<String>,
    direction: Direction,
}

/// Collects conventions and runs them.
pub struct ConventionHostBuilder {
    properties: PropertyBag,
    prepended: Vec<ConventionEntry>,
    appended: Vec<ConventionEntry>,
    excluded_ids: Vec<ConventionId>,
    excluded_names: Vec<String>,
    scanning: Option<Scanning>,
    host_type: HostType,
    environment: HostEnvironment,
}

impl Default for ConventionHostBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConventionHostBuilder {
    pub fn new() -> Self {
        Self {
            properties: PropertyBag::new(),
            prepended: Vec::new(),
            appended: Vec::new(),
            excluded_ids: Vec::new(),
            excluded_names: Vec::new(),
            scanning: None,
            host_type: HostType::Undefined,
            environment: HostEnvironment::default(),
        }
    }

    /// Configure environment, host type, exclusions and scanning from
    /// resolved settings.
    pub fn from_settings(settings: &HostSettings) -> Self {
        let mut builder = Self::new();
        builder
            .with_environment(settings.environment())
            .with_host_type(settings.host_type());
        builder
            .excluded_names
            .extend(settings.conventions.exclude.iter().cloned());
        if settings.scan_enabled() {
            builder.scan(settings.conventions.seeds.iter().cloned());
        }
        builder
    }

    pub fn properties(&self) -> &PropertyBag {
        &self.properties
    }

    pub fn properties_mut(&mut self) -> &mut PropertyBag {
        &mut self.properties
    }

    pub fn set_property<T: Clone + Send + Sync + 'static>(&mut self, value: T) -> &mut Self {
        self.properties.insert(value);
        self
    }

    pub fn set_property_keyed<T: Clone + Send + Sync + 'static>(
        &mut self,
        key: &PropertyKey<T>,
        value: T,
    ) -> &mut Self {
        self.properties.insert_keyed(key, value);
        self
    }

    pub fn append_convention(&mut self, entry: ConventionEntry) -> &mut Self {
        self.appended.push(entry);
        self
    }

    pub fn append_conventions(
        &mut self,
        entries: impl IntoIterator<Item = ConventionEntry>,
    ) -> &mut Self {
        self.appended.extend(entries);
        self
    }

    /// Declare an entry ahead of every discovered and appended entry.
    pub fn prepend_convention(&mut self, entry: ConventionEntry) -> &mut Self {
        self.prepended.push(entry);
        self
    }

    pub fn append_delegate(&mut self, delegate: Delegate, metadata: ConventionMetadata) -> &mut Self {
        self.append_convention(delegate.into_entry(metadata))
    }

    pub fn prepend_delegate(
        &mut self,
        delegate: Delegate,
        metadata: ConventionMetadata,
    ) -> &mut Self {
        self.prepend_convention(delegate.into_entry(metadata))
    }

    /// Never run the convention with this identity.
    pub fn exclude(&mut self, id: ConventionId) -> &mut Self {
        if !self.excluded_ids.contains(&id) {
            self.excluded_ids.push(id);
        }
        self
    }

    pub fn with_host_type(&mut self, host_type: HostType) -> &mut Self {
        self.host_type = host_type;
        self
    }

    pub fn with_environment(&mut self, environment: HostEnvironment) -> &mut Self {
        self.environment = environment;
        self
    }

    /// Discover conventions from modules linked into this binary.
    pub fn scan<I, S>(&mut self, seeds: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scan_with(InventorySource, seeds)
    }

    /// Discover conventions from `source`.
    pub fn scan_with<I, S>(&mut self, source: impl ModuleSource + 'static, seeds: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scanning = Some(Scanning {
            source: Arc::new(source),
            seeds: seeds.into_iter().map(Into::into).collect(),
            direction: Direction::default(),
        });
        self
    }

    /// Walk the module graph this way when scanning.
    pub fn with_scan_direction(&mut self, direction: Direction) -> &mut Self {
        if let Some(scanning) = self.scanning.as_mut() {
            scanning.direction = direction;
        }
        self
    }

    pub fn host_type(&self) -> HostType {
        self.host_type
    }

    pub fn environment(&self) -> &HostEnvironment {
        &self.environment
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning.is_some()
    }

    /// Excluded by identity, by full name, or by
    /// [`short_name`](ConventionId::short_name), which keeps generic
    /// arguments verbatim.
    fn is_excluded(&self, id: ConventionId) -> bool {
        self.excluded_ids.contains(&id)
            || self
                .excluded_names
                .iter()
                .any(|name| name == id.name() || name == id.short_name())
    }

    /// Snapshot the declared and discovered entries and resolve their order.
    ///
    /// Entries are declared prepended first, then discovered, then appended.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingDependency`] if a required dependency is
    /// absent for the active host type.
    pub fn plan(&self) -> Result<Plan> {
        let mut catalog = Catalog::new();
        let mut diagnostics = Vec::new();

        catalog.add_range(self.prepended.iter().cloned());
        if let Some(scanning) = &self.scanning {
            let candidates = CandidateFinder::new(scanning.source.as_ref())
                .with_direction(scanning.direction)
                .find_candidates(scanning.seeds.as_slice());
            let report = Scanner::scan(&candidates);
            diagnostics.extend(report.diagnostics);
            catalog.add_range(report.entries);
        }
        catalog.add_range(self.appended.iter().cloned());

        let (entries, duplicates) = catalog.into_parts();
        diagnostics.extend(duplicates);

        let entries: Vec<ConventionEntry> = entries
            .into_iter()
            .filter(|entry| {
                let excluded = self.is_excluded(entry.id());
                if excluded {
                    tracing::debug!(id = %entry.id(), "Convention excluded");
                }
                !excluded
            })
            .collect();

        let resolution = Resolver::resolve(entries, self.host_type)?;
        Ok(Plan {
            resolution: resolution.with_leading_diagnostics(diagnostics),
        })
    }

    /// A fresh context for one run, seeded from a copy of the builder's
    /// properties.
    pub(crate) fn create_context(&self) -> ConventionContext {
        let span = tracing::debug_span!(
            "composition",
            environment = %self.environment.name(),
            host_type = %self.host_type
        );
        ConventionContext::new(
            self.environment.clone(),
            ConventionLogger::new(span),
            self.properties.clone(),
        )
        .with_host_type(self.host_type)
    }

    /// Run every convention of the terminal's contract and finish.
    ///
    /// Each call is an independent run with its own context.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingDependency`] from planning
    /// - [`Error::ConventionFailed`] or [`Error::Cancelled`] from composition
    /// - [`Error::Terminal`] if the terminal step fails
    pub async fn build<T: Terminal>(
        &self,
        mut terminal: T,
        cancellation: &CancellationToken,
    ) -> Result<T::Output> {
        let plan = self.plan()?;
        let mut context = self.create_context();
        let span = context.logger().span().clone();

        async move {
            tracing::debug!(conventions = plan.len(), "Starting composition");
            let contract = {
                let mut target = terminal.target();
                let contract = target.contract();
                Composer::new(plan.entries())
                    .compose(&mut context, &mut target, cancellation)
                    .await?;
                contract
            };
            terminal
                .finish(context)
                .map_err(|source| Error::Terminal { contract, source })
        }
        .instrument(span)
        .await
    }

    /// [`build`](Self::build) on a current-thread runtime, without
    /// cancellation.
    pub fn build_blocking<T: Terminal>(&self, terminal: T) -> Result<T::Output> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;
        runtime.block_on(self.build(terminal, &CancellationToken::new()))
    }
}

impl fmt::Debug for ConventionHostBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConventionHostBuilder")
            .field("properties", &self.properties)
            .field("prepended", &self.prepended.len())
            .field("appended", &self.appended.len())
            .field("excluded_ids", &self.excluded_ids)
            .field("excluded_names", &self.excluded_names)
            .field("scanning", &self.scanning.as_ref().map(|s| &s.seeds))
            .field("host_type", &self.host_type)
            .field("environment", &self.environment)
            .finish()
    }
}
