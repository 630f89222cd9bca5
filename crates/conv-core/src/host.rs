//! Full host pipeline
//!
//! [`ConventionHostBuilder::build_host`] runs every contract in one pass over
//! a single plan and a single context:
//!
//! 1. setup
//! 2. configuration, then the configuration is built
//! 3. logging
//! 4. services, then the provider factory creates the provider
//! 5. command line
//! 6. webjobs
//! 7. host created, with a handle to the new [`Host`]

use std::collections::BTreeMap;

use conv_contracts::{
    CommandLineBuilder, Configuration, ConfigurationBuilder, HostHandle, LoggingBuilder,
    ServiceCollection, ServiceProviderFactory, WebJobsBuilder,
};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::builder::ConventionHostBuilder;
use crate::composer::{Composer, Target};
use crate::context::{HostEnvironment, HostType};
use crate::error::{Error, Result};
use crate::id::ContractKind;
use crate::properties::PropertyBag;

/// A realized host.
#[derive(Debug)]
pub struct Host<P> {
    provider: P,
    configuration: Configuration,
    logging: LoggingBuilder,
    command_line: CommandLineBuilder,
    webjobs: WebJobsBuilder,
    properties: PropertyBag,
    environment: HostEnvironment,
    host_type: HostType,
    applied: BTreeMap<ContractKind, usize>,
}

impl<P> Host<P> {
    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub fn logging(&self) -> &LoggingBuilder {
        &self.logging
    }

    pub fn command_line(&self) -> &CommandLineBuilder {
        &self.command_line
    }

    pub fn webjobs(&self) -> &WebJobsBuilder {
        &self.webjobs
    }

    /// Properties of the run.
    ///
    /// Host-created conventions see the bag as it was when the host was
    /// built; the returned host carries it as the last convention left it.
    pub fn properties(&self) -> &PropertyBag {
        &self.properties
    }

    pub fn environment(&self) -> &HostEnvironment {
        &self.environment
    }

    pub fn host_type(&self) -> HostType {
        self.host_type
    }

    /// Number of conventions applied for `contract`.
    pub fn applied(&self, contract: ContractKind) -> usize {
        self.applied.get(&contract).copied().unwrap_or(0)
    }

    pub fn into_provider(self) -> P {
        self.provider
    }
}

impl ConventionHostBuilder {
    /// Run every contract in order and return the realized host.
    ///
    /// # Errors
    ///
    /// Fails on the first convention error, on cancellation, if the
    /// configuration cannot be built, or if the provider factory fails.
    pub async fn build_host<F>(
        &self,
        factory: F,
        cancellation: &CancellationToken,
    ) -> Result<Host<F::Provider>>
    where
        F: ServiceProviderFactory,
        F::Provider: Send + Sync + 'static,
    {
        let plan = self.plan()?;
        let composer = Composer::new(plan.entries());
        let mut context = self.create_context();
        let span = context.logger().span().clone();

        async move {
            let mut applied = BTreeMap::new();

            let count = composer
                .compose(&mut context, &mut Target::Setup, cancellation)
                .await?;
            applied.insert(ContractKind::Setup, count);

            let mut configuration_builder = ConfigurationBuilder::new();
            let count = composer
                .compose(
                    &mut context,
                    &mut Target::Configuration(&mut configuration_builder),
                    cancellation,
                )
                .await?;
            applied.insert(ContractKind::Configuration, count);
            let configuration = configuration_builder.build()?;
            tracing::debug!(keys = configuration.len(), "Configuration built");

            let mut logging = LoggingBuilder::new();
            let count = composer
                .compose(&mut context, &mut Target::Logging(&mut logging), cancellation)
                .await?;
            applied.insert(ContractKind::Logging, count);

            let mut services = ServiceCollection::new();
            let count = composer
                .compose(
                    &mut context,
                    &mut Target::Services {
                        services: &mut services,
                        configuration: &configuration,
                    },
                    cancellation,
                )
                .await?;
            applied.insert(ContractKind::Services, count);
            let registered = services.len();
            let provider = factory
                .create(services, &configuration)
                .map_err(|source| Error::Terminal {
                    contract: ContractKind::Services,
                    source,
                })?;
            tracing::debug!(registered, "Service provider created");

            let mut command_line = CommandLineBuilder::default();
            let count = composer
                .compose(
                    &mut context,
                    &mut Target::CommandLine(&mut command_line),
                    cancellation,
                )
                .await?;
            applied.insert(ContractKind::CommandLine, count);

            let mut webjobs = WebJobsBuilder::new();
            let count = composer
                .compose(&mut context, &mut Target::WebJobs(&mut webjobs), cancellation)
                .await?;
            applied.insert(ContractKind::WebJobs, count);

            let mut host = Host {
                provider,
                configuration,
                logging,
                command_line,
                webjobs,
                properties: context.properties().clone(),
                environment: context.environment().clone(),
                host_type: context.host_type(),
                applied,
            };

            let count = composer
                .compose(
                    &mut context,
                    &mut Target::HostCreated(HostHandle::new(&host)),
                    cancellation,
                )
                .await?;
            host.applied.insert(ContractKind::HostCreated, count);
            host.properties = context.into_properties();

            tracing::debug!(applied = ?host.applied, "Host built");
            Ok::<_, Error>(host)
        }
        .instrument(span)
        .await
    }
}
