//! Contract-specific terminal steps
//!
//! A [`Terminal`] owns the builder argument of one contract. The builder
//! façade composes the plan against the terminal's target and then hands the
//! finished context to [`Terminal::finish`], which produces the result of the
//! build.

use conv_contracts::{
    BoxError, CommandLineBuilder, Configuration, ConfigurationBuilder, HostHandle, LoggingBuilder,
    ServiceCollection, ServiceProviderFactory, WebJobsBuilder,
};

use crate::composer::Target;
use crate::context::ConventionContext;

pub trait Terminal {
    type Output;

    /// The builder argument conventions are applied against.
    fn target(&mut self) -> Target<'_>;

    /// Produce the build result once every convention has run.
    fn finish(self, context: ConventionContext) -> Result<Self::Output, BoxError>;
}

/// Runs setup conventions and returns the resulting context.
#[derive(Debug, Default, Clone, Copy)]
pub struct SetupTerminal;

impl Terminal for SetupTerminal {
    type Output = ConventionContext;

    fn target(&mut self) -> Target<'_> {
        Target::Setup
    }

    fn finish(self, context: ConventionContext) -> Result<Self::Output, BoxError> {
        Ok(context)
    }
}

/// Collects configuration sources and builds the merged configuration.
#[derive(Debug, Default)]
pub struct ConfigurationTerminal {
    builder: ConfigurationBuilder,
}

impl ConfigurationTerminal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a builder that already has sources.
    pub fn with_builder(builder: ConfigurationBuilder) -> Self {
        Self { builder }
    }
}

impl Terminal for ConfigurationTerminal {
    type Output = Configuration;

    fn target(&mut self) -> Target<'_> {
        Target::Configuration(&mut self.builder)
    }

    fn finish(self, _context: ConventionContext) -> Result<Self::Output, BoxError> {
        Ok(self.builder.build()?)
    }
}

/// Registers services and hands the collection to a provider factory.
pub struct ServicesTerminal<F> {
    factory: F,
    services: ServiceCollection,
    configuration: Configuration,
}

impl<F: ServiceProviderFactory> ServicesTerminal<F> {
    pub fn new(factory: F, configuration: Configuration) -> Self {
        Self {
            factory,
            services: ServiceCollection::new(),
            configuration,
        }
    }

    /// Start from services registered outside the convention pipeline.
    pub fn with_services(mut self, services: ServiceCollection) -> Self {
        self.services = services;
        self
    }
}

impl<F: ServiceProviderFactory> Terminal for ServicesTerminal<F> {
    type Output = F::Provider;

    fn target(&mut self) -> Target<'_> {
        Target::Services {
            services: &mut self.services,
            configuration: &self.configuration,
        }
    }

    fn finish(self, _context: ConventionContext) -> Result<Self::Output, BoxError> {
        self.factory.create(self.services, &self.configuration)
    }
}

#[derive(Debug, Default)]
pub struct LoggingTerminal {
    builder: LoggingBuilder,
}

impl LoggingTerminal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builder(builder: LoggingBuilder) -> Self {
        Self { builder }
    }
}

impl Terminal for LoggingTerminal {
    type Output = LoggingBuilder;

    fn target(&mut self) -> Target<'_> {
        Target::Logging(&mut self.builder)
    }

    fn finish(self, _context: ConventionContext) -> Result<Self::Output, BoxError> {
        Ok(self.builder)
    }
}

#[derive(Debug, Default)]
pub struct CommandLineTerminal {
    builder: CommandLineBuilder,
}

impl CommandLineTerminal {
    pub fn new(builder: CommandLineBuilder) -> Self {
        Self { builder }
    }
}

impl Terminal for CommandLineTerminal {
    type Output = CommandLineBuilder;

    fn target(&mut self) -> Target<'_> {
        Target::CommandLine(&mut self.builder)
    }

    fn finish(self, _context: ConventionContext) -> Result<Self::Output, BoxError> {
        Ok(self.builder)
    }
}

#[derive(Debug, Default)]
pub struct WebJobsTerminal {
    builder: WebJobsBuilder,
}

impl WebJobsTerminal {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Terminal for WebJobsTerminal {
    type Output = WebJobsBuilder;

    fn target(&mut self) -> Target<'_> {
        Target::WebJobs(&mut self.builder)
    }

    fn finish(self, _context: ConventionContext) -> Result<Self::Output, BoxError> {
        Ok(self.builder)
    }
}

/// Runs host-created conventions against an already realized host.
#[derive(Debug, Clone, Copy)]
pub struct HostCreatedTerminal<'h> {
    host: HostHandle<'h>,
}

impl<'h> HostCreatedTerminal<'h> {
    pub fn new(host: HostHandle<'h>) -> Self {
        Self { host }
    }
}

impl Terminal for HostCreatedTerminal<'_> {
    type Output = ();

    fn target(&mut self) -> Target<'_> {
        Target::HostCreated(self.host)
    }

    fn finish(self, _context: ConventionContext) -> Result<Self::Output, BoxError> {
        Ok(())
    }
}
