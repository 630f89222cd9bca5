//! Builder contracts for convention-based composition.
//!
//! Every convention is applied against one of these builders:
//!
//! - [`ConfigurationBuilder`] for configuration sources
//! - [`ServiceCollection`] (plus the built [`Configuration`]) for services
//! - [`CommandLineBuilder`] for the command tree
//! - [`LoggingBuilder`] for log filtering
//! - [`WebJobsBuilder`] for background-job extensions
//! - [`HostHandle`] for conventions that run once the host exists
//!
//! This crate has no knowledge of conventions themselves; it only defines the
//! surfaces they mutate.

pub mod command_line;
pub mod configuration;
pub mod error;
pub mod host;
pub mod logging;
pub mod services;
pub mod webjobs;

pub use command_line::CommandLineBuilder;
pub use configuration::{
    Configuration, ConfigurationBuilder, ConfigurationSource, EnvironmentSource, MemorySource,
};
pub use error::{BoxError, Error, Result};
pub use host::HostHandle;
pub use logging::LoggingBuilder;
pub use services::{
    Implementation, ServiceCollection, ServiceDescriptor, ServiceInstance, ServiceLifetime,
    ServiceProviderFactory,
};
pub use webjobs::{WebJobsBuilder, WebJobsExtension};
