//! Capability traits for instance conventions
//!
//! An instance convention is a value implementing one of these traits. Wrap it
//! with the matching [`ConventionEntry`](crate::ConventionEntry) constructor
//! to register it; its identity is its concrete type.

use async_trait::async_trait;
use conv_contracts::{
    CommandLineBuilder, Configuration, ConfigurationBuilder, HostHandle, LoggingBuilder,
    ServiceCollection, WebJobsBuilder,
};
use tokio_util::sync::CancellationToken;

use crate::context::ConventionContext;
use crate::entry::ConventionResult;

/// Runs before every other contract, against the context alone.
pub trait SetupConvention: Send + Sync + 'static {
    fn register(&self, context: &mut ConventionContext) -> ConventionResult;
}

#[async_trait]
pub trait AsyncSetupConvention: Send + Sync + 'static {
    async fn register(
        &self,
        context: &mut ConventionContext,
        cancellation: CancellationToken,
    ) -> ConventionResult;
}

/// Adds configuration sources.
pub trait ConfigurationConvention: Send + Sync + 'static {
    fn register(
        &self,
        context: &mut ConventionContext,
        builder: &mut ConfigurationBuilder,
    ) -> ConventionResult;
}

/// Registers services. The configuration is already built when this runs.
pub trait ServiceConvention: Send + Sync + 'static {
    fn register(
        &self,
        context: &mut ConventionContext,
        services: &mut ServiceCollection,
        configuration: &Configuration,
    ) -> ConventionResult;
}

pub trait CommandLineConvention: Send + Sync + 'static {
    fn register(
        &self,
        context: &mut ConventionContext,
        command_line: &mut CommandLineBuilder,
    ) -> ConventionResult;
}

pub trait LoggingConvention: Send + Sync + 'static {
    fn register(
        &self,
        context: &mut ConventionContext,
        logging: &mut LoggingBuilder,
    ) -> ConventionResult;
}

pub trait WebJobsConvention: Send + Sync + 'static {
    fn register(
        &self,
        context: &mut ConventionContext,
        webjobs: &mut WebJobsBuilder,
    ) -> ConventionResult;
}

/// Runs once the host has been realized.
pub trait HostCreatedConvention: Send + Sync + 'static {
    fn register(&self, context: &mut ConventionContext, host: HostHandle<'_>) -> ConventionResult;
}

#[async_trait]
pub trait AsyncHostCreatedConvention: Send + Sync + 'static {
    async fn register(
        &self,
        context: &mut ConventionContext,
        host: HostHandle<'_>,
        cancellation: CancellationToken,
    ) -> ConventionResult;
}
