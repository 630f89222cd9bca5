//! Sequential execution of ordered conventions
//!
//! The composer walks a resolved plan and invokes every entry registered for
//! the active contract, one at a time. Async entries are awaited before the
//! next entry starts; sync entries run inline. The first failure aborts the
//! run and nothing already applied is rolled back.

use conv_contracts::{
    CommandLineBuilder, Configuration, ConfigurationBuilder, HostHandle, LoggingBuilder,
    ServiceCollection, WebJobsBuilder,
};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::context::ConventionContext;
use crate::entry::{ConventionEntry, ConventionResult, Handler, Registration};
use crate::error::{Error, Result};
use crate::id::ContractKind;

/// The builder argument of the active contract.
#[derive(Debug)]
pub enum Target<'a> {
    Setup,
    Configuration(&'a mut ConfigurationBuilder),
    Services {
        services: &'a mut ServiceCollection,
        configuration: &'a Configuration,
    },
    CommandLine(&'a mut CommandLineBuilder),
    Logging(&'a mut LoggingBuilder),
    WebJobs(&'a mut WebJobsBuilder),
    HostCreated(HostHandle<'a>),
}

impl Target<'_> {
    pub fn contract(&self) -> ContractKind {
        match self {
            Target::Setup => ContractKind::Setup,
            Target::Configuration(_) => ContractKind::Configuration,
            Target::Services { .. } => ContractKind::Services,
            Target::CommandLine(_) => ContractKind::CommandLine,
            Target::Logging(_) => ContractKind::Logging,
            Target::WebJobs(_) => ContractKind::WebJobs,
            Target::HostCreated(_) => ContractKind::HostCreated,
        }
    }
}

/// Applies an ordered plan to one contract at a time.
#[derive(Debug, Clone, Copy)]
pub struct Composer<'p> {
    entries: &'p [ConventionEntry],
}

impl<'p> Composer<'p> {
    pub fn new(entries: &'p [ConventionEntry]) -> Self {
        Self { entries }
    }

    /// Number of entries registered for `contract`.
    pub fn count_for(&self, contract: ContractKind) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.contract() == contract)
            .count()
    }

    /// Run every entry registered for the target's contract, in plan order.
    ///
    /// Returns the number of conventions applied.
    ///
    /// # Errors
    ///
    /// - [`Error::Cancelled`] if `cancellation` has fired before the run
    ///   starts or fires before it finishes, including when a convention
    ///   fails after cancellation. This holds even when no entry matches
    ///   the contract.
    /// - [`Error::ConventionFailed`] for the first convention that fails.
    pub async fn compose(
        &self,
        context: &mut ConventionContext,
        target: &mut Target<'_>,
        cancellation: &CancellationToken,
    ) -> Result<usize> {
        let contract = target.contract();
        let mut completed = 0;

        if cancellation.is_cancelled() {
            tracing::debug!(%contract, "Composition cancelled before start");
            return Err(Error::Cancelled { completed });
        }

        for entry in self.entries.iter().filter(|e| e.contract() == contract) {
            if cancellation.is_cancelled() {
                tracing::debug!(%contract, completed, "Composition cancelled before dispatch");
                return Err(Error::Cancelled { completed });
            }

            let span = tracing::debug_span!(
                "convention",
                id = %entry.id(),
                %contract,
                is_async = entry.is_async()
            );
            let outcome = invoke(entry.registration(), context, target, cancellation.clone())
                .instrument(span)
                .await;

            if let Err(source) = outcome {
                if cancellation.is_cancelled() {
                    tracing::debug!(id = %entry.id(), error = %source, "Convention failed after cancellation");
                    return Err(Error::Cancelled { completed });
                }
                tracing::error!(id = %entry.id(), %contract, error = %source, "Convention failed");
                return Err(Error::ConventionFailed {
                    id: entry.id(),
                    contract,
                    source,
                });
            }

            completed += 1;
            if cancellation.is_cancelled() {
                tracing::debug!(%contract, completed, "Composition cancelled");
                return Err(Error::Cancelled { completed });
            }
        }

        tracing::debug!(%contract, applied = completed, "Composition complete");
        Ok(completed)
    }
}

/// Invoke one registration. Registrations for another contract are a no-op.
async fn invoke(
    registration: &Registration,
    context: &mut ConventionContext,
    target: &mut Target<'_>,
    cancellation: CancellationToken,
) -> ConventionResult {
    match (registration, target) {
        (Registration::Setup(handler), Target::Setup) => match handler {
            Handler::Sync(f) => f(context),
            Handler::Async(f) => f(context, cancellation).await,
        },
        (Registration::Configuration(handler), Target::Configuration(builder)) => match handler {
            Handler::Sync(f) => f(context, &mut **builder),
            Handler::Async(f) => f(context, &mut **builder, cancellation).await,
        },
        (
            Registration::Services(handler),
            Target::Services {
                services,
                configuration,
            },
        ) => match handler {
            Handler::Sync(f) => f(context, &mut **services, *configuration),
            Handler::Async(f) => f(context, &mut **services, *configuration, cancellation).await,
        },
        (Registration::CommandLine(handler), Target::CommandLine(builder)) => match handler {
            Handler::Sync(f) => f(context, &mut **builder),
            Handler::Async(f) => f(context, &mut **builder, cancellation).await,
        },
        (Registration::Logging(handler), Target::Logging(builder)) => match handler {
            Handler::Sync(f) => f(context, &mut **builder),
            Handler::Async(f) => f(context, &mut **builder, cancellation).await,
        },
        (Registration::WebJobs(handler), Target::WebJobs(builder)) => match handler {
            Handler::Sync(f) => f(context, &mut **builder),
            Handler::Async(f) => f(context, &mut **builder, cancellation).await,
        },
        (Registration::HostCreated(handler), Target::HostCreated(host)) => match handler {
            Handler::Sync(f) => f(context, *host),
            Handler::Async(f) => f(context, *host, cancellation).await,
        },
        _ => Ok(()),
    }
}
