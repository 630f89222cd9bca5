//! Error types for conv-core

use std::path::PathBuf;

use conv_contracts::BoxError;

use crate::id::{ContractKind, ConventionId};

/// Result type for conv-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a composition run
///
/// Problems that only degrade the run (a module that fails to load, a
/// duplicate convention, an ordering cycle) are reported as
/// [`Diagnostic`](crate::Diagnostic)s instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A convention raised during `register`
    #[error("Convention {id} failed while registering {contract}: {source}")]
    ConventionFailed {
        id: ConventionId,
        contract: ContractKind,
        #[source]
        source: BoxError,
    },

    /// The cancellation token fired before the run finished
    #[error("Composition cancelled after {completed} convention(s)")]
    Cancelled { completed: usize },

    /// A required dependency is not part of the resolved catalog
    #[error("Convention {id} depends on {dependency}, which is not registered for this host")]
    MissingDependency {
        id: ConventionId,
        dependency: ConventionId,
    },

    /// The contract-specific terminal step failed
    #[error("Terminal step for {contract} failed: {source}")]
    Terminal {
        contract: ContractKind,
        #[source]
        source: BoxError,
    },

    /// Invalid host type name
    #[error("Invalid host type: {value}")]
    InvalidHostType { value: String },

    /// Settings file could not be parsed
    #[error("Invalid settings in {path}: {source}")]
    Settings {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Error from a builder contract
    #[error(transparent)]
    Contract(#[from] conv_contracts::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Identity of the failing convention, if the error came from one.
    pub fn convention(&self) -> Option<ConventionId> {
        match self {
            Error::ConventionFailed { id, .. } => Some(*id),
            Error::MissingDependency { id, .. } => Some(*id),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convention_failed_names_convention() {
        let err = Error::ConventionFailed {
            id: ConventionId::named("core-services"),
            contract: ContractKind::Services,
            source: "boom".into(),
        };

        let display = err.to_string();
        assert!(display.contains("core-services"), "got: {display}");
        assert!(display.contains("services"), "got: {display}");
        assert!(display.contains("boom"), "got: {display}");
        assert_eq!(err.convention(), Some(ConventionId::named("core-services")));
    }

    #[test]
    fn test_cancelled_is_distinct() {
        let err = Error::Cancelled { completed: 2 };
        assert!(err.is_cancelled());
        assert!(err.convention().is_none());
    }
}
