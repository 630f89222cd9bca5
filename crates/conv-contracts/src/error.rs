//! Error types for conv-contracts

/// Result type for contract operations
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error returned by conventions and external collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while building the values produced by a contract
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A configuration source failed to load
    #[error("Configuration source '{source_name}' failed to load: {message}")]
    SourceLoad {
        source_name: String,
        message: String,
    },

    /// A configuration section could not be bound to the requested type
    #[error("Failed to bind configuration section '{section}': {source}")]
    Bind {
        section: String,
        #[source]
        source: serde_json::Error,
    },

    /// A logging filter directive was rejected
    #[error("Invalid logging directive: {0}")]
    InvalidDirective(String),

    /// A global tracing subscriber was already installed
    #[error("Logging already initialized: {0}")]
    LoggingInit(String),
}
