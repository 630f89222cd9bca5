//! Convention discovery, ordering and composition engine.
//!
//! A convention is a unit of startup logic that mutates a shared context and
//! one contract-specific builder exactly once per build. This crate:
//!
//! - discovers conventions from modules linked into the binary
//!   ([`discovery`], [`export_conventions!`])
//! - deduplicates them ([`Catalog`]) and orders them by their before/after
//!   constraints and priority ([`Resolver`])
//! - runs them strictly in sequence against a per-run [`ConventionContext`]
//!   ([`Composer`])
//! - exposes all of it through [`ConventionHostBuilder`]
//!
//! # Layer
//!
//! Depends on `conv-contracts` for the builder types conventions mutate.

pub mod builder;
pub mod capability;
pub mod catalog;
pub mod composer;
pub mod context;
pub mod diagnostics;
pub mod discovery;
pub mod entry;
pub mod error;
pub mod host;
pub mod id;
pub mod properties;
pub mod resolver;
pub mod settings;
pub mod terminal;

#[doc(hidden)]
pub use inventory;

pub use builder::{ConventionHostBuilder, Plan};
pub use capability::{
    AsyncHostCreatedConvention, AsyncSetupConvention, CommandLineConvention,
    ConfigurationConvention, HostCreatedConvention, LoggingConvention, ServiceConvention,
    SetupConvention, WebJobsConvention,
};
pub use catalog::Catalog;
pub use composer::{Composer, Target};
pub use context::{ConventionContext, ConventionLogger, ENVIRONMENT_NAME, HostEnvironment, HostType};
pub use diagnostics::Diagnostic;
pub use discovery::{
    CandidateFinder, Direction, InventorySource, ModuleHandle, ModuleRegistration, ModuleSource,
    ScanReport, Scanner, StaticModuleSource,
};
pub use entry::{
    BoxFuture, ConventionEntry, ConventionMetadata, ConventionResult, Delegate, Handler, Origin,
    Registration,
};
pub use error::{Error, Result};
pub use host::Host;
pub use id::{ContractKind, ConventionId};
pub use properties::{PropertyBag, PropertyKey};
pub use resolver::{Resolution, Resolver};
pub use settings::{ConventionSettings, HostSection, HostSettings, SettingsResolver};
pub use terminal::{
    CommandLineTerminal, ConfigurationTerminal, HostCreatedTerminal, LoggingTerminal,
    ServicesTerminal, SetupTerminal, Terminal, WebJobsTerminal,
};

pub use tokio_util::sync::CancellationToken;
