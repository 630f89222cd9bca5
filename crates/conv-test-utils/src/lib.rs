//! Shared test utilities for the conventions workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`provider`]: a minimal last-wins service container
//! - [`journal`]: conventions that record when they run
//! - [`settings`]: temporary content roots with settings files

pub mod journal;
pub mod provider;
pub mod settings;

pub use journal::{Journal, RecordingConvention};
pub use provider::{SimpleProviderFactory, SimpleServiceProvider};
pub use settings::SettingsFixture;
