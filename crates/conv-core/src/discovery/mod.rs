//! Convention discovery
//!
//! Discovery runs in two steps. The [`CandidateFinder`] walks the module
//! reference graph from a set of seed modules and returns the modules that
//! may carry conventions. The [`Scanner`] then loads each candidate's exports
//! and collects the entries, skipping modules whose exports fail to load.
//!
//! Modules come from a [`ModuleSource`]. [`InventorySource`] lists every
//! module linked into the binary that called [`export_conventions!`];
//! [`StaticModuleSource`] takes an explicit list.
//!
//! [`export_conventions!`]: crate::export_conventions

mod finder;
mod registry;
mod scanner;

pub use finder::{CandidateFinder, Direction};
pub use registry::{
    ExportFn, InventorySource, ModuleHandle, ModuleRegistration, ModuleSource, StaticModuleSource,
};
pub use scanner::{ScanReport, Scanner};
