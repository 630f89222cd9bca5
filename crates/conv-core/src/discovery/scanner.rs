//! Loading exported conventions from candidate modules

use std::panic::{self, AssertUnwindSafe};

use super::registry::ModuleHandle;
use crate::diagnostics::Diagnostic;
use crate::entry::ConventionEntry;

/// Entries loaded from a set of modules, in module order.
#[derive(Debug, Default, Clone)]
pub struct ScanReport {
    pub entries: Vec<ConventionEntry>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ScanReport {
    pub fn failed_modules(&self) -> Vec<&str> {
        self.diagnostics
            .iter()
            .filter_map(|d| match d {
                Diagnostic::DiscoveryFailure { module, .. } => Some(module.as_str()),
                _ => None,
            })
            .collect()
    }
}

pub struct Scanner;

impl Scanner {
    /// Load every candidate's exports.
    ///
    /// A module whose exports fail to load, by error or by panic, is recorded
    /// as [`Diagnostic::DiscoveryFailure`] and contributes nothing.
    pub fn scan(candidates: &[ModuleHandle]) -> ScanReport {
        let mut report = ScanReport::default();
        for module in candidates {
            let loaded = panic::catch_unwind(AssertUnwindSafe(|| module.load()));
            let reason = match loaded {
                Ok(Ok(entries)) => {
                    tracing::debug!(module = module.name(), count = entries.len(), "Loaded conventions");
                    report.entries.extend(entries);
                    continue;
                }
                Ok(Err(err)) => err.to_string(),
                Err(payload) => panic_message(payload.as_ref()),
            };
            let diagnostic = Diagnostic::DiscoveryFailure {
                module: module.name().to_string(),
                reason,
            };
            diagnostic.log();
            report.diagnostics.push(diagnostic);
        }
        report
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked".to_string()
    }
}
