//! Conventions that record their invocations.
//!
//! A [`Journal`] is shared between the test and the conventions it builds, so
//! run order can be asserted after the build returns.

use std::sync::{Arc, Mutex, MutexGuard};

use conv_core::{ConventionContext, ConventionEntry, ConventionResult, Delegate, SetupConvention};

/// Ordered log of convention invocations.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    records: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        // A panicking convention must not hide what ran before it.
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn record(&self, name: impl Into<String>) {
        self.lock().push(name.into());
    }

    pub fn records(&self) -> Vec<String> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// A named setup delegate that records `name` when it runs.
    pub fn setup(&self, name: &'static str) -> Delegate {
        let journal = self.clone();
        Delegate::setup(move |_| {
            journal.record(name);
            Ok(())
        })
        .named(name)
    }

    /// A named setup delegate that records `name` and then fails.
    pub fn failing_setup(&self, name: &'static str) -> Delegate {
        let journal = self.clone();
        Delegate::setup(move |_| {
            journal.record(name);
            Err(format!("{name} failed").into())
        })
        .named(name)
    }
}

/// Instance convention that records its label.
#[derive(Debug, Clone)]
pub struct RecordingConvention {
    journal: Journal,
    label: &'static str,
}

impl RecordingConvention {
    pub fn new(journal: &Journal, label: &'static str) -> Self {
        Self {
            journal: journal.clone(),
            label,
        }
    }

    /// Entry identified by `label` instead of the type, so several
    /// recorders can live in one catalog.
    pub fn into_entry(self) -> ConventionEntry {
        let label = self.label;
        ConventionEntry::setup(self).named(label)
    }
}

impl SetupConvention for RecordingConvention {
    fn register(&self, _context: &mut ConventionContext) -> ConventionResult {
        self.journal.record(self.label);
        Ok(())
    }
}
