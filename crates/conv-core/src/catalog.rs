//! Append-only catalog of convention entries

use std::collections::HashSet;

use crate::diagnostics::Diagnostic;
use crate::entry::ConventionEntry;
use crate::id::{ContractKind, ConventionId};

/// Entries in declaration order, deduplicated by identity.
///
/// An entry is identified by its [`ConventionId`] together with its
/// [`ContractKind`]. The first occurrence wins; later duplicates are dropped
/// and recorded as [`Diagnostic::DuplicateIgnored`].
#[derive(Debug, Default, Clone)]
pub struct Catalog {
    entries: Vec<ConventionEntry>,
    seen: HashSet<(ConventionId, ContractKind)>,
    diagnostics: Vec<Diagnostic>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry. Returns `false` if its identity was already present.
    pub fn add(&mut self, entry: ConventionEntry) -> bool {
        let key = (entry.id(), entry.contract());
        if !self.seen.insert(key) {
            tracing::debug!(id = %key.0, contract = %key.1, "Ignoring duplicate convention");
            self.diagnostics.push(Diagnostic::DuplicateIgnored {
                id: key.0,
                contract: key.1,
            });
            return false;
        }
        self.entries.push(entry);
        true
    }

    pub fn add_range(&mut self, entries: impl IntoIterator<Item = ConventionEntry>) -> usize {
        let mut added = 0;
        for entry in entries {
            if self.add(entry) {
                added += 1;
            }
        }
        added
    }

    pub fn contains(&self, id: ConventionId, contract: ContractKind) -> bool {
        self.seen.contains(&(id, contract))
    }

    /// Entries in declaration order.
    pub fn entries(&self) -> &[ConventionEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_parts(self) -> (Vec<ConventionEntry>, Vec<Diagnostic>) {
        (self.entries, self.diagnostics)
    }
}
