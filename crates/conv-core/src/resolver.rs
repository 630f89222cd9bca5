//! Dependency and priority ordering of convention entries
//!
//! Ordering is a stable topological sort (Kahn's algorithm) over the
//! "runs before" graph derived from each entry's `after` and `before`
//! declarations. Among entries that are ready at the same time, the one with
//! the lowest `(priority, declaration index)` runs first. Names never take
//! part in tie-breaking.
//!
//! A cycle does not fail resolution. Everything Kahn's algorithm could not
//! emit is appended after the resolved prefix in `(priority, declaration
//! index)` order and reported as [`Diagnostic::OrderingCycle`].
//!
//! # Example
//!
//! ```
//! use conv_core::{ConventionId, Delegate, ConventionMetadata, HostType, Resolver};
//!
//! let core = Delegate::setup(|_| Ok(())).named("core");
//! let test = Delegate::setup(|_| Ok(())).named("test");
//!
//! let resolution = Resolver::resolve(
//!     vec![
//!         test.into_entry(ConventionMetadata::new().after(ConventionId::named("core"))),
//!         core.into_entry(ConventionMetadata::new()),
//!     ],
//!     HostType::UnitTest,
//! )
//! .unwrap();
//!
//! assert_eq!(
//!     resolution.ids(),
//!     vec![ConventionId::named("core"), ConventionId::named("test")]
//! );
//! ```

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap};
use std::fmt;

use crate::context::HostType;
use crate::diagnostics::Diagnostic;
use crate::entry::ConventionEntry;
use crate::error::{Error, Result};
use crate::id::ConventionId;

/// An ordered run plan.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    entries: Vec<ConventionEntry>,
    diagnostics: Vec<Diagnostic>,
}

impl Resolution {
    pub fn entries(&self) -> &[ConventionEntry] {
        &self.entries
    }

    pub fn ids(&self) -> Vec<ConventionId> {
        self.entries.iter().map(|e| e.id()).collect()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn has_cycle(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::OrderingCycle { .. }))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_parts(self) -> (Vec<ConventionEntry>, Vec<Diagnostic>) {
        (self.entries, self.diagnostics)
    }

    /// Put diagnostics from earlier stages ahead of the ordering ones.
    pub(crate) fn with_leading_diagnostics(mut self, mut leading: Vec<Diagnostic>) -> Self {
        leading.append(&mut self.diagnostics);
        self.diagnostics = leading;
        self
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lines = Vec::with_capacity(self.entries.len() + self.diagnostics.len());
        for (position, entry) in self.entries.iter().enumerate() {
            let mut line = format!(
                "{}. {} {}",
                position + 1,
                entry.contract(),
                entry.id().short_name()
            );
            if entry.is_async() {
                line.push_str(" (async)");
            }
            let priority = entry.metadata().priority_value();
            if priority != 0 {
                line.push_str(&format!(" priority={priority}"));
            }
            lines.push(line);
        }
        for diagnostic in &self.diagnostics {
            lines.push(format!("warning: {diagnostic}"));
        }
        f.write_str(&lines.join("\n"))
    }
}

/// Computes the run order of a set of entries.
pub struct Resolver;

impl Resolver {
    /// Order `entries` for `host_type`.
    ///
    /// `entries` must already be deduplicated; their position is the
    /// declaration index used for tie-breaking.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingDependency`] if an entry `depends_on` an
    /// identity that is absent after host-type filtering.
    pub fn resolve(entries: Vec<ConventionEntry>, host_type: HostType) -> Result<Resolution> {
        let total = entries.len();
        let nodes: Vec<ConventionEntry> = entries
            .into_iter()
            .filter(|entry| {
                let applies = entry.metadata().applies_to(host_type);
                if !applies {
                    tracing::debug!(id = %entry.id(), %host_type, "Convention filtered out by host type");
                }
                applies
            })
            .collect();

        // One identity may appear once per contract.
        let mut by_id: HashMap<ConventionId, Vec<usize>> = HashMap::new();
        for (index, entry) in nodes.iter().enumerate() {
            by_id.entry(entry.id()).or_default().push(index);
        }

        for entry in &nodes {
            if let Some(missing) = entry
                .metadata()
                .required()
                .iter()
                .find(|dependency| !by_id.contains_key(dependency))
            {
                return Err(Error::MissingDependency {
                    id: entry.id(),
                    dependency: *missing,
                });
            }
        }

        let mut successors: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); nodes.len()];
        for (index, entry) in nodes.iter().enumerate() {
            for target in entry.metadata().run_after() {
                for &before in by_id.get(target).into_iter().flatten() {
                    if before != index {
                        successors[before].insert(index);
                    }
                }
            }
            for target in entry.metadata().run_before() {
                for &after in by_id.get(target).into_iter().flatten() {
                    if after != index {
                        successors[index].insert(after);
                    }
                }
            }
        }

        let mut in_degree = vec![0usize; nodes.len()];
        for targets in &successors {
            for &target in targets {
                in_degree[target] += 1;
            }
        }

        let rank = |index: usize| (nodes[index].metadata().priority_value(), index);

        let mut ready: BinaryHeap<Reverse<(i32, usize)>> = in_degree
            .iter()
            .enumerate()
            .filter(|&(_, &degree)| degree == 0)
            .map(|(index, _)| Reverse(rank(index)))
            .collect();

        let mut order = Vec::with_capacity(nodes.len());
        let mut emitted = vec![false; nodes.len()];
        while let Some(Reverse((_, index))) = ready.pop() {
            order.push(index);
            emitted[index] = true;
            for &next in &successors[index] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    ready.push(Reverse(rank(next)));
                }
            }
        }

        let mut diagnostics = Vec::new();
        let mut remainder: Vec<usize> = (0..nodes.len()).filter(|&i| !emitted[i]).collect();
        if !remainder.is_empty() {
            remainder.sort_by_key(|&index| rank(index));
            let diagnostic = Diagnostic::OrderingCycle {
                members: remainder.iter().map(|&index| nodes[index].id()).collect(),
            };
            diagnostic.log();
            diagnostics.push(diagnostic);
            order.extend(remainder);
        }

        let mut slots: Vec<Option<ConventionEntry>> = nodes.into_iter().map(Some).collect();
        let entries: Vec<ConventionEntry> = order
            .into_iter()
            .filter_map(|index| slots[index].take())
            .collect();

        tracing::debug!(
            resolved = entries.len(),
            filtered = total - entries.len(),
            %host_type,
            "Resolved convention order"
        );

        Ok(Resolution {
            entries,
            diagnostics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{ConventionMetadata, Delegate};
    use pretty_assertions::assert_eq;

    fn entry(name: &'static str, metadata: ConventionMetadata) -> ConventionEntry {
        Delegate::setup(|_| Ok(())).named(name).into_entry(metadata)
    }

    fn id(name: &'static str) -> ConventionId {
        ConventionId::named(name)
    }

    fn names(resolution: &Resolution) -> Vec<&'static str> {
        resolution.entries().iter().map(|e| e.id().name()).collect()
    }

    #[test]
    fn test_declaration_order_without_constraints() {
        let resolution = Resolver::resolve(
            vec![
                entry("c", ConventionMetadata::new()),
                entry("a", ConventionMetadata::new()),
                entry("b", ConventionMetadata::new()),
            ],
            HostType::Live,
        )
        .unwrap();

        assert_eq!(names(&resolution), vec!["c", "a", "b"]);
        assert!(resolution.diagnostics().is_empty());
    }

    #[test]
    fn test_priority_orders_ready_entries() {
        let resolution = Resolver::resolve(
            vec![
                entry("late", ConventionMetadata::new().priority(10)),
                entry("default", ConventionMetadata::new()),
                entry("early", ConventionMetadata::new().priority(-1)),
            ],
            HostType::Live,
        )
        .unwrap();

        assert_eq!(names(&resolution), vec!["early", "default", "late"]);
    }

    #[test]
    fn test_edges_override_priority() {
        let resolution = Resolver::resolve(
            vec![
                entry("first", ConventionMetadata::new().priority(5).before(id("second"))),
                entry("second", ConventionMetadata::new().priority(-5)),
            ],
            HostType::Live,
        )
        .unwrap();

        assert_eq!(names(&resolution), vec!["first", "second"]);
    }

    #[test]
    fn test_cycle_is_appended_with_diagnostic() {
        let resolution = Resolver::resolve(
            vec![
                entry("free", ConventionMetadata::new().priority(3)),
                entry("a", ConventionMetadata::new().before(id("b"))),
                entry("b", ConventionMetadata::new().before(id("a"))),
            ],
            HostType::Live,
        )
        .unwrap();

        assert_eq!(names(&resolution), vec!["free", "a", "b"]);
        assert_eq!(
            resolution.diagnostics(),
            &[Diagnostic::OrderingCycle {
                members: vec![id("a"), id("b")]
            }]
        );
        assert!(resolution.has_cycle());
    }

    #[test]
    fn test_missing_optional_target_is_ignored() {
        let resolution = Resolver::resolve(
            vec![entry("solo", ConventionMetadata::new().after(id("absent")))],
            HostType::Live,
        )
        .unwrap();
        assert_eq!(names(&resolution), vec!["solo"]);
    }

    #[test]
    fn test_missing_required_dependency_fails() {
        let err = Resolver::resolve(
            vec![
                entry("core", ConventionMetadata::new().only_for(HostType::UnitTest)),
                entry("needs-core", ConventionMetadata::new().depends_on(id("core"))),
            ],
            HostType::Live,
        )
        .unwrap_err();

        assert!(matches!(
            err,
            Error::MissingDependency { id: who, dependency }
                if who == id("needs-core") && dependency == id("core")
        ));
    }

    #[test]
    fn test_self_edge_is_ignored() {
        let resolution = Resolver::resolve(
            vec![entry("me", ConventionMetadata::new().after(id("me")))],
            HostType::Live,
        )
        .unwrap();
        assert_eq!(names(&resolution), vec!["me"]);
        assert!(!resolution.has_cycle());
    }
}
