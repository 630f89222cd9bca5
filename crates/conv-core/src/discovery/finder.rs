//! Candidate module discovery over the module reference graph

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use super::registry::{ModuleHandle, ModuleSource};

/// Which way to walk the reference graph from the seeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Modules that reference a seed, directly or transitively.
    #[default]
    Dependents,
    /// Modules a seed references, directly or transitively.
    Dependencies,
    Both,
}

/// Finds the modules that may carry conventions for a set of seed modules.
pub struct CandidateFinder<'s> {
    source: &'s dyn ModuleSource,
    direction: Direction,
}

impl<'s> CandidateFinder<'s> {
    pub fn new(source: &'s dyn ModuleSource) -> Self {
        Self {
            source,
            direction: Direction::default(),
        }
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Return the seeds plus every module reachable from them.
    ///
    /// Unknown seeds and references to unknown modules are ignored. The
    /// result lists dependencies before their dependents, with ties broken by
    /// module name; modules caught in a reference cycle follow in name order.
    pub fn find_candidates<S: AsRef<str>>(&self, seeds: &[S]) -> Vec<ModuleHandle> {
        let mut modules: BTreeMap<String, ModuleHandle> = BTreeMap::new();
        for module in self.source.modules() {
            if modules.contains_key(module.name()) {
                tracing::debug!(module = module.name(), "Ignoring duplicate module registration");
                continue;
            }
            modules.insert(module.name().to_string(), module);
        }

        // name -> modules it references, and the reverse
        let mut references: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        let mut dependents: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for (name, module) in &modules {
            for reference in module.references() {
                if reference == name {
                    continue;
                }
                if let Some((target, _)) = modules.get_key_value(reference.as_str()) {
                    references
                        .entry(name.as_str())
                        .or_default()
                        .insert(target.as_str());
                    dependents
                        .entry(target.as_str())
                        .or_default()
                        .insert(name.as_str());
                }
            }
        }

        let mut visited: BTreeSet<&str> = BTreeSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        for seed in seeds {
            match modules.get_key_value(seed.as_ref()) {
                Some((name, _)) => {
                    if visited.insert(name.as_str()) {
                        queue.push_back(name.as_str());
                    }
                }
                None => tracing::debug!(seed = seed.as_ref(), "Unknown seed module"),
            }
        }

        let follow_dependents = matches!(self.direction, Direction::Dependents | Direction::Both);
        let follow_references = matches!(self.direction, Direction::Dependencies | Direction::Both);
        while let Some(current) = queue.pop_front() {
            let mut next: Vec<&str> = Vec::new();
            if follow_dependents {
                next.extend(dependents.get(current).into_iter().flatten().copied());
            }
            if follow_references {
                next.extend(references.get(current).into_iter().flatten().copied());
            }
            for name in next {
                if visited.insert(name) {
                    queue.push_back(name);
                }
            }
        }

        let order = dependency_order(&visited, &references);
        tracing::debug!(candidates = order.len(), "Found candidate modules");
        order
            .into_iter()
            .filter_map(|name| modules.get(name).cloned())
            .collect()
    }
}

/// Kahn's algorithm over the selected modules, smallest name first.
fn dependency_order<'a>(
    selected: &BTreeSet<&'a str>,
    references: &BTreeMap<&'a str, BTreeSet<&'a str>>,
) -> Vec<&'a str> {
    let mut pending: BTreeMap<&str, usize> = BTreeMap::new();
    let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for &name in selected {
        let inside: Vec<&str> = references
            .get(name)
            .into_iter()
            .flatten()
            .copied()
            .filter(|target| selected.contains(target))
            .collect();
        pending.insert(name, inside.len());
        for target in inside {
            dependents.entry(target).or_default().push(name);
        }
    }

    let mut ready: BTreeSet<&str> = pending
        .iter()
        .filter(|&(_, &count)| count == 0)
        .map(|(&name, _)| name)
        .collect();
    let mut order = Vec::with_capacity(selected.len());
    while let Some(name) = ready.pop_first() {
        order.push(name);
        for &dependent in dependents.get(name).into_iter().flatten() {
            if let Some(count) = pending.get_mut(dependent) {
                *count -= 1;
                if *count == 0 {
                    ready.insert(dependent);
                }
            }
        }
    }

    if order.len() < selected.len() {
        let emitted: BTreeSet<&str> = order.iter().copied().collect();
        let cyclic: Vec<&str> = selected
            .iter()
            .copied()
            .filter(|name| !emitted.contains(name))
            .collect();
        tracing::debug!(modules = ?cyclic, "Module reference cycle");
        order.extend(cyclic);
    }
    order
}
