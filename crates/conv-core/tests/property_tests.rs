use conv_core::{ConventionId, ConventionMetadata, Delegate, HostType, Resolver};
use proptest::prelude::*;

const NAMES: [&str; 8] = ["n0", "n1", "n2", "n3", "n4", "n5", "n6", "n7"];

fn entry(index: usize, metadata: ConventionMetadata) -> conv_core::ConventionEntry {
    Delegate::setup(|_| Ok(()))
        .named(NAMES[index])
        .into_entry(metadata)
}

proptest! {
    #[test]
    fn test_unconstrained_order_is_priority_then_declaration(
        priorities in prop::collection::vec(-3i32..3, 1..8)
    ) {
        let entries = priorities
            .iter()
            .enumerate()
            .map(|(index, &priority)| entry(index, ConventionMetadata::new().priority(priority)))
            .collect();

        let resolution = Resolver::resolve(entries, HostType::Live).unwrap();

        let mut expected: Vec<(i32, usize)> = priorities
            .iter()
            .enumerate()
            .map(|(index, &priority)| (priority, index))
            .collect();
        expected.sort();
        let expected: Vec<ConventionId> = expected
            .into_iter()
            .map(|(_, index)| ConventionId::named(NAMES[index]))
            .collect();

        prop_assert_eq!(resolution.ids(), expected);
        prop_assert!(resolution.diagnostics().is_empty());
    }

    #[test]
    fn test_arbitrary_edges_emit_each_entry_once(
        count in 1usize..8,
        edges in prop::collection::vec((0usize..8, 0usize..8, any::<bool>()), 0..16)
    ) {
        let mut metadata: Vec<ConventionMetadata> = vec![ConventionMetadata::new(); count];
        for (from, to, before) in edges {
            if from >= count || to >= count {
                continue;
            }
            let target = ConventionId::named(NAMES[to]);
            let current = std::mem::take(&mut metadata[from]);
            metadata[from] = if before {
                current.before(target)
            } else {
                current.after(target)
            };
        }
        let entries = metadata
            .into_iter()
            .enumerate()
            .map(|(index, metadata)| entry(index, metadata))
            .collect();

        let resolution = Resolver::resolve(entries, HostType::Live).unwrap();

        let mut names: Vec<&str> = resolution.ids().iter().map(|id| id.name()).collect();
        names.sort_unstable();
        let mut expected: Vec<&str> = NAMES[..count].to_vec();
        expected.sort_unstable();
        prop_assert_eq!(names, expected);
    }

    #[test]
    fn test_respected_edges_when_acyclic(count in 2usize..8) {
        // A chain declared in reverse must still come out forward.
        let entries = (0..count)
            .rev()
            .map(|index| {
                let metadata = if index == 0 {
                    ConventionMetadata::new()
                } else {
                    ConventionMetadata::new().after(ConventionId::named(NAMES[index - 1]))
                };
                entry(index, metadata)
            })
            .collect();

        let resolution = Resolver::resolve(entries, HostType::Live).unwrap();
        let names: Vec<&str> = resolution.ids().iter().map(|id| id.name()).collect();

        prop_assert_eq!(names, NAMES[..count].to_vec());
        prop_assert!(!resolution.has_cycle());
    }
}
