use std::collections::HashSet;

use keiba_sync::pedigree::{generate_labels, PedigreeSource, PositionLabel};
use keiba_sync::storage::Store;
use keiba_sync::sync::{Bundle, ParsedUnit, Pipeline, RawPedigree, Synchronizer};
use keiba_sync::types::{HorseRecord, PedigreeEdge};
use proptest::prelude::*;

fn id() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[0-9A-Z]{1,10}").unwrap()
}

fn opt_text() -> impl Strategy<Value = Option<String>> {
    proptest::option::of(proptest::string::string_regex("[a-z]{1,8}").unwrap())
}

fn horse_record(horse_id: String) -> impl Strategy<Value = HorseRecord> {
    (opt_text(), opt_text(), opt_text()).prop_map(move |(name, birth_date, sex)| HorseRecord {
        horse_id: horse_id.clone(),
        name,
        birth_date,
        sex,
        ..Default::default()
    })
}

fn source() -> impl Strategy<Value = PedigreeSource> {
    prop_oneof![
        Just(PedigreeSource::Canonical),
        Just(PedigreeSource::Jbis),
        Just(PedigreeSource::Netkeiba),
    ]
}

/// Up to 62 optional ancestor references.
fn ancestors() -> impl Strategy<Value = Vec<Option<String>>> {
    proptest::collection::vec(proptest::option::of(id()), 0..=62)
}

fn edge(horse_id: &str, position: &PositionLabel, ancestor_id: String) -> PedigreeEdge {
    PedigreeEdge {
        horse_id: horse_id.to_string(),
        ancestor_id,
        generation: position.generation(),
        position: position.clone(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn labels_have_expected_shape(max_generation in 0u32..=8) {
        let labels = generate_labels(max_generation).unwrap();
        prop_assert_eq!(labels.len(), (1usize << (max_generation + 1)) - 2);

        let unique: HashSet<&str> = labels.iter().map(|l| l.as_str()).collect();
        prop_assert_eq!(unique.len(), labels.len());

        for (index, label) in labels.iter().enumerate() {
            prop_assert_eq!(label.canonical_index(), index);
            prop_assert!(label.as_str().chars().all(|c| c == 'f' || c == 'm'));
            if let Some(parent) = label.parent() {
                prop_assert!(parent.canonical_index() < index);
            }
        }
    }

    #[test]
    fn sync_is_idempotent(
        horse in id().prop_flat_map(horse_record),
        source in source(),
        raw in ancestors(),
    ) {
        let pipeline = Pipeline::new(5).unwrap();
        let mut store = Store::in_memory().unwrap();
        let unit = ParsedUnit {
            raw_pedigree: Some(RawPedigree {
                horse_id: horse.horse_id.clone(),
                source,
                ancestors: raw,
            }),
            bundle: Bundle::horse_profile(horse, None, None, vec![]),
        };

        pipeline.ingest(&mut store, unit.clone()).unwrap();
        let once = store.summary().unwrap();
        let edges = store.pedigree(&unit.bundle.horses[0].horse_id).unwrap();

        let again = pipeline.ingest(&mut store, unit.clone()).unwrap();
        prop_assert!(!again.changed());
        prop_assert_eq!(store.summary().unwrap(), once);
        prop_assert_eq!(store.pedigree(&unit.bundle.horses[0].horse_id).unwrap(), edges);
    }

    #[test]
    fn enrichment_never_replaces_values(
        first in id().prop_flat_map(horse_record),
        later_fields in (opt_text(), opt_text(), opt_text()),
    ) {
        let mut store = Store::in_memory().unwrap();
        let horse_id = first.horse_id.clone();
        Synchronizer::new(&mut store)
            .sync(&Bundle::horse_profile(first.clone(), None, None, vec![]))
            .unwrap();

        let (name, birth_date, sex) = later_fields;
        let later = HorseRecord {
            horse_id: horse_id.clone(),
            name: name.clone(),
            birth_date: birth_date.clone(),
            sex: sex.clone(),
            ..Default::default()
        };
        Synchronizer::new(&mut store)
            .sync(&Bundle::horse_profile(later, None, None, vec![]))
            .unwrap();

        let stored = store.horse(&horse_id).unwrap().unwrap();
        prop_assert_eq!(stored.name, first.name.or(name));
        prop_assert_eq!(stored.birth_date, first.birth_date.or(birth_date));
        prop_assert_eq!(stored.sex, first.sex.or(sex));
    }

    #[test]
    fn one_ancestor_per_slot(
        horse_id in id(),
        writes in proptest::collection::vec((0usize..62, id()), 1..40),
    ) {
        let labels = generate_labels(5).unwrap();
        let mut store = Store::in_memory().unwrap();
        let profile = HorseRecord {
            name: Some("Example Horse".to_string()),
            ..HorseRecord::stub(horse_id.clone())
        };

        let mut first_writer = std::collections::HashMap::new();
        for (slot, ancestor) in writes {
            let label = &labels[slot];
            if ancestor == horse_id {
                continue;
            }
            first_writer.entry(label.clone()).or_insert_with(|| ancestor.clone());
            let bundle = Bundle::horse_profile(
                profile.clone(),
                None,
                None,
                vec![edge(&horse_id, label, ancestor)],
            );
            Synchronizer::new(&mut store).sync(&bundle).unwrap();
        }

        let stored = store.pedigree(&horse_id).unwrap();
        prop_assert_eq!(stored.len(), first_writer.len());
        for edge in stored {
            prop_assert_eq!(edge.generation as usize, edge.position.as_str().len());
            prop_assert_eq!(Some(&edge.ancestor_id), first_writer.get(&edge.position));
        }
    }
}
