//! Property-based tests for the feature transform, discretizer and decoder.

use proptest::prelude::*;

use perfcast_ml::data::{FeatureTable, Record};
use perfcast_ml::features::{discretize, enhance};
use perfcast_ml::inference::{decode, replay};
use serde_json::{Value, json};

// --- Discretizer properties ---

proptest! {
    #[test]
    fn discretized_labels_stay_in_range(
        values in prop::collection::vec(0.0f64..=100.0, 1..50),
        num_classes in 1usize..12,
    ) {
        let labels = discretize(&values, num_classes).unwrap();
        prop_assert_eq!(labels.len(), values.len());
        prop_assert!(labels.iter().all(|&c| c < num_classes));
    }

    #[test]
    fn discretizer_is_monotonic(a in 0.0f64..=100.0, b in 0.0f64..=100.0, n in 1usize..10) {
        let labels = discretize(&[a.min(b), a.max(b)], n).unwrap();
        prop_assert!(labels[0] <= labels[1]);
    }

    #[test]
    fn discretizer_rejects_out_of_domain(v in prop_oneof![-1e6f64..-0.001, 100.001f64..1e6]) {
        prop_assert!(discretize(&[50.0, v], 5).is_err());
    }
}

// --- Transform properties ---

fn table_strategy() -> impl Strategy<Value = (FeatureTable, Vec<f64>)> {
    (6usize..30).prop_flat_map(|n| {
        (
            prop::collection::vec(-1000i64..1000, n),
            prop::collection::vec(0.0f64..5000.0, n),
            prop::collection::vec(prop::sample::select(vec!["a", "b", "c", "d"]), n),
            prop::collection::vec(0.0f64..=100.0, n),
        )
            .prop_map(|(ints, floats, cats, target)| {
                let rows = ints
                    .iter()
                    .zip(&floats)
                    .zip(&cats)
                    .map(|((i, f), c)| vec![json!(i), json!(f), json!(c)])
                    .collect();
                let table =
                    FeatureTable::new(vec!["count".into(), "amount".into(), "kind".into()], rows)
                        .unwrap();
                (table, target)
            })
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn replay_reproduces_enhanced_training_rows(
        (table, target) in table_strategy(),
        seed in any::<u64>(),
    ) {
        let data = enhance(&table, &target, 5, 0.3, seed).unwrap();
        for (pos, &row) in data.train_rows.iter().enumerate() {
            let record = table.record(row).unwrap();
            let replayed = replay(&record, &data.metadata).unwrap();
            prop_assert_eq!(replayed.len(), data.train_x.rows[pos].len());
            for (a, b) in replayed.iter().zip(&data.train_x.rows[pos]) {
                prop_assert!((a - b).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn training_values_are_unit_scaled(
        (table, target) in table_strategy(),
        seed in any::<u64>(),
    ) {
        let data = enhance(&table, &target, 5, 0.3, seed).unwrap();
        for row in &data.train_x.rows {
            prop_assert!(row.iter().all(|v| (0.0..=1.0).contains(v)));
        }
    }

    #[test]
    fn feature_order_counts_numeric_and_vocabulary(
        (table, target) in table_strategy(),
        seed in any::<u64>(),
    ) {
        let data = enhance(&table, &target, 5, 0.3, seed).unwrap();
        let meta = &data.metadata;
        let vocab: usize = meta.one_hot_mappings.iter().map(|(_, v)| v.len()).sum();
        prop_assert_eq!(meta.feature_order.len(), meta.normalization_params.len() + vocab);
        prop_assert!(meta.is_consistent());
        prop_assert_eq!(data.train_rows.len() + data.test_rows.len(), table.row_count());
    }

    #[test]
    fn unknown_category_encodes_as_zeros(
        (table, target) in table_strategy(),
        seed in any::<u64>(),
        unseen in "[e-z]{1,6}",
    ) {
        let data = enhance(&table, &target, 5, 0.3, seed).unwrap();
        let mut record: Record = table.record(0).unwrap();
        record.insert("kind".into(), Value::String(unseen));
        let replayed = replay(&record, &data.metadata).unwrap();
        let expansions = data
            .metadata
            .feature_order
            .iter()
            .zip(&replayed)
            .filter(|(name, _)| name.starts_with("kind_"));
        for (_, v) in expansions {
            prop_assert_eq!(*v, 0.0);
        }
    }

    #[test]
    fn missing_base_feature_is_reported(
        (table, target) in table_strategy(),
        drop in 0usize..3,
    ) {
        let data = enhance(&table, &target, 5, 0.3, 1).unwrap();
        let mut record: Record = table.record(0).unwrap();
        let column = table.columns()[drop].clone();
        record.remove(&column);
        let err = replay(&record, &data.metadata).unwrap_err();
        prop_assert!(err.to_string().contains(&column));
    }
}

// --- Decoder properties ---

proptest! {
    #[test]
    fn decoded_ranges_partition_zero_to_hundred(n in 1usize..20) {
        let ranges: Vec<(u32, u32)> = (0..n)
            .map(|c| {
                let s = decode(n, &c).unwrap();
                let (lo, hi) = s.split_once(" to ").unwrap();
                (lo.parse().unwrap(), hi.parse().unwrap())
            })
            .collect();
        prop_assert_eq!(ranges[0].0, 0);
        prop_assert_eq!(ranges[n - 1].1, 100);
        for pair in ranges.windows(2) {
            prop_assert_eq!(pair[0].1, pair[1].0);
        }
    }

    #[test]
    fn decoder_rejects_out_of_range(n in 1usize..20, extra in 0usize..5) {
        prop_assert!(decode(n, &(n + extra)).is_err());
    }
}
