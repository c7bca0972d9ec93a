//! Apply a persisted transform to a single raw record.

use crate::data::table::Record;
use crate::error::MlError;
use crate::features::transforms::TransformMetadata;

/// Encode `record` into the classifier's input layout.
///
/// Every column in `base_feature` must be present as a key (a null value is
/// fine and encodes as 0). Extra keys are ignored.
pub fn replay(record: &Record, metadata: &TransformMetadata) -> Result<Vec<f64>, MlError> {
    if let Some(missing) = metadata
        .base_feature
        .iter()
        .find(|f| !record.contains_key(f.as_str()))
    {
        return Err(MlError::MissingFeature(missing.clone()));
    }
    Ok(metadata.encode(|name| record.get(name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::table::FeatureTable;
    use crate::features::enhance::enhance;
    use serde_json::json;

    fn metadata() -> TransformMetadata {
        let table = FeatureTable::new(
            vec!["tenure".into(), "dept".into()],
            vec![
                vec![json!(0), json!("A")],
                vec![json!(10), json!("B")],
                vec![json!(20), json!("C")],
            ],
        )
        .unwrap();
        TransformMetadata::fit(&table, &[0, 1, 2]).unwrap()
    }

    fn record(value: serde_json::Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_replay_encodes_in_feature_order() {
        let meta = metadata();
        assert_eq!(meta.feature_order, vec!["tenure", "dept_A", "dept_B", "dept_C"]);
        let v = replay(&record(json!({"tenure": 5, "dept": "B"})), &meta).unwrap();
        assert_eq!(v, vec![0.25, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_unknown_category_is_all_zero() {
        let v = replay(&record(json!({"tenure": 20, "dept": "D"})), &metadata()).unwrap();
        assert_eq!(v, vec![1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_missing_feature_is_named() {
        let err = replay(&record(json!({"dept": "A"})), &metadata()).unwrap_err();
        match err {
            MlError::MissingFeature(name) => assert_eq!(name, "tenure"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_null_and_extra_fields() {
        let v = replay(
            &record(json!({"tenure": null, "dept": "A", "person_id": 9})),
            &metadata(),
        )
        .unwrap();
        assert_eq!(v, vec![0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_replay_reproduces_training_rows() {
        let table = FeatureTable::new(
            vec!["score".into(), "team".into(), "remote".into()],
            (0..12)
                .map(|i| {
                    vec![
                        json!(i * 7 % 50),
                        json!(["red", "blue", "green"][i % 3]),
                        json!(i % 2 == 0),
                    ]
                })
                .collect(),
        )
        .unwrap();
        let target: Vec<f64> = (0..12).map(|i| (i * 8) as f64).collect();
        let data = enhance(&table, &target, 5, 0.25, 11).unwrap();

        for (pos, &row) in data.train_rows.iter().enumerate() {
            let rec = table.record(row).unwrap();
            let replayed = replay(&rec, &data.metadata).unwrap();
            for (a, b) in replayed.iter().zip(&data.train_x.rows[pos]) {
                assert!((a - b).abs() < 1e-12);
            }
        }
    }
}
