//! The fitted feature transform.
//!
//! [`TransformMetadata`] is fitted once on training rows and persisted next
//! to the artifact. It is the only thing needed to turn a raw record into
//! the exact vector layout the classifier was trained on.

use crate::data::schema::{ColumnKind, category_key, infer_column_kind, numeric_value};
use crate::data::table::{FeatureMatrix, FeatureTable};
use crate::error::MlError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Min/max observed for a numeric column at fit time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizationBounds {
    pub min: f64,
    pub max: f64,
}

impl NormalizationBounds {
    /// Min-max scale a value with these bounds.
    ///
    /// Missing or non-numeric input, a constant column (`min == max`) and any
    /// non-finite result all map to 0.
    pub fn scale(&self, value: Option<f64>) -> f64 {
        let Some(v) = value else {
            return 0.0;
        };
        let range = self.max - self.min;
        if range == 0.0 {
            return 0.0;
        }
        let scaled = (v - self.min) / range;
        if scaled.is_finite() { scaled } else { 0.0 }
    }
}

/// Persisted description of the feature transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformMetadata {
    /// Raw columns a record must provide.
    pub base_feature: Vec<String>,
    /// Numeric columns in discovery order.
    #[serde(with = "crate::features::ordered")]
    pub normalization_params: Vec<(String, NormalizationBounds)>,
    /// Categorical columns in discovery order, each with its sorted vocabulary.
    #[serde(with = "crate::features::ordered")]
    pub one_hot_mappings: Vec<(String, Vec<String>)>,
    /// Final column layout handed to the classifier.
    pub feature_order: Vec<String>,
}

/// Name of the binary column for `category` of `column`.
pub fn expansion_name(column: &str, category: &str) -> String {
    format!("{column}_{category}")
}

impl TransformMetadata {
    /// Fit the transform on the given rows of `table`.
    ///
    /// Column kinds, bounds and vocabularies are derived from `rows` only.
    pub fn fit(table: &FeatureTable, rows: &[usize]) -> Result<Self, MlError> {
        if rows.is_empty() {
            return Err(MlError::invalid_input("cannot fit a transform on zero rows"));
        }
        if table.column_count() == 0 {
            return Err(MlError::invalid_input("feature table has no columns"));
        }

        let mut normalization_params = Vec::new();
        let mut one_hot_mappings = Vec::new();

        for (idx, column) in table.columns().iter().enumerate() {
            match infer_column_kind(table.column_values(idx, rows)) {
                ColumnKind::Numeric => {
                    let (min, max) = table
                        .column_values(idx, rows)
                        .filter_map(numeric_value)
                        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                            (lo.min(v), hi.max(v))
                        });
                    normalization_params.push((column.clone(), NormalizationBounds { min, max }));
                }
                ColumnKind::Categorical => {
                    let vocabulary: BTreeSet<String> = table
                        .column_values(idx, rows)
                        .filter_map(category_key)
                        .collect();
                    one_hot_mappings.push((column.clone(), vocabulary.into_iter().collect()));
                }
            }
        }

        let mut metadata = Self {
            base_feature: table.columns().to_vec(),
            normalization_params,
            one_hot_mappings,
            feature_order: Vec::new(),
        };
        metadata.feature_order = metadata.derived_feature_order();

        if metadata.feature_order.is_empty() {
            return Err(MlError::invalid_input(
                "no numeric or categorical values to build features from",
            ));
        }
        let mut seen = HashSet::new();
        if let Some(name) = metadata.feature_order.iter().find(|n| !seen.insert(n.as_str())) {
            return Err(MlError::invalid_input(format!(
                "feature '{name}' is produced by more than one column"
            )));
        }

        tracing::debug!(
            numeric = metadata.normalization_params.len(),
            categorical = metadata.one_hot_mappings.len(),
            features = metadata.feature_order.len(),
            "Fitted feature transform"
        );
        Ok(metadata)
    }

    /// Numeric columns followed by every one-hot expansion, grouped by
    /// source column in vocabulary order.
    pub fn derived_feature_order(&self) -> Vec<String> {
        let numeric = self.normalization_params.iter().map(|(c, _)| c.clone());
        let expanded = self.one_hot_mappings.iter().flat_map(|(column, categories)| {
            categories
                .iter()
                .map(move |category| expansion_name(column, category))
        });
        numeric.chain(expanded).collect()
    }

    /// Whether the persisted column order agrees with the mappings.
    pub fn is_consistent(&self) -> bool {
        self.feature_order == self.derived_feature_order()
    }

    pub fn feature_count(&self) -> usize {
        self.feature_order.len()
    }

    /// Encode one record, looking columns up by name.
    ///
    /// Numeric columns are min-max scaled, categorical columns expand into
    /// binary indicators (unknown categories give all zeros), and the result
    /// is laid out in `feature_order` with absent columns filled with 0.
    pub fn encode<'a, F>(&self, lookup: F) -> Vec<f64>
    where
        F: Fn(&str) -> Option<&'a Value>,
    {
        let mut computed: HashMap<String, f64> = HashMap::with_capacity(self.feature_order.len());

        for (column, bounds) in &self.normalization_params {
            let value = lookup(column).and_then(numeric_value);
            computed.insert(column.clone(), bounds.scale(value));
        }

        for (column, categories) in &self.one_hot_mappings {
            let observed = lookup(column).and_then(category_key);
            for category in categories {
                let hit = observed.as_deref() == Some(category.as_str());
                computed.insert(expansion_name(column, category), if hit { 1.0 } else { 0.0 });
            }
        }

        self.feature_order
            .iter()
            .map(|name| computed.get(name).copied().unwrap_or(0.0))
            .collect()
    }

    /// Encode the selected rows of `table`.
    pub fn transform(&self, table: &FeatureTable, rows: &[usize]) -> FeatureMatrix {
        let index: HashMap<&str, usize> = table
            .columns()
            .iter()
            .enumerate()
            .map(|(i, c)| (c.as_str(), i))
            .collect();

        let encoded = rows
            .iter()
            .map(|&r| {
                let row = &table.rows()[r];
                self.encode(|name| index.get(name).map(|&i| &row[i]))
            })
            .collect();

        FeatureMatrix {
            columns: self.feature_order.clone(),
            rows: encoded,
        }
    }
}
