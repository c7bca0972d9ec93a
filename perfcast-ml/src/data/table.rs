//! In-memory feature table.

use crate::error::MlError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single raw record keyed by column name.
pub type Record = serde_json::Map<String, Value>;

/// Rows of subjects by named feature columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureTable {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl FeatureTable {
    /// Build a table, checking that every row matches the header width and
    /// that column names are unique.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self, MlError> {
        for (i, name) in columns.iter().enumerate() {
            if columns[..i].contains(name) {
                return Err(MlError::dataset(format!("duplicate column '{name}'")));
            }
        }
        if let Some((idx, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(MlError::dataset(format!(
                "row {idx} has {} cells, expected {}",
                row.len(),
                columns.len()
            )));
        }
        Ok(Self { columns, rows })
    }

    /// Build a table from records, using the first record's keys as the
    /// header. Missing keys in later records become nulls.
    pub fn from_records(records: &[Record]) -> Result<Self, MlError> {
        let columns: Vec<String> = records
            .first()
            .map(|r| r.keys().cloned().collect())
            .unwrap_or_default();
        let rows = records
            .iter()
            .map(|r| {
                columns
                    .iter()
                    .map(|c| r.get(c).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();
        Self::new(columns, rows)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Values of one column for the given row indices.
    pub fn column_values<'a>(
        &'a self,
        column: usize,
        row_indices: &'a [usize],
    ) -> impl Iterator<Item = &'a Value> + 'a {
        row_indices.iter().map(move |&r| &self.rows[r][column])
    }

    /// The row at `index` as a name-keyed record.
    pub fn record(&self, index: usize) -> Option<Record> {
        let row = self.rows.get(index)?;
        Some(
            self.columns
                .iter()
                .cloned()
                .zip(row.iter().cloned())
                .collect(),
        )
    }

    /// A copy of the table without `column`. Missing columns are a no-op.
    pub fn without_column(&self, column: &str) -> Self {
        match self.column_index(column) {
            Some(idx) => {
                let mut columns = self.columns.clone();
                columns.remove(idx);
                let rows = self
                    .rows
                    .iter()
                    .map(|row| {
                        let mut row = row.clone();
                        row.remove(idx);
                        row
                    })
                    .collect();
                Self { columns, rows }
            }
            None => self.clone(),
        }
    }
}

/// Dense numeric frame produced by the feature transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table() -> FeatureTable {
        FeatureTable::new(
            vec!["person_id".into(), "age".into(), "dept".into()],
            vec![
                vec![json!(1), json!(30), json!("ops")],
                vec![json!(2), json!(41), json!("hr")],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_ragged_rows() {
        let err = FeatureTable::new(vec!["a".into(), "b".into()], vec![vec![json!(1)]]);
        assert!(matches!(err, Err(MlError::Dataset(_))));
    }

    #[test]
    fn test_rejects_duplicate_columns() {
        let err = FeatureTable::new(vec!["a".into(), "a".into()], Vec::new());
        assert!(matches!(err, Err(MlError::Dataset(_))));
    }

    #[test]
    fn test_record_and_without_column() {
        let t = table();
        let rec = t.record(1).unwrap();
        assert_eq!(rec["dept"], json!("hr"));

        let dropped = t.without_column("person_id");
        assert_eq!(dropped.columns(), &["age".to_string(), "dept".to_string()]);
        assert_eq!(dropped.rows()[0], vec![json!(30), json!("ops")]);
    }

    #[test]
    fn test_from_records_fills_missing_with_null() {
        let mut a = Record::new();
        a.insert("x".into(), json!(1));
        a.insert("y".into(), json!("k"));
        let mut b = Record::new();
        b.insert("x".into(), json!(2));
        let t = FeatureTable::from_records(&[a, b]).unwrap();
        assert_eq!(t.row_count(), 2);
        assert_eq!(t.rows()[1][t.column_index("y").unwrap()], Value::Null);
    }
}
