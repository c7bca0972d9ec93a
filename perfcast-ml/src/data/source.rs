//! Per-period delimited feature files and the dataset assembler.
//!
//! Raw data arrives as one delimited file per (period, subject group). Each
//! file has a header row, a person id column and arbitrary feature columns.
//! Performance scores come from an external store as `(person_id, value)`
//! records grouped by the same periods.

use crate::data::schema::parse_cell;
use crate::data::table::{FeatureTable, Record};
use crate::error::{MlError, ResultExt};
use csv::{ReaderBuilder, Trim};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// Files grouped by period (e.g. year), oldest first.
pub type FilesByPeriod = BTreeMap<i32, Vec<PathBuf>>;

/// One observed performance score for a subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub person_id: i64,
    pub value: f64,
}

// ---------------------------------------------------------------------------
// CsvSource
// ---------------------------------------------------------------------------

/// Delimited text file data source.
#[derive(Debug, Clone)]
pub struct CsvSource {
    pub path: PathBuf,
    pub delimiter: char,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>, delimiter: char) -> Self {
        Self {
            path: path.into(),
            delimiter,
        }
    }

    /// Load the whole file as a typed feature table.
    pub fn load(&self) -> Result<FeatureTable, MlError> {
        let content = std::fs::read_to_string(&self.path)?;
        self.parse(&content)
    }

    fn parse(&self, content: &str) -> Result<FeatureTable, MlError> {
        if !self.delimiter.is_ascii() {
            return Err(MlError::invalid_input(format!(
                "delimiter '{}' is not a single-byte character",
                self.delimiter
            )));
        }
        let malformed = |e: csv::Error| MlError::dataset(format!("{}: {e}", self.path.display()));

        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter as u8)
            .trim(Trim::All)
            .from_reader(content.as_bytes());

        let columns: Vec<String> = reader
            .headers()
            .map_err(malformed)?
            .iter()
            .map(str::to_string)
            .collect();
        if columns.is_empty() {
            return Err(MlError::dataset(format!("empty file {}", self.path.display())));
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(malformed)?;
            rows.push(record.iter().map(parse_cell).collect());
        }

        FeatureTable::new(columns, rows)
    }
}

fn matches_person(cell: &Value, person_id: i64) -> bool {
    match cell {
        Value::Number(n) => n.as_i64() == Some(person_id),
        Value::String(s) => s.trim().parse::<i64>().ok() == Some(person_id),
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// DatasetAssembler
// ---------------------------------------------------------------------------

/// Joins feature files with performance scores.
#[derive(Debug, Clone)]
pub struct DatasetAssembler {
    pub person_id_column: String,
    pub delimiter: char,
}

impl Default for DatasetAssembler {
    fn default() -> Self {
        Self {
            person_id_column: "person_id".to_string(),
            delimiter: ',',
        }
    }
}

impl DatasetAssembler {
    pub fn new(person_id_column: impl Into<String>, delimiter: char) -> Self {
        Self {
            person_id_column: person_id_column.into(),
            delimiter,
        }
    }

    fn load_file(&self, path: &Path) -> Result<(FeatureTable, usize), MlError> {
        let table = CsvSource::new(path, self.delimiter)
            .load()
            .context(|| format!("loading {}", path.display()))?;
        let id_idx = table.column_index(&self.person_id_column).ok_or_else(|| {
            MlError::dataset(format!(
                "{} has no '{}' column",
                path.display(),
                self.person_id_column
            ))
        })?;
        Ok((table, id_idx))
    }

    /// Build the feature table and aligned target series.
    ///
    /// For every period present in both maps, each file contributes one row
    /// per performance record whose person appears in it. The person id
    /// column is dropped from the features. All files must share one set of
    /// feature columns.
    pub fn assemble(
        &self,
        performance_by_period: &BTreeMap<i32, Vec<PerformanceRecord>>,
        files_by_period: &FilesByPeriod,
    ) -> Result<(FeatureTable, Vec<f64>), MlError> {
        let mut header: Option<Vec<String>> = None;
        let mut rows = Vec::new();
        let mut targets = Vec::new();

        for (period, records) in performance_by_period {
            let Some(files) = files_by_period.get(period) else {
                tracing::debug!(period, "No feature files for period");
                continue;
            };
            for path in files {
                let (table, id_idx) = self.load_file(path)?;
                let features = table.without_column(&self.person_id_column);
                match &header {
                    None => header = Some(features.columns().to_vec()),
                    Some(h) if h.as_slice() != features.columns() => {
                        return Err(MlError::dataset(format!(
                            "{} has columns {:?}, expected {:?}",
                            path.display(),
                            features.columns(),
                            h
                        )));
                    }
                    Some(_) => {}
                }

                let mut by_person: HashMap<i64, usize> = HashMap::new();
                for (i, row) in table.rows().iter().enumerate() {
                    let id = match &row[id_idx] {
                        Value::Number(n) => n.as_i64(),
                        Value::String(s) => s.trim().parse().ok(),
                        _ => None,
                    };
                    if let Some(id) = id {
                        by_person.entry(id).or_insert(i);
                    }
                }

                let before = rows.len();
                for record in records {
                    if let Some(&i) = by_person.get(&record.person_id) {
                        rows.push(features.rows()[i].clone());
                        targets.push(record.value);
                    }
                }
                tracing::debug!(
                    period,
                    path = %path.display(),
                    matched = rows.len() - before,
                    "Assembled feature rows"
                );
            }
        }

        let table = FeatureTable::new(header.unwrap_or_default(), rows)?;
        tracing::info!(
            rows = table.row_count(),
            columns = table.column_count(),
            "Dataset assembled"
        );
        Ok((table, targets))
    }

    /// Find a person's features in the most recent period that has them.
    ///
    /// Periods are searched newest first, files in listed order. The person
    /// id column is kept in the returned record; replay ignores extras.
    pub fn find_latest_record(
        &self,
        person_id: i64,
        files_by_period: &FilesByPeriod,
    ) -> Result<Option<Record>, MlError> {
        for (period, files) in files_by_period.iter().rev() {
            for path in files {
                let (table, id_idx) = self.load_file(path)?;
                if let Some(i) = table
                    .rows()
                    .iter()
                    .position(|row| matches_person(&row[id_idx], person_id))
                {
                    tracing::debug!(person_id, period, path = %path.display(), "Found latest record");
                    return Ok(table.record(i));
                }
            }
        }
        Ok(None)
    }
}
