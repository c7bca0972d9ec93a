//! Loading training tables, score files and records from the command line.

use anyhow::{Context, bail};
use perfcast_ml::data::CsvSource;
use perfcast_ml::{FeatureTable, FilesByPeriod, PerformanceRecord, Record};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Column naming the period in a scores table.
pub const PERIOD_COLUMN: &str = "period";

/// Parse a `PERIOD=PATH` argument.
pub fn parse_period_file(s: &str) -> Result<(i32, PathBuf), String> {
    let (period, path) = s
        .split_once('=')
        .ok_or_else(|| format!("expected PERIOD=PATH, got '{s}'"))?;
    let period = period
        .trim()
        .parse::<i32>()
        .map_err(|e| format!("invalid period '{period}': {e}"))?;
    if path.trim().is_empty() {
        return Err(format!("missing path for period {period}"));
    }
    Ok((period, PathBuf::from(path.trim())))
}

/// Group repeated `--features` arguments by period, keeping argument order.
pub fn files_by_period(files: &[(i32, PathBuf)]) -> FilesByPeriod {
    let mut grouped = FilesByPeriod::new();
    for (period, path) in files {
        grouped.entry(*period).or_default().push(path.clone());
    }
    grouped
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Load one table holding both features and the target column.
///
/// The target and person id columns are removed from the features. Every
/// row must carry a numeric target.
pub fn load_single_table(
    path: &Path,
    target_column: &str,
    person_id_column: &str,
    delimiter: char,
) -> anyhow::Result<(FeatureTable, Vec<f64>)> {
    let table = CsvSource::new(path, delimiter)
        .load()
        .with_context(|| format!("Failed to load {}", path.display()))?;
    let Some(idx) = table.column_index(target_column) else {
        bail!("{} has no '{}' column", path.display(), target_column);
    };
    let target = table
        .rows()
        .iter()
        .enumerate()
        .map(|(row, cells)| {
            as_f64(&cells[idx])
                .with_context(|| format!("row {} of {} has no numeric target", row + 1, path.display()))
        })
        .collect::<anyhow::Result<Vec<f64>>>()?;
    let features = table
        .without_column(target_column)
        .without_column(person_id_column);
    Ok((features, target))
}

/// Load a scores table into per-period performance records.
///
/// Rows with an empty score are skipped; the person is simply not part of
/// that period's training data.
pub fn load_scores(
    path: &Path,
    score_column: &str,
    person_id_column: &str,
    delimiter: char,
) -> anyhow::Result<BTreeMap<i32, Vec<PerformanceRecord>>> {
    let table = CsvSource::new(path, delimiter)
        .load()
        .with_context(|| format!("Failed to load {}", path.display()))?;
    let column = |name: &str| {
        table
            .column_index(name)
            .with_context(|| format!("{} has no '{}' column", path.display(), name))
    };
    let (id_idx, period_idx, score_idx) = (
        column(person_id_column)?,
        column(PERIOD_COLUMN)?,
        column(score_column)?,
    );

    let mut by_period: BTreeMap<i32, Vec<PerformanceRecord>> = BTreeMap::new();
    let mut skipped = 0usize;
    for (row, cells) in table.rows().iter().enumerate() {
        let Some(value) = as_f64(&cells[score_idx]) else {
            skipped += 1;
            continue;
        };
        let person_id = as_i64(&cells[id_idx])
            .with_context(|| format!("row {} of {} has no person id", row + 1, path.display()))?;
        let period = as_i64(&cells[period_idx])
            .and_then(|p| i32::try_from(p).ok())
            .with_context(|| format!("row {} of {} has no valid period", row + 1, path.display()))?;
        by_period
            .entry(period)
            .or_default()
            .push(PerformanceRecord { person_id, value });
    }
    if skipped > 0 {
        tracing::warn!(skipped, column = score_column, "Skipped rows without a score");
    }
    Ok(by_period)
}

/// Parse a JSON object into a raw record.
pub fn parse_record(json: &str) -> anyhow::Result<Record> {
    match serde_json::from_str::<Value>(json).context("Record is not valid JSON")? {
        Value::Object(map) => Ok(map),
        other => bail!("Record must be a JSON object, got {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_parse_period_file() {
        assert_eq!(
            parse_period_file("2023=data/a.csv").unwrap(),
            (2023, PathBuf::from("data/a.csv"))
        );
        assert!(parse_period_file("data/a.csv").is_err());
        assert!(parse_period_file("year=a.csv").is_err());
        assert!(parse_period_file("2023=").is_err());
    }

    #[test]
    fn test_files_grouped_by_period() {
        let grouped = files_by_period(&[
            (2024, PathBuf::from("b.csv")),
            (2023, PathBuf::from("a.csv")),
            (2024, PathBuf::from("c.csv")),
        ]);
        assert_eq!(grouped.keys().copied().collect::<Vec<_>>(), vec![2023, 2024]);
        assert_eq!(grouped[&2024], vec![PathBuf::from("b.csv"), PathBuf::from("c.csv")]);
    }

    #[test]
    fn test_single_table_drops_target_and_id() {
        let dir = TempDir::new().unwrap();
        let path = write(
            dir.path(),
            "d.csv",
            "person_id,tenure,dept,satisfaction_score\n1,3,ops,40\n2,5,hr,85.5\n",
        );
        let (table, target) =
            load_single_table(&path, "satisfaction_score", "person_id", ',').unwrap();
        assert_eq!(table.columns(), ["tenure".to_string(), "dept".to_string()]);
        assert_eq!(target, vec![40.0, 85.5]);
    }

    #[test]
    fn test_single_table_requires_numeric_target() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "d.csv", "x,score\n1,10\n2,\n");
        assert!(load_single_table(&path, "score", "person_id", ',').is_err());
        assert!(load_single_table(&path, "missing", "person_id", ',').is_err());
    }

    #[test]
    fn test_scores_grouped_by_period() {
        let dir = TempDir::new().unwrap();
        let path = write(
            dir.path(),
            "scores.csv",
            "person_id,period,improvement_rank\n1,2023,10\n2,2023,\n1,2024,55\n",
        );
        let scores = load_scores(&path, "improvement_rank", "person_id", ',').unwrap();
        assert_eq!(scores.len(), 2);
        assert_eq!(
            scores[&2023],
            vec![PerformanceRecord { person_id: 1, value: 10.0 }]
        );
        assert_eq!(scores[&2024][0].value, 55.0);
    }

    #[test]
    fn test_parse_record() {
        let record = parse_record(r#"{"tenure": 4, "dept": "it"}"#).unwrap();
        assert_eq!(record.len(), 2);
        assert!(parse_record("[1, 2]").is_err());
        assert!(parse_record("not json").is_err());
    }
}
