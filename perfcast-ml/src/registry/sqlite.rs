//! SQLite-backed registry.
//!
//! Cards are stored whole as JSON, with the lookup keys (exam, job,
//! target) duplicated into indexed columns.

use super::{CardPatch, ModelCard, ModelRegistry, StoredCard};
use crate::error::MlError;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::{Path, PathBuf};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS model_cards (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    exam_id             INTEGER NOT NULL,
    job_id              INTEGER NOT NULL,
    name_object_predict TEXT    NOT NULL,
    architecture        TEXT    NOT NULL,
    version             TEXT    NOT NULL,
    card_json           TEXT    NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_model_cards_exam ON model_cards(exam_id);
CREATE INDEX IF NOT EXISTS idx_model_cards_job ON model_cards(job_id);
";

const SELECT: &str = "SELECT id, card_json FROM model_cards";

pub struct SqliteModelRegistry {
    conn: Connection,
    location: PathBuf,
}

impl SqliteModelRegistry {
    /// Open (creating if needed) the database at `path`.
    pub fn open(path: &Path) -> Result<Self, MlError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::with_connection(conn, path.to_path_buf())
    }

    /// A private database that disappears with the value.
    pub fn in_memory() -> Result<Self, MlError> {
        Self::with_connection(Connection::open_in_memory()?, PathBuf::from(":memory:"))
    }

    fn with_connection(conn: Connection, location: PathBuf) -> Result<Self, MlError> {
        conn.execute_batch(SCHEMA)?;
        tracing::debug!(location = %location.display(), "Opened model registry");
        Ok(Self { conn, location })
    }

    fn decode(&self, id: i64, json: &str) -> Result<StoredCard, MlError> {
        let card = serde_json::from_str(json).map_err(|e| {
            MlError::corrupt(&self.location, format!("model card {id} is malformed: {e}"))
        })?;
        Ok(StoredCard { id, card })
    }

    fn query(&self, sql: &str, args: impl rusqlite::Params) -> Result<Vec<StoredCard>, MlError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(args, raw_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(|(id, json)| self.decode(id, &json))
            .collect()
    }
}

fn raw_row(row: &Row<'_>) -> rusqlite::Result<(i64, String)> {
    Ok((row.get(0)?, row.get(1)?))
}

impl ModelRegistry for SqliteModelRegistry {
    fn add(&mut self, card: ModelCard) -> Result<i64, MlError> {
        let json = serde_json::to_string(&card)?;
        self.conn.execute(
            "INSERT INTO model_cards
                (exam_id, job_id, name_object_predict, architecture, version, card_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                card.exam_id,
                card.job_id,
                card.name_object_predict,
                card.architecture,
                card.version,
                json
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::info!(model_id = id, exam_id = card.exam_id, job_id = card.job_id, "Registered model card");
        Ok(id)
    }

    fn find(&self, id: i64) -> Result<Option<StoredCard>, MlError> {
        let raw = self
            .conn
            .query_row(&format!("{SELECT} WHERE id = ?1"), [id], raw_row)
            .optional()?;
        raw.map(|(id, json)| self.decode(id, &json)).transpose()
    }

    fn list(&self) -> Result<Vec<StoredCard>, MlError> {
        self.query(&format!("{SELECT} ORDER BY id"), [])
    }

    fn update(&mut self, id: i64, patch: &CardPatch) -> Result<StoredCard, MlError> {
        let current = self.get(id)?;
        let card = current.card.patched(patch)?;
        self.conn.execute(
            "UPDATE model_cards
                SET exam_id = ?1, job_id = ?2, name_object_predict = ?3,
                    architecture = ?4, version = ?5, card_json = ?6
              WHERE id = ?7",
            params![
                card.exam_id,
                card.job_id,
                card.name_object_predict,
                card.architecture,
                card.version,
                serde_json::to_string(&card)?,
                id
            ],
        )?;
        tracing::info!(model_id = id, fields = patch.len(), "Updated model card");
        Ok(StoredCard { id, card })
    }

    fn delete(&mut self, id: i64) -> Result<bool, MlError> {
        let removed = self.conn.execute("DELETE FROM model_cards WHERE id = ?1", [id])?;
        if removed > 0 {
            tracing::info!(model_id = id, "Deleted model card");
        }
        Ok(removed > 0)
    }

    fn find_by_exam(&self, exam_id: i64) -> Result<Vec<StoredCard>, MlError> {
        self.query(&format!("{SELECT} WHERE exam_id = ?1 ORDER BY id"), [exam_id])
    }

    fn find_by_job(&self, job_id: i64) -> Result<Vec<StoredCard>, MlError> {
        self.query(&format!("{SELECT} WHERE job_id = ?1 ORDER BY id"), [job_id])
    }

    fn find_by_exam_and_job(&self, exam_id: i64, job_id: i64) -> Result<Vec<StoredCard>, MlError> {
        self.query(
            &format!("{SELECT} WHERE exam_id = ?1 AND job_id = ?2 ORDER BY id"),
            [exam_id, job_id],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::card::sample_card;
    use crate::registry::contract;
    use tempfile::TempDir;

    #[test]
    fn test_add_assigns_increasing_ids() {
        contract::add_assigns_increasing_ids(&mut SqliteModelRegistry::in_memory().unwrap());
    }

    #[test]
    fn test_lookups_filter() {
        contract::lookups_filter(&mut SqliteModelRegistry::in_memory().unwrap());
    }

    #[test]
    fn test_update_and_delete() {
        contract::update_and_delete(&mut SqliteModelRegistry::in_memory().unwrap());
    }

    #[test]
    fn test_cards_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("registry.db");
        let id = {
            let mut registry = SqliteModelRegistry::open(&path).unwrap();
            registry.add(sample_card(4, 8)).unwrap()
        };
        let registry = SqliteModelRegistry::open(&path).unwrap();
        let stored = registry.get(id).unwrap();
        assert_eq!(stored.card, sample_card(4, 8));
    }

    #[test]
    fn test_malformed_row_is_corrupt() {
        let registry = SqliteModelRegistry::in_memory().unwrap();
        registry
            .conn
            .execute(
                "INSERT INTO model_cards
                    (exam_id, job_id, name_object_predict, architecture, version, card_json)
                 VALUES (1, 1, 't', 'a', 'v1', '{not json')",
                [],
            )
            .unwrap();
        let err = registry.list().unwrap_err();
        assert!(err.is_corrupt());
    }
}
