//! Model registry: persistent catalog of model cards.

pub mod card;
pub mod memory;
pub mod sqlite;

pub use card::{CardPatch, ModelCard, StoredCard};
pub use memory::InMemoryModelRegistry;
pub use sqlite::SqliteModelRegistry;

use crate::error::MlError;

/// Card storage keyed by an auto-assigned integer id.
///
/// Filtered lookups default to scanning [`ModelRegistry::list`]; backends
/// with indexes override them.
pub trait ModelRegistry {
    /// Store a card and return its new id.
    fn add(&mut self, card: ModelCard) -> Result<i64, MlError>;

    fn find(&self, id: i64) -> Result<Option<StoredCard>, MlError>;

    /// All cards, ordered by id.
    fn list(&self) -> Result<Vec<StoredCard>, MlError>;

    /// Apply `patch` to the card with `id` and return the stored result.
    fn update(&mut self, id: i64, patch: &CardPatch) -> Result<StoredCard, MlError>;

    /// Remove a card. Returns whether it existed. Artifact files are left
    /// alone.
    fn delete(&mut self, id: i64) -> Result<bool, MlError>;

    fn find_by_exam(&self, exam_id: i64) -> Result<Vec<StoredCard>, MlError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|c| c.card.exam_id == exam_id)
            .collect())
    }

    fn find_by_job(&self, job_id: i64) -> Result<Vec<StoredCard>, MlError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|c| c.card.job_id == job_id)
            .collect())
    }

    fn find_by_exam_and_job(&self, exam_id: i64, job_id: i64) -> Result<Vec<StoredCard>, MlError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|c| c.card.exam_id == exam_id && c.card.job_id == job_id)
            .collect())
    }

    /// Like [`ModelRegistry::find`] but a missing id is an error.
    fn get(&self, id: i64) -> Result<StoredCard, MlError> {
        self.find(id)?
            .ok_or_else(|| MlError::not_found(format!("model card {id}")))
    }
}

#[cfg(test)]
pub(crate) mod contract {
    //! Behaviour every registry backend must share.

    use super::*;
    use crate::registry::card::sample_card;
    use serde_json::json;

    pub fn add_assigns_increasing_ids(registry: &mut impl ModelRegistry) {
        let a = registry.add(sample_card(1, 10)).unwrap();
        let b = registry.add(sample_card(1, 11)).unwrap();
        assert!(b > a);
        assert_eq!(registry.get(a).unwrap().card.job_id, 10);
        assert_eq!(registry.list().unwrap().len(), 2);
    }

    pub fn lookups_filter(registry: &mut impl ModelRegistry) {
        registry.add(sample_card(1, 10)).unwrap();
        registry.add(sample_card(1, 11)).unwrap();
        registry.add(sample_card(2, 10)).unwrap();
        assert_eq!(registry.find_by_exam(1).unwrap().len(), 2);
        assert_eq!(registry.find_by_job(10).unwrap().len(), 2);
        let both = registry.find_by_exam_and_job(2, 10).unwrap();
        assert_eq!(both.len(), 1);
        assert_eq!(both[0].card.exam_id, 2);
        assert!(registry.find_by_exam(99).unwrap().is_empty());
    }

    pub fn update_and_delete(registry: &mut impl ModelRegistry) {
        let id = registry.add(sample_card(1, 10)).unwrap();
        let mut patch = CardPatch::new();
        patch.insert("version".into(), json!("v2"));
        let updated = registry.update(id, &patch).unwrap();
        assert_eq!(updated.card.version, "v2");
        assert_eq!(registry.get(id).unwrap().card.version, "v2");

        patch.insert("nonsense".into(), json!(1));
        assert!(registry.update(id, &patch).unwrap_err().is_input_error());
        assert_eq!(registry.get(id).unwrap().card.version, "v2");

        assert!(registry.delete(id).unwrap());
        assert!(!registry.delete(id).unwrap());
        assert!(registry.get(id).unwrap_err().is_not_found());
        assert!(registry.update(id, &CardPatch::new()).unwrap_err().is_not_found());
    }
}
