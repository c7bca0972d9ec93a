//! In-process registry, for tests and one-shot runs.

use super::{CardPatch, ModelCard, ModelRegistry, StoredCard};
use crate::error::MlError;

#[derive(Debug, Clone, Default)]
pub struct InMemoryModelRegistry {
    cards: Vec<StoredCard>,
    next_id: i64,
}

impl InMemoryModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ModelRegistry for InMemoryModelRegistry {
    fn add(&mut self, card: ModelCard) -> Result<i64, MlError> {
        self.next_id += 1;
        self.cards.push(StoredCard {
            id: self.next_id,
            card,
        });
        Ok(self.next_id)
    }

    fn find(&self, id: i64) -> Result<Option<StoredCard>, MlError> {
        Ok(self.cards.iter().find(|c| c.id == id).cloned())
    }

    fn list(&self) -> Result<Vec<StoredCard>, MlError> {
        Ok(self.cards.clone())
    }

    fn update(&mut self, id: i64, patch: &CardPatch) -> Result<StoredCard, MlError> {
        let stored = self
            .cards
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| MlError::not_found(format!("model card {id}")))?;
        stored.card = stored.card.patched(patch)?;
        Ok(stored.clone())
    }

    fn delete(&mut self, id: i64) -> Result<bool, MlError> {
        let len = self.cards.len();
        self.cards.retain(|c| c.id != id);
        Ok(self.cards.len() < len)
    }
}
