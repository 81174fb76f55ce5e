use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::card::CardShort;
use crate::error::{DeckSyncError, Result};

/// Card name to number of copies.
pub type DeckCountMap = HashMap<String, usize>;

// ---------------------------------------------------------------------------
// Deck
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Deck {
    pub cards: Vec<CardShort>,
}

impl Deck {
    pub fn new(cards: Vec<CardShort>) -> Self {
        Self { cards }
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Fold the deck into a name to count mapping.
    ///
    /// An empty deck is never a valid result, so it fails with
    /// [`DeckSyncError::EmptyDeck`].
    pub fn counts(&self) -> Result<DeckCountMap> {
        if self.cards.is_empty() {
            return Err(DeckSyncError::EmptyDeck);
        }
        let mut counts = DeckCountMap::new();
        for card in &self.cards {
            *counts.entry(card.name.clone()).or_insert(0) += 1;
        }
        Ok(counts)
    }
}
