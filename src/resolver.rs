//! Resolve a set of card names into a [`Deck`] from the document store.
//!
//! All documents are fetched with one batched read, then each distinct
//! snapshot is decoded on its own task. Any decode failure fails the whole
//! deck: the remaining tasks are aborted and no partial deck is returned.

use std::collections::HashMap;
use tokio::task::JoinSet;
use tracing::{debug, error};

use crate::config::CARDS_COLLECTION;
use crate::deck_list::DeckList;
use crate::error::{DeckSyncError, Result};
use crate::models::{CardEntry, CardShort, Deck};
use crate::normalize::document_key;
use crate::store::{DocumentStore, Snapshot};

/// Build a deck holding one [`CardShort`] per requested name.
///
/// A name given more than once yields that many copies in the deck; its
/// document is still read and decoded once.
pub async fn resolve_deck<S, I, N>(store: &S, names: I) -> Result<Deck>
where
    S: DocumentStore + ?Sized,
    I: IntoIterator<Item = N>,
    N: AsRef<str>,
{
    let (keys, copies) = tally(names.into_iter().map(|n| (document_key(n.as_ref()), 1)));
    resolve_keys(store, keys, copies).await
}

/// Build a deck from a parsed list, one [`CardShort`] per requested copy.
pub async fn resolve_deck_list<S>(store: &S, list: &DeckList) -> Result<Deck>
where
    S: DocumentStore + ?Sized,
{
    let (keys, copies) = tally(
        list.iter()
            .filter(|(_, count)| **count > 0)
            .map(|(name, &count)| (document_key(name), count as usize)),
    );
    resolve_keys(store, keys, copies).await
}

/// Distinct keys in first-seen order, plus the copies requested for each.
fn tally(requested: impl Iterator<Item = (String, usize)>) -> (Vec<String>, HashMap<String, usize>) {
    let mut keys = Vec::new();
    let mut copies: HashMap<String, usize> = HashMap::new();
    for (key, n) in requested {
        let total = copies.entry(key.clone()).or_insert(0);
        if *total == 0 {
            keys.push(key);
        }
        *total += n;
    }
    (keys, copies)
}

async fn resolve_keys<S>(
    store: &S,
    keys: Vec<String>,
    copies: HashMap<String, usize>,
) -> Result<Deck>
where
    S: DocumentStore + ?Sized,
{
    if keys.is_empty() {
        return Ok(Deck::default());
    }

    let snapshots = store
        .get_all(CARDS_COLLECTION, &keys)
        .await
        .map_err(|e| {
            error!(error = %e, cards = keys.len(), "can't get cards");
            e
        })?;

    let mut pending: HashMap<String, Snapshot> = snapshots
        .into_iter()
        .map(|snap| (snap.key.clone(), snap))
        .collect();
    let mut tasks = JoinSet::new();
    for key in &keys {
        // A key the store did not answer for decodes as a missing document.
        let snapshot = pending.remove(key).unwrap_or_else(|| Snapshot {
            key: key.clone(),
            data: None,
        });
        let n = copies.get(key).copied().unwrap_or(1);
        tasks.spawn(async move { (n, decode_card(&snapshot)) });
    }

    let expected: usize = copies.values().sum();
    let mut cards = Vec::with_capacity(expected);
    while let Some(joined) = tasks.join_next().await {
        let (n, decoded) = joined.map_err(|e| DeckSyncError::Task(e.to_string()))?;
        match decoded {
            Ok(card) => cards.extend(std::iter::repeat(card).take(n)),
            Err(e) => {
                error!(error = %e, "cannot extract data");
                tasks.abort_all();
                return Err(e);
            }
        }
    }

    debug!(cards = cards.len(), expected, "deck resolved");
    Ok(Deck::new(cards))
}

fn decode_card(snapshot: &Snapshot) -> Result<CardShort> {
    let entry: CardEntry = snapshot.decode()?;
    Ok(CardShort::from(&entry))
}
