//! Deck resolution against the document store and deck aggregation.

mod common;

use common::RecordingStore;
use mtg_deck_sync::resolver::{resolve_deck, resolve_deck_list};
use mtg_deck_sync::{CardShort, Deck, DeckList, DeckSyncError, DocumentStore, MemoryStore};
use serde_json::json;
use std::sync::atomic::Ordering;

async fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new();
    for (id, name) in [
        ("1", "Lightning Bolt"),
        ("2", "Counterspell"),
        ("3", "Llanowar Elves"),
    ] {
        store.set("cards", name, common::card_json(id, name)).await.unwrap();
    }
    store
        .set("cards", "Fire  Ice", common::split_card_json("s1"))
        .await
        .unwrap();
    store
}

// ---------------------------------------------------------------------------
// resolve_deck
// ---------------------------------------------------------------------------

#[tokio::test]
async fn resolves_one_card_per_requested_name() {
    let store = seeded_store().await;
    let deck = resolve_deck(&store, ["Lightning Bolt", "Counterspell", "Llanowar Elves"])
        .await
        .unwrap();

    assert_eq!(deck.len(), 3);
    let mut names: Vec<&str> = deck.cards.iter().map(|c| c.name.as_str()).collect();
    names.sort();
    assert_eq!(names, vec!["Counterspell", "Lightning Bolt", "Llanowar Elves"]);
}

#[tokio::test]
async fn repeated_names_become_copies_from_one_read() {
    let store = RecordingStore::new();
    store
        .set("cards", "Lightning Bolt", common::card_json("1", "Lightning Bolt"))
        .await
        .unwrap();
    let deck = resolve_deck(&store, ["Lightning Bolt", "Lightning Bolt", "Lightning Bolt"])
        .await
        .unwrap();

    assert_eq!(deck.len(), 3);
    assert_eq!(deck.counts().unwrap()["Lightning Bolt"], 3);
    assert_eq!(store.get_all_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn deck_list_counts_carry_into_the_deck() {
    let store = seeded_store().await;
    let list: DeckList = [
        ("Lightning Bolt".to_string(), 4),
        ("Counterspell".to_string(), 2),
        ("Fire // Ice".to_string(), 1),
        ("Llanowar Elves".to_string(), 0),
    ]
    .into_iter()
    .collect();

    let deck = resolve_deck_list(&store, &list).await.unwrap();
    let counts = deck.counts().unwrap();

    assert_eq!(deck.len(), 7);
    assert_eq!(counts.len(), 3);
    assert_eq!(counts["Lightning Bolt"], 4);
    assert_eq!(counts["Counterspell"], 2);
    assert_eq!(counts["Fire // Ice"], 1);
}

#[tokio::test]
async fn card_short_projects_stored_entry() {
    let store = seeded_store().await;
    let deck = resolve_deck(&store, ["Lightning Bolt"]).await.unwrap();
    let card = &deck.cards[0];

    assert_eq!(card.cost, "{R}");
    assert_eq!(card.cmc, 1.0);
    assert_eq!(card.rarity, "uncommon");
    assert_eq!(card.set, "a25");
    assert_eq!(card.colors, vec!["R".to_string()]);
    assert_eq!(card.oracle_text, "Lightning Bolt deals 3 damage to any target.");
    assert!(card.image.starts_with("https://img.scryfall.com/cards/normal/1.jpg"));
}

#[tokio::test]
async fn split_card_resolves_by_display_name() {
    let store = seeded_store().await;
    let deck = resolve_deck(&store, ["Fire // Ice"]).await.unwrap();
    let card = &deck.cards[0];

    assert_eq!(card.name, "Fire // Ice");
    assert_eq!(card.cost, "{1}{R} // {1}{U}");
    assert_eq!(card.colors, vec!["R".to_string(), "U".to_string()]);
    assert!(card.oracle_text.contains("Draw a card."));
}

#[tokio::test]
async fn no_names_gives_empty_deck_without_store_call() {
    let store = RecordingStore::new();
    let deck = resolve_deck(&store, Vec::<String>::new()).await.unwrap();
    assert!(deck.is_empty());
    assert_eq!(store.get_all_calls.load(Ordering::SeqCst), 0);
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn one_undecodable_document_fails_the_whole_deck() {
    let store = seeded_store().await;
    store
        .set("cards", "Broken Card", json!({ "id": 42, "name": ["not", "a", "string"] }))
        .await
        .unwrap();

    let err = resolve_deck(&store, ["Lightning Bolt", "Broken Card", "Counterspell"])
        .await
        .unwrap_err();
    match err {
        DeckSyncError::Decode { key, .. } => assert_eq!(key, "Broken Card"),
        other => panic!("expected decode error, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_document_is_a_decode_failure() {
    let store = seeded_store().await;
    let err = resolve_deck(&store, ["Lightning Bolt", "Not A Real Card"])
        .await
        .unwrap_err();
    assert!(matches!(err, DeckSyncError::Decode { ref key, .. } if key == "Not A Real Card"));
    assert_eq!(err.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn batched_read_failure_aborts_immediately() {
    let store = RecordingStore {
        fail_get_all: true,
        ..Default::default()
    };
    let err = resolve_deck(&store, ["Lightning Bolt"]).await.unwrap_err();
    assert!(matches!(err, DeckSyncError::Store(_)));
    assert_eq!(store.get_all_calls.load(Ordering::SeqCst), 1);
}

// ---------------------------------------------------------------------------
// Deck::counts
// ---------------------------------------------------------------------------

fn short(name: &str) -> CardShort {
    CardShort {
        name: name.to_string(),
        ..Default::default()
    }
}

#[test]
fn counts_sum_to_deck_size() {
    let deck = Deck::new(vec![
        short("Island"),
        short("Lightning Bolt"),
        short("Island"),
        short("Island"),
    ]);
    let counts = deck.counts().unwrap();

    assert_eq!(counts["Island"], 3);
    assert_eq!(counts["Lightning Bolt"], 1);
    assert_eq!(counts.values().sum::<usize>(), deck.len());
}

#[test]
fn counting_empty_deck_fails() {
    let err = Deck::default().counts().unwrap_err();
    assert!(matches!(err, DeckSyncError::EmptyDeck));
    assert_eq!(err.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);
}
