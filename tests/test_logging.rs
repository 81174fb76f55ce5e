//! Global tracing subscriber setup.

use mtg_deck_sync::logging::init_tracing;

#[test]
fn init_tracing_installs_once() {
    init_tracing("mtg_deck_sync=debug").unwrap();
    tracing::info!("subscriber installed");

    // A second global subscriber is refused.
    assert!(init_tracing("info").is_err());
}
