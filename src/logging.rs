use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

use crate::error::{DeckSyncError, Result};

/// Install the global tracing subscriber.
///
/// `default_filter` (e.g. `"mtg_deck_sync=info"`) applies when `RUST_LOG` is
/// not set. Fails if a global subscriber is already installed.
pub fn init_tracing(default_filter: &str) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    SubscriberBuilder::default()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .try_init()
        .map_err(|e| DeckSyncError::InvalidArgument(format!("failed to initialize tracing: {e}")))
}
