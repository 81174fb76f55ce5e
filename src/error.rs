use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum DeckSyncError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Fetch of {url} failed after {attempts} attempt(s): {reason}")]
    Fetch {
        url: String,
        attempts: u32,
        reason: String,
    },

    #[error("Unexpected status {status} from {url}")]
    UpstreamStatus { url: String, status: StatusCode },

    /// The plain-text deck source answered with a non-200 status, which
    /// means the requested deck cannot be served.
    #[error("Deck at {url} unavailable: status {status}")]
    DeckUnavailable { url: String, status: StatusCode },

    #[error("Unsupported deck source: {0}")]
    UnsupportedSource(String),

    #[error("Cannot normalize deck list from {url}: {reason}")]
    Normalize { url: String, reason: String },

    #[error("Cannot decode document '{key}': {reason}")]
    Decode { key: String, reason: String },

    #[error("Cannot write document '{key}': {reason}")]
    Persistence { key: String, reason: String },

    #[error("Document store error: {0}")]
    Store(String),

    #[error("Zero length deck")]
    EmptyDeck,

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Task join error: {0}")]
    Task(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl DeckSyncError {
    /// HTTP status an API layer should answer with for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            DeckSyncError::Fetch { .. } | DeckSyncError::Cancelled => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            DeckSyncError::UpstreamStatus { .. }
            | DeckSyncError::Normalize { .. }
            | DeckSyncError::Store(_) => StatusCode::BAD_GATEWAY,
            DeckSyncError::UnsupportedSource(_) | DeckSyncError::EmptyDeck => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            DeckSyncError::NotFound(_) => StatusCode::NOT_FOUND,
            DeckSyncError::DeckUnavailable { .. } | DeckSyncError::InvalidArgument(_) => {
                StatusCode::BAD_REQUEST
            }
            DeckSyncError::Http(_)
            | DeckSyncError::Io(_)
            | DeckSyncError::Json(_)
            | DeckSyncError::Decode { .. }
            | DeckSyncError::Persistence { .. }
            | DeckSyncError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type Result<T> = std::result::Result<T, DeckSyncError>;
