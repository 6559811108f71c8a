//! Remote collaborators of the sync engine.
//!
//! Implementations:
//! - `HttpClient` (in deck-cli) - The deck and asset HTTP endpoints
//! - In-memory stores in the orchestrator tests

use crate::model::{AssetRecord, DeckRecord};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Server responded with {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("Transport error: {0}")]
    Other(String),
}

impl TransportError {
    /// Response body of a rejected request, if the server sent one.
    pub fn body(&self) -> Option<&str> {
        match self {
            TransportError::Status { body, .. } => Some(body),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;

/// A file ready to be handed to the asset endpoint.
#[derive(Debug, Clone)]
pub struct AssetUpload {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// The remote deck endpoint.
#[async_trait]
pub trait DeckStore: Send + Sync {
    /// Create a deck, returning the saved copy with its server id.
    async fn create(&self, deck: &DeckRecord) -> Result<DeckRecord>;

    /// Read the current remote copy of a deck.
    async fn fetch(&self, id: u64) -> Result<DeckRecord>;

    /// Replace the remote deck, returning the saved copy.
    async fn update(&self, deck: &DeckRecord) -> Result<DeckRecord>;

    /// All decks visible to the signed-in account.
    async fn list(&self) -> Result<Vec<DeckRecord>>;
}

/// The remote asset storage.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Upload a file for `deck_id`, returning its public URL.
    async fn upload(&self, deck_id: u64, upload: AssetUpload) -> Result<String>;

    /// Fetch the bytes of an uploaded asset.
    async fn download(&self, asset: &AssetRecord) -> Result<Vec<u8>>;
}
