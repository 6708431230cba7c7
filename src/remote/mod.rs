//! Request/response contract of the remote store of record.
//!
//! The controller depends only on [`RemoteStore`]; the transports live in
//! the submodules. Every operation is a single round trip and is the only
//! place controller logic can suspend.

#[cfg(feature = "http")]
pub mod http;
pub mod memory;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Card, DeckId};

#[cfg(feature = "http")]
pub use self::http::{HttpStore, ValidatedUrl};
pub use self::memory::InMemoryStore;

#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("HTTP error {code}")]
    Status { code: u16, body: Option<String> },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl RemoteError {
    pub fn is_retryable(&self) -> bool {
        match self {
            RemoteError::Network(_) | RemoteError::Timeout => true,
            RemoteError::Status { code, .. } => *code == 408 || *code == 429 || *code >= 500,
            RemoteError::NotFound(_) | RemoteError::Decode(_) | RemoteError::InvalidUrl { .. } => {
                false
            }
        }
    }
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Operations consumed from the remote store. Implementations are stateless
/// from the controller's point of view; the add operations must be idempotent.
#[async_trait::async_trait]
pub trait RemoteStore: Send + Sync {
    /// Recently searched terms, newest first.
    async fn history_terms(&self) -> RemoteResult<Vec<String>>;
    async fn definition(&self, term: &str) -> RemoteResult<String>;
    async fn favorite_status(&self, term: &str) -> RemoteResult<bool>;
    async fn add_favorite(&self, term: &str, definition: &str) -> RemoteResult<()>;
    async fn remove_favorite(&self, term: &str) -> RemoteResult<()>;
    async fn favorites(&self) -> RemoteResult<Vec<Card>>;
    async fn not_remembered(&self) -> RemoteResult<Vec<Card>>;
    /// Terms currently in the not-remembered queue.
    async fn pending_terms(&self) -> RemoteResult<Vec<String>>;
    async fn add_not_remembered(&self, term: &str, definition: &str) -> RemoteResult<()>;
    async fn remove_not_remembered(&self, term: &str) -> RemoteResult<()>;
    async fn sample_deck(&self, deck: &DeckId) -> RemoteResult<Vec<Card>>;
}
