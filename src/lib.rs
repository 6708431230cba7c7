// lib.rs - Review session core

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod cache;
pub mod config;
pub mod event;
pub mod fetch;
pub mod guard;
pub mod model;
pub mod navigation;
pub mod remote;
pub mod render;
pub mod session;

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub use config::{ReviewConfig, StoreConfig};
pub use event::{Notice, NoticeLevel, ReviewCommand, ViewId};
pub use guard::{LivenessGuard, Ticket};
pub use model::{Card, Collection, CollectionKind, DeckId, FavoriteMark, SessionState};
pub use remote::{RemoteError, RemoteStore};
pub use render::{compute_render_snapshot, Actions, Face, RenderSnapshot, ReviewView};
pub use session::{Commit, DequeueOutcome, EnqueueOutcome, FavoriteOutcome, ReviewSession};

pub const HISTORY_TTL: Duration = Duration::from_secs(5 * 60);
pub const NO_DEFINITION: &str = "No definition available.";
pub const EMPTY_SET_TEXT: &str = "No cards in this set";
pub const LOADING_TEXT: &str = "Loading...";
pub const LOADING_COUNTER: &str = "...";
pub const EMPTY_COUNTER: &str = "0 / 0";

/// How an error is recovered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorClass {
    /// A single request failed; recovered locally with a safe default.
    Transient,
    /// An add/remove call failed; surfaced to the user, local state untouched.
    Mutation,
    Configuration,
}

/// The remote mutation a [`ReviewError::Mutation`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MutationAction {
    AddFavorite,
    RemoveFavorite,
    Enqueue,
    Dequeue,
}

impl MutationAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AddFavorite => "add-favorite",
            Self::RemoveFavorite => "remove-favorite",
            Self::Enqueue => "enqueue",
            Self::Dequeue => "dequeue",
        }
    }
}

impl std::fmt::Display for MutationAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReviewError {
    #[error("remote store request failed: {0}")]
    Remote(#[from] RemoteError),

    #[error("{action} failed: {source}")]
    Mutation {
        action: MutationAction,
        #[source]
        source: RemoteError,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ReviewError {
    #[must_use]
    pub fn mutation(action: MutationAction, source: RemoteError) -> Self {
        Self::Mutation { action, source }
    }

    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::Remote(_) => ErrorClass::Transient,
            Self::Mutation { .. } => ErrorClass::Mutation,
            Self::Config(_) => ErrorClass::Configuration,
        }
    }

    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Remote(e) | Self::Mutation { source: e, .. } => e.is_retryable(),
            Self::Config(_) => false,
        }
    }

    #[must_use]
    pub fn user_facing_message(&self) -> String {
        match self {
            Self::Mutation { action, source } => {
                let what = match action {
                    MutationAction::AddFavorite => "Could not add card to favorites.",
                    MutationAction::RemoveFavorite => "Could not remove card from favorites.",
                    MutationAction::Enqueue => "Could not add card to review stack.",
                    MutationAction::Dequeue => "Could not remove card from review stack.",
                };
                if source.is_retryable() {
                    format!("{what} Please try again.")
                } else {
                    what.to_string()
                }
            }
            Self::Remote(RemoteError::Network(_) | RemoteError::Timeout) => {
                "Unable to reach the dictionary server. Please check your connection.".into()
            }
            Self::Remote(_) => "The dictionary server returned an unexpected response.".into(),
            Self::Config(msg) => msg.clone(),
        }
    }
}

pub type ReviewResult<T> = Result<T, ReviewError>;
