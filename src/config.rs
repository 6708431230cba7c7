use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::model::{CollectionKind, DeckId};
use crate::ReviewError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const MAX_TIMEOUT_MS: u64 = 300_000;
pub const DEFAULT_HISTORY_TTL_MS: u64 = 5 * 60 * 1000;
pub const MAX_HISTORY_TTL_MS: u64 = 24 * 60 * 60 * 1000;

/// Where the remote store lives and how long a single request may take.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl StoreConfig {
    pub fn validate(&self) -> Result<(), ReviewError> {
        if self.base_url.trim().is_empty() {
            return Err(ReviewError::Config("store.base_url must not be empty".into()));
        }
        if self.timeout_ms == 0 || self.timeout_ms > MAX_TIMEOUT_MS {
            return Err(ReviewError::Config(format!(
                "store.timeout_ms must be in 1..={MAX_TIMEOUT_MS}"
            )));
        }
        #[cfg(feature = "http")]
        crate::remote::ValidatedUrl::new(self.base_url.as_str())
            .map_err(|e| ReviewError::Config(format!("store.base_url: {e}")))?;
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    pub history_ttl_ms: u64,
    pub initial_collection: CollectionKind,
    pub sample_decks: Vec<DeckId>,
    /// Display titles for decks whose id does not read well on its own.
    pub deck_titles: BTreeMap<DeckId, String>,
    pub store: StoreConfig,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            history_ttl_ms: DEFAULT_HISTORY_TTL_MS,
            initial_collection: CollectionKind::History,
            sample_decks: ["animals", "coding"]
                .into_iter()
                .filter_map(|id| DeckId::new(id).ok())
                .collect(),
            deck_titles: DeckId::new("coding")
                .into_iter()
                .map(|deck| (deck, "Programming".to_string()))
                .collect(),
            store: StoreConfig::default(),
        }
    }
}

impl ReviewConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ReviewError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ReviewError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReviewError> {
        if self.history_ttl_ms == 0 || self.history_ttl_ms > MAX_HISTORY_TTL_MS {
            return Err(ReviewError::Config(format!(
                "history_ttl_ms must be in 1..={MAX_HISTORY_TTL_MS}"
            )));
        }
        for (i, deck) in self.sample_decks.iter().enumerate() {
            if self.sample_decks[..i].contains(deck) {
                return Err(ReviewError::Config(format!(
                    "sample deck '{deck}' listed twice"
                )));
            }
        }
        if let Some((deck, _)) = self.deck_titles.iter().find(|(_, t)| t.trim().is_empty()) {
            return Err(ReviewError::Config(format!(
                "title for sample deck '{deck}' must not be empty"
            )));
        }
        if let CollectionKind::Sample(deck) = &self.initial_collection {
            if !self.sample_decks.contains(deck) {
                return Err(ReviewError::Config(format!(
                    "initial collection '{deck}' is not a configured sample deck"
                )));
            }
        }
        self.store.validate()
    }

    pub fn history_ttl(&self) -> Duration {
        Duration::from_millis(self.history_ttl_ms)
    }

    pub fn title_for(&self, kind: &CollectionKind) -> String {
        collection_title(&self.deck_titles, kind)
    }
}

/// Configured title for a sample deck, else the collection's own title.
pub(crate) fn collection_title(
    deck_titles: &BTreeMap<DeckId, String>,
    kind: &CollectionKind,
) -> String {
    match kind {
        CollectionKind::Sample(deck) => deck_titles
            .get(deck)
            .cloned()
            .unwrap_or_else(|| deck.title()),
        _ => kind.title(),
    }
}
