use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{RemoteError, RemoteResult, RemoteStore};
use crate::model::{Card, DeckId};

const PLACEHOLDER_DEFINITION: &str = "Definition not available";

#[derive(Default)]
struct StoreData {
    dictionary: HashMap<String, String>,
    // newest first
    history: Vec<String>,
    favorites: Vec<Card>,
    // newest first, duplicate free
    not_remembered: Vec<String>,
    // definitions for queued terms that are not dictionary words
    queued_definitions: HashMap<String, String>,
    decks: HashMap<DeckId, Vec<Card>>,
}

/// In-process store of record. Terms are keyed case-insensitively.
#[derive(Default)]
pub struct InMemoryStore {
    data: Mutex<StoreData>,
}

fn key(term: &str) -> String {
    term.trim().to_lowercase()
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dictionary<I, T, D>(self, entries: I) -> Self
    where
        I: IntoIterator<Item = (T, D)>,
        T: AsRef<str>,
        D: Into<String>,
    {
        {
            let mut data = self.lock();
            for (term, definition) in entries {
                data.dictionary.insert(key(term.as_ref()), definition.into());
            }
        }
        self
    }

    pub fn with_deck(self, deck: DeckId, cards: Vec<Card>) -> Self {
        self.lock().decks.insert(deck, cards);
        self
    }

    /// Record a successful lookup the way a dictionary search does; repeated
    /// searches of the newest term are collapsed.
    pub fn record_search(&self, term: &str) {
        let term = key(term);
        let mut data = self.lock();
        if data.history.first() != Some(&term) {
            data.history.insert(0, term);
        }
    }

    pub fn queue_len(&self) -> usize {
        self.lock().not_remembered.len()
    }

    fn lock(&self) -> MutexGuard<'_, StoreData> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StoreData {
    fn resolve_definition(&self, term: &str) -> String {
        self.dictionary
            .get(term)
            .or_else(|| self.queued_definitions.get(term))
            .cloned()
            .unwrap_or_else(|| PLACEHOLDER_DEFINITION.to_string())
    }
}

#[async_trait::async_trait]
impl RemoteStore for InMemoryStore {
    async fn history_terms(&self) -> RemoteResult<Vec<String>> {
        Ok(self.lock().history.clone())
    }

    async fn definition(&self, term: &str) -> RemoteResult<String> {
        self.lock()
            .dictionary
            .get(&key(term))
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(term.to_string()))
    }

    async fn favorite_status(&self, term: &str) -> RemoteResult<bool> {
        let term = key(term);
        Ok(self.lock().favorites.iter().any(|c| c.term == term))
    }

    async fn add_favorite(&self, term: &str, definition: &str) -> RemoteResult<()> {
        let term = key(term);
        let mut data = self.lock();
        let definition = data
            .dictionary
            .get(&term)
            .cloned()
            .unwrap_or_else(|| definition.to_string());
        let card = Card::new(term, definition);
        match data.favorites.iter_mut().find(|c| **c == card) {
            Some(existing) => *existing = card,
            None => data.favorites.push(card),
        }
        Ok(())
    }

    async fn remove_favorite(&self, term: &str) -> RemoteResult<()> {
        let term = key(term);
        self.lock().favorites.retain(|c| c.term != term);
        Ok(())
    }

    async fn favorites(&self) -> RemoteResult<Vec<Card>> {
        Ok(self.lock().favorites.clone())
    }

    async fn not_remembered(&self) -> RemoteResult<Vec<Card>> {
        let data = self.lock();
        Ok(data
            .not_remembered
            .iter()
            .map(|term| Card::new(term.clone(), data.resolve_definition(term)))
            .collect())
    }

    async fn pending_terms(&self) -> RemoteResult<Vec<String>> {
        Ok(self.lock().not_remembered.clone())
    }

    async fn add_not_remembered(&self, term: &str, definition: &str) -> RemoteResult<()> {
        let term = key(term);
        if term.is_empty() {
            return Err(RemoteError::Status {
                code: 400,
                body: Some("term cannot be empty".into()),
            });
        }
        let mut data = self.lock();
        if !data.dictionary.contains_key(&term) && !definition.is_empty() {
            data.queued_definitions
                .insert(term.clone(), definition.to_string());
        }
        if !data.not_remembered.contains(&term) {
            data.not_remembered.insert(0, term);
        }
        Ok(())
    }

    async fn remove_not_remembered(&self, term: &str) -> RemoteResult<()> {
        let term = key(term);
        let mut data = self.lock();
        let before = data.not_remembered.len();
        data.not_remembered.retain(|t| *t != term);
        if data.not_remembered.len() != before {
            data.queued_definitions.remove(&term);
        }
        Ok(())
    }

    async fn sample_deck(&self, deck: &DeckId) -> RemoteResult<Vec<Card>> {
        self.lock()
            .decks
            .get(deck)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(deck.to_string()))
    }
}
