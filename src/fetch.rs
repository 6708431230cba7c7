use std::time::Duration;

use tracing::{instrument, warn};

use crate::cache::HistoryCache;
use crate::model::{Card, CollectionKind};
use crate::remote::RemoteStore;

/// Result of a fetch that may have been overtaken by the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Fetched {
    Items(Vec<Card>),
    /// The requesting operation went stale; nothing was cached or returned.
    Stale,
}

impl Fetched {
    pub fn into_items(self) -> Option<Vec<Card>> {
        match self {
            Fetched::Items(items) => Some(items),
            Fetched::Stale => None,
        }
    }
}

/// Turns a [`CollectionKind`] into cards. Never fails: remote errors are
/// logged and replaced with the best data at hand.
#[derive(Debug)]
pub struct CollectionFetcher {
    history: HistoryCache,
}

impl CollectionFetcher {
    pub fn new(history_ttl: Duration) -> Self {
        Self {
            history: HistoryCache::new(history_ttl),
        }
    }

    pub fn history_cache(&self) -> &HistoryCache {
        &self.history
    }

    #[instrument(skip(self, store, kind, live), fields(collection = %kind))]
    pub async fn fetch<S>(
        &self,
        store: &S,
        kind: &CollectionKind,
        force_refresh: bool,
        live: &(dyn Fn() -> bool + Sync),
    ) -> Fetched
    where
        S: RemoteStore + ?Sized,
    {
        let result = match kind {
            CollectionKind::History => {
                return self.history.resolve(store, force_refresh, live).await;
            }
            CollectionKind::Favorites => store.favorites().await,
            CollectionKind::NotRemembered => store.not_remembered().await,
            CollectionKind::Sample(deck) => store.sample_deck(deck).await,
        };

        match result {
            Ok(items) => Fetched::Items(items),
            Err(e) => {
                warn!(error = %e, "collection fetch failed, showing empty set");
                Fetched::Items(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DeckId;
    use crate::remote::InMemoryStore;

    fn always() -> bool {
        true
    }

    #[tokio::test]
    async fn missing_deck_yields_empty_set() {
        let fetcher = CollectionFetcher::new(crate::HISTORY_TTL);
        let store = InMemoryStore::new();
        let kind = CollectionKind::Sample(DeckId::new("animals").unwrap());
        let fetched = fetcher.fetch(&store, &kind, false, &always).await;
        assert_eq!(fetched, Fetched::Items(Vec::new()));
    }

    #[tokio::test]
    async fn sample_decks_are_repeatable() {
        let deck = DeckId::new("coding").unwrap();
        let store = InMemoryStore::new().with_deck(
            deck.clone(),
            vec![Card::new("closure", "a function with captured state")],
        );
        let fetcher = CollectionFetcher::new(crate::HISTORY_TTL);
        let kind = CollectionKind::Sample(deck);
        let first = fetcher.fetch(&store, &kind, false, &always).await;
        let second = fetcher.fetch(&store, &kind, false, &always).await;
        assert_eq!(first, second);
        assert_eq!(first.into_items().map(|c| c.len()), Some(1));
    }

    #[tokio::test]
    async fn favorites_reflect_remote_state() {
        let store = InMemoryStore::new().with_dictionary([("cat", "a small feline")]);
        let fetcher = CollectionFetcher::new(crate::HISTORY_TTL);
        store.add_favorite("cat", "").await.unwrap();
        let fetched = fetcher
            .fetch(&store, &CollectionKind::Favorites, false, &always)
            .await;
        assert_eq!(fetched, Fetched::Items(vec![Card::new("cat", "a small feline")]));
    }
}
