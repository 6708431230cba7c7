//! Time-boxed cache for the history collection.
//!
//! The term list is cheap to re-fetch; the per-term definition lookups are
//! not. A cached entry is reused only while it is younger than the TTL and
//! its source terms match the freshly fetched list exactly.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::join_all;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use crate::fetch::Fetched;
use crate::model::Card;
use crate::remote::RemoteStore;
use crate::NO_DEFINITION;

#[derive(Clone, Debug)]
struct CacheEntry {
    source_terms: Vec<String>,
    resolved_cards: Vec<Card>,
    fetched_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}

#[derive(Debug)]
pub struct HistoryCache {
    ttl: Duration,
    entry: Mutex<Option<CacheEntry>>,
}

impl HistoryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: Mutex::new(None),
        }
    }

    /// Cached cards for `terms`, if the entry is fresh and built from exactly
    /// these terms in this order.
    pub fn lookup(&self, terms: &[String]) -> Option<Vec<Card>> {
        let entry = self.lock();
        entry
            .as_ref()
            .filter(|e| e.is_fresh(self.ttl) && e.source_terms == terms)
            .map(|e| e.resolved_cards.clone())
    }

    pub fn store(&self, source_terms: Vec<String>, resolved_cards: Vec<Card>) {
        *self.lock() = Some(CacheEntry {
            source_terms,
            resolved_cards,
            fetched_at: Instant::now(),
        });
    }

    pub fn invalidate(&self) {
        if self.lock().take().is_some() {
            debug!("history cache invalidated");
        }
    }

    /// Last resolved cards regardless of age; empty when nothing was cached.
    pub fn fallback(&self) -> Vec<Card> {
        self.lock()
            .as_ref()
            .map(|e| e.resolved_cards.clone())
            .unwrap_or_default()
    }

    pub fn is_populated(&self) -> bool {
        self.lock().is_some()
    }

    /// Fetch the history term list and resolve it into cards, reusing the
    /// cached cards when allowed. `live` is polled before the definition
    /// lookups and before the entry is written.
    #[instrument(skip(self, store, live))]
    pub async fn resolve<S>(
        &self,
        store: &S,
        force_refresh: bool,
        live: &(dyn Fn() -> bool + Sync),
    ) -> Fetched
    where
        S: RemoteStore + ?Sized,
    {
        let terms = match store.history_terms().await {
            Ok(terms) => terms,
            Err(e) => {
                warn!(error = %e, "history unavailable, serving cached cards");
                if !live() {
                    return Fetched::Stale;
                }
                return Fetched::Items(self.fallback());
            }
        };

        if !live() {
            return Fetched::Stale;
        }

        if !force_refresh {
            if let Some(cards) = self.lookup(&terms) {
                debug!(terms = terms.len(), "history cache hit");
                return Fetched::Items(cards);
            }
        }

        debug!(terms = terms.len(), "resolving history definitions");
        let lookups = terms.iter().map(|term| async move {
            match store.definition(term).await {
                Ok(definition) => Card::new(term.clone(), definition),
                Err(e) => {
                    warn!(%term, error = %e, "definition lookup failed");
                    Card::new(term.clone(), NO_DEFINITION)
                }
            }
        });
        let cards = join_all(lookups).await;

        if !live() {
            return Fetched::Stale;
        }
        self.store(terms, cards.clone());
        Fetched::Items(cards)
    }

    fn lock(&self) -> MutexGuard<'_, Option<CacheEntry>> {
        self.entry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
