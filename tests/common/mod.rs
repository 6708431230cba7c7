#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use review_core::remote::{InMemoryStore, RemoteResult};
use review_core::{
    Card, DeckId, Notice, RemoteError, RemoteStore, RenderSnapshot, ReviewConfig, ReviewSession,
    ReviewView,
};
use tokio::sync::Notify;

/// Holds one remote call until the test opens it.
#[derive(Default)]
pub struct Gate {
    armed: AtomicBool,
    entered: Notify,
    release: Notify,
}

impl Gate {
    async fn pass(&self) {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
    }

    /// Resolves once the held call has reached the store.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    pub fn open(&self) {
        self.release.notify_one();
    }
}

/// Store wrapper that counts calls per operation, fails operations on
/// demand and can hold the next call of an operation at a [`Gate`].
pub struct ScriptedStore {
    inner: InMemoryStore,
    calls: Mutex<HashMap<&'static str, usize>>,
    failing: Mutex<HashSet<&'static str>>,
    gates: Mutex<HashMap<&'static str, Arc<Gate>>>,
}

impl ScriptedStore {
    pub fn new(inner: InMemoryStore) -> Self {
        Self {
            inner,
            calls: Mutex::default(),
            failing: Mutex::default(),
            gates: Mutex::default(),
        }
    }

    pub fn inner(&self) -> &InMemoryStore {
        &self.inner
    }

    pub fn calls(&self, op: &str) -> usize {
        self.calls.lock().unwrap().get(op).copied().unwrap_or(0)
    }

    pub fn fail(&self, op: &'static str) {
        self.failing.lock().unwrap().insert(op);
    }

    pub fn heal(&self, op: &'static str) {
        self.failing.lock().unwrap().remove(op);
    }

    /// Hold the next call of `op`.
    pub fn hold(&self, op: &'static str) -> Arc<Gate> {
        let gate = Arc::new(Gate::default());
        gate.armed.store(true, Ordering::SeqCst);
        self.gates.lock().unwrap().insert(op, gate.clone());
        gate
    }

    async fn enter(&self, op: &'static str) -> RemoteResult<()> {
        *self.calls.lock().unwrap().entry(op).or_default() += 1;
        let gate = self.gates.lock().unwrap().get(op).cloned();
        if let Some(gate) = gate {
            gate.pass().await;
        }
        if self.failing.lock().unwrap().contains(op) {
            return Err(RemoteError::Timeout);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl RemoteStore for ScriptedStore {
    async fn history_terms(&self) -> RemoteResult<Vec<String>> {
        self.enter("history_terms").await?;
        self.inner.history_terms().await
    }

    async fn definition(&self, term: &str) -> RemoteResult<String> {
        self.enter("definition").await?;
        self.inner.definition(term).await
    }

    async fn favorite_status(&self, term: &str) -> RemoteResult<bool> {
        self.enter("favorite_status").await?;
        self.inner.favorite_status(term).await
    }

    async fn add_favorite(&self, term: &str, definition: &str) -> RemoteResult<()> {
        self.enter("add_favorite").await?;
        self.inner.add_favorite(term, definition).await
    }

    async fn remove_favorite(&self, term: &str) -> RemoteResult<()> {
        self.enter("remove_favorite").await?;
        self.inner.remove_favorite(term).await
    }

    async fn favorites(&self) -> RemoteResult<Vec<Card>> {
        self.enter("favorites").await?;
        self.inner.favorites().await
    }

    async fn not_remembered(&self) -> RemoteResult<Vec<Card>> {
        self.enter("not_remembered").await?;
        self.inner.not_remembered().await
    }

    async fn pending_terms(&self) -> RemoteResult<Vec<String>> {
        self.enter("pending_terms").await?;
        self.inner.pending_terms().await
    }

    async fn add_not_remembered(&self, term: &str, definition: &str) -> RemoteResult<()> {
        self.enter("add_not_remembered").await?;
        self.inner.add_not_remembered(term, definition).await
    }

    async fn remove_not_remembered(&self, term: &str) -> RemoteResult<()> {
        self.enter("remove_not_remembered").await?;
        self.inner.remove_not_remembered(term).await
    }

    async fn sample_deck(&self, deck: &DeckId) -> RemoteResult<Vec<Card>> {
        self.enter("sample_deck").await?;
        self.inner.sample_deck(deck).await
    }
}

/// View that records everything painted onto it.
#[derive(Default)]
pub struct RecordingView {
    hidden: AtomicBool,
    frames: Mutex<Vec<RenderSnapshot>>,
    counters: Mutex<Vec<String>>,
    notices: Mutex<Vec<Notice>>,
}

impl RecordingView {
    pub fn hide(&self) {
        self.hidden.store(true, Ordering::SeqCst);
    }

    pub fn reveal(&self) {
        self.hidden.store(false, Ordering::SeqCst);
    }

    pub fn frame_count(&self) -> usize {
        self.frames.lock().unwrap().len()
    }

    pub fn last_frame(&self) -> Option<RenderSnapshot> {
        self.frames.lock().unwrap().last().cloned()
    }

    pub fn counters(&self) -> Vec<String> {
        self.counters.lock().unwrap().clone()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }
}

impl ReviewView for RecordingView {
    fn is_current(&self) -> bool {
        !self.hidden.load(Ordering::SeqCst)
    }

    fn show(&self, snapshot: &RenderSnapshot) {
        self.frames.lock().unwrap().push(snapshot.clone());
    }

    fn set_counter(&self, text: &str) {
        self.counters.lock().unwrap().push(text.to_string());
    }

    fn notify(&self, notice: &Notice) {
        self.notices.lock().unwrap().push(notice.clone());
    }
}

pub fn animals() -> DeckId {
    DeckId::new("animals").unwrap()
}

/// Dictionary of three animals plus the `animals` sample deck.
pub fn store() -> Arc<ScriptedStore> {
    let cards = vec![
        Card::new("cat", "a small feline"),
        Card::new("dog", "a canine"),
        Card::new("emu", "a flightless bird"),
    ];
    let inner = InMemoryStore::new()
        .with_dictionary(cards.iter().map(|c| (c.term.clone(), c.definition.clone())))
        .with_deck(animals(), cards);
    Arc::new(ScriptedStore::new(inner))
}

/// Session over `store` with a recording view already mounted.
pub fn mounted(
    store: &Arc<ScriptedStore>,
) -> (ReviewSession<ScriptedStore>, Arc<RecordingView>, review_core::ViewId) {
    let session = ReviewSession::new(store.clone(), ReviewConfig::default()).unwrap();
    let view = Arc::new(RecordingView::default());
    let id = session.mount(view.clone());
    (session, view, id)
}
