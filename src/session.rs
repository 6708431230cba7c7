//! The review session controller.
//!
//! Owns session state, the loaded collections and the liveness guard behind a
//! single mutex that is never held across a remote call. Every async
//! operation captures a [`Ticket`] up front and re-presents it before it
//! touches state or paints, so a result that arrives after the user moved on
//! is dropped without effect.
//!
//! Favorite toggle and enqueue are check-then-act against the remote store
//! with no conditional write in between. A concurrent external change can
//! leave the favorite mark wrong until the next status check.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::config::{collection_title, ReviewConfig};
use crate::event::{Notice, ReviewCommand, ViewId};
use crate::fetch::{CollectionFetcher, Fetched};
use crate::guard::{LivenessGuard, Ticket};
use crate::model::{
    Card, Collection, CollectionKind, Collections, DeckId, FavoriteMark, SessionState,
};
use crate::navigation;
use crate::remote::{RemoteError, RemoteStore};
use crate::render::{compute_render_snapshot, RenderSnapshot, ReviewView};
use crate::{MutationAction, ReviewError, ReviewResult};

/// What became of a state-changing request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Commit {
    Applied,
    /// Nothing to do (already showing a loaded static deck, no card, ...).
    Skipped,
    /// The session went stale while the request was in flight.
    Discarded,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FavoriteOutcome {
    Added,
    Removed,
    NoCard,
    Discarded,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnqueueOutcome {
    Queued,
    AlreadyQueued,
    NoCard,
    Discarded,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DequeueOutcome {
    Removed,
    NoCard,
    Discarded,
}

#[derive(Debug, Default)]
struct Inner {
    state: SessionState,
    collections: Collections,
    guard: LivenessGuard,
    deck_titles: BTreeMap<DeckId, String>,
}

/// A snapshot ready to be painted outside the lock.
struct Frame {
    view: Arc<dyn ReviewView>,
    snapshot: RenderSnapshot,
    counter: Option<String>,
}

impl Frame {
    fn paint(self) {
        self.view.show(&self.snapshot);
        if let Some(counter) = self.counter {
            self.view.set_counter(&counter);
        }
    }
}

fn paint(frame: Option<Frame>) {
    if let Some(frame) = frame {
        frame.paint();
    }
}

enum Start {
    Ready(Ticket, Card),
    NoCard,
    Stale,
}

fn same_term(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

impl Inner {
    fn items(&self) -> &[Card] {
        self.collections.items(&self.state.active_collection)
    }

    /// Card at the current position, unless a load is still pending.
    fn current_card(&self) -> Option<Card> {
        if self.state.loading {
            return None;
        }
        self.items().get(self.state.index).cloned()
    }

    fn snapshot(&self) -> RenderSnapshot {
        let mut snapshot = compute_render_snapshot(&self.state, self.items());
        snapshot.title = collection_title(&self.deck_titles, &self.state.active_collection);
        snapshot
    }

    /// Frame for a live `ticket`; records the counter text it will write.
    fn frame(&mut self, ticket: &Ticket) -> Option<Frame> {
        let view = self.guard.check(ticket)?;
        let snapshot = self.snapshot();
        let counter = (self.state.last_rendered_counter_text.as_deref()
            != Some(snapshot.position.as_str()))
        .then(|| snapshot.position.clone());
        if let Some(text) = &counter {
            self.state.last_rendered_counter_text = Some(text.clone());
        }
        Some(Frame {
            view,
            snapshot,
            counter,
        })
    }

    fn start_action(&mut self) -> Start {
        let Some(ticket) = self.guard.issue() else {
            return Start::Stale;
        };
        match self.current_card() {
            Some(card) => Start::Ready(ticket, card),
            None => Start::NoCard,
        }
    }
}

pub struct ReviewSession<S: RemoteStore + ?Sized> {
    store: Arc<S>,
    config: ReviewConfig,
    fetcher: CollectionFetcher,
    inner: Mutex<Inner>,
}

impl<S: RemoteStore + ?Sized> ReviewSession<S> {
    pub fn new(store: Arc<S>, config: ReviewConfig) -> ReviewResult<Self> {
        config.validate()?;
        let inner = Inner {
            state: SessionState::new(config.initial_collection.clone()),
            deck_titles: config.deck_titles.clone(),
            ..Inner::default()
        };
        Ok(Self {
            store,
            fetcher: CollectionFetcher::new(config.history_ttl()),
            config,
            inner: Mutex::new(inner),
        })
    }

    pub fn config(&self) -> &ReviewConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_live(&self, ticket: &Ticket) -> bool {
        self.lock().guard.is_live(ticket)
    }

    // --- View lifecycle ---

    /// Attach a view. Anything still in flight for a previous view is dropped
    /// when it resolves.
    pub fn mount(&self, view: Arc<dyn ReviewView>) -> ViewId {
        let mut inner = self.lock();
        let id = inner.guard.mount(view);
        inner.state.last_rendered_counter_text = None;
        info!(view = %id, "review view mounted");
        id
    }

    /// Bring a view that came back to the foreground up to date. A load that
    /// was dropped while it was away is started again.
    #[instrument(skip(self))]
    pub async fn resume(&self) -> Commit {
        let resumed = {
            let mut inner = self.lock();
            let Some(ticket) = inner.guard.issue() else {
                return Commit::Discarded;
            };
            if inner.state.loading {
                None
            } else {
                inner.state.last_rendered_counter_text = None;
                let frame = inner.frame(&ticket);
                Some((ticket, frame))
            }
        };
        let Some((ticket, frame)) = resumed else {
            debug!("load was dropped in the background, reloading");
            return self.reload().await;
        };
        paint(frame);
        match self.sync_with(&ticket).await {
            Commit::Discarded => Commit::Discarded,
            Commit::Applied | Commit::Skipped => Commit::Applied,
        }
    }

    pub fn unmount(&self, id: &ViewId) -> bool {
        let removed = self.lock().guard.unmount(id);
        if removed {
            info!(view = %id, "review view unmounted");
        }
        removed
    }

    // --- Read side ---

    pub fn snapshot(&self) -> RenderSnapshot {
        self.lock().snapshot()
    }

    pub fn state(&self) -> SessionState {
        self.lock().state.clone()
    }

    pub fn collection(&self) -> Collection {
        let inner = self.lock();
        inner.collections.collection(&inner.state.active_collection)
    }

    /// The dynamic collections followed by the configured sample decks.
    pub fn available_collections(&self) -> Vec<CollectionKind> {
        [
            CollectionKind::History,
            CollectionKind::Favorites,
            CollectionKind::NotRemembered,
        ]
        .into_iter()
        .chain(self.config.sample_decks.iter().cloned().map(CollectionKind::Sample))
        .collect()
    }

    // --- Collection switching ---

    #[instrument(skip(self, kind), fields(collection = %kind))]
    pub async fn switch_collection(&self, kind: CollectionKind) -> Commit {
        {
            let inner = self.lock();
            if inner.state.active_collection == kind
                && kind.is_static()
                && !inner.state.loading
                && !inner.collections.items(&kind).is_empty()
            {
                debug!("static deck already showing");
                return Commit::Skipped;
            }
        }
        self.load(kind, false).await
    }

    /// Re-fetch whatever collection is active, e.g. right after mounting.
    pub async fn reload(&self) -> Commit {
        let kind = self.lock().state.active_collection.clone();
        self.load(kind, false).await
    }

    /// Drop the history cache; when history is showing, rebuild it from
    /// scratch.
    #[instrument(skip(self))]
    pub async fn refresh_history(&self) -> Commit {
        self.fetcher.history_cache().invalidate();
        let showing_history = self.lock().state.active_collection == CollectionKind::History;
        if !showing_history {
            return Commit::Skipped;
        }
        self.load(CollectionKind::History, true).await
    }

    async fn load(&self, kind: CollectionKind, force_refresh: bool) -> Commit {
        let (ticket, frame) = {
            let mut inner = self.lock();
            let Some(ticket) = inner.guard.supersede() else {
                debug!("no view mounted, switch ignored");
                return Commit::Discarded;
            };
            inner.state.begin_switch(kind.clone());
            let frame = inner.frame(&ticket);
            (ticket, frame)
        };
        paint(frame);

        let fetched = self
            .fetcher
            .fetch(self.store.as_ref(), &kind, force_refresh, &|| {
                self.is_live(&ticket)
            })
            .await;
        let Fetched::Items(items) = fetched else {
            debug!(collection = %kind, "stale fetch discarded");
            return Commit::Discarded;
        };

        let frame = {
            let mut inner = self.lock();
            if !inner.guard.is_live(&ticket) {
                debug!(collection = %kind, "stale fetch discarded");
                return Commit::Discarded;
            }
            let len = items.len();
            inner.collections.replace(&kind, items);
            inner.state.loading = false;
            inner.state.clamp_index(len);
            info!(collection = %kind, cards = len, "collection loaded");
            inner.frame(&ticket)
        };
        paint(frame);

        self.sync_with(&ticket).await;
        Commit::Applied
    }

    /// Re-fetch `kind` in place after a mutation, keeping the position where
    /// possible.
    async fn refetch(&self, ticket: &Ticket, kind: &CollectionKind, show_term: bool) -> Commit {
        let fetched = self
            .fetcher
            .fetch(self.store.as_ref(), kind, false, &|| self.is_live(ticket))
            .await;
        let Fetched::Items(items) = fetched else {
            return Commit::Discarded;
        };

        let frame = {
            let mut inner = self.lock();
            if !inner.guard.is_live(ticket) || inner.state.active_collection != *kind {
                debug!(collection = %kind, "stale refetch discarded");
                return Commit::Discarded;
            }
            let len = items.len();
            inner.collections.replace(kind, items);
            inner.state.clamp_index(len);
            inner.state.favorite = FavoriteMark::Unknown;
            if show_term {
                inner.state.is_flipped = false;
            }
            inner.frame(ticket)
        };
        paint(frame);

        self.sync_with(ticket).await;
        Commit::Applied
    }

    // --- Navigation ---

    pub fn next(&self) -> bool {
        self.step(navigation::next)
    }

    pub fn previous(&self) -> bool {
        self.step(navigation::previous)
    }

    pub fn flip(&self) -> bool {
        self.step(navigation::flip)
    }

    fn step(&self, op: fn(&mut SessionState, usize) -> bool) -> bool {
        let frame = {
            let mut inner = self.lock();
            let len = if inner.state.loading {
                0
            } else {
                inner.items().len()
            };
            if !op(&mut inner.state, len) {
                return false;
            }
            match inner.guard.issue() {
                Some(ticket) => inner.frame(&ticket),
                None => None,
            }
        };
        paint(frame);
        true
    }

    // --- Mutation reconciler ---

    /// Refresh the favorite mark of the card at the current position.
    pub async fn sync_favorite(&self) -> Commit {
        let Some(ticket) = self.lock().guard.issue() else {
            return Commit::Discarded;
        };
        self.sync_with(&ticket).await
    }

    async fn sync_with(&self, ticket: &Ticket) -> Commit {
        let card = {
            let mut inner = self.lock();
            if !inner.guard.is_live(ticket) {
                return Commit::Discarded;
            }
            match inner.current_card() {
                Some(card) => card,
                None => return Commit::Skipped,
            }
        };

        let mark = match self.store.favorite_status(&card.term).await {
            Ok(found) => FavoriteMark::from_found(found),
            Err(e) => {
                warn!(
                    term = %card.term,
                    error = %e,
                    "favorite status unavailable, assuming not favorite"
                );
                FavoriteMark::NotFavorite
            }
        };

        let frame = {
            let mut inner = self.lock();
            if !inner.guard.is_live(ticket) {
                return Commit::Discarded;
            }
            if inner.current_card().as_ref() != Some(&card) {
                return Commit::Skipped;
            }
            inner.state.favorite = mark;
            inner.frame(ticket)
        };
        paint(frame);
        Commit::Applied
    }

    #[instrument(skip(self))]
    pub async fn toggle_favorite(&self) -> ReviewResult<FavoriteOutcome> {
        let (ticket, card) = match self.lock().start_action() {
            Start::Ready(ticket, card) => (ticket, card),
            Start::NoCard => return Ok(FavoriteOutcome::NoCard),
            Start::Stale => return Ok(FavoriteOutcome::Discarded),
        };

        let favorited = match self.store.favorite_status(&card.term).await {
            Ok(found) => found,
            Err(e) => {
                warn!(
                    term = %card.term,
                    error = %e,
                    "favorite status check failed, toggle aborted"
                );
                return Err(e.into());
            }
        };
        if !self.is_live(&ticket) {
            return Ok(FavoriteOutcome::Discarded);
        }

        let (result, action, outcome) = if favorited {
            (
                self.store.remove_favorite(&card.term).await,
                MutationAction::RemoveFavorite,
                FavoriteOutcome::Removed,
            )
        } else {
            (
                self.store.add_favorite(&card.term, &card.definition).await,
                MutationAction::AddFavorite,
                FavoriteOutcome::Added,
            )
        };
        if let Err(e) = result {
            return Err(self.mutation_failed(&ticket, action, e));
        }
        info!(term = %card.term, %action, "favorite toggled");

        let frame = {
            let mut inner = self.lock();
            if !inner.guard.is_live(&ticket) {
                return Ok(FavoriteOutcome::Discarded);
            }
            if inner.state.active_collection == CollectionKind::Favorites && favorited {
                None
            } else {
                if inner.current_card().as_ref() == Some(&card) {
                    inner.state.favorite = FavoriteMark::from_found(!favorited);
                }
                Some(inner.frame(&ticket))
            }
        };
        match frame {
            Some(frame) => paint(frame),
            None => {
                if self.refetch(&ticket, &CollectionKind::Favorites, false).await
                    == Commit::Discarded
                {
                    return Ok(FavoriteOutcome::Discarded);
                }
            }
        }
        Ok(outcome)
    }

    #[instrument(skip(self))]
    pub async fn mark_not_remembered(&self) -> ReviewResult<EnqueueOutcome> {
        let (ticket, card) = match self.lock().start_action() {
            Start::Ready(ticket, card) => (ticket, card),
            Start::NoCard => return Ok(EnqueueOutcome::NoCard),
            Start::Stale => return Ok(EnqueueOutcome::Discarded),
        };

        // Classification only: the add below is idempotent either way.
        let already_queued = match self.store.pending_terms().await {
            Ok(terms) => terms.iter().any(|t| same_term(t, &card.term)),
            Err(e) => {
                warn!(
                    term = %card.term,
                    error = %e,
                    "review queue check failed, enqueueing anyway"
                );
                false
            }
        };
        if !self.is_live(&ticket) {
            return Ok(EnqueueOutcome::Discarded);
        }

        if let Err(e) = self
            .store
            .add_not_remembered(&card.term, &card.definition)
            .await
        {
            return Err(self.mutation_failed(&ticket, MutationAction::Enqueue, e));
        }

        let (view, reviewing) = {
            let mut inner = self.lock();
            match inner.guard.check(&ticket) {
                Some(view) => (
                    view,
                    inner.state.active_collection == CollectionKind::NotRemembered,
                ),
                None => return Ok(EnqueueOutcome::Discarded),
            }
        };
        let (notice, outcome) = if already_queued {
            (Notice::already_queued(), EnqueueOutcome::AlreadyQueued)
        } else {
            (Notice::queued(), EnqueueOutcome::Queued)
        };
        info!(term = %card.term, ?outcome, "card enqueued for review");
        view.notify(&notice);

        if reviewing {
            self.refetch(&ticket, &CollectionKind::NotRemembered, true)
                .await;
        } else if self.next() {
            self.sync_favorite().await;
        }
        Ok(outcome)
    }

    #[instrument(skip(self))]
    pub async fn mark_remembered(&self) -> ReviewResult<DequeueOutcome> {
        let (ticket, card) = match self.lock().start_action() {
            Start::Ready(ticket, card) => (ticket, card),
            Start::NoCard => return Ok(DequeueOutcome::NoCard),
            Start::Stale => return Ok(DequeueOutcome::Discarded),
        };

        if let Err(e) = self.store.remove_not_remembered(&card.term).await {
            return Err(self.mutation_failed(&ticket, MutationAction::Dequeue, e));
        }

        let frame = {
            let mut inner = self.lock();
            if !inner.guard.is_live(&ticket) {
                return Ok(DequeueOutcome::Discarded);
            }
            info!(term = %card.term, "card marked remembered");
            if inner.state.active_collection == CollectionKind::NotRemembered {
                None
            } else {
                inner.state.is_flipped = false;
                Some(inner.frame(&ticket))
            }
        };
        match frame {
            Some(frame) => paint(frame),
            None => {
                if self
                    .refetch(&ticket, &CollectionKind::NotRemembered, true)
                    .await
                    == Commit::Discarded
                {
                    return Ok(DequeueOutcome::Discarded);
                }
            }
        }
        Ok(DequeueOutcome::Removed)
    }

    fn mutation_failed(
        &self,
        ticket: &Ticket,
        action: MutationAction,
        source: RemoteError,
    ) -> ReviewError {
        let err = ReviewError::mutation(action, source);
        warn!(%action, error = %err, "remote mutation failed");
        let view = self.lock().guard.check(ticket);
        if let Some(view) = view {
            view.notify(&Notice::warning(err.user_facing_message()));
        }
        err
    }

    // --- Command entry point ---

    #[instrument(skip(self, command), fields(command = command.name()))]
    pub async fn dispatch(&self, command: ReviewCommand) -> ReviewResult<()> {
        debug!("dispatching");
        match command {
            ReviewCommand::SwitchCollection(kind) => {
                self.switch_collection(kind).await;
            }
            ReviewCommand::RefreshHistory => {
                self.refresh_history().await;
            }
            ReviewCommand::Next => {
                if self.next() {
                    self.sync_favorite().await;
                }
            }
            ReviewCommand::Previous => {
                if self.previous() {
                    self.sync_favorite().await;
                }
            }
            ReviewCommand::Flip => {
                self.flip();
            }
            ReviewCommand::ToggleFavorite => {
                self.toggle_favorite().await?;
            }
            ReviewCommand::MarkNotRemembered => {
                self.mark_not_remembered().await?;
            }
            ReviewCommand::MarkRemembered => {
                self.mark_remembered().await?;
            }
            ReviewCommand::SyncFavorite => {
                self.sync_favorite().await;
            }
            ReviewCommand::Resume => {
                self.resume().await;
            }
        }
        Ok(())
    }
}
