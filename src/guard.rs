//! Liveness guard for asynchronous continuations.
//!
//! Every operation captures a [`Ticket`] before it suspends and presents it
//! again before touching session state or painting. A ticket stays live only
//! while the same view is mounted, that view still reports itself current,
//! and no newer collection load has superseded it.
//!
//! A view that drops out of the foreground keeps its mount. The first failed
//! poll kills every outstanding ticket; once the view reports itself current
//! again it is issued fresh ones.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::event::ViewId;
use crate::render::ReviewView;

/// Captured identity of the session an operation started in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ticket {
    view: ViewId,
    epoch: u64,
}

struct MountedView {
    id: ViewId,
    view: Arc<dyn ReviewView>,
}

#[derive(Default)]
pub struct LivenessGuard {
    mounted: Option<MountedView>,
    epoch: u64,
    backgrounded: bool,
}

impl fmt::Debug for LivenessGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LivenessGuard")
            .field("mounted", &self.mounted.as_ref().map(|m| &m.id))
            .field("epoch", &self.epoch)
            .field("backgrounded", &self.backgrounded)
            .finish()
    }
}

impl LivenessGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount `view`, replacing whatever was mounted. Outstanding tickets die.
    pub fn mount(&mut self, view: Arc<dyn ReviewView>) -> ViewId {
        let id = ViewId::generate();
        self.epoch += 1;
        self.backgrounded = false;
        self.mounted = Some(MountedView {
            id: id.clone(),
            view,
        });
        id
    }

    /// Tear down `id`. A stale id (already replaced by a remount) is ignored.
    pub fn unmount(&mut self, id: &ViewId) -> bool {
        match &self.mounted {
            Some(m) if m.id == *id => {
                self.mounted = None;
                self.epoch += 1;
                self.backgrounded = false;
                true
            }
            _ => false,
        }
    }

    pub fn mounted_id(&self) -> Option<&ViewId> {
        self.mounted.as_ref().map(|m| &m.id)
    }

    /// Ticket for an operation that must not outlive the current view.
    pub fn issue(&mut self) -> Option<Ticket> {
        let id = self.current()?.id.clone();
        Some(Ticket {
            view: id,
            epoch: self.epoch,
        })
    }

    /// Ticket that also invalidates every ticket issued before it.
    pub fn supersede(&mut self) -> Option<Ticket> {
        self.current()?;
        self.epoch += 1;
        self.issue()
    }

    /// The mounted view if `ticket` is still live.
    pub fn check(&mut self, ticket: &Ticket) -> Option<Arc<dyn ReviewView>> {
        if ticket.epoch != self.epoch {
            debug!(
                ticket = ticket.epoch,
                current = self.epoch,
                "superseded continuation dropped"
            );
            return None;
        }
        let mounted = self.current()?;
        if mounted.id != ticket.view {
            return None;
        }
        Some(Arc::clone(&mounted.view))
    }

    pub fn is_live(&mut self, ticket: &Ticket) -> bool {
        self.check(ticket).is_some()
    }

    // Polled afresh on every call. Only the transition into the background
    // bumps the epoch, so late continuations fail on the epoch compare.
    fn current(&mut self) -> Option<&MountedView> {
        let mounted = self.mounted.as_ref()?;
        if mounted.view.is_current() {
            if self.backgrounded {
                self.backgrounded = false;
                debug!(view = %mounted.id, "view back in the foreground");
            }
            return Some(mounted);
        }
        if !self.backgrounded {
            self.backgrounded = true;
            self.epoch += 1;
            debug!(view = %mounted.id, "view left the foreground, tickets revoked");
        }
        None
    }
}
