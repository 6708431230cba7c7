//! What the core computes for display, and the surface it paints onto.
//!
//! [`compute_render_snapshot`] is pure; the session only hands its output to
//! the mounted [`ReviewView`] after the liveness check passes.

use serde::{Deserialize, Serialize};

use crate::event::Notice;
use crate::model::{Card, CollectionKind, FavoriteMark, SessionState};
use crate::{EMPTY_COUNTER, EMPTY_SET_TEXT, LOADING_COUNTER, LOADING_TEXT};

/// Presentation surface for one mount of the review screen.
///
/// Calls arrive with no session lock held, except [`ReviewView::is_current`],
/// which must not call back into the session.
pub trait ReviewView: Send + Sync {
    /// Whether this view is still the foreground view the user is looking at.
    /// Polled at every check, so it may turn true again after going false.
    fn is_current(&self) -> bool {
        true
    }

    fn show(&self, snapshot: &RenderSnapshot);

    /// Only called when the position text changed since the last write.
    fn set_counter(&self, text: &str);

    fn notify(&self, notice: &Notice);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Face {
    Term,
    Definition,
}

impl Face {
    pub fn label(self) -> &'static str {
        match self {
            Face::Term => "term",
            Face::Definition => "definition",
        }
    }
}

/// Buttons the presentation layer should offer for the current frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actions {
    pub favorite: bool,
    pub mark_remembered: bool,
    pub mark_not_remembered: bool,
}

impl Actions {
    pub const NONE: Actions = Actions {
        favorite: false,
        mark_remembered: false,
        mark_not_remembered: false,
    };

    pub fn for_collection(kind: &CollectionKind) -> Self {
        let reviewing = *kind == CollectionKind::NotRemembered;
        Self {
            favorite: true,
            mark_remembered: reviewing,
            mark_not_remembered: !reviewing,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderSnapshot {
    pub collection: CollectionKind,
    pub title: String,
    pub text: String,
    pub face: Face,
    pub position: String,
    pub favorite: FavoriteMark,
    pub actions: Actions,
    pub loading: bool,
    pub empty: bool,
}

impl RenderSnapshot {
    pub fn label(&self) -> &'static str {
        self.face.label()
    }

    fn placeholder(kind: &CollectionKind, text: &str, position: &str) -> Self {
        Self {
            collection: kind.clone(),
            title: kind.title(),
            text: text.to_string(),
            face: Face::Term,
            position: position.to_string(),
            favorite: FavoriteMark::Unknown,
            actions: Actions::NONE,
            loading: false,
            empty: false,
        }
    }
}

/// Frame for `state` over the items of its active collection.
pub fn compute_render_snapshot(state: &SessionState, items: &[Card]) -> RenderSnapshot {
    let kind = &state.active_collection;
    if state.loading {
        return RenderSnapshot {
            loading: true,
            ..RenderSnapshot::placeholder(kind, LOADING_TEXT, LOADING_COUNTER)
        };
    }

    let index = state.index.min(items.len().saturating_sub(1));
    let Some(card) = items.get(index) else {
        return RenderSnapshot {
            empty: true,
            ..RenderSnapshot::placeholder(kind, EMPTY_SET_TEXT, EMPTY_COUNTER)
        };
    };

    let (face, text) = if state.is_flipped {
        (Face::Definition, card.definition.clone())
    } else {
        (Face::Term, card.term.clone())
    };

    RenderSnapshot {
        collection: kind.clone(),
        title: kind.title(),
        text,
        face,
        position: format!("{} / {}", index + 1, items.len()),
        favorite: state.favorite,
        actions: Actions::for_collection(kind),
        loading: false,
        empty: false,
    }
}
