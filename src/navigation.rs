//! Circular stepping and face flipping over the active collection.
//!
//! All three operations are synchronous. They return whether anything
//! changed so the caller knows to repaint; on an empty collection they
//! return `false` and leave the state alone.

use crate::model::{FavoriteMark, SessionState};

pub fn next(state: &mut SessionState, len: usize) -> bool {
    if len == 0 {
        return false;
    }
    state.index = (state.index + 1) % len;
    moved(state);
    true
}

pub fn previous(state: &mut SessionState, len: usize) -> bool {
    if len == 0 {
        return false;
    }
    state.index = (state.index.min(len - 1) + len - 1) % len;
    moved(state);
    true
}

pub fn flip(state: &mut SessionState, len: usize) -> bool {
    if len == 0 {
        return false;
    }
    state.is_flipped = !state.is_flipped;
    true
}

fn moved(state: &mut SessionState) {
    state.is_flipped = false;
    state.favorite = FavoriteMark::Unknown;
}
