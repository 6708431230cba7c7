use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::model::CollectionKind;

// --- Typed IDs ---

macro_rules! typed_id {
    ($name:ident) => {
        #[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
        pub struct $name(String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

// Identity of one mount of the review view; a remount gets a fresh id.
typed_id!(ViewId);

// --- User intents coming from the presentation layer ---

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum ReviewCommand {
    SwitchCollection(CollectionKind),
    RefreshHistory,
    Next,
    Previous,
    Flip,
    ToggleFavorite,
    MarkNotRemembered,
    MarkRemembered,
    SyncFavorite,
    /// The view is back in the foreground.
    Resume,
}

impl ReviewCommand {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SwitchCollection(_) => "switch_collection",
            Self::RefreshHistory => "refresh_history",
            Self::Next => "next",
            Self::Previous => "previous",
            Self::Flip => "flip",
            Self::ToggleFavorite => "toggle_favorite",
            Self::MarkNotRemembered => "mark_not_remembered",
            Self::MarkRemembered => "mark_remembered",
            Self::SyncFavorite => "sync_favorite",
            Self::Resume => "resume",
        }
    }
}

// --- Transient notifications ---

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Warning,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn queued() -> Self {
        Self::success("Card added to review stack")
    }

    pub fn already_queued() -> Self {
        Self::warning("Card already in review stack!")
    }
}
