use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A term/definition pair. Two cards are the same card iff their terms match.
#[derive(Clone, Debug, Eq, Serialize, Deserialize)]
pub struct Card {
    pub term: String,
    pub definition: String,
}

impl Card {
    pub fn new(term: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            definition: definition.into(),
        }
    }
}

impl PartialEq for Card {
    fn eq(&self, other: &Self) -> bool {
        self.term == other.term
    }
}

impl std::hash::Hash for Card {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.term.hash(state);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KindError {
    #[error("deck id cannot be empty")]
    EmptyDeckId,
    #[error("deck id exceeds {max} characters")]
    DeckIdTooLong { max: usize },
    #[error("deck id contains invalid characters (allowed: a-z, 0-9, -, _): {0}")]
    InvalidDeckId(String),
}

/// Validated sample deck identifier, e.g. `animals`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeckId(String);

impl DeckId {
    const MAX_LENGTH: usize = 64;

    pub fn new(id: impl Into<String>) -> Result<Self, KindError> {
        let id = id.into().trim().to_ascii_lowercase();
        if id.is_empty() {
            return Err(KindError::EmptyDeckId);
        }
        if id.len() > Self::MAX_LENGTH {
            return Err(KindError::DeckIdTooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if !id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
        {
            return Err(KindError::InvalidDeckId(id));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Display title: `animals` -> `Animals`, `data-structures` -> `Data Structures`.
    pub fn title(&self) -> String {
        self.0
            .split(['-', '_'])
            .filter(|w| !w.is_empty())
            .map(|w| {
                let mut chars = w.chars();
                match chars.next() {
                    Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl TryFrom<String> for DeckId {
    type Error = KindError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DeckId> for String {
    fn from(id: DeckId) -> Self {
        id.0
    }
}

impl fmt::Display for DeckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CollectionKind {
    #[default]
    History,
    Favorites,
    NotRemembered,
    Sample(DeckId),
}

impl CollectionKind {
    /// Sample decks never change remotely; everything else is refetched on
    /// every switch.
    pub fn is_static(&self) -> bool {
        matches!(self, Self::Sample(_))
    }

    pub fn title(&self) -> String {
        match self {
            Self::History => "Search History".into(),
            Self::Favorites => "Favorites".into(),
            Self::NotRemembered => "Not Remembered".into(),
            Self::Sample(deck) => deck.title(),
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::History => f.write_str("history"),
            Self::Favorites => f.write_str("favorites"),
            Self::NotRemembered => f.write_str("not-remembered"),
            Self::Sample(deck) => write!(f, "sample:{deck}"),
        }
    }
}

impl FromStr for CollectionKind {
    type Err = KindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "history" => Ok(Self::History),
            "favorites" => Ok(Self::Favorites),
            "not-remembered" => Ok(Self::NotRemembered),
            other => {
                let deck = other.strip_prefix("sample:").unwrap_or(other);
                DeckId::new(deck).map(Self::Sample)
            }
        }
    }
}

impl TryFrom<String> for CollectionKind {
    type Error = KindError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CollectionKind> for String {
    fn from(kind: CollectionKind) -> Self {
        kind.to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub name: CollectionKind,
    pub items: Vec<Card>,
}

/// Loaded items per collection kind.
#[derive(Clone, Debug, Default)]
pub struct Collections {
    history: Vec<Card>,
    favorites: Vec<Card>,
    not_remembered: Vec<Card>,
    decks: BTreeMap<DeckId, Vec<Card>>,
}

impl Collections {
    pub fn items(&self, kind: &CollectionKind) -> &[Card] {
        match kind {
            CollectionKind::History => &self.history,
            CollectionKind::Favorites => &self.favorites,
            CollectionKind::NotRemembered => &self.not_remembered,
            CollectionKind::Sample(deck) => self.decks.get(deck).map_or(&[], Vec::as_slice),
        }
    }

    pub fn replace(&mut self, kind: &CollectionKind, items: Vec<Card>) {
        match kind {
            CollectionKind::History => self.history = items,
            CollectionKind::Favorites => self.favorites = items,
            CollectionKind::NotRemembered => self.not_remembered = items,
            CollectionKind::Sample(deck) => {
                self.decks.insert(deck.clone(), items);
            }
        }
    }

    pub fn collection(&self, kind: &CollectionKind) -> Collection {
        Collection {
            name: kind.clone(),
            items: self.items(kind).to_vec(),
        }
    }
}

/// Toggle-affordance state for the card at the current position.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FavoriteMark {
    #[default]
    Unknown,
    Favorite,
    NotFavorite,
}

impl FavoriteMark {
    pub fn from_found(found: bool) -> Self {
        if found {
            Self::Favorite
        } else {
            Self::NotFavorite
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub active_collection: CollectionKind,
    pub index: usize,
    pub is_flipped: bool,
    pub last_rendered_counter_text: Option<String>,
    pub loading: bool,
    pub favorite: FavoriteMark,
}

impl SessionState {
    pub fn new(active_collection: CollectionKind) -> Self {
        Self {
            active_collection,
            ..Self::default()
        }
    }

    /// Reset transient presentation state ahead of loading `kind`.
    pub fn begin_switch(&mut self, kind: CollectionKind) {
        self.active_collection = kind;
        self.index = 0;
        self.is_flipped = false;
        self.last_rendered_counter_text = None;
        self.loading = true;
        self.favorite = FavoriteMark::Unknown;
    }

    /// Pull `index` back inside `0..len` (0 when empty).
    pub fn clamp_index(&mut self, len: usize) {
        self.index = if len == 0 { 0 } else { self.index.min(len - 1) };
    }
}
