use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use super::{RemoteError, RemoteResult, RemoteStore};
use crate::config::StoreConfig;
use crate::model::{Card, DeckId};

pub const MAX_URL_LENGTH: usize = 2048;
pub const MAX_ERROR_BODY_LENGTH: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValidatedUrl {
    url: String,
    scheme: String,
    host: String,
}

impl ValidatedUrl {
    pub fn new(url: impl Into<String>) -> Result<Self, RemoteError> {
        let url = url.into();
        let trimmed = url.trim();

        if trimmed.is_empty() {
            return Err(RemoteError::InvalidUrl {
                url: String::new(),
                reason: "URL cannot be empty".to_string(),
            });
        }

        if trimmed.len() > MAX_URL_LENGTH {
            return Err(RemoteError::InvalidUrl {
                url: Self::truncate_url(trimmed),
                reason: format!("URL exceeds maximum length of {MAX_URL_LENGTH} bytes"),
            });
        }

        let parsed = Url::parse(trimmed).map_err(|e| RemoteError::InvalidUrl {
            url: Self::truncate_url(trimmed),
            reason: e.to_string(),
        })?;

        let scheme = parsed.scheme().to_lowercase();
        if scheme != "http" && scheme != "https" {
            return Err(RemoteError::InvalidUrl {
                url: Self::truncate_url(trimmed),
                reason: format!("invalid scheme '{scheme}', only 'http' and 'https' are allowed"),
            });
        }

        let host = parsed
            .host_str()
            .ok_or_else(|| RemoteError::InvalidUrl {
                url: Self::truncate_url(trimmed),
                reason: "URL must have a host".to_string(),
            })?
            .to_lowercase();

        if !parsed.username().is_empty() || parsed.password().is_some() {
            return Err(RemoteError::InvalidUrl {
                url: Self::truncate_url(trimmed),
                reason: "credentials in URL are not allowed".to_string(),
            });
        }

        Ok(Self {
            url: parsed.to_string(),
            scheme,
            host,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.url
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn truncate_url(url: &str) -> String {
        if url.len() <= 100 {
            url.to_string()
        } else {
            let mut end = 100;
            while !url.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}...", &url[..end])
        }
    }
}

// --- Wire types ---

#[derive(Debug, Deserialize)]
struct WireCard {
    word: String,
    #[serde(default)]
    definition: Option<String>,
}

impl From<WireCard> for Card {
    fn from(wire: WireCard) -> Self {
        Card::new(wire.word, wire.definition.unwrap_or_default())
    }
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    found: Option<bool>,
    #[serde(default)]
    definition: Option<String>,
    #[serde(default)]
    meaning: Option<String>,
    #[serde(default)]
    def: Option<String>,
}

impl SearchResponse {
    fn into_definition(self, term: &str) -> RemoteResult<String> {
        if self.found == Some(false) {
            return Err(RemoteError::NotFound(term.to_string()));
        }
        [self.definition, self.meaning, self.def]
            .into_iter()
            .flatten()
            .find(|d| !d.trim().is_empty())
            .ok_or_else(|| RemoteError::NotFound(term.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct FavoriteStatus {
    #[serde(default)]
    found: bool,
}

#[derive(Debug, Serialize)]
struct DefinitionBody<'a> {
    definition: &'a str,
}

fn map_transport(e: &reqwest::Error) -> RemoteError {
    if e.is_timeout() {
        RemoteError::Timeout
    } else if e.is_decode() {
        RemoteError::Decode(e.to_string())
    } else {
        RemoteError::Network(e.to_string())
    }
}

/// JSON-over-HTTP transport for the dictionary server.
pub struct HttpStore {
    client: Client,
    base: Url,
}

impl HttpStore {
    pub fn new(config: &StoreConfig) -> RemoteResult<Self> {
        let validated = ValidatedUrl::new(config.base_url.as_str())?;
        let base = Url::parse(validated.as_str()).map_err(|e| RemoteError::InvalidUrl {
            url: validated.as_str().to_string(),
            reason: e.to_string(),
        })?;
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        Ok(Self { client, base })
    }

    /// Base URL joined with percent-encoded path segments.
    fn endpoint(&self, segments: &[&str]) -> RemoteResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| RemoteError::InvalidUrl {
                url: self.base.to_string(),
                reason: "URL cannot be a base".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> RemoteResult<Response> {
        let response = request.send().await.map_err(|e| map_transport(&e))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .ok()
            .filter(|b| !b.is_empty())
            .map(|mut b| {
                if b.len() > MAX_ERROR_BODY_LENGTH {
                    let mut end = MAX_ERROR_BODY_LENGTH;
                    while !b.is_char_boundary(end) {
                        end -= 1;
                    }
                    b.truncate(end);
                }
                b
            });
        Err(RemoteError::Status {
            code: status.as_u16(),
            body,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> RemoteResult<T> {
        debug!(%url, "GET");
        let response = self.send(self.client.get(url)).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))
    }

    async fn get_cards(&self, segments: &[&str]) -> RemoteResult<Vec<Card>> {
        let cards: Vec<WireCard> = self.get_json(self.endpoint(segments)?).await?;
        Ok(cards.into_iter().map(Card::from).collect())
    }

    async fn post_definition(&self, url: Url, definition: &str) -> RemoteResult<()> {
        debug!(%url, "POST");
        self.send(self.client.post(url).json(&DefinitionBody { definition }))
            .await
            .map(drop)
    }
}

#[async_trait::async_trait]
impl RemoteStore for HttpStore {
    #[instrument(skip(self))]
    async fn history_terms(&self) -> RemoteResult<Vec<String>> {
        self.get_json(self.endpoint(&["history"])?).await
    }

    #[instrument(skip(self))]
    async fn definition(&self, term: &str) -> RemoteResult<String> {
        let mut url = self.endpoint(&["search"])?;
        url.query_pairs_mut().append_pair("word", term);
        let response: SearchResponse = self.get_json(url).await?;
        response.into_definition(term)
    }

    #[instrument(skip(self))]
    async fn favorite_status(&self, term: &str) -> RemoteResult<bool> {
        let status: FavoriteStatus = self.get_json(self.endpoint(&["favorites", term])?).await?;
        Ok(status.found)
    }

    #[instrument(skip(self, definition))]
    async fn add_favorite(&self, term: &str, definition: &str) -> RemoteResult<()> {
        self.post_definition(self.endpoint(&["favorites", term])?, definition)
            .await
    }

    #[instrument(skip(self))]
    async fn remove_favorite(&self, term: &str) -> RemoteResult<()> {
        let url = self.endpoint(&["favorites", term])?;
        debug!(%url, "DELETE");
        self.send(self.client.delete(url)).await.map(drop)
    }

    #[instrument(skip(self))]
    async fn favorites(&self) -> RemoteResult<Vec<Card>> {
        self.get_cards(&["flashcard", "favorites"]).await
    }

    #[instrument(skip(self))]
    async fn not_remembered(&self) -> RemoteResult<Vec<Card>> {
        self.get_cards(&["flashcard", "not-remembered"]).await
    }

    #[instrument(skip(self))]
    async fn pending_terms(&self) -> RemoteResult<Vec<String>> {
        self.get_json(self.endpoint(&["flashcard", "pending"])?).await
    }

    #[instrument(skip(self, definition))]
    async fn add_not_remembered(&self, term: &str, definition: &str) -> RemoteResult<()> {
        self.post_definition(
            self.endpoint(&["flashcard", "not-remembered", term])?,
            definition,
        )
        .await
    }

    #[instrument(skip(self))]
    async fn remove_not_remembered(&self, term: &str) -> RemoteResult<()> {
        let url = self.endpoint(&["flashcard", "not-remembered", term, "remember"])?;
        debug!(%url, "POST");
        self.send(self.client.post(url)).await.map(drop)
    }

    #[instrument(skip(self, deck), fields(deck = %deck))]
    async fn sample_deck(&self, deck: &DeckId) -> RemoteResult<Vec<Card>> {
        self.get_cards(&["flashcard", "sample", deck.as_str()]).await
    }
}
