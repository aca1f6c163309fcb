//! 🧑‍🚀 Characters: the boundary the gallery talks to.
//!
//! 🎬 *[a UI component walks in. it wants page 3 of dead characters named "rick".]*
//! *[it does not want to hear about envelopes, schemas, or HTTP status codes.]*
//! *[it wants `{characters, has_more, next_page, error}`. it gets exactly that.]*
//!
//! 📦 Every function here flattens the pipeline's typed errors into the boundary
//! shape: data plus an optional human-readable message. Failures are values, never
//! panics. The [`PageSource`] trait is the seam the accumulator and the gallery
//! pull pages through, so tests can swap in a fake dimension. 🦆

use async_trait::async_trait;
use reqwest::Url;
use serde::Serialize;
use tracing::{debug, warn};

use crate::models::{Character, Episode, StatusFilter};
use crate::pipeline::{ApiClient, CHARACTER_ENDPOINT, EPISODE_ENDPOINT};
use crate::url_builder::QueryParams;

/// 📺 Detail views only ever show this many episodes.
pub const MAX_DETAIL_EPISODES: usize = 5;

/// 📄 "Give me this page, with these filters."
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageRequest {
    pub page: u32,
    pub name: Option<String>,
    pub status: StatusFilter,
}

impl PageRequest {
    pub fn first(name: Option<String>, status: StatusFilter) -> Self {
        Self {
            page: 1,
            name,
            status,
        }
    }

    fn query(&self) -> QueryParams {
        vec![
            ("page", Some(self.page.to_string())),
            (
                "name",
                self.name.clone().filter(|name| !name.trim().is_empty()),
            ),
            ("status", self.status.as_query().map(str::to_string)),
        ]
    }
}

/// 📦 What a page fetch hands back to the UI.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CharactersPage {
    pub characters: Vec<Character>,
    pub has_more: bool,
    pub next_page: Option<u32>,
    pub error: Option<String>,
}

impl CharactersPage {
    /// 💀 The failure shape: nothing, no more, and a reason.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Default::default()
        }
    }
}

/// 🚰 Anything that can produce pages of characters.
#[async_trait]
pub trait PageSource: Send + Sync + std::fmt::Debug {
    async fn fetch_page(&self, request: PageRequest) -> CharactersPage;
}

#[async_trait]
impl PageSource for ApiClient {
    async fn fetch_page(&self, request: PageRequest) -> CharactersPage {
        fetch_characters_page(self, &request).await
    }
}

/// 📚 Fetch one page of characters and work out whether there's another.
pub async fn fetch_characters_page(api: &ApiClient, request: &PageRequest) -> CharactersPage {
    match api.get(&CHARACTER_ENDPOINT, &request.query()).await {
        Ok(listing) => {
            let next = listing.info.next.as_deref();
            let page = CharactersPage {
                has_more: next.is_some(),
                next_page: extract_next_page(next),
                characters: listing.results,
                error: None,
            };
            debug!(
                page = request.page,
                count = page.characters.len(),
                next_page = ?page.next_page,
                "📄 characters page fetched"
            );
            page
        }
        Err(e) => CharactersPage::failed(e.to_string()),
    }
}

/// 🔢 Pull the `page` number out of the envelope's `info.next` URL.
///
/// `None` in, `None` out. A URL without a numeric `page` param is also `None`.
/// A URL that doesn't parse gets a warning and a `None`. Never panics.
pub fn extract_next_page(next_url: Option<&str>) -> Option<u32> {
    let next_url = next_url?;
    let url = match Url::parse(next_url) {
        Ok(url) => url,
        Err(e) => {
            warn!(next_url, error = %e, "⚠️ could not parse next-page URL");
            return None;
        }
    };
    url.query_pairs()
        .find(|(key, _)| key == "page")
        .and_then(|(_, value)| value.parse().ok())
}

/// 🎯 Single character lookup, boundary-shaped.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CharacterLookup {
    pub character: Option<Character>,
    pub error: Option<String>,
}

pub async fn get_character_by_id(api: &ApiClient, id: i64) -> CharacterLookup {
    match api.get_one(&CHARACTER_ENDPOINT, id).await {
        Ok(character) => CharacterLookup {
            character: Some(character),
            error: None,
        },
        Err(e) => CharacterLookup {
            character: None,
            error: Some(e.to_string()),
        },
    }
}

/// 📺 Episode batch lookup, boundary-shaped.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct EpisodesLookup {
    pub episodes: Vec<Episode>,
    pub error: Option<String>,
}

pub async fn get_episodes_by_ids(api: &ApiClient, ids: &[i64]) -> EpisodesLookup {
    match api.get_many(&EPISODE_ENDPOINT, ids).await {
        Ok(episodes) => EpisodesLookup {
            episodes,
            error: None,
        },
        Err(e) => EpisodesLookup {
            episodes: Vec::new(),
            error: Some(e.to_string()),
        },
    }
}

/// 🔗 The numeric ids at the end of a character's first few episode URLs.
pub fn detail_episode_ids(character: &Character) -> Vec<i64> {
    character
        .episode
        .iter()
        .take(MAX_DETAIL_EPISODES)
        .filter_map(|url| url.trim_end_matches('/').rsplit('/').next()?.parse().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::HttpFetcher;
    use crate::models::fixtures::{character, character_json, envelope};
    use std::sync::Arc;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ApiClient {
        let fetcher = HttpFetcher::new(&Default::default()).expect("💀 test client");
        ApiClient::new(format!("{}/api", server.uri()), Arc::new(fetcher))
    }

    #[test]
    fn the_one_where_next_page_extraction_is_boringly_deterministic() {
        assert_eq!(extract_next_page(None), None);
        assert_eq!(
            extract_next_page(Some("https://x/api/character?page=3")),
            Some(3)
        );
        assert_eq!(
            extract_next_page(Some("https://x/api/character?name=rick&page=12")),
            Some(12)
        );
        assert_eq!(extract_next_page(Some("https://x/api/character")), None);
        assert_eq!(extract_next_page(Some("https://x/api/character?page=abc")), None);
        assert_eq!(extract_next_page(Some("::not a url::")), None);
    }

    #[tokio::test]
    async fn the_one_where_page_one_has_twenty_friends_and_a_page_two() {
        let server = MockServer::start().await;
        let results = (1..=20)
            .map(|id| character_json(id, &format!("Character {id}"), "Alive"))
            .collect();
        Mock::given(method("GET"))
            .and(path("/api/character"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(
                results,
                Some("https://rickandmortyapi.com/api/character?page=2"),
            )))
            .expect(1)
            .mount(&server)
            .await;

        let page = fetch_characters_page(&client_for(&server), &PageRequest::first(None, StatusFilter::All))
            .await;
        assert_eq!(page.error, None);
        assert!(page.has_more);
        assert_eq!(page.next_page, Some(2));
        assert_eq!(page.characters.len(), 20);
    }

    #[tokio::test]
    async fn the_one_where_the_last_page_says_no_more() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("page", "42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(
                vec![character_json(826, "Butter Robot", "Alive")],
                None,
            )))
            .mount(&server)
            .await;

        let request = PageRequest {
            page: 42,
            ..Default::default()
        };
        let page = fetch_characters_page(&client_for(&server), &request).await;
        assert_eq!(page.next_page, None);
        assert!(!page.has_more);
        assert_eq!(page.characters.len(), 1);
    }

    #[tokio::test]
    async fn the_one_where_filters_make_it_onto_the_wire() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("name", "rick"))
            .and(query_param("status", "dead"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(vec![], None)))
            .expect(1)
            .mount(&server)
            .await;

        let page = client_for(&server)
            .fetch_page(PageRequest::first(Some("rick".into()), StatusFilter::Dead))
            .await;
        assert_eq!(page.error, None);
    }

    #[tokio::test]
    async fn the_one_where_failure_means_empty_and_explained() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let page = client_for(&server)
            .fetch_page(PageRequest::first(Some("zzz".into()), StatusFilter::All))
            .await;
        assert_eq!(page, CharactersPage::failed("HTTP error! status: 404"));

        let lookup = get_character_by_id(&client_for(&server), 9999).await;
        assert_eq!(lookup.character, None);
        assert_eq!(lookup.error.as_deref(), Some("HTTP error! status: 404"));
    }

    #[tokio::test]
    async fn the_one_where_detail_views_fetch_five_episodes_at_most() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/episode/1,2,3,4,5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                crate::models::fixtures::episode_json(1, "S01E01"),
                crate::models::fixtures::episode_json(2, "S01E02"),
                crate::models::fixtures::episode_json(3, "S01E03"),
                crate::models::fixtures::episode_json(4, "S01E04"),
                crate::models::fixtures::episode_json(5, "S01E05"),
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let mut rick = character(1, "Rick Sanchez");
        rick.episode = (1..=8)
            .map(|n| format!("https://rickandmortyapi.com/api/episode/{n}"))
            .collect();
        let ids = detail_episode_ids(&rick);
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);

        let lookup = get_episodes_by_ids(&client_for(&server), &ids).await;
        assert_eq!(lookup.error, None);
        assert_eq!(lookup.episodes.len(), 5);
        assert_eq!(lookup.episodes[4].episode, "S01E05");
    }
}
