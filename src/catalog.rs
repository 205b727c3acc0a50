use crate::config::Config;
use crate::decode::{
    self, decode_entries, decode_media, decode_person, decode_season, find_director, has_image,
    DecodeError, Paged, RawCredits, RawMedia, RawPerson, RawSeason, TOP_CAST,
};
use crate::models::{Actor, Director, Media, MediaType, Person, Season};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, warn};

pub const TMDB_BASE: &str = "https://api.themoviedb.org/3";

/// Upper bound on season requests fanned out for one series.
pub const MAX_SEASONS: u32 = 100;

/// Read side of the media catalog. Every operation is a single best-effort attempt: failures
/// are logged and surface as an empty list or `None`, never as an error.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn trending(&self, page: u32) -> Vec<Media>;
    async fn media_details(&self, id: &str, media_type: MediaType) -> Option<Media>;
    async fn top_cast(&self, id: &str, media_type: MediaType) -> Vec<Actor>;
    async fn director(&self, id: &str, media_type: MediaType) -> Option<Director>;
    async fn series_seasons(&self, id: &str) -> Vec<Season>;
    async fn search(&self, query: &str, page: u32) -> Vec<Media>;
    async fn search_people(&self, query: &str, page: u32) -> Vec<Person>;
    async fn recommendations(&self, id: &str, media_type: MediaType) -> Vec<Media>;
    async fn popular(&self, media_type: MediaType, page: u32) -> Vec<Media>;
    async fn popular_people(&self, page: u32) -> Vec<Person>;
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("request to {path} failed: {source}")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{path} -> HTTP {status}: {body}")]
    Status {
        path: String,
        status: u16,
        body: String,
    },

    #[error("{path} -> {source}")]
    Decode {
        path: String,
        #[source]
        source: DecodeError,
    },

    #[error("media type '{0}' has no catalog entry")]
    NotATitle(MediaType),
}

#[derive(Debug, Clone)]
pub struct TmdbClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl TmdbClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let user_agent = format!("reelmark/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .user_agent(user_agent)
            .build()
            .context("Failed to build TMDB HTTP client")?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.tmdb_api_key.clone(), config.tmdb_base_url.clone())
    }

    pub async fn try_media_details(
        &self,
        id: &str,
        media_type: MediaType,
    ) -> Result<Media, CatalogError> {
        if !media_type.is_title() {
            return Err(CatalogError::NotATitle(media_type));
        }
        let path = format!("/{media_type}/{}", urlencoding::encode(id));
        let raw: RawMedia = self
            .get_json(&path, &[("append_to_response", "credits".to_string())])
            .await?;
        decode_media(&raw, Some(media_type))
            .map_err(|source| CatalogError::Decode { path, source })
    }

    pub async fn try_season(&self, series_id: &str, season: u32) -> Result<Season, CatalogError> {
        let path = format!("/tv/{}/season/{season}", urlencoding::encode(series_id));
        let raw: RawSeason = self.get_json(&path, &[]).await?;
        decode_season(&raw, season).map_err(|source| CatalogError::Decode { path, source })
    }

    async fn try_credits(
        &self,
        id: &str,
        media_type: MediaType,
    ) -> Result<RawCredits, CatalogError> {
        if !media_type.is_title() {
            return Err(CatalogError::NotATitle(media_type));
        }
        let path = format!("/{media_type}/{}/credits", urlencoding::encode(id));
        self.get_json(&path, &[]).await
    }

    async fn try_page<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<T>, CatalogError> {
        let page: Paged = self.get_json(path, params).await?;
        Ok(decode_entries(page.results))
    }

    fn endpoint(&self, path: &str, params: &[(&str, String)]) -> String {
        let mut url = format!(
            "{}{path}?api_key={}&language=en-US",
            self.base_url,
            urlencoding::encode(&self.api_key)
        );
        for (name, value) in params {
            url.push('&');
            url.push_str(name);
            url.push('=');
            url.push_str(&urlencoding::encode(value));
        }
        url
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, CatalogError> {
        let url = self.endpoint(path, params);
        let transport = |source| CatalogError::Transport {
            path: path.to_string(),
            source,
        };
        let res = self.client.get(&url).send().await.map_err(transport)?;
        let status = res.status();
        let text = res.text().await.map_err(transport)?;
        if !status.is_success() {
            return Err(CatalogError::Status {
                path: path.to_string(),
                status: status.as_u16(),
                body: text,
            });
        }
        decode::parse_json(&text).map_err(|source| CatalogError::Decode {
            path: path.to_string(),
            source,
        })
    }
}

fn page_param(page: u32) -> (&'static str, String) {
    ("page", page.max(1).to_string())
}

fn or_empty<T>(operation: &str, result: Result<Vec<T>, CatalogError>) -> Vec<T> {
    result.unwrap_or_else(|e| {
        warn!("Catalog {} failed: {}", operation, e);
        Vec::new()
    })
}

fn or_none<T>(operation: &str, result: Result<T, CatalogError>) -> Option<T> {
    result
        .map_err(|e| warn!("Catalog {} failed: {}", operation, e))
        .ok()
}

fn decode_titles(raw: &[RawMedia], fallback: Option<MediaType>) -> Vec<Media> {
    raw.iter()
        .filter_map(|r| match decode_media(r, fallback) {
            Ok(m) => Some(m),
            Err(e) => {
                debug!("Dropping catalog entry {:?}: {}", r.id, e);
                None
            }
        })
        .collect()
}

fn with_poster(raw: Vec<RawMedia>) -> Vec<RawMedia> {
    raw.into_iter()
        .filter(|r| has_image(r.poster_path.as_deref()))
        .collect()
}

fn decode_people(raw: &[RawPerson]) -> Vec<Person> {
    raw.iter()
        .filter_map(|r| match decode_person(r) {
            Ok(p) => Some(p),
            Err(e) => {
                debug!("Dropping catalog person {:?}: {}", r.id, e);
                None
            }
        })
        .collect()
}

#[async_trait]
impl CatalogApi for TmdbClient {
    async fn trending(&self, page: u32) -> Vec<Media> {
        let raw = self
            .try_page::<RawMedia>("/trending/all/week", &[page_param(page)])
            .await;
        decode_titles(&or_empty("trending", raw), None)
    }

    async fn media_details(&self, id: &str, media_type: MediaType) -> Option<Media> {
        or_none("details", self.try_media_details(id, media_type).await)
    }

    async fn top_cast(&self, id: &str, media_type: MediaType) -> Vec<Actor> {
        match self.try_credits(id, media_type).await {
            Ok(credits) => decode::top_cast(&credits.cast, TOP_CAST),
            Err(e) => {
                warn!("Catalog cast failed: {}", e);
                Vec::new()
            }
        }
    }

    async fn director(&self, id: &str, media_type: MediaType) -> Option<Director> {
        let credits = or_none("director", self.try_credits(id, media_type).await)?;
        find_director(&credits.crew)
    }

    async fn series_seasons(&self, id: &str) -> Vec<Season> {
        let reported = match self.try_media_details(id, MediaType::Tv).await {
            Ok(series) => series.number_of_seasons.unwrap_or(0),
            Err(e) => {
                warn!("Catalog seasons failed for series {}: {}", id, e);
                return Vec::new();
            }
        };
        let count = reported.min(MAX_SEASONS);
        if count < reported {
            warn!(
                "Series {} reports {} seasons, fetching only the first {}",
                id, reported, count
            );
        }

        let mut joinset = JoinSet::new();
        for number in 1..=count {
            let client = self.clone();
            let series_id = id.to_string();
            joinset.spawn(async move { (number, client.try_season(&series_id, number).await) });
        }

        let mut seasons = Vec::with_capacity(count as usize);
        while let Some(joined) = joinset.join_next().await {
            match joined {
                Ok((_, Ok(season))) => seasons.push(season),
                Ok((number, Err(e))) => {
                    warn!("Skipping season {} of series {}: {}", number, id, e)
                }
                Err(e) => warn!("Season fetch task for series {} failed: {}", id, e),
            }
        }
        seasons.sort_by_key(|s| s.season_number);
        seasons
    }

    async fn search(&self, query: &str, page: u32) -> Vec<Media> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }
        let raw = self
            .try_page::<RawMedia>(
                "/search/multi",
                &[("query", query.to_string()), page_param(page)],
            )
            .await;
        decode_titles(&with_poster(or_empty("search", raw)), None)
    }

    async fn search_people(&self, query: &str, page: u32) -> Vec<Person> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }
        let raw = self
            .try_page::<RawPerson>(
                "/search/person",
                &[("query", query.to_string()), page_param(page)],
            )
            .await;
        let with_profile = or_empty("person search", raw)
            .into_iter()
            .filter(|p| has_image(p.profile_path.as_deref()))
            .collect::<Vec<_>>();
        decode_people(&with_profile)
    }

    async fn recommendations(&self, id: &str, media_type: MediaType) -> Vec<Media> {
        if !media_type.is_title() {
            return Vec::new();
        }
        let path = format!("/{media_type}/{}/recommendations", urlencoding::encode(id));
        let raw = self.try_page::<RawMedia>(&path, &[]).await;
        decode_titles(&with_poster(or_empty("recommendations", raw)), Some(media_type))
            .into_iter()
            .filter(|m| m.media_type == media_type)
            .collect()
    }

    async fn popular(&self, media_type: MediaType, page: u32) -> Vec<Media> {
        if !media_type.is_title() {
            return Vec::new();
        }
        let path = format!("/{media_type}/popular");
        let raw = self.try_page::<RawMedia>(&path, &[page_param(page)]).await;
        decode_titles(&or_empty("popular", raw), Some(media_type))
    }

    async fn popular_people(&self, page: u32) -> Vec<Person> {
        let raw = self
            .try_page::<RawPerson>("/person/popular", &[page_param(page)])
            .await;
        decode_people(&or_empty("popular people", raw))
    }
}
