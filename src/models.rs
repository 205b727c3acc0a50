use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Tv,
    Person,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Tv => "tv",
            MediaType::Person => "person",
        }
    }

    /// Movie and tv are the only types that live in the title catalog.
    pub fn is_title(&self) -> bool {
        matches!(self, MediaType::Movie | MediaType::Tv)
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaType {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "movie" => Ok(MediaType::Movie),
            "tv" => Ok(MediaType::Tv),
            "person" => Ok(MediaType::Person),
            _ => Err(anyhow::anyhow!("media type must be 'movie', 'tv' or 'person'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub id: String,
    pub name: String,
    pub character: String,
    pub profile_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Director {
    pub id: String,
    pub name: String,
    pub profile_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrewMember {
    pub id: String,
    pub name: String,
    pub job: String,
    pub profile_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Credits {
    #[serde(default)]
    pub crew: Vec<CrewMember>,
}

/// Normalized movie or tv title. This is also the exact snapshot shape persisted in the lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    pub id: String,
    pub title: String,
    pub description: String,
    pub poster_url: String,
    pub average_rating: f64,
    pub media_type: MediaType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_seasons: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genres: Option<Vec<Genre>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cast: Option<Vec<Actor>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credits: Option<Credits>,
}

impl Media {
    pub fn key(&self) -> MediaKey {
        MediaKey::new(self.id.clone(), self.media_type)
    }

    /// Whether a snapshot is too thin to be stored as watched without a detail refetch.
    pub fn needs_enrichment(&self) -> bool {
        if self.media_type == MediaType::Person {
            return false;
        }
        let no_genres = self.genres.as_ref().map_or(true, |g| g.is_empty());
        let no_cast = self.cast.as_ref().map_or(true, |c| c.is_empty());
        let no_runtime =
            self.media_type == MediaType::Movie && !self.runtime.is_some_and(|r| r > 0);
        no_genres || no_cast || no_runtime
    }
}

/// List identity: the same numeric id may exist once as a movie and once as a series.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaKey {
    pub id: String,
    pub media_type: MediaType,
}

impl MediaKey {
    pub fn new(id: impl Into<String>, media_type: MediaType) -> Self {
        Self {
            id: id.into(),
            media_type,
        }
    }

    pub fn matches(&self, media: &Media) -> bool {
        media.id == self.id && media.media_type == self.media_type
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Episode {
    pub id: String,
    pub name: String,
    pub episode_number: u32,
    pub season_number: u32,
    pub overview: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub air_date: Option<String>,
    pub still_url: String,
    pub average_rating: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<u32>,
}

/// `episode_count` is what upstream reports and may differ from `episodes.len()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Season {
    pub id: String,
    pub name: String,
    pub season_number: u32,
    pub episode_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub air_date: Option<String>,
    pub poster_url: String,
    pub overview: String,
    pub episodes: Vec<Episode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: String,
    pub name: String,
    pub profile_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub known_for_department: Option<String>,
    #[serde(default)]
    pub known_for: Vec<Media>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListName {
    #[serde(rename = "toWatch")]
    ToWatch,
    #[serde(rename = "watched")]
    Watched,
}

impl ListName {
    pub fn storage_key(&self) -> &'static str {
        match self {
            ListName::ToWatch => "toWatchList",
            ListName::Watched => "watchedList",
        }
    }

    pub fn other(&self) -> ListName {
        match self {
            ListName::ToWatch => ListName::Watched,
            ListName::Watched => ListName::ToWatch,
        }
    }
}

impl fmt::Display for ListName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListName::ToWatch => f.write_str("toWatch"),
            ListName::Watched => f.write_str("watched"),
        }
    }
}

impl FromStr for ListName {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "toWatch" | "to-watch" | "towatch" => Ok(ListName::ToWatch),
            "watched" => Ok(ListName::Watched),
            _ => Err(anyhow::anyhow!("list must be 'toWatch' or 'watched'")),
        }
    }
}
