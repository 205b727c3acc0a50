//! Upstream payload shapes and the normalization step into [`crate::models`].
//!
//! Every upstream field is optional here; the decoders decide which gaps get a documented
//! fallback and which make the entry unusable.

use crate::models::{
    Actor, Credits, CrewMember, Director, Episode, Genre, Media, MediaType, Person, Season,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

pub const IMAGE_BASE: &str = "https://image.tmdb.org/t/p/w500";
pub const PLACEHOLDER_IMAGE: &str = "https://via.placeholder.com/500x750?text=No+Image";
pub const UNKNOWN_TITLE: &str = "Unknown Title";
pub const NO_DESCRIPTION: &str = "No description available.";
pub const TOP_CAST: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("entry has no id")]
    MissingId,

    #[error("entry has no media type")]
    MissingMediaType,

    #[error("unsupported media type '{0}'")]
    UnsupportedMediaType(String),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result pages stay untyped until each entry is decoded on its own.
#[derive(Debug, Deserialize)]
pub struct Paged {
    #[serde(default)]
    pub results: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawGenre {
    pub id: Option<i64>,
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawCastMember {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub character: Option<String>,
    pub profile_path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawCrewMember {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub job: Option<String>,
    pub profile_path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawCredits {
    #[serde(default, deserialize_with = "lenient_vec")]
    pub cast: Vec<RawCastMember>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub crew: Vec<RawCrewMember>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawMedia {
    pub id: Option<i64>,
    pub title: Option<String>,
    pub name: Option<String>,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub vote_average: Option<f64>,
    pub media_type: Option<String>,
    pub release_date: Option<String>,
    pub first_air_date: Option<String>,
    pub runtime: Option<u32>,
    pub number_of_seasons: Option<u32>,
    #[serde(default, deserialize_with = "lenient_opt_vec")]
    pub genres: Option<Vec<RawGenre>>,
    pub credits: Option<RawCredits>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawPerson {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub profile_path: Option<String>,
    pub known_for_department: Option<String>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub known_for: Vec<RawMedia>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawEpisode {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub episode_number: Option<u32>,
    pub season_number: Option<u32>,
    pub overview: Option<String>,
    pub air_date: Option<String>,
    pub still_path: Option<String>,
    pub vote_average: Option<f64>,
    pub runtime: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawSeason {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub season_number: Option<u32>,
    pub overview: Option<String>,
    pub air_date: Option<String>,
    pub poster_path: Option<String>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub episodes: Vec<RawEpisode>,
}

pub fn parse_json<T: for<'de> Deserialize<'de>>(text: &str) -> Result<T, DecodeError> {
    Ok(serde_json::from_str(text)?)
}

pub fn decode_entry<T: DeserializeOwned>(value: Value) -> Result<T, DecodeError> {
    Ok(serde_json::from_value(value)?)
}

/// Decodes each element separately; malformed elements are dropped.
pub fn decode_entries<T: DeserializeOwned>(values: Vec<Value>) -> Vec<T> {
    values
        .into_iter()
        .filter_map(|value| match decode_entry(value) {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!("Dropping malformed entry: {}", e);
                None
            }
        })
        .collect()
}

fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let values = Option::<Vec<Value>>::deserialize(deserializer)?;
    Ok(decode_entries(values.unwrap_or_default()))
}

fn lenient_opt_vec<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let values = Option::<Vec<Value>>::deserialize(deserializer)?;
    Ok(values.map(decode_entries))
}

pub fn image_url(path: Option<&str>) -> String {
    match path.filter(|p| !p.is_empty()) {
        Some(p) => format!("{IMAGE_BASE}{p}"),
        None => PLACEHOLDER_IMAGE.to_string(),
    }
}

pub fn has_image(path: Option<&str>) -> bool {
    path.is_some_and(|p| !p.is_empty())
}

pub fn round_rating(vote_average: Option<f64>) -> f64 {
    vote_average
        .filter(|v| v.is_finite())
        .map(|v| (v * 10.0).round() / 10.0)
        .unwrap_or(0.0)
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty()).cloned()
}

pub fn parse_media_type(
    raw: Option<&str>,
    fallback: Option<MediaType>,
) -> Result<MediaType, DecodeError> {
    match raw {
        Some("movie") => Ok(MediaType::Movie),
        Some("tv") => Ok(MediaType::Tv),
        Some("person") => Ok(MediaType::Person),
        Some(other) => Err(DecodeError::UnsupportedMediaType(other.to_string())),
        None => fallback.ok_or(DecodeError::MissingMediaType),
    }
}

pub fn decode_media(raw: &RawMedia, fallback: Option<MediaType>) -> Result<Media, DecodeError> {
    let id = raw.id.ok_or(DecodeError::MissingId)?;
    let media_type = parse_media_type(raw.media_type.as_deref(), fallback)?;
    if !media_type.is_title() {
        return Err(DecodeError::UnsupportedMediaType(media_type.to_string()));
    }

    let title = non_empty(raw.title.as_ref())
        .or_else(|| non_empty(raw.name.as_ref()))
        .unwrap_or_else(|| UNKNOWN_TITLE.to_string());
    let description =
        non_empty(raw.overview.as_ref()).unwrap_or_else(|| NO_DESCRIPTION.to_string());
    let release_date =
        non_empty(raw.release_date.as_ref()).or_else(|| non_empty(raw.first_air_date.as_ref()));

    let genres = raw.genres.as_ref().map(|g| {
        g.iter()
            .filter_map(|x| {
                Some(Genre {
                    id: x.id?,
                    name: x.name.clone()?,
                })
            })
            .collect::<Vec<_>>()
    });
    let cast = raw.credits.as_ref().map(|c| top_cast(&c.cast, TOP_CAST));
    let credits = raw.credits.as_ref().map(|c| Credits {
        crew: c.crew.iter().filter_map(decode_crew_member).collect(),
    });

    Ok(Media {
        id: id.to_string(),
        title,
        description,
        poster_url: image_url(raw.poster_path.as_deref()),
        average_rating: round_rating(raw.vote_average),
        media_type,
        release_date,
        runtime: match media_type {
            MediaType::Movie => raw.runtime,
            _ => None,
        },
        number_of_seasons: match media_type {
            MediaType::Tv => raw.number_of_seasons,
            _ => None,
        },
        genres,
        cast,
        credits,
    })
}

pub fn decode_actor(raw: &RawCastMember) -> Option<Actor> {
    Some(Actor {
        id: raw.id?.to_string(),
        name: raw.name.clone()?,
        character: raw.character.clone().unwrap_or_default(),
        profile_url: image_url(raw.profile_path.as_deref()),
    })
}

pub fn top_cast(cast: &[RawCastMember], max: usize) -> Vec<Actor> {
    cast.iter().filter_map(decode_actor).take(max).collect()
}

fn decode_crew_member(raw: &RawCrewMember) -> Option<CrewMember> {
    Some(CrewMember {
        id: raw.id?.to_string(),
        name: raw.name.clone()?,
        job: raw.job.clone().unwrap_or_default(),
        profile_url: image_url(raw.profile_path.as_deref()),
    })
}

pub fn find_director(crew: &[RawCrewMember]) -> Option<Director> {
    crew.iter()
        .filter(|c| c.job.as_deref() == Some("Director"))
        .find_map(|c| {
            Some(Director {
                id: c.id?.to_string(),
                name: c.name.clone()?,
                profile_url: image_url(c.profile_path.as_deref()),
            })
        })
}

pub fn decode_person(raw: &RawPerson) -> Result<Person, DecodeError> {
    let id = raw.id.ok_or(DecodeError::MissingId)?;
    Ok(Person {
        id: id.to_string(),
        name: non_empty(raw.name.as_ref()).unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
        profile_url: image_url(raw.profile_path.as_deref()),
        known_for_department: raw.known_for_department.clone(),
        known_for: raw
            .known_for
            .iter()
            .filter_map(|m| decode_media(m, None).ok())
            .collect(),
    })
}

fn decode_episode(raw: &RawEpisode, season_number: u32) -> Option<Episode> {
    Some(Episode {
        id: raw.id?.to_string(),
        name: raw.name.clone().unwrap_or_default(),
        episode_number: raw.episode_number?,
        season_number: raw.season_number.unwrap_or(season_number),
        overview: raw.overview.clone().unwrap_or_default(),
        air_date: non_empty(raw.air_date.as_ref()),
        still_url: image_url(raw.still_path.as_deref()),
        average_rating: round_rating(raw.vote_average),
        runtime: raw.runtime,
    })
}

pub fn decode_season(raw: &RawSeason, requested: u32) -> Result<Season, DecodeError> {
    let id = raw.id.ok_or(DecodeError::MissingId)?;
    let season_number = raw.season_number.unwrap_or(requested);
    let episodes = raw
        .episodes
        .iter()
        .filter_map(|e| decode_episode(e, season_number))
        .collect::<Vec<_>>();
    Ok(Season {
        id: id.to_string(),
        name: non_empty(raw.name.as_ref()).unwrap_or_else(|| format!("Season {season_number}")),
        season_number,
        episode_count: raw.episodes.len() as u32,
        air_date: non_empty(raw.air_date.as_ref()),
        poster_url: image_url(raw.poster_path.as_deref()),
        overview: raw.overview.clone().unwrap_or_default(),
        episodes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawMedia {
        serde_json::from_value(value).expect("raw media")
    }

    #[test]
    fn falls_back_for_missing_title_description_and_poster() {
        let media = decode_media(&raw(json!({ "id": 7, "media_type": "movie" })), None)
            .expect("decoded");
        assert_eq!(media.id, "7");
        assert_eq!(media.title, UNKNOWN_TITLE);
        assert_eq!(media.description, NO_DESCRIPTION);
        assert_eq!(media.poster_url, PLACEHOLDER_IMAGE);
        assert_eq!(media.average_rating, 0.0);
        assert_eq!(media.release_date, None);
    }

    #[test]
    fn prefers_movie_fields_then_series_fields() {
        let film = decode_media(
            &raw(json!({
                "id": 550,
                "title": "Fight Club",
                "name": "ignored",
                "release_date": "1999-10-15",
                "first_air_date": "2000-01-01",
                "poster_path": "/fc.jpg",
                "vote_average": 8.438,
                "runtime": 139
            })),
            Some(MediaType::Movie),
        )
        .expect("movie");
        assert_eq!(film.title, "Fight Club");
        assert_eq!(film.release_date.as_deref(), Some("1999-10-15"));
        assert_eq!(film.poster_url, "https://image.tmdb.org/t/p/w500/fc.jpg");
        assert_eq!(film.average_rating, 8.4);
        assert_eq!(film.runtime, Some(139));

        let show = decode_media(
            &raw(json!({
                "id": 1399,
                "name": "Game of Thrones",
                "first_air_date": "2011-04-17",
                "number_of_seasons": 8,
                "media_type": "tv"
            })),
            None,
        )
        .expect("show");
        assert_eq!(show.title, "Game of Thrones");
        assert_eq!(show.release_date.as_deref(), Some("2011-04-17"));
        assert_eq!(show.number_of_seasons, Some(8));
        assert_eq!(show.runtime, None);
    }

    #[test]
    fn rejects_entries_without_id_or_with_foreign_type() {
        assert!(matches!(
            decode_media(&raw(json!({ "title": "x", "media_type": "movie" })), None),
            Err(DecodeError::MissingId)
        ));
        assert!(matches!(
            decode_media(&raw(json!({ "id": 1, "media_type": "person" })), None),
            Err(DecodeError::UnsupportedMediaType(t)) if t == "person"
        ));
        assert!(matches!(
            decode_media(&raw(json!({ "id": 1, "media_type": "collection" })), None),
            Err(DecodeError::UnsupportedMediaType(_))
        ));
        assert!(matches!(
            decode_media(&raw(json!({ "id": 1 })), None),
            Err(DecodeError::MissingMediaType)
        ));
    }

    #[test]
    fn embedded_credits_give_top_ten_cast_and_crew() {
        let cast = (0..15)
            .map(|i| json!({ "id": i, "name": format!("Actor {i}"), "character": "Role" }))
            .collect::<Vec<_>>();
        let media = decode_media(
            &raw(json!({
                "id": 11,
                "title": "Star Wars",
                "genres": [{ "id": 12, "name": "Adventure" }],
                "credits": {
                    "cast": cast,
                    "crew": [{ "id": 1, "name": "George Lucas", "job": "Director" }]
                }
            })),
            Some(MediaType::Movie),
        )
        .expect("decoded");
        let cast = media.cast.expect("cast");
        assert_eq!(cast.len(), TOP_CAST);
        assert_eq!(cast[0].name, "Actor 0");
        assert_eq!(cast[0].profile_url, PLACEHOLDER_IMAGE);
        assert_eq!(media.genres.expect("genres")[0].name, "Adventure");
        assert_eq!(media.credits.expect("credits").crew[0].job, "Director");
    }

    #[test]
    fn malformed_nested_entries_are_dropped_not_the_title() {
        let media = decode_media(
            &raw(json!({
                "id": 550,
                "title": "Fight Club",
                "runtime": 139,
                "genres": [{ "id": "drama", "name": "Drama" }, { "id": 53, "name": "Thriller" }],
                "credits": {
                    "cast": [{ "id": 819, "name": "Edward Norton" }, { "id": 287, "name": 42 }],
                    "crew": [[], { "id": 7467, "name": "David Fincher", "job": "Director" }]
                }
            })),
            Some(MediaType::Movie),
        )
        .expect("decoded");
        assert_eq!(media.genres.expect("genres")[0].name, "Thriller");
        assert_eq!(media.cast.expect("cast").len(), 1);
        assert_eq!(media.credits.expect("credits").crew[0].name, "David Fincher");
    }

    #[test]
    fn director_is_first_crew_member_with_director_job() {
        let crew: Vec<RawCrewMember> = serde_json::from_value(json!([
            { "id": 1, "name": "Writer", "job": "Screenplay" },
            { "id": 2, "name": "David Fincher", "job": "Director", "profile_path": "/df.jpg" },
            { "id": 3, "name": "Second", "job": "Director" }
        ]))
        .expect("crew");
        let director = find_director(&crew).expect("director");
        assert_eq!(director.name, "David Fincher");
        assert_eq!(director.profile_url, "https://image.tmdb.org/t/p/w500/df.jpg");
        assert!(find_director(&crew[..1]).is_none());
    }

    #[test]
    fn season_count_comes_from_payload_not_decoded_episodes() {
        let season: RawSeason = serde_json::from_value(json!({
            "id": 3624,
            "season_number": 1,
            "episodes": [
                { "id": 63056, "name": "Winter Is Coming", "episode_number": 1 },
                { "name": "no id", "episode_number": 2 }
            ]
        }))
        .expect("season");
        let season = decode_season(&season, 1).expect("decoded");
        assert_eq!(season.name, "Season 1");
        assert_eq!(season.episode_count, 2);
        assert_eq!(season.episodes.len(), 1);
        assert_eq!(season.episodes[0].season_number, 1);
    }

    #[test]
    fn malformed_json_is_a_distinct_error() {
        let err = parse_json::<RawMedia>("{not json").unwrap_err();
        assert!(matches!(err, DecodeError::Json(_)));
    }
}
