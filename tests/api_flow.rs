use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use reelmark::app::{build_router, AppState};
use reelmark::assistant::AssistantApi;
use reelmark::catalog::CatalogApi;
use reelmark::models::{Actor, Director, Genre, Media, MediaType, Person, Season};
use reelmark::storage::{MemoryStorage, Storage};
use reelmark::transfer::USERNAME_KEY;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tower::util::ServiceExt;

struct FakeCatalog {
    details: HashMap<(String, MediaType), Media>,
    detail_requests: Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl CatalogApi for FakeCatalog {
    async fn trending(&self, _page: u32) -> Vec<Media> {
        self.details.values().cloned().collect()
    }
    async fn media_details(&self, id: &str, media_type: MediaType) -> Option<Media> {
        self.detail_requests.lock().unwrap().push(id.to_string());
        self.details.get(&(id.to_string(), media_type)).cloned()
    }
    async fn top_cast(&self, id: &str, media_type: MediaType) -> Vec<Actor> {
        self.details
            .get(&(id.to_string(), media_type))
            .and_then(|m| m.cast.clone())
            .unwrap_or_default()
    }
    async fn director(&self, id: &str, _media_type: MediaType) -> Option<Director> {
        (id == "550").then(|| Director {
            id: "7467".to_string(),
            name: "David Fincher".to_string(),
            profile_url: "https://image.tmdb.org/t/p/w500/fincher.jpg".to_string(),
        })
    }
    async fn series_seasons(&self, _id: &str) -> Vec<Season> {
        Vec::new()
    }
    async fn search(&self, query: &str, _page: u32) -> Vec<Media> {
        self.details
            .values()
            .filter(|m| m.title.to_lowercase().contains(&query.to_lowercase()))
            .cloned()
            .collect()
    }
    async fn search_people(&self, _query: &str, _page: u32) -> Vec<Person> {
        Vec::new()
    }
    async fn recommendations(&self, _id: &str, _media_type: MediaType) -> Vec<Media> {
        Vec::new()
    }
    async fn popular(&self, media_type: MediaType, _page: u32) -> Vec<Media> {
        self.details
            .values()
            .filter(|m| m.media_type == media_type)
            .cloned()
            .collect()
    }
    async fn popular_people(&self, _page: u32) -> Vec<Person> {
        Vec::new()
    }
}

struct FakeAssistant;

#[async_trait::async_trait]
impl AssistantApi for FakeAssistant {
    async fn ask(&self, message: &str) -> Option<String> {
        Some(format!("Because you liked {message}, try Heat."))
    }
}

fn fight_club_full() -> Media {
    Media {
        id: "550".to_string(),
        title: "Fight Club".to_string(),
        description: "A ticking-time-bomb insomniac...".to_string(),
        poster_url: "https://image.tmdb.org/t/p/w500/fc.jpg".to_string(),
        average_rating: 8.4,
        media_type: MediaType::Movie,
        release_date: Some("1999-10-15".to_string()),
        runtime: Some(139),
        number_of_seasons: None,
        genres: Some(vec![Genre {
            id: 18,
            name: "Drama".to_string(),
        }]),
        cast: Some(vec![Actor {
            id: "819".to_string(),
            name: "Edward Norton".to_string(),
            character: "Narrator".to_string(),
            profile_url: "https://image.tmdb.org/t/p/w500/en.jpg".to_string(),
        }]),
        credits: None,
    }
}

fn thin(id: &str, title: &str, media_type: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "description": "No description available.",
        "posterUrl": "https://via.placeholder.com/500x750?text=No+Image",
        "averageRating": 0.0,
        "mediaType": media_type
    })
}

fn fake_catalog() -> Arc<FakeCatalog> {
    Arc::new(FakeCatalog {
        details: HashMap::from([(("550".to_string(), MediaType::Movie), fight_club_full())]),
        detail_requests: Mutex::new(Vec::new()),
    })
}

fn app_with(
    catalog: Arc<FakeCatalog>,
    storage: Arc<dyn Storage>,
    assistant: Option<Arc<dyn AssistantApi>>,
) -> Router {
    build_router(AppState::new(catalog, storage, assistant))
}

fn app() -> Router {
    app_with(fake_catalog(), Arc::new(MemoryStorage::new()), None)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(b) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn ids(value: &Value) -> Vec<String> {
    value
        .as_array()
        .expect("array")
        .iter()
        .map(|m| m["id"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn health_is_ok() {
    let res = app()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn media_routes_map_missing_to_404_and_reject_people() {
    let app = app();
    let (status, body) = send(&app, "GET", "/media/movie/550", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Fight Club");
    assert_eq!(body["posterUrl"], "https://image.tmdb.org/t/p/w500/fc.jpg");

    let (status, _) = send(&app, "GET", "/media/movie/1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "GET", "/media/person/287", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, "GET", "/media/movie/550/director", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "David Fincher");

    let (status, _) = send(&app, "GET", "/media/tv/1399/director", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send(&app, "GET", "/media/movie/550/cast", None).await;
    assert_eq!(body[0]["character"], "Narrator");
}

#[tokio::test]
async fn browse_routes_pass_through_catalog() {
    let app = app();
    let (_, body) = send(&app, "GET", "/search?query=fight", None).await;
    assert_eq!(ids(&body), vec!["550"]);

    let (_, body) = send(&app, "GET", "/popular/tv?page=2", None).await;
    assert!(ids(&body).is_empty());

    let (status, _) = send(&app, "GET", "/popular/person", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = send(&app, "GET", "/trending", None).await;
    assert_eq!(ids(&body), vec!["550"]);
}

#[tokio::test]
async fn watched_add_enriches_and_clears_to_watch() {
    let catalog = fake_catalog();
    let app = app_with(catalog.clone(), Arc::new(MemoryStorage::new()), None);

    let (status, body) = send(
        &app,
        "POST",
        "/lists/toWatch",
        Some(thin("550", "Fight Club", "movie")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec!["550"]);
    assert!(catalog.detail_requests.lock().unwrap().is_empty());

    let (_, body) = send(&app, "GET", "/lists/toWatch/movie/550", None).await;
    assert_eq!(body["member"], true);
    let (_, body) = send(&app, "GET", "/lists/toWatch/tv/550", None).await;
    assert_eq!(body["member"], false);

    let (_, watched) = send(
        &app,
        "POST",
        "/lists/watched",
        Some(thin("550", "Fight Club", "movie")),
    )
    .await;
    assert_eq!(ids(&watched), vec!["550"]);
    assert_eq!(watched[0]["runtime"], 139);
    assert_eq!(watched[0]["genres"][0]["name"], "Drama");
    assert_eq!(*catalog.detail_requests.lock().unwrap(), vec!["550"]);

    let (_, to_watch) = send(&app, "GET", "/lists/toWatch", None).await;
    assert!(ids(&to_watch).is_empty());
}

#[tokio::test]
async fn remove_reports_whether_anything_changed() {
    let app = app();
    send(&app, "POST", "/lists/toWatch", Some(thin("1399", "Game of Thrones", "tv"))).await;

    let (status, _) = send(&app, "DELETE", "/lists/toWatch/tv/1399", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "DELETE", "/lists/toWatch/tv/1399", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "DELETE", "/lists/later/tv/1399", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn export_then_import_moves_profile_between_stores() {
    let source_storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    source_storage.set(USERNAME_KEY, "sam").unwrap();
    let source = app_with(fake_catalog(), source_storage, None);
    send(&source, "POST", "/lists/toWatch", Some(thin("13", "Forrest Gump", "movie"))).await;
    send(&source, "POST", "/lists/watched", Some(thin("550", "Fight Club", "movie"))).await;

    let (status, exported) = send(&source, "GET", "/export", None).await;
    assert_eq!(status, StatusCode::OK);
    let data = exported["data"].as_str().expect("data").to_string();

    let target_storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    let target = app_with(fake_catalog(), target_storage.clone(), None);
    send(&target, "POST", "/lists/toWatch", Some(thin("1", "Replaced", "tv"))).await;

    let (status, summary) = send(&target, "POST", "/import", Some(json!({ "data": data }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary, json!({ "toWatch": 1, "watched": 1 }));

    let (_, to_watch) = send(&target, "GET", "/lists/toWatch", None).await;
    assert_eq!(ids(&to_watch), vec!["13"]);
    let (_, watched) = send(&target, "GET", "/lists/watched", None).await;
    assert_eq!(ids(&watched), vec!["550"]);
    assert_eq!(watched[0]["runtime"], 139);
    assert_eq!(
        target_storage.get(USERNAME_KEY).unwrap().as_deref(),
        Some("sam")
    );
}

#[tokio::test]
async fn bad_import_leaves_lists_alone() {
    let app = app();
    send(&app, "POST", "/lists/toWatch", Some(thin("13", "Forrest Gump", "movie"))).await;

    let (status, body) = send(&app, "POST", "/import", Some(json!({ "data": "not base64!" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Base64"));

    let (_, to_watch) = send(&app, "GET", "/lists/toWatch", None).await;
    assert_eq!(ids(&to_watch), vec!["13"]);
}

#[tokio::test]
async fn wipe_empties_both_lists() {
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    let app = app_with(fake_catalog(), storage.clone(), None);
    send(&app, "POST", "/lists/watched", Some(thin("550", "Fight Club", "movie"))).await;

    let (status, _) = send(&app, "DELETE", "/lists", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, watched) = send(&app, "GET", "/lists/watched", None).await;
    assert!(ids(&watched).is_empty());
    assert_eq!(storage.get("watchedList").unwrap(), None);
}

#[tokio::test]
async fn assistant_route_needs_a_configured_backend() {
    let disabled = app();
    let (status, _) = send(&disabled, "POST", "/assistant", Some(json!({ "message": "Heat" }))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let enabled = app_with(
        fake_catalog(),
        Arc::new(MemoryStorage::new()),
        Some(Arc::new(FakeAssistant) as Arc<dyn AssistantApi>),
    );
    let (status, body) = send(&enabled, "POST", "/assistant", Some(json!({ "message": "Heat" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reply"], "Because you liked Heat, try Heat.");

    let (status, _) = send(&enabled, "POST", "/assistant", Some(json!({ "message": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn lists_reload_from_shared_storage() {
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    let first = app_with(fake_catalog(), storage.clone(), None);
    send(&first, "POST", "/lists/watched", Some(thin("550", "Fight Club", "movie"))).await;

    let second = app_with(fake_catalog(), storage, None);
    let (_, body) = send(&second, "GET", "/lists/watched/movie/550", None).await;
    // Nothing has loaded the second store yet.
    assert_eq!(body["member"], false);

    let (_, watched) = send(&second, "GET", "/lists/watched", None).await;
    assert!(ids(&watched).is_empty());
    send(&second, "POST", "/lists/toWatch", Some(thin("13", "Forrest Gump", "movie"))).await;
    let (_, body) = send(&second, "GET", "/lists/watched/movie/550", None).await;
    assert_eq!(body["member"], true);
}
