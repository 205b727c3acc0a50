use crate::assistant::{AssistantApi, ChatClient};
use crate::catalog::{CatalogApi, TmdbClient};
use crate::config::Config;
use crate::models::{ListName, Media, MediaKey, MediaType};
use crate::storage::{FileStorage, Storage};
use crate::store::ListStore;
use crate::transfer;
use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::{net::SocketAddr, sync::Arc};
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{info, warn};

const MAX_BODY_BYTES: usize = 4 * 1024 * 1024; // imports carry whole lists

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn CatalogApi>,
    pub store: Arc<ListStore>,
    pub storage: Arc<dyn Storage>,
    pub assistant: Option<Arc<dyn AssistantApi>>,
}

impl AppState {
    pub fn new(
        catalog: Arc<dyn CatalogApi>,
        storage: Arc<dyn Storage>,
        assistant: Option<Arc<dyn AssistantApi>>,
    ) -> Self {
        let store = Arc::new(ListStore::new(storage.clone(), catalog.clone()));
        Self {
            catalog,
            store,
            storage,
            assistant,
        }
    }
}

pub async fn run_server(config: Config) -> Result<()> {
    let catalog: Arc<dyn CatalogApi> = Arc::new(TmdbClient::from_config(&config)?);
    let storage: Arc<dyn Storage> = Arc::new(FileStorage::open(&config.data_dir)?);
    info!("Persisting lists under {:?}", config.data_dir);

    let assistant: Option<Arc<dyn AssistantApi>> = match &config.assistant {
        Some(c) => {
            info!("Assistant enabled ({})", c.model);
            Some(Arc::new(ChatClient::new(c)?))
        }
        None => {
            info!("ASSISTANT_API_URL not set, assistant disabled");
            None
        }
    };

    let state = AppState::new(catalog, storage, assistant);
    state.store.load().await;

    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/trending", get(trending))
        .route("/popular/:media_type", get(popular))
        .route("/people/popular", get(popular_people))
        .route("/search", get(search))
        .route("/people/search", get(search_people))
        .route("/media/:media_type/:id", get(media_details))
        .route("/media/:media_type/:id/cast", get(cast))
        .route("/media/:media_type/:id/director", get(director))
        .route("/media/:media_type/:id/recommendations", get(recommendations))
        .route("/tv/:id/seasons", get(seasons))
        .route("/lists", delete(clear_lists))
        .route("/lists/:list", get(list).post(add_to_list))
        .route(
            "/lists/:list/:media_type/:id",
            get(membership).delete(remove_from_list),
        )
        .route("/export", get(export))
        .route("/import", post(import))
        .route("/assistant", post(ask_assistant))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    page: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    query: String,
    page: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ImportBody {
    data: String,
}

#[derive(Debug, Deserialize)]
struct AssistantBody {
    message: String,
}

fn bad_request(message: impl ToString) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": message.to_string() })),
    )
        .into_response()
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "not found" }))).into_response()
}

fn parse_media_type(raw: &str) -> Result<MediaType, Response> {
    raw.parse::<MediaType>().map_err(bad_request)
}

fn parse_title_type(raw: &str) -> Result<MediaType, Response> {
    match parse_media_type(raw)? {
        MediaType::Person => Err(bad_request("media type must be 'movie' or 'tv'")),
        t => Ok(t),
    }
}

fn parse_list(raw: &str) -> Result<ListName, Response> {
    raw.parse::<ListName>().map_err(bad_request)
}

async fn health() -> &'static str {
    "OK"
}

async fn trending(State(state): State<AppState>, Query(q): Query<PageQuery>) -> Json<Vec<Media>> {
    Json(state.catalog.trending(q.page.unwrap_or(1)).await)
}

async fn popular(
    State(state): State<AppState>,
    Path(media_type): Path<String>,
    Query(q): Query<PageQuery>,
) -> Response {
    let media_type = match parse_title_type(&media_type) {
        Ok(t) => t,
        Err(r) => return r,
    };
    Json(state.catalog.popular(media_type, q.page.unwrap_or(1)).await).into_response()
}

async fn popular_people(State(state): State<AppState>, Query(q): Query<PageQuery>) -> Response {
    Json(state.catalog.popular_people(q.page.unwrap_or(1)).await).into_response()
}

async fn search(State(state): State<AppState>, Query(q): Query<SearchQuery>) -> Response {
    Json(state.catalog.search(&q.query, q.page.unwrap_or(1)).await).into_response()
}

async fn search_people(State(state): State<AppState>, Query(q): Query<SearchQuery>) -> Response {
    Json(state.catalog.search_people(&q.query, q.page.unwrap_or(1)).await).into_response()
}

async fn media_details(
    State(state): State<AppState>,
    Path((media_type, id)): Path<(String, String)>,
) -> Response {
    let media_type = match parse_title_type(&media_type) {
        Ok(t) => t,
        Err(r) => return r,
    };
    match state.catalog.media_details(&id, media_type).await {
        Some(media) => Json(media).into_response(),
        None => not_found(),
    }
}

async fn cast(
    State(state): State<AppState>,
    Path((media_type, id)): Path<(String, String)>,
) -> Response {
    let media_type = match parse_title_type(&media_type) {
        Ok(t) => t,
        Err(r) => return r,
    };
    Json(state.catalog.top_cast(&id, media_type).await).into_response()
}

async fn director(
    State(state): State<AppState>,
    Path((media_type, id)): Path<(String, String)>,
) -> Response {
    let media_type = match parse_title_type(&media_type) {
        Ok(t) => t,
        Err(r) => return r,
    };
    match state.catalog.director(&id, media_type).await {
        Some(director) => Json(director).into_response(),
        None => not_found(),
    }
}

async fn recommendations(
    State(state): State<AppState>,
    Path((media_type, id)): Path<(String, String)>,
) -> Response {
    let media_type = match parse_title_type(&media_type) {
        Ok(t) => t,
        Err(r) => return r,
    };
    Json(state.catalog.recommendations(&id, media_type).await).into_response()
}

async fn seasons(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    Json(state.catalog.series_seasons(&id).await).into_response()
}

async fn list(State(state): State<AppState>, Path(list): Path<String>) -> Response {
    let name = match parse_list(&list) {
        Ok(n) => n,
        Err(r) => return r,
    };
    Json(state.store.list(name).await).into_response()
}

async fn add_to_list(
    State(state): State<AppState>,
    Path(list): Path<String>,
    Json(media): Json<Media>,
) -> Response {
    let name = match parse_list(&list) {
        Ok(n) => n,
        Err(r) => return r,
    };
    info!(
        "Adding {} {} ('{}') to {}",
        media.media_type, media.id, media.title, name
    );
    state.store.add_to_list(media, name).await;
    Json(state.store.list(name).await).into_response()
}

async fn membership(
    State(state): State<AppState>,
    Path((list, media_type, id)): Path<(String, String, String)>,
) -> Response {
    let (name, media_type) = match (parse_list(&list), parse_media_type(&media_type)) {
        (Ok(n), Ok(t)) => (n, t),
        (Err(r), _) | (_, Err(r)) => return r,
    };
    let member = state
        .store
        .is_in_list(&MediaKey::new(id, media_type), name)
        .await;
    Json(json!({ "member": member })).into_response()
}

async fn remove_from_list(
    State(state): State<AppState>,
    Path((list, media_type, id)): Path<(String, String, String)>,
) -> Response {
    let (name, media_type) = match (parse_list(&list), parse_media_type(&media_type)) {
        (Ok(n), Ok(t)) => (n, t),
        (Err(r), _) | (_, Err(r)) => return r,
    };
    if state
        .store
        .remove_from_list(&MediaKey::new(id, media_type), name)
        .await
    {
        StatusCode::NO_CONTENT.into_response()
    } else {
        not_found()
    }
}

async fn clear_lists(State(state): State<AppState>) -> StatusCode {
    warn!("Wiping both lists");
    state.store.clear().await;
    StatusCode::NO_CONTENT
}

async fn export(State(state): State<AppState>) -> Response {
    match transfer::export(&state.store, state.storage.as_ref()).await {
        Ok(data) => Json(json!({ "data": data })).into_response(),
        Err(e) => {
            warn!("Export failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn import(State(state): State<AppState>, Json(body): Json<ImportBody>) -> Response {
    match transfer::import(&state.store, state.storage.as_ref(), &body.data).await {
        Ok(summary) => Json(json!({
            "toWatch": summary.to_watch,
            "watched": summary.watched
        }))
        .into_response(),
        Err(e) => {
            warn!("Rejecting import: {}", e);
            bad_request(e)
        }
    }
}

async fn ask_assistant(
    State(state): State<AppState>,
    Json(body): Json<AssistantBody>,
) -> Response {
    let Some(assistant) = state.assistant.as_ref() else {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    };
    if body.message.trim().is_empty() {
        return bad_request("message must not be empty");
    }
    match assistant.ask(&body.message).await {
        Some(reply) => Json(json!({ "reply": reply })).into_response(),
        None => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        }
    }
}
