use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
};
use omdb_data::{
    DataError, InMemoryLocalDataSource, LocalDataSource, Movie, MovieDataRepository, MovieInfo,
    MovieRepository, OmdbClient, OmdbConfig, PostgresLocalDataSource, Search,
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use crate::config::Config;

type ApiError = (StatusCode, Json<Value>);
type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Deserialize)]
pub struct MoviesQuery {
    pub query: String,
}

/// Shared handler state; the repository is built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<dyn MovieRepository>,
}

impl AppState {
    pub fn new(repository: Arc<dyn MovieRepository>) -> Self {
        Self { repository }
    }
}

/// Wire the local cache and the OMDb client into a single shared repository.
pub async fn create_app_state(config: &Config) -> omdb_data::Result<AppState> {
    let expiration = chrono::Duration::from_std(config.cache_expiration)
        .map_err(|e| DataError::Storage(format!("invalid cache expiration: {}", e)))?;

    let local: Arc<dyn LocalDataSource> = match &config.database_url {
        Some(database_url) => {
            info!("Using PostgreSQL movie cache");
            Arc::new(
                PostgresLocalDataSource::connect(database_url)
                    .await?
                    .with_expiration(expiration),
            )
        }
        None => {
            info!("Using in-memory movie cache");
            Arc::new(InMemoryLocalDataSource::new().with_expiration(expiration))
        }
    };

    let remote = Arc::new(OmdbClient::new(
        OmdbConfig::new(&config.omdb_api_key)
            .with_base_url(&config.omdb_base_url)
            .with_timeout(config.omdb_timeout),
    )?);

    Ok(AppState::new(Arc::new(MovieDataRepository::new(local, remote))))
}

fn data_error(context: &str, err: DataError) -> ApiError {
    let status = match &err {
        DataError::Fetch(_) => {
            warn!("{}: {}", context, err);
            StatusCode::BAD_GATEWAY
        }
        DataError::Storage(_) => {
            error!("{}: {}", context, err);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    (
        status,
        Json(json!({
            "error": context,
            "details": err.to_string()
        })),
    )
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/movies", get(get_movies))
        .route("/movies/{imdb_id}", get(get_movie_info))
        .route("/searches", get(get_all_queries))
        .route("/searches/last", get(get_last_search))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn get_movies(
    State(state): State<AppState>,
    Query(params): Query<MoviesQuery>,
) -> ApiResult<Vec<Movie>> {
    info!("Movies requested for '{}'", params.query);
    state
        .repository
        .get_movies(&params.query)
        .await
        .map(Json)
        .map_err(|e| data_error("Failed to load movies", e))
}

async fn get_movie_info(
    State(state): State<AppState>,
    Path(imdb_id): Path<String>,
) -> ApiResult<MovieInfo> {
    info!("Movie info requested for {}", imdb_id);
    state
        .repository
        .get_movie_info(&imdb_id)
        .await
        .map(Json)
        .map_err(|e| data_error("Failed to load movie info", e))
}

async fn get_last_search(State(state): State<AppState>) -> ApiResult<Search> {
    state
        .repository
        .get_last_search()
        .await
        .map(Json)
        .map_err(|e| data_error("Failed to load last search", e))
}

async fn get_all_queries(State(state): State<AppState>) -> ApiResult<Vec<String>> {
    state
        .repository
        .get_all_queries()
        .await
        .map(Json)
        .map_err(|e| data_error("Failed to load search history", e))
}
