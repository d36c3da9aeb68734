use crate::metrics::track;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use movieshelf_core::{
    CatalogError, ErrorKind, FacetSummary, MovieLookup, MovieRecord, QueryParams, RecentRequest,
    TmdbIds, ValidationError,
};
use movieshelf_storage::Catalog;
use prometheus::{Encoder, TextEncoder};
use serde_json::json;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub catalog: Catalog,
}

pub struct ApiError(CatalogError);

impl From<CatalogError> for ApiError {
    fn from(e: CatalogError) -> Self {
        ApiError(e)
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        ApiError(ValidationError::MalformedQuery(e.body_text()).into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let (status, message) = match kind {
            ErrorKind::Validation => (StatusCode::BAD_REQUEST, self.0.to_string()),
            ErrorKind::NotFound => (StatusCode::NOT_FOUND, self.0.to_string()),
            ErrorKind::Upstream => {
                tracing::error!(error = %self.0, "catalog store failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "the movie catalog is unavailable".to_string(),
                )
            }
        };
        (status, Json(json!({ "error": kind, "message": message }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

// Repeated keys (`?genre=a&genre=b`) arrive as separate pairs. Rejections
// are kept so they answer with the usual error body.
type RawParams = Result<Query<Vec<(String, String)>>, QueryRejection>;

fn params(raw: RawParams) -> Result<QueryParams, ApiError> {
    let Query(pairs) = raw?;
    Ok(pairs.into_iter().collect())
}

pub fn cors_layer(site_url: Option<&str>) -> anyhow::Result<CorsLayer> {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET])
        .allow_headers(Any);
    Ok(match site_url {
        Some(origin) => layer.allow_origin(origin.parse::<HeaderValue>()?),
        None => layer.allow_origin(Any),
    })
}

pub fn router(state: AppState, cors: CorsLayer, request_timeout: Duration) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/movies/list", get(list_movies))
        .route("/movies/get", get(get_movie))
        .route("/movies/ids", get(movies_by_ids))
        .route("/movies/types", get(facets))
        .route("/movies/count", get(count))
        .route("/movies/recent", get(most_recent))
        .route("/metrics", get(metrics))
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn list_movies(State(app): State<AppState>, q: RawParams) -> ApiResult<Vec<MovieRecord>> {
    let params = params(q)?;
    let movies = track("list", app.catalog.list_movies(&params)).await?;
    tracing::debug!(results = movies.len(), "listed movies");
    Ok(Json(movies))
}

async fn get_movie(State(app): State<AppState>, q: RawParams) -> ApiResult<MovieRecord> {
    let params = params(q)?;
    let movie = track("get", async {
        let lookup = MovieLookup::from_params(&params)?;
        app.catalog.get_movie(&lookup).await
    })
    .await?;
    Ok(Json(movie))
}

async fn movies_by_ids(State(app): State<AppState>, q: RawParams) -> ApiResult<Vec<MovieRecord>> {
    let params = params(q)?;
    let movies = track("ids", async {
        let ids = TmdbIds::from_params(&params)?;
        app.catalog.movies_by_ids(&ids).await
    })
    .await?;
    Ok(Json(movies))
}

async fn facets(State(app): State<AppState>) -> ApiResult<FacetSummary> {
    Ok(Json(track("types", app.catalog.facets()).await?))
}

async fn count(State(app): State<AppState>) -> ApiResult<u64> {
    Ok(Json(track("count", app.catalog.count()).await?))
}

async fn most_recent(State(app): State<AppState>, q: RawParams) -> ApiResult<Vec<MovieRecord>> {
    let params = params(q)?;
    let movies = track("recent", async {
        let req = RecentRequest::from_params(&params)?;
        app.catalog.most_recent(req).await
    })
    .await?;
    Ok(Json(movies))
}

async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buf = Vec::new();
    let _ = encoder.encode(&metric_families, &mut buf);
    (StatusCode::OK, String::from_utf8(buf).unwrap_or_default())
}
