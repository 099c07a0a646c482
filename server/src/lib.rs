use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use docsearch_core::timestamp::{format_output, parse_input};
use docsearch_core::{ContentModel, Document, EngineError, SearchEngine};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub const DEFAULT_SEARCH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentPayload {
    pub content: String,
    pub created_date: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContentResponse {
    pub content: String,
    pub created_date: String,
}

impl TryFrom<ContentModel> for ContentResponse {
    type Error = EngineError;

    fn try_from(doc: ContentModel) -> Result<Self, Self::Error> {
        Ok(Self { created_date: format_output(doc.created_date)?, content: doc.content })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseModel {
    pub response_message: String,
}

impl ResponseModel {
    fn new(msg: impl Into<String>) -> Self {
        Self { response_message: msg.into() }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    #[serde(default)]
    pub search_key: String,
    pub created_date: String,
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SearchEngine>,
    pub search_timeout: Duration,
}

/// Failure mapped to a status code and a `ResponseModel` body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        if e.is_client_error() {
            return ApiError::new(StatusCode::BAD_REQUEST, e.to_string());
        }
        tracing::error!(error = %e, "engine failure");
        match e {
            EngineError::IndexState(_) => ApiError::new(StatusCode::SERVICE_UNAVAILABLE, "Unavailable"),
            _ => ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Failure"),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        tracing::error!(error = %e, "engine task aborted");
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Failure")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ResponseModel::new(self.message))).into_response()
    }
}

pub fn build_app(engine: Arc<SearchEngine>, search_timeout: Duration) -> Router {
    let app_state = AppState { engine, search_timeout };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/v1/content/indexcontent", post(index_content))
        .route("/api/v1/content/searchcontent", get(search_by_query))
        .route("/api/v1/content/searchcontent/:search_key/:created_date", get(search_by_path))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn index_content(
    State(state): State<AppState>,
    Json(payload): Json<Vec<ContentPayload>>,
) -> Result<Json<ResponseModel>, ApiError> {
    if payload.is_empty() {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "no documents supplied"));
    }
    let docs = payload
        .into_iter()
        .map(|p| Ok(Document::new(p.content, parse_input(&p.created_date)?)))
        .collect::<Result<Vec<_>, EngineError>>()?;

    let engine = state.engine.clone();
    let count = tokio::task::spawn_blocking(move || engine.index_content(&docs)).await??;
    tracing::info!(count, "indexed batch");
    Ok(Json(ResponseModel::new("Success")))
}

pub async fn search_by_path(
    State(state): State<AppState>,
    Path((search_key, created_date)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    run_search(&state, search_key, &created_date).await
}

pub async fn search_by_query(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Response, ApiError> {
    run_search(&state, params.search_key, &params.created_date).await
}

async fn run_search(state: &AppState, search_key: String, created_date: &str) -> Result<Response, ApiError> {
    let lower = parse_input(created_date)?;
    let engine = state.engine.clone();
    let task = tokio::task::spawn_blocking(move || engine.search_content(&search_key, lower));
    // the whole ranked set or an explicit timeout; never a partial list
    let results = match tokio::time::timeout(state.search_timeout, task).await {
        Ok(joined) => joined??,
        Err(_) => {
            tracing::warn!(timeout = ?state.search_timeout, "search timed out");
            return Err(ApiError::new(StatusCode::SERVICE_UNAVAILABLE, "Timeout"));
        }
    };
    if results.is_empty() {
        return Ok((StatusCode::NOT_FOUND, Json(ResponseModel::new("Not Found"))).into_response());
    }
    let body = results
        .into_iter()
        .map(ContentResponse::try_from)
        .collect::<Result<Vec<_>, EngineError>>()?;
    Ok(Json(body).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_errors_map_to_status_codes() {
        let cases = [
            (EngineError::Storage("disk gone".into()), StatusCode::INTERNAL_SERVER_ERROR, "Failure"),
            (EngineError::IndexState("closed".into()), StatusCode::SERVICE_UNAVAILABLE, "Unavailable"),
        ];
        for (err, status, message) in cases {
            let api = ApiError::from(err);
            assert_eq!(api.status, status);
            assert_eq!(api.message, message);
            assert_eq!(api.into_response().status(), status);
        }
        let api = ApiError::from(EngineError::QuerySyntax("unbalanced".into()));
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
    }
}
