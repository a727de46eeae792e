use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;

use crate::{
    model::{SearchRequest, SearchResponse},
    service::{SearchError, SearchService},
};

// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SearchService>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct ValidationErrors {
    pub errors: Vec<String>,
}

// Route handlers
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn ping(State(state): State<AppState>) -> Json<bool> {
    Json(state.service.is_available().await)
}

pub async fn search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, (StatusCode, Json<ValidationErrors>)> {
    let errors = validate_search_request(&request);
    if !errors.is_empty() {
        return Err((StatusCode::BAD_REQUEST, Json(ValidationErrors { errors })));
    }

    match state.service.search(&request).await {
        Ok(response) => Ok(Json(response)),
        Err(SearchError::Unavailable) => {
            tracing::warn!("search rejected: upstream providers unavailable");
            Err((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ValidationErrors {
                    errors: vec!["upstream providers are unavailable".to_string()],
                }),
            ))
        }
        Err(SearchError::Provider(e)) => {
            tracing::error!("provider search failed: {e}");
            Err((
                StatusCode::BAD_GATEWAY,
                Json(ValidationErrors {
                    errors: vec!["upstream provider search failed".to_string()],
                }),
            ))
        }
    }
}

fn validate_search_request(request: &SearchRequest) -> Vec<String> {
    let mut errors = Vec::new();

    if request.origin.trim().is_empty() {
        errors.push("origin must not be empty".to_string());
    }
    if request.destination.trim().is_empty() {
        errors.push("destination must not be empty".to_string());
    }
    if !request.origin.trim().is_empty()
        && request.origin.eq_ignore_ascii_case(&request.destination)
    {
        errors.push("origin and destination must differ".to_string());
    }
    if let Some(max_price) = request.filters.as_ref().and_then(|f| f.max_price) {
        if max_price.is_sign_negative() {
            errors.push("maxPrice must not be negative".to_string());
        }
    }

    errors
}

// Create the router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/ping", get(ping))
        .route("/api/v1/search", post(search))
        .with_state(state)
}
