use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Query},
    http::{request::Parts, StatusCode},
    middleware::from_fn,
    routing::get,
    Json, Router,
};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    db::DiscoveryStore,
    error::{AppError, AppResult},
    middleware::request_id::{make_span_with_request_id, request_id_middleware},
    models::{Mid, Pagination},
};

pub mod feed;
pub mod friends;
pub mod search;
pub mod videos;

/// Header carrying the already-authenticated caller's mid
pub const USER_MID_HEADER: &str = "x-user-mid";

/// Shared application state
pub struct AppState {
    pub store: Arc<dyn DiscoveryStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn DiscoveryStore>) -> Self {
        Self { store }
    }
}

/// Creates the application router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
}

/// API routes under /api/v1
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/videos/:bv/related", get(videos::related))
        .route("/videos/:bv/hotspots", get(videos::hotspots))
        .route("/videos/:bv/view-rate", get(videos::view_rate))
        .route("/feed", get(feed::general))
        .route("/feed/personal", get(feed::personal))
        .route("/friends/recommended", get(friends::recommended))
        .route("/search", get(search::search))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// `Query` whose deserialization failures render as `InvalidInput`
#[derive(Debug, Clone)]
pub struct ValidQuery<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ValidQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

/// Raw page parameters; validated by [`PageQuery::pagination`]
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page_size: i64,
    pub page_num: i64,
}

impl PageQuery {
    pub fn pagination(&self) -> AppResult<Pagination> {
        Pagination::new(self.page_size, self.page_num)
    }
}

/// Caller identity resolved upstream and forwarded in `x-user-mid`
#[derive(Debug, Clone, Copy)]
pub struct RequesterMid(pub Mid);

#[async_trait]
impl<S> FromRequestParts<S> for RequesterMid
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_MID_HEADER)
            .ok_or_else(|| AppError::Unauthenticated(format!("missing {} header", USER_MID_HEADER)))?;

        raw.to_str()
            .ok()
            .and_then(|s| s.trim().parse::<Mid>().ok())
            .map(RequesterMid)
            .ok_or_else(|| AppError::Unauthenticated(format!("malformed {} header", USER_MID_HEADER)))
    }
}
