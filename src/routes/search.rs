use std::sync::Arc;

use axum::{
    extract::State,
    Extension, Json,
};
use serde::Deserialize;

use crate::{
    error::AppResult,
    middleware::request_id::RequestId,
    models::{Bv, Pagination},
    routes::{AppState, RequesterMid, ValidQuery},
    services::video_search,
};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    keywords: String,
    page_size: i64,
    page_num: i64,
}

/// Handler for keyword video search
pub async fn search(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    RequesterMid(mid): RequesterMid,
    ValidQuery(params): ValidQuery<SearchQuery>,
) -> AppResult<Json<Vec<Bv>>> {
    let page = Pagination::new(params.page_size, params.page_num)?;

    tracing::info!(
        request_id = %request_id,
        mid,
        keywords = %params.keywords,
        "Processing search request"
    );

    let results = video_search::search_videos(state.store.as_ref(), mid, &params.keywords, page).await?;
    Ok(Json(results))
}
