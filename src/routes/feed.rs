use std::sync::Arc;

use axum::{
    extract::State,
    Extension, Json,
};

use crate::{
    error::AppResult,
    middleware::request_id::RequestId,
    models::Bv,
    routes::{AppState, PageQuery, RequesterMid, ValidQuery},
    services::recommendations,
};

/// Handler for the general (popularity) feed
pub async fn general(
    State(state): State<Arc<AppState>>,
    ValidQuery(query): ValidQuery<PageQuery>,
) -> AppResult<Json<Vec<Bv>>> {
    let page = query.pagination()?;
    let feed = recommendations::general_feed(state.store.as_ref(), page).await?;
    Ok(Json(feed))
}

/// Handler for the caller's personalized feed
pub async fn personal(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    RequesterMid(mid): RequesterMid,
    ValidQuery(query): ValidQuery<PageQuery>,
) -> AppResult<Json<Vec<Bv>>> {
    let page = query.pagination()?;

    tracing::info!(
        request_id = %request_id,
        mid,
        page_size = page.page_size,
        page_num = page.page_num,
        "Processing personalized feed request"
    );

    let feed = recommendations::personalized_feed(state.store.as_ref(), mid, page).await?;
    Ok(Json(feed))
}
