use std::sync::Arc;

use axum::{
    extract::State,
    Extension, Json,
};

use crate::{
    error::AppResult,
    middleware::request_id::RequestId,
    models::Mid,
    routes::{AppState, PageQuery, RequesterMid, ValidQuery},
    services::recommendations,
};

/// Handler for friend suggestions
pub async fn recommended(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    RequesterMid(mid): RequesterMid,
    ValidQuery(query): ValidQuery<PageQuery>,
) -> AppResult<Json<Vec<Mid>>> {
    let page = query.pagination()?;

    tracing::info!(request_id = %request_id, mid, "Processing friend recommendation request");

    let friends = recommendations::recommend_friends(state.store.as_ref(), mid, page).await?;
    Ok(Json(friends))
}
