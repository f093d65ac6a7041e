use std::collections::BTreeSet;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Serialize;

use crate::{
    error::AppResult,
    middleware::request_id::RequestId,
    models::Bv,
    routes::AppState,
    services::{hotspots as hotspot_service, recommendations},
};

#[derive(Debug, Serialize)]
pub struct ViewRateResponse {
    pub bv: Bv,
    /// `null` when nobody has watched the video
    pub average_view_rate: Option<f64>,
}

/// Handler for the related-videos endpoint
pub async fn related(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Path(bv): Path<String>,
) -> AppResult<Json<Vec<Bv>>> {
    tracing::info!(request_id = %request_id, bv = %bv, "Processing related videos request");

    let related = recommendations::related_videos(state.store.as_ref(), &bv).await?;
    Ok(Json(related))
}

/// Handler for the comment-hotspot endpoint
pub async fn hotspots(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Path(bv): Path<String>,
) -> AppResult<Json<BTreeSet<i64>>> {
    tracing::info!(request_id = %request_id, bv = %bv, "Processing hotspot request");

    let buckets = hotspot_service::hotspots(state.store.as_ref(), &bv).await?;
    Ok(Json(buckets))
}

/// Handler for the average view-rate endpoint
pub async fn view_rate(
    State(state): State<Arc<AppState>>,
    Path(bv): Path<String>,
) -> AppResult<Json<ViewRateResponse>> {
    let average_view_rate = recommendations::average_view_rate(state.store.as_ref(), &bv).await?;
    Ok(Json(ViewRateResponse {
        bv,
        average_view_rate,
    }))
}
