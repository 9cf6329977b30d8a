//! Land-use routes: bbox-filtered site data around a USRN

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde_json::Value;
use tracing::info;

use streetwise_common::types::{validate_usrn, RouteType};

use crate::api::UsrnQuery;
use crate::error::ApiResult;
use crate::services::pre_process;
use crate::AppState;

/// GET /land-use-info
///
/// Resolves the USRN's buffered bounding box, aggregates the land-use
/// collection within it, and returns the simplified view.
pub async fn land_use_info(
    State(state): State<AppState>,
    Query(params): Query<UsrnQuery>,
) -> ApiResult<Json<Value>> {
    validate_usrn(&params.usrn)?;
    info!(usrn = %params.usrn, "Land use request");

    let bbox = state
        .bbox_resolver
        .resolve(&params.usrn, state.config.buffer_distance)
        .await?
        .to_string();

    let features = state
        .aggregator
        .aggregate(RouteType::LandUse, &params.usrn, Some(&bbox), None, None)
        .await?;
    let simplified = pre_process::land_use(&Value::from(features));

    Ok(Json(simplified))
}

/// GET /land-use-info-llm
///
/// Same aggregation, with the simplified view summarised downstream.
pub async fn land_use_info_llm(
    State(state): State<AppState>,
    Query(params): Query<UsrnQuery>,
) -> ApiResult<Json<Value>> {
    validate_usrn(&params.usrn)?;
    info!(usrn = %params.usrn, "Land use summary request");

    let bbox = state
        .bbox_resolver
        .resolve(&params.usrn, state.config.buffer_distance)
        .await?
        .to_string();

    let features = state
        .aggregator
        .aggregate(RouteType::LandUse, &params.usrn, Some(&bbox), None, None)
        .await?;
    let simplified = pre_process::land_use(&Value::from(features));
    let summary = state
        .summarizer
        .summarise(&simplified, RouteType::LandUse)
        .await?;

    Ok(Json(summary))
}

/// Build land-use routes
pub fn land_use_routes() -> Router<AppState> {
    Router::new()
        .route("/land-use-info", get(land_use_info))
        .route("/land-use-info-llm", get(land_use_info_llm))
}
