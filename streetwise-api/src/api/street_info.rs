//! Street-info routes: aggregated network and designation data

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

/// GET /street-info
///
/// Aggregates the street network and designation collections for a USRN
/// and returns the simplified view.
pub async fn street_info(
    State(state): State<AppState>,
    Query(params): Query<UsrnQuery>,
) -> ApiResult<Json<Value>> {
    validate_usrn(&params.usrn)?;
    info!(usrn = %params.usrn, "Street info request");

    let features = state
        .aggregator
        .aggregate(RouteType::StreetInfo, &params.usrn, None, None, None)
        .await?;
    let simplified = pre_process::street_info(&Value::from(features));

    Ok(Json(simplified))
}

/// GET /street-info-llm
///
/// Same aggregation, with the simplified view summarised downstream.
pub async fn street_info_llm(
    State(state): State<AppState>,
    Query(params): Query<UsrnQuery>,
) -> ApiResult<Json<Value>> {
    validate_usrn(&params.usrn)?;
    info!(usrn = %params.usrn, "Street info summary request");

    let features = state
        .aggregator
        .aggregate(RouteType::StreetInfo, &params.usrn, None, None, None)
        .await?;
    let simplified = pre_process::street_info(&Value::from(features));
    let summary = state
        .summarizer
        .summarise(&simplified, RouteType::StreetInfo)
        .await?;

    Ok(Json(summary))
}

/// Build street-info routes
pub fn street_info_routes() -> Router<AppState> {
    Router::new()
        .route("/street-info", get(street_info))
        .route("/street-info-llm", get(street_info_llm))
}
