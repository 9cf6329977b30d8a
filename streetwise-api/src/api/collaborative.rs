//! Collaborative street-works route
//!
//! Combines the street-info and land-use views for a USRN and asks the
//! summariser for a coordination recommendation. The two aggregations are
//! pre-processed independently because the simplification transforms are
//! route-specific.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tracing::info;

use streetwise_common::types::{validate_usrn, RouteType};

use crate::api::UsrnQuery;
use crate::error::ApiResult;
use crate::services::pre_process;
use crate::AppState;

/// GET /collaborative-street-works
pub async fn collaborative_street_works(
    State(state): State<AppState>,
    Query(params): Query<UsrnQuery>,
) -> ApiResult<Json<Value>> {
    validate_usrn(&params.usrn)?;
    info!(usrn = %params.usrn, "Collaborative street works request");

    let bbox = state
        .bbox_resolver
        .resolve(&params.usrn, state.config.buffer_distance)
        .await?
        .to_string();

    let land = state
        .aggregator
        .aggregate(RouteType::LandUse, &params.usrn, Some(&bbox), None, None)
        .await?;
    let simplified_land = pre_process::land_use(&Value::from(land));

    let street = state
        .aggregator
        .aggregate(RouteType::StreetInfo, &params.usrn, None, None, None)
        .await?;
    let simplified_street = pre_process::street_info(&Value::from(street));

    let combined = json!({
        "land_use": simplified_land,
        "street_info": simplified_street,
    });
    let summary = state
        .summarizer
        .summarise(&combined, RouteType::CollaborativeStreetWorks)
        .await?;

    Ok(Json(summary))
}

/// Build collaborative street-works routes
pub fn collaborative_routes() -> Router<AppState> {
    Router::new().route("/collaborative-street-works", get(collaborative_street_works))
}
