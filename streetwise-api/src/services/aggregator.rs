//! Feature aggregation pipeline
//!
//! Fans out one fetch per planned collection query, folds the results back
//! in plan order (never completion order), then runs the dependent
//! roadlink join for plans that include the street network collection.
//!
//! A failed fetch skips that collection and the merge continues: the
//! contract is best-effort merge, not all-or-nothing. Only validation
//! failures reach the caller as errors.

use std::sync::Arc;

use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use streetwise_common::config::AppConfig;
use streetwise_common::types::{CollectionQuery, FeatureCollection, RouteType};
use streetwise_common::{Error, Result};

use crate::types::FeatureFetcher;

/// Street-plan collections, queried by `usrn` attribute, in output order.
const STREET_COLLECTIONS: [&str; 4] = [
    "trn-ntwk-street-1",
    "trn-rami-specialdesignationarea-1",
    "trn-rami-specialdesignationline-1",
    "trn-rami-specialdesignationpoint-1",
];

/// The collection whose features carry roadlink references.
const STREET_NETWORK_COLLECTION: &str = "trn-ntwk-street-1";

/// Land-use plan collections, queried by bounding box.
const LAND_USE_COLLECTIONS: [&str; 1] = ["lus-fts-site-1"];

/// Roadlink join target, fetched by feature id.
const ROADLINK_COLLECTION: &str = "trn-ntwk-roadlink-5";

/// Orchestrates the concurrent collection fetches and the merge.
pub struct FeatureAggregator {
    fetcher: Arc<dyn FeatureFetcher>,
    config: Arc<AppConfig>,
}

impl FeatureAggregator {
    pub fn new(fetcher: Arc<dyn FeatureFetcher>, config: Arc<AppConfig>) -> Self {
        Self { fetcher, config }
    }

    /// Aggregate the collections for a route type into one geometry-free
    /// feature collection.
    ///
    /// Validation failures are errors; upstream fetch failures are not -
    /// each failing collection or roadlink is logged and skipped, and the
    /// merge carries on with whatever succeeded.
    pub async fn aggregate(
        &self,
        route_type: RouteType,
        usrn: &str,
        bbox: Option<&str>,
        bbox_crs: Option<&str>,
        crs: Option<&str>,
    ) -> Result<FeatureCollection> {
        if usrn.is_empty() {
            return Err(Error::Validation("A valid usrn is required".to_string()));
        }

        let plan = self.fetch_plan(route_type, usrn, bbox, bbox_crs, crs)?;
        info!(route = %route_type, usrn, queries = plan.len(), "Aggregating features");

        let results = join_all(
            plan.iter()
                .map(|query| self.fetcher.collection_features(query)),
        )
        .await;

        let mut features: Vec<Value> = Vec::new();
        let mut latest_timestamp: Option<String> = None;
        let mut roadlink_ids: Vec<String> = Vec::new();

        // Fold in plan order, not completion order, so two runs over the
        // same upstream data produce identical output.
        for (query, result) in plan.iter().zip(results) {
            let collection_id = query.collection_id.as_str();
            let body = match result {
                Ok(body) => body,
                Err(e) => {
                    error!(collection = collection_id, error = %e, "Failed to fetch collection, skipping");
                    continue;
                }
            };

            let Some(page_features) = body.get("features").and_then(Value::as_array) else {
                error!(
                    collection = collection_id,
                    "Invalid response format, skipping collection"
                );
                continue;
            };

            for feature in page_features {
                if collection_id == STREET_NETWORK_COLLECTION {
                    collect_roadlink_ids(feature, &mut roadlink_ids);
                }
                features.push(without_geometry(feature));
            }
            debug!(
                collection = collection_id,
                count = page_features.len(),
                "Merged collection features"
            );

            update_latest_timestamp(&mut latest_timestamp, &body);
        }

        if !roadlink_ids.is_empty() {
            self.join_roadlinks(&roadlink_ids, &mut features, &mut latest_timestamp)
                .await;
        }

        if features.is_empty() {
            warn!(usrn, "No features found");
        }

        Ok(FeatureCollection::new(features, latest_timestamp))
    }

    /// Dependent join phase: fetch every referenced roadlink by id,
    /// concurrently, and append the survivors in reference order.
    async fn join_roadlinks(
        &self,
        roadlink_ids: &[String],
        features: &mut Vec<Value>,
        latest_timestamp: &mut Option<String>,
    ) {
        info!(count = roadlink_ids.len(), "Fetching linked roadlink features");

        let results = join_all(
            roadlink_ids
                .iter()
                .map(|id| self.fetcher.feature_by_id(ROADLINK_COLLECTION, id)),
        )
        .await;

        let mut joined = 0usize;
        for (roadlink_id, result) in roadlink_ids.iter().zip(results) {
            let feature = match result {
                Ok(feature) => feature,
                Err(e) => {
                    error!(roadlink_id = %roadlink_id, error = %e, "Failed to fetch roadlink, skipping");
                    continue;
                }
            };

            // A roadlink without properties is useless downstream.
            if feature.get("properties").is_none() {
                warn!(roadlink_id = %roadlink_id, "Roadlink has no properties, dropping");
                continue;
            }

            update_latest_timestamp(latest_timestamp, &feature);
            features.push(without_geometry(&feature));
            joined += 1;
        }
        debug!(joined, "Appended roadlink features");
    }

    /// Build the immutable query plan for a route type.
    ///
    /// The collection sets are static configuration, not user input. The
    /// match is exhaustive: adding a route type forces a plan decision
    /// here at compile time.
    fn fetch_plan(
        &self,
        route_type: RouteType,
        usrn: &str,
        bbox: Option<&str>,
        bbox_crs: Option<&str>,
        crs: Option<&str>,
    ) -> Result<Vec<CollectionQuery>> {
        match route_type {
            RouteType::StreetInfo => Ok(self.street_queries(usrn)),
            RouteType::LandUse => self.land_use_queries(bbox, bbox_crs, crs),
            RouteType::CollaborativeStreetWorks => {
                let mut plan = self.street_queries(usrn);
                plan.extend(self.land_use_queries(bbox, bbox_crs, crs)?);
                Ok(plan)
            }
        }
    }

    fn street_queries(&self, usrn: &str) -> Vec<CollectionQuery> {
        STREET_COLLECTIONS
            .iter()
            .map(|collection_id| CollectionQuery::by_attribute(collection_id, "usrn", usrn))
            .collect()
    }

    fn land_use_queries(
        &self,
        bbox: Option<&str>,
        bbox_crs: Option<&str>,
        crs: Option<&str>,
    ) -> Result<Vec<CollectionQuery>> {
        let bbox = bbox.filter(|b| !b.is_empty()).ok_or_else(|| {
            Error::Validation("A valid bbox is required for land use queries".to_string())
        })?;
        let bbox_crs = bbox_crs.unwrap_or(&self.config.default_crs);
        let crs = crs.unwrap_or(&self.config.default_crs);
        Ok(LAND_USE_COLLECTIONS
            .iter()
            .map(|collection_id| CollectionQuery::by_bbox(collection_id, bbox, bbox_crs, crs))
            .collect())
    }
}

/// Copy a feature without its `geometry` key.
///
/// A pure transform: the source value is untouched and remaining key
/// order is preserved, keeping the output deterministic.
fn without_geometry(feature: &Value) -> Value {
    match feature.as_object() {
        Some(map) => Value::Object(
            map.iter()
                .filter(|(key, _)| key.as_str() != "geometry")
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        ),
        None => feature.clone(),
    }
}

/// Harvest `properties.roadlinkreference[].roadlinkid` into the join list.
fn collect_roadlink_ids(feature: &Value, roadlink_ids: &mut Vec<String>) {
    let Some(references) = feature
        .pointer("/properties/roadlinkreference")
        .and_then(Value::as_array)
    else {
        return;
    };
    for reference in references {
        match reference.get("roadlinkid") {
            Some(Value::String(id)) => roadlink_ids.push(id.clone()),
            Some(Value::Number(id)) => roadlink_ids.push(id.to_string()),
            _ => {}
        }
    }
}

/// Keep the lexicographically greatest non-empty `timeStamp`.
///
/// Upstream timestamps are fixed-width ISO-8601 UTC strings, for which
/// string order matches chronological order.
fn update_latest_timestamp(latest: &mut Option<String>, body: &Value) {
    let Some(timestamp) = body.get("timeStamp").and_then(Value::as_str) else {
        return;
    };
    if timestamp.is_empty() {
        return;
    }
    let newer = match latest {
        Some(current) => timestamp > current.as_str(),
        None => true,
    };
    if newer {
        *latest = Some(timestamp.to_string());
    }
}
