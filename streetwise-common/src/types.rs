//! Core data model shared across the Streetwise services.
//!
//! Everything here is request-scoped: a value is built for one aggregation
//! call and dropped with the response. No shared mutable state exists
//! between concurrent requests.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// Default CRS URI for queries and responses (British National Grid).
pub const DEFAULT_CRS: &str = "http://www.opengis.net/def/crs/EPSG/0/27700";

/// Route type driving which collection query plan is built and whether a
/// bounding box is mandatory.
///
/// `CollaborativeStreetWorks` composes the other two plans; see the
/// aggregator's plan builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteType {
    StreetInfo,
    LandUse,
    CollaborativeStreetWorks,
}

impl RouteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteType::StreetInfo => "street-info",
            RouteType::LandUse => "land-use",
            RouteType::CollaborativeStreetWorks => "collaborative-street-works",
        }
    }
}

impl fmt::Display for RouteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RouteType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "street-info" => Ok(RouteType::StreetInfo),
            "land-use" => Ok(RouteType::LandUse),
            "collaborative-street-works" => Ok(RouteType::CollaborativeStreetWorks),
            other => Err(Error::Validation(format!("Unsupported route type: {other}"))),
        }
    }
}

/// Axis-aligned bounding rectangle in a projected CRS.
///
/// Coordinates are rounded to the nearest integer; consumers rely on that
/// for exact bbox-string matching. Computed once per bbox-filtered request
/// and consumed immediately, never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: i64,
    pub min_y: i64,
    pub max_x: i64,
    pub max_y: i64,
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.min_x, self.min_y, self.max_x, self.max_y)
    }
}

/// Filter half of a collection query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionFilter {
    /// Attribute-equality filter, rendered as `filter=<attr>=<value>`.
    Attribute { name: String, value: String },
    /// Spatial filter, rendered as `bbox`, `bbox-crs` and `crs` parameters.
    Bbox {
        bbox: String,
        bbox_crs: String,
        crs: String,
    },
}

/// One upstream fetch: a collection identifier plus its filter.
///
/// Immutable - constructed once per request by the plan builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionQuery {
    pub collection_id: String,
    pub filter: CollectionFilter,
}

impl CollectionQuery {
    pub fn by_attribute(collection_id: &str, name: &str, value: &str) -> Self {
        Self {
            collection_id: collection_id.to_string(),
            filter: CollectionFilter::Attribute {
                name: name.to_string(),
                value: value.to_string(),
            },
        }
    }

    pub fn by_bbox(collection_id: &str, bbox: &str, bbox_crs: &str, crs: &str) -> Self {
        Self {
            collection_id: collection_id.to_string(),
            filter: CollectionFilter::Bbox {
                bbox: bbox.to_string(),
                bbox_crs: bbox_crs.to_string(),
                crs: crs.to_string(),
            },
        }
    }
}

/// Merged, geometry-stripped aggregation output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub collection_type: String,
    #[serde(rename = "numberReturned")]
    pub number_returned: usize,
    #[serde(rename = "timeStamp")]
    pub time_stamp: String,
    pub features: Vec<Value>,
}

impl FeatureCollection {
    /// Assemble from merged features.
    ///
    /// `numberReturned` always equals `features.len()`; no other
    /// constructor exists, so no code path can break that.
    pub fn new(features: Vec<Value>, time_stamp: Option<String>) -> Self {
        Self {
            collection_type: "FeatureCollection".to_string(),
            number_returned: features.len(),
            time_stamp: time_stamp.unwrap_or_default(),
            features,
        }
    }
}

impl From<FeatureCollection> for Value {
    fn from(collection: FeatureCollection) -> Self {
        let mut map = Map::new();
        map.insert("type".to_string(), Value::String(collection.collection_type));
        map.insert(
            "numberReturned".to_string(),
            Value::from(collection.number_returned),
        );
        map.insert("timeStamp".to_string(), Value::String(collection.time_stamp));
        map.insert("features".to_string(), Value::Array(collection.features));
        Value::Object(map)
    }
}

/// Validate a caller-supplied USRN: non-empty, digits only, at most 20
/// characters.
pub fn validate_usrn(usrn: &str) -> Result<()> {
    if usrn.is_empty() {
        return Err(Error::Validation("A valid usrn is required".to_string()));
    }
    if usrn.len() > 20 || !usrn.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::Validation(format!("Invalid usrn: {usrn}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn route_type_round_trips() {
        for route in [
            RouteType::StreetInfo,
            RouteType::LandUse,
            RouteType::CollaborativeStreetWorks,
        ] {
            assert_eq!(route.as_str().parse::<RouteType>().unwrap(), route);
        }
    }

    #[test]
    fn unknown_route_type_is_a_validation_error() {
        let err = "street-works".parse::<RouteType>().unwrap_err();
        assert!(matches!(err, Error::Validation(msg) if msg.contains("street-works")));
    }

    #[test]
    fn bounding_box_renders_as_comma_separated_integers() {
        let bbox = BoundingBox {
            min_x: -50,
            min_y: -50,
            max_x: 150,
            max_y: 50,
        };
        assert_eq!(bbox.to_string(), "-50,-50,150,50");
    }

    #[test]
    fn feature_collection_counts_its_features() {
        let collection =
            FeatureCollection::new(vec![json!({"id": "a"}), json!({"id": "b"})], None);
        assert_eq!(collection.number_returned, 2);
        assert_eq!(collection.number_returned, collection.features.len());
        assert_eq!(collection.time_stamp, "");
        assert_eq!(collection.collection_type, "FeatureCollection");
    }

    #[test]
    fn feature_collection_serializes_with_api_field_names() {
        let value = Value::from(FeatureCollection::new(
            vec![json!({"id": "a"})],
            Some("2024-06-01T00:00:00Z".to_string()),
        ));
        assert_eq!(value["type"], "FeatureCollection");
        assert_eq!(value["numberReturned"], 1);
        assert_eq!(value["timeStamp"], "2024-06-01T00:00:00Z");
        assert_eq!(value["features"][0]["id"], "a");
    }

    #[test]
    fn usrn_validation_accepts_digits_only() {
        assert!(validate_usrn("12345678").is_ok());
        assert!(validate_usrn("").is_err());
        assert!(validate_usrn("12ab34").is_err());
        assert!(validate_usrn("123456789012345678901").is_err());
    }
}
