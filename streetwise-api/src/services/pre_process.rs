//! Pre-processing transforms between aggregation and summarising
//!
//! Shrinks an aggregated feature collection to the fields the downstream
//! summariser actually uses. Pure functions over JSON values: the input is
//! never mutated.

use serde_json::{json, Map, Value};

/// Simplify street-info aggregation output.
///
/// Extracts the base street record, splits the remaining features into
/// designation and roadlink records, and drops null fields from each
/// record. Returns the input unchanged when it holds no features or no
/// street feature can be identified.
pub fn street_info(data: &Value) -> Value {
    let Some(features) = data
        .get("features")
        .and_then(Value::as_array)
        .filter(|features| !features.is_empty())
    else {
        return data.clone();
    };

    // The street feature is normally first, but scan to be safe.
    let Some(street_props) = features
        .iter()
        .filter_map(|feature| feature.get("properties").and_then(Value::as_object))
        .find(|props| props.get("usrn").is_some_and(|usrn| !usrn.is_null()))
    else {
        return data.clone();
    };

    let base_street = json!({
        "usrn": street_props.get("usrn"),
        "street_name": street_props.get("designatedname1_text"),
        "town": street_props.get("townname1_text"),
        "authority": {
            "name": street_props.get("responsibleauthority_name"),
            "area": street_props.get("administrativearea1_text"),
        },
        "geometry": {"length": street_props.get("geometry_length")},
        "operational_state": street_props.get("operationalstate"),
        "operational_state_date": street_props.get("operationalstatedate"),
    });

    let mut designations: Vec<Value> = Vec::new();
    let mut roadlinks: Vec<Value> = Vec::new();

    for feature in features {
        let Some(props) = feature.get("properties").and_then(Value::as_object) else {
            continue;
        };

        // Skip the base street feature itself.
        if props.get("description").and_then(Value::as_str) == Some("Designated Street Name") {
            continue;
        }

        if is_roadlink(props) {
            roadlinks.push(prune_nulls(json!({
                "id": props.get("osid"),
                "name": props.get("name1_text"),
                "description": props.get("description"),
                "classification": {
                    "type": props.get("roadclassification"),
                    "number": props.get("roadclassificationnumber"),
                    "hierarchy": props.get("routehierarchy"),
                },
                "physical": {
                    "length_m": props.get("geometry_length_m"),
                    "width_avg_m": props.get("roadwidth_average"),
                    "width_min_m": props.get("roadwidth_minimum"),
                },
                "directionality": props.get("directionality"),
                "operational_state": props.get("operationalstate"),
                "infrastructure": {
                    "pavement_left_m": props.get("presenceofpavement_left_m"),
                    "pavement_right_m": props.get("presenceofpavement_right_m"),
                    "pavement_coverage_pct": props.get("presenceofpavement_overallpercentage"),
                    "cycle_lane_m": props.get("presenceofcyclelane_overall_m"),
                    "cycle_lane_coverage_pct": props.get("presenceofcyclelane_overallpercentage"),
                    "bus_lane_m": props.get("presenceofbuslane_overall_m"),
                    "bus_lane_coverage_pct": props.get("presenceofbuslane_overallpercentage"),
                    "street_lighting": props.get("presenceofstreetlight_coverage"),
                },
            })));
        } else {
            designations.push(prune_nulls(json!({
                "type": props.get("description"),
                "designation": props.get("designation"),
                "timeframe": props.get("timeinterval"),
                "location": props.get("locationdescription"),
                "details": props.get("designationdescription"),
                "effective_date": props.get("effectivestartdate"),
                "end_date": props.get("effectiveenddate"),
            })));
        }
    }

    let mut result = Map::new();
    result.insert("street".to_string(), base_street);
    result.insert("designations".to_string(), Value::Array(designations));
    result.insert(
        "metadata".to_string(),
        json!({
            "timestamp": data.get("timeStamp"),
            "number_returned": data.get("numberReturned"),
        }),
    );
    if !roadlinks.is_empty() {
        result.insert("roadlinks".to_string(), Value::Array(roadlinks));
    }
    Value::Object(result)
}

/// Simplify land-use aggregation output into per-property records plus
/// summary statistics. Returns the input unchanged when it holds no
/// features.
pub fn land_use(data: &Value) -> Value {
    let Some(features) = data
        .get("features")
        .and_then(Value::as_array)
        .filter(|features| !features.is_empty())
    else {
        return data.clone();
    };

    let mut simplified: Vec<Value> = Vec::new();
    let mut total_area = 0.0_f64;
    let mut residential_count = 0u64;
    let mut commercial_count = 0u64;

    for feature in features {
        let props = feature
            .get("properties")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        let area = props.get("geometry_area").and_then(Value::as_f64);
        if let Some(area) = area {
            total_area += area;
        }

        let tier_a = props.get("oslandusetiera");
        if classification_matches(tier_a, "Residential") {
            residential_count += 1;
        } else if classification_matches(tier_a, "Commercial") {
            commercial_count += 1;
        }

        simplified.push(json!({
            "property": {
                "name": props.get("name1_text"),
                "secondary_name": props.get("name2_text"),
                "description": props.get("description"),
                "area": props.get("geometry_area"),
            },
            "classification": {
                "type": tier_a,
                "subtypes": props.get("oslandusetierb").cloned().unwrap_or_else(|| json!([])),
                "status": props.get("changetype"),
            },
        }));
    }

    let count = simplified.len();
    let statistics = json!({
        "total_properties": count,
        "total_area": round2(total_area),
        "residential_count": residential_count,
        "commercial_count": commercial_count,
        "average_property_size": if count > 0 { round2(total_area / count as f64) } else { 0.0 },
    });

    json!({
        "features": simplified,
        "statistics": statistics,
        "metadata": {
            "count": data.get("numberReturned"),
            "timestamp": data.get("timeStamp"),
        },
    })
}

/// Roadlinks carry an `osid`, or a `toid` together with a road
/// classification; designation records carry neither.
fn is_roadlink(props: &Map<String, Value>) -> bool {
    props.contains_key("osid")
        || (props.contains_key("toid") && props.contains_key("roadclassification"))
}

fn classification_matches(tier: Option<&Value>, needle: &str) -> bool {
    match tier {
        Some(Value::String(value)) => value.contains(needle),
        Some(Value::Array(values)) => values.iter().any(|v| v.as_str() == Some(needle)),
        _ => false,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Recursively drop null-valued keys from objects.
fn prune_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, prune_nulls(v)))
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn street_collection() -> Value {
        json!({
            "type": "FeatureCollection",
            "numberReturned": 3,
            "timeStamp": "2024-06-01T00:00:00Z",
            "features": [
                {
                    "id": "street",
                    "properties": {
                        "usrn": "12345678",
                        "designatedname1_text": "High Street",
                        "townname1_text": "Exampletown",
                        "responsibleauthority_name": "Example Council",
                        "administrativearea1_text": "Exampleshire",
                        "geometry_length": 420.5,
                        "operationalstate": "Open",
                        "description": "Designated Street Name",
                    },
                },
                {
                    "id": "designation",
                    "properties": {
                        "description": "Special Designation Area",
                        "designation": "Traffic Sensitive Street",
                        "timeinterval": "Mon-Fri 07:30-09:30",
                        "locationdescription": null,
                        "effectivestartdate": "2020-01-01",
                    },
                },
                {
                    "id": "roadlink",
                    "properties": {
                        "osid": "link-a",
                        "name1_text": "High Street",
                        "description": "Main Carriageway",
                        "roadclassification": "A Road",
                        "roadwidth_average": 7.2,
                        "roadwidth_minimum": null,
                        "directionality": "Both Directions",
                    },
                },
            ],
        })
    }

    #[test]
    fn street_info_extracts_base_street_and_splits_records() {
        let simplified = street_info(&street_collection());

        assert_eq!(simplified["street"]["usrn"], "12345678");
        assert_eq!(simplified["street"]["street_name"], "High Street");
        assert_eq!(simplified["street"]["authority"]["name"], "Example Council");

        let designations = simplified["designations"].as_array().unwrap();
        assert_eq!(designations.len(), 1);
        assert_eq!(designations[0]["designation"], "Traffic Sensitive Street");
        // Null fields are pruned from records.
        assert!(designations[0].get("location").is_none());
        assert!(designations[0].get("end_date").is_none());

        let roadlinks = simplified["roadlinks"].as_array().unwrap();
        assert_eq!(roadlinks.len(), 1);
        assert_eq!(roadlinks[0]["id"], "link-a");
        assert_eq!(roadlinks[0]["classification"]["type"], "A Road");
        assert_eq!(roadlinks[0]["physical"]["width_avg_m"], 7.2);
        assert!(roadlinks[0]["physical"].get("width_min_m").is_none());

        assert_eq!(simplified["metadata"]["timestamp"], "2024-06-01T00:00:00Z");
        assert_eq!(simplified["metadata"]["number_returned"], 3);
    }

    #[test]
    fn street_info_omits_roadlinks_key_when_none_found() {
        let mut data = street_collection();
        data["features"].as_array_mut().unwrap().pop();
        let simplified = street_info(&data);
        assert!(simplified.get("roadlinks").is_none());
        assert!(simplified.get("designations").is_some());
    }

    #[test]
    fn street_info_passes_empty_collections_through() {
        let data = json!({
            "type": "FeatureCollection",
            "numberReturned": 0,
            "timeStamp": "",
            "features": [],
        });
        assert_eq!(street_info(&data), data);
    }

    #[test]
    fn land_use_computes_statistics() {
        let data = json!({
            "type": "FeatureCollection",
            "numberReturned": 2,
            "timeStamp": "2024-02-01T00:00:00Z",
            "features": [
                {
                    "properties": {
                        "name1_text": "Corner Shop",
                        "description": "Retail",
                        "geometry_area": 49.5,
                        "oslandusetiera": ["Commercial"],
                        "oslandusetierb": ["Retail"],
                    },
                },
                {
                    "properties": {
                        "description": "Dwelling",
                        "geometry_area": 100.5,
                        "oslandusetiera": "Residential Accommodation",
                    },
                },
            ],
        });

        let simplified = land_use(&data);
        let stats = &simplified["statistics"];
        assert_eq!(stats["total_properties"], 2);
        assert_eq!(stats["total_area"], 150.0);
        assert_eq!(stats["residential_count"], 1);
        assert_eq!(stats["commercial_count"], 1);
        assert_eq!(stats["average_property_size"], 75.0);

        let features = simplified["features"].as_array().unwrap();
        assert_eq!(features[0]["property"]["name"], "Corner Shop");
        assert_eq!(features[1]["classification"]["subtypes"], json!([]));
        assert_eq!(simplified["metadata"]["count"], 2);
    }

    #[test]
    fn land_use_passes_empty_collections_through() {
        let data = json!({
            "type": "FeatureCollection",
            "numberReturned": 0,
            "timeStamp": "",
            "features": [],
        });
        assert_eq!(land_use(&data), data);
    }
}
