//! Bounding-box resolution for a USRN
//!
//! Looks up the stored street geometry, applies a square-cap,
//! non-single-sided buffer, and returns the buffer's axis-aligned bounds
//! with every coordinate rounded to the nearest integer. The rounding is
//! part of the contract: consumers match the rendered bbox string exactly.
//!
//! Square caps matter here: a rounded buffer clips the corners of
//! rectangular street extents, under-covering the very parcels the
//! land-use query is meant to catch.

use std::str::FromStr;
use std::sync::Arc;

use geo_types::{Coord, Geometry};
use sqlx::SqlitePool;

use streetwise_common::config::AppConfig;
use streetwise_common::types::BoundingBox;
use streetwise_common::{Error, Result};

use crate::db;

/// Resolves a buffered bounding box from a USRN's stored geometry.
pub struct BboxResolver {
    pool: SqlitePool,
    config: Arc<AppConfig>,
}

impl BboxResolver {
    pub fn new(pool: SqlitePool, config: Arc<AppConfig>) -> Self {
        Self { pool, config }
    }

    /// Resolve the buffered bounding box for a USRN.
    ///
    /// Fails with `NotFound` when the store has no geometry row for the
    /// USRN; store and configuration failures propagate unmodified. No
    /// retries, no caching.
    pub async fn resolve(&self, usrn: &str, buffer_distance: f64) -> Result<BoundingBox> {
        let wkt_text = db::geometry::geometry_for_usrn(
            &self.pool,
            &self.config.store_schema,
            &self.config.store_table,
            usrn,
        )
        .await?
        .ok_or_else(|| Error::NotFound(format!("No geometry found for USRN: {usrn}")))?;

        let geometry = parse_wkt(&wkt_text)?;
        let bounds = buffered_bounds(&geometry, buffer_distance)
            .ok_or_else(|| Error::Internal(format!("Empty geometry for USRN: {usrn}")))?;

        let bbox = bounds.to_bounding_box();
        tracing::debug!(usrn, %bbox, "Resolved buffered bounding box");
        Ok(bbox)
    }
}

fn parse_wkt(text: &str) -> Result<Geometry<f64>> {
    let parsed = wkt::Wkt::<f64>::from_str(text)
        .map_err(|e| Error::Internal(format!("Invalid WKT geometry: {e}")))?;
    Geometry::try_from(parsed)
        .map_err(|e| Error::Internal(format!("Unsupported WKT geometry: {e}")))
}

/// Running axis-aligned bounds.
#[derive(Debug, Clone, Copy)]
struct Bounds {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
}

impl Bounds {
    fn empty() -> Self {
        Self {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        }
    }

    fn is_empty(&self) -> bool {
        self.min_x > self.max_x
    }

    fn include(&mut self, x: f64, y: f64) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    fn to_bounding_box(self) -> BoundingBox {
        BoundingBox {
            min_x: self.min_x.round() as i64,
            min_y: self.min_y.round() as i64,
            max_x: self.max_x.round() as i64,
            max_y: self.max_y.round() as i64,
        }
    }
}

/// Bounds of a square-cap, non-single-sided buffer around a geometry.
///
/// Line work is offset laterally on both sides with square end caps and
/// square (mitre) corners at vertices; rings have no ends, so they take
/// the lateral offset and corner treatment only. Returns `None` for a
/// geometry with no coordinates.
fn buffered_bounds(geometry: &Geometry<f64>, distance: f64) -> Option<Bounds> {
    let mut bounds = Bounds::empty();
    extend_geometry(&mut bounds, geometry, distance);
    (!bounds.is_empty()).then_some(bounds)
}

fn extend_geometry(bounds: &mut Bounds, geometry: &Geometry<f64>, d: f64) {
    match geometry {
        Geometry::Point(point) => extend_point(bounds, point.0, d),
        Geometry::MultiPoint(points) => {
            for point in &points.0 {
                extend_point(bounds, point.0, d);
            }
        }
        Geometry::Line(line) => extend_path(bounds, &[line.start, line.end], d, false),
        Geometry::LineString(line) => extend_path(bounds, &line.0, d, false),
        Geometry::MultiLineString(lines) => {
            for line in &lines.0 {
                extend_path(bounds, &line.0, d, false);
            }
        }
        Geometry::Polygon(polygon) => extend_path(bounds, &polygon.exterior().0, d, true),
        Geometry::MultiPolygon(polygons) => {
            for polygon in &polygons.0 {
                extend_path(bounds, &polygon.exterior().0, d, true);
            }
        }
        Geometry::Rect(rect) => extend_path(bounds, &rect.to_polygon().exterior().0, d, true),
        Geometry::Triangle(triangle) => {
            extend_path(bounds, &triangle.to_polygon().exterior().0, d, true)
        }
        Geometry::GeometryCollection(collection) => {
            for member in &collection.0 {
                extend_geometry(bounds, member, d);
            }
        }
    }
}

fn extend_point(bounds: &mut Bounds, coord: Coord<f64>, d: f64) {
    bounds.include(coord.x - d, coord.y - d);
    bounds.include(coord.x + d, coord.y + d);
}

/// Offset a path by `d` on both sides.
///
/// Open paths get square end caps (corners at `d` along and `d` across the
/// end segment); every vertex gets square-corner offset points on both
/// sides. Closed rings skip the caps and treat the first/last vertex as an
/// ordinary corner.
fn extend_path(bounds: &mut Bounds, coords: &[Coord<f64>], d: f64, closed: bool) {
    // Rings conventionally repeat the first coordinate; drop the duplicate.
    let coords = match coords.split_last() {
        Some((last, rest)) if closed && coords.len() > 1 && *last == coords[0] => rest,
        _ => coords,
    };

    if coords.len() < 2 {
        if let Some(coord) = coords.first() {
            extend_point(bounds, *coord, d);
        }
        return;
    }

    // Lateral offsets of every segment.
    for pair in coords.windows(2) {
        extend_segment_sides(bounds, pair[0], pair[1], d);
    }
    if closed {
        extend_segment_sides(bounds, coords[coords.len() - 1], coords[0], d);
    }

    // Square end caps for open paths.
    if !closed {
        if let Some((ux, uy)) = unit_direction(coords[0], coords[1]) {
            extend_cap(bounds, coords[0], -ux, -uy, d);
        }
        if let Some((ux, uy)) = unit_direction(coords[coords.len() - 2], coords[coords.len() - 1]) {
            extend_cap(bounds, coords[coords.len() - 1], ux, uy, d);
        }
    }

    // Square (mitre) corners at the remaining vertices.
    let n = coords.len();
    let corner_range = if closed { 0..n } else { 1..n - 1 };
    for i in corner_range {
        let prev = coords[(i + n - 1) % n];
        let vertex = coords[i];
        let next = coords[(i + 1) % n];
        extend_corner(bounds, prev, vertex, next, d);
    }
}

fn unit_direction(a: Coord<f64>, b: Coord<f64>) -> Option<(f64, f64)> {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len = (dx * dx + dy * dy).sqrt();
    (len > 0.0).then(|| (dx / len, dy / len))
}

/// Both lateral offset corners at each end of one segment.
fn extend_segment_sides(bounds: &mut Bounds, a: Coord<f64>, b: Coord<f64>, d: f64) {
    let Some((ux, uy)) = unit_direction(a, b) else {
        extend_point(bounds, a, d);
        return;
    };
    let (nx, ny) = (-uy, ux);
    for coord in [a, b] {
        bounds.include(coord.x + d * nx, coord.y + d * ny);
        bounds.include(coord.x - d * nx, coord.y - d * ny);
    }
}

/// Square end cap: the offset extends `d` past the endpoint along the
/// segment direction, with corners `d` to either side.
fn extend_cap(bounds: &mut Bounds, end: Coord<f64>, ux: f64, uy: f64, d: f64) {
    let (cx, cy) = (end.x + d * ux, end.y + d * uy);
    let (nx, ny) = (-uy, ux);
    bounds.include(cx + d * nx, cy + d * ny);
    bounds.include(cx - d * nx, cy - d * ny);
}

/// Square corner at a vertex: the intersection of the two adjacent offset
/// lines, on both sides.
fn extend_corner(bounds: &mut Bounds, prev: Coord<f64>, vertex: Coord<f64>, next: Coord<f64>, d: f64) {
    let (Some((u1x, u1y)), Some((u2x, u2y))) =
        (unit_direction(prev, vertex), unit_direction(vertex, next))
    else {
        return;
    };
    let (n1x, n1y) = (-u1y, u1x);
    let (n2x, n2y) = (-u2y, u2x);

    let denom = 1.0 + (n1x * n2x + n1y * n2y);
    if denom < 1e-9 {
        // Near-reversal: the mitre is unbounded, fall back to capping both
        // segment ends at the vertex.
        extend_cap(bounds, vertex, u1x, u1y, d);
        extend_cap(bounds, vertex, -u2x, -u2y, d);
        return;
    }

    let (mx, my) = ((n1x + n2x) / denom, (n1y + n2y) / denom);
    bounds.include(vertex.x + d * mx, vertex.y + d * my);
    bounds.include(vertex.x - d * mx, vertex.y - d * my);
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;
    use streetwise_common::types::DEFAULT_CRS;

    fn bounds_for(wkt_text: &str, distance: f64) -> BoundingBox {
        let geometry = parse_wkt(wkt_text).unwrap();
        buffered_bounds(&geometry, distance)
            .unwrap()
            .to_bounding_box()
    }

    #[test]
    fn point_expands_to_a_square() {
        let bbox = bounds_for("POINT (10 20)", 50.0);
        assert_eq!(
            bbox,
            BoundingBox {
                min_x: -40,
                min_y: -30,
                max_x: 60,
                max_y: 70
            }
        );
    }

    #[test]
    fn axis_aligned_line_grows_by_twice_the_distance_per_axis() {
        let bbox = bounds_for("LINESTRING (0 0, 100 0)", 50.0);
        assert_eq!(bbox.max_x - bbox.min_x, 100 + 2 * 50);
        assert_eq!(bbox.max_y - bbox.min_y, 2 * 50);
        assert_eq!(
            bbox,
            BoundingBox {
                min_x: -50,
                min_y: -50,
                max_x: 150,
                max_y: 50
            }
        );
    }

    #[test]
    fn right_angle_corner_keeps_square_extents() {
        // An L-shaped street: the square corner treatment must not extend
        // the bounds past extent + 2d on either axis.
        let bbox = bounds_for("LINESTRING (0 0, 100 0, 100 100)", 50.0);
        assert_eq!(
            bbox,
            BoundingBox {
                min_x: -50,
                min_y: -50,
                max_x: 150,
                max_y: 150
            }
        );
    }

    #[test]
    fn diagonal_line_gets_square_caps() {
        // 45 degree segment with d = sqrt(2): each cap corner lands one
        // unit past the endpoint on both axes.
        let bbox = bounds_for("LINESTRING (0 0, 10 10)", std::f64::consts::SQRT_2);
        assert_eq!(
            bbox,
            BoundingBox {
                min_x: -2,
                min_y: -2,
                max_x: 12,
                max_y: 12
            }
        );
    }

    #[test]
    fn polygon_grows_by_the_distance_per_side() {
        let bbox = bounds_for("POLYGON ((0 0, 10 0, 10 10, 0 10, 0 0))", 50.0);
        assert_eq!(
            bbox,
            BoundingBox {
                min_x: -50,
                min_y: -50,
                max_x: 60,
                max_y: 60
            }
        );
    }

    #[test]
    fn multilinestring_merges_part_bounds() {
        let bbox = bounds_for("MULTILINESTRING ((0 0, 10 0), (50 50, 60 50))", 10.0);
        assert_eq!(
            bbox,
            BoundingBox {
                min_x: -10,
                min_y: -10,
                max_x: 70,
                max_y: 60
            }
        );
    }

    #[test]
    fn coordinates_round_to_nearest_integer() {
        let bbox = bounds_for("POINT (0.1 0.1)", 2.3);
        // -2.2 rounds to -2, 2.4 rounds to 2: rounded, not truncated.
        assert_eq!(
            bbox,
            BoundingBox {
                min_x: -2,
                min_y: -2,
                max_x: 2,
                max_y: 2
            }
        );
    }

    fn test_config(schema: &str, table: &str) -> AppConfig {
        AppConfig {
            bind_address: "127.0.0.1:8080".to_string(),
            ngd_base_url: "https://api.example.test/features/v1".to_string(),
            ngd_api_key: "test-key".to_string(),
            fetch_timeout_secs: 5,
            store_url: "sqlite::memory:".to_string(),
            store_schema: schema.to_string(),
            store_table: table.to_string(),
            default_crs: DEFAULT_CRS.to_string(),
            buffer_distance: 50.0,
            summary_base_url: "https://api.example.test/v1".to_string(),
            summary_api_key: "test-summary-key".to_string(),
            summary_model: "test-model".to_string(),
        }
    }

    async fn seeded_resolver() -> BboxResolver {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::query("CREATE TABLE usrn_geometries (usrn TEXT PRIMARY KEY, geometry TEXT NOT NULL)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO usrn_geometries (usrn, geometry) VALUES (?, ?)")
            .bind("12345678")
            .bind("LINESTRING (0 0, 100 0)")
            .execute(&pool)
            .await
            .unwrap();
        BboxResolver::new(pool, Arc::new(test_config("main", "usrn_geometries")))
    }

    #[tokio::test]
    async fn resolves_buffered_bbox_from_the_store() {
        let resolver = seeded_resolver().await;
        let bbox = resolver.resolve("12345678", 50.0).await.unwrap();
        assert_eq!(bbox.to_string(), "-50,-50,150,50");
    }

    #[tokio::test]
    async fn unknown_usrn_is_not_found() {
        let resolver = seeded_resolver().await;
        let err = resolver.resolve("99999999", 50.0).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(msg) if msg.contains("99999999")));
    }
}
