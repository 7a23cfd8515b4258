//! `GeoJSON` to [`MultiPolygon`] conversion.
//!
//! Accepts bare geometries, features, and feature collections (first
//! feature wins). Handles both `Polygon` and `MultiPolygon` geometry
//! types; anything else is not a region and yields `None`.

use geo::MultiPolygon;
use geojson::GeoJson;

/// Parses a `GeoJSON` string into a [`MultiPolygon`].
#[must_use]
pub fn parse_geojson_to_multipolygon(geojson_str: &str) -> Option<MultiPolygon<f64>> {
    let geojson: GeoJson = geojson_str.parse().ok()?;
    geojson_to_multipolygon(&geojson)
}

/// Extracts a [`MultiPolygon`] from a parsed [`GeoJson`] value.
#[must_use]
pub fn geojson_to_multipolygon(geojson: &GeoJson) -> Option<MultiPolygon<f64>> {
    let geometry = match geojson {
        GeoJson::Geometry(geometry) => geometry.clone(),
        GeoJson::Feature(feature) => feature.geometry.clone()?,
        GeoJson::FeatureCollection(collection) => {
            collection.features.first()?.geometry.clone()?
        }
    };
    geometry_to_multipolygon(&geometry)
}

/// Converts a `GeoJSON` geometry into a [`MultiPolygon`].
#[must_use]
pub fn geometry_to_multipolygon(geometry: &geojson::Geometry) -> Option<MultiPolygon<f64>> {
    let geo_geometry: geo::Geometry<f64> = geometry.clone().try_into().ok()?;
    match geo_geometry {
        geo::Geometry::MultiPolygon(multi_polygon) => Some(multi_polygon),
        geo::Geometry::Polygon(polygon) => Some(MultiPolygon(vec![polygon])),
        _ => None,
    }
}

/// Converts a [`MultiPolygon`] into a `GeoJSON` geometry for the wire.
#[must_use]
pub fn multipolygon_to_geometry(multi_polygon: &MultiPolygon<f64>) -> geojson::Geometry {
    geojson::Geometry::new(geojson::Value::from(multi_polygon))
}
