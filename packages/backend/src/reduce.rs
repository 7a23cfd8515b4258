//! Region-reduction request and response types.
//!
//! Each request is consumed by exactly one backend call. Histogram keys
//! arrive as stringified pixel values (often float-formatted, sometimes
//! the literal `"null"` for masked pixels); [`parse_code_key`] recovers
//! the integer code.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::expr::ImageExpr;

/// Aggregation operator applied within a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Reducer {
    /// Sum of pixel values.
    Sum,
    /// Count of pixels per distinct value; with `area_weighted`, the
    /// per-value totals are square meters of pixel area instead of raw
    /// counts.
    FrequencyHistogram {
        /// Weight each pixel by its area instead of counting it once.
        area_weighted: bool,
    },
}

/// A single region reduction.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReduceRequest {
    /// The expression to evaluate per pixel.
    pub expression: ImageExpr,
    /// The region to reduce over, as `GeoJSON`.
    pub geometry: geojson::Geometry,
    /// Aggregation operator.
    pub reducer: Reducer,
    /// Pixel scale in meters.
    pub scale_m: f64,
    /// Allow the backend to trade precision for completeness when the
    /// region exceeds its limits.
    pub best_effort: bool,
    /// Maximum pixels this call may examine. `None` is reserved for the
    /// backend default and is never issued by the analysis layer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_pixels: Option<u64>,
}

/// One reduction over a whole collection of regions, aggregated
/// server-side.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReduceRequest {
    /// The expression to evaluate per pixel.
    pub expression: ImageExpr,
    /// The regions to reduce over, as `GeoJSON`.
    pub geometries: Vec<geojson::Geometry>,
    /// Aggregation operator.
    pub reducer: Reducer,
    /// Pixel scale in meters.
    pub scale_m: f64,
    /// Allow the backend to trade precision for completeness.
    pub best_effort: bool,
    /// Maximum pixels the whole batch may examine.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_pixels: Option<u64>,
}

/// A random pixel sample of a mask expression within a region.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleRequest {
    /// The mask expression to sample; nonzero samples count as matches.
    pub expression: ImageExpr,
    /// The region to sample within, as `GeoJSON`.
    pub geometry: geojson::Geometry,
    /// Number of pixels to draw.
    pub num_pixels: u64,
    /// Pixel scale in meters.
    pub scale_m: f64,
    /// Seed for reproducible draws.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

/// Result of a [`Reducer::Sum`] or histogram reduction.
#[derive(Debug, Clone, PartialEq)]
pub enum ReduceOutput {
    /// Summed pixel values (square meters for area images).
    Sum(f64),
    /// Per-value totals keyed by the backend's stringified pixel value.
    Histogram(BTreeMap<String, f64>),
}

/// Result of a pixel sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleOutput {
    /// Samples whose mask value was nonzero.
    pub matched: u64,
    /// Samples actually measured; may fall short of the requested count
    /// near region edges.
    pub sampled: u64,
}

/// Parses a histogram key into an integer pixel code.
///
/// Keys are stringified floats (`"2534.0"`); the fractional part is
/// truncated. The literal `"null"` marks masked pixels and yields
/// `None`.
#[must_use]
pub fn parse_code_key(key: &str) -> Option<i64> {
    if key == "null" {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)]
    key.parse::<f64>().ok().map(|v| v.trunc() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_float_formatted_keys() {
        assert_eq!(parse_code_key("2534.0"), Some(2534));
        assert_eq!(parse_code_key("40"), Some(40));
        assert_eq!(parse_code_key("null"), None);
        assert_eq!(parse_code_key("not-a-code"), None);
    }

    #[test]
    fn requests_serialize_camel_case() {
        let request = ReduceRequest {
            expression: ImageExpr::band("umd/composite", "gain"),
            geometry: geojson::Geometry::new(geojson::Value::Polygon(vec![vec![
                vec![0.0, 0.0],
                vec![1.0, 0.0],
                vec![1.0, 1.0],
                vec![0.0, 0.0],
            ]])),
            reducer: Reducer::Sum,
            scale_m: 30.0,
            best_effort: true,
            max_pixels: Some(10_000),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["reducer"]["kind"], "sum");
        assert_eq!(json["scaleM"], 30.0);
        assert_eq!(json["bestEffort"], true);
        assert_eq!(json["maxPixels"], 10_000);
    }

    #[test]
    fn omitted_budget_is_not_serialized() {
        let request = SampleRequest {
            expression: ImageExpr::PixelArea,
            geometry: geojson::Geometry::new(geojson::Value::Polygon(vec![])),
            num_pixels: 100,
            scale_m: 30.0,
            seed: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("seed").is_none());
    }
}
