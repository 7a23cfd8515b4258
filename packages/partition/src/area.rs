//! Exact geodesic area for lon/lat polygons.
//!
//! Reducer output arrives in square meters; results are reported in
//! hectares rounded to 2 decimals. The rounding happens exactly once, at
//! the output boundary, so summed partition areas never compound rounding
//! error.

use geo::{GeodesicArea, MultiPolygon};

/// Exact geodesic area of a lon/lat geometry in square meters.
#[must_use]
pub fn geodesic_area_m2(geometry: &MultiPolygon<f64>) -> f64 {
    geometry.geodesic_area_unsigned()
}

/// Converts square meters to hectares rounded to 2 decimal places.
///
/// Output-boundary conversion only; intermediate sums stay in square
/// meters.
#[must_use]
pub fn squaremeters_to_ha(value: f64) -> f64 {
    (value / 10_000.0 * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use geo::polygon;

    use super::*;

    #[test]
    fn converts_and_rounds_to_two_decimals() {
        assert!((squaremeters_to_ha(10_000.0) - 1.0).abs() < f64::EPSILON);
        assert!((squaremeters_to_ha(123_456.0) - 12.35).abs() < f64::EPSILON);
        assert!((squaremeters_to_ha(0.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn equatorial_square_is_roughly_a_degree_squared() {
        // 0.01 x 0.01 degrees at the equator is about 1.11 km x 1.11 km.
        let geometry = MultiPolygon(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 0.01, y: 0.0),
            (x: 0.01, y: 0.01),
            (x: 0.0, y: 0.01),
            (x: 0.0, y: 0.0),
        ]]);
        let area = geodesic_area_m2(&geometry);
        assert!(
            (1.1e6..1.3e6).contains(&area),
            "unexpected geodesic area {area}"
        );
    }
}
