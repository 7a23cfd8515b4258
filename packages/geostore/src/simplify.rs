//! Per-country boundary simplification hints.
//!
//! National boundaries with very high vertex counts are requested
//! pre-simplified so the downstream reduction stays within backend
//! complexity limits. The hint is a tolerance passed to the geostore's
//! `simplify` query parameter; countries not listed are fetched as-is.

/// Simplification tolerance for a national boundary, if the country is
/// large enough to need one.
#[must_use]
pub fn admin_simplification(iso: &str) -> Option<f64> {
    let tolerance = match iso {
        // Coastline-heavy giants.
        "RUS" | "CAN" => 0.1,
        "USA" | "CHN" | "BRA" | "AUS" => 0.05,
        "IDN" | "NOR" | "CHL" | "GRL" => 0.02,
        "ARG" | "IND" | "KAZ" | "COD" | "MEX" | "SWE" | "FIN" | "PHL" => 0.01,
        _ => return None,
    };
    Some(tolerance)
}
