#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geostore client.
//!
//! Resolves geometry identifiers (geostore hashes, administrative codes,
//! protected-area ids, concession ids) to a polygon plus its exact area
//! in hectares. The service is a black box: this crate only knows its
//! response envelope and its 404 convention.

pub mod simplify;

use geo::MultiPolygon;
use serde::Deserialize;
use thiserror::Error;

use canopy_partition::convert::geojson_to_multipolygon;

/// Errors from geometry resolution.
#[derive(Debug, Error)]
pub enum GeostoreError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The identifier does not exist upstream.
    #[error("Geostore '{id}' not found")]
    NotFound {
        /// The identifier that failed to resolve.
        id: String,
    },

    /// The service reported a non-404 error.
    #[error("Geostore error: {detail}")]
    Remote {
        /// The service's error detail.
        detail: String,
    },

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },
}

/// A resolved geometry and its exact area.
#[derive(Debug, Clone)]
pub struct ResolvedGeometry {
    /// The region polygon(s) in lon/lat.
    pub geometry: MultiPolygon<f64>,
    /// Exact area in hectares, as reported by the geostore.
    pub area_ha: f64,
}

/// Client for the geostore geometry-resolution service.
pub struct GeostoreClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    errors: Vec<EnvelopeError>,
    #[serde(default)]
    data: Option<EnvelopeData>,
}

#[derive(Debug, Deserialize)]
struct EnvelopeError {
    #[serde(default)]
    status: Option<u16>,
    #[serde(default)]
    detail: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EnvelopeData {
    attributes: Attributes,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Attributes {
    geojson: serde_json::Value,
    area_ha: f64,
}

impl GeostoreClient {
    /// Creates a client against the given base URL.
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Resolves a geostore hash.
    ///
    /// # Errors
    ///
    /// Returns [`GeostoreError::NotFound`] for unknown hashes and other
    /// [`GeostoreError`] variants for transport or envelope failures.
    pub async fn get(&self, hash: &str) -> Result<ResolvedGeometry, GeostoreError> {
        self.fetch(&format!("/geostore/{hash}"), hash).await
    }

    /// Resolves a national, subnational, or regional administrative area.
    ///
    /// Large national boundaries are requested pre-simplified using the
    /// per-country hints in [`simplify`]; simplification affects call
    /// cost only, never which area is meant.
    ///
    /// # Errors
    ///
    /// Returns [`GeostoreError`] as for [`Self::get`].
    pub async fn get_admin(
        &self,
        iso: &str,
        id1: Option<u32>,
        id2: Option<u32>,
    ) -> Result<ResolvedGeometry, GeostoreError> {
        let mut path = format!("/geostore/admin/{iso}");
        if let Some(id1) = id1 {
            path.push_str(&format!("/{id1}"));
            if let Some(id2) = id2 {
                path.push_str(&format!("/{id2}"));
            }
        }
        if id1.is_none()
            && let Some(factor) = simplify::admin_simplification(iso)
        {
            path.push_str(&format!("?simplify={factor}"));
        }
        self.fetch(&path, iso).await
    }

    /// Resolves a protected area by WDPA id.
    ///
    /// # Errors
    ///
    /// Returns [`GeostoreError`] as for [`Self::get`].
    pub async fn get_wdpa(&self, wdpa_id: u64) -> Result<ResolvedGeometry, GeostoreError> {
        self.fetch(&format!("/geostore/wdpa/{wdpa_id}"), &wdpa_id.to_string())
            .await
    }

    /// Resolves a concession area by use table and id.
    ///
    /// # Errors
    ///
    /// Returns [`GeostoreError`] as for [`Self::get`].
    pub async fn get_use(
        &self,
        table: &str,
        use_id: u64,
    ) -> Result<ResolvedGeometry, GeostoreError> {
        self.fetch(
            &format!("/geostore/use/{table}/{use_id}"),
            &format!("{table}/{use_id}"),
        )
        .await
    }

    async fn fetch(&self, path: &str, id: &str) -> Result<ResolvedGeometry, GeostoreError> {
        let url = format!("{}{path}", self.base_url);
        log::debug!("Resolving geostore geometry via {path}");
        let response = self.client.get(&url).send().await?;
        let body: serde_json::Value = response.json().await?;
        parse_envelope(&body, id)
    }
}

/// Parses a geostore response envelope.
fn parse_envelope(body: &serde_json::Value, id: &str) -> Result<ResolvedGeometry, GeostoreError> {
    let envelope: Envelope =
        serde_json::from_value(body.clone()).map_err(|e| GeostoreError::Parse {
            message: format!("Malformed geostore envelope: {e}"),
        })?;

    if let Some(error) = envelope.errors.first() {
        if error.status == Some(404) {
            return Err(GeostoreError::NotFound { id: id.to_string() });
        }
        return Err(GeostoreError::Remote {
            detail: error
                .detail
                .clone()
                .unwrap_or_else(|| "unknown geostore error".to_string()),
        });
    }

    let attributes = envelope
        .data
        .ok_or_else(|| GeostoreError::Parse {
            message: "Geostore envelope missing data".to_string(),
        })?
        .attributes;

    let geojson: geojson::GeoJson =
        serde_json::from_value(attributes.geojson).map_err(|e| GeostoreError::Parse {
            message: format!("Malformed geostore geojson: {e}"),
        })?;
    let geometry = geojson_to_multipolygon(&geojson).ok_or_else(|| GeostoreError::Parse {
        message: "Geostore geojson is not a polygon".to_string(),
    })?;

    Ok(ResolvedGeometry {
        geometry,
        area_ha: attributes.area_ha,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(geojson: serde_json::Value, area_ha: f64) -> serde_json::Value {
        serde_json::json!({
            "data": { "attributes": { "geojson": geojson, "areaHa": area_ha } }
        })
    }

    #[test]
    fn parses_a_resolved_polygon() {
        let body = envelope(
            serde_json::json!({
                "type": "Polygon",
                "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]]
            }),
            1234.56,
        );
        let resolved = parse_envelope(&body, "abc").unwrap();
        assert_eq!(resolved.geometry.0.len(), 1);
        assert!((resolved.area_ha - 1234.56).abs() < f64::EPSILON);
    }

    #[test]
    fn maps_404_to_not_found() {
        let body = serde_json::json!({ "errors": [{ "status": 404, "detail": "GeoStore not found" }] });
        assert!(matches!(
            parse_envelope(&body, "missing"),
            Err(GeostoreError::NotFound { .. })
        ));
    }

    #[test]
    fn other_errors_keep_their_detail() {
        let body = serde_json::json!({ "errors": [{ "status": 500, "detail": "upstream exploded" }] });
        let Err(GeostoreError::Remote { detail }) = parse_envelope(&body, "x") else {
            panic!("expected remote error");
        };
        assert_eq!(detail, "upstream exploded");
    }

    #[test]
    fn non_polygon_geojson_is_a_parse_error() {
        let body = envelope(
            serde_json::json!({ "type": "Point", "coordinates": [0.0, 0.0] }),
            1.0,
        );
        assert!(matches!(
            parse_envelope(&body, "pt"),
            Err(GeostoreError::Parse { .. })
        ));
    }
}
