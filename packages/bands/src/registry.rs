//! Compile-time registry of raster metrics and land-cover tables.
//!
//! Each table is a TOML file under `registry/` embedded at compile time.
//! [`BandRegistry::load`] parses and validates everything once; unknown
//! metric names or malformed tables fail at startup, not per request.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::BandError;
use crate::encode::DEFAULT_MULTIPLIER;

const METRICS_TOML: &str = include_str!("../registry/metrics.toml");

const LANDCOVER_TOMLS: &[(&str, &str)] = &[("globcover", include_str!("../registry/globcover.toml"))];

/// Metric ids every deployment must define; resolution of these fails
/// fast at registry load rather than mid-request.
const REQUIRED_METRICS: &[&str] = &["treecover", "extent2010", "loss", "gain"];

/// A concrete raster band reference: asset id plus band selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandRef {
    /// Raster asset identifier on the analysis backend.
    pub asset: String,
    /// Band name within the asset (e.g. `loss_30`).
    pub band: String,
}

/// A metric definition from `registry/metrics.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricDef {
    /// Metric identifier (e.g. `"loss"`).
    pub id: String,
    /// Raster asset holding the metric's bands.
    pub asset: String,
    /// Band name, or band-name prefix for thresholded metrics.
    pub band: String,
    /// Whether the band name takes a `_{threshold}` suffix.
    pub thresholded: bool,
}

#[derive(Debug, Deserialize)]
struct MetricsFile {
    metric: Vec<MetricDef>,
}

/// A single land-cover class code and its human-readable name.
#[derive(Debug, Clone, Deserialize)]
pub struct LandcoverClass {
    /// Categorical pixel value.
    pub code: u32,
    /// Class name attached to decoded histogram output.
    pub name: String,
}

/// A land-cover classification table from `registry/`.
#[derive(Debug, Clone, Deserialize)]
pub struct LandcoverTable {
    /// Layer identifier (e.g. `"globcover"`).
    pub id: String,
    /// Raster asset holding the classification.
    pub asset: String,
    /// Band name within the asset.
    pub band: String,
    /// Native resolution the layer should be reduced at, in meters.
    pub scale_m: f64,
    /// Valid classes for this layer.
    #[serde(rename = "class")]
    pub classes: Vec<LandcoverClass>,
}

impl LandcoverTable {
    /// The band reference for this layer.
    #[must_use]
    pub fn band_ref(&self) -> BandRef {
        BandRef {
            asset: self.asset.clone(),
            band: self.band.clone(),
        }
    }

    /// All valid class codes, ascending.
    #[must_use]
    pub fn valid_codes(&self) -> Vec<u32> {
        let mut codes: Vec<u32> = self.classes.iter().map(|c| c.code).collect();
        codes.sort_unstable();
        codes
    }

    /// Looks up the class name for a code.
    #[must_use]
    pub fn name_of(&self, code: u32) -> Option<&str> {
        self.classes
            .iter()
            .find(|c| c.code == code)
            .map(|c| c.name.as_str())
    }
}

/// Parsed and validated band reference tables.
#[derive(Debug, Clone)]
pub struct BandRegistry {
    metrics: BTreeMap<String, MetricDef>,
    landcover: BTreeMap<String, LandcoverTable>,
}

impl BandRegistry {
    /// Parses the embedded TOML tables and validates them.
    ///
    /// # Errors
    ///
    /// Returns [`BandError::Registry`] if a table is malformed, a required
    /// metric is missing, or a land-cover code would collide under the
    /// default joint-encoding multiplier.
    pub fn load() -> Result<Self, BandError> {
        let metrics_file: MetricsFile =
            toml::de::from_str(METRICS_TOML).map_err(|e| BandError::Registry {
                message: format!("Failed to parse metrics table: {e}"),
            })?;

        let mut metrics = BTreeMap::new();
        for metric in metrics_file.metric {
            if metrics.insert(metric.id.clone(), metric).is_some() {
                return Err(BandError::Registry {
                    message: "Duplicate metric id in metrics table".to_string(),
                });
            }
        }
        for required in REQUIRED_METRICS {
            if !metrics.contains_key(*required) {
                return Err(BandError::Registry {
                    message: format!("Missing required metric '{required}'"),
                });
            }
        }

        let mut landcover = BTreeMap::new();
        for (name, raw) in LANDCOVER_TOMLS {
            let table: LandcoverTable =
                toml::de::from_str(raw).map_err(|e| BandError::Registry {
                    message: format!("Failed to parse land-cover table '{name}': {e}"),
                })?;
            if let Some(class) = table.classes.iter().find(|c| c.code >= DEFAULT_MULTIPLIER) {
                return Err(BandError::Registry {
                    message: format!(
                        "Land-cover table '{name}' class code {} exceeds joint multiplier {DEFAULT_MULTIPLIER}",
                        class.code
                    ),
                });
            }
            landcover.insert(table.id.clone(), table);
        }

        log::debug!(
            "Loaded {} metrics and {} land-cover tables",
            metrics.len(),
            landcover.len()
        );

        Ok(Self { metrics, landcover })
    }

    /// Resolves a thresholded metric to a concrete band reference.
    ///
    /// Band names compose by convention: `loss` at threshold 30 selects
    /// `loss_30`. Metrics declared non-thresholded ignore the threshold
    /// convention and must be resolved via [`Self::resolve_plain`].
    ///
    /// # Errors
    ///
    /// Returns [`BandError::Threshold`] for thresholds above 100 and
    /// [`BandError::UnknownMetric`] for names missing from the table.
    pub fn resolve(&self, metric: &str, threshold: u32) -> Result<BandRef, BandError> {
        if threshold > 100 {
            return Err(BandError::Threshold { threshold });
        }
        let def = self.metric_def(metric)?;
        let band = if def.thresholded {
            format!("{}_{threshold}", def.band)
        } else {
            def.band.clone()
        };
        Ok(BandRef {
            asset: def.asset.clone(),
            band,
        })
    }

    /// Resolves a metric that takes no threshold (e.g. `gain`).
    ///
    /// # Errors
    ///
    /// Returns [`BandError::UnknownMetric`] for names missing from the
    /// table.
    pub fn resolve_plain(&self, metric: &str) -> Result<BandRef, BandError> {
        let def = self.metric_def(metric)?;
        Ok(BandRef {
            asset: def.asset.clone(),
            band: def.band.clone(),
        })
    }

    /// Looks up a land-cover classification table by layer id.
    ///
    /// # Errors
    ///
    /// Returns [`BandError::UnknownMetric`] if the layer is not defined.
    pub fn landcover(&self, layer: &str) -> Result<&LandcoverTable, BandError> {
        self.landcover
            .get(layer)
            .ok_or_else(|| BandError::UnknownMetric {
                metric: layer.to_string(),
            })
    }

    fn metric_def(&self, metric: &str) -> Result<&MetricDef, BandError> {
        self.metrics
            .get(metric)
            .ok_or_else(|| BandError::UnknownMetric {
                metric: metric.to_string(),
            })
    }
}
