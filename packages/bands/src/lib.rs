#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Raster band resolution and categorical joint encoding.
//!
//! Metric and land-cover reference tables are defined as TOML files under
//! `registry/`, embedded at compile time and validated once at startup.
//! Threshold-parameterized metrics resolve to concrete band names by
//! naming convention (`loss` + `30` -> `loss_30`); land-cover tables feed
//! the joint histogram encoding that cross-tabulates loss year against
//! land-cover class in a single reduction.

pub mod encode;
pub mod registry;

use thiserror::Error;

/// Errors from band resolution and the joint encoder.
#[derive(Debug, Error)]
pub enum BandError {
    /// A registry TOML table failed to parse or validate.
    #[error("Registry error: {message}")]
    Registry {
        /// Description of the table problem.
        message: String,
    },

    /// The metric name is not in the registry table.
    #[error("Unknown metric '{metric}'")]
    UnknownMetric {
        /// The requested metric name.
        metric: String,
    },

    /// The canopy-cover threshold is outside `[0, 100]`.
    #[error("Threshold {threshold} is outside [0, 100]")]
    Threshold {
        /// The rejected threshold value.
        threshold: u32,
    },

    /// The joint-encoding multiplier does not exceed the largest
    /// category code, so distinct pairs would collide.
    #[error("Joint multiplier {multiplier} does not exceed max category code {max_code}")]
    Multiplier {
        /// The configured multiplier.
        multiplier: u32,
        /// The largest category code it must exceed.
        max_code: u32,
    },
}
