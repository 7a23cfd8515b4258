#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Forest change statistics engine.
//!
//! Answers "how much forest extent, loss, gain, and land-cover
//! composition exists inside this polygon?" by driving the remote
//! raster-analysis backend: the input region is quadrant-partitioned to
//! stay under per-call complexity ceilings, threshold-parameterized
//! bands are resolved by naming convention, the loss-year band is masked
//! and decomposed into aggregate or per-year totals, and loss-by-class
//! cross-tabulations come from a single joint-encoded histogram
//! reduction.
//!
//! The [`aggregator::ChangeStatisticsAggregator`] orchestrates a request
//! end to end; the three [`strategy`] variants trade call overhead,
//! robustness, and accuracy behind one interface.

pub mod aggregator;
pub mod config;
pub mod landcover;
pub mod masks;
pub mod strategy;
pub mod validate;

#[cfg(test)]
pub(crate) mod testutil;

use thiserror::Error;

use canopy_backend::BackendError;
use canopy_bands::BandError;
use canopy_partition::{BudgetError, PartitionError};

/// Errors from change-statistics analysis.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Bad threshold, date range, or geometry parameters. Never reaches
    /// the backend.
    #[error("Validation error: {message}")]
    Validation {
        /// What was wrong with the request.
        message: String,
    },

    /// The geometry could not be partitioned.
    #[error("Partition error: {0}")]
    Partition(#[from] PartitionError),

    /// The per-partition pixel budget rounded to zero.
    #[error("Budget error: {0}")]
    Budget(#[from] BudgetError),

    /// A band registry table is broken.
    #[error("Band error: {0}")]
    Band(BandError),

    /// A remote reduction failed or timed out. The backend's original
    /// message is preserved for diagnosis.
    #[error("Analysis backend error: {message}")]
    Backend {
        /// The backend's failure text.
        message: String,
    },
}

impl From<BandError> for AnalysisError {
    fn from(error: BandError) -> Self {
        match error {
            // An out-of-range threshold is a request problem, not a
            // registry problem.
            BandError::Threshold { threshold } => Self::Validation {
                message: format!("Threshold {threshold} is outside [0, 100]"),
            },
            other => Self::Band(other),
        }
    }
}

impl From<BackendError> for AnalysisError {
    fn from(error: BackendError) -> Self {
        Self::Backend {
            message: error.to_string(),
        }
    }
}
