#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geometry partitioning and reduction budgets.
//!
//! Remote region reductions are billed per pixel and refuse regions above a
//! complexity ceiling. This crate splits an input polygon into a bounded set
//! of disjoint quadrant sub-regions so each remote call stays under that
//! ceiling, and divides a global pixel budget across the resulting pieces.
//! Exact geodesic area math lives here too, so partition sums can be
//! cross-checked against reducer output.

pub mod area;
pub mod budget;
pub mod convert;
pub mod split;

use thiserror::Error;

/// Errors from geometry partitioning.
#[derive(Debug, Error)]
pub enum PartitionError {
    /// The geometry has no area to split (empty, or collapsed to a point
    /// or line).
    #[error("Degenerate geometry: {message}")]
    Degenerate {
        /// Description of what made the geometry unsplittable.
        message: String,
    },
}

/// Errors from budget allocation.
#[derive(Debug, Error)]
pub enum BudgetError {
    /// Dividing the global budget across partitions left less than one
    /// pixel per partition. Issuing such a request would silently fall
    /// through to the backend's unlimited default.
    #[error("Budget of {total_budget} pixels rounds to zero across {partition_count} partitions")]
    Exhausted {
        /// The global budget that was being divided.
        total_budget: u64,
        /// How many partitions it was divided across.
        partition_count: usize,
    },
}
