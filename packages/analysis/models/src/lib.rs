#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Request and result models for forest change analysis.
//!
//! These are the typed shapes downstream consumers receive: a
//! [`ChangeStatistics`] is assembled once per request and treated as
//! atomic. A request either yields a complete result or fails whole.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Parameters of one change-statistics request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisParams {
    /// Canopy-cover threshold in percent, `[0, 100]`.
    pub threshold: u32,
    /// Start of the loss window (inclusive; only the year is used).
    pub begin: NaiveDate,
    /// End of the loss window (inclusive; only the year is used).
    pub end: NaiveDate,
    /// Report one aggregate loss total instead of a per-year breakdown.
    pub aggregate: bool,
}

/// Loss totals, either aggregated over the window or broken down per
/// calendar year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LossTotals {
    /// One total for the whole `[begin, end]` window.
    Aggregate(f64),
    /// Hectares per calendar year; every year in the window is present,
    /// zero included.
    ByYear(BTreeMap<i32, f64>),
}

/// Measured sampling effort behind a statistically estimated result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleSummary {
    /// Samples requested across all partitions.
    pub requested: u64,
    /// Samples actually measured; falls short of `requested` near
    /// partition edges.
    pub measured: u64,
}

/// Forest extent, gain, and loss statistics for one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeStatistics {
    /// Exact geometric area of the request region in hectares.
    pub area_ha: f64,
    /// Baseline (year-2000) tree extent at the request threshold, in
    /// hectares.
    pub tree_extent_ha: f64,
    /// Year-2010 tree extent at the request threshold, in hectares.
    pub tree_extent2010_ha: f64,
    /// Tree cover gain over the data collection period, in hectares.
    pub gain_ha: f64,
    /// Loss within the requested window.
    pub loss: LossTotals,
    /// First calendar year of the loss window, echoed back resolved.
    pub loss_start_year: i32,
    /// Last calendar year of the loss window, echoed back resolved.
    pub loss_end_year: i32,
    /// Sampling effort, present only for statistically estimated
    /// results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub samples: Option<SampleSummary>,
}

/// Whether histogram values are raw pixel counts or hectares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HistogramMode {
    /// Raw pixel counts.
    PixelCount,
    /// Pixel-area-weighted totals converted to hectares.
    AreaHa,
}

/// Per-class yearly series in a loss-by-land-cover cross-tabulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LandcoverYearSeries {
    /// Human-readable class name.
    pub name: String,
    /// Value per calendar year; every year in the requested window is
    /// present, zero included.
    pub by_year: BTreeMap<i32, f64>,
}

/// Loss cross-tabulated against land-cover class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LossByLandcover {
    /// Land-cover layer the classes come from.
    pub layer: String,
    /// Unit of the per-year values.
    pub mode: HistogramMode,
    /// Series keyed by land-cover class code. Every valid class of the
    /// layer is present, zero-filled when absent from the data.
    pub classes: BTreeMap<u32, LandcoverYearSeries>,
}

/// Land-cover composition of a region (no loss crossing).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LandcoverComposition {
    /// Land-cover layer the classes come from.
    pub layer: String,
    /// Unit of the per-class values.
    pub mode: HistogramMode,
    /// Value per class code present in the layer's reference table.
    pub classes: BTreeMap<u32, LandcoverClassTotal>,
}

/// One class entry in a [`LandcoverComposition`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LandcoverClassTotal {
    /// Human-readable class name.
    pub name: String,
    /// Pixel count or hectares, depending on the mode.
    pub value: f64,
}
