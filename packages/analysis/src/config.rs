//! Analysis configuration.
//!
//! All band tables, budget constants, and strategy selection flow in
//! through one immutable configuration object handed to the aggregator
//! at construction, so tests can inject fixtures without shared state.

use serde::Deserialize;

use canopy_partition::split::SplitDepth;

use crate::strategy::StrategyKind;

/// Configuration for a [`ChangeStatisticsAggregator`](crate::aggregator::ChangeStatisticsAggregator).
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct AnalysisConfig {
    /// The year loss-band codes are offsets from.
    pub base_year: i32,
    /// Last calendar year present in the loss data; bounds the valid
    /// year-code range.
    pub data_end_year: i32,
    /// Pixel scale for extent/gain/loss reductions, in meters.
    pub scale_m: f64,
    /// How finely to partition request geometries.
    pub depth: SplitDepth,
    /// Which reduction strategy to run.
    pub strategy: StrategyKind,
    /// Global pixel budget divided across partitions. For the sampling
    /// strategy this is the total sample draw, so deployments using
    /// [`StrategyKind::StatisticalSample`] configure it several orders
    /// of magnitude smaller.
    pub total_budget_pixels: u64,
    /// Let the backend trade precision for completeness on sum
    /// reductions.
    pub best_effort: bool,
    /// Retry a failed reduction once at the next finer partition depth.
    pub allow_depth_escalation: bool,
    /// Maximum concurrent in-flight backend calls per reduction.
    pub concurrency: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            base_year: 2000,
            data_end_year: 2018,
            scale_m: 30.0,
            depth: SplitDepth::Whole,
            strategy: StrategyKind::PerPartition,
            total_budget_pixels: 10_000_000_000,
            best_effort: true,
            allow_depth_escalation: true,
            concurrency: 8,
        }
    }
}
