//! Reduction strategies.
//!
//! Three interchangeable ways to turn a (mask, partitions, budget)
//! triple into an aggregated number, at different cost/accuracy
//! trade-offs. The caller selects one per configuration; nothing here
//! auto-switches between them.

pub mod exact_batch;
pub mod per_partition;
pub mod sample;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use canopy_analysis_models::SampleSummary;
use canopy_backend::RasterBackend;
use canopy_backend::expr::ImageExpr;
use canopy_backend::reduce::{ReduceOutput, Reducer, parse_code_key};
use canopy_partition::split::Partition;

use crate::AnalysisError;

/// Which reduction strategy to run. Selected by configuration, not by
/// the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// One batched backend call over all partitions; lowest overhead,
    /// fails when any single partition is pathologically complex.
    ExactBatch,
    /// One call per partition, summed locally; exact and robust at
    /// `O(partition_count)` remote calls. The default fallback.
    PerPartition,
    /// Random pixel sampling per partition scaled by exact geometric
    /// area; sampling error shrinks with budget.
    StatisticalSample,
}

/// One reduction to perform across a set of partitions.
#[derive(Debug, Clone)]
pub struct StrategyRequest<'a> {
    /// Per-pixel mask or value image, without any pixel-area term; sum
    /// strategies weight it by pixel area themselves.
    pub expression: ImageExpr,
    /// The disjoint sub-regions to reduce over.
    pub partitions: &'a [Partition],
    /// Aggregation operator.
    pub reducer: Reducer,
    /// Pixel scale in meters.
    pub scale_m: f64,
    /// Allow the backend to trade precision for completeness.
    pub best_effort: bool,
    /// Global pixel budget, divided across partitions by the allocator.
    pub total_budget_pixels: u64,
}

/// An aggregated reduction result.
#[derive(Debug, Clone, PartialEq)]
pub enum Reduction {
    /// Summed area.
    Area {
        /// Total in square meters; hectare conversion happens once at
        /// the output boundary.
        square_meters: f64,
        /// Sampling effort, for statistically estimated results only.
        samples: Option<SampleSummary>,
    },
    /// Per-code totals with decoded integer keys.
    Histogram(BTreeMap<i64, f64>),
}

impl Reduction {
    /// Unwraps an area result.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::Backend`] if the reduction produced a
    /// histogram instead.
    pub fn into_area(self) -> Result<(f64, Option<SampleSummary>), AnalysisError> {
        match self {
            Self::Area {
                square_meters,
                samples,
            } => Ok((square_meters, samples)),
            Self::Histogram(_) => Err(AnalysisError::Backend {
                message: "Backend returned a histogram for a sum reduction".to_string(),
            }),
        }
    }

    /// Unwraps a histogram result.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::Backend`] if the reduction produced a
    /// scalar instead.
    pub fn into_histogram(self) -> Result<BTreeMap<i64, f64>, AnalysisError> {
        match self {
            Self::Histogram(counts) => Ok(counts),
            Self::Area { .. } => Err(AnalysisError::Backend {
                message: "Backend returned a scalar for a histogram reduction".to_string(),
            }),
        }
    }
}

/// A way of reducing a mask over partitions into one aggregate.
#[async_trait]
pub trait ReductionStrategy: Send + Sync {
    /// Performs the reduction.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError`] if budget allocation or any backend
    /// call fails.
    async fn reduce(&self, request: StrategyRequest<'_>) -> Result<Reduction, AnalysisError>;
}

/// Builds the configured strategy.
#[must_use]
pub fn build_strategy(
    kind: StrategyKind,
    backend: Arc<dyn RasterBackend>,
    concurrency: usize,
) -> Box<dyn ReductionStrategy> {
    match kind {
        StrategyKind::ExactBatch => Box::new(exact_batch::ExactBatchStrategy::new(backend)),
        StrategyKind::PerPartition => Box::new(per_partition::PerPartitionStrategy::new(
            backend,
            concurrency,
        )),
        StrategyKind::StatisticalSample => {
            Box::new(sample::SampleStrategy::new(backend, concurrency))
        }
    }
}

/// Folds per-call outputs into one [`Reduction`] matching the reducer.
pub(crate) fn fold_outputs(
    reducer: Reducer,
    outputs: Vec<ReduceOutput>,
) -> Result<Reduction, AnalysisError> {
    match reducer {
        Reducer::Sum => {
            let mut total = 0.0;
            for output in outputs {
                let ReduceOutput::Sum(value) = output else {
                    return Err(AnalysisError::Backend {
                        message: "Backend returned a histogram for a sum reduction".to_string(),
                    });
                };
                total += value;
            }
            Ok(Reduction::Area {
                square_meters: total,
                samples: None,
            })
        }
        Reducer::FrequencyHistogram { .. } => {
            let mut merged: BTreeMap<i64, f64> = BTreeMap::new();
            for output in outputs {
                let ReduceOutput::Histogram(counts) = output else {
                    return Err(AnalysisError::Backend {
                        message: "Backend returned a scalar for a histogram reduction".to_string(),
                    });
                };
                for (key, value) in counts {
                    // Masked pixels arrive under the literal key "null".
                    let Some(code) = parse_code_key(&key) else {
                        continue;
                    };
                    *merged.entry(code).or_insert(0.0) += value;
                }
            }
            Ok(Reduction::Histogram(merged))
        }
    }
}
