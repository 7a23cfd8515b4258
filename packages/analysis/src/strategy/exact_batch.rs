//! Exact batched reduction.
//!
//! All partitions go to the backend in one call and are aggregated
//! server-side. Cheapest in call overhead; the backend rejects the whole
//! batch if any single partition exceeds its complexity ceiling, at
//! which point the caller falls back or escalates depth.

use std::sync::Arc;

use async_trait::async_trait;

use canopy_backend::RasterBackend;
use canopy_backend::reduce::{BatchReduceRequest, Reducer};
use canopy_partition::convert::multipolygon_to_geometry;

use crate::AnalysisError;
use crate::strategy::{Reduction, ReductionStrategy, StrategyRequest, fold_outputs};

/// Single-call batched reduction over all partitions.
pub struct ExactBatchStrategy {
    backend: Arc<dyn RasterBackend>,
}

impl ExactBatchStrategy {
    /// Creates the strategy over a backend.
    #[must_use]
    pub fn new(backend: Arc<dyn RasterBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl ReductionStrategy for ExactBatchStrategy {
    async fn reduce(&self, request: StrategyRequest<'_>) -> Result<Reduction, AnalysisError> {
        let expression = match request.reducer {
            Reducer::Sum => request.expression.clone().times_pixel_area(),
            Reducer::FrequencyHistogram { .. } => request.expression.clone(),
        };

        let batch = BatchReduceRequest {
            expression,
            geometries: request
                .partitions
                .iter()
                .map(|partition| multipolygon_to_geometry(&partition.geometry))
                .collect(),
            reducer: request.reducer,
            scale_m: request.scale_m,
            best_effort: request.best_effort,
            max_pixels: Some(request.total_budget_pixels),
        };

        log::debug!("Batch reducing {} partitions", request.partitions.len());
        let output = self.backend.reduce_batch(&batch).await?;
        fold_outputs(request.reducer, vec![output])
    }
}
