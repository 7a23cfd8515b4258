//! Per-partition reduction.
//!
//! One backend call per partition, dispatched concurrently through a
//! bounded buffer and summed locally after all siblings complete. The
//! partial results are independent, so the fold is a join barrier, not a
//! shared counter. The first failure short-circuits the stream, which
//! drops still-pending calls without waiting on them.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt as _, TryStreamExt as _};

use canopy_backend::RasterBackend;
use canopy_backend::reduce::{ReduceOutput, ReduceRequest, Reducer};
use canopy_partition::budget;
use canopy_partition::convert::multipolygon_to_geometry;

use crate::AnalysisError;
use crate::strategy::{Reduction, ReductionStrategy, StrategyRequest, fold_outputs};

/// One reduction call per partition, summed locally.
pub struct PerPartitionStrategy {
    backend: Arc<dyn RasterBackend>,
    concurrency: usize,
}

impl PerPartitionStrategy {
    /// Creates the strategy with a bound on in-flight calls.
    #[must_use]
    pub fn new(backend: Arc<dyn RasterBackend>, concurrency: usize) -> Self {
        Self {
            backend,
            concurrency: concurrency.max(1),
        }
    }
}

#[async_trait]
impl ReductionStrategy for PerPartitionStrategy {
    async fn reduce(&self, request: StrategyRequest<'_>) -> Result<Reduction, AnalysisError> {
        let per_partition_budget =
            budget::allocate(request.total_budget_pixels, request.partitions.len())?;

        let expression = match request.reducer {
            Reducer::Sum => request.expression.clone().times_pixel_area(),
            Reducer::FrequencyHistogram { .. } => request.expression.clone(),
        };

        log::debug!(
            "Reducing {} partitions ({} pixels each, concurrency={})",
            request.partitions.len(),
            per_partition_budget,
            self.concurrency
        );

        let futures: Vec<_> = request
            .partitions
            .iter()
            .map(|partition| {
                let reduce_request = ReduceRequest {
                    expression: expression.clone(),
                    geometry: multipolygon_to_geometry(&partition.geometry),
                    reducer: request.reducer,
                    scale_m: request.scale_m,
                    best_effort: request.best_effort,
                    max_pixels: Some(per_partition_budget),
                };
                let backend = Arc::clone(&self.backend);
                async move { backend.reduce(&reduce_request).await }
            })
            .collect();

        let outputs: Vec<ReduceOutput> = stream::iter(futures)
            .buffer_unordered(self.concurrency)
            .try_collect()
            .await?;

        fold_outputs(request.reducer, outputs)
    }
}
