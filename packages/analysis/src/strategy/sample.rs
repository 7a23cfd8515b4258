//! Statistical sampling reduction.
//!
//! Draws a budgeted number of random pixels per partition, measures the
//! fraction matching the mask, and scales by the partition's exact
//! geodesic area. The area is computed independently of the raster, so
//! the estimate converges on the true area as the budget grows. The backend may
//! measure fewer samples than requested near partition edges; both
//! counts are reported so callers can judge reliability.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt as _, TryStreamExt as _};

use canopy_analysis_models::SampleSummary;
use canopy_backend::RasterBackend;
use canopy_backend::reduce::{Reducer, SampleOutput, SampleRequest};
use canopy_partition::convert::multipolygon_to_geometry;
use canopy_partition::{area, budget};

use crate::AnalysisError;
use crate::strategy::{Reduction, ReductionStrategy, StrategyRequest};

/// Budgeted random-pixel estimation per partition.
pub struct SampleStrategy {
    backend: Arc<dyn RasterBackend>,
    concurrency: usize,
}

impl SampleStrategy {
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
impl ReductionStrategy for SampleStrategy {
    async fn reduce(&self, request: StrategyRequest<'_>) -> Result<Reduction, AnalysisError> {
        if matches!(request.reducer, Reducer::FrequencyHistogram { .. }) {
            return Err(AnalysisError::Validation {
                message: "Statistical sampling supports area reductions only".to_string(),
            });
        }

        let per_partition_budget =
            budget::allocate(request.total_budget_pixels, request.partitions.len())?;

        log::debug!(
            "Sampling {} partitions ({} pixels each)",
            request.partitions.len(),
            per_partition_budget
        );

        let futures: Vec<_> = request
            .partitions
            .iter()
            .map(|partition| {
                let sample_request = SampleRequest {
                    expression: request.expression.clone(),
                    geometry: multipolygon_to_geometry(&partition.geometry),
                    num_pixels: per_partition_budget,
                    scale_m: request.scale_m,
                    seed: None,
                };
                let partition_area_m2 = area::geodesic_area_m2(&partition.geometry);
                let backend = Arc::clone(&self.backend);
                async move {
                    backend
                        .sample(&sample_request)
                        .await
                        .map(|output| (partition_area_m2, output))
                }
            })
            .collect();

        let estimates: Vec<(f64, SampleOutput)> = stream::iter(futures)
            .buffer_unordered(self.concurrency)
            .try_collect()
            .await?;

        let mut square_meters = 0.0;
        let mut requested = 0;
        let mut measured = 0;
        for (partition_area_m2, output) in estimates {
            requested += per_partition_budget;
            measured += output.sampled;
            if output.sampled > 0 {
                #[allow(clippy::cast_precision_loss)]
                let fraction = output.matched as f64 / output.sampled as f64;
                square_meters += partition_area_m2 * fraction;
            }
        }

        Ok(Reduction::Area {
            square_meters,
            samples: Some(SampleSummary {
                requested,
                measured,
            }),
        })
    }
}
