//! Change-statistics orchestration.
//!
//! A request moves through validation, partitioning, four metric
//! reductions (baseline extent, 2010 extent, gain, loss), and assembly
//! into one immutable [`ChangeStatistics`]. Any metric failing fails the
//! whole request; downstream consumers treat the result as atomic and a
//! half-filled one would be worse than an error.

use std::collections::BTreeMap;
use std::sync::Arc;

use geo::MultiPolygon;

use canopy_analysis_models::{AnalysisParams, ChangeStatistics, LossTotals, SampleSummary};
use canopy_backend::RasterBackend;
use canopy_backend::expr::ImageExpr;
use canopy_backend::reduce::Reducer;
use canopy_bands::registry::BandRegistry;
use canopy_partition::area::{geodesic_area_m2, squaremeters_to_ha};
use canopy_partition::split::{Partition, partition};

use crate::config::AnalysisConfig;
use crate::strategy::{Reduction, ReductionStrategy, build_strategy};
use crate::validate::{ResolvedWindow, resolve_window, validate_threshold};
use crate::{AnalysisError, masks};

/// Orchestrates change-statistics requests against the raster backend.
pub struct ChangeStatisticsAggregator {
    pub(crate) registry: BandRegistry,
    pub(crate) config: AnalysisConfig,
    pub(crate) strategy: Box<dyn ReductionStrategy>,
}

impl ChangeStatisticsAggregator {
    /// Creates an aggregator with an explicit configuration.
    #[must_use]
    pub fn new(backend: Arc<dyn RasterBackend>, registry: BandRegistry, config: AnalysisConfig) -> Self {
        let strategy = build_strategy(config.strategy, backend, config.concurrency);
        Self {
            registry,
            config,
            strategy,
        }
    }

    /// Computes extent, gain, and loss statistics for a region.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::Validation`] before any backend call for
    /// bad parameters, and other [`AnalysisError`] variants for
    /// partitioning, budget, or backend failures.
    pub async fn analyze(
        &self,
        geometry: &MultiPolygon<f64>,
        params: &AnalysisParams,
    ) -> Result<ChangeStatistics, AnalysisError> {
        match self.analyze_inner(geometry, params).await {
            Ok(statistics) => Ok(statistics),
            Err(error) => {
                log::error!(
                    "Analysis failed (threshold={}, begin={}, end={}, depth={:?}): {error}",
                    params.threshold,
                    params.begin,
                    params.end,
                    self.config.depth
                );
                Err(error)
            }
        }
    }

    async fn analyze_inner(
        &self,
        geometry: &MultiPolygon<f64>,
        params: &AnalysisParams,
    ) -> Result<ChangeStatistics, AnalysisError> {
        // Validating: nothing past this point runs for a bad request.
        validate_threshold(params.threshold)?;
        let window = resolve_window(&self.config, params.begin, params.end)?;

        // Partitioning. The exact geodesic total doubles as a sanity
        // cross-check against the reducer's own extent output.
        let partitions = partition(geometry, self.config.depth)?;
        let total_area_m2: f64 = partitions
            .iter()
            .map(|p| geodesic_area_m2(&p.geometry))
            .sum();
        log::debug!(
            "Partitioned region into {} pieces ({:.1} ha total)",
            partitions.len(),
            total_area_m2 / 10_000.0
        );

        // Reducing, one metric at a time.
        let cover_band = self.registry.resolve("treecover", params.threshold)?;
        let extent2010_band = self.registry.resolve("extent2010", params.threshold)?;
        let gain_band = self.registry.resolve_plain("gain")?;
        let loss_band = self.registry.resolve("loss", params.threshold)?;

        let mut samples: Option<SampleSummary> = None;

        let tree_extent_m2 = self
            .reduce_area(geometry, &partitions, masks::extent_mask(&cover_band), &mut samples)
            .await?;
        let tree_extent2010_m2 = self
            .reduce_area(
                geometry,
                &partitions,
                masks::extent_mask(&extent2010_band),
                &mut samples,
            )
            .await?;
        let gain_m2 = self
            .reduce_area(
                geometry,
                &partitions,
                masks::gain_fraction(&gain_band),
                &mut samples,
            )
            .await?;

        let loss = if params.aggregate {
            let loss_m2 = self
                .reduce_area(
                    geometry,
                    &partitions,
                    masks::loss_window_mask(&loss_band, window.begin, window.end),
                    &mut samples,
                )
                .await?;
            LossTotals::Aggregate(squaremeters_to_ha(loss_m2))
        } else {
            // One reduction per year; every year in the window appears
            // in the output even when nothing was lost that year.
            let mut by_year = BTreeMap::new();
            for (code, calendar_year) in window.years() {
                let year_m2 = self
                    .reduce_area(
                        geometry,
                        &partitions,
                        masks::loss_year_mask(&loss_band, code),
                        &mut samples,
                    )
                    .await?;
                by_year.insert(calendar_year, squaremeters_to_ha(year_m2));
            }
            LossTotals::ByYear(by_year)
        };

        // Assembling: hectare conversion happens here and nowhere
        // earlier.
        Ok(ChangeStatistics {
            area_ha: squaremeters_to_ha(total_area_m2),
            tree_extent_ha: squaremeters_to_ha(tree_extent_m2),
            tree_extent2010_ha: squaremeters_to_ha(tree_extent2010_m2),
            gain_ha: squaremeters_to_ha(gain_m2),
            loss,
            loss_start_year: window.begin_year,
            loss_end_year: window.end_year,
            samples,
        })
    }

    /// Echoes the window a request would resolve to, for callers that
    /// validate before dispatching.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::Validation`] for out-of-range windows.
    pub fn resolve_request_window(
        &self,
        params: &AnalysisParams,
    ) -> Result<ResolvedWindow, AnalysisError> {
        validate_threshold(params.threshold)?;
        resolve_window(&self.config, params.begin, params.end)
    }

    async fn reduce_area(
        &self,
        geometry: &MultiPolygon<f64>,
        partitions: &[Partition],
        mask: ImageExpr,
        samples: &mut Option<SampleSummary>,
    ) -> Result<f64, AnalysisError> {
        let reduction = self
            .reduce_with_escalation(
                geometry,
                partitions,
                mask,
                Reducer::Sum,
                self.config.scale_m,
                self.config.best_effort,
            )
            .await?;
        let (square_meters, call_samples) = reduction.into_area()?;
        *samples = merge_samples(*samples, call_samples);
        Ok(square_meters)
    }

    /// Runs the configured strategy, retrying exactly once at the next
    /// finer partition depth if the backend fails and escalation is
    /// enabled.
    pub(crate) async fn reduce_with_escalation(
        &self,
        geometry: &MultiPolygon<f64>,
        partitions: &[Partition],
        expression: ImageExpr,
        reducer: Reducer,
        scale_m: f64,
        best_effort: bool,
    ) -> Result<Reduction, AnalysisError> {
        let request = crate::strategy::StrategyRequest {
            expression: expression.clone(),
            partitions,
            reducer,
            scale_m,
            best_effort,
            total_budget_pixels: self.config.total_budget_pixels,
        };

        let first_failure = match self.strategy.reduce(request).await {
            Ok(reduction) => return Ok(reduction),
            Err(error @ AnalysisError::Backend { .. }) => error,
            Err(error) => return Err(error),
        };

        let Some(finer) = self
            .config
            .allow_depth_escalation
            .then(|| self.config.depth.finer())
            .flatten()
        else {
            return Err(first_failure);
        };

        log::warn!("Reduction failed ({first_failure}); retrying at depth {finer:?}");
        let finer_partitions = partition(geometry, finer)?;
        let retry = crate::strategy::StrategyRequest {
            expression,
            partitions: &finer_partitions,
            reducer,
            scale_m,
            best_effort,
            total_budget_pixels: self.config.total_budget_pixels,
        };
        self.strategy.reduce(retry).await
    }
}

const fn merge_samples(
    accumulated: Option<SampleSummary>,
    next: Option<SampleSummary>,
) -> Option<SampleSummary> {
    match (accumulated, next) {
        (Some(a), Some(b)) => Some(SampleSummary {
            requested: a.requested + b.requested,
            measured: a.measured + b.measured,
        }),
        (Some(only), None) | (None, Some(only)) => Some(only),
        (None, None) => None,
    }
}
