//! Land-cover histograms: composition and loss-by-class.
//!
//! Cross-tabulating loss year against land-cover class would naively
//! cost one reduction per class per year. Joint encoding collapses that
//! to a single frequency histogram: the loss band (self-masked, so only
//! loss pixels survive) is scaled by the multiplier and added to the
//! class band, and every decoded key yields one `(year, class)` cell.
//! The backend only reports combinations that occur in the data, so
//! every `(window-year, valid-class)` pair is pre-filled with 0.

use std::collections::BTreeMap;

use geo::MultiPolygon;

use canopy_analysis_models::{
    AnalysisParams, HistogramMode, LandcoverClassTotal, LandcoverComposition, LandcoverYearSeries,
    LossByLandcover,
};
use canopy_backend::expr::ImageExpr;
use canopy_backend::reduce::Reducer;
use canopy_bands::encode::{DEFAULT_MULTIPLIER, JointEncoder};
use canopy_partition::area::squaremeters_to_ha;
use canopy_partition::split::partition;

use crate::aggregator::ChangeStatisticsAggregator;
use crate::validate::{resolve_window, validate_threshold};
use crate::{AnalysisError, masks};

impl ChangeStatisticsAggregator {
    /// Cross-tabulates loss year against land-cover class in one joint
    /// histogram reduction.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::Validation`] for bad parameters before
    /// any backend call, and other variants for partition or backend
    /// failures.
    pub async fn analyze_loss_by_landcover(
        &self,
        geometry: &MultiPolygon<f64>,
        params: &AnalysisParams,
        layer: &str,
        mode: HistogramMode,
    ) -> Result<LossByLandcover, AnalysisError> {
        validate_threshold(params.threshold)?;
        let window = resolve_window(&self.config, params.begin, params.end)?;

        let loss_band = self.registry.resolve("loss", params.threshold)?;
        let table = self.registry.landcover(layer)?;
        let max_code = table.valid_codes().last().copied().unwrap_or(0);
        let encoder = JointEncoder::new(DEFAULT_MULTIPLIER, max_code).map_err(AnalysisError::Band)?;

        let partitions = partition(geometry, self.config.depth)?;

        // Only pixels that lost cover contribute: the class band is
        // masked to the self-masked loss band before combining.
        let loss = masks::loss_self_masked(&loss_band);
        let class_band = ImageExpr::band(table.asset.clone(), table.band.clone());
        let combined = loss
            .clone()
            .multiply(ImageExpr::constant(f64::from(encoder.multiplier())))
            .add(class_band.mask(loss));

        let reducer = Reducer::FrequencyHistogram {
            area_weighted: matches!(mode, HistogramMode::AreaHa),
        };
        let histogram = self
            .reduce_with_escalation(geometry, &partitions, combined, reducer, table.scale_m, false)
            .await?
            .into_histogram()?;

        // Pre-fill every (window-year, valid-class) cell with 0; the
        // backend response only holds combinations that occur.
        let mut classes: BTreeMap<u32, LandcoverYearSeries> = table
            .classes
            .iter()
            .map(|class| {
                (
                    class.code,
                    LandcoverYearSeries {
                        name: class.name.clone(),
                        by_year: window.years().map(|(_, year)| (year, 0.0)).collect(),
                    },
                )
            })
            .collect();

        for (key, value) in histogram {
            let Ok(combined_value) = u32::try_from(key) else {
                log::warn!("Negative joint histogram key {key}; skipping");
                continue;
            };
            let (year_code, class_code) = encoder.decode(combined_value);
            let calendar_year = self.config.base_year + i32::try_from(year_code).unwrap_or(0);

            if calendar_year < window.begin_year || calendar_year > window.end_year {
                continue;
            }
            let Some(series) = classes.get_mut(&class_code) else {
                log::warn!("Unknown {layer} class code {class_code} in histogram; skipping");
                continue;
            };
            let converted = match mode {
                HistogramMode::PixelCount => value,
                HistogramMode::AreaHa => squaremeters_to_ha(value),
            };
            series.by_year.insert(calendar_year, converted);
        }

        Ok(LossByLandcover {
            layer: layer.to_string(),
            mode,
            classes,
        })
    }

    /// Tabulates the land-cover composition of a region, with no loss
    /// crossing.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError`] for partition or backend failures.
    pub async fn analyze_landcover_composition(
        &self,
        geometry: &MultiPolygon<f64>,
        layer: &str,
        mode: HistogramMode,
    ) -> Result<LandcoverComposition, AnalysisError> {
        let table = self.registry.landcover(layer)?;
        let partitions = partition(geometry, self.config.depth)?;

        let class_band = ImageExpr::band(table.asset.clone(), table.band.clone());
        let reducer = Reducer::FrequencyHistogram {
            area_weighted: matches!(mode, HistogramMode::AreaHa),
        };
        let histogram = self
            .reduce_with_escalation(geometry, &partitions, class_band, reducer, table.scale_m, false)
            .await?
            .into_histogram()?;

        let mut classes: BTreeMap<u32, LandcoverClassTotal> = table
            .classes
            .iter()
            .map(|class| {
                (
                    class.code,
                    LandcoverClassTotal {
                        name: class.name.clone(),
                        value: 0.0,
                    },
                )
            })
            .collect();

        for (key, value) in histogram {
            let Ok(class_code) = u32::try_from(key) else {
                continue;
            };
            let Some(entry) = classes.get_mut(&class_code) else {
                log::warn!("Unknown {layer} class code {class_code} in histogram; skipping");
                continue;
            };
            entry.value = match mode {
                HistogramMode::PixelCount => value,
                HistogramMode::AreaHa => squaremeters_to_ha(value),
            };
        }

        Ok(LandcoverComposition {
            layer: layer.to_string(),
            mode,
            classes,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;

    use canopy_backend::RasterBackend;
    use canopy_bands::registry::BandRegistry;

    use crate::config::AnalysisConfig;
    use crate::testutil::{GridBackend, hansen_world, square_km};

    use super::*;

    fn params(begin: i32, end: i32) -> AnalysisParams {
        AnalysisParams {
            threshold: 30,
            begin: NaiveDate::from_ymd_opt(begin, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(end, 1, 1).unwrap(),
            aggregate: false,
        }
    }

    fn aggregator(backend: &Arc<GridBackend>) -> ChangeStatisticsAggregator {
        ChangeStatisticsAggregator::new(
            Arc::clone(backend) as Arc<dyn RasterBackend>,
            BandRegistry::load().unwrap(),
            AnalysisConfig::default(),
        )
    }

    #[tokio::test]
    async fn joint_histogram_decodes_year_and_class() {
        let backend = Arc::new(hansen_world(16));
        let aggregator = aggregator(&backend);
        let result = aggregator
            .analyze_loss_by_landcover(
                &square_km(),
                &params(2001, 2018),
                "globcover",
                HistogramMode::PixelCount,
            )
            .await
            .unwrap();

        // The south-west quarter (64 of 256 cells) was lost in year-code
        // 5 on uniform class 40.
        let forest = &result.classes[&40];
        assert!((forest.by_year[&2005] - 64.0).abs() < f64::EPSILON);
        assert!(forest.by_year[&2004].abs() < f64::EPSILON);
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn every_class_and_year_is_zero_filled() {
        let backend = Arc::new(hansen_world(16));
        let aggregator = aggregator(&backend);
        let result = aggregator
            .analyze_loss_by_landcover(
                &square_km(),
                &params(2003, 2006),
                "globcover",
                HistogramMode::PixelCount,
            )
            .await
            .unwrap();

        let table_len = BandRegistry::load()
            .unwrap()
            .landcover("globcover")
            .unwrap()
            .classes
            .len();
        assert_eq!(result.classes.len(), table_len);
        for series in result.classes.values() {
            assert_eq!(
                series.by_year.keys().copied().collect::<Vec<_>>(),
                vec![2003, 2004, 2005, 2006]
            );
        }
        // Water bodies saw no loss anywhere.
        assert!(result.classes[&210].by_year.values().all(|v| v.abs() < f64::EPSILON));
    }

    #[tokio::test]
    async fn area_weighted_mode_reports_hectares() {
        let backend = Arc::new(hansen_world(16));
        let aggregator = aggregator(&backend);
        let result = aggregator
            .analyze_loss_by_landcover(
                &square_km(),
                &params(2001, 2018),
                "globcover",
                HistogramMode::AreaHa,
            )
            .await
            .unwrap();

        let loss_2005 = result.classes[&40].by_year[&2005];
        let area_ha = canopy_partition::area::squaremeters_to_ha(
            canopy_partition::area::geodesic_area_m2(&square_km()),
        );
        assert!(
            (loss_2005 - area_ha * 0.25).abs() < 0.05,
            "area-weighted loss {loss_2005} vs expected {}",
            area_ha * 0.25
        );
    }

    #[tokio::test]
    async fn composition_tabulates_the_whole_region() {
        let backend = Arc::new(hansen_world(16));
        let aggregator = aggregator(&backend);
        let result = aggregator
            .analyze_landcover_composition(&square_km(), "globcover", HistogramMode::PixelCount)
            .await
            .unwrap();

        assert!((result.classes[&40].value - 256.0).abs() < f64::EPSILON);
        assert!(result.classes[&200].value.abs() < f64::EPSILON);
        assert!(!result.classes[&40].name.is_empty());
    }

    #[tokio::test]
    async fn unknown_layer_is_a_band_error() {
        let backend = Arc::new(hansen_world(16));
        let aggregator = aggregator(&backend);
        let result = aggregator
            .analyze_landcover_composition(&square_km(), "nlcd", HistogramMode::PixelCount)
            .await;
        assert!(matches!(result, Err(AnalysisError::Band(_))));
        assert_eq!(backend.call_count(), 0);
    }
}
