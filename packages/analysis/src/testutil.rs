//! In-memory raster backend over a synthetic pixel grid.
//!
//! The grid covers the bounding box of a fixed "world" geometry with
//! `n x n` cells; each configured band assigns every cell a value via a
//! [`Pattern`]. Expressions are evaluated per cell exactly as the real
//! backend would, so reductions, histograms, and samples all agree with
//! each other. Cell area is normalized so the summed cell areas equal
//! the world's geodesic area, which keeps exact and sampled strategies
//! comparable.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use geo::{BoundingRect, Contains, MultiPolygon, Point, Rect, polygon};

use canopy_backend::expr::ImageExpr;
use canopy_backend::reduce::{
    BatchReduceRequest, ReduceOutput, ReduceRequest, Reducer, SampleOutput, SampleRequest,
};
use canopy_backend::{BackendError, RasterBackend};
use canopy_partition::area::geodesic_area_m2;
use canopy_partition::convert::geometry_to_multipolygon;

/// How a synthetic band assigns values across the world grid.
pub(crate) enum Pattern {
    /// Every cell holds the same value.
    Uniform(f64),
    /// `value` in the south-west quadrant of the world grid, `elsewhere`
    /// everywhere else. The quadrant is exactly 25% of the cells.
    SwQuadrant { value: f64, elsewhere: f64 },
}

pub(crate) struct GridBackend {
    bounds: Rect<f64>,
    n: usize,
    cell_area_m2: f64,
    bands: BTreeMap<(String, String), Pattern>,
    calls: AtomicUsize,
    fail_next: AtomicUsize,
}

impl GridBackend {
    pub(crate) fn new(world: &MultiPolygon<f64>, n: usize) -> Self {
        let bounds = world.bounding_rect().expect("world has a bounding box");
        let mut inside = 0_usize;
        for row in 0..n {
            for col in 0..n {
                if world.contains(&cell_center(bounds, n, col, row)) {
                    inside += 1;
                }
            }
        }
        assert!(inside > 0, "world geometry covers no cells");
        #[allow(clippy::cast_precision_loss)]
        let cell_area_m2 = geodesic_area_m2(world) / inside as f64;
        Self {
            bounds,
            n,
            cell_area_m2,
            bands: BTreeMap::new(),
            calls: AtomicUsize::new(0),
            fail_next: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_band(mut self, asset: &str, band: &str, pattern: Pattern) -> Self {
        self.bands
            .insert((asset.to_string(), band.to_string()), pattern);
        self
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn fail_next_calls(&self, count: usize) {
        self.fail_next.store(count, Ordering::SeqCst);
    }

    fn begin_call(&self) -> Result<(), BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| v.checked_sub(1))
            .is_ok();
        if failing {
            return Err(BackendError::Remote {
                message: "Computation timed out.".to_string(),
            });
        }
        Ok(())
    }

    fn band_value(&self, asset: &str, band: &str, col: usize, row: usize) -> f64 {
        let pattern = self
            .bands
            .get(&(asset.to_string(), band.to_string()))
            .unwrap_or_else(|| panic!("test backend has no band {asset}:{band}"));
        match pattern {
            Pattern::Uniform(value) => *value,
            Pattern::SwQuadrant { value, elsewhere } => {
                if col < self.n / 2 && row < self.n / 2 {
                    *value
                } else {
                    *elsewhere
                }
            }
        }
    }

    /// Evaluates an expression at one cell. `None` means masked.
    fn eval(&self, expr: &ImageExpr, col: usize, row: usize) -> Option<f64> {
        match expr {
            ImageExpr::Band { asset, band } => Some(self.band_value(asset, band, col, row)),
            ImageExpr::Constant { value } => Some(*value),
            ImageExpr::PixelArea => Some(self.cell_area_m2),
            ImageExpr::SelfMask { input } => {
                let value = self.eval(input, col, row)?;
                (value != 0.0).then_some(value)
            }
            ImageExpr::Mask { input, mask } => {
                let mask_value = self.eval(mask, col, row)?;
                if mask_value == 0.0 {
                    return None;
                }
                self.eval(input, col, row)
            }
            ImageExpr::Gt { input, value } => {
                Some(binary(self.eval(input, col, row)? > *value))
            }
            ImageExpr::Gte { input, value } => {
                Some(binary(self.eval(input, col, row)? >= *value))
            }
            ImageExpr::Lte { input, value } => {
                Some(binary(self.eval(input, col, row)? <= *value))
            }
            ImageExpr::Eq { input, value } => {
                let lhs = self.eval(input, col, row)?;
                Some(binary((lhs - *value).abs() < f64::EPSILON))
            }
            ImageExpr::And { lhs, rhs } => {
                let a = self.eval(lhs, col, row)?;
                let b = self.eval(rhs, col, row)?;
                Some(binary(a != 0.0 && b != 0.0))
            }
            ImageExpr::Add { lhs, rhs } => {
                Some(self.eval(lhs, col, row)? + self.eval(rhs, col, row)?)
            }
            ImageExpr::Multiply { lhs, rhs } => {
                Some(self.eval(lhs, col, row)? * self.eval(rhs, col, row)?)
            }
            ImageExpr::DivideBy { input, value } => Some(self.eval(input, col, row)? / *value),
        }
    }

    fn cells_inside(&self, region: &MultiPolygon<f64>) -> Vec<(usize, usize)> {
        let mut cells = Vec::new();
        for row in 0..self.n {
            for col in 0..self.n {
                if region.contains(&cell_center(self.bounds, self.n, col, row)) {
                    cells.push((col, row));
                }
            }
        }
        cells
    }

    fn reduce_region(
        &self,
        region: &MultiPolygon<f64>,
        expression: &ImageExpr,
        reducer: Reducer,
        accumulator: &mut ReduceAccumulator,
    ) {
        for (col, row) in self.cells_inside(region) {
            let Some(value) = self.eval(expression, col, row) else {
                continue;
            };
            match (reducer, &mut *accumulator) {
                (Reducer::Sum, ReduceAccumulator::Sum(total)) => *total += value,
                (
                    Reducer::FrequencyHistogram { area_weighted },
                    ReduceAccumulator::Histogram(counts),
                ) => {
                    let key = format!("{value:.1}");
                    let weight = if area_weighted { self.cell_area_m2 } else { 1.0 };
                    *counts.entry(key).or_insert(0.0) += weight;
                }
                _ => unreachable!("accumulator matches reducer"),
            }
        }
    }
}

enum ReduceAccumulator {
    Sum(f64),
    Histogram(BTreeMap<String, f64>),
}

impl ReduceAccumulator {
    fn new(reducer: Reducer) -> Self {
        match reducer {
            Reducer::Sum => Self::Sum(0.0),
            Reducer::FrequencyHistogram { .. } => Self::Histogram(BTreeMap::new()),
        }
    }

    fn into_output(self) -> ReduceOutput {
        match self {
            Self::Sum(total) => ReduceOutput::Sum(total),
            Self::Histogram(counts) => ReduceOutput::Histogram(counts),
        }
    }
}

#[async_trait]
impl RasterBackend for GridBackend {
    async fn reduce(&self, request: &ReduceRequest) -> Result<ReduceOutput, BackendError> {
        self.begin_call()?;
        let region = to_region(&request.geometry);
        let mut accumulator = ReduceAccumulator::new(request.reducer);
        self.reduce_region(&region, &request.expression, request.reducer, &mut accumulator);
        Ok(accumulator.into_output())
    }

    async fn reduce_batch(
        &self,
        request: &BatchReduceRequest,
    ) -> Result<ReduceOutput, BackendError> {
        self.begin_call()?;
        let mut accumulator = ReduceAccumulator::new(request.reducer);
        for geometry in &request.geometries {
            let region = to_region(geometry);
            self.reduce_region(&region, &request.expression, request.reducer, &mut accumulator);
        }
        Ok(accumulator.into_output())
    }

    async fn sample(&self, request: &SampleRequest) -> Result<SampleOutput, BackendError> {
        self.begin_call()?;
        let region = to_region(&request.geometry);
        let cells = self.cells_inside(&region);
        let total = cells.len() as u64;
        let target = total.min(request.num_pixels);
        if target == 0 {
            return Ok(SampleOutput {
                matched: 0,
                sampled: 0,
            });
        }
        #[allow(clippy::cast_possible_truncation)]
        let stride = ((total / target).max(1)) as usize;

        let mut matched = 0;
        let mut sampled = 0;
        for (index, (col, row)) in cells.iter().enumerate() {
            if index % stride != 0 || sampled == target {
                continue;
            }
            sampled += 1;
            if self
                .eval(&request.expression, *col, *row)
                .is_some_and(|value| value != 0.0)
            {
                matched += 1;
            }
        }
        Ok(SampleOutput { matched, sampled })
    }
}

const fn binary(condition: bool) -> f64 {
    if condition { 1.0 } else { 0.0 }
}

fn to_region(geometry: &geojson::Geometry) -> MultiPolygon<f64> {
    geometry_to_multipolygon(geometry).expect("test geometry is polygonal")
}

fn cell_center(bounds: Rect<f64>, n: usize, col: usize, row: usize) -> Point<f64> {
    #[allow(clippy::cast_precision_loss)]
    let fx = (col as f64 + 0.5) / n as f64;
    #[allow(clippy::cast_precision_loss)]
    let fy = (row as f64 + 0.5) / n as f64;
    Point::new(
        bounds.min().x + fx * bounds.width(),
        bounds.min().y + fy * bounds.height(),
    )
}

/// A roughly 1 km x 1 km square on the equator.
pub(crate) fn square_km() -> MultiPolygon<f64> {
    MultiPolygon(vec![polygon![
        (x: 10.0, y: 0.0),
        (x: 10.009, y: 0.0),
        (x: 10.009, y: 0.009),
        (x: 10.0, y: 0.009),
        (x: 10.0, y: 0.0),
    ]])
}

pub(crate) const COMPOSITE_ASSET: &str = "umd/global-forest-change/composite-18";
pub(crate) const EXTENT2010_ASSET: &str = "umd/tree-cover-2010";
pub(crate) const GLOBCOVER_ASSET: &str = "esa/globcover-2009";

/// A world where the whole square is forested at threshold 30, nothing
/// gained, and the south-west quarter was lost in year-code 5.
pub(crate) fn hansen_world(n: usize) -> GridBackend {
    GridBackend::new(&square_km(), n)
        .with_band(COMPOSITE_ASSET, "treecover2000_30", Pattern::Uniform(1.0))
        .with_band(EXTENT2010_ASSET, "extent2010_30", Pattern::Uniform(1.0))
        .with_band(COMPOSITE_ASSET, "gain", Pattern::Uniform(0.0))
        .with_band(
            COMPOSITE_ASSET,
            "loss_30",
            Pattern::SwQuadrant {
                value: 5.0,
                elsewhere: 0.0,
            },
        )
        .with_band(GLOBCOVER_ASSET, "landcover", Pattern::Uniform(40.0))
}
