//! Mask expression builders for the change metrics.
//!
//! The loss band stores 0 for "no loss" and a year code for the year
//! loss occurred. It is always masked with itself before any range or
//! equality test; skipping the self-mask would let the zero-valued "no
//! loss" pixels satisfy `>= 0`-style tests and overcount.

use canopy_backend::expr::ImageExpr;
use canopy_bands::registry::BandRef;

use crate::validate::YearCode;

/// Binary cover mask: 1 wherever the threshold-named cover band has any
/// qualifying cover.
#[must_use]
pub fn extent_mask(band: &BandRef) -> ImageExpr {
    select(band).gt(0.0)
}

/// Gain fraction: the gain band stores 0 or 255, normalized to 0/1.
#[must_use]
pub fn gain_fraction(band: &BandRef) -> ImageExpr {
    select(band).divide_by(255.0)
}

/// The loss band masked with itself, removing "no loss" pixels.
#[must_use]
pub fn loss_self_masked(band: &BandRef) -> ImageExpr {
    select(band).self_mask()
}

/// Binary mask of loss within a closed year-code window.
#[must_use]
pub fn loss_window_mask(band: &BandRef, begin: YearCode, end: YearCode) -> ImageExpr {
    let masked = loss_self_masked(band);
    masked
        .clone()
        .gte(begin.as_f64())
        .and(masked.lte(end.as_f64()))
}

/// Binary mask of loss in exactly one year.
#[must_use]
pub fn loss_year_mask(band: &BandRef, year: YearCode) -> ImageExpr {
    loss_self_masked(band).eq_value(year.as_f64())
}

fn select(band: &BandRef) -> ImageExpr {
    ImageExpr::band(band.asset.clone(), band.band.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loss_band() -> BandRef {
        BandRef {
            asset: "umd/global-forest-change/composite-18".to_string(),
            band: "loss_30".to_string(),
        }
    }

    #[test]
    fn window_mask_self_masks_before_range_tests() {
        let expr = loss_window_mask(&loss_band(), YearCode(1), YearCode(18));
        let ImageExpr::And { lhs, rhs } = expr else {
            panic!("expected a range conjunction");
        };
        assert!(matches!(
            *lhs,
            ImageExpr::Gte { input, .. } if matches!(*input, ImageExpr::SelfMask { .. })
        ));
        assert!(matches!(
            *rhs,
            ImageExpr::Lte { input, .. } if matches!(*input, ImageExpr::SelfMask { .. })
        ));
    }

    #[test]
    fn year_mask_tests_equality_on_the_masked_band() {
        let expr = loss_year_mask(&loss_band(), YearCode(5));
        assert!(matches!(
            expr,
            ImageExpr::Eq { input, value } if value == 5.0
                && matches!(*input, ImageExpr::SelfMask { .. })
        ));
    }
}
