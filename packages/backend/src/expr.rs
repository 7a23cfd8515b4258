//! Typed map-algebra expression tree.
//!
//! Expressions compose band selections with masking, comparisons, and
//! arithmetic, mirroring the operations the backend evaluates per pixel.
//! Comparison operators yield binary images (1 where true, 0 where
//! false); masking removes pixels entirely, which is not the same thing
//! as zeroing them.

use serde::{Deserialize, Serialize};

/// A request-scoped derived raster expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum ImageExpr {
    /// Select one band of a raster asset.
    Band {
        /// Asset identifier.
        asset: String,
        /// Band name within the asset.
        band: String,
    },
    /// A constant-valued image.
    Constant {
        /// The per-pixel value.
        value: f64,
    },
    /// Per-pixel area in square meters.
    PixelArea,
    /// Mask an image with itself: pixels whose value is 0 are removed.
    SelfMask {
        /// The image to self-mask.
        input: Box<ImageExpr>,
    },
    /// Mask an image by another: pixels where the mask is 0 or already
    /// masked are removed.
    Mask {
        /// The image to mask.
        input: Box<ImageExpr>,
        /// The mask image.
        mask: Box<ImageExpr>,
    },
    /// 1 where `input > value`, else 0.
    Gt {
        /// The compared image.
        input: Box<ImageExpr>,
        /// Comparison constant.
        value: f64,
    },
    /// 1 where `input >= value`, else 0.
    Gte {
        /// The compared image.
        input: Box<ImageExpr>,
        /// Comparison constant.
        value: f64,
    },
    /// 1 where `input <= value`, else 0.
    Lte {
        /// The compared image.
        input: Box<ImageExpr>,
        /// Comparison constant.
        value: f64,
    },
    /// 1 where `input == value`, else 0.
    Eq {
        /// The compared image.
        input: Box<ImageExpr>,
        /// Comparison constant.
        value: f64,
    },
    /// Logical and of two binary images.
    And {
        /// Left operand.
        lhs: Box<ImageExpr>,
        /// Right operand.
        rhs: Box<ImageExpr>,
    },
    /// Per-pixel sum.
    Add {
        /// Left operand.
        lhs: Box<ImageExpr>,
        /// Right operand.
        rhs: Box<ImageExpr>,
    },
    /// Per-pixel product.
    Multiply {
        /// Left operand.
        lhs: Box<ImageExpr>,
        /// Right operand.
        rhs: Box<ImageExpr>,
    },
    /// Per-pixel division by a constant.
    DivideBy {
        /// The divided image.
        input: Box<ImageExpr>,
        /// The divisor.
        value: f64,
    },
}

impl ImageExpr {
    /// Selects a band of an asset.
    #[must_use]
    pub fn band(asset: impl Into<String>, band: impl Into<String>) -> Self {
        Self::Band {
            asset: asset.into(),
            band: band.into(),
        }
    }

    /// A constant-valued image.
    #[must_use]
    pub const fn constant(value: f64) -> Self {
        Self::Constant { value }
    }

    /// Masks this image with itself, removing zero-valued pixels.
    #[must_use]
    pub fn self_mask(self) -> Self {
        Self::SelfMask {
            input: Box::new(self),
        }
    }

    /// Masks this image by another.
    #[must_use]
    pub fn mask(self, mask: Self) -> Self {
        Self::Mask {
            input: Box::new(self),
            mask: Box::new(mask),
        }
    }

    /// Binary `> value`.
    #[must_use]
    pub fn gt(self, value: f64) -> Self {
        Self::Gt {
            input: Box::new(self),
            value,
        }
    }

    /// Binary `>= value`.
    #[must_use]
    pub fn gte(self, value: f64) -> Self {
        Self::Gte {
            input: Box::new(self),
            value,
        }
    }

    /// Binary `<= value`.
    #[must_use]
    pub fn lte(self, value: f64) -> Self {
        Self::Lte {
            input: Box::new(self),
            value,
        }
    }

    /// Binary `== value`.
    #[must_use]
    pub fn eq_value(self, value: f64) -> Self {
        Self::Eq {
            input: Box::new(self),
            value,
        }
    }

    /// Logical and with another binary image.
    #[must_use]
    pub fn and(self, rhs: Self) -> Self {
        Self::And {
            lhs: Box::new(self),
            rhs: Box::new(rhs),
        }
    }

    /// Per-pixel sum with another image.
    #[must_use]
    pub fn add(self, rhs: Self) -> Self {
        Self::Add {
            lhs: Box::new(self),
            rhs: Box::new(rhs),
        }
    }

    /// Per-pixel product with another image.
    #[must_use]
    pub fn multiply(self, rhs: Self) -> Self {
        Self::Multiply {
            lhs: Box::new(self),
            rhs: Box::new(rhs),
        }
    }

    /// Per-pixel division by a constant.
    #[must_use]
    pub fn divide_by(self, value: f64) -> Self {
        Self::DivideBy {
            input: Box::new(self),
            value,
        }
    }

    /// Multiplies by per-pixel area, turning a binary mask into a
    /// summable area image.
    #[must_use]
    pub fn times_pixel_area(self) -> Self {
        self.multiply(Self::PixelArea)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_nest_the_tree() {
        let loss = ImageExpr::band("umd/composite", "loss_30").self_mask();
        let expr = loss
            .clone()
            .gte(1.0)
            .and(loss.lte(18.0))
            .times_pixel_area();
        assert!(matches!(expr, ImageExpr::Multiply { .. }));
    }

    #[test]
    fn serializes_with_op_tags() {
        let expr = ImageExpr::band("umd/composite", "gain").divide_by(255.0);
        let json = serde_json::to_value(&expr).unwrap();
        assert_eq!(json["op"], "divideBy");
        assert_eq!(json["input"]["op"], "band");
        assert_eq!(json["input"]["asset"], "umd/composite");
    }
}
