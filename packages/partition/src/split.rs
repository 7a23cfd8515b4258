//! Recursive quadrant splitting.
//!
//! Each level of splitting intersects a piece with the four axis-aligned
//! rectangles spanned by its bounding-box corners and its centroid. Four
//! levels give up to 256 pieces; quadrants the geometry does not occupy
//! are dropped rather than carried as empty sub-regions.

use geo::{Area, BooleanOps, BoundingRect, Centroid, MultiPolygon, Rect, coord};
use serde::{Deserialize, Serialize};

use crate::PartitionError;

/// How many recursive quadrant splits to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitDepth {
    /// No split; the input geometry is the sole partition.
    Whole,
    /// One split: up to 4 pieces.
    Quads,
    /// Two splits: up to 16 pieces.
    Sixteenths,
    /// Three splits: up to 64 pieces.
    SixtyFourths,
    /// Four splits: up to 256 pieces.
    TwoFiftySixths,
}

impl SplitDepth {
    /// Number of recursive split levels (0–4).
    #[must_use]
    pub const fn levels(self) -> u8 {
        match self {
            Self::Whole => 0,
            Self::Quads => 1,
            Self::Sixteenths => 2,
            Self::SixtyFourths => 3,
            Self::TwoFiftySixths => 4,
        }
    }

    /// Maximum piece count this depth can produce.
    #[must_use]
    pub const fn max_pieces(self) -> usize {
        1 << (2 * self.levels())
    }

    /// Resolves a target piece count (1, 4, 16, 64, 256) to a depth.
    #[must_use]
    pub const fn from_piece_count(pieces: usize) -> Option<Self> {
        match pieces {
            1 => Some(Self::Whole),
            4 => Some(Self::Quads),
            16 => Some(Self::Sixteenths),
            64 => Some(Self::SixtyFourths),
            256 => Some(Self::TwoFiftySixths),
            _ => None,
        }
    }

    /// The next finer depth, if any. Used for one-shot retry escalation
    /// when the backend rejects a partition as too complex.
    #[must_use]
    pub const fn finer(self) -> Option<Self> {
        match self {
            Self::Whole => Some(Self::Quads),
            Self::Quads => Some(Self::Sixteenths),
            Self::Sixteenths => Some(Self::SixtyFourths),
            Self::SixtyFourths => Some(Self::TwoFiftySixths),
            Self::TwoFiftySixths => None,
        }
    }
}

/// A disjoint sub-region of an input geometry.
#[derive(Debug, Clone)]
pub struct Partition {
    /// The clipped sub-region geometry.
    pub geometry: MultiPolygon<f64>,
    /// How many recursive quadrant splits produced this piece.
    pub depth: u8,
}

/// Splits a geometry into disjoint quadrant partitions.
///
/// The union of the returned partitions equals the input up to clipping
/// tolerance, and their interiors are pairwise disjoint. Quadrants the
/// geometry does not occupy are dropped, so the result may hold fewer
/// than `depth.max_pieces()` entries.
///
/// # Errors
///
/// Returns [`PartitionError::Degenerate`] if the geometry is empty or has
/// zero area.
pub fn partition(
    geometry: &MultiPolygon<f64>,
    depth: SplitDepth,
) -> Result<Vec<Partition>, PartitionError> {
    if geometry.0.is_empty() || geometry.unsigned_area() == 0.0 {
        return Err(PartitionError::Degenerate {
            message: "geometry has zero area".to_string(),
        });
    }

    let mut pieces = vec![Partition {
        geometry: geometry.clone(),
        depth: 0,
    }];

    for _ in 0..depth.levels() {
        let mut next = Vec::with_capacity(pieces.len() * 4);
        for piece in &pieces {
            next.extend(split_once(piece)?);
        }
        if next.is_empty() {
            // Clipping ate everything; only reachable through pathological
            // sliver geometry.
            return Err(PartitionError::Degenerate {
                message: "quadrant clipping produced no non-empty pieces".to_string(),
            });
        }
        log::debug!("Split {} pieces into {}", pieces.len(), next.len());
        pieces = next;
    }

    Ok(pieces)
}

/// Clips one piece against the four quadrants of its own bounding box,
/// using the piece's centroid as the shared corner vertex.
fn split_once(piece: &Partition) -> Result<Vec<Partition>, PartitionError> {
    let bounds = piece
        .geometry
        .bounding_rect()
        .ok_or_else(|| PartitionError::Degenerate {
            message: "geometry has no bounding box".to_string(),
        })?;
    let center = piece
        .geometry
        .centroid()
        .ok_or_else(|| PartitionError::Degenerate {
            message: "geometry has no centroid".to_string(),
        })?;

    let (min, max) = (bounds.min(), bounds.max());
    let (cx, cy) = (center.x(), center.y());

    let quadrants = [
        Rect::new(coord! { x: min.x, y: min.y }, coord! { x: cx, y: cy }),
        Rect::new(coord! { x: cx, y: min.y }, coord! { x: max.x, y: cy }),
        Rect::new(coord! { x: min.x, y: cy }, coord! { x: cx, y: max.y }),
        Rect::new(coord! { x: cx, y: cy }, coord! { x: max.x, y: max.y }),
    ];

    let mut out = Vec::with_capacity(4);
    for quadrant in quadrants {
        let quadrant = MultiPolygon(vec![quadrant.to_polygon()]);
        let clipped = piece.geometry.intersection(&quadrant);
        // Empty quadrants are dropped, never reduced: an empty-geometry
        // reduction is either a backend error or a silent zero.
        if clipped.0.is_empty() || clipped.unsigned_area() == 0.0 {
            continue;
        }
        out.push(Partition {
            geometry: clipped,
            depth: piece.depth + 1,
        });
    }

    Ok(out)
}
