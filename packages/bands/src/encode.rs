//! Categorical joint encoding.
//!
//! Packs two bounded integer codes into one pixel value via
//! `a * multiplier + b`, so a single frequency-histogram reduction yields
//! the full cross-tabulation of two categorical rasters. The multiplier
//! must exceed every possible value of the second code for the packing to
//! be injective.

use serde::{Deserialize, Serialize};

use crate::BandError;

/// Default multiplier: land-cover class codes are known to stay below
/// 500.
pub const DEFAULT_MULTIPLIER: u32 = 500;

/// An injective pairing of two bounded category codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JointEncoder {
    multiplier: u32,
}

impl JointEncoder {
    /// Creates an encoder, checking the multiplier against the largest
    /// possible second-code value.
    ///
    /// # Errors
    ///
    /// Returns [`BandError::Multiplier`] if `max_second_code` is not
    /// strictly below `multiplier`.
    pub const fn new(multiplier: u32, max_second_code: u32) -> Result<Self, BandError> {
        if max_second_code >= multiplier {
            return Err(BandError::Multiplier {
                multiplier,
                max_code: max_second_code,
            });
        }
        Ok(Self { multiplier })
    }

    /// The configured multiplier.
    #[must_use]
    pub const fn multiplier(self) -> u32 {
        self.multiplier
    }

    /// Packs `(a, b)` into one combined value.
    #[must_use]
    pub const fn encode(self, a: u32, b: u32) -> u32 {
        a * self.multiplier + b
    }

    /// Unpacks a combined value back into `(a, b)`.
    #[must_use]
    pub const fn decode(self, combined: u32) -> (u32, u32) {
        (combined / self.multiplier, combined % self.multiplier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding_is_injective_over_the_code_space() {
        let encoder = JointEncoder::new(DEFAULT_MULTIPLIER, DEFAULT_MULTIPLIER - 1).unwrap();
        for a in (0..DEFAULT_MULTIPLIER).step_by(7) {
            for b in (0..DEFAULT_MULTIPLIER).step_by(11) {
                assert_eq!(encoder.decode(encoder.encode(a, b)), (a, b));
            }
        }
    }

    #[test]
    fn decodes_a_known_combined_value() {
        let encoder = JointEncoder::new(500, 499).unwrap();
        // Loss year-code 5, land-cover class 40.
        assert_eq!(encoder.decode(2540), (5, 40));
    }

    #[test]
    fn multiplier_must_exceed_max_code() {
        assert!(matches!(
            JointEncoder::new(500, 500),
            Err(BandError::Multiplier {
                multiplier: 500,
                max_code: 500,
            })
        ));
    }
}
