//! Scaled-integer representation of real values
//!
//! Firmware toolchains without floating point exchange real-valued settings
//! as integers multiplied by a constant scale, e.g. `wb_reg_alpha_e6 = 500_000`
//! for `0.5`. [`FixedPoint`] performs that conversion in one place.

use num_traits::float::FloatCore;

/// A decimal scale factor applied to real values
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FixedPoint {
    scale: i64,
}

impl FixedPoint {
    /// Scale used by every `_e6` field
    pub const E6: FixedPoint = FixedPoint::new(1_000_000);

    /// Creates a conversion with the given scale
    ///
    /// A scale below 1 is treated as 1.
    pub const fn new(scale: i64) -> Self {
        FixedPoint {
            scale: if scale < 1 { 1 } else { scale },
        }
    }

    /// Returns the scale factor
    pub const fn scale(&self) -> i64 {
        self.scale
    }

    /// Converts a scaled integer to its real value
    pub fn to_float(&self, raw: i32) -> f32 {
        (raw as f64 / self.scale as f64) as f32
    }

    /// Converts a real value to the nearest scaled integer, saturating at the
    /// bounds of `i32`
    pub fn from_float(&self, value: f32) -> i32 {
        let scaled = FloatCore::round(value as f64 * self.scale as f64);

        if scaled.is_nan() {
            0
        } else if scaled >= i32::MAX as f64 {
            i32::MAX
        } else if scaled <= i32::MIN as f64 {
            i32::MIN
        } else {
            scaled as i32
        }
    }
}
