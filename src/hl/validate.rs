//! Parameter validation
//!
//! Every check takes the value, its bounds and the name of the field, and
//! fails with an [`InvalidParameter`] naming that field. Calibration
//! structures chain these checks in their [`Validate`] implementation, which
//! runs before anything is sent to the device.

/// A parameter failed validation
///
/// Converts into [`Error::InvalidParameter`](crate::Error::InvalidParameter).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidParameter(pub &'static str);

/// Result of a validation step
pub type Result = core::result::Result<(), InvalidParameter>;

/// A structure that can check its own fields
pub trait Validate {
    /// Checks every field, failing on the first invalid one
    fn validate(&self) -> Result;
}

/// Checks `min <= value <= max`
///
/// A value that does not compare (a NaN) is rejected.
pub fn in_range<T: PartialOrd>(value: T, min: T, max: T, name: &'static str) -> Result {
    if value >= min && value <= max {
        Ok(())
    } else {
        Err(InvalidParameter(name))
    }
}

/// Checks `value <= max`
pub fn at_most<T: PartialOrd>(value: T, max: T, name: &'static str) -> Result {
    if value <= max {
        Ok(())
    } else {
        Err(InvalidParameter(name))
    }
}

/// Checks `value >= min`
pub fn at_least<T: PartialOrd>(value: T, min: T, name: &'static str) -> Result {
    if value >= min {
        Ok(())
    } else {
        Err(InvalidParameter(name))
    }
}

/// Checks that a firmware boolean is 0 or 1
pub fn flag(value: u8, name: &'static str) -> Result {
    at_most(value, 1, name)
}

/// Checks that `value` is one of `allowed`
pub fn one_of<T: PartialEq>(value: T, allowed: &[T], name: &'static str) -> Result {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(InvalidParameter(name))
    }
}

/// Checks that `mask` is not empty and has no bit outside `valid`
pub fn mask_within(mask: u32, valid: u32, name: &'static str) -> Result {
    if mask != 0 && mask & !valid == 0 {
        Ok(())
    } else {
        Err(InvalidParameter(name))
    }
}

/// Checks that exactly one bit of `mask` is set, and that it is inside `valid`
pub fn single_bit(mask: u32, valid: u32, name: &'static str) -> Result {
    mask_within(mask, valid, name)?;

    if mask.is_power_of_two() {
        Ok(())
    } else {
        Err(InvalidParameter(name))
    }
}

/// Checks that every element of `values` is within `min..=max`
pub fn all_in_range<T: PartialOrd + Copy>(
    values: &[T],
    min: T,
    max: T,
    name: &'static str,
) -> Result {
    values
        .iter()
        .try_for_each(|value| in_range(*value, min, max, name))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_ranges() {
        assert_eq!(in_range(5u8, 1, 5, "x"), Ok(()));
        assert_eq!(in_range(0u8, 1, 5, "x"), Err(InvalidParameter("x")));
        assert_eq!(in_range(0.5f32, 0.0, 1.0, "alpha"), Ok(()));
        assert_eq!(
            in_range(f32::NAN, 0.0, 1.0, "alpha"),
            Err(InvalidParameter("alpha"))
        );
        assert_eq!(at_most(0i32, 0, "threshold"), Ok(()));
        assert_eq!(at_most(1i32, 0, "threshold"), Err(InvalidParameter("threshold")));
        assert_eq!(at_least(0u32, 1, "batches"), Err(InvalidParameter("batches")));
        assert_eq!(flag(2, "enable"), Err(InvalidParameter("enable")));
        assert_eq!(one_of(2u8, &[1, 2, 4], "model"), Ok(()));
        assert_eq!(one_of(3u8, &[1, 2, 4], "model"), Err(InvalidParameter("model")));
        assert_eq!(
            all_in_range(&[0u8, 63, 64], 0, 63, "reg"),
            Err(InvalidParameter("reg"))
        );
    }

    #[test]
    fn test_masks() {
        assert_eq!(mask_within(0x81, 0xff, "tx"), Ok(()));
        assert_eq!(mask_within(0, 0xff, "tx"), Err(InvalidParameter("tx")));
        assert_eq!(mask_within(0x100, 0xff, "tx"), Err(InvalidParameter("tx")));

        assert_eq!(single_bit(0x40, 0xff, "tx"), Ok(()));
        assert_eq!(single_bit(0x41, 0xff, "tx"), Err(InvalidParameter("tx")));
        assert_eq!(single_bit(0x4, 0x3, "orx"), Err(InvalidParameter("orx")));
    }
}
