//! Logging shims
//!
//! Log statements go through `defmt` when the `defmt` feature is enabled and
//! through the `log` facade otherwise. Only format strings understood by both
//! (`{}`, `{:?}`, `{:#x}`) are used inside the crate.
#![allow(unused_macros)]

macro_rules! trace {
    ($($arg:tt)+) => {{
        #[cfg(feature = "defmt")]
        ::defmt::trace!($($arg)+);
        #[cfg(not(feature = "defmt"))]
        ::log::trace!($($arg)+);
    }};
}

macro_rules! debug {
    ($($arg:tt)+) => {{
        #[cfg(feature = "defmt")]
        ::defmt::debug!($($arg)+);
        #[cfg(not(feature = "defmt"))]
        ::log::debug!($($arg)+);
    }};
}

macro_rules! warn {
    ($($arg:tt)+) => {{
        #[cfg(feature = "defmt")]
        ::defmt::warn!($($arg)+);
        #[cfg(not(feature = "defmt"))]
        ::log::warn!($($arg)+);
    }};
}
