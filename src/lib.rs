//! Driver crate for the ADRV903x/ADRV904x RF transceiver family
//!
//! The transceiver embeds two CPUs that run the calibration firmware. This
//! crate boots those CPUs, talks to them through their register-mapped
//! mailboxes and exposes the calibration controls (DPD, CLGC, software
//! breakpoints) on top of that.
//!
//! The recommended way to use this driver is the [high-level interface]. The
//! [register-level interface] only provides the raw register transport.
//!
//! This driver is built on top of [`embedded-hal`], which means it is portable
//! and can be used on any platform that implements the `embedded-hal` API.
//!
//! [high-level interface]: hl/index.html
//! [register-level interface]: ll/index.html
//! [`embedded-hal`]: https://crates.io/crates/embedded-hal
#![cfg_attr(not(any(test, feature = "std")), no_std)]

#[cfg(feature = "async")]
use maybe_async::must_be_async as maybe_async_attr;
#[cfg(not(feature = "async"))]
use maybe_async::must_be_sync as maybe_async_attr;

#[cfg(not(feature = "async"))]
use embedded_hal as spi_type;
#[cfg(feature = "async")]
use embedded_hal_async as spi_type;

#[macro_use]
mod fmt;

pub mod codec;
pub mod configs;
pub mod fixed_point;
pub mod hl;
pub mod ll;
pub mod memory_map;

pub use crate::{
    configs::Config,
    fixed_point::FixedPoint,
    hl::{Adrv904x, ChannelClass, Command, CpuType, Error, ObjectId},
    ll::RegisterBus,
};
