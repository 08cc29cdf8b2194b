//! Driver configuration
//!
//! This module houses the datastructures that control the driver's polling
//! behaviour and how channels are assigned to the two embedded CPUs. The
//! config is passed to [`Adrv904x::new`](crate::Adrv904x::new).

use crate::hl::CpuType;

/// Driver configuration
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Total time to wait for a busy mailbox before writing a command.
    ///
    /// Defaults to 1 second.
    pub send_cmd_timeout_us: u32,
    /// Interval between two mailbox busy checks.
    ///
    /// Defaults to 100 µs.
    pub send_cmd_interval_us: u32,
    /// Total time to wait for the command status after triggering a command.
    ///
    /// Defaults to 1 second.
    pub read_resp_timeout_us: u32,
    /// Interval between two command status checks.
    ///
    /// Defaults to 100 µs.
    pub read_resp_interval_us: u32,
    /// Interval between two boot status checks. Clamped to the timeout given
    /// to the boot status check.
    ///
    /// Defaults to 10 ms.
    pub boot_interval_us: u32,
    /// Which CPU services which channel
    pub cpu_assignment: CpuAssignment,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            send_cmd_timeout_us: 1_000_000,
            send_cmd_interval_us: 100,
            read_resp_timeout_us: 1_000_000,
            read_resp_interval_us: 100,
            boot_interval_us: 10_000,
            cpu_assignment: Default::default(),
        }
    }
}

/// Channel to CPU assignment
///
/// This comes from the device profile loaded on the transceiver. The default
/// splits every channel class in two halves, the lower half on CPU0.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CpuAssignment {
    /// CPU servicing each Rx/Tx channel pair, indexed by channel number
    pub rx_tx: [CpuType; 8],
    /// CPU servicing each ORx channel
    pub orx: [CpuType; 2],
    /// CPU servicing each SERDES lane
    pub serdes_lane: [CpuType; 8],
}

impl Default for CpuAssignment {
    fn default() -> Self {
        use CpuType::{Cpu0, Cpu1};

        CpuAssignment {
            rx_tx: [Cpu0, Cpu0, Cpu0, Cpu0, Cpu1, Cpu1, Cpu1, Cpu1],
            orx: [Cpu0, Cpu1],
            serdes_lane: [Cpu0, Cpu0, Cpu0, Cpu0, Cpu1, Cpu1, Cpu1, Cpu1],
        }
    }
}
