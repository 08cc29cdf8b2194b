//! High-level interface to the ADRV904x
//!
//! The entry point to this API is the [Adrv904x] struct. It is the device
//! context: it owns the register transport, the delay provider and every
//! piece of state the driver keeps about the two embedded CPUs. Every
//! operation takes it by `&mut self`, so callers that share a device across
//! tasks have to serialize access themselves.
//!
//! The operations are grouped by topic:
//! - [mailbox](Adrv904x::cmd_send) command channel, including calibration
//!   control commands routed to the CPU servicing a channel
//! - CPU [boot](Adrv904x::cpu_image_write) and firmware queries
//! - software [breakpoints](Adrv904x::breakpoint_set)
//! - [DPD](Adrv904x::dpd_tracking_config_set) and
//!   [CLGC](Adrv904x::clgc_tracking_config_set) calibration settings
//! - [channel to CPU mapping](Adrv904x::cpu_channel_mapping_get)

use core::fmt;

pub use boot::*;
pub use breakpoint::*;
pub use cal::{CapBufAccessCfg, CapBufInfo, CAP_BUF_MAX_BUFFERS, CAP_BUF_PAUSE_ERROR_CODES};
pub use channel::*;
pub use clgc::*;
pub use cpu::*;
pub use dpd::*;
pub use error::*;
pub use mailbox::*;
pub use object_id::*;
pub use routing::*;

use crate::{codec, configs::Config, ll, maybe_async_attr, memory_map, spi_type, RegisterBus};

mod boot;
mod breakpoint;
mod cal;
mod channel;
mod clgc;
mod cpu;
mod dpd;
mod error;
mod mailbox;
mod object_id;
mod routing;
pub mod validate;

#[cfg(test)]
pub(crate) mod test_util;

/// One of the two embedded CPUs
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CpuType {
    /// Primary CPU, controls the boot
    Cpu0 = 0,
    /// Secondary CPU, started by CPU0
    Cpu1 = 1,
}

impl CpuType {
    /// Both CPUs, in the order commands are sent to them
    pub const ALL: [CpuType; 2] = [CpuType::Cpu0, CpuType::Cpu1];

    /// Index of the CPU in per-CPU tables
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Bit of the CPU in CPU bitmasks
    pub const fn mask(self) -> u8 {
        1 << (self as u8)
    }
}

/// Register locations and host-side state of one CPU
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CpuAddr {
    /// Command register
    pub command: u32,
    /// First of the four extended command bytes
    pub ext_command: u32,
    /// Command status nibbles
    pub command_status: u32,
    /// Command busy bitfield
    pub command_busy: ll::Field,
    /// Boot address register
    pub boot_addr: u32,
    /// Stack pointer register
    pub stack_ptr: u32,
    /// Memory bank control register
    pub mem_bank_ctrl: u32,
    /// Program memory start
    pub prog_start: u32,
    /// Mailbox window
    pub mailbox: u32,
    /// Firmware version block
    pub version: u32,
    /// Exception flag word
    pub exception_flag: u32,
    /// Set once an image chunk has been written to this CPU
    pub enabled: bool,
    transaction_id: u16,
}

impl CpuAddr {
    const fn cpu0() -> Self {
        use memory_map::cpu0;

        CpuAddr {
            command: cpu0::COMMAND,
            ext_command: cpu0::EXT_COMMAND,
            command_status: cpu0::COMMAND_STATUS,
            command_busy: ll::CPU0_CMD_BUSY,
            boot_addr: cpu0::BOOT_ADDR,
            stack_ptr: cpu0::STACK_PTR,
            mem_bank_ctrl: cpu0::MEM_BANK_CTRL,
            prog_start: cpu0::PROG_START,
            mailbox: cpu0::MAILBOX,
            version: cpu0::VERSION,
            exception_flag: cpu0::EXCEPTION_FLAG,
            enabled: false,
            transaction_id: 0,
        }
    }

    const fn cpu1() -> Self {
        use memory_map::cpu1;

        CpuAddr {
            command: cpu1::COMMAND,
            ext_command: cpu1::EXT_COMMAND,
            command_status: cpu1::COMMAND_STATUS,
            command_busy: ll::CPU1_CMD_BUSY,
            boot_addr: cpu1::BOOT_ADDR,
            stack_ptr: cpu1::STACK_PTR,
            mem_bank_ctrl: cpu1::MEM_BANK_CTRL,
            prog_start: cpu1::PROG_START,
            mailbox: cpu1::MAILBOX,
            version: cpu1::VERSION,
            exception_flag: cpu1::EXCEPTION_FLAG,
            enabled: false,
            transaction_id: 0,
        }
    }

    /// Transaction ID of the last command sent to this CPU
    pub fn transaction_id(&self) -> u16 {
        self.transaction_id
    }
}

/// Boot progress observed by the driver
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DevState {
    /// CPU0 reported a JTAG build waiting for a debugger
    pub cpu_debug_loaded: bool,
    /// CPU0 reported that both CPUs are up
    pub all_cpus_loaded: bool,
}

/// A four part version number
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Version {
    /// Major version
    pub major: u32,
    /// Minor version
    pub minor: u32,
    /// Maintenance version
    pub maintenance: u32,
    /// Build number
    pub build: u32,
}

/// Entry point to the ADRV904x driver API
pub struct Adrv904x<BUS, DELAY> {
    bus: BUS,
    delay: DELAY,
    config: Config,
    cpus: [CpuAddr; 2],
    state: DevState,
    fw_version: Version,
    profile_version: Version,
    dev_profile_addr: Option<u32>,
    debug_config_addr: Option<u32>,
}

// Can't be derived without putting requirements on `BUS` and `DELAY`.
impl<BUS, DELAY> fmt::Debug for Adrv904x<BUS, DELAY> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Adrv904x {{ state: {:?}, fw_version: {:?}, .. }}",
            self.state, self.fw_version
        )
    }
}

impl<BUS, DELAY> Adrv904x<BUS, DELAY> {
    /// Create a new device context
    ///
    /// Requires the register transport (usually an [`ll::Adrv904x`]) and a
    /// delay provider used between polls.
    pub fn new(bus: BUS, delay: DELAY, config: Config) -> Self {
        Adrv904x {
            bus,
            delay,
            config,
            cpus: [CpuAddr::cpu0(), CpuAddr::cpu1()],
            state: DevState::default(),
            fw_version: Version::default(),
            profile_version: Version::default(),
            dev_profile_addr: None,
            debug_config_addr: None,
        }
    }

    /// Returns the active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the register locations and state of a CPU
    pub fn cpu_addr(&self, cpu: CpuType) -> &CpuAddr {
        &self.cpus[cpu.index()]
    }

    /// Returns the boot progress observed so far
    pub fn state(&self) -> DevState {
        self.state
    }

    /// Firmware version extracted from the CPU0 image while it was written
    pub fn fw_version(&self) -> Version {
        self.fw_version
    }

    /// Version extracted from the device profile while it was written
    pub fn profile_version(&self) -> Version {
        self.profile_version
    }

    /// Device profile address extracted from the CPU1 image
    pub fn dev_profile_addr(&self) -> Option<u32> {
        self.dev_profile_addr
    }

    /// Debug configuration address extracted from the CPU0 image
    pub fn debug_config_addr(&self) -> Option<u32> {
        self.debug_config_addr
    }

    /// Provides direct access to the register transport
    ///
    /// Be aware that by using the transport directly, you can invalidate
    /// various assumptions that the high-level API makes about the state of
    /// the CPUs.
    pub fn bus(&mut self) -> &mut BUS {
        &mut self.bus
    }

    /// Releases the register transport and the delay provider
    pub fn release(self) -> (BUS, DELAY) {
        (self.bus, self.delay)
    }
}

impl<BUS, DELAY> Adrv904x<BUS, DELAY>
where
    BUS: RegisterBus,
    DELAY: spi_type::delay::DelayNs,
{
    /// Prepares both CPU memories for an image download
    #[maybe_async_attr]
    pub async fn init(&mut self) -> Result<(), Error<BUS>> {
        for cpu in CpuType::ALL {
            let addr = self.cpus[cpu.index()].mem_bank_ctrl;
            self.write_u8(addr, memory_map::MEM_BANK_CTRL_INIT).await?;
        }

        Ok(())
    }

    #[maybe_async_attr]
    pub(crate) async fn read_bytes(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), Error<BUS>> {
        self.bus.read(addr, buf).await.map_err(Error::Bus)
    }

    #[maybe_async_attr]
    pub(crate) async fn write_bytes(&mut self, addr: u32, data: &[u8]) -> Result<(), Error<BUS>> {
        self.bus.write(addr, data).await.map_err(Error::Bus)
    }

    #[maybe_async_attr]
    pub(crate) async fn read_u8(&mut self, addr: u32) -> Result<u8, Error<BUS>> {
        let mut buf = [0];
        self.read_bytes(addr, &mut buf).await?;

        Ok(buf[0])
    }

    #[maybe_async_attr]
    pub(crate) async fn write_u8(&mut self, addr: u32, value: u8) -> Result<(), Error<BUS>> {
        self.write_bytes(addr, &[value]).await
    }

    /// Reads a 32-bit word stored in device byte order
    #[maybe_async_attr]
    pub(crate) async fn read_u32(&mut self, addr: u32) -> Result<u32, Error<BUS>> {
        let mut buf = [0; 4];
        self.read_bytes(addr, &mut buf).await?;

        Ok(codec::wire_to_host_32(u32::from_ne_bytes(buf)))
    }

    /// Writes a 32-bit word in device byte order
    #[maybe_async_attr]
    pub(crate) async fn write_u32(&mut self, addr: u32, value: u32) -> Result<(), Error<BUS>> {
        self.write_bytes(addr, &codec::host_to_wire_32(value).to_ne_bytes())
            .await
    }

    #[maybe_async_attr]
    pub(crate) async fn read_field(&mut self, field: ll::Field) -> Result<u8, Error<BUS>> {
        self.bus.read_field(field).await.map_err(Error::Bus)
    }

    #[maybe_async_attr]
    pub(crate) async fn write_field(&mut self, field: ll::Field, value: u8) -> Result<(), Error<BUS>> {
        self.bus.write_field(field, value).await.map_err(Error::Bus)
    }

    /// Reads a scratch register
    #[maybe_async_attr]
    pub async fn scratch_read(&mut self, id: u8) -> Result<u8, Error<BUS>> {
        validate::at_most(id, memory_map::SCRATCH_MAX, "scratch_id")?;
        self.read_u8(memory_map::SCRATCH_BASE + id as u32).await
    }

    /// Writes a scratch register
    #[maybe_async_attr]
    pub async fn scratch_write(&mut self, id: u8, value: u8) -> Result<(), Error<BUS>> {
        validate::at_most(id, memory_map::SCRATCH_MAX, "scratch_id")?;
        self.write_u8(memory_map::SCRATCH_BASE + id as u32, value).await
    }

    #[maybe_async_attr]
    pub(crate) async fn wait_us(&mut self, us: u32) {
        self.delay.delay_us(us).await
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use test_util::{device, FakeBus};

    #[tokio::test]
    async fn test_init_programs_memory_banks() {
        let mut adrv = device(FakeBus::new());

        adrv.init().await.unwrap();

        let bus = adrv.bus();
        assert_eq!(bus.byte(memory_map::cpu0::MEM_BANK_CTRL), memory_map::MEM_BANK_CTRL_INIT);
        assert_eq!(bus.byte(memory_map::cpu1::MEM_BANK_CTRL), memory_map::MEM_BANK_CTRL_INIT);
    }

    #[tokio::test]
    async fn test_scratch_range() {
        let mut adrv = device(FakeBus::new());

        adrv.scratch_write(memory_map::scratch::CPU0_IS_PRIMARY, 1)
            .await
            .unwrap();
        assert_eq!(
            adrv.scratch_read(memory_map::scratch::CPU0_IS_PRIMARY)
                .await
                .unwrap(),
            1
        );

        let err = adrv.scratch_read(217).await.unwrap_err();
        assert!(matches!(err, Error::InvalidParameter("scratch_id")));
        assert_eq!(adrv.bus().reads().len(), 1);
    }

    #[test]
    fn test_cpu_masks() {
        assert_eq!(CpuType::Cpu0.mask(), 0b01);
        assert_eq!(CpuType::Cpu1.mask(), 0b10);
        assert_eq!(CpuType::Cpu1.index(), 1);
    }
}
