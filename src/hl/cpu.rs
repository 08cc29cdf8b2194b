use byte::BytesExt;

use super::{
    routing::{self, ROUTING_TABLE},
    validate, Adrv904x, ChannelMask, CmdId, CpuType, Error, ObjectId, Version,
};
use crate::{codec::WIRE, maybe_async_attr, spi_type, RegisterBus};

/// Largest block a configuration command can carry
pub const MAX_CONFIG_DATA_SIZE: usize = 256;

/// Object ID, offset and length
const CONFIG_HEADER_LEN: usize = 8;

/// Number of SERDES lanes
pub const MAX_SERDES_LANES: usize = 8;

/// Command register opcode that makes a CPU raise an exception
const FORCE_EXCEPTION: u8 = 0x0F;

/// Build flags of a firmware image
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FwBuildType(pub u32);

impl FwBuildType {
    /// Debug build
    pub const DEBUG: u32 = 1 << 0;
    /// Release build
    pub const RELEASE: u32 = 1 << 1;
    /// Troubleshooting build
    pub const TRBLSHOOT: u32 = 1 << 2;

    /// True if every bit of `flags` is set
    pub const fn contains(&self, flags: u32) -> bool {
        self.0 & flags == flags
    }
}

/// Firmware version as reported by the running firmware
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FwVersion {
    /// Version number
    pub version: Version,
    /// Build flags
    pub build_type: FwBuildType,
}

impl<BUS, DELAY> Adrv904x<BUS, DELAY>
where
    BUS: RegisterBus,
    DELAY: spi_type::delay::DelayNs,
{
    /// Writes `data` to the configuration of `obj_id`, starting at `offset`
    ///
    /// The block is sent to CPU0 and then to CPU1. If CPU1 rejects it, the
    /// block stays applied on CPU0.
    #[maybe_async_attr]
    pub async fn cpu_config_set(
        &mut self,
        obj_id: ObjectId,
        offset: u16,
        data: &[u8],
    ) -> Result<(), Error<BUS>> {
        validate::in_range(data.len(), 1, MAX_CONFIG_DATA_SIZE, "length")?;

        let mut payload = [0u8; CONFIG_HEADER_LEN + MAX_CONFIG_DATA_SIZE];
        let len = config_header(&mut payload, obj_id, offset, data.len())?;
        payload[len..len + data.len()].copy_from_slice(data);
        let len = len + data.len();

        for cpu in CpuType::ALL {
            debug!("{:?}: config set, object {:#x}, offset {}", cpu, obj_id.0, offset);
            self.cmd_send(cpu, CmdId::SetConfig, &payload[..len], &mut [])
                .await?;
        }

        Ok(())
    }

    /// Reads `buf.len()` bytes of the configuration of `obj_id`, starting at
    /// `offset`
    ///
    /// Both CPUs hold the same configuration, it is read from CPU0.
    #[maybe_async_attr]
    pub async fn cpu_config_get(
        &mut self,
        obj_id: ObjectId,
        offset: u16,
        buf: &mut [u8],
    ) -> Result<(), Error<BUS>> {
        validate::in_range(buf.len(), 1, MAX_CONFIG_DATA_SIZE, "length")?;

        let mut payload = [0u8; CONFIG_HEADER_LEN];
        config_header(&mut payload, obj_id, offset, buf.len())?;

        // Device status word, then the data
        let mut resp = [0u8; 4 + MAX_CONFIG_DATA_SIZE];
        let resp = &mut resp[..4 + buf.len()];
        self.cmd_send(CpuType::Cpu0, CmdId::GetConfig, &payload, resp)
            .await?;
        buf.copy_from_slice(&resp[4..]);

        Ok(())
    }

    /// Puts both CPUs in debug mode
    #[maybe_async_attr]
    pub async fn cpu_debug_mode_enable(&mut self, key: u32) -> Result<(), Error<BUS>> {
        for cpu in CpuType::ALL {
            debug!("{:?}: entering debug mode", cpu);
            self.cmd_send(cpu, CmdId::EnterDebugMode, &key.to_le_bytes(), &mut [])
                .await?;
        }

        Ok(())
    }

    /// Unlocks configuration writes on both CPUs
    #[maybe_async_attr]
    pub async fn cpu_config_unlock(&mut self, key: u32) -> Result<(), Error<BUS>> {
        for cpu in CpuType::ALL {
            debug!("{:?}: unlocking configuration", cpu);
            self.cmd_send(cpu, CmdId::UnlockConfig, &key.to_le_bytes(), &mut [])
                .await?;
        }

        Ok(())
    }

    /// Reads the version of the running firmware
    ///
    /// Images must have been written to both CPUs.
    #[maybe_async_attr]
    pub async fn cpu_fw_version_get(&mut self) -> Result<FwVersion, Error<BUS>> {
        if !self.cpus.iter().all(|cpu| cpu.enabled) {
            return Err(Error::ImageNotLoaded);
        }

        let mut buf = [0u8; 20];
        let addr = self.cpus[CpuType::Cpu0.index()].version;
        self.read_bytes(addr, &mut buf).await?;

        let offset = &mut 0;
        Ok(FwVersion {
            version: Version {
                major: buf.read_with(offset, WIRE)?,
                minor: buf.read_with(offset, WIRE)?,
                maintenance: buf.read_with(offset, WIRE)?,
                build: buf.read_with(offset, WIRE)?,
            },
            build_type: FwBuildType(buf.read_with(offset, WIRE)?),
        })
    }

    /// Returns a mask of the CPUs that have raised an exception
    ///
    /// Bit `n` is set when CPU `n` has a non-zero exception flag.
    #[maybe_async_attr]
    pub async fn cpu_check_exception(&mut self) -> Result<u8, Error<BUS>> {
        let mut cpu_mask = 0;

        for cpu in CpuType::ALL {
            let addr = self.cpus[cpu.index()].exception_flag;
            if self.read_u32(addr).await? != 0 {
                cpu_mask |= cpu.mask();
            }
        }

        Ok(cpu_mask)
    }

    /// Makes `cpu` raise an exception
    #[maybe_async_attr]
    pub async fn cpu_force_exception(&mut self, cpu: CpuType) -> Result<(), Error<BUS>> {
        let addr = self.cpus[cpu.index()];
        warn!("{:?}: forcing an exception", cpu);

        self.write_bytes(addr.ext_command, &[0xFF; 4]).await?;
        self.write_u8(addr.command, FORCE_EXCEPTION).await
    }

    /// Returns the CPU that services the single channel of `channel` for
    /// object `obj_id`
    pub fn cpu_channel_mapping_get(
        &self,
        obj_id: ObjectId,
        channel: ChannelMask,
    ) -> Result<CpuType, Error<BUS>> {
        Ok(routing::route(
            ROUTING_TABLE,
            &self.config.cpu_assignment,
            obj_id,
            channel,
        )?)
    }

    /// Same as [`Adrv904x::cpu_channel_mapping_get`], with the channel given
    /// as a packed mask (see [`ChannelMask::packed`])
    ///
    /// Exactly one Rx, ORx or Tx channel must be set.
    pub fn cpu_channel_mapping_get_packed(
        &self,
        obj_id: ObjectId,
        packed: u32,
    ) -> Result<CpuType, Error<BUS>> {
        let mut parts = ChannelMask::unpack(packed)?
            .into_iter()
            .filter(|mask| mask.bits() != 0);

        match (parts.next(), parts.next()) {
            (Some(channel), None) => self.cpu_channel_mapping_get(obj_id, channel),
            _ => Err(Error::InvalidParameter("channel_mask")),
        }
    }

    /// Packed mask of the Rx, ORx and Tx channels `cpu` services for
    /// object `obj_id`
    pub fn cpu_serviced_channels_get(&self, obj_id: ObjectId, cpu: CpuType) -> u32 {
        routing::serviced_channels(ROUTING_TABLE, &self.config.cpu_assignment, obj_id, cpu)
    }

    /// Fills `cpus[n]` with the CPU servicing SERDES lane `n`
    pub fn cpu_serdes_lane_mapping_get(&self, cpus: &mut [CpuType]) -> Result<(), Error<BUS>> {
        validate::at_most(cpus.len(), MAX_SERDES_LANES, "lanes")?;

        for (lane, cpu) in cpus.iter_mut().enumerate() {
            *cpu = self.cpu_channel_mapping_get(
                ObjectId::IC_SERDES,
                ChannelMask::serdes_lane(1 << lane),
            )?;
        }

        Ok(())
    }
}

fn config_header(
    buf: &mut [u8],
    obj_id: ObjectId,
    offset: u16,
    len: usize,
) -> Result<usize, byte::Error> {
    let pos = &mut 0;
    buf.write_with(pos, u32::from(obj_id), WIRE)?;
    buf.write_with(pos, offset, WIRE)?;
    buf.write_with(pos, len as u16, WIRE)?;

    Ok(*pos)
}
