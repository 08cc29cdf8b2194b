use super::{mailbox::poll_budget, validate, Adrv904x, CpuType, Error, Version};
use crate::{
    codec, ll, maybe_async_attr,
    memory_map::{image, scratch},
    spi_type, RegisterBus,
};

/// Boot status reported by CPU0 in its boot status scratch register
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BootStatus {
    /// The CPU is running its boot code
    PowerUp,
    /// Both CPUs are up
    StatusReady,
    /// CPU0 waits for CPU1
    WaitForCpus,
    /// A JTAG build is waiting for a debugger
    JtagBuildStatusReady,
    /// Firmware checksum mismatch
    FwCrcErr,
    /// Efuse contents could not be read
    EfuseDataErr,
    /// The device profile does not match the product ID
    PidProfileMismatchErr,
    /// The device profile is invalid
    DeviceProfileInvalidErr,
    /// Clock logic could not be initialized
    ClkLogicInitErr,
    /// JESD setup failed
    JesdSetupConfigErr,
    /// Power up initialization failed
    PowerUpInitErr,
    /// CPU memory initialization failed
    CpuMemoryInitErr,
    /// A stream processor reported an error
    StreamRuntimeErr,
    /// The watchdog fired
    WatchdogTimeoutErr,
    /// CPU1 did not come up in time
    Cpu1BootTimeoutErr,
    /// Unspecified boot error
    UnexpectedErr,
    /// Any other value
    Other(u8),
}

impl BootStatus {
    /// Decodes a raw status
    pub const fn from_raw(raw: u8) -> Self {
        match raw {
            0 => BootStatus::PowerUp,
            1 => BootStatus::StatusReady,
            2 => BootStatus::WaitForCpus,
            3 => BootStatus::JtagBuildStatusReady,
            4 => BootStatus::FwCrcErr,
            5 => BootStatus::EfuseDataErr,
            6 => BootStatus::PidProfileMismatchErr,
            7 => BootStatus::DeviceProfileInvalidErr,
            8 => BootStatus::ClkLogicInitErr,
            9 => BootStatus::JesdSetupConfigErr,
            10 => BootStatus::PowerUpInitErr,
            11 => BootStatus::CpuMemoryInitErr,
            12 => BootStatus::StreamRuntimeErr,
            13 => BootStatus::WatchdogTimeoutErr,
            14 => BootStatus::Cpu1BootTimeoutErr,
            15 => BootStatus::UnexpectedErr,
            other => BootStatus::Other(other),
        }
    }

    /// Raw status value
    pub const fn raw(self) -> u8 {
        match self {
            BootStatus::PowerUp => 0,
            BootStatus::StatusReady => 1,
            BootStatus::WaitForCpus => 2,
            BootStatus::JtagBuildStatusReady => 3,
            BootStatus::FwCrcErr => 4,
            BootStatus::EfuseDataErr => 5,
            BootStatus::PidProfileMismatchErr => 6,
            BootStatus::DeviceProfileInvalidErr => 7,
            BootStatus::ClkLogicInitErr => 8,
            BootStatus::JesdSetupConfigErr => 9,
            BootStatus::PowerUpInitErr => 10,
            BootStatus::CpuMemoryInitErr => 11,
            BootStatus::StreamRuntimeErr => 12,
            BootStatus::WatchdogTimeoutErr => 13,
            BootStatus::Cpu1BootTimeoutErr => 14,
            BootStatus::UnexpectedErr => 15,
            BootStatus::Other(other) => other,
        }
    }
}

/// Returns the word at `field` if all four of its bytes lie in the chunk
/// written at `offset`
fn contained_word(offset: u32, data: &[u8], field: u32) -> Option<u32> {
    let end = offset as usize + data.len();
    if field < offset || field as usize + 4 > end {
        return None;
    }

    let start = (field - offset) as usize;
    Some(codec::int_from_bytes(&data[start..], 4))
}

/// Updates the parts of `version` whose words are contained in the chunk
fn extract_version(version: &mut Version, offset: u32, data: &[u8], field: u32) {
    for (i, part) in [
        &mut version.major,
        &mut version.minor,
        &mut version.maintenance,
        &mut version.build,
    ]
    .into_iter()
    .enumerate()
    {
        if let Some(word) = contained_word(offset, data, field + 4 * i as u32) {
            *part = word;
        }
    }
}

fn check_chunk(offset: u32, data: &[u8]) -> validate::Result {
    validate::one_of(offset % 4, &[0], "offset")?;
    validate::one_of(data.len() % 4, &[0], "length")?;
    validate::at_least(data.len(), 4, "length")
}

impl<BUS, DELAY> Adrv904x<BUS, DELAY>
where
    BUS: RegisterBus,
    DELAY: spi_type::delay::DelayNs,
{
    /// Writes a chunk of a CPU firmware image to program memory
    ///
    /// An image can be written in chunks of any size, as long as `offset`
    /// and the chunk length are multiples of 4. The chunk at offset 0 must
    /// hold at least the stack pointer and the boot address.
    ///
    /// Metadata embedded in the image (firmware version, device profile and
    /// debug configuration pointers) is picked up from the chunks as they
    /// are written. A word is only picked up from a chunk that holds all of
    /// it.
    #[maybe_async_attr]
    pub async fn cpu_image_write(
        &mut self,
        cpu: CpuType,
        offset: u32,
        data: &[u8],
    ) -> Result<(), Error<BUS>> {
        check_chunk(offset, data)?;
        if offset == 0 {
            validate::at_least(data.len(), 8, "length")?;
        }

        let addr = self.cpus[cpu.index()];

        if offset == 0 {
            let stack_ptr = codec::int_from_bytes(data, 4);
            let boot_addr = codec::int_from_bytes(&data[4..], 4);
            debug!(
                "{:?}: stack pointer {:#x}, boot address {:#x}",
                cpu, stack_ptr, boot_addr
            );

            self.write_u32(addr.stack_ptr, stack_ptr).await?;
            self.write_u32(addr.boot_addr, boot_addr).await?;
        }

        trace!("{:?}: image chunk at {:#x}, {} bytes", cpu, offset, data.len());
        self.write_bytes(addr.prog_start + offset, data).await?;

        match cpu {
            CpuType::Cpu0 => {
                extract_version(
                    &mut self.fw_version,
                    offset,
                    data,
                    image::offset_of(image::PM_DEVICE_REV_DATA),
                );
                if let Some(ptr) =
                    contained_word(offset, data, image::offset_of(image::PM_DEBUG_CONFIG_PTR))
                {
                    self.debug_config_addr = Some(ptr);
                }
            }
            CpuType::Cpu1 => {
                if let Some(ptr) =
                    contained_word(offset, data, image::offset_of(image::PM_DEVICE_PROFILE_PTR))
                {
                    debug!("device profile at {:#x}", ptr);
                    self.dev_profile_addr = Some(ptr);
                }
            }
        }

        self.cpus[cpu.index()].enabled = true;

        Ok(())
    }

    /// Writes a chunk of the device profile
    ///
    /// The profile goes to the address found in the CPU1 image, so that
    /// chunk has to be written first. The same alignment rules as for
    /// [`Adrv904x::cpu_image_write`] apply.
    #[maybe_async_attr]
    pub async fn cpu_profile_write(&mut self, offset: u32, data: &[u8]) -> Result<(), Error<BUS>> {
        check_chunk(offset, data)?;
        let end = offset
            .checked_add(data.len() as u32)
            .ok_or(Error::InvalidParameter("length"))?;
        validate::at_most(end, image::DEVICE_PROFILE_SIZE, "length")?;
        let base = self.dev_profile_addr.ok_or(Error::ImageNotLoaded)?;

        trace!("profile chunk at {:#x}, {} bytes", offset, data.len());
        self.write_bytes(base + offset, data).await?;

        extract_version(&mut self.profile_version, offset, data, 0);

        Ok(())
    }

    /// Starts CPU0
    ///
    /// CPU0 starts CPU1 by itself. Use [`Adrv904x::cpu_start_status_check`]
    /// to wait for both.
    #[maybe_async_attr]
    pub async fn cpu_start(&mut self) -> Result<(), Error<BUS>> {
        let cpu0 = self.cpus[CpuType::Cpu0.index()];
        if !cpu0.enabled {
            return Err(Error::ImageNotLoaded);
        }

        // Write order matters
        self.write_u32(cpu0.mailbox, 0xFFFF_FFFF).await?;
        self.write_field(ll::CPU0_MEM_HRESP_MASK, 0).await?;
        self.scratch_write(scratch::CPU0_IS_PRIMARY, 1).await?;
        self.scratch_write(scratch::CPU1_IS_PRIMARY, 0).await?;
        self.write_field(ll::CPU0_M3_RUN, 1).await?;

        debug!("CPU0 started");

        Ok(())
    }

    /// Waits for the CPUs to finish booting
    ///
    /// Polls the CPU0 boot status every [`Config::boot_interval_us`], at most
    /// for `timeout_us`.
    ///
    /// [`Config::boot_interval_us`]: crate::Config::boot_interval_us
    #[maybe_async_attr]
    pub async fn cpu_start_status_check(&mut self, timeout_us: u32) -> Result<(), Error<BUS>> {
        if !self.cpus[CpuType::Cpu0.index()].enabled {
            return Err(Error::ImageNotLoaded);
        }

        let (interval, checks) = poll_budget(timeout_us, self.config.boot_interval_us);

        for check in 0..=checks {
            if check == 0 && self.read_field(ll::CPU0_M3_RUN).await? == 0 {
                return Err(Error::BootNotStarted);
            }

            let status = BootStatus::from_raw(self.scratch_read(scratch::CPU0_BOOT_STATUS).await?);
            trace!("boot status {:?}", status);

            match status {
                BootStatus::PowerUp | BootStatus::WaitForCpus => {}
                BootStatus::JtagBuildStatusReady if self.state.cpu_debug_loaded => {}
                BootStatus::JtagBuildStatusReady => {
                    debug!("CPUs booted in debug mode");
                    self.state.cpu_debug_loaded = true;
                    return Ok(());
                }
                BootStatus::StatusReady => {
                    debug!("CPUs booted");
                    self.state.all_cpus_loaded = true;
                    return Ok(());
                }
                status => {
                    let product_id = if status == BootStatus::PidProfileMismatchErr {
                        self.product_id().await
                    } else {
                        None
                    };
                    warn!("boot failed with status {:?}", status);

                    return Err(Error::BootFailure { status, product_id });
                }
            }

            if check < checks {
                self.wait_us(interval).await;
            }
        }

        warn!("timed out waiting for the CPUs to boot");
        Err(Error::BootTimeout)
    }

    /// Product ID from the efuse settings, `None` if it could not be read
    #[maybe_async_attr]
    async fn product_id(&mut self) -> Option<u8> {
        let ptr = self.read_u32(image::CPU0_PM_EFUSE_SETTINGS_PTR).await.ok()?;
        let value = self.read_u32(ptr).await.ok()?;

        Some(value as u8)
    }
}
