use super::{validate, Adrv904x, CmdId, CpuType, Error, ObjectId};
use crate::{
    ll, maybe_async_attr,
    memory_map::{image, scratch},
    spi_type, RegisterBus,
};

/// Number of rows in the breakpoint table, row 0 included
pub const BKPT_TABLE_SIZE: u8 = 9;

/// Object ID, channel mask and breakpoint mask
const BKPT_ROW_LEN: u32 = 12;

/// Channels a breakpoint can be armed on
const BKPT_CHAN_MASK: u32 = 0xFF;

/// A row of the firmware breakpoint table
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BreakpointEntry {
    /// Object the breakpoints belong to
    pub obj_id: ObjectId,
    /// Channels the breakpoints are armed on
    pub chan_mask: u32,
    /// Breakpoints of the object that are armed
    pub bkpt_mask: u32,
}

impl<BUS, DELAY> Adrv904x<BUS, DELAY>
where
    BUS: RegisterBus,
    DELAY: spi_type::delay::DelayNs,
{
    /// Arms the breakpoints of an object
    ///
    /// The object must have a row in the firmware breakpoint table.
    #[maybe_async_attr]
    pub async fn breakpoint_set(&mut self, entry: &BreakpointEntry) -> Result<(), Error<BUS>> {
        validate::at_most(entry.chan_mask, BKPT_CHAN_MASK, "chan_mask")?;

        let row = self.breakpoint_row(entry.obj_id).await?;
        debug!(
            "breakpoints of object {:#x}: channels {:#x}, mask {:#x}",
            entry.obj_id.0, entry.chan_mask, entry.bkpt_mask
        );

        self.write_u32(row + 4, entry.chan_mask).await?;
        self.write_u32(row + 8, entry.bkpt_mask).await
    }

    /// Reads the armed breakpoints of an object
    #[maybe_async_attr]
    pub async fn breakpoint_get(&mut self, obj_id: ObjectId) -> Result<BreakpointEntry, Error<BUS>> {
        let row = self.breakpoint_row(obj_id).await?;

        Ok(BreakpointEntry {
            obj_id,
            chan_mask: self.read_u32(row + 4).await?,
            bkpt_mask: self.read_u32(row + 8).await?,
        })
    }

    /// Reads the breakpoint each CPU is halted on
    ///
    /// The result is indexed by [`CpuType::index`]. `None` means the CPU is
    /// not halted on a breakpoint. The masks of a hit each have a single bit
    /// set: the breakpoint that was hit and the channel it was hit on.
    #[maybe_async_attr]
    pub async fn breakpoint_hit_read(&mut self) -> Result<[Option<BreakpointEntry>; 2], Error<BUS>> {
        let mut hits = [None; 2];

        for (cpu, ids) in [
            (
                CpuType::Cpu0,
                [
                    scratch::CPU0_BKPT_HIT_INDEX,
                    scratch::CPU0_BKPT_HIT_NUMBER,
                    scratch::CPU0_BKPT_HIT_CHANNEL,
                ],
            ),
            (
                CpuType::Cpu1,
                [
                    scratch::CPU1_BKPT_HIT_INDEX,
                    scratch::CPU1_BKPT_HIT_NUMBER,
                    scratch::CPU1_BKPT_HIT_CHANNEL,
                ],
            ),
        ] {
            let index = self.scratch_read(ids[0]).await?;
            let number = self.scratch_read(ids[1]).await?;
            let channel = self.scratch_read(ids[2]).await?;

            if index == 0 {
                continue;
            }
            validate::at_most(index, BKPT_TABLE_SIZE - 1, "breakpoint_index")?;
            validate::at_most(number, 31, "breakpoint_number")?;
            validate::at_most(channel, 31, "breakpoint_channel")?;

            let table = self.read_u32(image::PM_SW_BKPT_TABLE_PTR).await?;
            let obj_id = self.read_u32(table + index as u32 * BKPT_ROW_LEN).await?;

            debug!("{:?}: halted on breakpoint {} of object {:#x}", cpu, number, obj_id);
            hits[cpu.index()] = Some(BreakpointEntry {
                obj_id: ObjectId(obj_id as u8),
                chan_mask: 1 << channel,
                bkpt_mask: 1 << number,
            });
        }

        Ok(hits)
    }

    /// Resumes the tasks halted on a breakpoint, on both CPUs
    ///
    /// With `resume_all`, every task halted on the object resumes, whatever
    /// its channel.
    #[maybe_async_attr]
    pub async fn breakpoint_resume(
        &mut self,
        entry: &BreakpointEntry,
        resume_all: bool,
    ) -> Result<(), Error<BUS>> {
        validate::at_most(entry.chan_mask, BKPT_CHAN_MASK, "chan_mask")?;

        let mut payload = [0u8; 6];
        payload[..4].copy_from_slice(&u32::from(entry.obj_id).to_le_bytes());
        payload[4] = entry.chan_mask as u8;
        payload[5] = resume_all as u8;

        for cpu in CpuType::ALL {
            self.cmd_send(cpu, CmdId::ResumeBkpt, &payload, &mut [])
                .await?;
        }

        Ok(())
    }

    /// Resumes the subsystems halted by a global halt
    #[maybe_async_attr]
    pub async fn breakpoint_resume_from_halt(&mut self) -> Result<(), Error<BUS>> {
        self.write_field(ll::DBG_GLOBAL_RESUME, 0).await
    }

    /// Sets the mask of breakpoints that halt the whole device
    #[maybe_async_attr]
    pub async fn breakpoint_global_halt_mask_set(&mut self, mask: u32) -> Result<(), Error<BUS>> {
        let addr = self.read_u32(image::PM_SW_BKPT_GLOBAL_HALT_MASK_PTR).await?;
        self.write_u32(addr, mask).await
    }

    /// Reads the mask of breakpoints that halt the whole device
    #[maybe_async_attr]
    pub async fn breakpoint_global_halt_mask_get(&mut self) -> Result<u32, Error<BUS>> {
        let addr = self.read_u32(image::PM_SW_BKPT_GLOBAL_HALT_MASK_PTR).await?;
        self.read_u32(addr).await
    }

    /// Address of the table row of `obj_id`
    #[maybe_async_attr]
    async fn breakpoint_row(&mut self, obj_id: ObjectId) -> Result<u32, Error<BUS>> {
        let table = self.read_u32(image::PM_SW_BKPT_TABLE_PTR).await?;

        // Row 0 is reserved
        for index in 1..BKPT_TABLE_SIZE as u32 {
            let row = table + index * BKPT_ROW_LEN;
            if self.read_u32(row).await? == u32::from(obj_id) {
                return Ok(row);
            }
        }

        Err(Error::InvalidParameter("obj_id"))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use crate::{
        hl::test_util::{ack, device, FakeBus, Reply, Request},
        memory_map::{self, SCRATCH_BASE},
    };

    const TABLE: u32 = 0x0100_8000;

    /// A bus with a breakpoint table holding DPD in row 2 and CLGC's
    /// neighbour TX QEC in row 5
    fn table_bus() -> FakeBus {
        let mut bus = FakeBus::new();
        bus.set_word(image::PM_SW_BKPT_TABLE_PTR, TABLE);
        for index in 0..BKPT_TABLE_SIZE as u32 {
            bus.set_word(TABLE + index * BKPT_ROW_LEN, 0xff);
        }
        // Row 0 is never matched, even when it holds a valid object
        bus.set_word(TABLE, u32::from(ObjectId::TC_TX_DPD));
        bus.set_word(TABLE + 2 * BKPT_ROW_LEN, u32::from(ObjectId::TC_TX_DPD));
        bus.set_word(TABLE + 5 * BKPT_ROW_LEN, u32::from(ObjectId::TC_TX_QEC));
        bus
    }

    #[tokio::test]
    async fn test_set_get_round_trip() {
        let mut adrv = device(table_bus());
        let entry = BreakpointEntry {
            obj_id: ObjectId::TC_TX_QEC,
            chan_mask: 0x81,
            bkpt_mask: 0x0000_0006,
        };

        adrv.breakpoint_set(&entry).await.unwrap();

        assert_eq!(adrv.breakpoint_get(ObjectId::TC_TX_QEC).await.unwrap(), entry);
        let bus = adrv.bus();
        assert_eq!(bus.word(TABLE + 5 * BKPT_ROW_LEN + 4), 0x81);
        assert_eq!(bus.word(TABLE + 5 * BKPT_ROW_LEN + 8), 0x06);
        // Row 2 untouched
        assert_eq!(bus.word(TABLE + 2 * BKPT_ROW_LEN + 4), 0);
    }

    #[tokio::test]
    async fn test_reserved_row_skipped() {
        let mut adrv = device(table_bus());
        let entry = BreakpointEntry {
            obj_id: ObjectId::TC_TX_DPD,
            chan_mask: 0x01,
            bkpt_mask: 0x01,
        };

        adrv.breakpoint_set(&entry).await.unwrap();

        let bus = adrv.bus();
        assert_eq!(bus.word(TABLE + 4), 0);
        assert_eq!(bus.word(TABLE + 2 * BKPT_ROW_LEN + 4), 0x01);
    }

    #[tokio::test]
    async fn test_unknown_object() {
        let mut adrv = device(table_bus());

        let err = adrv.breakpoint_get(ObjectId::TC_SERDES).await.unwrap_err();
        assert!(matches!(err, Error::InvalidParameter("obj_id")));

        let err = adrv
            .breakpoint_set(&BreakpointEntry {
                obj_id: ObjectId::TC_TX_QEC,
                chan_mask: 0x100,
                bkpt_mask: 0,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter("chan_mask")));
    }

    #[tokio::test]
    async fn test_hit_read() {
        let mut bus = table_bus();
        bus.set_bytes(
            SCRATCH_BASE + scratch::CPU1_BKPT_HIT_INDEX as u32,
            &[5, 3, 6],
        );
        let mut adrv = device(bus);

        let hits = adrv.breakpoint_hit_read().await.unwrap();

        assert_eq!(hits[CpuType::Cpu0.index()], None);
        assert_eq!(
            hits[CpuType::Cpu1.index()],
            Some(BreakpointEntry {
                obj_id: ObjectId::TC_TX_QEC,
                chan_mask: 0x40,
                bkpt_mask: 0x08,
            })
        );
    }

    #[tokio::test]
    async fn test_resume() {
        let bus = table_bus()
            .with_firmware(CpuType::Cpu0, ack())
            .with_firmware(
                CpuType::Cpu1,
                Box::new(|request: &Request| {
                    assert_eq!(request.cmd_id, CmdId::ResumeBkpt as u16);
                    Reply::ok(&[])
                }),
            );
        let mut adrv = device(bus);
        let entry = BreakpointEntry {
            obj_id: ObjectId::TC_TX_DPD,
            chan_mask: 0x02,
            bkpt_mask: 0,
        };

        adrv.breakpoint_resume(&entry, true).await.unwrap();

        let sent = adrv.bus().sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].0, CpuType::Cpu0);
        assert_eq!(sent[0].1.payload, vec![0x36, 0, 0, 0, 0x02, 0x01]);
        assert_eq!(sent[1].0, CpuType::Cpu1);
    }

    #[tokio::test]
    async fn test_halt_controls() {
        let mut bus = table_bus();
        bus.set_word(image::PM_SW_BKPT_GLOBAL_HALT_MASK_PTR, 0x0100_9000);
        bus.set_bytes(memory_map::DBG_CTL, &[0x03]);
        let mut adrv = device(bus);

        adrv.breakpoint_global_halt_mask_set(0x0000_00f0)
            .await
            .unwrap();
        assert_eq!(adrv.breakpoint_global_halt_mask_get().await.unwrap(), 0xf0);
        assert_eq!(adrv.bus().word(0x0100_9000), 0xf0);

        adrv.breakpoint_resume_from_halt().await.unwrap();
        assert_eq!(adrv.bus().byte(memory_map::DBG_CTL), 0x02);
    }
}
