use byte::BytesExt;

use super::{routing, validate, Adrv904x, ChannelMask, CpuType, Error, ObjectId};
use crate::{codec::WIRE, maybe_async_attr, memory_map, spi_type, RegisterBus};

/// Link used for every command
pub const LINK_ID: u8 = 0;

/// Length of the command header: command ID and transaction ID
pub const CMD_HEADER_LEN: usize = 4;
/// Length of the response header: command ID, transaction ID and status
pub const RESP_HEADER_LEN: usize = 6;
/// Largest command payload that fits the mailbox
pub const MAX_CMD_PAYLOAD: usize = memory_map::MAILBOX_SIZE - CMD_HEADER_LEN;
/// Largest response payload that fits the mailbox
pub const MAX_RESP_PAYLOAD: usize = memory_map::MAILBOX_SIZE - RESP_HEADER_LEN;

/// Largest data block carried by a control command
pub const MAX_CTRL_DATA_SIZE: usize = 256;
/// Object ID, opcode, channel number and length
const CTRL_CMD_HEADER_LEN: usize = 12;
/// Device status word and length
const CTRL_RESP_HEADER_LEN: usize = 6;

/// Pending bit of a link status nibble
const CMD_STATUS_PENDING: u8 = 0x01;

/// Mailbox command identifiers
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum CmdId {
    /// Write a block of an object's configuration
    SetConfig = 1,
    /// Read a block of an object's configuration
    GetConfig = 2,
    /// Calibration control command
    SetCtrl = 3,
    /// Enter debug mode
    EnterDebugMode = 4,
    /// Unlock configuration writes
    UnlockConfig = 5,
    /// Resume from a software breakpoint
    ResumeBkpt = 6,
}

/// Status of a mailbox response
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CmdStatus {
    /// The command was executed
    NoError,
    /// Unspecified failure
    Generic,
    /// The link is not available
    LinkError,
    /// The firmware saw an out of sequence transaction ID
    UnexpectedTransactionId,
    /// The command was executed and failed. The response body carries the
    /// device error code.
    CmdFailed,
    /// The firmware does not know this command
    CmdIdInvalid,
    /// Any other value
    Other(u16),
}

impl CmdStatus {
    /// Decodes a raw status
    pub const fn from_raw(raw: u16) -> Self {
        match raw {
            0 => CmdStatus::NoError,
            1 => CmdStatus::Generic,
            2 => CmdStatus::LinkError,
            3 => CmdStatus::UnexpectedTransactionId,
            4 => CmdStatus::CmdFailed,
            5 => CmdStatus::CmdIdInvalid,
            other => CmdStatus::Other(other),
        }
    }

    /// Raw status value
    pub const fn raw(self) -> u16 {
        match self {
            CmdStatus::NoError => 0,
            CmdStatus::Generic => 1,
            CmdStatus::LinkError => 2,
            CmdStatus::UnexpectedTransactionId => 3,
            CmdStatus::CmdFailed => 4,
            CmdStatus::CmdIdInvalid => 5,
            CmdStatus::Other(other) => other,
        }
    }
}

/// A calibration control command
///
/// Opcodes are given without the set flag. It is added when the command is
/// serialized.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Command<'a> {
    /// Read a value
    Get(u16),
    /// Write a value
    Set(u16, &'a [u8]),
    /// Read a value selected by the data sent along
    Query(u16, &'a [u8]),
}

impl<'a> Command<'a> {
    /// Opcode bit telling the firmware the command writes
    pub const SET_FLAG: u16 = 0x10;

    /// Opcode without the set flag
    pub const fn opcode(&self) -> u16 {
        match self {
            Command::Get(op) | Command::Set(op, _) | Command::Query(op, _) => *op,
        }
    }

    /// Opcode as sent to the firmware
    pub const fn wire_opcode(&self) -> u16 {
        match self {
            Command::Get(op) | Command::Query(op, _) => *op,
            Command::Set(op, _) => *op | Self::SET_FLAG,
        }
    }

    /// Data sent along with the command
    pub const fn data(&self) -> &'a [u8] {
        match self {
            Command::Get(_) => &[],
            Command::Set(_, data) | Command::Query(_, data) => data,
        }
    }
}

/// Number of checks and the interval between them for a polling budget
///
/// The interval is clamped to the timeout. A zero interval means a single
/// check.
pub(crate) const fn poll_budget(timeout_us: u32, interval_us: u32) -> (u32, u32) {
    let interval_us = if interval_us > timeout_us {
        timeout_us
    } else {
        interval_us
    };
    let checks = if interval_us == 0 {
        1
    } else {
        timeout_us / interval_us
    };

    (interval_us, checks)
}

impl<BUS, DELAY> Adrv904x<BUS, DELAY>
where
    BUS: RegisterBus,
    DELAY: spi_type::delay::DelayNs,
{
    /// Writes a command to a CPU mailbox and triggers it
    ///
    /// Waits for the mailbox to be free first. While it is busy, the CPU
    /// exception flags are checked after every wait. Returns the transaction
    /// ID of the command.
    #[maybe_async_attr]
    pub async fn cmd_write(
        &mut self,
        cpu: CpuType,
        cmd_id: CmdId,
        payload: &[u8],
    ) -> Result<u16, Error<BUS>> {
        validate::at_most(payload.len(), MAX_CMD_PAYLOAD, "payload")?;

        let busy_field = self.cpus[cpu.index()].command_busy;
        let (interval, checks) =
            poll_budget(self.config.send_cmd_timeout_us, self.config.send_cmd_interval_us);

        let mut busy = true;
        for check in 0..=checks {
            busy = self.read_field(busy_field).await? != 0;
            if !busy {
                break;
            }

            let cpu_mask = self.cpu_check_exception().await?;
            if cpu_mask != 0 {
                warn!("CPU exception while waiting for the mailbox: {:#x}", cpu_mask);
                return Err(Error::CpuException { cpu_mask });
            }

            if check < checks {
                self.wait_us(interval).await;
            }
        }
        if busy {
            return Err(Error::Timeout);
        }

        let addr = &mut self.cpus[cpu.index()];
        addr.transaction_id = addr.transaction_id.wrapping_add(1);
        let transaction_id = addr.transaction_id;
        let (mailbox, command) = (addr.mailbox, addr.command);

        let mut buf = [0u8; memory_map::MAILBOX_SIZE];
        let offset = &mut 0;
        buf.write_with(offset, cmd_id as u16, WIRE)?;
        buf.write_with(offset, transaction_id, WIRE)?;
        buf[*offset..*offset + payload.len()].copy_from_slice(payload);
        let len = *offset + payload.len();

        trace!(
            "{:?}: command {:?}, transaction {}, {} bytes",
            cpu,
            cmd_id,
            transaction_id,
            payload.len()
        );

        self.write_bytes(mailbox, &buf[..len]).await?;
        self.write_u8(command, LINK_ID).await?;

        Ok(transaction_id)
    }

    /// Waits until the CPU clears the pending bit of the command link
    #[maybe_async_attr]
    pub async fn cmd_status_wait(&mut self, cpu: CpuType) -> Result<(), Error<BUS>> {
        let addr = self.cpus[cpu.index()].command_status + (LINK_ID >> 2) as u32;
        let (interval, checks) =
            poll_budget(self.config.read_resp_timeout_us, self.config.read_resp_interval_us);

        let mut pending = true;
        for check in 0..=checks {
            // A status byte that changes between two reads is still settling
            let status = self.read_u8(addr).await?;
            let verify = self.read_u8(addr).await?;

            let nibble = if (LINK_ID >> 1) & 1 == 1 {
                status >> 4
            } else {
                status & 0x0f
            };
            pending = status != verify || nibble & CMD_STATUS_PENDING != 0;

            if pending && check < checks {
                self.wait_us(interval).await;
            } else {
                break;
            }
        }

        if pending {
            warn!("{:?}: timed out waiting for the command status", cpu);
            return Err(Error::Timeout);
        }

        Ok(())
    }

    /// Reads the response of command `transaction_id` from a CPU mailbox
    ///
    /// Fills `resp` with the first `resp.len()` bytes of the response
    /// payload.
    #[maybe_async_attr]
    pub async fn resp_read(
        &mut self,
        cpu: CpuType,
        transaction_id: u16,
        resp: &mut [u8],
    ) -> Result<(), Error<BUS>> {
        validate::at_most(resp.len(), MAX_RESP_PAYLOAD, "resp")?;

        // Enough room for the device status word a failure carries
        let payload_len = resp.len().max(4);
        let mut buf = [0u8; memory_map::MAILBOX_SIZE];
        let mailbox = self.cpus[cpu.index()].mailbox;
        self.read_bytes(mailbox, &mut buf[..RESP_HEADER_LEN + payload_len])
            .await?;

        let offset = &mut 0;
        let _cmd_id: u16 = buf.read_with(offset, WIRE)?;
        let received: u16 = buf.read_with(offset, WIRE)?;
        let status = CmdStatus::from_raw(buf.read_with(offset, WIRE)?);

        if received != transaction_id {
            return Err(Error::UnexpectedTransactionId {
                expected: transaction_id,
                received,
            });
        }

        match status {
            CmdStatus::NoError => {
                resp.copy_from_slice(&buf[RESP_HEADER_LEN..RESP_HEADER_LEN + resp.len()]);
                Ok(())
            }
            CmdStatus::CmdFailed => {
                let code: u32 = buf.read_with(offset, WIRE)?;
                warn!("{:?}: command failed with device code {:#x}", cpu, code);
                Err(Error::DeviceReportedFailure { status, code })
            }
            status => Err(Error::CommandRejected(status)),
        }
    }

    /// Sends a command to a CPU and reads its response into `resp`
    #[maybe_async_attr]
    pub async fn cmd_send(
        &mut self,
        cpu: CpuType,
        cmd_id: CmdId,
        payload: &[u8],
        resp: &mut [u8],
    ) -> Result<(), Error<BUS>> {
        validate::at_most(resp.len(), MAX_RESP_PAYLOAD, "resp")?;

        let transaction_id = self.cmd_write(cpu, cmd_id, payload).await?;
        self.cmd_status_wait(cpu).await?;
        self.resp_read(cpu, transaction_id, resp).await
    }

    /// Executes a calibration control command on the CPU servicing `channel`
    ///
    /// `channel` must select exactly one channel. `resp` is cleared, the
    /// response data is copied to its start and its length returned. If the
    /// device reports more than [`MAX_CTRL_DATA_SIZE`] or `resp.len()` bytes,
    /// nothing is read and [`Error::ResponseTooLarge`] is returned with `resp`
    /// left as it was.
    #[maybe_async_attr]
    pub async fn control_cmd_exec(
        &mut self,
        obj_id: ObjectId,
        cmd: Command<'_>,
        channel: ChannelMask,
        resp: &mut [u8],
    ) -> Result<usize, Error<BUS>> {
        if cmd.opcode() & Command::SET_FLAG != 0 {
            return Err(Error::InvalidParameter("ctrl_cmd"));
        }
        let data = cmd.data();
        validate::at_most(data.len(), MAX_CTRL_DATA_SIZE, "length")?;

        let cpu = routing::route(
            routing::ROUTING_TABLE,
            &self.config.cpu_assignment,
            obj_id,
            channel,
        )?;
        let channel_num = channel.single()?;

        let mut payload = [0u8; CTRL_CMD_HEADER_LEN + MAX_CTRL_DATA_SIZE];
        let offset = &mut 0;
        payload.write_with(offset, u32::from(obj_id), WIRE)?;
        payload.write_with(offset, cmd.wire_opcode(), WIRE)?;
        payload.write_with(offset, channel_num as u32, WIRE)?;
        payload.write_with(offset, data.len() as u16, WIRE)?;
        payload[*offset..*offset + data.len()].copy_from_slice(data);
        let len = *offset + data.len();

        let transaction_id = self.cmd_write(cpu, CmdId::SetCtrl, &payload[..len]).await?;
        self.cmd_status_wait(cpu).await?;

        let mut head = [0u8; CTRL_RESP_HEADER_LEN];
        self.resp_read(cpu, transaction_id, &mut head).await?;

        let resp_len: u16 = head.read_with(&mut 4, WIRE)?;
        let resp_len = resp_len as usize;
        if resp_len > MAX_CTRL_DATA_SIZE {
            warn!("{:?}: control response of {} bytes", cpu, resp_len);
            return Err(Error::ResponseTooLarge {
                len: resp_len,
                capacity: MAX_CTRL_DATA_SIZE,
            });
        }
        if resp_len > resp.len() {
            return Err(Error::ResponseTooLarge {
                len: resp_len,
                capacity: resp.len(),
            });
        }

        resp.fill(0);
        let data_addr =
            self.cpus[cpu.index()].mailbox + (RESP_HEADER_LEN + CTRL_RESP_HEADER_LEN) as u32;
        self.read_bytes(data_addr, &mut resp[..resp_len]).await?;

        Ok(resp_len)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use crate::hl::test_util::{ack, control_store, device, init_logger, waits, FakeBus, Reply, Request};

    #[test]
    fn test_poll_budget() {
        assert_eq!(poll_budget(1_000, 100), (100, 10));
        assert_eq!(poll_budget(50, 100), (50, 1));
        assert_eq!(poll_budget(1_000, 0), (0, 1));
        assert_eq!(poll_budget(0, 0), (0, 1));
    }

    #[test]
    fn test_command_opcodes() {
        assert_eq!(Command::Get(1).wire_opcode(), 1);
        assert_eq!(Command::Set(1, &[]).wire_opcode(), 0x11);
        assert_eq!(Command::Set(1, &[1, 2]).data(), &[1, 2]);
        assert_eq!(Command::Query(1, &[3]).wire_opcode(), 1);
        assert_eq!(Command::Query(1, &[3]).data(), &[3]);
        assert_eq!(CmdStatus::from_raw(4), CmdStatus::CmdFailed);
        assert_eq!(CmdStatus::from_raw(0x99).raw(), 0x99);
    }

    #[tokio::test]
    async fn test_cmd_send() {
        init_logger();
        let bus = FakeBus::new().with_firmware(
            CpuType::Cpu1,
            Box::new(|request: &Request| {
                assert_eq!(request.cmd_id, CmdId::GetConfig as u16);
                assert_eq!(request.payload, vec![0xaa, 0xbb]);
                Reply::ok(&[1, 2, 3])
            }),
        );
        let mut adrv = device(bus);

        let mut resp = [0; 7];
        adrv.cmd_send(CpuType::Cpu1, CmdId::GetConfig, &[0xaa, 0xbb], &mut resp)
            .await
            .unwrap();

        assert_eq!(resp, [0, 0, 0, 0, 1, 2, 3]);
        assert_eq!(adrv.cpu_addr(CpuType::Cpu1).transaction_id(), 1);
        assert_eq!(adrv.cpu_addr(CpuType::Cpu0).transaction_id(), 0);

        let bus = adrv.bus();
        assert_eq!(bus.sent().len(), 1);
        assert_eq!(bus.sent()[0].1.transaction_id, 1);
        // Header and payload go out in one write, then the trigger
        let writes = bus.writes();
        assert_eq!(
            writes[0],
            (memory_map::cpu1::MAILBOX, vec![0x02, 0x00, 0x01, 0x00, 0xaa, 0xbb])
        );
        assert_eq!(writes[1], (memory_map::cpu1::COMMAND, vec![LINK_ID]));
    }

    #[tokio::test]
    async fn test_transaction_id_wraps() {
        let mut adrv = device(FakeBus::new().with_firmware(CpuType::Cpu0, ack()));
        adrv.cpus[0].transaction_id = u16::MAX;

        adrv.cmd_send(CpuType::Cpu0, CmdId::SetConfig, &[], &mut [0; 4])
            .await
            .unwrap();

        assert_eq!(adrv.cpu_addr(CpuType::Cpu0).transaction_id(), 0);
    }

    #[tokio::test]
    async fn test_busy_timeout() {
        let mut bus = FakeBus::new();
        bus.set_bytes(memory_map::cpu0::COMMAND_BUSY, &[0x01]);
        let mut adrv = device(bus);
        adrv.config.send_cmd_timeout_us = 1_000;
        adrv.config.send_cmd_interval_us = 100;

        let err = adrv
            .cmd_write(CpuType::Cpu0, CmdId::SetConfig, &[])
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Timeout));
        // 11 checks, a wait between each
        assert_eq!(adrv.bus().reads_of(memory_map::cpu0::COMMAND_BUSY), 11);
        assert_eq!(waits(&adrv), 10);
        // Nothing was written to the mailbox
        assert!(adrv.bus().writes().is_empty());
    }

    #[tokio::test]
    async fn test_busy_clears() {
        let mut bus = FakeBus::new().with_firmware(CpuType::Cpu0, ack());
        bus.script(memory_map::cpu0::COMMAND_BUSY, &[0x01, 0x01]);
        let mut adrv = device(bus);

        adrv.cmd_send(CpuType::Cpu0, CmdId::SetConfig, &[], &mut [0; 4])
            .await
            .unwrap();

        assert_eq!(adrv.bus().reads_of(memory_map::cpu0::COMMAND_BUSY), 3);
        assert_eq!(waits(&adrv), 2);
    }

    #[tokio::test]
    async fn test_exception_while_busy() {
        let mut bus = FakeBus::new();
        bus.set_bytes(memory_map::cpu1::COMMAND_BUSY, &[0x01]);
        bus.set_word(memory_map::cpu1::EXCEPTION_FLAG, 0xdead);
        let mut adrv = device(bus);

        let err = adrv
            .cmd_write(CpuType::Cpu1, CmdId::SetConfig, &[])
            .await
            .unwrap_err();

        assert!(matches!(err, Error::CpuException { cpu_mask: 0b10 }));
    }

    #[tokio::test]
    async fn test_status_timeout() {
        let mut bus = FakeBus::new();
        bus.set_bytes(memory_map::cpu0::COMMAND_STATUS, &[CMD_STATUS_PENDING]);
        let mut adrv = device(bus);
        adrv.config.read_resp_timeout_us = 500;
        adrv.config.read_resp_interval_us = 100;

        let err = adrv.cmd_status_wait(CpuType::Cpu0).await.unwrap_err();

        assert!(matches!(err, Error::Timeout));
        // Two reads per check, 6 checks
        assert_eq!(adrv.bus().reads_of(memory_map::cpu0::COMMAND_STATUS), 12);
        assert_eq!(waits(&adrv), 5);
    }

    #[tokio::test]
    async fn test_status_unstable_read_is_pending() {
        let mut bus = FakeBus::new();
        bus.script(memory_map::cpu0::COMMAND_STATUS, &[0x00, 0x02, 0x00, 0x00]);
        let mut adrv = device(bus);

        adrv.cmd_status_wait(CpuType::Cpu0).await.unwrap();

        assert_eq!(adrv.bus().reads_of(memory_map::cpu0::COMMAND_STATUS), 4);
        assert_eq!(waits(&adrv), 1);
    }

    #[tokio::test]
    async fn test_device_reported_failure() {
        let bus = FakeBus::new().with_firmware(
            CpuType::Cpu0,
            Box::new(|_: &Request| Reply::failed(0x3000_0012)),
        );
        let mut adrv = device(bus);

        let err = adrv
            .cmd_send(CpuType::Cpu0, CmdId::SetConfig, &[], &mut [0; 4])
            .await
            .unwrap_err();

        assert_eq!(err.device_code(), Some(0x3000_0012));
        assert!(matches!(
            err,
            Error::DeviceReportedFailure {
                status: CmdStatus::CmdFailed,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_command_rejected() {
        let bus = FakeBus::new().with_firmware(
            CpuType::Cpu0,
            Box::new(|_: &Request| Reply {
                status: CmdStatus::CmdIdInvalid,
                payload: vec![0; 4],
            }),
        );
        let mut adrv = device(bus);

        let err = adrv
            .cmd_send(CpuType::Cpu0, CmdId::SetConfig, &[], &mut [0; 4])
            .await
            .unwrap_err();

        assert!(matches!(err, Error::CommandRejected(CmdStatus::CmdIdInvalid)));
        assert_eq!(err.device_code(), None);
    }

    #[tokio::test]
    async fn test_unexpected_transaction_id() {
        let mut bus = FakeBus::new();
        // Stale response of transaction 7
        bus.set_bytes(memory_map::cpu0::MAILBOX, &[0x01, 0x00, 0x07, 0x00, 0x00, 0x00]);
        let mut adrv = device(bus);

        let err = adrv
            .resp_read(CpuType::Cpu0, 8, &mut [0; 4])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::UnexpectedTransactionId {
                expected: 8,
                received: 7
            }
        ));
    }

    #[tokio::test]
    async fn test_payload_too_large() {
        let mut adrv = device(FakeBus::new());

        let err = adrv
            .cmd_write(CpuType::Cpu0, CmdId::SetConfig, &[0; MAX_CMD_PAYLOAD + 1])
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidParameter("payload")));
        assert!(adrv.bus().reads().is_empty());
    }

    #[tokio::test]
    async fn test_control_cmd_envelope() {
        let mut adrv = device(FakeBus::new().with_firmware(CpuType::Cpu1, control_store()));

        let len = adrv
            .control_cmd_exec(
                ObjectId::TC_TX_DPD,
                Command::Set(2, &[0x11, 0x22, 0x33]),
                ChannelMask::tx(0x40),
                &mut [],
            )
            .await
            .unwrap();
        assert_eq!(len, 0);

        let (cpu, request) = &adrv.bus().sent()[0];
        assert_eq!(*cpu, CpuType::Cpu1);
        assert_eq!(request.cmd_id, CmdId::SetCtrl as u16);
        assert_eq!(
            request.payload,
            vec![
                0x36, 0x00, 0x00, 0x00, // object
                0x12, 0x00, // opcode with set flag
                0x06, 0x00, 0x00, 0x00, // channel number
                0x03, 0x00, // length
                0x11, 0x22, 0x33,
            ]
        );
    }

    #[tokio::test]
    async fn test_control_cmd_response_length() {
        let mut adrv = device(FakeBus::new().with_firmware(CpuType::Cpu0, control_store()));
        let data = [1u8, 2, 3, 4, 5, 6, 7, 8];

        adrv.control_cmd_exec(
            ObjectId::TC_TX_DPD,
            Command::Set(3, &data),
            ChannelMask::tx(0x01),
            &mut [],
        )
        .await
        .unwrap();

        // Larger buffer: cleared, then the response is copied to its start
        let mut resp = [0xee; 12];
        let len = adrv
            .control_cmd_exec(ObjectId::TC_TX_DPD, Command::Get(3), ChannelMask::tx(0x01), &mut resp)
            .await
            .unwrap();
        assert_eq!(len, 8);
        assert_eq!(resp, [1, 2, 3, 4, 5, 6, 7, 8, 0, 0, 0, 0]);

        // Exact fit
        let mut resp = [0; 8];
        let len = adrv
            .control_cmd_exec(ObjectId::TC_TX_DPD, Command::Get(3), ChannelMask::tx(0x01), &mut resp)
            .await
            .unwrap();
        assert_eq!(len, 8);
        assert_eq!(resp, data);

        // Too small: untouched
        let mut resp = [0xee; 7];
        let err = adrv
            .control_cmd_exec(ObjectId::TC_TX_DPD, Command::Get(3), ChannelMask::tx(0x01), &mut resp)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::ResponseTooLarge {
                len: 8,
                capacity: 7
            }
        ));
        assert_eq!(resp, [0xee; 7]);
    }

    #[tokio::test]
    async fn test_control_cmd_response_over_limit() {
        // Declares 257 bytes of data
        let bus = FakeBus::new().with_firmware(
            CpuType::Cpu0,
            Box::new(|_: &Request| Reply::ok(&[0x01, 0x01])),
        );
        let mut adrv = device(bus);

        let mut resp = vec![0xee; 1024];
        let err = adrv
            .control_cmd_exec(ObjectId::TC_TX_DPD, Command::Get(3), ChannelMask::tx(0x01), &mut resp)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::ResponseTooLarge {
                len: 257,
                capacity: MAX_CTRL_DATA_SIZE
            }
        ));
        assert!(resp.iter().all(|b| *b == 0xee));

        // Only the response header was read back
        let mailbox = memory_map::cpu0::MAILBOX;
        assert!(adrv
            .bus()
            .reads()
            .iter()
            .all(|(addr, _)| *addr < mailbox + (RESP_HEADER_LEN + CTRL_RESP_HEADER_LEN) as u32));
    }

    #[tokio::test]
    async fn test_control_cmd_rejects_before_sending() {
        let mut adrv = device(FakeBus::new().with_firmware(CpuType::Cpu0, control_store()));

        for channel in [ChannelMask::tx(0x03), ChannelMask::tx(0x100), ChannelMask::orx(0x1)] {
            let err = adrv
                .control_cmd_exec(ObjectId::TC_TX_DPD, Command::Get(1), channel, &mut [])
                .await
                .unwrap_err();
            assert!(matches!(err, Error::InvalidParameter(_)));
        }

        let err = adrv
            .control_cmd_exec(
                ObjectId::TC_TX_DPD,
                Command::Set(1, &[0; MAX_CTRL_DATA_SIZE + 1]),
                ChannelMask::tx(0x01),
                &mut [],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter("length")));

        let err = adrv
            .control_cmd_exec(ObjectId::TC_TX_DPD, Command::Get(0x11), ChannelMask::tx(0x01), &mut [])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter("ctrl_cmd")));

        assert!(adrv.bus().reads().is_empty());
        assert!(adrv.bus().writes().is_empty());
    }
}
