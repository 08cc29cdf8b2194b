//! Register map emulator used by the unit tests
//!
//! [`FakeBus`] stores every byte written to it and returns it on reads.
//! Single addresses can be scripted to return a sequence of values, reads and
//! writes can be made to fail, and a firmware stand-in can be attached to
//! each CPU mailbox: when the host writes the link ID to a CPU command
//! register, the stand-in gets the command that sits in the mailbox and its
//! reply is written back in place.

use std::collections::{BTreeMap, HashMap, VecDeque};

use byte::BytesExt;

use super::{Adrv904x, CmdId, CmdStatus, CpuType, RESP_HEADER_LEN};
use crate::{codec::WIRE, configs::Config, ll, maybe_async_attr, memory_map, spi_type};

/// Error returned by [`FakeBus`] when a failure was injected
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct FakeBusError(pub u32);

/// A command as seen by the firmware stand-in
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct Request {
    pub cmd_id: u16,
    pub transaction_id: u16,
    pub payload: Vec<u8>,
}

impl Request {
    /// Fields of a control command: object ID, opcode, channel and data
    pub fn control(&self) -> (u32, u16, u32, Vec<u8>) {
        let offset = &mut 0;
        let obj_id: u32 = self.payload.read_with(offset, WIRE).unwrap();
        let opcode: u16 = self.payload.read_with(offset, WIRE).unwrap();
        let channel: u32 = self.payload.read_with(offset, WIRE).unwrap();
        let len: u16 = self.payload.read_with(offset, WIRE).unwrap();

        (
            obj_id,
            opcode,
            channel,
            self.payload[*offset..*offset + len as usize].to_vec(),
        )
    }
}

/// The firmware's answer to a [`Request`]
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct Reply {
    pub status: CmdStatus,
    pub payload: Vec<u8>,
}

impl Reply {
    /// Success, with a zero device status word followed by `data`
    pub fn ok(data: &[u8]) -> Self {
        let mut payload = vec![0; 4];
        payload.extend_from_slice(data);

        Reply {
            status: CmdStatus::NoError,
            payload,
        }
    }

    /// `CMD_FAILED` carrying a device error code
    pub fn failed(code: u32) -> Self {
        Reply {
            status: CmdStatus::CmdFailed,
            payload: code.to_le_bytes().to_vec(),
        }
    }

    /// Successful control command response carrying `data`
    pub fn control(data: &[u8]) -> Self {
        let mut body = (data.len() as u16).to_le_bytes().to_vec();
        body.extend_from_slice(data);

        Reply::ok(&body)
    }
}

pub(crate) type Responder = Box<dyn FnMut(&Request) -> Reply + Send>;

/// Firmware stand-in that stores control command data on set and returns it
/// on get, keyed by object, opcode and channel
pub(crate) fn control_store() -> Responder {
    let mut store: HashMap<(u32, u16, u32), Vec<u8>> = HashMap::new();

    Box::new(move |request: &Request| {
        if request.cmd_id != CmdId::SetCtrl as u16 {
            return Reply::ok(&[]);
        }

        let (obj_id, opcode, channel, data) = request.control();

        if opcode & super::Command::SET_FLAG != 0 {
            store.insert((obj_id, opcode & !super::Command::SET_FLAG, channel), data);
            Reply::control(&[])
        } else {
            let data = store
                .get(&(obj_id, opcode, channel))
                .cloned()
                .unwrap_or_default();
            Reply::control(&data)
        }
    })
}

/// Firmware stand-in accepting every command
pub(crate) fn ack() -> Responder {
    Box::new(|_: &Request| Reply::ok(&[]))
}

#[derive(Default)]
pub(crate) struct FakeBus {
    mem: BTreeMap<u32, u8>,
    scripts: HashMap<u32, VecDeque<u8>>,
    reads: Vec<(u32, usize)>,
    writes: Vec<(u32, Vec<u8>)>,
    fail_read_at: Option<u32>,
    fail_write_at: Option<u32>,
    firmware: [Option<Responder>; 2],
    mailbox_data: [Vec<u8>; 2],
    sent: Vec<(CpuType, Request)>,
}

impl FakeBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a firmware stand-in to a CPU mailbox
    pub fn with_firmware(mut self, cpu: CpuType, responder: Responder) -> Self {
        self.firmware[cpu.index()] = Some(responder);
        self
    }

    /// Following reads of `addr` return `values` in order, then fall back to
    /// the stored byte
    pub fn script(&mut self, addr: u32, values: &[u8]) {
        self.scripts.entry(addr).or_default().extend(values);
    }

    pub fn fail_read_at(&mut self, addr: u32) {
        self.fail_read_at = Some(addr);
    }

    pub fn fail_write_at(&mut self, addr: u32) {
        self.fail_write_at = Some(addr);
    }

    pub fn set_bytes(&mut self, addr: u32, data: &[u8]) {
        for (i, b) in data.iter().enumerate() {
            self.mem.insert(addr + i as u32, *b);
        }
    }

    pub fn set_word(&mut self, addr: u32, value: u32) {
        self.set_bytes(addr, &value.to_le_bytes());
    }

    pub fn byte(&self, addr: u32) -> u8 {
        self.mem.get(&addr).copied().unwrap_or(0)
    }

    pub fn bytes(&self, addr: u32, len: usize) -> Vec<u8> {
        (0..len as u32).map(|i| self.byte(addr + i)).collect()
    }

    pub fn word(&self, addr: u32) -> u32 {
        u32::from_le_bytes([
            self.byte(addr),
            self.byte(addr + 1),
            self.byte(addr + 2),
            self.byte(addr + 3),
        ])
    }

    pub fn reads(&self) -> &[(u32, usize)] {
        &self.reads
    }

    /// Number of reads that started at `addr`
    pub fn reads_of(&self, addr: u32) -> usize {
        self.reads.iter().filter(|(a, _)| *a == addr).count()
    }

    pub fn writes(&self) -> &[(u32, Vec<u8>)] {
        &self.writes
    }

    /// Commands received by the firmware stand-ins, in order
    pub fn sent(&self) -> &[(CpuType, Request)] {
        &self.sent
    }

    fn mailbox_cpu(addr: u32) -> Option<CpuType> {
        match addr {
            memory_map::cpu0::MAILBOX => Some(CpuType::Cpu0),
            memory_map::cpu1::MAILBOX => Some(CpuType::Cpu1),
            _ => None,
        }
    }

    fn command_cpu(addr: u32) -> Option<CpuType> {
        match addr {
            memory_map::cpu0::COMMAND => Some(CpuType::Cpu0),
            memory_map::cpu1::COMMAND => Some(CpuType::Cpu1),
            _ => None,
        }
    }

    fn run_firmware(&mut self, cpu: CpuType) {
        let Some(responder) = self.firmware[cpu.index()].as_mut() else {
            return;
        };

        let data = &self.mailbox_data[cpu.index()];
        let request = Request {
            cmd_id: u16::from_le_bytes([data[0], data[1]]),
            transaction_id: u16::from_le_bytes([data[2], data[3]]),
            payload: data[4..].to_vec(),
        };
        let reply = responder(&request);

        let mut response = Vec::with_capacity(RESP_HEADER_LEN + reply.payload.len());
        response.extend_from_slice(&request.cmd_id.to_le_bytes());
        response.extend_from_slice(&request.transaction_id.to_le_bytes());
        response.extend_from_slice(&reply.status.raw().to_le_bytes());
        response.extend_from_slice(&reply.payload);

        let mailbox = match cpu {
            CpuType::Cpu0 => memory_map::cpu0::MAILBOX,
            CpuType::Cpu1 => memory_map::cpu1::MAILBOX,
        };
        self.set_bytes(mailbox, &response);
        self.sent.push((cpu, request));
    }
}

#[maybe_async_attr(AFIT)]
impl ll::RegisterBus for FakeBus {
    type Error = FakeBusError;

    async fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), Self::Error> {
        if self.fail_read_at == Some(addr) {
            return Err(FakeBusError(addr));
        }
        self.reads.push((addr, buf.len()));

        for (i, b) in buf.iter_mut().enumerate() {
            let a = addr + i as u32;
            *b = match self.scripts.get_mut(&a).and_then(|s| s.pop_front()) {
                Some(value) => value,
                None => self.byte(a),
            };
        }

        Ok(())
    }

    async fn write(&mut self, addr: u32, data: &[u8]) -> Result<(), Self::Error> {
        if self.fail_write_at == Some(addr) {
            return Err(FakeBusError(addr));
        }
        self.writes.push((addr, data.to_vec()));
        self.set_bytes(addr, data);

        if let Some(cpu) = Self::mailbox_cpu(addr) {
            self.mailbox_data[cpu.index()] = data.to_vec();
        }
        if let Some(cpu) = Self::command_cpu(addr) {
            if data == [super::LINK_ID].as_slice() {
                self.run_firmware(cpu);
            }
        }

        Ok(())
    }
}

/// Delay provider that only counts
#[derive(Copy, Clone, Debug, Default)]
pub(crate) struct CountingDelay {
    pub waits: u32,
    pub total_us: u64,
}

#[maybe_async_attr(AFIT)]
impl spi_type::delay::DelayNs for CountingDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.waits += 1;
        self.total_us += ns as u64 / 1000;
    }

    async fn delay_us(&mut self, us: u32) {
        self.waits += 1;
        self.total_us += us as u64;
    }
}

/// Device context over `bus` with the default configuration
pub(crate) fn device(bus: FakeBus) -> Adrv904x<FakeBus, CountingDelay> {
    Adrv904x::new(bus, CountingDelay::default(), Config::default())
}

/// Number of waits the device performed so far
pub(crate) fn waits(adrv: &Adrv904x<FakeBus, CountingDelay>) -> u32 {
    adrv.delay.waits
}

/// Routes test logs to the console
pub(crate) fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
