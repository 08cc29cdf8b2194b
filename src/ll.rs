//! Low-level interface to the ADRV904x
//!
//! This module implements the register transport: byte-wise reads and writes
//! of the device address space, and single bitfield access on top of them.
//! Users of this library should typically not need to use this. Please
//! consider using the [high-level interface] instead.
//!
//! The high-level driver only depends on the [`RegisterBus`] trait, so any
//! other transport (a register map emulator, a different bridge) can be
//! plugged in by implementing it.
//!
//! **NOTE**: Bitfield writes accept a full `u8`. A value that is too large for
//! the field is silently truncated.
//!
//! [high-level interface]: ../hl/index.html

use core::fmt;

use crate::{maybe_async_attr, memory_map, spi_type};

#[cfg(feature = "defmt")]
use defmt::Format;

/// Access to the device address space
///
/// Addresses are 32-bit. Multi-byte accesses auto-increment the address.
#[allow(async_fn_in_trait)]
#[maybe_async_attr(AFIT)]
pub trait RegisterBus {
    /// Transport error
    type Error: fmt::Debug;

    /// Reads `buf.len()` bytes starting at `addr`
    async fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Writes `data` starting at `addr`
    async fn write(&mut self, addr: u32, data: &[u8]) -> Result<(), Self::Error>;

    /// Reads a single bitfield
    async fn read_field(&mut self, field: Field) -> Result<u8, Self::Error> {
        let mut reg = [0];
        self.read(field.addr, &mut reg).await?;

        Ok(field.extract(reg[0]))
    }

    /// Read-modify-writes a single bitfield
    async fn write_field(&mut self, field: Field, value: u8) -> Result<(), Self::Error> {
        let mut reg = [0];
        self.read(field.addr, &mut reg).await?;
        self.write(field.addr, &[field.insert(reg[0], value)]).await
    }
}

/// SPI frame opcode for a read access
const OP_READ: u8 = 0x80;
/// SPI frame opcode for a write access
const OP_WRITE: u8 = 0x00;

/// Entry point to the ADRV904x driver's low-level API
///
/// Each access is one SPI transaction: a five byte header (opcode followed by
/// the big-endian address) and the data phase.
///
/// Please consider using [hl::Adrv904x] instead.
///
/// [hl::Adrv904x]: ../hl/struct.Adrv904x.html
#[derive(Copy, Clone)]
pub struct Adrv904x<SPI> {
    spi: SPI,
}

impl<SPI> Adrv904x<SPI> {
    /// Create a new instance of `Adrv904x`
    ///
    /// Requires the SPI device the transceiver is connected to.
    pub fn new(spi: SPI) -> Self {
        Adrv904x { spi }
    }

    /// Allow access to the SPI bus
    pub fn bus(&mut self) -> &mut SPI {
        &mut self.spi
    }

    /// Releases the SPI bus
    pub fn release(self) -> SPI {
        self.spi
    }
}

#[inline(always)]
fn header(op: u8, addr: u32) -> [u8; 5] {
    let addr = addr.to_be_bytes();
    [op, addr[0], addr[1], addr[2], addr[3]]
}

#[maybe_async_attr(AFIT)]
impl<SPI> RegisterBus for Adrv904x<SPI>
where
    SPI: spi_type::spi::SpiDevice<u8>,
{
    type Error = Error<SPI>;

    async fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), Self::Error> {
        let header = header(OP_READ, addr);

        self.spi
            .transaction(&mut [
                spi_type::spi::Operation::Write(&header),
                spi_type::spi::Operation::Read(buf),
            ])
            .await
            .map_err(Error::Transfer)
    }

    async fn write(&mut self, addr: u32, data: &[u8]) -> Result<(), Self::Error> {
        let header = header(OP_WRITE, addr);

        self.spi
            .transaction(&mut [
                spi_type::spi::Operation::Write(&header),
                spi_type::spi::Operation::Write(data),
            ])
            .await
            .map_err(Error::Write)
    }
}

/// An SPI error that can occur when communicating with the ADRV904x
pub enum Error<SPI>
where
    SPI: spi_type::spi::ErrorType,
{
    /// SPI error occured during a read transaction
    Transfer(SPI::Error),

    /// SPI error occured during a write transaction
    Write(SPI::Error),
}

// We can't derive this implementation, as the compiler will complain that the
// associated error type doesn't implement `Debug`.
impl<SPI> fmt::Debug for Error<SPI>
where
    SPI: spi_type::spi::ErrorType,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Transfer(error) => write!(f, "Transfer({:?})", error),
            Error::Write(error) => write!(f, "Write({:?})", error),
        }
    }
}

#[cfg(feature = "defmt")]
impl<SPI> Format for Error<SPI>
where
    SPI: spi_type::spi::ErrorType,
{
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::Transfer(_) => defmt::write!(f, "Transfer()"),
            Error::Write(_) => defmt::write!(f, "Write()"),
        }
    }
}

/// A bitfield inside an 8-bit register
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Field {
    /// Register address
    pub addr: u32,
    /// Position of the least significant bit
    pub shift: u8,
    /// Number of bits
    pub width: u8,
}

impl Field {
    /// Bits covered by this field
    pub const fn mask(&self) -> u8 {
        ((((1u16 << self.width) - 1) << self.shift) & 0xff) as u8
    }

    /// Extracts the field value from a register value
    pub const fn extract(&self, reg: u8) -> u8 {
        (reg & self.mask()) >> self.shift
    }

    /// Replaces the field bits of `reg` with `value`
    pub const fn insert(&self, reg: u8, value: u8) -> u8 {
        (reg & !self.mask()) | ((((value as u16) << self.shift) & 0xff) as u8 & self.mask())
    }
}

/// Generates bitfield descriptors
macro_rules! impl_fields {
    (
        $(
            $name:ident, $addr:expr, $first_bit:expr, $last_bit:expr;
            #[$doc:meta]
        )*
    ) => {
        $(
            #[$doc]
            pub const $name: Field = Field {
                addr: $addr,
                shift: $first_bit,
                width: $last_bit - $first_bit + 1,
            };
        )*
    };
}

impl_fields! {
    CPU0_M3_RUN,          memory_map::cpu0::CTL_1,        0, 0; /// CPU0 run enable
    CPU0_MEM_HRESP_MASK,  memory_map::cpu0::CTL_2,        4, 4; /// Masks AHB error responses from CPU0 memory
    CPU0_CMD_BUSY,        memory_map::cpu0::COMMAND_BUSY, 0, 0; /// CPU0 command register busy
    CPU1_CMD_BUSY,        memory_map::cpu1::COMMAND_BUSY, 0, 0; /// CPU1 command register busy
    DBG_GLOBAL_RESUME,    memory_map::DBG_CTL,            0, 0; /// Resume every CPU halted on a breakpoint
}

#[cfg(test)]
mod test {
    use super::*;

    use embedded_hal_mock::eh1::spi::{Mock as SpiMock, Transaction as SpiTransaction};

    #[test]
    fn test_field_bits() {
        let field = Field {
            addr: 0,
            shift: 4,
            width: 3,
        };

        assert_eq!(field.mask(), 0b0111_0000);
        assert_eq!(field.extract(0b1101_0110), 0b101);
        assert_eq!(field.insert(0b1000_1111, 0b011), 0b1011_1111);
        // Too wide for the field, truncated
        assert_eq!(field.insert(0, 0xff), 0b0111_0000);

        assert_eq!(CPU0_MEM_HRESP_MASK.mask(), 0x10);
        assert_eq!(DBG_GLOBAL_RESUME.width, 1);
    }

    #[tokio::test]
    async fn test_read() {
        let spi = SpiMock::new(&[
            SpiTransaction::transaction_start(),
            SpiTransaction::write_vec(vec![0x80, 0x20, 0x02, 0x00, 0x10]),
            SpiTransaction::read_vec(vec![0x01, 0x02, 0x03]),
            SpiTransaction::transaction_end(),
        ]);

        let mut adrv = Adrv904x::new(spi);
        let mut buf = [0; 3];
        adrv.read(0x2002_0010, &mut buf).await.unwrap();

        assert_eq!(buf, [0x01, 0x02, 0x03]);

        adrv.bus().done();
    }

    #[tokio::test]
    async fn test_write_field() {
        let spi = SpiMock::new(&[
            SpiTransaction::transaction_start(),
            SpiTransaction::write_vec(vec![0x80, 0x00, 0x00, 0x00, 0x81]),
            SpiTransaction::read_vec(vec![0xff]),
            SpiTransaction::transaction_end(),
            SpiTransaction::transaction_start(),
            SpiTransaction::write_vec(vec![0x00, 0x00, 0x00, 0x00, 0x81]),
            SpiTransaction::write_vec(vec![0xef]),
            SpiTransaction::transaction_end(),
        ]);

        let mut adrv = Adrv904x::new(spi);
        adrv.write_field(CPU0_MEM_HRESP_MASK, 0).await.unwrap();

        adrv.bus().done();
    }
}
