use core::fmt;
use core::fmt::{Display, Formatter};

#[cfg(feature = "defmt")]
use defmt::Format;

use super::{validate::InvalidParameter, BootStatus, CmdStatus};
use crate::ll::RegisterBus;

/// An error that can occur when talking to the transceiver CPUs
pub enum Error<BUS>
where
    BUS: RegisterBus,
{
    /// Error occured while using the register transport
    Bus(BUS::Error),

    /// A firmware structure could not be decoded from the response
    Codec(byte::Error),

    /// A parameter was rejected before anything was sent to the device
    ///
    /// Carries the name of the offending parameter.
    InvalidParameter(&'static str),

    /// The mailbox stayed busy, or the command status stayed pending, for the
    /// whole timeout
    Timeout,

    /// The device returned more data than the caller's buffer can hold. The
    /// buffer was left untouched.
    ResponseTooLarge {
        /// Length reported by the device
        len: usize,
        /// Length of the caller's buffer
        capacity: usize,
    },

    /// The response does not belong to the command that was sent
    UnexpectedTransactionId {
        /// Transaction ID of the command
        expected: u16,
        /// Transaction ID found in the response
        received: u16,
    },

    /// The firmware rejected the command envelope
    CommandRejected(CmdStatus),

    /// The firmware executed the command and reported a failure
    DeviceReportedFailure {
        /// Command status of the response
        status: CmdStatus,
        /// Device defined error code taken from the response body
        code: u32,
    },

    /// A CPU raised an exception while a command was pending
    CpuException {
        /// Bit `n` set when CPU `n` has its exception flag raised
        cpu_mask: u8,
    },

    /// No firmware image has been written to CPU0
    ImageNotLoaded,

    /// The boot status was checked but CPU0 was never started
    BootNotStarted,

    /// The boot status register reported an error
    BootFailure {
        /// Status read from the boot status register
        status: BootStatus,
        /// Product ID read from the efuses, if it could be read. Only
        /// attempted for [`BootStatus::PidProfileMismatchErr`].
        product_id: Option<u8>,
    },

    /// The CPUs did not reach a terminal boot state in time
    BootTimeout,
}

impl<BUS> Error<BUS>
where
    BUS: RegisterBus,
{
    /// Returns the device-defined error code, if the device reported one
    pub fn device_code(&self) -> Option<u32> {
        match self {
            Error::DeviceReportedFailure { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl<BUS> From<InvalidParameter> for Error<BUS>
where
    BUS: RegisterBus,
{
    fn from(error: InvalidParameter) -> Self {
        Error::InvalidParameter(error.0)
    }
}

impl<BUS> From<byte::Error> for Error<BUS>
where
    BUS: RegisterBus,
{
    fn from(error: byte::Error) -> Self {
        Error::Codec(error)
    }
}

impl<BUS> Display for Error<BUS>
where
    BUS: RegisterBus,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[cfg(feature = "std")]
impl<BUS> std::error::Error for Error<BUS> where BUS: RegisterBus {}

// We can't derive this implementation, as `Debug` would then be required on
// `BUS` itself instead of only on its error type.
impl<BUS> fmt::Debug for Error<BUS>
where
    BUS: RegisterBus,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Bus(error) => write!(f, "Bus({:?})", error),
            Error::Codec(error) => write!(f, "Codec({:?})", error),
            Error::InvalidParameter(name) => write!(f, "InvalidParameter({})", name),
            Error::Timeout => write!(f, "Timeout"),
            Error::ResponseTooLarge { len, capacity } => write!(
                f,
                "ResponseTooLarge {{ len: {}, capacity: {} }}",
                len, capacity
            ),
            Error::UnexpectedTransactionId { expected, received } => write!(
                f,
                "UnexpectedTransactionId {{ expected: {}, received: {} }}",
                expected, received
            ),
            Error::CommandRejected(status) => write!(f, "CommandRejected({:?})", status),
            Error::DeviceReportedFailure { status, code } => write!(
                f,
                "DeviceReportedFailure {{ status: {:?}, code: {:#x} }}",
                status, code
            ),
            Error::CpuException { cpu_mask } => {
                write!(f, "CpuException {{ cpu_mask: {:#x} }}", cpu_mask)
            }
            Error::ImageNotLoaded => write!(f, "ImageNotLoaded"),
            Error::BootNotStarted => write!(f, "BootNotStarted"),
            Error::BootFailure { status, product_id } => write!(
                f,
                "BootFailure {{ status: {:?}, product_id: {:?} }}",
                status, product_id
            ),
            Error::BootTimeout => write!(f, "BootTimeout"),
        }
    }
}

#[cfg(feature = "defmt")]
impl<BUS> Format for Error<BUS>
where
    BUS: RegisterBus,
{
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::Bus(error) => defmt::write!(f, "Bus({:?})", defmt::Debug2Format(error)),
            Error::Codec(error) => defmt::write!(f, "Codec({:?})", defmt::Debug2Format(error)),
            Error::InvalidParameter(name) => defmt::write!(f, "InvalidParameter({})", name),
            Error::Timeout => defmt::write!(f, "Timeout"),
            Error::ResponseTooLarge { len, capacity } => defmt::write!(
                f,
                "ResponseTooLarge {{ len: {}, capacity: {} }}",
                len,
                capacity
            ),
            Error::UnexpectedTransactionId { expected, received } => defmt::write!(
                f,
                "UnexpectedTransactionId {{ expected: {}, received: {} }}",
                expected,
                received
            ),
            Error::CommandRejected(status) => defmt::write!(f, "CommandRejected({:?})", status),
            Error::DeviceReportedFailure { status, code } => defmt::write!(
                f,
                "DeviceReportedFailure {{ status: {:?}, code: {:#x} }}",
                status,
                code
            ),
            Error::CpuException { cpu_mask } => {
                defmt::write!(f, "CpuException {{ cpu_mask: {:#x} }}", cpu_mask)
            }
            Error::ImageNotLoaded => defmt::write!(f, "ImageNotLoaded"),
            Error::BootNotStarted => defmt::write!(f, "BootNotStarted"),
            Error::BootFailure { status, product_id } => defmt::write!(
                f,
                "BootFailure {{ status: {:?}, product_id: {:?} }}",
                status,
                product_id
            ),
            Error::BootTimeout => defmt::write!(f, "BootTimeout"),
        }
    }
}

// Tests
#[cfg(test)]
mod test {
    use super::*;

    use crate::hl::test_util::FakeBus;

    #[test]
    fn test_debug_output() {
        let error = Error::<FakeBus>::DeviceReportedFailure {
            status: CmdStatus::CmdFailed,
            code: 0x3000_0012,
        };

        assert_eq!(
            format!("{}", error),
            "DeviceReportedFailure { status: CmdFailed, code: 0x30000012 }"
        );
        assert_eq!(error.device_code(), Some(0x3000_0012));
        assert_eq!(Error::<FakeBus>::Timeout.device_code(), None);
    }

    #[cfg(feature = "defmt")]
    #[test]
    fn test_defmt() {
        let error = Error::<FakeBus>::ResponseTooLarge {
            len: 42,
            capacity: 8,
        };

        defmt::info!("error: {:?}", error);
    }
}
