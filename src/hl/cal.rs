//! Transport shared by the calibration settings
//!
//! A calibration setting is a fixed-layout structure exchanged with the
//! tracking calibration that owns it through control commands. Writes go to
//! every selected Tx channel in ascending order, reads come from a single
//! channel.

use byte::{ctx::Endian, BytesExt, TryRead, TryWrite};

use super::{
    validate::{self, InvalidParameter, Validate},
    Adrv904x, ChannelClass, ChannelMask, Command, Error, ObjectId, MAX_CTRL_DATA_SIZE,
};
use crate::{
    codec::{self, WireSize},
    maybe_async_attr, spi_type, RegisterBus,
};

/// Number of error codes that can hold a calibration while its capture
/// buffers are lent out
pub const CAP_BUF_PAUSE_ERROR_CODES: usize = 4;

/// Largest number of capture buffers a calibration lends out at once
pub const CAP_BUF_MAX_BUFFERS: usize = 4;

/// Capture buffer lending request
///
/// Shared by the DPD and CLGC calibrations.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CapBufAccessCfg {
    /// Hands the capture buffers back to the calibration
    pub release_cap_buf: u8,
    /// Stops the calibration once the next capture is done
    pub stop_after_cap_done: u8,
    /// Error codes that pause the calibration, 0 for an unused slot
    pub err_codes: [u32; CAP_BUF_PAUSE_ERROR_CODES],
}

impl Validate for CapBufAccessCfg {
    fn validate(&self) -> validate::Result {
        validate::flag(self.release_cap_buf, "release_cap_buf")?;
        validate::flag(self.stop_after_cap_done, "stop_after_cap_done")
    }
}

impl WireSize for CapBufAccessCfg {
    const WIRE_LEN: usize = 2 + CAP_BUF_PAUSE_ERROR_CODES * 4;
}

impl TryWrite<Endian> for &CapBufAccessCfg {
    fn try_write(self, bytes: &mut [u8], endian: Endian) -> byte::Result<usize> {
        let offset = &mut 0;

        bytes.write_with(offset, self.release_cap_buf, endian)?;
        bytes.write_with(offset, self.stop_after_cap_done, endian)?;
        codec::write_array(bytes, offset, &self.err_codes)?;

        Ok(*offset)
    }
}

impl<'a> TryRead<'a, Endian> for CapBufAccessCfg {
    fn try_read(bytes: &'a [u8], endian: Endian) -> byte::Result<(Self, usize)> {
        let offset = &mut 0;
        let mut cfg = CapBufAccessCfg {
            release_cap_buf: bytes.read_with(offset, endian)?,
            stop_after_cap_done: bytes.read_with(offset, endian)?,
            ..Default::default()
        };
        codec::read_array(bytes, offset, &mut cfg.err_codes)?;

        Ok((cfg, *offset))
    }
}

/// Capture buffers lent out by a calibration
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CapBufInfo {
    /// Number of valid entries of `addresses`
    pub num: u8,
    /// Device addresses of the buffers
    pub addresses: [u64; CAP_BUF_MAX_BUFFERS],
}

impl CapBufInfo {
    /// Addresses of the buffers actually lent out
    pub fn buffers(&self) -> &[u64] {
        &self.addresses[..(self.num as usize).min(CAP_BUF_MAX_BUFFERS)]
    }
}

impl WireSize for CapBufInfo {
    const WIRE_LEN: usize = 1 + CAP_BUF_MAX_BUFFERS * 8;
}

impl<'a> TryRead<'a, Endian> for CapBufInfo {
    fn try_read(bytes: &'a [u8], endian: Endian) -> byte::Result<(Self, usize)> {
        let offset = &mut 0;
        let mut info = CapBufInfo {
            num: bytes.read_with(offset, endian)?,
            ..Default::default()
        };
        if info.num as usize > CAP_BUF_MAX_BUFFERS {
            return Err(byte::Error::BadInput {
                err: "capture buffer count",
            });
        }

        for address in info.addresses.iter_mut() {
            *address = codec::read_u64(bytes, offset)?;
        }

        Ok((info, *offset))
    }
}

/// Fails unless `mask` is a mask of Tx channels
pub(crate) fn tx_class(mask: &ChannelMask) -> Result<(), InvalidParameter> {
    if mask.class() == ChannelClass::Tx {
        Ok(())
    } else {
        Err(InvalidParameter("tx_channel_mask"))
    }
}

impl<BUS, DELAY> Adrv904x<BUS, DELAY>
where
    BUS: RegisterBus,
    DELAY: spi_type::delay::DelayNs,
{
    /// Validates `cfg` and writes it to every channel of `tx_mask`
    #[maybe_async_attr]
    pub(crate) async fn cal_config_set<T>(
        &mut self,
        obj_id: ObjectId,
        opcode: u16,
        tx_mask: ChannelMask,
        cfg: &T,
    ) -> Result<(), Error<BUS>>
    where
        T: Validate + WireSize,
        for<'b> &'b T: TryWrite<Endian>,
    {
        tx_class(&tx_mask)?;
        tx_mask.validate()?;
        cfg.validate()?;

        let mut buf = [0u8; MAX_CTRL_DATA_SIZE];
        let len = codec::encode(cfg, &mut buf)?;

        for channel in tx_mask.channels() {
            trace!("object {:#x}: set {:#x} on {:?}", obj_id.0, opcode, channel);
            self.control_cmd_exec(obj_id, Command::Set(opcode, &buf[..len]), channel, &mut [])
                .await?;
        }

        Ok(())
    }

    /// Reads a setting from the single channel of `tx_channel`
    #[maybe_async_attr]
    pub(crate) async fn cal_config_get<T>(
        &mut self,
        obj_id: ObjectId,
        opcode: u16,
        tx_channel: ChannelMask,
    ) -> Result<T, Error<BUS>>
    where
        T: WireSize + for<'b> TryRead<'b, Endian>,
    {
        tx_class(&tx_channel)?;
        tx_channel.single()?;

        let mut resp = [0u8; MAX_CTRL_DATA_SIZE];
        let len = self
            .control_cmd_exec(obj_id, Command::Get(opcode), tx_channel, &mut resp)
            .await?;
        if len < T::WIRE_LEN {
            warn!(
                "object {:#x}: {} bytes returned for {:#x}, {} expected",
                obj_id.0,
                len,
                opcode,
                T::WIRE_LEN
            );
        }

        Ok(codec::decode(&resp[..len])?)
    }

    /// Validates `cfg` and writes it to every channel of `tx_mask`, prefixed
    /// with the `key` byte that selects which instance of the setting is
    /// written
    #[maybe_async_attr]
    pub(crate) async fn cal_keyed_config_set<T>(
        &mut self,
        obj_id: ObjectId,
        opcode: u16,
        tx_mask: ChannelMask,
        key: u8,
        cfg: &T,
    ) -> Result<(), Error<BUS>>
    where
        T: Validate,
        for<'b> &'b T: TryWrite<Endian>,
    {
        tx_class(&tx_mask)?;
        tx_mask.validate()?;
        cfg.validate()?;

        let mut buf = [0u8; MAX_CTRL_DATA_SIZE];
        buf[0] = key;
        let len = 1 + codec::encode(cfg, &mut buf[1..])?;

        for channel in tx_mask.channels() {
            trace!(
                "object {:#x}: set {:#x}[{}] on {:?}",
                obj_id.0,
                opcode,
                key,
                channel
            );
            self.control_cmd_exec(obj_id, Command::Set(opcode, &buf[..len]), channel, &mut [])
                .await?;
        }

        Ok(())
    }

    /// Reads the instance `key` of a setting from the single channel of
    /// `tx_channel`
    #[maybe_async_attr]
    pub(crate) async fn cal_keyed_config_get<T>(
        &mut self,
        obj_id: ObjectId,
        opcode: u16,
        tx_channel: ChannelMask,
        key: u8,
    ) -> Result<T, Error<BUS>>
    where
        T: for<'b> TryRead<'b, Endian>,
    {
        tx_class(&tx_channel)?;
        tx_channel.single()?;

        let mut resp = [0u8; MAX_CTRL_DATA_SIZE];
        let len = self
            .control_cmd_exec(obj_id, Command::Query(opcode, &[key]), tx_channel, &mut resp)
            .await?;

        Ok(codec::decode(&resp[..len])?)
    }

    /// Sends a data-less command to every channel of `tx_mask`
    #[maybe_async_attr]
    pub(crate) async fn cal_command(
        &mut self,
        obj_id: ObjectId,
        opcode: u16,
        tx_mask: ChannelMask,
    ) -> Result<(), Error<BUS>> {
        tx_class(&tx_mask)?;
        tx_mask.validate()?;

        for channel in tx_mask.channels() {
            self.control_cmd_exec(obj_id, Command::Get(opcode), channel, &mut [])
                .await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_cap_buf_access_layout() {
        let cfg = CapBufAccessCfg {
            release_cap_buf: 1,
            stop_after_cap_done: 0,
            err_codes: [0x3001, 0, 0, 0xdead_beef],
        };
        let mut bytes = [0u8; CapBufAccessCfg::WIRE_LEN];

        assert_eq!(codec::encode(&cfg, &mut bytes).unwrap(), CapBufAccessCfg::WIRE_LEN);
        assert_eq!(&bytes[..6], &[1, 0, 0x01, 0x30, 0, 0]);
        assert_eq!(&bytes[14..], &[0xef, 0xbe, 0xad, 0xde]);
        assert_eq!(codec::decode::<CapBufAccessCfg>(&bytes).unwrap(), cfg);

        assert_eq!(
            CapBufAccessCfg {
                stop_after_cap_done: 2,
                ..cfg
            }
            .validate(),
            Err(InvalidParameter("stop_after_cap_done"))
        );
    }

    #[test]
    fn test_cap_buf_info_decode() {
        let mut bytes = vec![2u8];
        bytes.extend_from_slice(&0x0000_0001_2000_0000u64.to_le_bytes());
        bytes.extend_from_slice(&0x2000_4000u64.to_le_bytes());
        bytes.extend_from_slice(&[0; 16]);

        let info: CapBufInfo = codec::decode(&bytes).unwrap();
        assert_eq!(info.buffers(), &[0x0000_0001_2000_0000, 0x2000_4000]);

        bytes[0] = CAP_BUF_MAX_BUFFERS as u8 + 1;
        assert!(codec::decode::<CapBufInfo>(&bytes).is_err());

        // Truncated
        bytes[0] = 1;
        assert!(codec::decode::<CapBufInfo>(&bytes[..20]).is_err());
    }
}
