//! Closed-loop gain control settings
//!
//! CLGC runs inside the DPD tracking calibration, so its control commands
//! are addressed to [`ObjectId::TC_TX_DPD`] with their own opcodes.

use byte::{ctx::Endian, BytesExt, TryRead, TryWrite};

use super::{
    validate::{self, Validate},
    Adrv904x, CapBufAccessCfg, CapBufInfo, ChannelMask, Error, ObjectId,
};
use crate::{
    codec::{self, WireSize},
    fixed_point::FixedPoint,
    maybe_async_attr, spi_type, RegisterBus,
};

/// CLGC control opcodes
mod opcode {
    pub const CAPTURE_CONFIG: u16 = 0x20;
    pub const TRACK_CONFIG: u16 = 0x21;
    pub const TRACK_RUN: u16 = 0x22;
    pub const TRACK_RESET: u16 = 0x23;
    pub const CAPTURE_BUF_ACCESS: u16 = 0x24;
}

/// How CLGC captures are triggered
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClgcCaptureMode {
    /// Captures at fixed times
    Normal = 0,
    /// Captures on the peak detector
    PeakDet = 1,
}

/// CLGC capture configuration
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClgcCaptureCfg {
    /// Raw [`ClgcCaptureMode`]
    pub cap_mode: u32,
    /// Captures per update, at least 1
    pub num_cap_batches: u32,
    /// Length of a capture
    pub cap_duration_us: u32,
    /// Time between the starts of two captures
    pub cap_period_us: u32,
    /// Captures below this ORx power are dropped
    pub min_orx_pow_thres: f32,
    /// Captures below this Tx power are dropped
    pub min_tx_pow_thres: f32,
}

impl Default for ClgcCaptureCfg {
    fn default() -> Self {
        ClgcCaptureCfg {
            cap_mode: ClgcCaptureMode::Normal as u32,
            num_cap_batches: 1,
            cap_duration_us: 0,
            cap_period_us: 0,
            min_orx_pow_thres: 0.0,
            min_tx_pow_thres: 0.0,
        }
    }
}

impl Validate for ClgcCaptureCfg {
    fn validate(&self) -> validate::Result {
        validate::at_most(self.cap_mode, ClgcCaptureMode::PeakDet as u32, "cap_mode")?;
        validate::at_least(self.num_cap_batches, 1, "num_cap_batches")
    }
}

impl WireSize for ClgcCaptureCfg {
    const WIRE_LEN: usize = 24;
}

impl TryWrite<Endian> for &ClgcCaptureCfg {
    fn try_write(self, bytes: &mut [u8], endian: Endian) -> byte::Result<usize> {
        let offset = &mut 0;

        bytes.write_with(offset, self.cap_mode, endian)?;
        bytes.write_with(offset, self.num_cap_batches, endian)?;
        bytes.write_with(offset, self.cap_duration_us, endian)?;
        bytes.write_with(offset, self.cap_period_us, endian)?;
        codec::write_f32(bytes, offset, self.min_orx_pow_thres)?;
        codec::write_f32(bytes, offset, self.min_tx_pow_thres)?;

        Ok(*offset)
    }
}

impl<'a> TryRead<'a, Endian> for ClgcCaptureCfg {
    fn try_read(bytes: &'a [u8], endian: Endian) -> byte::Result<(Self, usize)> {
        let offset = &mut 0;

        let cfg = ClgcCaptureCfg {
            cap_mode: bytes.read_with(offset, endian)?,
            num_cap_batches: bytes.read_with(offset, endian)?,
            cap_duration_us: bytes.read_with(offset, endian)?,
            cap_period_us: bytes.read_with(offset, endian)?,
            min_orx_pow_thres: codec::read_f32(bytes, offset)?,
            min_tx_pow_thres: codec::read_f32(bytes, offset)?,
        };

        Ok((cfg, *offset))
    }
}

/// CLGC tracking configuration
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClgcTrackCfg {
    /// Enables CLGC tracking
    pub en_clgc: u8,
    /// Stops attenuation changes that would overdrive the PA
    pub en_pa_protect: u8,
    /// Target loop power gain
    pub exp_loop_pow_gain: f32,
    /// Largest gain step of a single update, in dB
    pub max_loop_gain_adjust_db: f32,
    /// Highest Tx attenuation CLGC may apply, in dB
    pub max_tx_atten_limit_db: f32,
    /// Lowest Tx attenuation CLGC may apply, in dB
    pub min_tx_atten_limit_db: f32,
}

impl Validate for ClgcTrackCfg {
    fn validate(&self) -> validate::Result {
        validate::flag(self.en_clgc, "en_clgc")?;
        validate::flag(self.en_pa_protect, "en_pa_protect")
    }
}

impl WireSize for ClgcTrackCfg {
    const WIRE_LEN: usize = 18;
}

impl TryWrite<Endian> for &ClgcTrackCfg {
    fn try_write(self, bytes: &mut [u8], endian: Endian) -> byte::Result<usize> {
        let offset = &mut 0;

        bytes.write_with(offset, self.en_clgc, endian)?;
        bytes.write_with(offset, self.en_pa_protect, endian)?;
        codec::write_f32(bytes, offset, self.exp_loop_pow_gain)?;
        codec::write_f32(bytes, offset, self.max_loop_gain_adjust_db)?;
        codec::write_f32(bytes, offset, self.max_tx_atten_limit_db)?;
        codec::write_f32(bytes, offset, self.min_tx_atten_limit_db)?;

        Ok(*offset)
    }
}

impl<'a> TryRead<'a, Endian> for ClgcTrackCfg {
    fn try_read(bytes: &'a [u8], endian: Endian) -> byte::Result<(Self, usize)> {
        let offset = &mut 0;

        let cfg = ClgcTrackCfg {
            en_clgc: bytes.read_with(offset, endian)?,
            en_pa_protect: bytes.read_with(offset, endian)?,
            exp_loop_pow_gain: codec::read_f32(bytes, offset)?,
            max_loop_gain_adjust_db: codec::read_f32(bytes, offset)?,
            max_tx_atten_limit_db: codec::read_f32(bytes, offset)?,
            min_tx_atten_limit_db: codec::read_f32(bytes, offset)?,
        };

        Ok((cfg, *offset))
    }
}

/// [`ClgcTrackCfg`] with its real values scaled by 10^6
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClgcTrackCfgInt {
    /// As [`ClgcTrackCfg::en_clgc`]
    pub en_clgc: u8,
    /// As [`ClgcTrackCfg::en_pa_protect`]
    pub en_pa_protect: u8,
    /// [`ClgcTrackCfg::exp_loop_pow_gain`] scaled by 10^6
    pub exp_loop_pow_gain_e6: i32,
    /// [`ClgcTrackCfg::max_loop_gain_adjust_db`] scaled by 10^6
    pub max_loop_gain_adjust_db_e6: i32,
    /// [`ClgcTrackCfg::max_tx_atten_limit_db`] scaled by 10^6
    pub max_tx_atten_limit_db_e6: i32,
    /// [`ClgcTrackCfg::min_tx_atten_limit_db`] scaled by 10^6
    pub min_tx_atten_limit_db_e6: i32,
}

impl From<&ClgcTrackCfgInt> for ClgcTrackCfg {
    fn from(cfg: &ClgcTrackCfgInt) -> Self {
        let e6 = FixedPoint::E6;

        ClgcTrackCfg {
            en_clgc: cfg.en_clgc,
            en_pa_protect: cfg.en_pa_protect,
            exp_loop_pow_gain: e6.to_float(cfg.exp_loop_pow_gain_e6),
            max_loop_gain_adjust_db: e6.to_float(cfg.max_loop_gain_adjust_db_e6),
            max_tx_atten_limit_db: e6.to_float(cfg.max_tx_atten_limit_db_e6),
            min_tx_atten_limit_db: e6.to_float(cfg.min_tx_atten_limit_db_e6),
        }
    }
}

impl From<&ClgcTrackCfg> for ClgcTrackCfgInt {
    fn from(cfg: &ClgcTrackCfg) -> Self {
        let e6 = FixedPoint::E6;

        ClgcTrackCfgInt {
            en_clgc: cfg.en_clgc,
            en_pa_protect: cfg.en_pa_protect,
            exp_loop_pow_gain_e6: e6.from_float(cfg.exp_loop_pow_gain),
            max_loop_gain_adjust_db_e6: e6.from_float(cfg.max_loop_gain_adjust_db),
            max_tx_atten_limit_db_e6: e6.from_float(cfg.max_tx_atten_limit_db),
            min_tx_atten_limit_db_e6: e6.from_float(cfg.min_tx_atten_limit_db),
        }
    }
}

impl<BUS, DELAY> Adrv904x<BUS, DELAY>
where
    BUS: RegisterBus,
    DELAY: spi_type::delay::DelayNs,
{
    /// Writes the CLGC capture configuration of every channel of `tx_mask`
    #[maybe_async_attr]
    pub async fn clgc_capture_config_set(
        &mut self,
        tx_mask: ChannelMask,
        cfg: &ClgcCaptureCfg,
    ) -> Result<(), Error<BUS>> {
        self.cal_config_set(ObjectId::TC_TX_DPD, opcode::CAPTURE_CONFIG, tx_mask, cfg)
            .await
    }

    /// Reads the CLGC capture configuration of a single Tx channel
    #[maybe_async_attr]
    pub async fn clgc_capture_config_get(
        &mut self,
        tx_channel: ChannelMask,
    ) -> Result<ClgcCaptureCfg, Error<BUS>> {
        self.cal_config_get(ObjectId::TC_TX_DPD, opcode::CAPTURE_CONFIG, tx_channel)
            .await
    }

    /// Writes the CLGC tracking configuration of every channel of `tx_mask`
    #[maybe_async_attr]
    pub async fn clgc_tracking_config_set(
        &mut self,
        tx_mask: ChannelMask,
        cfg: &ClgcTrackCfg,
    ) -> Result<(), Error<BUS>> {
        self.cal_config_set(ObjectId::TC_TX_DPD, opcode::TRACK_CONFIG, tx_mask, cfg)
            .await
    }

    /// Reads the CLGC tracking configuration of a single Tx channel
    #[maybe_async_attr]
    pub async fn clgc_tracking_config_get(
        &mut self,
        tx_channel: ChannelMask,
    ) -> Result<ClgcTrackCfg, Error<BUS>> {
        self.cal_config_get(ObjectId::TC_TX_DPD, opcode::TRACK_CONFIG, tx_channel)
            .await
    }

    /// [`clgc_tracking_config_set`](Self::clgc_tracking_config_set) taking
    /// scaled integers
    #[maybe_async_attr]
    pub async fn clgc_tracking_config_set_int(
        &mut self,
        tx_mask: ChannelMask,
        cfg: &ClgcTrackCfgInt,
    ) -> Result<(), Error<BUS>> {
        self.clgc_tracking_config_set(tx_mask, &ClgcTrackCfg::from(cfg))
            .await
    }

    /// [`clgc_tracking_config_get`](Self::clgc_tracking_config_get)
    /// returning scaled integers
    #[maybe_async_attr]
    pub async fn clgc_tracking_config_get_int(
        &mut self,
        tx_channel: ChannelMask,
    ) -> Result<ClgcTrackCfgInt, Error<BUS>> {
        let cfg = self.clgc_tracking_config_get(tx_channel).await?;
        Ok(ClgcTrackCfgInt::from(&cfg))
    }

    /// Runs one CLGC tracking iteration on every channel of `tx_mask`
    #[maybe_async_attr]
    pub async fn clgc_tracking_run(&mut self, tx_mask: ChannelMask) -> Result<(), Error<BUS>> {
        self.cal_command(ObjectId::TC_TX_DPD, opcode::TRACK_RUN, tx_mask)
            .await
    }

    /// Resets the CLGC tracking state of every channel of `tx_mask`
    #[maybe_async_attr]
    pub async fn clgc_tracking_reset(&mut self, tx_mask: ChannelMask) -> Result<(), Error<BUS>> {
        self.cal_command(ObjectId::TC_TX_DPD, opcode::TRACK_RESET, tx_mask)
            .await
    }

    /// Lends the CLGC capture buffers out, or hands them back, on every
    /// channel of `tx_mask`
    #[maybe_async_attr]
    pub async fn clgc_capture_buffers_access_set(
        &mut self,
        tx_mask: ChannelMask,
        cfg: &CapBufAccessCfg,
    ) -> Result<(), Error<BUS>> {
        self.cal_config_set(ObjectId::TC_TX_DPD, opcode::CAPTURE_BUF_ACCESS, tx_mask, cfg)
            .await
    }

    /// Reads the CLGC capture buffers lent out on a single Tx channel
    #[maybe_async_attr]
    pub async fn clgc_capture_buffers_access_get(
        &mut self,
        tx_channel: ChannelMask,
    ) -> Result<CapBufInfo, Error<BUS>> {
        self.cal_config_get(ObjectId::TC_TX_DPD, opcode::CAPTURE_BUF_ACCESS, tx_channel)
            .await
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use crate::hl::{
        test_util::{control_store, device, FakeBus, Reply, Request},
        CmdId, CpuType,
    };

    fn store_bus() -> FakeBus {
        FakeBus::new()
            .with_firmware(CpuType::Cpu0, control_store())
            .with_firmware(CpuType::Cpu1, control_store())
    }

    #[tokio::test]
    async fn test_capture_config() {
        let mut adrv = device(store_bus());
        let cfg = ClgcCaptureCfg {
            cap_mode: ClgcCaptureMode::PeakDet as u32,
            num_cap_batches: 4,
            cap_duration_us: 100,
            cap_period_us: 1000,
            min_orx_pow_thres: -40.5,
            min_tx_pow_thres: -30.0,
        };

        adrv.clgc_capture_config_set(ChannelMask::tx(0x04), &cfg)
            .await
            .unwrap();

        let sent = adrv.bus().sent().to_vec();
        assert_eq!(sent.len(), 1);
        let (obj_id, opcode, channel, data) = sent[0].1.control();
        assert_eq!(obj_id, u32::from(ObjectId::TC_TX_DPD));
        assert_eq!(opcode, 0x30);
        assert_eq!(channel, 2);
        assert_eq!(data.len(), ClgcCaptureCfg::WIRE_LEN);
        assert_eq!(&data[..8], &[1, 0, 0, 0, 4, 0, 0, 0]);

        assert_eq!(
            adrv.clgc_capture_config_get(ChannelMask::tx(0x04))
                .await
                .unwrap(),
            cfg
        );
    }

    #[tokio::test]
    async fn test_capture_config_validation() {
        let mut adrv = device(store_bus());

        let cfg = ClgcCaptureCfg {
            cap_mode: 2,
            ..Default::default()
        };
        let err = adrv
            .clgc_capture_config_set(ChannelMask::tx(0x01), &cfg)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter("cap_mode")));

        let cfg = ClgcCaptureCfg {
            num_cap_batches: 0,
            ..Default::default()
        };
        let err = adrv
            .clgc_capture_config_set(ChannelMask::tx(0x01), &cfg)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter("num_cap_batches")));

        assert!(adrv.bus().sent().is_empty());
    }

    #[tokio::test]
    async fn test_tracking_config_int() {
        let mut adrv = device(store_bus());
        let cfg = ClgcTrackCfgInt {
            en_clgc: 1,
            en_pa_protect: 1,
            exp_loop_pow_gain_e6: -2_500_000,
            max_loop_gain_adjust_db_e6: 500_000,
            max_tx_atten_limit_db_e6: 20_000_000,
            min_tx_atten_limit_db_e6: 0,
        };

        adrv.clgc_tracking_config_set_int(ChannelMask::tx(0xf0), &cfg)
            .await
            .unwrap();
        assert_eq!(adrv.bus().sent().len(), 4);

        let read = adrv
            .clgc_tracking_config_get(ChannelMask::tx(0x20))
            .await
            .unwrap();
        assert_eq!(read.exp_loop_pow_gain, -2.5);
        assert_eq!(read.max_loop_gain_adjust_db, 0.5);

        assert_eq!(
            adrv.clgc_tracking_config_get_int(ChannelMask::tx(0x80))
                .await
                .unwrap(),
            cfg
        );

        let err = adrv
            .clgc_tracking_config_set(
                ChannelMask::tx(0x01),
                &ClgcTrackCfg {
                    en_pa_protect: 2,
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter("en_pa_protect")));
    }

    #[tokio::test]
    async fn test_run_and_reset() {
        let mut adrv = device(store_bus());

        adrv.clgc_tracking_run(ChannelMask::tx(0x03)).await.unwrap();
        adrv.clgc_tracking_reset(ChannelMask::tx(0x01)).await.unwrap();

        let opcodes: Vec<(u16, u32)> = adrv
            .bus()
            .sent()
            .iter()
            .map(|(_, request)| {
                let (_, opcode, channel, data) = request.control();
                assert!(data.is_empty());
                (opcode, channel)
            })
            .collect();
        assert_eq!(opcodes, vec![(0x22, 0), (0x22, 1), (0x23, 0)]);

        let err = adrv
            .clgc_tracking_run(ChannelMask::orx(0x01))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter("tx_channel_mask")));
    }

    #[tokio::test]
    async fn test_capture_buffers_access() {
        let mut info = vec![1u8];
        info.extend_from_slice(&0x2040_0000u64.to_le_bytes());
        info.extend_from_slice(&[0; 24]);

        let bus = FakeBus::new().with_firmware(
            CpuType::Cpu1,
            Box::new(move |request: &Request| {
                if request.cmd_id != CmdId::SetCtrl as u16 {
                    return Reply::ok(&[]);
                }
                match request.control().1 {
                    0x24 => Reply::control(&info),
                    _ => Reply::control(&[]),
                }
            }),
        );
        let mut adrv = device(bus);

        let cfg = CapBufAccessCfg {
            release_cap_buf: 0,
            stop_after_cap_done: 1,
            err_codes: [0x10, 0, 0, 0],
        };
        adrv.clgc_capture_buffers_access_set(ChannelMask::tx(0x30), &cfg)
            .await
            .unwrap();

        let sent: Vec<(u16, u32, Vec<u8>)> = adrv
            .bus()
            .sent()
            .iter()
            .map(|(_, request)| {
                let (obj_id, opcode, channel, data) = request.control();
                assert_eq!(obj_id, u32::from(ObjectId::TC_TX_DPD));
                (opcode, channel, data)
            })
            .collect();
        assert_eq!(sent.len(), 2);
        assert_eq!((sent[0].0, sent[0].1), (0x34, 4));
        assert_eq!((sent[1].0, sent[1].1), (0x34, 5));
        assert_eq!(&sent[0].2[..3], &[0, 1, 0x10]);

        let read = adrv
            .clgc_capture_buffers_access_get(ChannelMask::tx(0x40))
            .await
            .unwrap();
        assert_eq!(read.buffers(), &[0x2040_0000]);

        let err = adrv
            .clgc_capture_buffers_access_set(
                ChannelMask::tx(0x10),
                &CapBufAccessCfg {
                    release_cap_buf: 2,
                    ..cfg
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter("release_cap_buf")));
        assert_eq!(adrv.bus().sent().len(), 3);
    }
}
