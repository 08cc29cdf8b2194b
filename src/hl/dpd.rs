//! Digital predistortion settings
//!
//! DPD is the Tx linearization tracking calibration. Its settings live in the
//! firmware, one copy per Tx channel, and are reached through control
//! commands addressed to [`ObjectId::TC_TX_DPD`].

use byte::{ctx::Endian, BytesExt, TryRead, TryWrite};

use super::{
    cal::tx_class,
    validate::{self, Validate},
    Adrv904x, CapBufAccessCfg, CapBufInfo, ChannelMask, Error, ObjectId, MAX_CTRL_DATA_SIZE,
};
use crate::{
    codec::{self, WireSize},
    fixed_point::FixedPoint,
    maybe_async_attr, spi_type, RegisterBus,
};

/// DPD control opcodes
mod opcode {
    pub const MODEL_CONFIG: u16 = 0;
    pub const TRACK_CONFIG: u16 = 1;
    pub const POWER_METER_CONFIG: u16 = 2;
    pub const CAPTURE_CONFIG: u16 = 3;
    pub const RESET: u16 = 4;
    pub const CAPTURE_BUF_ACCESS: u16 = 5;
    pub const STABILITY_CONFIG: u16 = 6;
}

/// Number of feature filter coefficients
pub const DPD_NUM_COEFFICIENTS: usize = 64;

/// Number of GMP power models
pub const DPD_GMP_POWER_MODELS: usize = 4;

/// Number of peak rank ratios of the manual CTC1 mode
pub const CTC1_PEAK_RANK_RATIOS: usize = 3;

/// Number of stability metrics
pub const DPD_STABILITY_METRICS: usize = 9;

/// Number of stability error words
pub const DPD_STABILITY_ERROR_WORDS: usize = 4;

/// Largest number of feature rows of a DPD model that fit a control command
pub const DPD_MODEL_MAX_FEATURES: usize = 11;

/// Largest number of feature rows of a CTC model that fit a control command
pub const CTC_MODEL_MAX_FEATURES: usize = 10;

/// Models that can be selected on a threshold violation: M, C or unity
const MODEL_TABLES: [u8; 3] = [1, 2, 4];

/// GMP0, GMP1, DDR7, DDR8 and DDR9
const FEATURE_POLYS: [u16; 5] = [0, 1, 7, 8, 9];

/// Adaptation engine settings
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DpdAdaptCfg {
    /// Number of samples per adaptation, 4096 to 32768
    pub num_dpd_samples: u16,
    /// Enables the feature filter
    pub feature_filter_en: u8,
}

impl Default for DpdAdaptCfg {
    fn default() -> Self {
        DpdAdaptCfg {
            num_dpd_samples: 0x4000,
            feature_filter_en: 0,
        }
    }
}

/// Bandwidth detector settings
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DpdBwDetCfg {
    /// Enables the bandwidth detector
    pub bw_det_en: u8,
    /// Largest lag evaluated by the autocorrelation, at most 4095
    pub corr_lag_max: u16,
    /// Below this, the signal is too narrow for a path delay estimate
    pub lo_bw_beta2_thres: f32,
    /// Above this, the signal is wide enough for a path delay estimate
    pub hi_bw_beta2_thres: f32,
    /// Leaky filter coefficient of the path delay tracking
    pub alpha_track: f32,
}

/// DPD tracking configuration
///
/// Thresholds in dB are in hundredths of a dBFS.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DpdTrackCfg {
    /// Adaptation engine settings
    pub adapt: DpdAdaptCfg,
    /// Runs CLGC before DPD
    pub run_clgc: u8,
    /// Feature filter coefficients
    pub filter_coef: [i16; DPD_NUM_COEFFICIENTS],
    /// 0 simple update, 1 max only, 2 two-model CMT, 3 three-model CMT
    pub update_mode: u8,
    /// M table threshold, 0 or below
    pub m_threshold_db: i32,
    /// Forces direct learning
    pub force_direct: u8,
    /// Regularization of indirect learning, per model, at most 63
    pub indirect_reg_value: [u8; DPD_GMP_POWER_MODELS],
    /// Regularization of direct learning, at most 63
    pub direct_reg_value: u8,
    /// Direct learning step size in percent
    pub mu: u8,
    /// Model selected on a low power violation: 1, 2 or 4 (unity)
    pub low_power_action_model: u8,
    /// LUT entry resolution
    pub lut_resolution: u8,
    /// Multiframes per capture pattern, 1 to 600
    pub number_of_multi_frames: u32,
    /// CTC1 statistics samples, at most 1112
    pub ctc1_stats_sample_num: u32,
    /// Uses the manual CTC1 settings below
    pub ctc1_manual_enabled: u8,
    /// CTC1 threshold margin in percent, at most 20
    pub ctc1_delta_percentage: u8,
    /// Peak rank ratios of the manual CTC1 mode, at most 100 each
    pub ctc1_peak_rank_ratio: [u8; CTC1_PEAK_RANK_RATIOS],
    /// Capture weighting of each peak rank ratio, at most 8 each
    pub ctc1_capture_weighting: [u8; CTC1_PEAK_RANK_RATIOS],
    /// Enables wideband regularization
    pub wb_reg_enable: u8,
    /// Wideband regularization mode, 0 or 1
    pub wb_reg_mode: u8,
    /// Within `0.0..=1.0`
    pub wb_reg_alpha: f32,
    /// Within `0.0..=1.0`
    pub wb_reg_beta: f32,
    /// Estimated coefficient bias, in samples
    pub est_size_of_coef_bias: u16,
    /// Compensates gain and phase the way older firmware did
    pub use_legacy_gain_phase_comp: u8,
    /// Bandwidth detector settings
    pub bw_det_cfg: DpdBwDetCfg,
    /// C table threshold, 0 or below
    pub c_threshold_db: i32,
    /// Hysteresis between the M and C thresholds
    pub threshold_overlap_db: u16,
}

impl Default for DpdTrackCfg {
    fn default() -> Self {
        DpdTrackCfg {
            adapt: DpdAdaptCfg::default(),
            run_clgc: 0,
            filter_coef: [0; DPD_NUM_COEFFICIENTS],
            update_mode: 0,
            m_threshold_db: -2100,
            force_direct: 0,
            indirect_reg_value: [0; DPD_GMP_POWER_MODELS],
            direct_reg_value: 0,
            mu: 0,
            low_power_action_model: 4,
            lut_resolution: 0,
            number_of_multi_frames: 1,
            ctc1_stats_sample_num: 0,
            ctc1_manual_enabled: 0,
            ctc1_delta_percentage: 0,
            ctc1_peak_rank_ratio: [0; CTC1_PEAK_RANK_RATIOS],
            ctc1_capture_weighting: [0; CTC1_PEAK_RANK_RATIOS],
            wb_reg_enable: 0,
            wb_reg_mode: 0,
            wb_reg_alpha: 0.0,
            wb_reg_beta: 0.0,
            est_size_of_coef_bias: 0,
            use_legacy_gain_phase_comp: 0,
            bw_det_cfg: DpdBwDetCfg::default(),
            c_threshold_db: 0,
            threshold_overlap_db: 0,
        }
    }
}

impl Validate for DpdTrackCfg {
    fn validate(&self) -> validate::Result {
        validate::in_range(self.adapt.num_dpd_samples, 0x1000, 0x8000, "num_dpd_samples")?;
        validate::flag(self.adapt.feature_filter_en, "feature_filter_en")?;
        validate::flag(self.run_clgc, "run_clgc")?;
        validate::at_most(self.update_mode, 3, "update_mode")?;
        validate::at_most(self.m_threshold_db, 0, "m_threshold_db")?;
        validate::flag(self.force_direct, "force_direct")?;
        validate::all_in_range(&self.indirect_reg_value, 0, 63, "indirect_reg_value")?;
        validate::at_most(self.direct_reg_value, 63, "direct_reg_value")?;
        validate::at_most(self.mu, 100, "mu")?;
        validate::one_of(self.low_power_action_model, &MODEL_TABLES, "low_power_action_model")?;
        validate::in_range(self.number_of_multi_frames, 1, 600, "number_of_multi_frames")?;
        validate::at_most(self.ctc1_stats_sample_num, 1112, "ctc1_stats_sample_num")?;
        validate::flag(self.ctc1_manual_enabled, "ctc1_manual_enabled")?;
        validate::at_most(self.ctc1_delta_percentage, 20, "ctc1_delta_percentage")?;
        validate::all_in_range(&self.ctc1_peak_rank_ratio, 0, 100, "ctc1_peak_rank_ratio")?;
        validate::all_in_range(&self.ctc1_capture_weighting, 0, 8, "ctc1_capture_weighting")?;
        validate::flag(self.wb_reg_enable, "wb_reg_enable")?;
        validate::flag(self.wb_reg_mode, "wb_reg_mode")?;
        validate::in_range(self.wb_reg_alpha, 0.0, 1.0, "wb_reg_alpha")?;
        validate::in_range(self.wb_reg_beta, 0.0, 1.0, "wb_reg_beta")?;
        validate::flag(self.use_legacy_gain_phase_comp, "use_legacy_gain_phase_comp")?;

        let bw = &self.bw_det_cfg;
        validate::flag(bw.bw_det_en, "bw_det_en")?;
        validate::at_most(bw.corr_lag_max, 4095, "corr_lag_max")?;
        validate::in_range(bw.lo_bw_beta2_thres, 0.0, 1.0, "lo_bw_beta2_thres")?;
        validate::in_range(bw.hi_bw_beta2_thres, 0.0, 1.0, "hi_bw_beta2_thres")?;
        validate::in_range(bw.alpha_track, 0.0, 1.0, "alpha_track")?;

        validate::at_most(self.c_threshold_db, 0, "c_threshold_db")
    }
}

impl WireSize for DpdTrackCfg {
    const WIRE_LEN: usize = 196;
}

impl TryWrite<Endian> for &DpdTrackCfg {
    fn try_write(self, bytes: &mut [u8], endian: Endian) -> byte::Result<usize> {
        let offset = &mut 0;

        bytes.write_with(offset, self.adapt.num_dpd_samples, endian)?;
        bytes.write_with(offset, self.adapt.feature_filter_en, endian)?;
        bytes.write_with(offset, self.run_clgc, endian)?;
        codec::write_array(bytes, offset, &self.filter_coef)?;
        bytes.write_with(offset, self.update_mode, endian)?;
        bytes.write_with(offset, self.m_threshold_db, endian)?;
        bytes.write_with(offset, self.force_direct, endian)?;
        codec::write_array(bytes, offset, &self.indirect_reg_value)?;
        bytes.write_with(offset, self.direct_reg_value, endian)?;
        bytes.write_with(offset, self.mu, endian)?;
        bytes.write_with(offset, self.low_power_action_model, endian)?;
        bytes.write_with(offset, self.lut_resolution, endian)?;
        bytes.write_with(offset, self.number_of_multi_frames, endian)?;
        bytes.write_with(offset, self.ctc1_stats_sample_num, endian)?;
        bytes.write_with(offset, self.ctc1_manual_enabled, endian)?;
        bytes.write_with(offset, self.ctc1_delta_percentage, endian)?;
        codec::write_array(bytes, offset, &self.ctc1_peak_rank_ratio)?;
        codec::write_array(bytes, offset, &self.ctc1_capture_weighting)?;
        bytes.write_with(offset, self.wb_reg_enable, endian)?;
        bytes.write_with(offset, self.wb_reg_mode, endian)?;
        codec::write_f32(bytes, offset, self.wb_reg_alpha)?;
        codec::write_f32(bytes, offset, self.wb_reg_beta)?;
        bytes.write_with(offset, self.est_size_of_coef_bias, endian)?;
        bytes.write_with(offset, self.use_legacy_gain_phase_comp, endian)?;

        let bw = &self.bw_det_cfg;
        bytes.write_with(offset, bw.bw_det_en, endian)?;
        bytes.write_with(offset, bw.corr_lag_max, endian)?;
        codec::write_f32(bytes, offset, bw.lo_bw_beta2_thres)?;
        codec::write_f32(bytes, offset, bw.hi_bw_beta2_thres)?;
        codec::write_f32(bytes, offset, bw.alpha_track)?;

        bytes.write_with(offset, self.c_threshold_db, endian)?;
        bytes.write_with(offset, self.threshold_overlap_db, endian)?;

        Ok(*offset)
    }
}

impl<'a> TryRead<'a, Endian> for DpdTrackCfg {
    fn try_read(bytes: &'a [u8], endian: Endian) -> byte::Result<(Self, usize)> {
        let offset = &mut 0;
        let mut cfg = DpdTrackCfg::default();

        cfg.adapt.num_dpd_samples = bytes.read_with(offset, endian)?;
        cfg.adapt.feature_filter_en = bytes.read_with(offset, endian)?;
        cfg.run_clgc = bytes.read_with(offset, endian)?;
        codec::read_array(bytes, offset, &mut cfg.filter_coef)?;
        cfg.update_mode = bytes.read_with(offset, endian)?;
        cfg.m_threshold_db = bytes.read_with(offset, endian)?;
        cfg.force_direct = bytes.read_with(offset, endian)?;
        codec::read_array(bytes, offset, &mut cfg.indirect_reg_value)?;
        cfg.direct_reg_value = bytes.read_with(offset, endian)?;
        cfg.mu = bytes.read_with(offset, endian)?;
        cfg.low_power_action_model = bytes.read_with(offset, endian)?;
        cfg.lut_resolution = bytes.read_with(offset, endian)?;
        cfg.number_of_multi_frames = bytes.read_with(offset, endian)?;
        cfg.ctc1_stats_sample_num = bytes.read_with(offset, endian)?;
        cfg.ctc1_manual_enabled = bytes.read_with(offset, endian)?;
        cfg.ctc1_delta_percentage = bytes.read_with(offset, endian)?;
        codec::read_array(bytes, offset, &mut cfg.ctc1_peak_rank_ratio)?;
        codec::read_array(bytes, offset, &mut cfg.ctc1_capture_weighting)?;
        cfg.wb_reg_enable = bytes.read_with(offset, endian)?;
        cfg.wb_reg_mode = bytes.read_with(offset, endian)?;
        cfg.wb_reg_alpha = codec::read_f32(bytes, offset)?;
        cfg.wb_reg_beta = codec::read_f32(bytes, offset)?;
        cfg.est_size_of_coef_bias = bytes.read_with(offset, endian)?;
        cfg.use_legacy_gain_phase_comp = bytes.read_with(offset, endian)?;

        let bw = &mut cfg.bw_det_cfg;
        bw.bw_det_en = bytes.read_with(offset, endian)?;
        bw.corr_lag_max = bytes.read_with(offset, endian)?;
        bw.lo_bw_beta2_thres = codec::read_f32(bytes, offset)?;
        bw.hi_bw_beta2_thres = codec::read_f32(bytes, offset)?;
        bw.alpha_track = codec::read_f32(bytes, offset)?;

        cfg.c_threshold_db = bytes.read_with(offset, endian)?;
        cfg.threshold_overlap_db = bytes.read_with(offset, endian)?;

        Ok((cfg, *offset))
    }
}

/// [`DpdBwDetCfg`] with its real values scaled by 10^6
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DpdBwDetCfgInt {
    /// As [`DpdBwDetCfg::bw_det_en`]
    pub bw_det_en: u8,
    /// As [`DpdBwDetCfg::corr_lag_max`]
    pub corr_lag_max: u16,
    /// [`DpdBwDetCfg::lo_bw_beta2_thres`] scaled by 10^6
    pub lo_bw_beta2_thres_e6: i32,
    /// [`DpdBwDetCfg::hi_bw_beta2_thres`] scaled by 10^6
    pub hi_bw_beta2_thres_e6: i32,
    /// [`DpdBwDetCfg::alpha_track`] scaled by 10^6
    pub alpha_track_e6: i32,
}

/// [`DpdTrackCfg`] for hosts without floating point: every real value is
/// scaled by 10^6
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DpdTrackCfgInt {
    /// As [`DpdTrackCfg::adapt`]
    pub adapt: DpdAdaptCfg,
    /// As [`DpdTrackCfg::run_clgc`]
    pub run_clgc: u8,
    /// As [`DpdTrackCfg::filter_coef`]
    pub filter_coef: [i16; DPD_NUM_COEFFICIENTS],
    /// As [`DpdTrackCfg::update_mode`]
    pub update_mode: u8,
    /// As [`DpdTrackCfg::m_threshold_db`]
    pub m_threshold_db: i32,
    /// As [`DpdTrackCfg::force_direct`]
    pub force_direct: u8,
    /// As [`DpdTrackCfg::indirect_reg_value`]
    pub indirect_reg_value: [u8; DPD_GMP_POWER_MODELS],
    /// As [`DpdTrackCfg::direct_reg_value`]
    pub direct_reg_value: u8,
    /// As [`DpdTrackCfg::mu`]
    pub mu: u8,
    /// As [`DpdTrackCfg::low_power_action_model`]
    pub low_power_action_model: u8,
    /// As [`DpdTrackCfg::lut_resolution`]
    pub lut_resolution: u8,
    /// As [`DpdTrackCfg::number_of_multi_frames`]
    pub number_of_multi_frames: u32,
    /// As [`DpdTrackCfg::ctc1_stats_sample_num`]
    pub ctc1_stats_sample_num: u32,
    /// As [`DpdTrackCfg::ctc1_manual_enabled`]
    pub ctc1_manual_enabled: u8,
    /// As [`DpdTrackCfg::ctc1_delta_percentage`]
    pub ctc1_delta_percentage: u8,
    /// As [`DpdTrackCfg::ctc1_peak_rank_ratio`]
    pub ctc1_peak_rank_ratio: [u8; CTC1_PEAK_RANK_RATIOS],
    /// As [`DpdTrackCfg::ctc1_capture_weighting`]
    pub ctc1_capture_weighting: [u8; CTC1_PEAK_RANK_RATIOS],
    /// As [`DpdTrackCfg::wb_reg_enable`]
    pub wb_reg_enable: u8,
    /// As [`DpdTrackCfg::wb_reg_mode`]
    pub wb_reg_mode: u8,
    /// [`DpdTrackCfg::wb_reg_alpha`] scaled by 10^6
    pub wb_reg_alpha_e6: i32,
    /// [`DpdTrackCfg::wb_reg_beta`] scaled by 10^6
    pub wb_reg_beta_e6: i32,
    /// As [`DpdTrackCfg::est_size_of_coef_bias`]
    pub est_size_of_coef_bias: u16,
    /// As [`DpdTrackCfg::use_legacy_gain_phase_comp`]
    pub use_legacy_gain_phase_comp: u8,
    /// Bandwidth detector settings
    pub bw_det_cfg: DpdBwDetCfgInt,
    /// As [`DpdTrackCfg::c_threshold_db`]
    pub c_threshold_db: i32,
    /// As [`DpdTrackCfg::threshold_overlap_db`]
    pub threshold_overlap_db: u16,
}

impl Default for DpdTrackCfgInt {
    fn default() -> Self {
        DpdTrackCfgInt::from(&DpdTrackCfg::default())
    }
}

impl From<&DpdTrackCfgInt> for DpdTrackCfg {
    fn from(cfg: &DpdTrackCfgInt) -> Self {
        let e6 = FixedPoint::E6;

        DpdTrackCfg {
            adapt: cfg.adapt,
            run_clgc: cfg.run_clgc,
            filter_coef: cfg.filter_coef,
            update_mode: cfg.update_mode,
            m_threshold_db: cfg.m_threshold_db,
            force_direct: cfg.force_direct,
            indirect_reg_value: cfg.indirect_reg_value,
            direct_reg_value: cfg.direct_reg_value,
            mu: cfg.mu,
            low_power_action_model: cfg.low_power_action_model,
            lut_resolution: cfg.lut_resolution,
            number_of_multi_frames: cfg.number_of_multi_frames,
            ctc1_stats_sample_num: cfg.ctc1_stats_sample_num,
            ctc1_manual_enabled: cfg.ctc1_manual_enabled,
            ctc1_delta_percentage: cfg.ctc1_delta_percentage,
            ctc1_peak_rank_ratio: cfg.ctc1_peak_rank_ratio,
            ctc1_capture_weighting: cfg.ctc1_capture_weighting,
            wb_reg_enable: cfg.wb_reg_enable,
            wb_reg_mode: cfg.wb_reg_mode,
            wb_reg_alpha: e6.to_float(cfg.wb_reg_alpha_e6),
            wb_reg_beta: e6.to_float(cfg.wb_reg_beta_e6),
            est_size_of_coef_bias: cfg.est_size_of_coef_bias,
            use_legacy_gain_phase_comp: cfg.use_legacy_gain_phase_comp,
            bw_det_cfg: DpdBwDetCfg {
                bw_det_en: cfg.bw_det_cfg.bw_det_en,
                corr_lag_max: cfg.bw_det_cfg.corr_lag_max,
                lo_bw_beta2_thres: e6.to_float(cfg.bw_det_cfg.lo_bw_beta2_thres_e6),
                hi_bw_beta2_thres: e6.to_float(cfg.bw_det_cfg.hi_bw_beta2_thres_e6),
                alpha_track: e6.to_float(cfg.bw_det_cfg.alpha_track_e6),
            },
            c_threshold_db: cfg.c_threshold_db,
            threshold_overlap_db: cfg.threshold_overlap_db,
        }
    }
}

impl From<&DpdTrackCfg> for DpdTrackCfgInt {
    fn from(cfg: &DpdTrackCfg) -> Self {
        let e6 = FixedPoint::E6;

        DpdTrackCfgInt {
            adapt: cfg.adapt,
            run_clgc: cfg.run_clgc,
            filter_coef: cfg.filter_coef,
            update_mode: cfg.update_mode,
            m_threshold_db: cfg.m_threshold_db,
            force_direct: cfg.force_direct,
            indirect_reg_value: cfg.indirect_reg_value,
            direct_reg_value: cfg.direct_reg_value,
            mu: cfg.mu,
            low_power_action_model: cfg.low_power_action_model,
            lut_resolution: cfg.lut_resolution,
            number_of_multi_frames: cfg.number_of_multi_frames,
            ctc1_stats_sample_num: cfg.ctc1_stats_sample_num,
            ctc1_manual_enabled: cfg.ctc1_manual_enabled,
            ctc1_delta_percentage: cfg.ctc1_delta_percentage,
            ctc1_peak_rank_ratio: cfg.ctc1_peak_rank_ratio,
            ctc1_capture_weighting: cfg.ctc1_capture_weighting,
            wb_reg_enable: cfg.wb_reg_enable,
            wb_reg_mode: cfg.wb_reg_mode,
            wb_reg_alpha_e6: e6.from_float(cfg.wb_reg_alpha),
            wb_reg_beta_e6: e6.from_float(cfg.wb_reg_beta),
            est_size_of_coef_bias: cfg.est_size_of_coef_bias,
            use_legacy_gain_phase_comp: cfg.use_legacy_gain_phase_comp,
            bw_det_cfg: DpdBwDetCfgInt {
                bw_det_en: cfg.bw_det_cfg.bw_det_en,
                corr_lag_max: cfg.bw_det_cfg.corr_lag_max,
                lo_bw_beta2_thres_e6: e6.from_float(cfg.bw_det_cfg.lo_bw_beta2_thres),
                hi_bw_beta2_thres_e6: e6.from_float(cfg.bw_det_cfg.hi_bw_beta2_thres),
                alpha_track_e6: e6.from_float(cfg.bw_det_cfg.alpha_track),
            },
            c_threshold_db: cfg.c_threshold_db,
            threshold_overlap_db: cfg.threshold_overlap_db,
        }
    }
}

/// DPD capture configuration
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DpdCaptureCfg {
    /// Peak search window length in samples, 1 to 4096
    pub window_length: u32,
}

impl Validate for DpdCaptureCfg {
    fn validate(&self) -> validate::Result {
        validate::in_range(self.window_length, 1, 4096, "window_length")
    }
}

impl WireSize for DpdCaptureCfg {
    const WIRE_LEN: usize = 4;
}

impl TryWrite<Endian> for &DpdCaptureCfg {
    fn try_write(self, bytes: &mut [u8], endian: Endian) -> byte::Result<usize> {
        let offset = &mut 0;
        bytes.write_with(offset, self.window_length, endian)?;
        Ok(*offset)
    }
}

impl<'a> TryRead<'a, Endian> for DpdCaptureCfg {
    fn try_read(bytes: &'a [u8], endian: Endian) -> byte::Result<(Self, usize)> {
        let offset = &mut 0;
        let window_length = bytes.read_with(offset, endian)?;
        Ok((DpdCaptureCfg { window_length }, *offset))
    }
}

/// Check applied to one stability metric
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DpdStabilityBitCfg {
    /// Selects a less-than or greater-than comparison
    pub lt_gt: u16,
    /// Lower threshold
    pub threshold0: i16,
    /// Upper threshold
    pub threshold1: i16,
    /// Consecutive violations before the error becomes persistent
    pub persistent_cnt: u16,
}

/// Recovery action taken on a stability error word
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DpdStabilityActCfg {
    /// Metrics, one bit each, that raise this error word
    pub mask: u16,
    /// Action taken when the error word is raised
    pub action_word: u16,
}

/// DPD stability monitor configuration
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DpdStabilityCfg {
    /// Check of each metric
    pub bit: [DpdStabilityBitCfg; DPD_STABILITY_METRICS],
    /// Action of each error word
    pub error: [DpdStabilityActCfg; DPD_STABILITY_ERROR_WORDS],
}

// Every combination is accepted by the firmware.
impl Validate for DpdStabilityCfg {
    fn validate(&self) -> validate::Result {
        Ok(())
    }
}

impl WireSize for DpdStabilityCfg {
    const WIRE_LEN: usize = DPD_STABILITY_METRICS * 8 + DPD_STABILITY_ERROR_WORDS * 4;
}

impl TryWrite<Endian> for &DpdStabilityCfg {
    fn try_write(self, bytes: &mut [u8], endian: Endian) -> byte::Result<usize> {
        let offset = &mut 0;

        for bit in &self.bit {
            bytes.write_with(offset, bit.lt_gt, endian)?;
            bytes.write_with(offset, bit.threshold0, endian)?;
            bytes.write_with(offset, bit.threshold1, endian)?;
            bytes.write_with(offset, bit.persistent_cnt, endian)?;
        }
        for error in &self.error {
            bytes.write_with(offset, error.mask, endian)?;
            bytes.write_with(offset, error.action_word, endian)?;
        }

        Ok(*offset)
    }
}

impl<'a> TryRead<'a, Endian> for DpdStabilityCfg {
    fn try_read(bytes: &'a [u8], endian: Endian) -> byte::Result<(Self, usize)> {
        let offset = &mut 0;
        let mut cfg = DpdStabilityCfg::default();

        for bit in cfg.bit.iter_mut() {
            bit.lt_gt = bytes.read_with(offset, endian)?;
            bit.threshold0 = bytes.read_with(offset, endian)?;
            bit.threshold1 = bytes.read_with(offset, endian)?;
            bit.persistent_cnt = bytes.read_with(offset, endian)?;
        }
        for error in cfg.error.iter_mut() {
            error.mask = bytes.read_with(offset, endian)?;
            error.action_word = bytes.read_with(offset, endian)?;
        }

        Ok((cfg, *offset))
    }
}

/// DPD input/output power meter configuration
///
/// Limits are in hundredths of a dB.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DpdPowerMeterCfg {
    /// Enables the actuator gain monitor
    pub gain_monitor_en: u8,
    /// Power below which a measurement does not qualify
    pub qual_lim: i32,
    /// Lowest acceptable actuator gain
    pub min_gain_lim: i32,
    /// Highest acceptable actuator gain
    pub max_gain_lim: i32,
    /// Model selected on a gain under-range: 1, 2 or 4 (unity)
    pub model_table_for_min_gain_lim: u8,
    /// Model selected on a gain over-range: 1, 2 or 4 (unity)
    pub model_table_for_max_gain_lim: u8,
    /// At most 24
    pub pwr_meas_duration: u8,
    /// Delay after Tx on before measuring
    pub pwr_meas_cont_dly_cntr: u16,
    /// Enables Tx power measurement
    pub pwr_meas_en: u8,
    /// Pauses Tx power measurement
    pub pwr_meas_pause: u8,
    /// Measures in TDD mode
    pub pwr_meas_tdd_mode_en: u8,
}

impl Default for DpdPowerMeterCfg {
    fn default() -> Self {
        DpdPowerMeterCfg {
            gain_monitor_en: 0,
            qual_lim: 0,
            min_gain_lim: 0,
            max_gain_lim: 0,
            model_table_for_min_gain_lim: 4,
            model_table_for_max_gain_lim: 4,
            pwr_meas_duration: 0,
            pwr_meas_cont_dly_cntr: 0,
            pwr_meas_en: 0,
            pwr_meas_pause: 0,
            pwr_meas_tdd_mode_en: 0,
        }
    }
}

impl Validate for DpdPowerMeterCfg {
    fn validate(&self) -> validate::Result {
        validate::one_of(
            self.model_table_for_min_gain_lim,
            &MODEL_TABLES,
            "model_table_for_min_gain_lim",
        )?;
        validate::one_of(
            self.model_table_for_max_gain_lim,
            &MODEL_TABLES,
            "model_table_for_max_gain_lim",
        )?;
        validate::at_most(self.pwr_meas_duration, 24, "pwr_meas_duration")?;
        validate::flag(self.pwr_meas_en, "pwr_meas_en")
    }
}

impl WireSize for DpdPowerMeterCfg {
    const WIRE_LEN: usize = 21;
}

impl TryWrite<Endian> for &DpdPowerMeterCfg {
    fn try_write(self, bytes: &mut [u8], endian: Endian) -> byte::Result<usize> {
        let offset = &mut 0;

        bytes.write_with(offset, self.gain_monitor_en, endian)?;
        bytes.write_with(offset, self.qual_lim, endian)?;
        bytes.write_with(offset, self.min_gain_lim, endian)?;
        bytes.write_with(offset, self.max_gain_lim, endian)?;
        bytes.write_with(offset, self.model_table_for_min_gain_lim, endian)?;
        bytes.write_with(offset, self.model_table_for_max_gain_lim, endian)?;
        bytes.write_with(offset, self.pwr_meas_duration, endian)?;
        bytes.write_with(offset, self.pwr_meas_cont_dly_cntr, endian)?;
        bytes.write_with(offset, self.pwr_meas_en, endian)?;
        bytes.write_with(offset, self.pwr_meas_pause, endian)?;
        bytes.write_with(offset, self.pwr_meas_tdd_mode_en, endian)?;

        Ok(*offset)
    }
}

impl<'a> TryRead<'a, Endian> for DpdPowerMeterCfg {
    fn try_read(bytes: &'a [u8], endian: Endian) -> byte::Result<(Self, usize)> {
        let offset = &mut 0;

        let cfg = DpdPowerMeterCfg {
            gain_monitor_en: bytes.read_with(offset, endian)?,
            qual_lim: bytes.read_with(offset, endian)?,
            min_gain_lim: bytes.read_with(offset, endian)?,
            max_gain_lim: bytes.read_with(offset, endian)?,
            model_table_for_min_gain_lim: bytes.read_with(offset, endian)?,
            model_table_for_max_gain_lim: bytes.read_with(offset, endian)?,
            pwr_meas_duration: bytes.read_with(offset, endian)?,
            pwr_meas_cont_dly_cntr: bytes.read_with(offset, endian)?,
            pwr_meas_en: bytes.read_with(offset, endian)?,
            pwr_meas_pause: bytes.read_with(offset, endian)?,
            pwr_meas_tdd_mode_en: bytes.read_with(offset, endian)?,
        };

        Ok((cfg, *offset))
    }
}

/// DPD and CTC model slots
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DpdModelType {
    /// DPD model 0
    Dpd0 = 0,
    /// DPD model 1
    Dpd1 = 1,
    /// DPD model 2
    Dpd2 = 2,
    /// DPD model 3
    Dpd3 = 3,
    /// CTC model 0
    Ctc0 = 4,
    /// CTC model 1
    Ctc1 = 5,
    /// CTC model 2
    Ctc2 = 6,
    /// CTC model 3
    Ctc3 = 7,
    /// CTC model 4
    Ctc4 = 8,
}

impl DpdModelType {
    /// True for the CTC model slots
    pub const fn is_ctc(self) -> bool {
        self as u8 >= DpdModelType::Ctc0 as u8
    }
}

/// Complex model coefficient
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DpdCoefficient {
    /// Real part
    pub real: f64,
    /// Imaginary part
    pub imag: f64,
}

impl DpdCoefficient {
    fn write(&self, bytes: &mut [u8], offset: &mut usize) -> byte::Result<()> {
        codec::write_f64(bytes, offset, self.real)?;
        codec::write_f64(bytes, offset, self.imag)
    }

    fn read(bytes: &[u8], offset: &mut usize) -> byte::Result<Self> {
        Ok(DpdCoefficient {
            real: codec::read_f64(bytes, offset)?,
            imag: codec::read_f64(bytes, offset)?,
        })
    }
}

/// Which part of the actuator a model drives
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DpdPartial {
    /// 0 for DPD, 1 for CTC1
    pub partial: u8,
    /// Unused by the firmware
    pub update_order: u8,
    /// GMP power model the model is loaded into
    pub model_index: u8,
}

impl DpdPartial {
    const WIRE_LEN: usize = 3;

    fn write(&self, bytes: &mut [u8], offset: &mut usize) -> byte::Result<()> {
        bytes.write_with(offset, self.partial, codec::WIRE)?;
        bytes.write_with(offset, self.update_order, codec::WIRE)?;
        bytes.write_with(offset, self.model_index, codec::WIRE)
    }

    fn read(bytes: &[u8], offset: &mut usize) -> byte::Result<Self> {
        Ok(DpdPartial {
            partial: bytes.read_with(offset, codec::WIRE)?,
            update_order: bytes.read_with(offset, codec::WIRE)?,
            model_index: bytes.read_with(offset, codec::WIRE)?,
        })
    }
}

/// One GMP or DDR feature of a DPD model
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DpdFeature {
    /// Amplitude term
    pub i: i8,
    /// Signal term
    pub j: i8,
    /// Power term
    pub k: u8,
    /// Polynomial: 0 or 1 for GMP, 7 to 9 for DDR
    pub poly: u16,
    /// Coefficient
    pub a: DpdCoefficient,
}

impl DpdFeature {
    const WIRE_LEN: usize = 21;
}

// A model slot byte followed by a full descriptor fits a control command
const _: () = assert!(
    1 + 2 + DpdPartial::WIRE_LEN + 5 + DPD_MODEL_MAX_FEATURES * DpdFeature::WIRE_LEN
        <= MAX_CTRL_DATA_SIZE
);
const _: () = assert!(
    1 + 1 + DpdPartial::WIRE_LEN + 8 + CTC_MODEL_MAX_FEATURES * CtcFeature::WIRE_LEN
        <= MAX_CTRL_DATA_SIZE
);

/// DPD model descriptor
///
/// Only the first `features` rows of `feature` are exchanged with the
/// firmware.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DpdModelCfg {
    /// Number of rows in use, 1 to [`DPD_MODEL_MAX_FEATURES`]
    pub features: u16,
    /// Actuator part driven by the model
    pub partial: DpdPartial,
    /// GMP and DDR mode, at most 7
    pub mode: u8,
    /// LUT depth: 0 for 64 entries, 1 for 32, 2 for 16
    pub act_depth: u8,
    /// Off-diagonal term in the high nibble, linear term sample offset in the
    /// low one
    pub linear_term: u8,
    /// GMP1 LUT i delay in the high nibble, GMP0 first LUT i in the low one
    pub lut_i_delay: u8,
    /// GMP1 LUT j delay in the high nibble, GMP0 first LUT j in the low one
    pub lut_j_delay: u8,
    /// Feature rows
    pub feature: [DpdFeature; DPD_MODEL_MAX_FEATURES],
}

impl DpdModelCfg {
    /// Rows in use
    pub fn rows(&self) -> &[DpdFeature] {
        &self.feature[..(self.features as usize).min(DPD_MODEL_MAX_FEATURES)]
    }
}

impl Validate for DpdModelCfg {
    fn validate(&self) -> validate::Result {
        validate::in_range(self.features as usize, 1, DPD_MODEL_MAX_FEATURES, "features")?;
        validate::flag(self.partial.partial, "partial")?;
        validate::at_most(self.mode, 7, "mode")?;
        validate::at_most(self.act_depth, 2, "act_depth")?;
        self.rows()
            .iter()
            .try_for_each(|row| validate::one_of(row.poly, &FEATURE_POLYS, "poly"))
    }
}

impl TryWrite<Endian> for &DpdModelCfg {
    fn try_write(self, bytes: &mut [u8], endian: Endian) -> byte::Result<usize> {
        let offset = &mut 0;

        bytes.write_with(offset, self.features, endian)?;
        self.partial.write(bytes, offset)?;
        bytes.write_with(offset, self.mode, endian)?;
        bytes.write_with(offset, self.act_depth, endian)?;
        bytes.write_with(offset, self.linear_term, endian)?;
        bytes.write_with(offset, self.lut_i_delay, endian)?;
        bytes.write_with(offset, self.lut_j_delay, endian)?;
        for row in self.rows() {
            bytes.write_with(offset, row.i, endian)?;
            bytes.write_with(offset, row.j, endian)?;
            bytes.write_with(offset, row.k, endian)?;
            bytes.write_with(offset, row.poly, endian)?;
            row.a.write(bytes, offset)?;
        }

        Ok(*offset)
    }
}

impl<'a> TryRead<'a, Endian> for DpdModelCfg {
    fn try_read(bytes: &'a [u8], endian: Endian) -> byte::Result<(Self, usize)> {
        let offset = &mut 0;
        let mut cfg = DpdModelCfg {
            features: bytes.read_with(offset, endian)?,
            ..Default::default()
        };
        if cfg.features == 0 || cfg.features as usize > DPD_MODEL_MAX_FEATURES {
            return Err(byte::Error::BadInput {
                err: "DPD model feature count",
            });
        }

        cfg.partial = DpdPartial::read(bytes, offset)?;
        cfg.mode = bytes.read_with(offset, endian)?;
        cfg.act_depth = bytes.read_with(offset, endian)?;
        cfg.linear_term = bytes.read_with(offset, endian)?;
        cfg.lut_i_delay = bytes.read_with(offset, endian)?;
        cfg.lut_j_delay = bytes.read_with(offset, endian)?;
        for row in cfg.feature[..cfg.features as usize].iter_mut() {
            row.i = bytes.read_with(offset, endian)?;
            row.j = bytes.read_with(offset, endian)?;
            row.k = bytes.read_with(offset, endian)?;
            row.poly = bytes.read_with(offset, endian)?;
            row.a = DpdCoefficient::read(bytes, offset)?;
        }

        Ok((cfg, *offset))
    }
}

/// One time constant of a CTC model
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CtcFeature {
    /// CIC decimation ratio
    pub r: u8,
    /// Laguerre filter coefficient c
    pub c: i16,
    /// Laguerre filter coefficient d
    pub d: i16,
    /// Power row of |x|
    pub k: u8,
    /// IIR column
    pub m: u8,
    /// Polynomial term of the IIR column output
    pub j: u8,
    /// Coefficient
    pub a: DpdCoefficient,
}

impl CtcFeature {
    const WIRE_LEN: usize = 24;
}

/// CTC model descriptor
///
/// Only the first `features` rows of `feature` are exchanged with the
/// firmware.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CtcModelCfg {
    /// Number of rows in use, 1 to [`CTC_MODEL_MAX_FEATURES`]
    pub features: u8,
    /// Actuator part driven by the model
    pub partial: DpdPartial,
    /// k LUT address scale
    pub k_lut_addr_scale: f32,
    /// f LUT address scale
    pub f_lut_addr_scale: f32,
    /// Feature rows
    pub feature: [CtcFeature; CTC_MODEL_MAX_FEATURES],
}

impl CtcModelCfg {
    /// Rows in use
    pub fn rows(&self) -> &[CtcFeature] {
        &self.feature[..(self.features as usize).min(CTC_MODEL_MAX_FEATURES)]
    }
}

impl Validate for CtcModelCfg {
    fn validate(&self) -> validate::Result {
        validate::in_range(self.features as usize, 1, CTC_MODEL_MAX_FEATURES, "features")?;
        validate::flag(self.partial.partial, "partial")
    }
}

impl TryWrite<Endian> for &CtcModelCfg {
    fn try_write(self, bytes: &mut [u8], endian: Endian) -> byte::Result<usize> {
        let offset = &mut 0;

        bytes.write_with(offset, self.features, endian)?;
        self.partial.write(bytes, offset)?;
        codec::write_f32(bytes, offset, self.k_lut_addr_scale)?;
        codec::write_f32(bytes, offset, self.f_lut_addr_scale)?;
        for row in self.rows() {
            bytes.write_with(offset, row.r, endian)?;
            bytes.write_with(offset, row.c, endian)?;
            bytes.write_with(offset, row.d, endian)?;
            bytes.write_with(offset, row.k, endian)?;
            bytes.write_with(offset, row.m, endian)?;
            bytes.write_with(offset, row.j, endian)?;
            row.a.write(bytes, offset)?;
        }

        Ok(*offset)
    }
}

impl<'a> TryRead<'a, Endian> for CtcModelCfg {
    fn try_read(bytes: &'a [u8], endian: Endian) -> byte::Result<(Self, usize)> {
        let offset = &mut 0;
        let mut cfg = CtcModelCfg {
            features: bytes.read_with(offset, endian)?,
            ..Default::default()
        };
        if cfg.features == 0 || cfg.features as usize > CTC_MODEL_MAX_FEATURES {
            return Err(byte::Error::BadInput {
                err: "CTC model feature count",
            });
        }

        cfg.partial = DpdPartial::read(bytes, offset)?;
        cfg.k_lut_addr_scale = codec::read_f32(bytes, offset)?;
        cfg.f_lut_addr_scale = codec::read_f32(bytes, offset)?;
        for row in cfg.feature[..cfg.features as usize].iter_mut() {
            row.r = bytes.read_with(offset, endian)?;
            row.c = bytes.read_with(offset, endian)?;
            row.d = bytes.read_with(offset, endian)?;
            row.k = bytes.read_with(offset, endian)?;
            row.m = bytes.read_with(offset, endian)?;
            row.j = bytes.read_with(offset, endian)?;
            row.a = DpdCoefficient::read(bytes, offset)?;
        }

        Ok((cfg, *offset))
    }
}

/// Actuator gain monitor part of [`DpdPowerMeterCfg`]
///
/// Limits are in hundredths of a dB.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DpdGainMonitorCfg {
    /// Enables the gain monitor
    pub gain_monitor_en: u8,
    /// Power below which a measurement does not qualify
    pub qual_lim: i32,
    /// Lowest acceptable actuator gain
    pub min_gain_lim: i32,
    /// Highest acceptable actuator gain
    pub max_gain_lim: i32,
    /// Model selected on a gain under-range: 1, 2 or 4 (unity)
    pub model_table_for_min_gain_lim: u8,
    /// Model selected on a gain over-range: 1, 2 or 4 (unity)
    pub model_table_for_max_gain_lim: u8,
}

impl Validate for DpdGainMonitorCfg {
    fn validate(&self) -> validate::Result {
        validate::flag(self.gain_monitor_en, "gain_monitor_en")?;
        validate::one_of(
            self.model_table_for_min_gain_lim,
            &MODEL_TABLES,
            "model_table_for_min_gain_lim",
        )?;
        validate::one_of(
            self.model_table_for_max_gain_lim,
            &MODEL_TABLES,
            "model_table_for_max_gain_lim",
        )
    }
}

impl From<&DpdPowerMeterCfg> for DpdGainMonitorCfg {
    fn from(cfg: &DpdPowerMeterCfg) -> Self {
        DpdGainMonitorCfg {
            gain_monitor_en: cfg.gain_monitor_en,
            qual_lim: cfg.qual_lim,
            min_gain_lim: cfg.min_gain_lim,
            max_gain_lim: cfg.max_gain_lim,
            model_table_for_min_gain_lim: cfg.model_table_for_min_gain_lim,
            model_table_for_max_gain_lim: cfg.model_table_for_max_gain_lim,
        }
    }
}

impl DpdPowerMeterCfg {
    /// Replaces the gain monitor fields with those of `monitor`
    pub fn with_gain_monitor(self, monitor: &DpdGainMonitorCfg) -> Self {
        DpdPowerMeterCfg {
            gain_monitor_en: monitor.gain_monitor_en,
            qual_lim: monitor.qual_lim,
            min_gain_lim: monitor.min_gain_lim,
            max_gain_lim: monitor.max_gain_lim,
            model_table_for_min_gain_lim: monitor.model_table_for_min_gain_lim,
            model_table_for_max_gain_lim: monitor.model_table_for_max_gain_lim,
            ..self
        }
    }
}

/// What a DPD reset clears
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DpdResetMode {
    /// Resets the DPD hardware and the firmware state
    Full = 1,
}

impl<BUS, DELAY> Adrv904x<BUS, DELAY>
where
    BUS: RegisterBus,
    DELAY: spi_type::delay::DelayNs,
{
    /// Writes the DPD tracking configuration of every channel of `tx_mask`
    ///
    /// The configuration is validated before anything is sent. Channels are
    /// written in ascending order and a failure leaves the channels before
    /// it updated.
    #[maybe_async_attr]
    pub async fn dpd_tracking_config_set(
        &mut self,
        tx_mask: ChannelMask,
        cfg: &DpdTrackCfg,
    ) -> Result<(), Error<BUS>> {
        self.cal_config_set(ObjectId::TC_TX_DPD, opcode::TRACK_CONFIG, tx_mask, cfg)
            .await
    }

    /// Reads the DPD tracking configuration of a single Tx channel
    #[maybe_async_attr]
    pub async fn dpd_tracking_config_get(
        &mut self,
        tx_channel: ChannelMask,
    ) -> Result<DpdTrackCfg, Error<BUS>> {
        self.cal_config_get(ObjectId::TC_TX_DPD, opcode::TRACK_CONFIG, tx_channel)
            .await
    }

    /// [`dpd_tracking_config_set`](Self::dpd_tracking_config_set) taking
    /// scaled integers
    #[maybe_async_attr]
    pub async fn dpd_tracking_config_set_int(
        &mut self,
        tx_mask: ChannelMask,
        cfg: &DpdTrackCfgInt,
    ) -> Result<(), Error<BUS>> {
        self.dpd_tracking_config_set(tx_mask, &DpdTrackCfg::from(cfg))
            .await
    }

    /// [`dpd_tracking_config_get`](Self::dpd_tracking_config_get) returning
    /// scaled integers
    #[maybe_async_attr]
    pub async fn dpd_tracking_config_get_int(
        &mut self,
        tx_channel: ChannelMask,
    ) -> Result<DpdTrackCfgInt, Error<BUS>> {
        let cfg = self.dpd_tracking_config_get(tx_channel).await?;
        Ok(DpdTrackCfgInt::from(&cfg))
    }

    /// Writes the DPD capture configuration of every channel of `tx_mask`
    #[maybe_async_attr]
    pub async fn dpd_capture_config_set(
        &mut self,
        tx_mask: ChannelMask,
        cfg: &DpdCaptureCfg,
    ) -> Result<(), Error<BUS>> {
        self.cal_config_set(ObjectId::TC_TX_DPD, opcode::CAPTURE_CONFIG, tx_mask, cfg)
            .await
    }

    /// Reads the DPD capture configuration of a single Tx channel
    #[maybe_async_attr]
    pub async fn dpd_capture_config_get(
        &mut self,
        tx_channel: ChannelMask,
    ) -> Result<DpdCaptureCfg, Error<BUS>> {
        self.cal_config_get(ObjectId::TC_TX_DPD, opcode::CAPTURE_CONFIG, tx_channel)
            .await
    }

    /// Writes the stability monitor configuration of every channel of
    /// `tx_mask`
    #[maybe_async_attr]
    pub async fn dpd_stability_config_set(
        &mut self,
        tx_mask: ChannelMask,
        cfg: &DpdStabilityCfg,
    ) -> Result<(), Error<BUS>> {
        self.cal_config_set(ObjectId::TC_TX_DPD, opcode::STABILITY_CONFIG, tx_mask, cfg)
            .await
    }

    /// Reads the stability monitor configuration of a single Tx channel
    #[maybe_async_attr]
    pub async fn dpd_stability_config_get(
        &mut self,
        tx_channel: ChannelMask,
    ) -> Result<DpdStabilityCfg, Error<BUS>> {
        self.cal_config_get(ObjectId::TC_TX_DPD, opcode::STABILITY_CONFIG, tx_channel)
            .await
    }

    /// Writes the power meter configuration of every channel of `tx_mask`
    #[maybe_async_attr]
    pub async fn dpd_power_meter_config_set(
        &mut self,
        tx_mask: ChannelMask,
        cfg: &DpdPowerMeterCfg,
    ) -> Result<(), Error<BUS>> {
        self.cal_config_set(ObjectId::TC_TX_DPD, opcode::POWER_METER_CONFIG, tx_mask, cfg)
            .await
    }

    /// Reads the power meter configuration of a single Tx channel
    #[maybe_async_attr]
    pub async fn dpd_power_meter_config_get(
        &mut self,
        tx_channel: ChannelMask,
    ) -> Result<DpdPowerMeterCfg, Error<BUS>> {
        self.cal_config_get(ObjectId::TC_TX_DPD, opcode::POWER_METER_CONFIG, tx_channel)
            .await
    }

    /// Loads a DPD model into the `model` slot of every channel of `tx_mask`
    ///
    /// `model` must be one of the DPD slots.
    #[maybe_async_attr]
    pub async fn dpd_model_config_set(
        &mut self,
        tx_mask: ChannelMask,
        model: DpdModelType,
        cfg: &DpdModelCfg,
    ) -> Result<(), Error<BUS>> {
        if model.is_ctc() {
            return Err(Error::InvalidParameter("model_type"));
        }
        debug!("DPD model {:?}: {} features on {:?}", model, cfg.features, tx_mask);

        self.cal_keyed_config_set(
            ObjectId::TC_TX_DPD,
            opcode::MODEL_CONFIG,
            tx_mask,
            model as u8,
            cfg,
        )
        .await
    }

    /// Reads the DPD model in the `model` slot of a single Tx channel
    #[maybe_async_attr]
    pub async fn dpd_model_config_get(
        &mut self,
        tx_channel: ChannelMask,
        model: DpdModelType,
    ) -> Result<DpdModelCfg, Error<BUS>> {
        if model.is_ctc() {
            return Err(Error::InvalidParameter("model_type"));
        }

        self.cal_keyed_config_get(ObjectId::TC_TX_DPD, opcode::MODEL_CONFIG, tx_channel, model as u8)
            .await
    }

    /// Loads a CTC model into the `model` slot of every channel of `tx_mask`
    ///
    /// `model` must be one of the CTC slots.
    #[maybe_async_attr]
    pub async fn ctc_model_config_set(
        &mut self,
        tx_mask: ChannelMask,
        model: DpdModelType,
        cfg: &CtcModelCfg,
    ) -> Result<(), Error<BUS>> {
        if !model.is_ctc() {
            return Err(Error::InvalidParameter("model_type"));
        }
        debug!("CTC model {:?}: {} features on {:?}", model, cfg.features, tx_mask);

        self.cal_keyed_config_set(
            ObjectId::TC_TX_DPD,
            opcode::MODEL_CONFIG,
            tx_mask,
            model as u8,
            cfg,
        )
        .await
    }

    /// Reads the CTC model in the `model` slot of a single Tx channel
    #[maybe_async_attr]
    pub async fn ctc_model_config_get(
        &mut self,
        tx_channel: ChannelMask,
        model: DpdModelType,
    ) -> Result<CtcModelCfg, Error<BUS>> {
        if !model.is_ctc() {
            return Err(Error::InvalidParameter("model_type"));
        }

        self.cal_keyed_config_get(ObjectId::TC_TX_DPD, opcode::MODEL_CONFIG, tx_channel, model as u8)
            .await
    }

    /// Updates the actuator gain monitor of every channel of `tx_mask`
    ///
    /// The monitor is part of the power meter setting. The rest of each
    /// channel's power meter configuration is read back and written
    /// unchanged.
    #[maybe_async_attr]
    pub async fn dpd_actuator_gain_monitor_config_set(
        &mut self,
        tx_mask: ChannelMask,
        cfg: &DpdGainMonitorCfg,
    ) -> Result<(), Error<BUS>> {
        tx_class(&tx_mask)?;
        tx_mask.validate()?;
        cfg.validate()?;

        for channel in tx_mask.channels() {
            let power_meter = self.dpd_power_meter_config_get(channel).await?;
            self.dpd_power_meter_config_set(channel, &power_meter.with_gain_monitor(cfg))
                .await?;
        }

        Ok(())
    }

    /// Reads the actuator gain monitor settings of a single Tx channel
    #[maybe_async_attr]
    pub async fn dpd_actuator_gain_monitor_config_get(
        &mut self,
        tx_channel: ChannelMask,
    ) -> Result<DpdGainMonitorCfg, Error<BUS>> {
        let power_meter = self.dpd_power_meter_config_get(tx_channel).await?;
        Ok(DpdGainMonitorCfg::from(&power_meter))
    }

    /// Lends the DPD capture buffers out, or hands them back, on every
    /// channel of `tx_mask`
    #[maybe_async_attr]
    pub async fn dpd_capture_buffers_access_set(
        &mut self,
        tx_mask: ChannelMask,
        cfg: &CapBufAccessCfg,
    ) -> Result<(), Error<BUS>> {
        self.cal_config_set(ObjectId::TC_TX_DPD, opcode::CAPTURE_BUF_ACCESS, tx_mask, cfg)
            .await
    }

    /// Reads the DPD capture buffers lent out on a single Tx channel
    #[maybe_async_attr]
    pub async fn dpd_capture_buffers_access_get(
        &mut self,
        tx_channel: ChannelMask,
    ) -> Result<CapBufInfo, Error<BUS>> {
        self.cal_config_get(ObjectId::TC_TX_DPD, opcode::CAPTURE_BUF_ACCESS, tx_channel)
            .await
    }

    /// Resets DPD on every channel of `tx_mask`
    #[maybe_async_attr]
    pub async fn dpd_reset(
        &mut self,
        tx_mask: ChannelMask,
        mode: DpdResetMode,
    ) -> Result<(), Error<BUS>> {
        let op = match mode {
            DpdResetMode::Full => opcode::RESET,
        };
        debug!("DPD reset {:?} on {:?}", mode, tx_mask);

        self.cal_command(ObjectId::TC_TX_DPD, op, tx_mask).await
    }
}
