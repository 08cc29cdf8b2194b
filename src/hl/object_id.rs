/// Firmware object identifier
///
/// Every calibration and system component of the firmware is addressed by an
/// 8-bit ID. The namespace is split in ranges: init calibrations, tracking
/// calibrations and system objects. The range decides which status path a
/// caller may query.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ObjectId(pub u8);

/// Range an object ID belongs to
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ObjectKind {
    /// Init calibration, `IC_START..=IC_END`
    InitCal,
    /// Tracking calibration, `TC_START..=TC_END`
    TrackingCal,
    /// System or configuration object, `SYSTEM_START..=SYSTEM_END`
    System,
    /// Unassigned
    Reserved,
}

impl ObjectId {
    /// First init calibration
    pub const IC_START: ObjectId = ObjectId(0x00);
    /// RC tuner
    pub const IC_RC_TUNER: ObjectId = ObjectId(0x00);
    /// Rx ADC
    pub const IC_RX_ADC: ObjectId = ObjectId(0x01);
    /// ORx ADC
    pub const IC_ORX_ADC: ObjectId = ObjectId(0x02);
    /// Tx loopback ADC
    pub const IC_TX_LB_ADC: ObjectId = ObjectId(0x03);
    /// Tx DAC
    pub const IC_TX_DAC: ObjectId = ObjectId(0x04);
    /// Tx baseband filter
    pub const IC_TX_BBF: ObjectId = ObjectId(0x05);
    /// Tx LO leakage
    pub const IC_TX_LOL: ObjectId = ObjectId(0x06);
    /// Tx quadrature error correction
    pub const IC_TX_QEC: ObjectId = ObjectId(0x07);
    /// Rx quadrature error correction
    pub const IC_RX_QEC: ObjectId = ObjectId(0x08);
    /// SERDES receiver
    pub const IC_SERDES: ObjectId = ObjectId(0x0C);
    /// Last init calibration
    pub const IC_END: ObjectId = ObjectId(0x2F);

    /// First tracking calibration
    pub const TC_START: ObjectId = ObjectId(0x30);
    /// Tx LO leakage tracking
    pub const TC_TX_LOL: ObjectId = ObjectId(0x30);
    /// Tx QEC tracking
    pub const TC_TX_QEC: ObjectId = ObjectId(0x31);
    /// SERDES tracking
    pub const TC_SERDES: ObjectId = ObjectId(0x32);
    /// Rx ADC tracking
    pub const TC_RX_ADC: ObjectId = ObjectId(0x33);
    /// Tx loopback ADC tracking
    pub const TC_TX_LB_ADC: ObjectId = ObjectId(0x34);
    /// ORx ADC tracking
    pub const TC_ORX_ADC: ObjectId = ObjectId(0x35);
    /// Digital predistortion, also carries the CLGC controls
    pub const TC_TX_DPD: ObjectId = ObjectId(0x36);
    /// Last tracking calibration
    pub const TC_END: ObjectId = ObjectId(0x4F);

    /// First system object
    pub const SYSTEM_START: ObjectId = ObjectId(0x80);
    /// Firmware configuration
    pub const SYSTEM_CONFIG: ObjectId = ObjectId(0x80);
    /// Last system object
    pub const SYSTEM_END: ObjectId = ObjectId(0xFF);

    /// Returns the range this ID belongs to
    pub const fn kind(self) -> ObjectKind {
        match self.0 {
            0x00..=0x2F => ObjectKind::InitCal,
            0x30..=0x4F => ObjectKind::TrackingCal,
            0x80..=0xFF => ObjectKind::System,
            _ => ObjectKind::Reserved,
        }
    }

    /// True for init calibrations
    pub const fn is_init_cal(self) -> bool {
        matches!(self.kind(), ObjectKind::InitCal)
    }

    /// True for tracking calibrations
    pub const fn is_tracking_cal(self) -> bool {
        matches!(self.kind(), ObjectKind::TrackingCal)
    }
}

impl From<ObjectId> for u32 {
    fn from(id: ObjectId) -> u32 {
        id.0 as u32
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_ranges() {
        assert_eq!(ObjectId::IC_END.kind(), ObjectKind::InitCal);
        assert_eq!(ObjectId::TC_START.kind(), ObjectKind::TrackingCal);
        assert_eq!(ObjectId::TC_TX_DPD.kind(), ObjectKind::TrackingCal);
        assert_eq!(ObjectId(0x50).kind(), ObjectKind::Reserved);
        assert_eq!(ObjectId::SYSTEM_END.kind(), ObjectKind::System);
        assert!(ObjectId::IC_SERDES.is_init_cal());
        assert!(!ObjectId::IC_SERDES.is_tracking_cal());
    }
}
