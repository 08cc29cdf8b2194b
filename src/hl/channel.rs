use super::validate::{self, InvalidParameter};

/// Offset of the ORx bits in a packed channel mask
const PACKED_ORX_SHIFT: u32 = 8;
/// Offset of the Tx bits in a packed channel mask
const PACKED_TX_SHIFT: u32 = 10;

/// Kind of channel a mask refers to
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChannelClass {
    /// Receive channels 0 to 7
    Rx,
    /// Observation receive channels 0 and 1
    Orx,
    /// Transmit channels 0 to 7
    Tx,
    /// SERDES lanes 0 to 7
    SerdesLane,
}

impl ChannelClass {
    /// Bits that are valid in a mask of this class
    pub const fn valid_mask(self) -> u32 {
        match self {
            ChannelClass::Orx => 0x03,
            ChannelClass::Rx | ChannelClass::Tx | ChannelClass::SerdesLane => 0xff,
        }
    }

    const fn name(self) -> &'static str {
        match self {
            ChannelClass::Rx => "rx_channel_mask",
            ChannelClass::Orx => "orx_channel_mask",
            ChannelClass::Tx => "tx_channel_mask",
            ChannelClass::SerdesLane => "serdes_lane_mask",
        }
    }
}

/// A set of channels of one class
///
/// Bit `n` selects channel `n` of the class. Constructors do not validate,
/// use [`ChannelMask::validate`] or [`ChannelMask::single`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelMask {
    class: ChannelClass,
    bits: u32,
}

impl ChannelMask {
    /// A mask of Rx channels
    pub const fn rx(bits: u32) -> Self {
        ChannelMask {
            class: ChannelClass::Rx,
            bits,
        }
    }

    /// A mask of ORx channels
    pub const fn orx(bits: u32) -> Self {
        ChannelMask {
            class: ChannelClass::Orx,
            bits,
        }
    }

    /// A mask of Tx channels
    pub const fn tx(bits: u32) -> Self {
        ChannelMask {
            class: ChannelClass::Tx,
            bits,
        }
    }

    /// A mask of SERDES lanes
    pub const fn serdes_lane(bits: u32) -> Self {
        ChannelMask {
            class: ChannelClass::SerdesLane,
            bits,
        }
    }

    /// Channel class of this mask
    pub const fn class(&self) -> ChannelClass {
        self.class
    }

    /// Raw bits, relative to the class
    pub const fn bits(&self) -> u32 {
        self.bits
    }

    /// Checks that the mask is not empty and only selects channels that
    /// exist in its class
    pub fn validate(&self) -> validate::Result {
        validate::mask_within(self.bits, self.class.valid_mask(), self.class.name())
    }

    /// Returns the index of the only selected channel
    ///
    /// Fails unless exactly one valid channel is selected.
    pub fn single(&self) -> Result<u8, InvalidParameter> {
        validate::single_bit(self.bits, self.class.valid_mask(), self.class.name())?;

        Ok(self.bits.trailing_zeros() as u8)
    }

    /// Iterates over every selected channel as a single-channel mask
    pub fn channels(&self) -> impl Iterator<Item = ChannelMask> {
        let class = self.class;
        let bits = self.bits & class.valid_mask();

        (0u32..32)
            .filter(move |i| bits & (1 << *i) != 0)
            .map(move |i| ChannelMask {
                class,
                bits: 1 << i,
            })
    }

    /// Packs the mask into the combined 18-bit layout used by the firmware:
    /// Rx in bits 0 to 7, ORx in bits 8 and 9, Tx in bits 10 to 17
    ///
    /// SERDES lanes have no place in that layout and are returned unshifted.
    pub const fn packed(&self) -> u32 {
        let bits = self.bits & self.class.valid_mask();

        match self.class {
            ChannelClass::Rx | ChannelClass::SerdesLane => bits,
            ChannelClass::Orx => bits << PACKED_ORX_SHIFT,
            ChannelClass::Tx => bits << PACKED_TX_SHIFT,
        }
    }

    /// Splits a combined 18-bit mask into its Rx, ORx and Tx parts
    pub fn unpack(packed: u32) -> Result<[ChannelMask; 3], InvalidParameter> {
        if packed >> (PACKED_TX_SHIFT + 8) != 0 {
            return Err(InvalidParameter("channel_mask"));
        }

        Ok([
            ChannelMask::rx(packed & 0xff),
            ChannelMask::orx((packed >> PACKED_ORX_SHIFT) & 0x03),
            ChannelMask::tx((packed >> PACKED_TX_SHIFT) & 0xff),
        ])
    }
}
