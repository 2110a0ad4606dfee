//! Bands and channels.

/// Radio band, encoded as the firmware expects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Band {
    /// 2.4 GHz (`0`).
    Ghz2_4,
    /// 5 GHz (`1`).
    Ghz5,
}

impl Band {
    /// Decode the firmware band number.
    #[must_use]
    pub const fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Ghz2_4),
            1 => Some(Self::Ghz5),
            _ => None,
        }
    }

    /// Firmware band number.
    #[must_use]
    pub const fn raw(&self) -> u8 {
        match self {
            Self::Ghz2_4 => 0,
            Self::Ghz5 => 1,
        }
    }

    /// Whether `channel` may be tuned on this band.
    #[must_use]
    pub const fn valid_channel(&self, channel: u8) -> bool {
        match self {
            Self::Ghz2_4 => channel >= 1 && channel <= 14,
            Self::Ghz5 => channel >= 8 && channel <= 165,
        }
    }
}

/// Channel used for 2.4 GHz TX-BIP calibration.
pub const CALIBRATION_CHANNEL_2_4: u8 = 7;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_ranges() {
        assert!(Band::Ghz2_4.valid_channel(1));
        assert!(Band::Ghz2_4.valid_channel(14));
        assert!(!Band::Ghz2_4.valid_channel(0));
        assert!(!Band::Ghz2_4.valid_channel(36));
        assert!(Band::Ghz5.valid_channel(36));
        assert!(!Band::Ghz5.valid_channel(200));
    }

    #[test]
    fn raw_encoding() {
        assert_eq!(Band::from_raw(0), Some(Band::Ghz2_4));
        assert_eq!(Band::from_raw(1), Some(Band::Ghz5));
        assert_eq!(Band::from_raw(2), None);
        assert_eq!(Band::Ghz5.raw(), 1);
    }
}
