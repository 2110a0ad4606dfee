//! Chip variants.
//!
//! The wl127x and wl128x share the wl12xx testmode interface but carry
//! differently sized NVS files. The wl18xx has no NVS file at all; its radio
//! configuration lives in a separate conf blob handled by the driver.

use crate::nvs::{NVS_SECTION_SIZE, WL127X_NVS_FILE_SZ, WL128X_NVS_FILE_SZ};

/// Chip family member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChipVariant {
    /// wl1271 / wl1273 (single FEM, 912-byte NVS).
    Wl127x,
    /// wl1281 / wl1283 (TCXO clocking, 1113-byte NVS).
    Wl128x,
    /// wl1801 / wl1831 / wl1837 (no NVS file).
    Wl18xx,
}

impl ChipVariant {
    /// Every known variant.
    pub const ALL: [Self; 3] = [Self::Wl127x, Self::Wl128x, Self::Wl18xx];

    /// Identify a wl12xx variant from an NVS file length.
    #[must_use]
    pub const fn from_nvs_len(len: usize) -> Option<Self> {
        match len {
            WL127X_NVS_FILE_SZ => Some(Self::Wl127x),
            WL128X_NVS_FILE_SZ => Some(Self::Wl128x),
            _ => None,
        }
    }

    /// Total NVS file size, if this variant uses one.
    #[must_use]
    pub const fn nvs_file_size(&self) -> Option<usize> {
        match self {
            Self::Wl127x => Some(WL127X_NVS_FILE_SZ),
            Self::Wl128x => Some(WL128X_NVS_FILE_SZ),
            Self::Wl18xx => None,
        }
    }

    /// Size of the INI (radio parameter) section that follows the NVS section.
    #[must_use]
    pub const fn ini_section_size(&self) -> Option<usize> {
        match self.nvs_file_size() {
            Some(total) => Some(total - NVS_SECTION_SIZE),
            None => None,
        }
    }

    /// Whether the variant speaks the wl12xx `plt` testmode dialect.
    #[must_use]
    pub const fn is_wl12xx(&self) -> bool {
        matches!(self, Self::Wl127x | Self::Wl128x)
    }

    /// Short display name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Wl127x => "wl127x",
            Self::Wl128x => "wl128x",
            Self::Wl18xx => "wl18xx",
        }
    }

    /// Parse a user-supplied variant name (`127x`, `wl1271`, `wl128x`, ...).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().to_ascii_lowercase();
        let s = s.strip_prefix("wl").unwrap_or(&s);
        match s {
            "127x" | "1271" | "1273" => Some(Self::Wl127x),
            "128x" | "1281" | "1283" => Some(Self::Wl128x),
            "18xx" | "1801" | "1831" | "1835" | "1837" => Some(Self::Wl18xx),
            _ => None,
        }
    }
}

impl std::fmt::Display for ChipVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
