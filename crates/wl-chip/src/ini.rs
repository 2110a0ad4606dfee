//! INI key tables.
//!
//! TI ships radio parameters as a flat `KEY = bytes` text file. Each key
//! occupies a fixed number of bytes in the INI section of the NVS file, in
//! table order. Keys not listed here are ignored by the calibrator.

use crate::chip::ChipVariant;

/// One INI key and the number of bytes it contributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IniField {
    /// Key as it appears in the INI file.
    pub key: &'static str,
    /// Number of bytes expected for the key.
    pub len: usize,
}

const fn f(key: &'static str, len: usize) -> IniField {
    IniField { key, len }
}

// ── General parameters ──────────────────────────────────────────────────────

const GENERAL_127X: &[IniField] = &[
    f("TXBiPFEMAutoDetect", 1),
    f("TXBiPFEMManufacturer", 1),
    f("RefClk", 1),
    f("SettlingTime", 1),
    f("ClockValidOnWakeup", 1),
    f("DC2DCMode", 1),
    f("Single_Dual_Band_Solution", 1),
    f("Settings", 4),
    f("SRState", 1),
    f("SRF1", 16),
    f("SRF2", 16),
    f("SRF3", 16),
];

const GENERAL_128X: &[IniField] = &[
    f("TXBiPFEMAutoDetect", 1),
    f("TXBiPFEMManufacturer", 1),
    f("RefClk", 1),
    f("SettlingTime", 1),
    f("ClockValidOnWakeup", 1),
    f("TCXO_Clk", 1),
    f("TCXO_SettlingTime", 1),
    f("TCXO_ClockValidOnWakeup", 1),
    f("TCXO_LDO_Voltage", 1),
    f("XTALItrimVal", 1),
    f("Platform_configuration", 1),
    f("Single_Dual_Band_Solution", 1),
    f("Settings", 4),
    f("SRState", 1),
    f("SRF1", 16),
    f("SRF2", 16),
    f("SRF3", 16),
];

// ── 2.4 GHz radio parameters ────────────────────────────────────────────────

const RADIO_2_4: &[IniField] = &[
    f("RxTraceInsertionLoss_2_4G", 1),
    f("TXTraceLoss_2_4G", 1),
    f("RxRssiAndProcessCompensation_2_4G", 15),
    f("FEM1_TXBiPReferencePDvoltage_2_4G", 2),
    f("FEM1_TxBiPReferencePower_2_4G", 1),
    f("FEM1_TxBiPOffsetdB_2_4G", 1),
    f("FEM1_TxPerRatePowerLimits_2_4G_Normal", 6),
    f("FEM1_TxPerRatePowerLimits_2_4G_Degraded", 6),
    f("FEM1_TxPerChannelPowerLimits_2_4G_11b", 14),
    f("FEM1_TxPerChannelPowerLimits_2_4G_OFDM", 14),
    f("FEM1_TxPDVsRateOffsets_2_4G", 6),
    f("FEM1_TxIbiasTable_2_4G", 8),
    f("FEM1_RxFemInsertionLoss_2_4G", 1),
];

const RADIO_2_4_128X: &[IniField] = &[f("FEM1_TxPerChannelPowerCompensation_2_4G", 3)];

// ── 5 GHz radio parameters ──────────────────────────────────────────────────

const RADIO_5: &[IniField] = &[
    f("RxTraceInsertionLoss_5G", 7),
    f("TXTraceLoss_5G", 7),
    f("RxRssiAndProcessCompensation_5G", 15),
    f("FEM1_TXBiPReferencePDvoltage_5G", 14),
    f("FEM1_TxBiPReferencePower_5G", 7),
    f("FEM1_TxBiPOffsetdB_5G", 7),
    f("FEM1_TxPerRatePowerLimits_5G_Normal", 6),
    f("FEM1_TxPerRatePowerLimits_5G_Degraded", 6),
    f("FEM1_TxPerChannelPowerLimits_5G_OFDM", 35),
    f("FEM1_TxPDVsRateOffsets_5G", 6),
    f("FEM1_TxIbiasTable_5G", 8),
    f("FEM1_RxFemInsertionLoss_5G", 7),
];

const RADIO_5_128X: &[IniField] = &[f("FEM1_TxPerChannelPowerCompensation_5G", 18)];

/// Keys only present in wl128x INI files; used to infer the variant.
pub const WL128X_ONLY_KEYS: &[&str] = &[
    "TCXO_Clk",
    "TCXO_SettlingTime",
    "TCXO_ClockValidOnWakeup",
    "TCXO_LDO_Voltage",
    "Platform_configuration",
];

/// Ordered fields for a variant. Empty for variants without an NVS file.
pub fn fields(variant: ChipVariant) -> impl Iterator<Item = &'static IniField> {
    let parts: [&'static [IniField]; 5] = match variant {
        ChipVariant::Wl127x => [GENERAL_127X, RADIO_2_4, &[], RADIO_5, &[]],
        ChipVariant::Wl128x => [
            GENERAL_128X,
            RADIO_2_4,
            RADIO_2_4_128X,
            RADIO_5,
            RADIO_5_128X,
        ],
        ChipVariant::Wl18xx => [&[], &[], &[], &[], &[]],
    };
    parts.into_iter().flatten()
}

/// Look up a field by key, returning it with its offset inside the INI section.
#[must_use]
pub fn lookup(variant: ChipVariant, key: &str) -> Option<(usize, IniField)> {
    let mut offset = 0;
    for field in fields(variant) {
        if field.key == key {
            return Some((offset, *field));
        }
        offset += field.len;
    }
    None
}

/// Number of INI section bytes covered by the table.
#[must_use]
pub fn table_len(variant: ChipVariant) -> usize {
    fields(variant).map(|f| f.len).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_fit_ini_section() {
        for variant in [ChipVariant::Wl127x, ChipVariant::Wl128x] {
            let section = variant.ini_section_size().unwrap();
            assert!(table_len(variant) <= section, "{variant} table overflows");
        }
    }

    #[test]
    fn keys_unique_per_variant() {
        for variant in ChipVariant::ALL {
            let keys: Vec<_> = fields(variant).map(|f| f.key).collect();
            let mut sorted = keys.clone();
            sorted.sort_unstable();
            sorted.dedup();
            assert_eq!(keys.len(), sorted.len());
        }
    }

    #[test]
    fn lookup_offsets_accumulate() {
        let auto_detect = lookup(ChipVariant::Wl127x, "TXBiPFEMAutoDetect").unwrap();
        assert_eq!(auto_detect.0, 0);
        let (off, field) = lookup(ChipVariant::Wl127x, "Settings").unwrap();
        assert_eq!(off, 7);
        assert_eq!(field.len, 4);
        assert!(lookup(ChipVariant::Wl127x, "TCXO_Clk").is_none());
        assert!(lookup(ChipVariant::Wl128x, "TCXO_Clk").is_some());
    }

    #[test]
    fn wl18xx_has_no_fields() {
        assert_eq!(fields(ChipVariant::Wl18xx).count(), 0);
    }
}
