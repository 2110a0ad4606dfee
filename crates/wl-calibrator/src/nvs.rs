//! NVS file model
//!
//! An [`NvsFile`] is always a complete, size-checked image: every mutation
//! works in place on the fixed layout described in [`wl_chip::nvs`].

use std::fmt::Write as _;
use std::path::Path;

use wl_chip::ini::fields;
use wl_chip::nvs::{
    INI_OFFSET, MAC_HIGH_RECORD, MAC_HIGH_REG, MAC_LOW_RECORD, MAC_LOW_REG, MAC_OFFSETS,
    RADIO_TABLE, RADIO_TABLE_MARKER, RECORDS_END, RECORDS_END_MARKER, RECORD_ONE_WORD,
    TX_BIP_OFFSET, TX_BIP_SIZE,
};
use wl_chip::ChipVariant;

use crate::error::{CalError, Result};
use crate::ini::IniFile;
use crate::mac::MacAddr;

/// Complete NVS image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NvsFile {
    variant: ChipVariant,
    data: Vec<u8>,
}

impl NvsFile {
    /// Validate and wrap raw NVS bytes
    ///
    /// # Errors
    ///
    /// Returns `CalError::InvalidNvs` if the size matches no variant or the
    /// MAC register records are missing.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let variant = ChipVariant::from_nvs_len(data.len()).ok_or_else(|| {
            CalError::invalid_nvs(format!(
                "size {} matches neither wl127x (912) nor wl128x (1113)",
                data.len()
            ))
        })?;

        for (offset, reg) in [
            (MAC_LOW_RECORD, MAC_LOW_REG),
            (MAC_HIGH_RECORD, MAC_HIGH_REG),
        ] {
            if data[offset..offset + 3] != record_header(reg) {
                return Err(CalError::invalid_nvs(format!(
                    "missing MAC record for register 0x{reg:04x} at offset {offset}"
                )));
            }
        }

        Ok(Self { variant, data })
    }

    /// Read an NVS file
    ///
    /// # Errors
    ///
    /// Returns error if the file is missing, unreadable or invalid.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::info!("Loading NVS from {}", path.display());

        if !path.exists() {
            return Err(CalError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        Self::from_bytes(std::fs::read(path)?)
    }

    /// Write the image to `path`
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, &self.data)?;
        tracing::info!(
            "Wrote {} NVS ({} bytes) to {}",
            self.variant,
            self.data.len(),
            path.display()
        );
        Ok(())
    }

    /// Build a reference NVS: zero MAC, empty TX-BIP table, INI section
    /// from `ini`
    ///
    /// # Errors
    ///
    /// Returns error if `variant` has no NVS file or the INI is invalid for it.
    pub fn reference(variant: ChipVariant, ini: &IniFile) -> Result<Self> {
        let size = variant
            .nvs_file_size()
            .ok_or_else(|| CalError::invalid_nvs(format!("{variant} does not use an NVS file")))?;

        let mut data = vec![0u8; size];
        for (offset, reg) in [
            (MAC_LOW_RECORD, MAC_LOW_REG),
            (MAC_HIGH_RECORD, MAC_HIGH_REG),
        ] {
            data[offset..offset + 3].copy_from_slice(&record_header(reg));
        }
        data[RECORDS_END] = RECORDS_END_MARKER;
        data[RADIO_TABLE] = RADIO_TABLE_MARKER;

        let section = ini.section_bytes(variant)?;
        data[INI_OFFSET..].copy_from_slice(&section);

        tracing::debug!("Built reference {variant} NVS from {} INI keys", ini.len());
        Ok(Self { variant, data })
    }

    /// Chip variant implied by the file size
    pub const fn variant(&self) -> ChipVariant {
        self.variant
    }

    /// Raw image
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// MAC address stored in the register records
    pub fn mac(&self) -> MacAddr {
        let mut mac = [0u8; 6];
        for (byte, &offset) in mac.iter_mut().zip(MAC_OFFSETS.iter()) {
            *byte = self.data[offset];
        }
        MacAddr(mac)
    }

    /// Store `mac` in the register records
    pub fn set_mac(&mut self, mac: MacAddr) {
        for (&byte, &offset) in mac.0.iter().zip(MAC_OFFSETS.iter()) {
            self.data[offset] = byte;
        }
        tracing::debug!("NVS MAC set to {mac}");
    }

    /// TX-BIP calibration table
    pub fn tx_bip(&self) -> &[u8] {
        &self.data[TX_BIP_OFFSET..TX_BIP_OFFSET + TX_BIP_SIZE]
    }

    /// Whether a TX-BIP calibration has been stored
    pub fn is_calibrated(&self) -> bool {
        self.tx_bip().iter().any(|&b| b != 0)
    }

    /// Replace the TX-BIP table; shorter results are zero padded
    ///
    /// # Errors
    ///
    /// Returns `CalError::InvalidNvs` if `results` exceeds the table.
    pub fn set_tx_bip(&mut self, results: &[u8]) -> Result<()> {
        if results.len() > TX_BIP_SIZE {
            return Err(CalError::invalid_nvs(format!(
                "TX-BIP results are {} bytes, table holds {TX_BIP_SIZE}",
                results.len()
            )));
        }

        let table = &mut self.data[TX_BIP_OFFSET..TX_BIP_OFFSET + TX_BIP_SIZE];
        table.fill(0);
        table[..results.len()].copy_from_slice(results);
        self.data[RADIO_TABLE] = RADIO_TABLE_MARKER;
        Ok(())
    }

    /// INI (radio parameter) section
    pub fn ini_section(&self) -> &[u8] {
        &self.data[INI_OFFSET..]
    }

    /// Regenerate the INI section from `ini`, keeping MAC and calibration
    ///
    /// # Errors
    ///
    /// Returns error if the INI does not fit this file's variant.
    pub fn update_ini(&mut self, ini: &IniFile) -> Result<()> {
        let detected = ini.detect_variant();
        if detected != self.variant {
            tracing::warn!(
                "INI looks like {detected}, NVS is {}; using NVS layout",
                self.variant
            );
        }
        let section = ini.section_bytes(self.variant)?;
        self.data[INI_OFFSET..].copy_from_slice(&section);
        Ok(())
    }

    /// Human-readable dump
    pub fn dump(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "NVS file      : {} ({} bytes)",
            self.variant,
            self.data.len()
        );
        let _ = writeln!(out, "MAC address   : {}", self.mac());
        let _ = writeln!(
            out,
            "TX-BIP        : {}",
            if self.is_calibrated() { "calibrated" } else { "not calibrated" }
        );
        let _ = writeln!(out, "INI section   : {} bytes", self.ini_section().len());

        let section = self.ini_section();
        let mut offset = 0;
        for field in fields(self.variant) {
            let bytes = &section[offset..offset + field.len];
            let hex: Vec<String> = bytes.iter().map(|b| format!("{b:02X}")).collect();
            let _ = writeln!(out, "  {:<42} = {}", field.key, hex.join(" "));
            offset += field.len;
        }

        out
    }
}

fn record_header(reg: u16) -> [u8; 3] {
    let [lo, hi] = reg.to_le_bytes();
    [RECORD_ONE_WORD, lo, hi]
}
