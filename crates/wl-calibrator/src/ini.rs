//! TI radio INI files
//!
//! ```text
//! # comment
//! TXBiPFEMAutoDetect      = 01
//! SRF1                    = 09 04 19 10 01 00 F7 EF E6 DE 00 00 00 00 0F 00   # trailing comment
//! ```
//!
//! Values are whitespace-separated hex bytes, with or without `0x`.

use std::path::Path;

use wl_chip::ini::{lookup, WL128X_ONLY_KEYS};
use wl_chip::ChipVariant;

use crate::error::{CalError, Result};

/// Parsed INI file, entries in file order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniFile {
    entries: Vec<(String, Vec<u8>)>,
}

impl IniFile {
    /// Parse INI text
    ///
    /// # Errors
    ///
    /// Returns `CalError::InvalidIni` with the line number on malformed lines
    /// or duplicate keys.
    pub fn parse(text: &str) -> Result<Self> {
        let mut entries: Vec<(String, Vec<u8>)> = Vec::new();

        for (index, raw) in text.lines().enumerate() {
            let lineno = index + 1;
            let line = raw.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }

            let (key, value) = line.split_once('=').ok_or_else(|| {
                CalError::invalid_ini(format!("line {lineno}: expected KEY = VALUE"))
            })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(CalError::invalid_ini(format!("line {lineno}: empty key")));
            }
            if entries.iter().any(|(k, _)| k == key) {
                return Err(CalError::invalid_ini(format!(
                    "line {lineno}: duplicate key {key}"
                )));
            }

            let mut bytes = Vec::new();
            for tok in value.split_whitespace() {
                let byte = parse_hex_byte(tok).ok_or_else(|| {
                    CalError::invalid_ini(format!("line {lineno}: bad byte {tok:?} for {key}"))
                })?;
                bytes.push(byte);
            }

            entries.push((key.to_string(), bytes));
        }

        tracing::debug!("Parsed INI with {} keys", entries.len());
        Ok(Self { entries })
    }

    /// Read and parse an INI file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::info!("Loading INI from {}", path.display());

        if !path.exists() {
            return Err(CalError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        Self::parse(&std::fs::read_to_string(path)?)
    }

    /// Bytes of `key`
    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_slice())
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the file had no keys
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// wl128x when any wl128x-only key is present, wl127x otherwise
    pub fn detect_variant(&self) -> ChipVariant {
        if WL128X_ONLY_KEYS.iter().any(|k| self.get(k).is_some()) {
            ChipVariant::Wl128x
        } else {
            ChipVariant::Wl127x
        }
    }

    /// Serialize into an INI section for `variant`
    ///
    /// Unknown keys are skipped with a warning; missing keys stay zero.
    ///
    /// # Errors
    ///
    /// Returns `CalError::InvalidIni` if a key has the wrong number of bytes,
    /// or the variant has no NVS file.
    pub fn section_bytes(&self, variant: ChipVariant) -> Result<Vec<u8>> {
        let size = variant.ini_section_size().ok_or_else(|| {
            CalError::invalid_ini(format!("{variant} has no NVS INI section"))
        })?;
        let mut section = vec![0u8; size];

        for (key, bytes) in &self.entries {
            let Some((offset, field)) = lookup(variant, key) else {
                tracing::warn!("Ignoring unknown INI key {key} for {variant}");
                continue;
            };
            if bytes.len() != field.len {
                return Err(CalError::invalid_ini(format!(
                    "{key} has {} bytes, {variant} expects {}",
                    bytes.len(),
                    field.len
                )));
            }
            section[offset..offset + field.len].copy_from_slice(bytes);
        }

        Ok(section)
    }
}

fn parse_hex_byte(tok: &str) -> Option<u8> {
    let digits = tok
        .strip_prefix("0x")
        .or_else(|| tok.strip_prefix("0X"))
        .unwrap_or(tok);
    if digits.is_empty() || digits.len() > 2 {
        return None;
    }
    u8::from_str_radix(digits, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# wl1271 sample
TXBiPFEMAutoDetect = 01
RefClk             = 0x05   # 38.4 MHz
Settings           = 00 00 1F 00

SRF1 = 09 04 19 10 01 00 F7 EF E6 DE 00 00 00 00 0F 00
";

    #[test]
    fn parses_keys_comments_and_prefixes() {
        let ini = IniFile::parse(SAMPLE).unwrap();
        assert_eq!(ini.len(), 4);
        assert_eq!(ini.get("RefClk"), Some(&[0x05][..]));
        assert_eq!(ini.get("Settings"), Some(&[0, 0, 0x1f, 0][..]));
        assert_eq!(ini.get("SRF1").unwrap().len(), 16);
        assert_eq!(ini.detect_variant(), ChipVariant::Wl127x);
    }

    #[test]
    fn malformed_lines_report_line_number() {
        let err = IniFile::parse("RefClk = 05\nbogus line\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));

        assert!(IniFile::parse("RefClk = 100").is_err());
        assert!(IniFile::parse("RefClk = 05\nRefClk = 06").is_err());
        assert!(IniFile::parse(" = 05").is_err());
    }

    #[test]
    fn variant_detection() {
        let ini = IniFile::parse("TCXO_Clk = 05\n").unwrap();
        assert_eq!(ini.detect_variant(), ChipVariant::Wl128x);
    }

    #[test]
    fn section_places_fields_at_table_offsets() {
        let ini = IniFile::parse(SAMPLE).unwrap();
        let section = ini.section_bytes(ChipVariant::Wl127x).unwrap();
        assert_eq!(section.len(), 444);
        assert_eq!(section[0], 0x01);
        assert_eq!(section[2], 0x05);
        assert_eq!(&section[7..11], &[0, 0, 0x1f, 0]);
        let (srf1, _) = lookup(ChipVariant::Wl127x, "SRF1").unwrap();
        assert_eq!(section[srf1], 0x09);
    }

    #[test]
    fn wrong_width_rejected_unknown_ignored() {
        let ini = IniFile::parse("Settings = 00 01\n").unwrap();
        assert!(ini.section_bytes(ChipVariant::Wl127x).is_err());

        let ini = IniFile::parse("SomeFutureKey = 01 02\n").unwrap();
        let section = ini.section_bytes(ChipVariant::Wl127x).unwrap();
        assert!(section.iter().all(|&b| b == 0));

        assert!(ini.section_bytes(ChipVariant::Wl18xx).is_err());
    }
}
