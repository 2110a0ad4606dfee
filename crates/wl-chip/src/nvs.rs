//! NVS file layout.
//!
//! The NVS file is pushed to the chip by the driver at boot. It has two
//! parts: the NVS section proper (register write records holding the MAC
//! address, followed by the TX-BIP calibration table) and the INI section
//! holding radio parameters.
//!
//! ```text
//! 0x000  01 6d 54  m5 m4 m3 m2     MAC low word  -> reg 0x546d
//! 0x007  01 71 54  m1 m0 00 00     MAC high word -> reg 0x5471
//! 0x00e  00                        end of register records
//! 0x00f  02                        radio table marker
//! 0x010  .. 0x1d4                  TX-BIP calibration table
//! 0x1d4  .. EOF                    INI section (radio parameters)
//! ```

/// Total size of a wl127x NVS file.
pub const WL127X_NVS_FILE_SZ: usize = 912;

/// Total size of a wl128x NVS file.
pub const WL128X_NVS_FILE_SZ: usize = 1113;

/// Size of the NVS section that precedes the INI section.
pub const NVS_SECTION_SIZE: usize = 468;

/// Register-write record: one 32-bit word follows the 3-byte header.
pub const RECORD_ONE_WORD: u8 = 0x01;

/// Register receiving MAC bytes 5..2.
pub const MAC_LOW_REG: u16 = 0x546d;

/// Register receiving MAC bytes 1..0.
pub const MAC_HIGH_REG: u16 = 0x5471;

/// Offset of the first (MAC low) record.
pub const MAC_LOW_RECORD: usize = 0;

/// Offset of the second (MAC high) record.
pub const MAC_HIGH_RECORD: usize = 7;

/// Where each MAC byte lands: `MAC_OFFSETS[i]` holds `mac[i]`.
///
/// The firmware expects the address reversed across the two records.
pub const MAC_OFFSETS: [usize; 6] = [11, 10, 6, 5, 4, 3];

/// End-of-records marker offset.
pub const RECORDS_END: usize = 14;

/// End-of-records marker value.
pub const RECORDS_END_MARKER: u8 = 0x00;

/// Radio table marker offset.
pub const RADIO_TABLE: usize = 15;

/// Radio table marker value.
pub const RADIO_TABLE_MARKER: u8 = 0x02;

/// Start of the TX-BIP calibration table.
pub const TX_BIP_OFFSET: usize = 16;

/// Size of the TX-BIP calibration table.
pub const TX_BIP_SIZE: usize = NVS_SECTION_SIZE - TX_BIP_OFFSET;

/// Start of the INI section.
pub const INI_OFFSET: usize = NVS_SECTION_SIZE;

/// Default TI OUI used for generated MAC addresses.
pub const TI_OUI: [u8; 3] = [0x08, 0x00, 0x28];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mac_offsets_fall_inside_records() {
        for off in MAC_OFFSETS {
            assert!(off > MAC_LOW_RECORD + 2 && off < RECORDS_END);
            assert_ne!(off, MAC_HIGH_RECORD);
            assert_ne!(off, MAC_HIGH_RECORD + 1);
            assert_ne!(off, MAC_HIGH_RECORD + 2);
        }
    }

    #[test]
    fn tables_do_not_overlap() {
        assert!(RECORDS_END < RADIO_TABLE);
        assert!(RADIO_TABLE < TX_BIP_OFFSET);
        assert_eq!(TX_BIP_OFFSET + TX_BIP_SIZE, INI_OFFSET);
        assert!(INI_OFFSET < WL127X_NVS_FILE_SZ);
    }
}
