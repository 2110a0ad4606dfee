//! wl1271 testmode interface.
//!
//! Testmode requests travel inside `NL80211_ATTR_TESTDATA` as a nested
//! attribute set. The driver understands a handful of top-level commands
//! ([`cmd`]); `CMD_TEST` wraps a raw firmware command whose body starts
//! with the firmware command header followed by a test id ([`test`]).
//!
//! ```text
//! NL80211_ATTR_TESTDATA
//! ├── TM_ATTR_CMD_ID   u32   cmd::TEST
//! ├── TM_ATTR_ANSWER   u8    1 when a reply is expected
//! └── TM_ATTR_DATA     bin   fw header | test id | pad[3] | params...
//! ```

/// Top-level testmode commands understood by the wl12xx driver.
pub mod cmd {
    /// Unspecified.
    pub const UNSPEC: u32 = 0;
    /// Raw firmware test command.
    pub const TEST: u32 = 1;
    /// Read an ACX information element.
    pub const INTERROGATE: u32 = 2;
    /// Write an ACX information element.
    pub const CONFIGURE: u32 = 3;
    /// Switch PLT (production line test) mode.
    pub const SET_PLT_MODE: u32 = 5;
    /// Read the MAC address burned into the chip fuses.
    pub const GET_MAC: u32 = 7;
}

/// Attributes nested inside `NL80211_ATTR_TESTDATA`.
pub mod attr {
    /// Command id (`u32`).
    pub const CMD_ID: u16 = 1;
    /// Request an answer (`u8`).
    pub const ANSWER: u16 = 2;
    /// Command payload (binary).
    pub const DATA: u16 = 3;
    /// Information element id for INTERROGATE / CONFIGURE (`u8`).
    pub const IE_ID: u16 = 4;
    /// PLT mode (`u32`).
    pub const PLT_MODE: u16 = 5;
}

/// PLT modes for [`cmd::SET_PLT_MODE`].
pub mod plt_mode {
    /// Leave PLT, return to normal operation.
    pub const OFF: u32 = 0;
    /// Boot the firmware in PLT mode.
    pub const ON: u32 = 1;
    /// Boot in PLT mode and detect the connected FEM.
    pub const FEM_DETECT: u32 = 2;
}

/// Firmware command id carrying test sub-commands.
pub const FW_CMD_TEST: u16 = 23;

/// Firmware command header: `u16 id`, `u16 status`.
pub const FW_HEADER_LEN: usize = 4;

/// Test header following the firmware header: test id + 3 pad bytes.
pub const TEST_HEADER_LEN: usize = 4;

/// Offset of test parameters inside a firmware test command.
pub const TEST_PARAMS_OFFSET: usize = FW_HEADER_LEN + TEST_HEADER_LEN;

/// Firmware status meaning success.
pub const FW_STATUS_SUCCESS: u16 = 1;

/// wl12xx firmware test ids.
pub mod test {
    /// Power-detector buffer calibration.
    pub const PD_BUFFER_CAL: u8 = 0x01;
    /// TX bias-in-process (P2G) calibration.
    pub const P2G_CAL: u8 = 0x02;
    /// Continuous TX (FCC).
    pub const FCC: u8 = 0x07;
    /// Carrier / tone TX (TELEC).
    pub const TELEC: u8 = 0x08;
    /// Stop any TX test.
    pub const STOP_TX: u8 = 0x09;
    /// Tune the radio to a band / channel.
    pub const CHANNEL_TUNE: u8 = 0x0d;
    /// Stop RX statistics collection.
    pub const RX_STAT_STOP: u8 = 0x12;
    /// Start RX statistics collection.
    pub const RX_STAT_START: u8 = 0x13;
    /// Reset RX statistics counters.
    pub const RX_STAT_RESET: u8 = 0x14;
    /// Read RX statistics counters.
    pub const RX_STAT_GET: u8 = 0x15;
    /// Read firmware / PHY versions.
    pub const GET_FW_VERSIONS: u8 = 0x18;
    /// Update the power-detector reference point.
    pub const UPDATE_PD_REFERENCE_POINT: u8 = 0x1d;
}

/// wl18xx PHY test ids (sent with the same firmware test header).
pub mod wl18xx {
    /// Tune channel, band and bandwidth.
    pub const CHANNEL_TUNE: u8 = 0x40;
    /// Start TX simulation.
    pub const START_TX: u8 = 0x41;
    /// Stop TX simulation.
    pub const STOP_TX: u8 = 0x42;
    /// Start packet reception counting.
    pub const START_RX: u8 = 0x43;
    /// Stop packet reception counting.
    pub const STOP_RX: u8 = 0x44;
    /// Read RX counters.
    pub const GET_RX_STATS: u8 = 0x45;
    /// Start a carrier tone.
    pub const TX_TONE_START: u8 = 0x46;
    /// Stop a carrier tone.
    pub const TX_TONE_STOP: u8 = 0x47;
    /// Select 2.4 GHz antenna mode.
    pub const ANTENNA_MODE_24G: u8 = 0x48;
    /// Select 5 GHz antenna mode.
    pub const ANTENNA_MODE_5G: u8 = 0x49;
}

/// Number of sub-bands covered by TX-BIP: one 2.4 GHz + seven 5 GHz.
pub const TX_BIP_SUB_BANDS: usize = 8;

/// Header of the `P2G_CAL` answer: `u16` result length + 2 pad bytes.
///
/// The TX-BIP results that follow are copied verbatim into the NVS radio
/// table.
pub const P2G_ANSWER_HEADER_LEN: usize = 4;

/// Length of the firmware version string in the `GET_FW_VERSIONS` answer.
pub const FW_VERSION_STR_LEN: usize = 20;

/// Length of the RX statistics block returned by `RX_STAT_GET`.
///
/// Seven little-endian `u32` counters.
pub const RX_STATS_LEN: usize = 28;
