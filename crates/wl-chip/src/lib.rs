//! Silicon and firmware model for TI wl127x / wl128x / wl18xx WiFi chips.
//!
//! This crate has **no dependencies** and **no hardware access** — it is a
//! pure model of what the calibrator talks to: chip variants, the NVS file
//! layout, wl1271 testmode command/attribute ids, the nl80211 and
//! generic-netlink constants the testmode path uses, and the INI field
//! tables that fill the radio section of an NVS file.
//!
//! # Crate organisation
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`chip`] | Chip variants and their NVS / INI section sizes |
//! | [`nvs`] | NVS file layout (MAC records, TX-BIP table, INI section) |
//! | [`testmode`] | wl1271 testmode commands, attributes, firmware test ids |
//! | [`nl80211`] | nl80211 testmode + generic-netlink controller constants |
//! | [`ini`] | Ordered INI key tables per chip variant |
//! | [`band`] | Bands, channel ranges, calibration sub-bands |

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod band;
pub mod chip;
pub mod ini;
pub mod nl80211;
pub mod nvs;
pub mod testmode;

pub use band::Band;
pub use chip::ChipVariant;
