//! Production-line calibration for TI wl12xx / wl18xx WiFi chips.
//!
//! Talks to the wlcore driver through nl80211 testmode, drives the PLT
//! (production line test) firmware commands and maintains the NVS file the
//! driver pushes to the chip at boot.
//!
//! # Layers
//!
//! ```text
//! argv ─▶ commands::dispatch ─▶ COMMANDS table ─▶ plt / wl18xx / misc / sequence
//!                                                   │
//!                                    testmode request (attribute stream)
//!                                                   ▼
//!                                       dyn TestmodeBackend
//!                                 ┌─────────────────┴───────────────┐
//!                          NetlinkBackend                    ScriptedBackend
//!                   (nl80211 over generic netlink)     (tests, --dry-run)
//! ```
//!
//! # Quick start
//!
//! ```no_run
//! use wl_calibrator::{commands, select_backend, BackendSelection, Config, Context, SystemModules};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut backend = select_backend(BackendSelection::Netlink);
//! let mut modules = SystemModules::new();
//! let mut out = std::io::stdout();
//! let mut ctx = Context::new(backend.as_mut(), &mut modules, Config::from_env(), &mut out);
//!
//! commands::dispatch(&mut ctx, &["dev", "wlan0", "plt", "calibrate"])?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]

mod args;
mod backend;
pub mod backends;
pub mod commands;
mod config;
mod error;
mod ini;
mod mac;
mod misc;
mod module;
pub mod netlink;
mod nvs;
mod plt;
pub mod sequence;
mod target;
pub mod testmode;
mod wl18xx;

pub use backend::{select_backend, BackendSelection, BackendType, TestmodeBackend};
pub use backends::{NetlinkBackend, ScriptedBackend};
pub use commands::{dispatch, execute, Command, Context, COMMANDS};
pub use config::Config;
pub use error::{CalError, Result};
pub use ini::IniFile;
pub use mac::MacAddr;
pub use misc::{create_reference, write_mac};
pub use module::{module_name, ModuleControl, RecordingModules, SystemModules};
pub use nvs::NvsFile;
pub use plt::RxStats;
pub use sequence::{autocalibrate, calibrate, AutoCalibration};
pub use target::{resolve_netdev, resolve_phy, wait_for_netdev, IdBy, Target};
pub use wl_chip::{Band, ChipVariant};

/// Commonly used types.
pub mod prelude {
    pub use crate::{
        dispatch, select_backend, BackendSelection, CalError, ChipVariant, Config, Context,
        IniFile, MacAddr, ModuleControl, NvsFile, Result, ScriptedBackend, SystemModules, Target,
        TestmodeBackend,
    };
}
