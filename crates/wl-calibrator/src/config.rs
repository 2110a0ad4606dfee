//! Calibrator configuration
//!
//! Defaults match the stock TI firmware layout. Every setting can be
//! overridden through the environment, and the CLI overrides the environment.

use std::path::PathBuf;
use std::time::Duration;

/// NVS file the driver loads at boot.
pub const DEFAULT_NVS_PATH: &str = "/lib/firmware/ti-connectivity/wl1271-nvs.bin";

/// File written by commands that produce a new NVS.
pub const DEFAULT_NEW_NVS_PATH: &str = "./new-nvs.bin";

/// sysfs mount point.
pub const DEFAULT_SYSFS_ROOT: &str = "/sys";

/// How many times to look for the interface after loading the driver.
pub const DEFAULT_NETDEV_WAIT_ATTEMPTS: u32 = 20;

/// Delay between interface lookups.
pub const DEFAULT_NETDEV_WAIT_INTERVAL: Duration = Duration::from_millis(250);

/// Runtime configuration shared by all commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Current NVS file (read side of NVS updates)
    pub nvs_path: PathBuf,

    /// Where newly generated NVS files are written
    pub new_nvs_path: PathBuf,

    /// sysfs root used to resolve interfaces and phys
    pub sysfs_root: PathBuf,

    /// Interface lookups after a driver load before giving up
    pub netdev_wait_attempts: u32,

    /// Delay between those lookups
    pub netdev_wait_interval: Duration,

    /// Log requests and file writes instead of performing them
    pub dry_run: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            nvs_path: PathBuf::from(DEFAULT_NVS_PATH),
            new_nvs_path: PathBuf::from(DEFAULT_NEW_NVS_PATH),
            sysfs_root: PathBuf::from(DEFAULT_SYSFS_ROOT),
            netdev_wait_attempts: DEFAULT_NETDEV_WAIT_ATTEMPTS,
            netdev_wait_interval: DEFAULT_NETDEV_WAIT_INTERVAL,
            dry_run: false,
        }
    }
}

impl Config {
    /// Defaults overridden by `WLCAL_NVS_PATH`, `WLCAL_NEW_NVS_PATH`,
    /// `WLCAL_SYSFS_ROOT`, `WLCAL_NETDEV_WAIT_ATTEMPTS` and
    /// `WLCAL_NETDEV_WAIT_MS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`] with an explicit variable source.
    ///
    /// Unparsable numbers are logged and leave the default in place.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(path) = lookup("WLCAL_NVS_PATH") {
            config.nvs_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("WLCAL_NEW_NVS_PATH") {
            config.new_nvs_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("WLCAL_SYSFS_ROOT") {
            config.sysfs_root = PathBuf::from(path);
        }
        if let Some(attempts) = number(&lookup, "WLCAL_NETDEV_WAIT_ATTEMPTS") {
            config.netdev_wait_attempts = attempts;
        }
        if let Some(ms) = number(&lookup, "WLCAL_NETDEV_WAIT_MS") {
            config.netdev_wait_interval = Duration::from_millis(u64::from(ms));
        }

        tracing::debug!(?config, "Configuration loaded");
        config
    }
}

fn number(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<u32> {
    let value = lookup(key)?;
    match value.trim().parse() {
        Ok(n) => Some(n),
        Err(e) => {
            tracing::warn!("Ignoring {key}={value}: {e}");
            None
        }
    }
}
