//! Device target resolution
//!
//! Resolves `dev <ifname>` and `phy <phyname>` to the kernel indices nl80211
//! addresses devices by, using sysfs.

use std::path::Path;
use std::time::Duration;

use crate::error::{CalError, Result};

/// Device a command is addressed to
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Target {
    /// No device (file-only commands)
    #[default]
    None,

    /// Wireless phy, addressed by wiphy index
    Phy {
        /// Wiphy index
        index: u32,
        /// Name given on the command line
        name: String,
    },

    /// Network interface, addressed by ifindex
    Netdev {
        /// Interface index
        ifindex: u32,
        /// Interface name
        name: String,
    },
}

/// Which kind of target a command accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdBy {
    /// Command takes no device
    None,
    /// Only `phy <name>`
    Phy,
    /// Only `dev <name>`
    Netdev,
    /// Either `phy` or `dev`
    Any,
}

impl Target {
    /// Whether `id_by` accepts this target
    pub const fn accepted_by(&self, id_by: IdBy) -> bool {
        matches!(
            (self, id_by),
            (Self::None, IdBy::None)
                | (Self::Phy { .. }, IdBy::Phy | IdBy::Any)
                | (Self::Netdev { .. }, IdBy::Netdev | IdBy::Any)
        )
    }

    /// Name for messages
    pub fn name(&self) -> &str {
        match self {
            Self::None => "-",
            Self::Phy { name, .. } | Self::Netdev { name, .. } => name,
        }
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "no device"),
            Self::Phy { index, name } => write!(f, "phy {name} (#{index})"),
            Self::Netdev { ifindex, name } => write!(f, "dev {name} (ifindex {ifindex})"),
        }
    }
}

/// Resolve a network interface name through `<sysfs>/class/net/<name>/ifindex`
///
/// # Errors
///
/// Returns `CalError::DeviceNotFound` if the interface does not exist.
pub fn resolve_netdev(sysfs_root: &Path, name: &str) -> Result<Target> {
    if name.is_empty() || name.contains('/') {
        return Err(CalError::usage(format!("Invalid interface name: {name:?}")));
    }

    let path = sysfs_root.join("class/net").join(name).join("ifindex");
    let ifindex = read_decimal_sysfs(&path).map_err(|e| {
        tracing::debug!("Cannot resolve {name}: {e}");
        CalError::DeviceNotFound { name: name.into() }
    })?;

    tracing::debug!("Resolved dev {name} -> ifindex {ifindex}");
    Ok(Target::Netdev {
        ifindex,
        name: name.into(),
    })
}

/// Resolve a wiphy by name (`phy0`) or bare index (`0`)
///
/// Reads `<sysfs>/class/ieee80211/<name>/index`, falling back to the numeric
/// suffix of a `phyN` name when sysfs has no entry.
///
/// # Errors
///
/// Returns `CalError::DeviceNotFound` if neither lookup succeeds.
pub fn resolve_phy(sysfs_root: &Path, name: &str) -> Result<Target> {
    if let Ok(index) = name.parse::<u32>() {
        return Ok(Target::Phy {
            index,
            name: format!("phy{index}"),
        });
    }

    if name.is_empty() || name.contains('/') {
        return Err(CalError::usage(format!("Invalid phy name: {name:?}")));
    }

    let path = sysfs_root.join("class/ieee80211").join(name).join("index");
    let index = match read_decimal_sysfs(&path) {
        Ok(index) => index,
        Err(e) => {
            tracing::debug!("No sysfs entry for {name}: {e}");
            name.strip_prefix("phy")
                .and_then(|n| n.parse::<u32>().ok())
                .ok_or_else(|| CalError::DeviceNotFound { name: name.into() })?
        }
    };

    tracing::debug!("Resolved phy {name} -> wiphy {index}");
    Ok(Target::Phy {
        index,
        name: name.into(),
    })
}

/// Wait for a network interface to appear after a driver load
///
/// # Errors
///
/// Returns `CalError::DeviceNotFound` if the interface is still missing
/// after `attempts` polls.
pub fn wait_for_netdev(
    sysfs_root: &Path,
    name: &str,
    attempts: u32,
    interval: Duration,
) -> Result<Target> {
    let mut last = CalError::DeviceNotFound { name: name.into() };
    for attempt in 0..attempts.max(1) {
        match resolve_netdev(sysfs_root, name) {
            Ok(target) => return Ok(target),
            Err(e) => last = e,
        }
        if attempt + 1 < attempts {
            std::thread::sleep(interval);
        }
    }
    Err(last)
}

/// Read a decimal value from sysfs
fn read_decimal_sysfs(path: &Path) -> Result<u32> {
    let content = std::fs::read_to_string(path)?;
    content.trim().parse::<u32>().map_err(|e| CalError::Sysfs {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fake_sysfs() -> TempDir {
        let root = TempDir::new().unwrap();
        let net = root.path().join("class/net/wlan0");
        let phy = root.path().join("class/ieee80211/phy3");
        std::fs::create_dir_all(&net).unwrap();
        std::fs::write(net.join("ifindex"), "7\n").unwrap();
        std::fs::create_dir_all(&phy).unwrap();
        std::fs::write(phy.join("index"), "3\n").unwrap();
        root
    }

    #[test]
    fn netdev_from_sysfs() {
        let root = fake_sysfs();
        let target = resolve_netdev(root.path(), "wlan0").unwrap();
        assert_eq!(
            target,
            Target::Netdev {
                ifindex: 7,
                name: "wlan0".into()
            }
        );
        assert!(matches!(
            resolve_netdev(root.path(), "wlan9"),
            Err(CalError::DeviceNotFound { .. })
        ));
    }

    #[test]
    fn phy_by_name_index_or_suffix() {
        let root = fake_sysfs();
        let root = root.path();
        assert!(matches!(resolve_phy(root, "phy3"), Ok(Target::Phy { index: 3, .. })));
        assert!(matches!(resolve_phy(root, "5"), Ok(Target::Phy { index: 5, .. })));
        assert!(matches!(resolve_phy(root, "phy9"), Ok(Target::Phy { index: 9, .. })));
        assert!(resolve_phy(root, "radio").is_err());
    }

    #[test]
    fn path_traversal_rejected() {
        let root = fake_sysfs();
        let err = resolve_netdev(root.path(), "../x").unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn garbage_ifindex_is_a_sysfs_error() {
        let root = fake_sysfs();
        let bad = root.path().join("class/net/wlan1");
        std::fs::create_dir_all(&bad).unwrap();
        std::fs::write(bad.join("ifindex"), "seven\n").unwrap();

        let err = read_decimal_sysfs(&bad.join("ifindex")).unwrap_err();
        match err {
            CalError::Sysfs { path, .. } => assert!(path.ends_with("ifindex")),
            other => panic!("unexpected error {other:?}"),
        }
        assert!(matches!(
            resolve_netdev(root.path(), "wlan1"),
            Err(CalError::DeviceNotFound { .. })
        ));
    }

    #[test]
    fn wait_gives_up_after_attempts() {
        let root = fake_sysfs();
        let found = wait_for_netdev(root.path(), "wlan0", 1, Duration::ZERO).unwrap();
        assert_eq!(found.name(), "wlan0");
        assert!(matches!(
            wait_for_netdev(root.path(), "wlan9", 2, Duration::ZERO),
            Err(CalError::DeviceNotFound { .. })
        ));
    }

    #[test]
    fn id_by_acceptance() {
        let dev = Target::Netdev {
            ifindex: 1,
            name: "wlan0".into(),
        };
        assert!(dev.accepted_by(IdBy::Netdev));
        assert!(dev.accepted_by(IdBy::Any));
        assert!(!dev.accepted_by(IdBy::Phy));
        assert!(!dev.accepted_by(IdBy::None));
        assert!(Target::None.accepted_by(IdBy::None));
        assert!(!Target::None.accepted_by(IdBy::Any));
    }
}
