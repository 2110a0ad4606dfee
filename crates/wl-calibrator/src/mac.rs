//! MAC addresses

use std::fmt;
use std::io::Read;
use std::str::FromStr;

use wl_chip::nvs::TI_OUI;

use crate::error::{CalError, Result};

/// 48-bit MAC address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    /// All-zero address
    pub const ZERO: Self = Self([0; 6]);

    /// Raw bytes
    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// Whether the address is all zeros
    pub fn is_zero(&self) -> bool {
        self.0 == [0; 6]
    }

    /// Whether the multicast bit is set
    pub const fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }

    /// Random address under the TI OUI
    ///
    /// # Errors
    ///
    /// Returns error if `/dev/urandom` cannot be read.
    pub fn random_ti() -> Result<Self> {
        let mut nic = [0u8; 3];
        std::fs::File::open("/dev/urandom")?.read_exact(&mut nic)?;
        Ok(Self([TI_OUI[0], TI_OUI[1], TI_OUI[2], nic[0], nic[1], nic[2]]))
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl FromStr for MacAddr {
    type Err = CalError;

    fn from_str(s: &str) -> Result<Self> {
        let mut octets = [0u8; 6];
        let mut parts = s.split(':');

        for octet in &mut octets {
            let part = parts
                .next()
                .ok_or_else(|| CalError::usage(format!("Invalid MAC address: {s}")))?;
            if part.is_empty() || part.len() > 2 {
                return Err(CalError::usage(format!("Invalid MAC address: {s}")));
            }
            *octet = u8::from_str_radix(part, 16)
                .map_err(|_| CalError::usage(format!("Invalid MAC address: {s}")))?;
        }

        if parts.next().is_some() {
            return Err(CalError::usage(format!("Invalid MAC address: {s}")));
        }

        Ok(Self(octets))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        let mac: MacAddr = "08:00:28:0a:B1:ff".parse().unwrap();
        assert_eq!(mac.octets(), [0x08, 0x00, 0x28, 0x0a, 0xb1, 0xff]);
        assert_eq!(mac.to_string(), "08:00:28:0a:b1:ff");
    }

    #[test]
    fn malformed_addresses() {
        for bad in [
            "",
            "08:00:28",
            "08:00:28:0a:b1:ff:00",
            "08:00:28:0a:b1:zz",
            "080:0:28:0a:b1:ff",
        ] {
            assert!(bad.parse::<MacAddr>().is_err(), "{bad} accepted");
        }
    }

    #[test]
    fn random_uses_ti_oui() {
        let mac = MacAddr::random_ti().unwrap();
        assert_eq!(&mac.octets()[..3], &TI_OUI);
        assert!(!mac.is_multicast());
    }
}
