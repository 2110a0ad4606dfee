//! nl80211 backend
//!
//! Wraps [`Nl80211`] and opens it on first use.

use crate::backend::{BackendType, TestmodeBackend};
use crate::error::{CalError, Result};
use crate::netlink::Nl80211;
use crate::target::Target;
use crate::testmode::describe;

/// Backend sending testmode requests to the kernel driver
#[derive(Debug, Default)]
pub struct NetlinkBackend {
    conn: Option<Nl80211>,
}

impl NetlinkBackend {
    /// Create an unconnected backend
    pub fn new() -> Self {
        Self::default()
    }

    fn connection(&mut self) -> Result<&mut Nl80211> {
        if self.conn.is_none() {
            self.conn = Some(Nl80211::connect()?);
        }
        self.conn
            .as_mut()
            .ok_or_else(|| CalError::netlink("nl80211 connection unavailable"))
    }
}

impl TestmodeBackend for NetlinkBackend {
    fn testmode(&mut self, target: &Target, testdata: &[u8]) -> Result<Option<Vec<u8>>> {
        tracing::debug!("{target}: {}", describe(testdata));
        let reply = self.connection()?.testmode(target, testdata)?;
        if let Some(data) = &reply {
            tracing::debug!("{target}: reply {} bytes", data.len());
        }
        Ok(reply)
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Netlink
    }
}
