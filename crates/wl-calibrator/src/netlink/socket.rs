//! Netlink socket I/O
//!
//! One `NETLINK_GENERIC` datagram socket per connection. The kernel
//! auto-binds the socket on first send and `write`/`read` map to one
//! datagram each, so no address juggling is needed.

use rustix::fd::OwnedFd;
use rustix::io::{read, write};
use rustix::net::{netlink, socket, AddressFamily, SocketType};

use crate::error::{CalError, Result};

/// Receive buffer size; nl80211 testmode replies are far smaller.
pub const RECV_BUF_LEN: usize = 8192;

/// Owned generic netlink socket
#[derive(Debug)]
pub struct NlSocket {
    fd: OwnedFd,
    seq: u32,
}

impl NlSocket {
    /// Open a `NETLINK_GENERIC` socket
    ///
    /// # Errors
    ///
    /// Returns error if the socket cannot be created.
    pub fn open() -> Result<Self> {
        let fd = socket(
            AddressFamily::NETLINK,
            SocketType::RAW,
            Some(netlink::GENERIC),
        )?;
        tracing::debug!("Opened generic netlink socket");
        Ok(Self { fd, seq: 1 })
    }

    /// Next request sequence number
    pub fn next_seq(&mut self) -> u32 {
        self.seq = self.seq.wrapping_add(1);
        self.seq
    }

    /// Send one message
    ///
    /// # Errors
    ///
    /// Returns error if the write fails or is short.
    pub fn send(&self, msg: &[u8]) -> Result<()> {
        let sent = write(&self.fd, msg)?;
        if sent != msg.len() {
            return Err(CalError::netlink(format!(
                "short send: {sent} of {} bytes",
                msg.len()
            )));
        }
        tracing::trace!("netlink tx {} bytes: {:02x?}", msg.len(), msg);
        Ok(())
    }

    /// Receive one datagram
    ///
    /// # Errors
    ///
    /// Returns error if the read fails.
    pub fn recv(&self) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; RECV_BUF_LEN];
        let n = read(&self.fd, &mut buf)?;
        buf.truncate(n);
        tracing::trace!("netlink rx {n} bytes: {:02x?}", buf);
        Ok(buf)
    }
}
