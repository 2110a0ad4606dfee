//! Generic netlink plumbing for nl80211 testmode
//!
//! ```text
//! ┌──────────────┐  CTRL_CMD_GETFAMILY   ┌──────────────┐
//! │  Nl80211     │──────────────────────▶│ genl ctrl    │
//! │  (family id) │◀──────────────────────│ (kernel)     │
//! └──────┬───────┘                       └──────────────┘
//!        │ NL80211_CMD_TESTMODE + ACK
//!        ▼
//! ┌──────────────┐  reply(TESTDATA)*  ACK ┌──────────────┐
//! │  recv loop   │◀──────────────────────│ wl12xx/18xx  │
//! └──────────────┘                       └──────────────┘
//! ```

pub mod codec;
pub mod socket;

use wl_chip::nl80211::{self, genl, nlmsg};

use crate::error::{CalError, Result};
use crate::target::Target;
use codec::{find_attr, parse_frames, MessageBuilder};
use socket::NlSocket;

/// Generic netlink connection: socket plus request/ACK loop
#[derive(Debug)]
pub struct GenlConnection {
    sock: NlSocket,
}

impl GenlConnection {
    /// Open a new connection
    ///
    /// # Errors
    ///
    /// Returns error if the socket cannot be created.
    pub fn open() -> Result<Self> {
        Ok(Self {
            sock: NlSocket::open()?,
        })
    }

    /// Send a request and collect the payloads of every reply of type
    /// `family` until the kernel ACKs.
    ///
    /// # Errors
    ///
    /// Returns `CalError::Errno` when the kernel rejects the request and
    /// `CalError::Netlink` on malformed replies.
    pub fn request(&mut self, msg: MessageBuilder, family: u16) -> Result<Vec<Vec<u8>>> {
        let seq = self.sock.next_seq();
        let bytes = msg.seq(seq).finish()?;
        self.sock.send(&bytes)?;

        let mut replies = Vec::new();
        loop {
            let datagram = self.sock.recv()?;
            if datagram.is_empty() {
                return Err(CalError::netlink("socket closed before ACK"));
            }
            if absorb(&datagram, seq, family, &mut replies)? {
                return Ok(replies);
            }
        }
    }

    /// Resolve a generic netlink family name to its id
    ///
    /// # Errors
    ///
    /// Returns error if the family is not registered.
    pub fn resolve_family(&mut self, name: &str) -> Result<u16> {
        let mut msg =
            MessageBuilder::new(genl::ID_CTRL, genl::CTRL_CMD_GETFAMILY, genl::CTRL_VERSION);
        msg.attrs().put_str(genl::CTRL_ATTR_FAMILY_NAME, name);

        let replies = self.request(msg, genl::ID_CTRL)?;
        for payload in &replies {
            let frame_attrs = genl_payload_attrs(payload)?;
            if let Some(id) = find_attr(&frame_attrs, genl::CTRL_ATTR_FAMILY_ID) {
                let id = id.as_u16()?;
                tracing::debug!("Resolved genl family {name} -> {id}");
                return Ok(id);
            }
        }

        Err(CalError::netlink(format!("family {name} not found")))
    }
}

/// nl80211 testmode transport
#[derive(Debug)]
pub struct Nl80211 {
    conn: GenlConnection,
    family: u16,
}

impl Nl80211 {
    /// Open a connection and resolve the nl80211 family
    ///
    /// # Errors
    ///
    /// Returns error if netlink is unavailable or nl80211 is not registered.
    pub fn connect() -> Result<Self> {
        let mut conn = GenlConnection::open()?;
        let family = conn.resolve_family(nl80211::FAMILY_NAME)?;
        tracing::info!("Connected to nl80211 (family {family})");
        Ok(Self { conn, family })
    }

    /// Send `NL80211_CMD_TESTMODE` carrying `testdata` (an encoded attribute
    /// stream) and return the `TESTDATA` of the driver's reply, if any.
    ///
    /// # Errors
    ///
    /// Returns error if the target is missing, the kernel rejects the
    /// request, or the reply is malformed.
    pub fn testmode(&mut self, target: &Target, testdata: &[u8]) -> Result<Option<Vec<u8>>> {
        let msg = build_testmode(self.family, target, testdata)?;
        let replies = self.conn.request(msg, self.family)?;

        for payload in &replies {
            let attrs = genl_payload_attrs(payload)?;
            if let Some(data) = find_attr(&attrs, nl80211::ATTR_TESTDATA) {
                return Ok(Some(data.value.to_vec()));
            }
        }

        Ok(None)
    }
}

/// Build the `NL80211_CMD_TESTMODE` request for `target`
///
/// # Errors
///
/// Returns `CalError::Usage` if `target` names no device.
pub fn build_testmode(family: u16, target: &Target, testdata: &[u8]) -> Result<MessageBuilder> {
    let mut msg = MessageBuilder::new(family, nl80211::CMD_TESTMODE, 0);
    match target {
        Target::Phy { index, .. } => {
            msg.attrs().put_u32(nl80211::ATTR_WIPHY, *index);
        }
        Target::Netdev { ifindex, .. } => {
            msg.attrs().put_u32(nl80211::ATTR_IFINDEX, *ifindex);
        }
        Target::None => {
            return Err(CalError::usage("testmode command needs `dev <name>` or `phy <name>`"))
        }
    }

    msg.attrs().put_nested_raw(nl80211::ATTR_TESTDATA, testdata);
    Ok(msg)
}

/// Fold one received datagram into `replies`
///
/// Payloads of `family` frames answering `seq` are collected; frames for
/// other sequence numbers are skipped. Returns `true` once the kernel has
/// ACKed the request or ended the dump.
///
/// # Errors
///
/// Returns `CalError::Errno` on a NACK and `CalError::Netlink` on
/// malformed frames.
fn absorb(datagram: &[u8], seq: u32, family: u16, replies: &mut Vec<Vec<u8>>) -> Result<bool> {
    for frame in parse_frames(datagram)? {
        if frame.header.seq != seq {
            tracing::debug!(
                "Skipping stale netlink frame (seq {} != {seq})",
                frame.header.seq
            );
            continue;
        }

        match frame.header.ty {
            nlmsg::ERROR => {
                let code = frame.error_code()?;
                if code == 0 {
                    return Ok(true);
                }
                tracing::debug!("Kernel NACK for seq {seq}: {code}");
                return Err(CalError::Errno { errno: -code });
            }
            nlmsg::DONE => return Ok(true),
            nlmsg::NOOP => {}
            ty if ty == family => replies.push(frame.payload.to_vec()),
            ty => tracing::debug!("Ignoring netlink frame of type {ty}"),
        }
    }
    Ok(false)
}

fn genl_payload_attrs(payload: &[u8]) -> Result<Vec<codec::Attr<'_>>> {
    if payload.len() < genl::HDR_LEN {
        return Err(CalError::netlink("generic netlink header truncated"));
    }
    codec::parse_attrs(&payload[genl::HDR_LEN..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::{BufMut, BytesMut};
    use codec::{parse_attrs, AttrWriter};

    const FAMILY: u16 = 0x1c;

    /// Driver reply to `seq` carrying `TESTDATA`
    fn reply(seq: u32, testdata: &[u8]) -> Vec<u8> {
        let mut msg = MessageBuilder::new(FAMILY, nl80211::CMD_TESTMODE, 0).seq(seq);
        msg.attrs().put_nested_raw(nl80211::ATTR_TESTDATA, testdata);
        msg.finish().unwrap().to_vec()
    }

    /// Bare control frame (`NLMSG_ERROR` with `code`, or `NLMSG_DONE`)
    fn control(ty: u16, seq: u32, code: i32) -> Vec<u8> {
        let mut buf = BytesMut::new();
        buf.put_u32_le(20);
        buf.put_u16_le(ty);
        buf.put_u16_le(0);
        buf.put_u32_le(seq);
        buf.put_u32_le(0);
        buf.put_i32_le(code);
        buf.to_vec()
    }

    #[test]
    fn reply_then_ack_completes() {
        let mut datagram = reply(8, &[1, 2, 3, 4]);
        datagram.extend(control(nlmsg::ERROR, 8, 0));

        let mut replies = Vec::new();
        assert!(absorb(&datagram, 8, FAMILY, &mut replies).unwrap());
        assert_eq!(replies.len(), 1);
        let attrs = genl_payload_attrs(&replies[0]).unwrap();
        let data = find_attr(&attrs, nl80211::ATTR_TESTDATA).unwrap();
        assert_eq!(data.value, &[1, 2, 3, 4]);
    }

    #[test]
    fn reply_without_ack_waits_for_more() {
        let mut replies = Vec::new();
        assert!(!absorb(&reply(8, &[]), 8, FAMILY, &mut replies).unwrap());
        assert_eq!(replies.len(), 1);
        let done = control(nlmsg::DONE, 8, 0);
        assert!(absorb(&done, 8, FAMILY, &mut replies).unwrap());
        assert_eq!(replies.len(), 1);
    }

    #[test]
    fn stale_sequence_is_skipped() {
        let mut datagram = reply(7, &[9]);
        datagram.extend(control(nlmsg::ERROR, 7, -95));

        let mut replies = Vec::new();
        assert!(!absorb(&datagram, 8, FAMILY, &mut replies).unwrap());
        assert!(replies.is_empty());
    }

    #[test]
    fn nack_becomes_errno() {
        let mut replies = Vec::new();
        let nack = control(nlmsg::ERROR, 8, -95);
        let err = absorb(&nack, 8, FAMILY, &mut replies).unwrap_err();
        assert!(matches!(err, CalError::Errno { errno: 95 }));
        assert_eq!(err.exit_code(), -95);
    }

    #[test]
    fn other_families_are_ignored() {
        let mut datagram = reply(8, &[1]);
        datagram.extend(control(nlmsg::ERROR, 8, 0));

        let mut replies = Vec::new();
        assert!(absorb(&datagram, 8, genl::ID_CTRL, &mut replies).unwrap());
        assert!(replies.is_empty());
    }

    #[test]
    fn testmode_request_by_ifindex() {
        let mut inner = AttrWriter::new();
        inner.put_u32(1, 5);
        let target = Target::Netdev {
            ifindex: 4,
            name: "wlan0".into(),
        };
        let bytes = build_testmode(0x1c, &target, inner.as_bytes())
            .unwrap()
            .finish()
            .unwrap();

        let frames = parse_frames(&bytes).unwrap();
        let attrs = frames[0].genl_attrs().unwrap();
        let ifindex = find_attr(&attrs, nl80211::ATTR_IFINDEX).unwrap();
        assert_eq!(ifindex.as_u32().unwrap(), 4);
        let data = find_attr(&attrs, nl80211::ATTR_TESTDATA).unwrap();
        assert!(data.nested);
        let nested = parse_attrs(data.value).unwrap();
        assert_eq!(nested[0].as_u32().unwrap(), 5);
    }

    #[test]
    fn testmode_request_by_wiphy() {
        let target = Target::Phy {
            index: 2,
            name: "phy2".into(),
        };
        let bytes = build_testmode(0x1c, &target, &[]).unwrap().finish().unwrap();
        let frames = parse_frames(&bytes).unwrap();
        let attrs = frames[0].genl_attrs().unwrap();
        let wiphy = find_attr(&attrs, nl80211::ATTR_WIPHY).unwrap();
        assert_eq!(wiphy.as_u32().unwrap(), 2);
        assert!(find_attr(&attrs, nl80211::ATTR_IFINDEX).is_none());
    }

    #[test]
    fn testmode_without_device_is_usage_error() {
        let err = build_testmode(0x1c, &Target::None, &[]).unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    #[ignore] // Requires nl80211 in the running kernel
    fn resolve_nl80211_family() {
        let nl = Nl80211::connect().expect("nl80211 available");
        println!("✅ nl80211 family {}", nl.family);
    }
}
