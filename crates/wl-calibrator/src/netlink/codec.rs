//! Generic netlink message encoding and decoding
//!
//! Messages are `nlmsghdr | genlmsghdr | attributes`. Attributes are
//! `nlattr` TLVs padded to 4 bytes; nested attributes carry another
//! attribute stream as their value. All integers are host (little) endian.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use wl_chip::nl80211::{align, genl, nla, nlmsg};

use crate::error::{CalError, Result};

/// Attribute stream writer
#[derive(Debug, Default)]
pub struct AttrWriter {
    buf: BytesMut,
}

impl AttrWriter {
    /// Create an empty attribute stream
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a raw attribute
    pub fn put_bytes(&mut self, ty: u16, value: &[u8]) -> &mut Self {
        let len = nla::HDR_LEN + value.len();
        self.buf.put_u16_le(attr_len(len));
        self.buf.put_u16_le(ty);
        self.buf.put_slice(value);
        self.pad();
        self
    }

    /// Append a `u8` attribute
    pub fn put_u8(&mut self, ty: u16, value: u8) -> &mut Self {
        self.put_bytes(ty, &[value])
    }

    /// Append a `u16` attribute
    pub fn put_u16(&mut self, ty: u16, value: u16) -> &mut Self {
        self.put_bytes(ty, &value.to_le_bytes())
    }

    /// Append a `u32` attribute
    pub fn put_u32(&mut self, ty: u16, value: u32) -> &mut Self {
        self.put_bytes(ty, &value.to_le_bytes())
    }

    /// Append a NUL-terminated string attribute
    pub fn put_str(&mut self, ty: u16, value: &str) -> &mut Self {
        let mut raw = Vec::with_capacity(value.len() + 1);
        raw.extend_from_slice(value.as_bytes());
        raw.push(0);
        self.put_bytes(ty, &raw)
    }

    /// Append a nested attribute whose value is another attribute stream
    pub fn put_nested(&mut self, ty: u16, inner: &AttrWriter) -> &mut Self {
        self.put_nested_raw(ty, &inner.buf)
    }

    /// Append a nested attribute from an already encoded attribute stream
    pub fn put_nested_raw(&mut self, ty: u16, encoded: &[u8]) -> &mut Self {
        self.put_bytes(ty | nla::F_NESTED, encoded)
    }

    /// Encoded bytes so far
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consume the writer
    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }

    fn pad(&mut self) {
        let padded = align(self.buf.len());
        self.buf.resize(padded, 0);
    }
}

/// Netlink header of a received or built message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NlMsgHeader {
    /// Total length including this header
    pub len: u32,
    /// Message type (family id for generic netlink)
    pub ty: u16,
    /// `NLM_F_*` flags
    pub flags: u16,
    /// Sequence number
    pub seq: u32,
    /// Sender port id
    pub pid: u32,
}

/// Generic netlink request builder
#[derive(Debug)]
pub struct MessageBuilder {
    ty: u16,
    flags: u16,
    seq: u32,
    cmd: u8,
    version: u8,
    attrs: AttrWriter,
}

impl MessageBuilder {
    /// Start a request to `family` with command `cmd`
    pub fn new(family: u16, cmd: u8, version: u8) -> Self {
        Self {
            ty: family,
            flags: nlmsg::F_REQUEST | nlmsg::F_ACK,
            seq: 0,
            cmd,
            version,
            attrs: AttrWriter::new(),
        }
    }

    /// Set the sequence number
    pub fn seq(mut self, seq: u32) -> Self {
        self.seq = seq;
        self
    }

    /// Attribute stream of the request
    pub fn attrs(&mut self) -> &mut AttrWriter {
        &mut self.attrs
    }

    /// Encode the complete message
    ///
    /// # Errors
    ///
    /// Returns error if the message does not fit a `u32` length.
    pub fn finish(self) -> Result<Bytes> {
        let total = nlmsg::HDR_LEN + genl::HDR_LEN + self.attrs.as_bytes().len();
        let len = u32::try_from(total)
            .map_err(|_| CalError::netlink(format!("message too large ({total} bytes)")))?;

        let mut buf = BytesMut::with_capacity(total);
        buf.put_u32_le(len);
        buf.put_u16_le(self.ty);
        buf.put_u16_le(self.flags);
        buf.put_u32_le(self.seq);
        buf.put_u32_le(0);
        buf.put_u8(self.cmd);
        buf.put_u8(self.version);
        buf.put_u16_le(0);
        buf.put_slice(self.attrs.as_bytes());
        Ok(buf.freeze())
    }
}

/// One netlink message inside a datagram
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    /// Netlink header
    pub header: NlMsgHeader,
    /// Everything after the netlink header
    pub payload: &'a [u8],
}

impl<'a> Frame<'a> {
    /// Attributes after the generic netlink header
    ///
    /// # Errors
    ///
    /// Returns error if the payload is shorter than a `genlmsghdr` or the
    /// attribute stream is malformed.
    pub fn genl_attrs(&self) -> Result<Vec<Attr<'a>>> {
        if self.payload.len() < genl::HDR_LEN {
            return Err(CalError::netlink("generic netlink header truncated"));
        }
        parse_attrs(&self.payload[genl::HDR_LEN..])
    }

    /// Error code carried by an `NLMSG_ERROR` frame (0 means ACK)
    ///
    /// # Errors
    ///
    /// Returns error if the frame is not an error frame or is truncated.
    pub fn error_code(&self) -> Result<i32> {
        if self.header.ty != nlmsg::ERROR {
            return Err(CalError::netlink("not an error frame"));
        }
        if self.payload.len() < 4 {
            return Err(CalError::netlink("error frame truncated"));
        }
        let mut p = self.payload;
        Ok(p.get_i32_le())
    }
}

/// Split a datagram into netlink messages
///
/// # Errors
///
/// Returns error on truncated headers or lengths pointing past the buffer.
pub fn parse_frames(buf: &[u8]) -> Result<Vec<Frame<'_>>> {
    let mut frames = Vec::new();
    let mut rest = buf;

    while !rest.is_empty() {
        if rest.len() < nlmsg::HDR_LEN {
            return Err(CalError::netlink(format!(
                "trailing {} bytes shorter than a header",
                rest.len()
            )));
        }

        let mut hdr = &rest[..nlmsg::HDR_LEN];
        let header = NlMsgHeader {
            len: hdr.get_u32_le(),
            ty: hdr.get_u16_le(),
            flags: hdr.get_u16_le(),
            seq: hdr.get_u32_le(),
            pid: hdr.get_u32_le(),
        };

        let len = header.len as usize;
        if len < nlmsg::HDR_LEN || len > rest.len() {
            return Err(CalError::netlink(format!(
                "message length {len} invalid ({} bytes left)",
                rest.len()
            )));
        }

        frames.push(Frame {
            header,
            payload: &rest[nlmsg::HDR_LEN..len],
        });

        rest = &rest[align(len).min(rest.len())..];
    }

    Ok(frames)
}

/// Decoded attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attr<'a> {
    /// Attribute type with flag bits stripped
    pub ty: u16,
    /// Whether the nested flag was set
    pub nested: bool,
    /// Attribute value
    pub value: &'a [u8],
}

impl<'a> Attr<'a> {
    /// Value as `u8`
    ///
    /// # Errors
    ///
    /// Returns error if the value is empty.
    pub fn as_u8(&self) -> Result<u8> {
        self.value
            .first()
            .copied()
            .ok_or_else(|| CalError::netlink(format!("attribute {} empty", self.ty)))
    }

    /// Value as little-endian `u16`
    ///
    /// # Errors
    ///
    /// Returns error if the value is shorter than 2 bytes.
    pub fn as_u16(&self) -> Result<u16> {
        self.fixed::<2>().map(u16::from_le_bytes)
    }

    /// Value as little-endian `u32`
    ///
    /// # Errors
    ///
    /// Returns error if the value is shorter than 4 bytes.
    pub fn as_u32(&self) -> Result<u32> {
        self.fixed::<4>().map(u32::from_le_bytes)
    }

    /// Parse the value as a nested attribute stream
    ///
    /// # Errors
    ///
    /// Returns error if the nested stream is malformed.
    pub fn nested_attrs(&self) -> Result<Vec<Attr<'a>>> {
        parse_attrs(self.value)
    }

    fn fixed<const N: usize>(&self) -> Result<[u8; N]> {
        self.value
            .get(..N)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| {
                CalError::netlink(format!(
                    "attribute {} has {} bytes, need {N}",
                    self.ty,
                    self.value.len()
                ))
            })
    }
}

/// Decode an attribute stream
///
/// # Errors
///
/// Returns error on truncated attributes.
pub fn parse_attrs(buf: &[u8]) -> Result<Vec<Attr<'_>>> {
    let mut attrs = Vec::new();
    let mut rest = buf;

    while rest.len() >= nla::HDR_LEN {
        let mut hdr = &rest[..nla::HDR_LEN];
        let len = hdr.get_u16_le() as usize;
        let raw_ty = hdr.get_u16_le();

        if len < nla::HDR_LEN || len > rest.len() {
            return Err(CalError::netlink(format!(
                "attribute length {len} invalid ({} bytes left)",
                rest.len()
            )));
        }

        attrs.push(Attr {
            ty: raw_ty & nla::TYPE_MASK,
            nested: raw_ty & nla::F_NESTED != 0,
            value: &rest[nla::HDR_LEN..len],
        });

        rest = &rest[align(len).min(rest.len())..];
    }

    if !rest.is_empty() {
        return Err(CalError::netlink("attribute stream has trailing bytes"));
    }

    Ok(attrs)
}

/// First attribute of type `ty`
pub fn find_attr<'a>(attrs: &[Attr<'a>], ty: u16) -> Option<Attr<'a>> {
    attrs.iter().find(|a| a.ty == ty).copied()
}

#[allow(clippy::cast_possible_truncation)]
fn attr_len(len: usize) -> u16 {
    // nla_len is 16 bits; callers never build attributes near that limit
    len.min(usize::from(u16::MAX)) as u16
}
