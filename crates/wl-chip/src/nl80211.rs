//! nl80211 and generic-netlink constants used by the testmode path.
//!
//! Values are the Linux UAPI ones (`linux/netlink.h`, `linux/genetlink.h`,
//! `linux/nl80211.h`).

/// Generic netlink family name of nl80211.
pub const FAMILY_NAME: &str = "nl80211";

/// `NL80211_CMD_TESTMODE`.
pub const CMD_TESTMODE: u8 = 45;

/// `NL80211_ATTR_WIPHY` (`u32`).
pub const ATTR_WIPHY: u16 = 1;

/// `NL80211_ATTR_IFINDEX` (`u32`).
pub const ATTR_IFINDEX: u16 = 3;

/// `NL80211_ATTR_TESTDATA` (nested, driver specific).
pub const ATTR_TESTDATA: u16 = 69;

/// Netlink header constants.
pub mod nlmsg {
    /// Size of `struct nlmsghdr`.
    pub const HDR_LEN: usize = 16;
    /// Message and attribute alignment.
    pub const ALIGNTO: usize = 4;
    /// No-op.
    pub const NOOP: u16 = 1;
    /// Error / ACK.
    pub const ERROR: u16 = 2;
    /// End of a multipart dump.
    pub const DONE: u16 = 3;
    /// Request flag.
    pub const F_REQUEST: u16 = 0x01;
    /// Part of a multipart message.
    pub const F_MULTI: u16 = 0x02;
    /// Ask for an ACK.
    pub const F_ACK: u16 = 0x04;
}

/// Netlink attribute constants.
pub mod nla {
    /// Size of `struct nlattr`.
    pub const HDR_LEN: usize = 4;
    /// Nested flag on the attribute type.
    pub const F_NESTED: u16 = 1 << 15;
    /// Network-byte-order flag on the attribute type.
    pub const F_NET_BYTEORDER: u16 = 1 << 14;
    /// Mask stripping both flags.
    pub const TYPE_MASK: u16 = !(F_NESTED | F_NET_BYTEORDER);
}

/// Generic netlink controller.
pub mod genl {
    /// Size of `struct genlmsghdr`.
    pub const HDR_LEN: usize = 4;
    /// Family id of the controller itself.
    pub const ID_CTRL: u16 = 0x10;
    /// `CTRL_CMD_GETFAMILY`.
    pub const CTRL_CMD_GETFAMILY: u8 = 3;
    /// `CTRL_ATTR_FAMILY_ID` (`u16`).
    pub const CTRL_ATTR_FAMILY_ID: u16 = 1;
    /// `CTRL_ATTR_FAMILY_NAME` (string).
    pub const CTRL_ATTR_FAMILY_NAME: u16 = 2;
    /// Controller protocol version.
    pub const CTRL_VERSION: u8 = 1;
}

/// Round `len` up to netlink alignment.
#[must_use]
pub const fn align(len: usize) -> usize {
    (len + nlmsg::ALIGNTO - 1) & !(nlmsg::ALIGNTO - 1)
}
