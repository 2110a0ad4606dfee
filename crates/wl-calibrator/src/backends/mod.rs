//! Testmode backend implementations

pub mod netlink;
pub mod scripted;

pub use netlink::NetlinkBackend;
pub use scripted::ScriptedBackend;
