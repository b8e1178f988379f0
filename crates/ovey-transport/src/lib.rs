//! Datagram channel to the kernel's generic netlink multiplexer.
//!
//! This is the lowest layer of the Ovey control client. It moves whole
//! netlink datagrams between user space and the kernel and knows nothing
//! about their contents. Everything else builds on top of the
//! [`NetlinkTransport`] trait provided here.
//!
//! On Linux, [`NetlinkSocket`] is the real channel, built on `netlink-sys`.
//! Tests substitute an in-memory implementation of the same trait.

pub mod error;
pub mod traits;

#[cfg(target_os = "linux")]
pub mod netlink;

pub use error::{Result, TransportError};
pub use traits::NetlinkTransport;

#[cfg(target_os = "linux")]
pub use netlink::NetlinkSocket;
