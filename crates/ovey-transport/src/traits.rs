use std::time::Duration;

use bytes::Bytes;

use crate::error::Result;

/// A bidirectional datagram channel to the netlink multiplexer.
///
/// Each `send` hands one complete datagram (one or more netlink messages) to
/// the kernel. Each `recv` blocks until one complete datagram is available.
/// The channel is released when the value is dropped.
pub trait NetlinkTransport {
    /// Send one datagram.
    fn send(&mut self, datagram: &[u8]) -> Result<()>;

    /// Receive one datagram (blocking, subject to the receive timeout).
    fn recv(&mut self) -> Result<Bytes>;

    /// Port id the kernel assigned to this channel.
    fn local_port(&self) -> u32;

    /// Set or clear the receive timeout.
    fn set_recv_timeout(&mut self, timeout: Option<Duration>) -> Result<()>;
}

impl<T: NetlinkTransport + ?Sized> NetlinkTransport for Box<T> {
    fn send(&mut self, datagram: &[u8]) -> Result<()> {
        (**self).send(datagram)
    }

    fn recv(&mut self) -> Result<Bytes> {
        (**self).recv()
    }

    fn local_port(&self) -> u32 {
        (**self).local_port()
    }

    fn set_recv_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        (**self).set_recv_timeout(timeout)
    }
}
