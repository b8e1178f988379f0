use std::io;
use std::os::fd::{AsRawFd, BorrowedFd};
use std::time::Duration;

use bytes::Bytes;
use netlink_sys::{protocols::NETLINK_GENERIC, Socket, SocketAddr};
use socket2::SockRef;
use tracing::{debug, trace};

use crate::error::{Result, TransportError};
use crate::traits::NetlinkTransport;

/// Shortest timeout the socket can express. A zero `timeval` means "block
/// forever", so anything shorter is rounded up to this.
const MIN_RECV_TIMEOUT: Duration = Duration::from_micros(1);

/// Longest timeout accepted. Fits the seconds field of any `timeval`.
const MAX_RECV_TIMEOUT: Duration = Duration::from_secs(i32::MAX as u64);

/// `NETLINK_GENERIC` datagram socket.
///
/// The kernel assigns the local port id at bind time. The socket is owned by
/// this value and closed exactly once when it is dropped.
pub struct NetlinkSocket {
    socket: Socket,
    port: u32,
    recv_timeout: Option<Duration>,
}

impl NetlinkSocket {
    /// Open a socket bound to the generic netlink multiplexer.
    pub fn connect() -> Result<Self> {
        let mut socket = Socket::new(NETLINK_GENERIC).map_err(TransportError::Unavailable)?;
        let local = socket.bind_auto().map_err(TransportError::Bind)?;
        socket
            .connect(&SocketAddr::new(0, 0))
            .map_err(TransportError::Bind)?;

        let port = local.port_number();
        debug!(port, "opened generic netlink socket");

        Ok(Self {
            socket,
            port,
            recv_timeout: None,
        })
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        "netlink-generic"
    }

    /// Returns `None` when the call should be retried.
    fn classify_recv_error(&self, err: io::Error) -> Option<TransportError> {
        match err.kind() {
            io::ErrorKind::Interrupted => None,
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => Some(TransportError::Timeout(
                self.recv_timeout.unwrap_or_default(),
            )),
            _ => Some(TransportError::Recv(err)),
        }
    }
}

impl NetlinkTransport for NetlinkSocket {
    fn send(&mut self, datagram: &[u8]) -> Result<()> {
        loop {
            match self.socket.send(datagram, 0) {
                Ok(sent) if sent == datagram.len() => {
                    trace!(len = sent, "sent netlink datagram");
                    return Ok(());
                }
                Ok(sent) => {
                    return Err(TransportError::ShortSend {
                        sent,
                        len: datagram.len(),
                    })
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Send(err)),
            }
        }
    }

    fn recv(&mut self) -> Result<Bytes> {
        loop {
            match self.socket.recv_from_full() {
                Ok((buf, from)) => {
                    trace!(
                        len = buf.len(),
                        from = from.port_number(),
                        "received netlink datagram"
                    );
                    return Ok(Bytes::from(buf));
                }
                Err(err) => {
                    if let Some(err) = self.classify_recv_error(err) {
                        return Err(err);
                    }
                }
            }
        }
    }

    fn local_port(&self) -> u32 {
        self.port
    }

    fn set_recv_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        let timeout = clamp_timeout(timeout);
        // SAFETY: the descriptor belongs to `self.socket`, which outlives this borrow.
        let fd = unsafe { BorrowedFd::borrow_raw(self.socket.as_raw_fd()) };
        SockRef::from(&fd)
            .set_read_timeout(timeout)
            .map_err(TransportError::Io)?;
        self.recv_timeout = timeout;
        Ok(())
    }
}

/// Keep a requested timeout inside what `SO_RCVTIMEO` can represent.
fn clamp_timeout(timeout: Option<Duration>) -> Option<Duration> {
    timeout.map(|d| d.clamp(MIN_RECV_TIMEOUT, MAX_RECV_TIMEOUT))
}

impl Drop for NetlinkSocket {
    fn drop(&mut self) {
        debug!(port = self.port, "closing generic netlink socket");
    }
}

impl std::fmt::Debug for NetlinkSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetlinkSocket")
            .field("port", &self.port)
            .field("recv_timeout", &self.recv_timeout)
            .finish()
    }
}
