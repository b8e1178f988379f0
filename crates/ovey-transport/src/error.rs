/// Errors that can occur on a netlink channel.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The generic netlink multiplexer cannot be used on this host.
    #[error("generic netlink unavailable: {0}")]
    Unavailable(std::io::Error),

    /// Failed to bind the socket to a local port.
    #[error("failed to bind netlink socket: {0}")]
    Bind(std::io::Error),

    /// Failed to send a datagram to the kernel.
    #[error("failed to send netlink datagram: {0}")]
    Send(std::io::Error),

    /// Failed to receive a datagram from the kernel.
    #[error("failed to receive netlink datagram: {0}")]
    Recv(std::io::Error),

    /// The kernel accepted fewer bytes than the datagram holds.
    #[error("short send ({sent} of {len} bytes)")]
    ShortSend { sent: usize, len: usize },

    /// No datagram arrived within the configured receive timeout.
    #[error("receive timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Any other I/O error on the channel.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
