/// Errors that can occur during a generic netlink exchange.
#[derive(Debug, thiserror::Error)]
pub enum GenlError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] ovey_transport::TransportError),

    /// A reply could not be parsed.
    #[error("decode error: {0}")]
    Decode(#[from] ovey_netlink::DecodeError),

    /// The kernel answered with a negative error code.
    #[error("kernel reported errno {errno}: {}", errno_message(.errno))]
    Kernel { errno: i32 },

    /// The controller does not know the requested family.
    #[error("family {0:?} not found")]
    FamilyNotFound(String),

    /// A reply does not belong to the outstanding request.
    #[error("reply sequence {got} does not match request sequence {expected}")]
    SequenceMismatch { expected: u32, got: u32 },

    /// A reply was addressed to another port.
    #[error("reply port {got} does not match local port {expected}")]
    PortMismatch { expected: u32, got: u32 },

    /// A reply carried an unexpected message type.
    #[error("unexpected reply type {got:#06x} (expected {expected:#06x})")]
    UnexpectedReply { expected: u16, got: u16 },

    /// The kernel dropped part of a multi-part reply.
    #[error("reply overrun")]
    Overrun,

    /// A reply lacks a required attribute.
    #[error("reply is missing attribute {0}")]
    MissingAttribute(&'static str),

    /// The exchange for this request has already run.
    #[error("request already executed")]
    AlreadyExecuted,
}

impl GenlError {
    /// The kernel errno, if the kernel reported this error.
    pub fn errno(&self) -> Option<i32> {
        match self {
            GenlError::Kernel { errno } => Some(*errno),
            _ => None,
        }
    }
}

fn errno_message(errno: &i32) -> String {
    std::io::Error::from_raw_os_error(*errno).to_string()
}

pub type Result<T> = std::result::Result<T, GenlError>;
