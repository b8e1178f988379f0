use std::fmt;

use ovey_genl::GenlError;
use ovey_netlink::{DecodeError, EncodeError};
use ovey_transport::TransportError;

/// Errors establishing a [`Link`](crate::Link).
///
/// Whatever the variant, the channel opened for the attempt has already been
/// released when this error is returned.
#[derive(Debug, thiserror::Error)]
pub enum DialError {
    /// Generic netlink cannot be used on this host.
    #[error("generic netlink unavailable: {0}")]
    TransportUnavailable(#[source] TransportError),

    /// The family is not registered; usually the kernel module is not loaded.
    #[error("{0:?} family not available")]
    FamilyNotFound(String),

    /// The controller query failed for another reason.
    #[error("failed to query family {name:?}: {source}")]
    FamilyQueryFailed {
        name: String,
        #[source]
        source: GenlError,
    },
}

/// Errors returned by OCP operations.
///
/// Each variant names the phase the operation was in when it failed.
#[derive(Debug, thiserror::Error)]
pub enum OcpError {
    #[error("failed to dial generic netlink: {0}")]
    Dial(#[from] DialError),

    #[error("encoding failed: {0}")]
    Encode(#[from] EncodeError),

    #[error("failed to send a message: {0}")]
    Send(#[from] GenlError),

    #[error("failed to decode reply: {0}")]
    Decode(#[from] DecodeError),
}

/// Step of an operation at which it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Dial,
    Encode,
    Send,
    Decode,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Dial => "dial",
            Phase::Encode => "encode",
            Phase::Send => "send",
            Phase::Decode => "decode",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure categories callers can act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The netlink socket layer is not usable.
    TransportUnavailable,
    /// The kernel module is not loaded.
    FamilyNotFound,
    /// Family discovery failed for a reason other than absence.
    FamilyQueryFailed,
    /// An attribute could not be serialized.
    EncodingError,
    /// A reply was malformed.
    DecodingError,
    /// Send or receive failed, or the kernel reported an error.
    TransportError,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::TransportUnavailable => "transport_unavailable",
            ErrorKind::FamilyNotFound => "family_not_found",
            ErrorKind::FamilyQueryFailed => "family_query_failed",
            ErrorKind::EncodingError => "encoding_error",
            ErrorKind::DecodingError => "decoding_error",
            ErrorKind::TransportError => "transport_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DialError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DialError::TransportUnavailable(_) => ErrorKind::TransportUnavailable,
            DialError::FamilyNotFound(_) => ErrorKind::FamilyNotFound,
            DialError::FamilyQueryFailed { .. } => ErrorKind::FamilyQueryFailed,
        }
    }
}

impl OcpError {
    pub fn phase(&self) -> Phase {
        match self {
            OcpError::Dial(_) => Phase::Dial,
            OcpError::Encode(_) => Phase::Encode,
            OcpError::Send(_) => Phase::Send,
            OcpError::Decode(_) => Phase::Decode,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            OcpError::Dial(err) => err.kind(),
            OcpError::Encode(_) => ErrorKind::EncodingError,
            OcpError::Send(GenlError::Decode(_)) => ErrorKind::DecodingError,
            OcpError::Send(_) => ErrorKind::TransportError,
            OcpError::Decode(_) => ErrorKind::DecodingError,
        }
    }

    /// Errno reported by the kernel, if any.
    pub fn errno(&self) -> Option<i32> {
        match self {
            OcpError::Send(err) => err.errno(),
            OcpError::Dial(DialError::FamilyQueryFailed { source, .. }) => source.errno(),
            _ => None,
        }
    }

    /// The exchange gave up waiting for the kernel.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            OcpError::Send(GenlError::Transport(TransportError::Timeout(_)))
                | OcpError::Dial(DialError::FamilyQueryFailed {
                    source: GenlError::Transport(TransportError::Timeout(_)),
                    ..
                })
        )
    }

    /// The kernel refused to create a device because the name is taken.
    pub fn is_device_exists(&self) -> bool {
        matches!(self, OcpError::Send(_)) && self.errno() == Some(libc::EEXIST)
    }

    /// The kernel knows no device by the given name.
    pub fn is_no_such_device(&self) -> bool {
        matches!(self, OcpError::Send(_))
            && matches!(self.errno(), Some(libc::ENODEV) | Some(libc::ENOENT))
    }
}

pub type Result<T> = std::result::Result<T, OcpError>;
