use bytes::Bytes;
use ovey_genl::GenlError;
use ovey_netlink::{GenlPayload, HeaderFlags};
use ovey_transport::NetlinkTransport;

use crate::link::Link;
use crate::properties::OveyOperation;

/// One command exchanged over a [`Link`].
///
/// The request borrows the link, so the link outlives it. A request runs at
/// most once: a second [`execute`](Self::execute) returns
/// [`GenlError::AlreadyExecuted`] without touching the channel.
pub struct Request<'a, T> {
    link: &'a mut Link<T>,
    operation: OveyOperation,
    message: GenlPayload,
    flags: HeaderFlags,
    executed: bool,
}

impl<'a, T: NetlinkTransport> Request<'a, T> {
    pub(crate) fn new(link: &'a mut Link<T>, operation: OveyOperation, payload: Bytes) -> Self {
        let version = link.family().version;
        Self {
            link,
            operation,
            message: GenlPayload::new(operation.code(), version, payload),
            flags: HeaderFlags::REQUEST | HeaderFlags::ACK,
            executed: false,
        }
    }

    /// Replace the header flags. `REQUEST` is always kept.
    ///
    /// Without `ACK`, a command the kernel answers with no message never
    /// completes until the receive timeout expires.
    pub fn with_flags(mut self, flags: HeaderFlags) -> Self {
        self.flags = flags | HeaderFlags::REQUEST;
        self
    }

    pub fn operation(&self) -> OveyOperation {
        self.operation
    }

    pub fn flags(&self) -> HeaderFlags {
        self.flags
    }

    /// Send the command and wait for the complete reply set.
    pub fn execute(&mut self) -> Result<Vec<GenlPayload>, GenlError> {
        if self.executed {
            return Err(GenlError::AlreadyExecuted);
        }
        self.executed = true;

        let family = self.link.family().id;
        self.link
            .conn_mut()
            .execute(family, self.message.clone(), self.flags)
    }
}

impl<T> std::fmt::Debug for Request<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("operation", &self.operation)
            .field("flags", &self.flags)
            .field("executed", &self.executed)
            .finish()
    }
}
