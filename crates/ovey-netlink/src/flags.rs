use bitflags::bitflags;
use netlink_packet_core::{
    NLM_F_ACK, NLM_F_ATOMIC, NLM_F_DUMP, NLM_F_DUMP_FILTERED, NLM_F_DUMP_INTR, NLM_F_ECHO,
    NLM_F_MATCH, NLM_F_MULTIPART, NLM_F_REQUEST, NLM_F_ROOT,
};

bitflags! {
    /// Netlink header flag bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct HeaderFlags: u16 {
        /// The message is a request.
        const REQUEST = NLM_F_REQUEST;
        /// The message is part of a multi-part reply.
        const MULTI = NLM_F_MULTIPART;
        /// Ask the kernel to acknowledge the request.
        const ACK = NLM_F_ACK;
        /// Echo the request back.
        const ECHO = NLM_F_ECHO;
        /// The dump was interrupted by a state change.
        const DUMP_INTR = NLM_F_DUMP_INTR;
        /// The dump was filtered.
        const DUMP_FILTERED = NLM_F_DUMP_FILTERED;
        /// Return the complete table instead of a single entry.
        const ROOT = NLM_F_ROOT;
        /// Return all matching entries.
        const MATCH = NLM_F_MATCH;
        /// Return an atomic snapshot.
        const ATOMIC = NLM_F_ATOMIC;
        /// Dump request.
        const DUMP = NLM_F_DUMP;
    }
}

impl HeaderFlags {
    /// True if the flags ask for a dump, which the kernel ends with
    /// `NLMSG_DONE` and never acknowledges.
    pub fn is_dump(self) -> bool {
        self.contains(HeaderFlags::DUMP)
    }

    /// True if the request ends with an acknowledgement or error message.
    pub fn expects_ack(self) -> bool {
        self.contains(HeaderFlags::ACK) && !self.is_dump()
    }
}
