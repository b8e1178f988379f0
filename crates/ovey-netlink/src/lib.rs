//! Generic netlink messages and attributes.
//!
//! Framing is provided by the `netlink-packet-*` crates: every datagram
//! carries one or more netlink messages, each a 16-byte netlink header, a
//! 4-byte generic netlink header and a flat sequence of 4-byte aligned
//! attributes. This crate adds what those crates leave open:
//! - [`AttributeEncoder`] / [`AttributeDecoder`]: validated, order-preserving
//!   attribute sets whose type codes are chosen at runtime
//! - [`GenlPayload`]: a family payload whose attributes stay encoded
//! - [`HeaderFlags`]: typed netlink header flags
//! - [`encode_message`] / [`decode_datagram`]: datagram framing

pub mod attr;
pub mod error;
pub mod flags;
pub mod message;

pub use attr::{
    decode_attributes, Attribute, AttributeDecoder, AttributeEncoder, NLA_F_NESTED,
    NLA_F_NET_BYTEORDER, NLA_HEADER_SIZE, NLA_TYPE_MASK,
};
pub use error::{DecodeError, EncodeError};
pub use flags::HeaderFlags;
pub use message::{decode_datagram, encode_message, GenlPayload, Payload};

pub use netlink_packet_core::{
    DoneMessage, ErrorMessage, NetlinkHeader, NetlinkMessage, NetlinkPayload, NLMSG_DONE,
    NLMSG_ERROR, NLMSG_NOOP, NLMSG_OVERRUN,
};
pub use netlink_packet_generic::{GenlFamily, GenlHeader, GenlMessage};

/// Round `len` up to the 4-byte netlink alignment.
pub const fn align(len: usize) -> usize {
    (len + 3) & !3
}
