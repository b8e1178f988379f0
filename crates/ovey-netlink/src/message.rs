use std::fmt;

use bytes::Bytes;
use netlink_packet_core::{
    NetlinkBuffer, NetlinkDeserializable, NetlinkMessage, NetlinkSerializable,
};
use netlink_packet_generic::{GenlFamily, GenlHeader};
use netlink_packet_utils::{Emitable, ParseableParametrized};

use crate::align;
use crate::attr::AttributeDecoder;
use crate::error::DecodeError;

/// Generic netlink payload whose attributes stay encoded.
///
/// Family ids are resolved at runtime through the controller, so this type
/// never names a family itself; callers set the id on the enclosing
/// [`GenlMessage`](netlink_packet_generic::GenlMessage).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenlPayload {
    pub command: u8,
    pub version: u8,
    /// Encoded attribute sequence.
    pub data: Bytes,
}

impl GenlPayload {
    pub fn new(command: u8, version: u8, data: impl Into<Bytes>) -> Self {
        Self {
            command,
            version,
            data: data.into(),
        }
    }

    /// Iterate over the attributes carried by this payload.
    pub fn attributes(&self) -> AttributeDecoder {
        AttributeDecoder::new(self.data.clone())
    }
}

impl GenlFamily for GenlPayload {
    fn family_name() -> &'static str {
        ""
    }

    fn command(&self) -> u8 {
        self.command
    }

    fn version(&self) -> u8 {
        self.version
    }
}

impl Emitable for GenlPayload {
    fn buffer_len(&self) -> usize {
        self.data.len()
    }

    fn emit(&self, buffer: &mut [u8]) {
        buffer[..self.data.len()].copy_from_slice(&self.data);
    }
}

impl ParseableParametrized<[u8], GenlHeader> for GenlPayload {
    fn parse_with_param(
        buf: &[u8],
        header: GenlHeader,
    ) -> Result<Self, netlink_packet_utils::DecodeError> {
        Ok(Self::new(header.cmd, header.version, Bytes::copy_from_slice(buf)))
    }
}

/// A generic netlink payload that can be both sent and received.
pub trait Payload:
    GenlFamily + Emitable + ParseableParametrized<[u8], GenlHeader> + fmt::Debug
{
}

impl<T> Payload for T where
    T: GenlFamily + Emitable + ParseableParametrized<[u8], GenlHeader> + fmt::Debug
{
}

/// Finalize `message` (length and type fields) and serialize it.
pub fn encode_message<I: NetlinkSerializable>(message: &mut NetlinkMessage<I>) -> Vec<u8> {
    message.finalize();
    let mut buf = vec![0u8; message.buffer_len()];
    message.serialize(&mut buf);
    buf
}

/// Split a received datagram into its netlink messages.
///
/// Each message is padded to 4 bytes; the last one may omit its padding.
pub fn decode_datagram<I: NetlinkDeserializable>(
    datagram: &[u8],
) -> Result<Vec<NetlinkMessage<I>>, DecodeError> {
    let mut rest = datagram;
    let mut messages = Vec::new();

    while !rest.is_empty() {
        let length = NetlinkBuffer::new_checked(rest)?.length() as usize;
        messages.push(NetlinkMessage::deserialize(&rest[..length])?);
        rest = &rest[align(length).min(rest.len())..];
    }

    Ok(messages)
}
