use bytes::Bytes;
use netlink_packet_utils::nla::{Nla, NlaBuffer};
use netlink_packet_utils::Emitable;

use crate::error::{DecodeError, EncodeError};

pub use netlink_packet_utils::nla::{
    NLA_F_NESTED, NLA_F_NET_BYTEORDER, NLA_HEADER_SIZE, NLA_TYPE_MASK,
};

const MAX_ATTR_LEN: usize = u16::MAX as usize;

#[derive(Debug, Clone)]
enum Value {
    Str(String),
    Raw(Bytes),
    Nested(AttributeEncoder),
}

#[derive(Debug, Clone)]
struct Entry {
    kind: u16,
    value: Value,
}

impl Entry {
    fn validate(&self) -> Result<(), EncodeError> {
        if self.kind & !NLA_TYPE_MASK != 0 {
            return Err(EncodeError::InvalidType(self.kind));
        }
        match &self.value {
            Value::Str(s) if s.as_bytes().contains(&0) => {
                return Err(EncodeError::EmbeddedNul { kind: self.kind })
            }
            Value::Nested(inner) => inner.validate()?,
            _ => {}
        }
        let size = NLA_HEADER_SIZE + self.value_len();
        if size > MAX_ATTR_LEN {
            return Err(EncodeError::AttributeTooLarge {
                kind: self.kind,
                size,
                max: MAX_ATTR_LEN,
            });
        }
        Ok(())
    }
}

impl Nla for Entry {
    fn value_len(&self) -> usize {
        match &self.value {
            Value::Str(s) => s.len() + 1,
            Value::Raw(b) => b.len(),
            Value::Nested(inner) => inner.entries.as_slice().buffer_len(),
        }
    }

    fn kind(&self) -> u16 {
        self.kind
    }

    fn is_nested(&self) -> bool {
        matches!(self.value, Value::Nested(_))
    }

    fn emit_value(&self, buffer: &mut [u8]) {
        match &self.value {
            Value::Str(s) => {
                buffer[..s.len()].copy_from_slice(s.as_bytes());
                buffer[s.len()] = 0;
            }
            Value::Raw(b) => buffer[..b.len()].copy_from_slice(b),
            Value::Nested(inner) => inner.entries.as_slice().emit(buffer),
        }
    }
}

/// Builds an ordered attribute sequence.
///
/// Values are validated when [`encode`](Self::encode) runs, so a chain of
/// appends never fails halfway. Attributes are written in insertion order
/// and none are dropped or merged.
///
/// Wire format of one attribute:
/// ```text
/// ┌────────────┬────────────┬──────────────────┬──────────┐
/// │ Length     │ Type       │ Payload          │ Padding  │
/// │ (2B host)  │ (2B host)  │ (Length - 4 B)   │ to 4B    │
/// └────────────┴────────────┴──────────────────┴──────────┘
/// ```
#[derive(Debug, Clone, Default)]
pub struct AttributeEncoder {
    entries: Vec<Entry>,
}

impl AttributeEncoder {
    /// Create an empty encoder.
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, kind: u16, value: Value) -> &mut Self {
        self.entries.push(Entry { kind, value });
        self
    }

    /// Append a NUL-terminated string attribute.
    pub fn string(&mut self, kind: u16, value: impl Into<String>) -> &mut Self {
        self.push(kind, Value::Str(value.into()))
    }

    /// Append a `u8` attribute.
    pub fn u8(&mut self, kind: u16, value: u8) -> &mut Self {
        self.bytes(kind, vec![value])
    }

    /// Append a `u16` attribute in host byte order.
    pub fn u16(&mut self, kind: u16, value: u16) -> &mut Self {
        self.bytes(kind, value.to_ne_bytes().to_vec())
    }

    /// Append a `u32` attribute in host byte order.
    pub fn u32(&mut self, kind: u16, value: u32) -> &mut Self {
        self.bytes(kind, value.to_ne_bytes().to_vec())
    }

    /// Append a `u64` attribute in host byte order.
    pub fn u64(&mut self, kind: u16, value: u64) -> &mut Self {
        self.bytes(kind, value.to_ne_bytes().to_vec())
    }

    /// Append a `u64` attribute in big-endian byte order.
    pub fn u64_be(&mut self, kind: u16, value: u64) -> &mut Self {
        self.bytes(kind, value.to_be_bytes().to_vec())
    }

    /// Append a raw byte attribute.
    pub fn bytes(&mut self, kind: u16, value: impl Into<Bytes>) -> &mut Self {
        self.push(kind, Value::Raw(value.into()))
    }

    /// Append a zero-length flag attribute.
    pub fn flag(&mut self, kind: u16) -> &mut Self {
        self.bytes(kind, Bytes::new())
    }

    /// Append a nested attribute set built by `build`.
    pub fn nested(&mut self, kind: u16, build: impl FnOnce(&mut AttributeEncoder)) -> &mut Self {
        let mut inner = AttributeEncoder::new();
        build(&mut inner);
        self.push(kind, Value::Nested(inner))
    }

    /// Number of top-level attributes appended so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no attribute has been appended.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn validate(&self) -> Result<(), EncodeError> {
        self.entries.iter().try_for_each(Entry::validate)
    }

    /// Encode all attributes into a new buffer.
    pub fn encode(&self) -> Result<Bytes, EncodeError> {
        self.validate()?;
        let entries = self.entries.as_slice();
        let mut buf = vec![0u8; entries.buffer_len()];
        entries.emit(&mut buf);
        Ok(Bytes::from(buf))
    }
}

/// One decoded attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    kind: u16,
    nested: bool,
    net_byteorder: bool,
    value: Bytes,
}

impl Attribute {
    /// Type code with the flag bits removed.
    pub fn kind(&self) -> u16 {
        self.kind
    }

    /// True if the nested flag was set on the wire.
    pub fn is_nested(&self) -> bool {
        self.nested
    }

    /// True if the network byte order flag was set on the wire.
    pub fn is_net_byteorder(&self) -> bool {
        self.net_byteorder
    }

    /// Raw payload, without header or padding.
    pub fn value(&self) -> &Bytes {
        &self.value
    }

    /// Interpret the payload as a string, dropping the NUL terminator.
    pub fn string(&self) -> Result<&str, DecodeError> {
        let raw = self.value.as_ref();
        let raw = raw.strip_suffix(&[0u8]).unwrap_or(raw);
        std::str::from_utf8(raw).map_err(|source| DecodeError::InvalidString {
            kind: self.kind,
            source,
        })
    }

    pub fn u8(&self) -> Result<u8, DecodeError> {
        self.fixed::<1>().map(|b| b[0])
    }

    pub fn u16(&self) -> Result<u16, DecodeError> {
        self.fixed::<2>().map(u16::from_ne_bytes)
    }

    pub fn u32(&self) -> Result<u32, DecodeError> {
        self.fixed::<4>().map(u32::from_ne_bytes)
    }

    pub fn u64(&self) -> Result<u64, DecodeError> {
        self.fixed::<8>().map(u64::from_ne_bytes)
    }

    /// Interpret the payload as a big-endian `u64`.
    pub fn u64_be(&self) -> Result<u64, DecodeError> {
        self.fixed::<8>().map(u64::from_be_bytes)
    }

    /// Decode the payload as a nested attribute sequence.
    pub fn nested(&self) -> AttributeDecoder {
        AttributeDecoder::new(self.value.clone())
    }

    fn fixed<const N: usize>(&self) -> Result<[u8; N], DecodeError> {
        self.value
            .as_ref()
            .try_into()
            .map_err(|_| DecodeError::WidthMismatch {
                kind: self.kind,
                len: self.value.len(),
                expected: N,
            })
    }
}

/// Single-pass iterator over an encoded attribute sequence.
///
/// Yields every attribute, including type codes the caller does not know;
/// skipping those is the caller's choice. After the first error the iterator
/// is exhausted.
#[derive(Debug, Clone)]
pub struct AttributeDecoder {
    buf: Bytes,
    position: usize,
}

impl AttributeDecoder {
    /// Create a decoder over `buf`.
    pub fn new(buf: impl Into<Bytes>) -> Self {
        Self {
            buf: buf.into(),
            position: 0,
        }
    }

    fn decode_next(&mut self) -> Result<Attribute, DecodeError> {
        let rest = &self.buf[self.position..];
        let header = NlaBuffer::new_checked(rest)?;
        let length = usize::from(header.length());
        let attr = Attribute {
            kind: header.kind(),
            nested: header.nested_flag(),
            net_byteorder: header.network_byte_order_flag(),
            value: self
                .buf
                .slice(self.position + NLA_HEADER_SIZE..self.position + length),
        };
        // The final attribute may omit its padding.
        self.position = (self.position + crate::align(length)).min(self.buf.len());
        Ok(attr)
    }
}

impl Iterator for AttributeDecoder {
    type Item = Result<Attribute, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.position >= self.buf.len() {
            return None;
        }
        let item = self.decode_next();
        if item.is_err() {
            self.position = self.buf.len();
        }
        Some(item)
    }
}

impl std::iter::FusedIterator for AttributeDecoder {}

/// Decode a whole attribute sequence, failing on the first malformed entry.
pub fn decode_attributes(buf: impl Into<Bytes>) -> Result<Vec<Attribute>, DecodeError> {
    AttributeDecoder::new(buf).collect()
}
