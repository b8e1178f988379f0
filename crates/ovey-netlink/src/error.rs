/// Errors raised while serializing attributes.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// A string value contains the NUL byte that terminates it on the wire.
    #[error("string attribute {kind} contains an embedded NUL byte")]
    EmbeddedNul { kind: u16 },

    /// The encoded attribute does not fit the 16-bit length field.
    #[error("attribute {kind} too large ({size} bytes, max {max})")]
    AttributeTooLarge { kind: u16, size: usize, max: usize },

    /// The type code collides with the nested/byte-order flag bits.
    #[error("attribute type {0:#06x} exceeds the 14-bit type space")]
    InvalidType(u16),
}

/// Errors raised while parsing received bytes.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// A header or length field is inconsistent with the bytes received.
    #[error("malformed netlink data: {0}")]
    Malformed(#[from] netlink_packet_utils::DecodeError),

    /// A string attribute is not valid UTF-8.
    #[error("attribute {kind} is not a valid string: {source}")]
    InvalidString {
        kind: u16,
        source: std::str::Utf8Error,
    },

    /// A fixed-width attribute has the wrong payload size.
    #[error("attribute {kind} has {len} bytes, expected {expected}")]
    WidthMismatch {
        kind: u16,
        len: usize,
        expected: usize,
    },
}
