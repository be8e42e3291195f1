//! Common error types for packet encoding and decoding

/// A common error type for codec operations.
///
/// This enum defines the errors that can occur when framing or inspecting
/// MQTT packets. It is designed to be simple and portable for `no_std`
/// environments.
///
/// An incomplete receive buffer is deliberately not an error: operations
/// that can observe one, such as [`total_length`](crate::packet::total_length),
/// return `Ok(None)` to signal "keep reading".
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// The fully assembled packet would exceed the connection buffer
    /// capacity. Recoverable: enlarge the buffer or shorten the input.
    BufferTooSmall,
    /// An enumerated wire field (packet-type nibble, QoS bits, CONNACK
    /// return code) decoded to a value outside its legal range. The buffer
    /// is not valid MQTT.
    InvalidType,
    /// A length field is malformed: the remaining-length integer exceeds
    /// 4 bytes, a length prefix points past the end of the packet, or a
    /// field is too long to frame in 16 bits.
    MalformedLength,
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::BufferTooSmall => defmt::write!(f, "BufferTooSmall"),
            Error::InvalidType => defmt::write!(f, "InvalidType"),
            Error::MalformedLength => defmt::write!(f, "MalformedLength"),
        }
    }
}
