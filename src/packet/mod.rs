//! Read-only inspection of received MQTT packets.
//!
//! Everything in this module operates on a caller-owned byte buffer filled
//! by the transport and never mutates or copies it. The usual receive flow
//! is:
//!
//! 1. call [`total_length`] on the bytes read so far to learn where the
//!    current packet ends (or that more bytes are needed),
//! 2. wrap the complete packet in [`Packet`],
//! 3. dispatch on [`Packet::packet_type`] and pull out the fields the
//!    session layer needs: flags, message identifier, topic, payload,
//!    CONNACK return code.
//!
//! The fixed-header bit layout is kept as named mask/shift constants so the
//! exact format stays auditable:
//!
//! ```text
//!  7 6 5 4 | 3   | 2 1 | 0
//!  type    | dup | qos | retain
//! ```

use crate::codec::{decode_remaining_length, read_string, read_u16};
use crate::error::Error;

/// Bit position of the packet-type nibble in fixed-header byte 0.
pub const TYPE_SHIFT: u8 = 4;
/// DUP flag bit in fixed-header byte 0.
pub const DUP_FLAG: u8 = 0x08;
/// QoS level bits in fixed-header byte 0.
pub const QOS_MASK: u8 = 0x06;
/// Bit position of the QoS level within [`QOS_MASK`].
pub const QOS_SHIFT: u8 = 1;
/// RETAIN flag bit in fixed-header byte 0.
pub const RETAIN_FLAG: u8 = 0x01;

/// MQTT control packet types (the fixed-header type nibble).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    /// Client request to connect to a broker.
    Connect = 1,
    /// Broker acknowledgement of a CONNECT.
    Connack = 2,
    /// Application message.
    Publish = 3,
    /// QoS 1 publish acknowledgement.
    Puback = 4,
    /// QoS 2 publish received (assured delivery, part 1).
    Pubrec = 5,
    /// QoS 2 publish release (assured delivery, part 2).
    Pubrel = 6,
    /// QoS 2 publish complete (assured delivery, part 3).
    Pubcomp = 7,
    /// Client subscribe request.
    Subscribe = 8,
    /// Broker acknowledgement of a SUBSCRIBE.
    Suback = 9,
    /// Client unsubscribe request.
    Unsubscribe = 10,
    /// Broker acknowledgement of an UNSUBSCRIBE.
    Unsuback = 11,
    /// Keep-alive ping request.
    Pingreq = 12,
    /// Keep-alive ping response.
    Pingresp = 13,
    /// Clean disconnect notification.
    Disconnect = 14,
}

impl PacketType {
    /// Map a type-nibble value (1-14) to its packet type.
    pub fn from_nibble(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Connect),
            2 => Some(Self::Connack),
            3 => Some(Self::Publish),
            4 => Some(Self::Puback),
            5 => Some(Self::Pubrec),
            6 => Some(Self::Pubrel),
            7 => Some(Self::Pubcomp),
            8 => Some(Self::Subscribe),
            9 => Some(Self::Suback),
            10 => Some(Self::Unsubscribe),
            11 => Some(Self::Unsuback),
            12 => Some(Self::Pingreq),
            13 => Some(Self::Pingresp),
            14 => Some(Self::Disconnect),
            _ => None,
        }
    }
}

/// Quality of Service levels for MQTT messages.
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum QoS {
    /// At most once delivery.
    #[default]
    AtMostOnce = 0,
    /// At least once delivery.
    AtLeastOnce = 1,
    /// Exactly once delivery.
    ExactlyOnce = 2,
}

impl QoS {
    /// Map a wire value (0-2) to its QoS level. The bit pattern 3 is
    /// reserved and has no level.
    pub fn from_bits(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::AtMostOnce),
            1 => Some(Self::AtLeastOnce),
            2 => Some(Self::ExactlyOnce),
            _ => None,
        }
    }
}

/// CONNACK return codes (MQTT 3.1/3.1.1).
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ReturnCode {
    /// Connection accepted.
    Accepted = 0,
    /// The broker does not support the requested protocol level.
    RefusedProtocolVersion = 1,
    /// The client identifier is well-formed but not allowed.
    RefusedIdentifierRejected = 2,
    /// The MQTT service is unavailable.
    RefusedServerUnavailable = 3,
    /// The username or password is malformed.
    RefusedBadCredentials = 4,
    /// The client is not authorized to connect.
    RefusedNotAuthorized = 5,
}

impl ReturnCode {
    /// Map a return-code byte to its variant.
    pub fn from_byte(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Accepted),
            1 => Some(Self::RefusedProtocolVersion),
            2 => Some(Self::RefusedIdentifierRejected),
            3 => Some(Self::RefusedServerUnavailable),
            4 => Some(Self::RefusedBadCredentials),
            5 => Some(Self::RefusedNotAuthorized),
            _ => None,
        }
    }
}

/// Compute how many bytes the packet at the start of `buf` occupies,
/// fixed header included.
///
/// The transport layer calls this on a partially filled receive buffer to
/// find packet boundaries: the result may exceed `buf.len()` when the
/// packet body has not fully arrived yet.
///
/// Returns `Ok(None)` while `buf` is too short to hold the complete
/// length field itself - not an error, just a "keep reading" signal.
///
/// # Errors
///
/// [`Error::MalformedLength`] if the remaining-length field is overlong.
pub fn total_length(buf: &[u8]) -> Result<Option<usize>, Error> {
    if buf.is_empty() {
        return Ok(None);
    }
    match decode_remaining_length(&buf[1..])? {
        Some((remaining, consumed)) => Ok(Some(1 + consumed + remaining)),
        None => Ok(None),
    }
}

/// A read-only view of a received MQTT packet.
///
/// Construction validates only the type nibble; the per-field accessors
/// perform their own bounds checks so a truncated or corrupt body surfaces
/// as [`Error::MalformedLength`] instead of a panic.
#[derive(Debug, Clone, Copy)]
pub struct Packet<'a> {
    buf: &'a [u8],
    packet_type: PacketType,
}

impl<'a> Packet<'a> {
    /// Wrap a received buffer.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidType`] if `buf` is empty or its type nibble is
    /// outside 1-14 - the buffer is not an MQTT packet.
    pub fn new(buf: &'a [u8]) -> Result<Self, Error> {
        let first = *buf.first().ok_or(Error::InvalidType)?;
        let packet_type = PacketType::from_nibble(first >> TYPE_SHIFT).ok_or(Error::InvalidType)?;
        Ok(Self { buf, packet_type })
    }

    /// The control packet type from the fixed header.
    pub fn packet_type(&self) -> PacketType {
        self.packet_type
    }

    /// The DUP flag: set when a PUBLISH is a re-delivery attempt.
    pub fn dup(&self) -> bool {
        self.buf[0] & DUP_FLAG != 0
    }

    /// The RETAIN flag of a PUBLISH.
    pub fn retain(&self) -> bool {
        self.buf[0] & RETAIN_FLAG != 0
    }

    /// The QoS level from the fixed header.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidType`] on the reserved bit pattern 3.
    pub fn qos(&self) -> Result<QoS, Error> {
        QoS::from_bits((self.buf[0] & QOS_MASK) >> QOS_SHIFT).ok_or(Error::InvalidType)
    }

    /// The return code carried by a CONNACK.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidType`] if this packet is not a CONNACK or the code
    /// byte is outside the enumerated range; [`Error::MalformedLength`] if
    /// the packet is truncated.
    pub fn connect_return_code(&self) -> Result<ReturnCode, Error> {
        if self.packet_type != PacketType::Connack {
            return Err(Error::InvalidType);
        }
        let (header, end) = self.body()?;
        // Variable header: 1 reserved/session-present byte, then the code.
        if header + 2 > end {
            return Err(Error::MalformedLength);
        }
        ReturnCode::from_byte(self.buf[header + 1]).ok_or(Error::InvalidType)
    }

    /// The message identifier, for the packet types that carry one.
    ///
    /// Returns `Ok(None)` for types that structurally lack an identifier:
    /// CONNECT, CONNACK, PUBLISH at QoS 0, PINGREQ, PINGRESP, DISCONNECT.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedLength`] if the packet is truncated.
    pub fn message_id(&self) -> Result<Option<u16>, Error> {
        use PacketType::*;
        match self.packet_type {
            Puback | Pubrec | Pubrel | Pubcomp | Subscribe | Suback | Unsubscribe | Unsuback => {
                let (header, end) = self.body()?;
                if header + 2 > end {
                    return Err(Error::MalformedLength);
                }
                Ok(read_u16(self.buf, header))
            }
            Publish => {
                if self.qos()? == QoS::AtMostOnce {
                    return Ok(None);
                }
                let (header, end) = self.body()?;
                let topic = read_string(&self.buf[..end], header)?;
                let id_at = header + 2 + topic.len();
                if id_at + 2 > end {
                    return Err(Error::MalformedLength);
                }
                Ok(read_u16(self.buf, id_at))
            }
            Connect | Connack | Pingreq | Pingresp | Disconnect => Ok(None),
        }
    }

    /// The topic name of a PUBLISH.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidType`] if this packet is not a PUBLISH;
    /// [`Error::MalformedLength`] if the topic field is truncated.
    pub fn publish_topic(&self) -> Result<&'a [u8], Error> {
        if self.packet_type != PacketType::Publish {
            return Err(Error::InvalidType);
        }
        let (header, end) = self.body()?;
        read_string(&self.buf[..end], header)
    }

    /// The payload of a PUBLISH: everything after the topic (and, at
    /// QoS > 0, the 2-byte message identifier) up to the end declared by
    /// the remaining-length field. May be empty.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidType`] if this packet is not a PUBLISH;
    /// [`Error::MalformedLength`] if the packet is truncated.
    pub fn publish_payload(&self) -> Result<&'a [u8], Error> {
        if self.packet_type != PacketType::Publish {
            return Err(Error::InvalidType);
        }
        let (header, end) = self.body()?;
        let topic = read_string(&self.buf[..end], header)?;
        let mut start = header + 2 + topic.len();
        if self.qos()? != QoS::AtMostOnce {
            start += 2;
        }
        self.buf.get(start..end).ok_or(Error::MalformedLength)
    }

    /// Locate the variable header: returns its offset and the end of the
    /// packet as declared by the remaining-length field. The buffer must
    /// hold the complete packet.
    fn body(&self) -> Result<(usize, usize), Error> {
        let (remaining, consumed) =
            decode_remaining_length(&self.buf[1..])?.ok_or(Error::MalformedLength)?;
        let header = 1 + consumed;
        let end = header + remaining;
        if end > self.buf.len() {
            return Err(Error::MalformedLength);
        }
        Ok((header, end))
    }
}
