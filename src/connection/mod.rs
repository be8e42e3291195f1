//! Connection context and per-packet-type encoders.
//!
//! A [`Connection`] binds a caller-owned byte buffer for the lifetime of a
//! logical MQTT session and carries the 16-bit message-identifier counter.
//! Each encoder method assembles one control packet in that buffer and
//! returns a [`Message`] view over the framed bytes; the caller hands the
//! view to its transport and may then reuse the connection for the next
//! packet. Because the view mutably borrows the connection, the borrow
//! checker guarantees at most one encoded packet is live at a time.
//!
//! Packets are built body-first: the variable header and payload are
//! written after a maximal fixed-header reservation, and once the body
//! length is known the type byte and remaining-length field are patched in
//! right-adjusted before it. No bytes ever move.

use crate::codec::{REMAINING_LENGTH_SIZE, STRING_MAX, encode_remaining_length};
use crate::error::Error;
use crate::packet::{DUP_FLAG, PacketType, QOS_SHIFT, QoS, RETAIN_FLAG, ReturnCode, TYPE_SHIFT};

/// Maximum size of the fixed header: the type byte plus up to four
/// remaining-length bytes. Packet bodies are assembled after a reservation
/// of this size, so connection buffers must be at least this large.
pub const MAX_FIXED_HEADER_SIZE: usize = 1 + REMAINING_LENGTH_SIZE;

// CONNECT flag bits (MQTT 3.1/3.1.1 variable header).
const CONNECT_FLAG_USERNAME: u8 = 1 << 7;
const CONNECT_FLAG_PASSWORD: u8 = 1 << 6;
const CONNECT_FLAG_WILL_RETAIN: u8 = 1 << 5;
const CONNECT_FLAG_WILL: u8 = 1 << 2;
const CONNECT_FLAG_CLEAN_SESSION: u8 = 1 << 1;
const CONNECT_WILL_QOS_SHIFT: u8 = 3;

/// The protocol revision to announce in a CONNECT packet.
///
/// Both revisions use the same packet framing; they differ only in the
/// protocol-name magic and level byte of the CONNECT variable header, so
/// the version is a runtime choice rather than a build-time one.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum Protocol {
    /// MQTT 3.1: protocol name `MQIsdp`, level 3.
    V3_1,
    /// MQTT 3.1.1: protocol name `MQTT`, level 4.
    #[default]
    V3_1_1,
}

impl Protocol {
    fn name(self) -> &'static [u8] {
        match self {
            Protocol::V3_1 => b"MQIsdp",
            Protocol::V3_1_1 => b"MQTT",
        }
    }

    fn level(self) -> u8 {
        match self {
            Protocol::V3_1 => 3,
            Protocol::V3_1_1 => 4,
        }
    }
}

/// A will message, registered with the broker at CONNECT time and
/// published on the client's behalf if it disconnects unexpectedly.
#[derive(Debug, Clone)]
pub struct Will<'a> {
    /// The topic the broker publishes the will on.
    pub topic: &'a str,
    /// The will payload, raw bytes.
    pub payload: &'a [u8],
    /// Delivery QoS for the will message.
    pub qos: QoS,
    /// Whether the broker retains the will message.
    pub retain: bool,
}

/// Options for a CONNECT packet.
#[derive(Debug, Clone)]
pub struct Options<'a> {
    /// The client identifier, must be unique within the broker.
    pub client_id: &'a str,
    /// Optional username credential.
    pub username: Option<&'a str>,
    /// Optional password credential, raw bytes.
    pub password: Option<&'a [u8]>,
    /// Optional will message.
    pub will: Option<Will<'a>>,
    /// The keep-alive time in seconds. A value of 0 disables keep-alive.
    pub keep_alive_seconds: u16,
    /// Whether to start a clean session.
    pub clean_session: bool,
    /// The protocol revision to announce.
    pub protocol: Protocol,
}

impl Default for Options<'_> {
    fn default() -> Self {
        Self {
            client_id: "",
            username: None,
            password: None,
            will: None,
            keep_alive_seconds: 60,
            clean_session: true,
            protocol: Protocol::default(),
        }
    }
}

/// An encoded packet: a view into the connection buffer.
///
/// Valid until the next encoder call on the same [`Connection`]; the
/// buffer is reused and overwritten on every call.
#[derive(Debug)]
pub struct Message<'a> {
    bytes: &'a [u8],
    message_id: Option<u16>,
}

impl<'a> Message<'a> {
    /// The framed packet bytes, ready to hand to the transport.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Length of the framed packet in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the view is empty. An encoded packet never is.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The message identifier carried by this packet, if it has one.
    ///
    /// For PUBLISH at QoS > 0, SUBSCRIBE and UNSUBSCRIBE this is the
    /// freshly allocated identifier the caller needs to correlate the
    /// broker's acknowledgement with this send.
    pub fn message_id(&self) -> Option<u16> {
        self.message_id
    }
}

impl AsRef<[u8]> for Message<'_> {
    fn as_ref(&self) -> &[u8] {
        self.bytes
    }
}

/// Append-only body writer over the connection buffer.
///
/// Starts past the fixed-header reservation; every write is bounds-checked
/// against the buffer capacity so an oversized packet surfaces as
/// [`Error::BufferTooSmall`] instead of truncating.
struct Body<'c> {
    buf: &'c mut [u8],
    len: usize,
}

impl<'c> Body<'c> {
    fn new(buf: &'c mut [u8]) -> Result<Self, Error> {
        if buf.len() < MAX_FIXED_HEADER_SIZE {
            return Err(Error::BufferTooSmall);
        }
        // Clear the header region up front: a failed encode must not leave
        // the previous packet's header addressable.
        buf[..MAX_FIXED_HEADER_SIZE].fill(0);
        Ok(Self {
            buf,
            len: MAX_FIXED_HEADER_SIZE,
        })
    }

    fn push(&mut self, byte: u8) -> Result<(), Error> {
        *self.buf.get_mut(self.len).ok_or(Error::BufferTooSmall)? = byte;
        self.len += 1;
        Ok(())
    }

    fn extend(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let end = self.len.checked_add(bytes.len()).ok_or(Error::BufferTooSmall)?;
        self.buf
            .get_mut(self.len..end)
            .ok_or(Error::BufferTooSmall)?
            .copy_from_slice(bytes);
        self.len = end;
        Ok(())
    }

    fn push_u16(&mut self, value: u16) -> Result<(), Error> {
        self.extend(&value.to_be_bytes())
    }

    /// Append a 16-bit length-prefixed field (topic, client id, credential).
    fn push_field(&mut self, bytes: &[u8]) -> Result<(), Error> {
        if bytes.len() > STRING_MAX {
            return Err(Error::MalformedLength);
        }
        self.push_u16(bytes.len() as u16)?;
        self.extend(bytes)
    }
}

/// The per-session encoding context.
///
/// Borrows an externally owned output buffer; the buffer is never grown,
/// and an encode that would not fit fails with [`Error::BufferTooSmall`].
/// A connection performs no I/O and holds no dynamic resources.
#[derive(Debug)]
pub struct Connection<'b> {
    buffer: &'b mut [u8],
    next_message_id: u16,
}

impl<'b> Connection<'b> {
    /// Bind a connection to a caller-owned output buffer.
    ///
    /// The message-identifier counter starts at 1. The buffer must not be
    /// mutated or read by the caller concurrently with encoder calls; the
    /// encoded bytes are reached through the returned [`Message`] views.
    pub fn new(buffer: &'b mut [u8]) -> Self {
        Self {
            buffer,
            next_message_id: 1,
        }
    }

    /// The capacity of the bound output buffer, in bytes.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Take the next message identifier and advance the counter.
    ///
    /// Identifiers are never 0: the counter wraps from 65535 back to 1.
    /// Encoders that need a fresh identifier call this internally; it is
    /// public so callers can pre-reserve identifiers as well.
    pub fn alloc_message_id(&mut self) -> u16 {
        let id = self.next_message_id;
        self.next_message_id = match id {
            u16::MAX => 1,
            _ => id + 1,
        };
        id
    }

    /// Encode a CONNECT packet.
    pub fn connect(&mut self, options: &Options<'_>) -> Result<Message<'_>, Error> {
        let mut body = Body::new(self.buffer)?;

        // --- Variable Header ---
        body.push_field(options.protocol.name())?;
        body.push(options.protocol.level())?;

        let mut flags = 0u8;
        if options.clean_session {
            flags |= CONNECT_FLAG_CLEAN_SESSION;
        }
        if let Some(will) = &options.will {
            flags |= CONNECT_FLAG_WILL | (will.qos as u8) << CONNECT_WILL_QOS_SHIFT;
            if will.retain {
                flags |= CONNECT_FLAG_WILL_RETAIN;
            }
        }
        if options.username.is_some() {
            flags |= CONNECT_FLAG_USERNAME;
        }
        if options.password.is_some() {
            flags |= CONNECT_FLAG_PASSWORD;
        }
        body.push(flags)?;
        body.push_u16(options.keep_alive_seconds)?;

        // --- Payload ---
        body.push_field(options.client_id.as_bytes())?;
        if let Some(will) = &options.will {
            body.push_field(will.topic.as_bytes())?;
            body.push_field(will.payload)?;
        }
        if let Some(username) = options.username {
            body.push_field(username.as_bytes())?;
        }
        if let Some(password) = options.password {
            body.push_field(password)?;
        }

        let len = body.len;
        self.seal(PacketType::Connect, false, 0, false, len, None)
    }

    /// Encode a CONNACK packet carrying `code`.
    pub fn connack(&mut self, code: ReturnCode) -> Result<Message<'_>, Error> {
        let mut body = Body::new(self.buffer)?;
        body.push(0)?; // reserved
        body.push(code as u8)?;
        let len = body.len;
        self.seal(PacketType::Connack, false, 0, false, len, None)
    }

    /// Encode a PUBLISH packet.
    ///
    /// At QoS 0 the packet carries no message identifier. At QoS 1 and 2 a
    /// fresh identifier is allocated and reported through
    /// [`Message::message_id`] so the caller can match the broker's
    /// acknowledgement.
    pub fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        dup: bool,
        retain: bool,
    ) -> Result<Message<'_>, Error> {
        let message_id = match qos {
            QoS::AtMostOnce => None,
            _ => Some(self.alloc_message_id()),
        };

        let mut body = Body::new(self.buffer)?;
        // --- Variable Header ---
        body.push_field(topic.as_bytes())?;
        if let Some(id) = message_id {
            body.push_u16(id)?;
        }
        // --- Payload --- (raw bytes, bounded by the remaining length)
        body.extend(payload)?;

        let len = body.len;
        self.seal(PacketType::Publish, dup, qos as u8, retain, len, message_id)
    }

    /// Encode a PUBACK packet echoing `message_id`.
    pub fn puback(&mut self, message_id: u16) -> Result<Message<'_>, Error> {
        self.ack(PacketType::Puback, 0, message_id)
    }

    /// Encode a PUBREC packet echoing `message_id`.
    pub fn pubrec(&mut self, message_id: u16) -> Result<Message<'_>, Error> {
        self.ack(PacketType::Pubrec, 0, message_id)
    }

    /// Encode a PUBREL packet echoing `message_id`.
    pub fn pubrel(&mut self, message_id: u16) -> Result<Message<'_>, Error> {
        // PUBREL carries the reserved 0b0010 fixed-header flags.
        self.ack(PacketType::Pubrel, 1, message_id)
    }

    /// Encode a PUBCOMP packet echoing `message_id`.
    pub fn pubcomp(&mut self, message_id: u16) -> Result<Message<'_>, Error> {
        self.ack(PacketType::Pubcomp, 0, message_id)
    }

    /// Encode a SUBSCRIBE packet for a single topic filter at the
    /// requested QoS. A fresh message identifier is allocated and reported
    /// through [`Message::message_id`].
    pub fn subscribe(&mut self, filter: &str, qos: QoS) -> Result<Message<'_>, Error> {
        let message_id = self.alloc_message_id();
        let mut body = Body::new(self.buffer)?;
        body.push_u16(message_id)?;
        body.push_field(filter.as_bytes())?;
        body.push(qos as u8)?;
        let len = body.len;
        // SUBSCRIBE carries the reserved 0b0010 fixed-header flags.
        self.seal(PacketType::Subscribe, false, 1, false, len, Some(message_id))
    }

    /// Encode a SUBACK packet echoing `message_id`.
    ///
    /// `codes` is the sequence of granted-QoS/failure bytes, one per
    /// subscribed filter, copied verbatim.
    pub fn suback(&mut self, codes: &[u8], message_id: u16) -> Result<Message<'_>, Error> {
        let mut body = Body::new(self.buffer)?;
        body.push_u16(message_id)?;
        body.extend(codes)?;
        let len = body.len;
        self.seal(PacketType::Suback, false, 0, false, len, Some(message_id))
    }

    /// Encode an UNSUBSCRIBE packet for a single topic filter. A fresh
    /// message identifier is allocated and reported through
    /// [`Message::message_id`].
    pub fn unsubscribe(&mut self, filter: &str) -> Result<Message<'_>, Error> {
        let message_id = self.alloc_message_id();
        let mut body = Body::new(self.buffer)?;
        body.push_u16(message_id)?;
        body.push_field(filter.as_bytes())?;
        let len = body.len;
        // UNSUBSCRIBE carries the reserved 0b0010 fixed-header flags.
        self.seal(
            PacketType::Unsubscribe,
            false,
            1,
            false,
            len,
            Some(message_id),
        )
    }

    /// Encode an UNSUBACK packet echoing `message_id`.
    pub fn unsuback(&mut self, message_id: u16) -> Result<Message<'_>, Error> {
        self.ack(PacketType::Unsuback, 0, message_id)
    }

    /// Encode a PINGREQ packet.
    pub fn pingreq(&mut self) -> Result<Message<'_>, Error> {
        self.empty(PacketType::Pingreq)
    }

    /// Encode a PINGRESP packet.
    pub fn pingresp(&mut self) -> Result<Message<'_>, Error> {
        self.empty(PacketType::Pingresp)
    }

    /// Encode a DISCONNECT packet.
    pub fn disconnect(&mut self) -> Result<Message<'_>, Error> {
        self.empty(PacketType::Disconnect)
    }

    /// Shared shape of the four id-only acknowledgement packets.
    fn ack(
        &mut self,
        packet_type: PacketType,
        qos_bits: u8,
        message_id: u16,
    ) -> Result<Message<'_>, Error> {
        let mut body = Body::new(self.buffer)?;
        body.push_u16(message_id)?;
        let len = body.len;
        self.seal(packet_type, false, qos_bits, false, len, Some(message_id))
    }

    fn empty(&mut self, packet_type: PacketType) -> Result<Message<'_>, Error> {
        let body = Body::new(self.buffer)?;
        let len = body.len;
        self.seal(packet_type, false, 0, false, len, None)
    }

    /// Back-patch the fixed header before the assembled body and return
    /// the framed view. `len` is the body end including the header
    /// reservation; the header is placed right-adjusted so the packet
    /// starts wherever the remaining-length encoding ends.
    fn seal(
        &mut self,
        packet_type: PacketType,
        dup: bool,
        qos_bits: u8,
        retain: bool,
        len: usize,
        message_id: Option<u16>,
    ) -> Result<Message<'_>, Error> {
        let remaining = len - MAX_FIXED_HEADER_SIZE;
        let mut encoded = [0u8; REMAINING_LENGTH_SIZE];
        let n = encode_remaining_length(remaining, &mut encoded)?;

        let start = MAX_FIXED_HEADER_SIZE - 1 - n;
        let mut first = (packet_type as u8) << TYPE_SHIFT | qos_bits << QOS_SHIFT;
        if dup {
            first |= DUP_FLAG;
        }
        if retain {
            first |= RETAIN_FLAG;
        }
        self.buffer[start] = first;
        self.buffer[start + 1..start + 1 + n].copy_from_slice(&encoded[..n]);

        Ok(Message {
            bytes: &self.buffer[start..len],
            message_id,
        })
    }
}
