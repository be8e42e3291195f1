//! # libmqtt - MQTT packet codec for embedded systems
//!
//! A zero-allocation codec for the MQTT 3.1 and 3.1.1 wire format, designed
//! for embedded systems and `no_std` environments. The crate serializes
//! outgoing MQTT control packets into a caller-supplied fixed-size buffer and
//! inspects incoming byte buffers without performing any I/O itself.
//!
//! ## Features
//!
//! - All 14 MQTT 3.1/3.1.1 control packet types (CONNECT through DISCONNECT)
//! - MQTT 3.1 (`MQIsdp`) and 3.1.1 (`MQTT`) protocol names selectable at runtime
//! - Zero heap allocation: packets are built in place in a borrowed buffer
//! - Strict buffer-capacity enforcement - an encode that would overflow fails
//!   cleanly instead of truncating
//! - Read-only accessors for received packets (type, flags, message id,
//!   topic, payload) that never copy
//! - Connection agnostic: the transport (TCP, TLS, serial) lives elsewhere
//!
//! ## Design
//!
//! Two components cooperate:
//!
//! - [`connection::Connection`] owns nothing but borrows a caller buffer and
//!   carries the 16-bit message-identifier counter. Every encoder method
//!   writes one framed packet into that buffer and returns a
//!   [`connection::Message`] view over the written bytes.
//! - [`packet::Packet`] wraps a received buffer and extracts fields from it.
//!   [`packet::total_length`] tells the transport layer how many bytes the
//!   current packet occupies, so it knows when a full packet has arrived.
//!
//! The encoded view borrows the connection mutably, so the borrow checker
//! enforces the single-active-view contract: the buffer is reused on every
//! encode call, and a previous view cannot outlive the next call.
//!
//! ## Usage
//!
//! ```rust
//! use libmqtt::connection::{Connection, Options};
//! use libmqtt::packet::{Packet, PacketType, QoS};
//!
//! let mut buf = [0u8; 256];
//! let mut conn = Connection::new(&mut buf);
//!
//! let options = Options {
//!     client_id: "sensor_device_01",
//!     keep_alive_seconds: 60,
//!     clean_session: true,
//!     ..Options::default()
//! };
//! let connect = conn.connect(&options).unwrap();
//! assert!(!connect.is_empty());
//! // hand connect.as_bytes() to the transport, then reuse the buffer:
//! let publish = conn
//!     .publish("sensors/temperature", b"23.5", QoS::AtLeastOnce, false, false)
//!     .unwrap();
//! assert!(publish.message_id().is_some());
//!
//! // Receive side: inspect a buffer filled by the transport.
//! let packet = Packet::new(publish.as_bytes()).unwrap();
//! assert_eq!(packet.packet_type(), PacketType::Publish);
//! assert_eq!(packet.publish_topic().unwrap(), b"sensors/temperature");
//! assert_eq!(packet.publish_payload().unwrap(), b"23.5");
//! ```
//!
//! ## Platform Support
//!
//! This library is designed to work on:
//! - Embedded microcontrollers (ARM Cortex-M, RISC-V, etc.)
//! - Linux-based IoT devices (Raspberry Pi, etc.)
//! - Any platform supporting Rust's `core` library
//!
//! ## Optional Features
//!
//! - `std`: Enable standard library support (default: disabled)
//! - `defmt`: Enable defmt logging support for embedded debugging

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(missing_docs)]
#![warn(missing_debug_implementations)]

/// Common error type for encode and decode operations.
pub mod error;

/// Wire-level primitives: the remaining-length variable integer and
/// length-prefixed field framing.
pub mod codec;

/// Read-only inspection of received packets.
pub mod packet;

/// Connection context and per-packet-type encoders.
pub mod connection;

/// Re-exports of the types most callers need.
pub mod prelude {
    pub use super::connection::{Connection, Message, Options, Protocol, Will};
    pub use super::error::Error;
    pub use super::packet::{Packet, PacketType, QoS, ReturnCode, total_length};
}
