//! # carlink-core
//!
//! Shared library for the CarLink adapter bridge containing the USB wire
//! format codec, the typed message catalog, and the dongle configuration
//! model.
//!
//! This crate knows nothing about USB transports or timers.  It turns byte
//! buffers into typed messages and typed messages into byte buffers; the
//! host crate owns the device and the session lifecycle.
//!
//! - **`protocol`** – How bytes travel over the bulk endpoints.  Each frame
//!   is a 16-byte header (magic, payload length, type, type complement)
//!   followed by a type-specific payload, all little-endian.
//!
//! - **`config`** – The [`DongleConfig`] sent to the adapter right after
//!   `Open`, plus host-side knobs like per-phone frame-request cadence.

pub mod config;
pub mod protocol;

pub use config::{DongleConfig, HandDriveType, MicType, PhoneTypeConfig, WifiType};
pub use protocol::codec::{decode_header, decode_payload, HeaderError, MessageHeader};
pub use protocol::messages::{
    AudioCommand, AudioContent, AudioData, CommandMapping, CommandValue, MediaInfo, MediaPayload,
    Message, MessageType, PhoneType, PhoneTypeValue, VideoData,
};
pub use protocol::sendable::SendableMessage;
