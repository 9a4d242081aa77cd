//! Protocol module containing the message catalog and the binary codec.

pub mod codec;
pub mod messages;
pub mod sendable;

pub use codec::{decode_header, decode_payload, encode_header, HeaderError, MessageHeader};
pub use messages::*;
pub use sendable::{
    FileAddress, LogoType, MultiTouchAction, SendableMessage, TouchAction, TouchItem,
};
