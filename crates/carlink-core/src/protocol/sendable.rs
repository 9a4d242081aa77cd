//! Host→dongle message catalog.
//!
//! Each variant serialises to a complete frame (header plus payload) via
//! [`SendableMessage::serialise`].  Constructors on the enum cover the
//! file-write convenience forms (number, boolean, string) the configuration
//! batch is built from.

use serde_json::json;
use tracing::warn;

use crate::config::DongleConfig;
use crate::protocol::codec::encode_header;
use crate::protocol::messages::{CommandMapping, MessageType};

/// Touch action codes for single-touch frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum TouchAction {
    Down = 14,
    Move = 15,
    Up = 16,
}

/// Per-contact action codes for multi-touch frames.  Note these differ from
/// the single-touch codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum MultiTouchAction {
    Up = 0,
    Down = 1,
    Move = 2,
}

/// One contact point in a multi-touch frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchItem {
    /// Normalised x in `[0, 1]`.
    pub x: f32,
    /// Normalised y in `[0, 1]`.
    pub y: f32,
    pub action: MultiTouchAction,
}

/// Icon variants selectable via the `LogoType` frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum LogoType {
    HomeButton = 1,
    Siri = 2,
}

/// Well-known file paths on the dongle's filesystem, written via `SendFile`
/// frames during the configuration batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAddress {
    Dpi,
    NightMode,
    HandDriveMode,
    ChargeMode,
    BoxName,
    OemIcon,
    AirplayConfig,
    Icon120,
    Icon180,
    Icon256,
    AndroidWorkMode,
}

impl FileAddress {
    pub fn path(&self) -> &'static str {
        match self {
            FileAddress::Dpi => "/tmp/screen_dpi",
            FileAddress::NightMode => "/tmp/night_mode",
            FileAddress::HandDriveMode => "/tmp/hand_drive_mode",
            FileAddress::ChargeMode => "/tmp/charge_mode",
            FileAddress::BoxName => "/etc/box_name",
            FileAddress::OemIcon => "/etc/oem_icon.png",
            FileAddress::AirplayConfig => "/etc/airplay.conf",
            FileAddress::Icon120 => "/etc/icon_120x120.png",
            FileAddress::Icon180 => "/etc/icon_180x180.png",
            FileAddress::Icon256 => "/etc/icon_256x256.png",
            FileAddress::AndroidWorkMode => "/etc/android_work_mode",
        }
    }
}

/// A message the host can send to the dongle.
#[derive(Debug, Clone, PartialEq)]
pub enum SendableMessage {
    Command(CommandMapping),
    Touch {
        /// Normalised x in `[0, 1]`.
        x: f32,
        /// Normalised y in `[0, 1]`.
        y: f32,
        action: TouchAction,
    },
    MultiTouch(Vec<TouchItem>),
    /// Raw PCM microphone samples for the phone.
    Audio(Vec<i16>),
    /// Write `content` to `file_name` on the dongle.
    File {
        file_name: String,
        content: Vec<u8>,
    },
    /// Project the video/session parameters and start the link.
    Open(DongleConfig),
    /// Media sync settings as a JSON blob.
    ///
    /// `sync_time` is Unix seconds, frozen at construction so queueing delay
    /// cannot skew the clock the dongle derives from it.
    BoxSettings {
        media_delay: u32,
        sync_time: u64,
        width: u32,
        height: u32,
    },
    LogoType(LogoType),
    HeartBeat,
    /// Close the link and the dongle; a new `Open` is needed afterwards.
    CloseDongle,
    /// Drop the phone session; the dongle stays open for a reconnect.
    DisconnectPhone,
}

impl SendableMessage {
    /// A `SendFile` frame carrying a little-endian u32.
    pub fn number_file(value: u32, file: FileAddress) -> SendableMessage {
        SendableMessage::File {
            file_name: file.path().to_string(),
            content: value.to_le_bytes().to_vec(),
        }
    }

    /// A `SendFile` frame carrying a boolean as `0` or `1`.
    pub fn boolean_file(value: bool, file: FileAddress) -> SendableMessage {
        SendableMessage::number_file(u32::from(value), file)
    }

    /// A `SendFile` frame carrying an ASCII string.  The dongle truncates
    /// long names; anything past 16 bytes is suspect.
    pub fn string_file(value: &str, file: FileAddress) -> SendableMessage {
        if value.len() > 16 {
            warn!(len = value.len(), file = file.path(), "string file content over 16 bytes");
        }
        SendableMessage::File {
            file_name: file.path().to_string(),
            content: value.as_bytes().to_vec(),
        }
    }

    /// The `airplay.conf` icon description file, as a key = value listing.
    pub fn icon_config(label: Option<&str>) -> SendableMessage {
        let mut text = String::new();
        text.push_str("oemIconVisible = 1\n");
        text.push_str("name = AutoBox\n");
        text.push_str("model = Magic-Car-Link-1.00\n");
        text.push_str(&format!("oemIconPath = {}\n", FileAddress::OemIcon.path()));
        if let Some(label) = label {
            text.push_str(&format!("oemIconLabel = {label}\n"));
        }
        SendableMessage::File {
            file_name: FileAddress::AirplayConfig.path().to_string(),
            content: text.into_bytes(),
        }
    }

    /// Box settings derived from `config`.  `sync_time` is Unix seconds,
    /// captured by the caller at construction time.
    pub fn box_settings(config: &DongleConfig, sync_time: u64) -> SendableMessage {
        SendableMessage::BoxSettings {
            media_delay: config.media_delay,
            sync_time,
            width: config.width,
            height: config.height,
        }
    }

    pub fn message_type(&self) -> MessageType {
        match self {
            SendableMessage::Command(_) => MessageType::Command,
            SendableMessage::Touch { .. } => MessageType::Touch,
            SendableMessage::MultiTouch(_) => MessageType::MultiTouch,
            SendableMessage::Audio(_) => MessageType::AudioData,
            SendableMessage::File { .. } => MessageType::SendFile,
            SendableMessage::Open(_) => MessageType::Open,
            SendableMessage::BoxSettings { .. } => MessageType::BoxSettings,
            SendableMessage::LogoType(_) => MessageType::LogoType,
            SendableMessage::HeartBeat => MessageType::HeartBeat,
            SendableMessage::CloseDongle => MessageType::CloseDongle,
            SendableMessage::DisconnectPhone => MessageType::DisconnectPhone,
        }
    }

    /// Serialises to a complete wire frame: header followed by payload.
    pub fn serialise(&self) -> Vec<u8> {
        let payload = self.payload();
        let header = encode_header(self.message_type(), payload.len() as u32);
        let mut frame = Vec::with_capacity(header.len() + payload.len());
        frame.extend_from_slice(&header);
        frame.extend_from_slice(&payload);
        frame
    }

    fn payload(&self) -> Vec<u8> {
        match self {
            SendableMessage::Command(value) => (*value as u32).to_le_bytes().to_vec(),
            SendableMessage::Touch { x, y, action } => {
                let mut buf = Vec::with_capacity(16);
                buf.extend_from_slice(&(*action as u32).to_le_bytes());
                buf.extend_from_slice(&scale_coordinate(*x).to_le_bytes());
                buf.extend_from_slice(&scale_coordinate(*y).to_le_bytes());
                buf.extend_from_slice(&0u32.to_le_bytes());
                buf
            }
            SendableMessage::MultiTouch(touches) => {
                let mut buf = Vec::with_capacity(touches.len() * 16);
                for (id, touch) in touches.iter().enumerate() {
                    buf.extend_from_slice(&touch.x.to_le_bytes());
                    buf.extend_from_slice(&touch.y.to_le_bytes());
                    buf.extend_from_slice(&(touch.action as u32).to_le_bytes());
                    buf.extend_from_slice(&(id as u32).to_le_bytes());
                }
                buf
            }
            SendableMessage::Audio(samples) => {
                let mut buf = Vec::with_capacity(12 + samples.len() * 2);
                // Fixed prefix for microphone PCM: decode type 5 (16 kHz
                // mono), volume 0.0, audio type 3.
                buf.extend_from_slice(&5u32.to_le_bytes());
                buf.extend_from_slice(&0.0f32.to_le_bytes());
                buf.extend_from_slice(&3u32.to_le_bytes());
                for sample in samples {
                    buf.extend_from_slice(&sample.to_le_bytes());
                }
                buf
            }
            SendableMessage::File { file_name, content } => {
                let mut name = file_name.clone().into_bytes();
                name.push(0);
                let mut buf = Vec::with_capacity(8 + name.len() + content.len());
                buf.extend_from_slice(&(name.len() as u32).to_le_bytes());
                buf.extend_from_slice(&name);
                buf.extend_from_slice(&(content.len() as u32).to_le_bytes());
                buf.extend_from_slice(content);
                buf
            }
            SendableMessage::Open(config) => {
                let mut buf = Vec::with_capacity(28);
                for value in [
                    config.width,
                    config.height,
                    config.fps,
                    config.format,
                    config.packet_max,
                    config.i_box_version,
                    config.phone_work_mode,
                ] {
                    buf.extend_from_slice(&value.to_le_bytes());
                }
                buf
            }
            SendableMessage::BoxSettings {
                media_delay,
                sync_time,
                width,
                height,
            } => json!({
                "mediaDelay": media_delay,
                "syncTime": sync_time,
                "androidAutoSizeW": width,
                "androidAutoSizeH": height,
            })
            .to_string()
            .into_bytes(),
            SendableMessage::LogoType(logo) => (*logo as u32).to_le_bytes().to_vec(),
            SendableMessage::HeartBeat
            | SendableMessage::CloseDongle
            | SendableMessage::DisconnectPhone => Vec::new(),
        }
    }
}

/// Maps a normalised coordinate to the dongle's 0..=10000 grid.
fn scale_coordinate(value: f32) -> u32 {
    (value * 10_000.0).clamp(0.0, 10_000.0) as u32
}
