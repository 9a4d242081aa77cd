//! All CarLink dongle protocol message types.
//!
//! Every frame on the USB bulk channel starts with a 16-byte header (see
//! [`crate::protocol::codec`]) whose `type` field selects one of the message
//! kinds below.  The numeric codes are protocol constants spoken by real
//! dongle firmware and must not be renumbered.

use serde::{Deserialize, Serialize};

// ── Protocol constants ────────────────────────────────────────────────────────

/// Magic number at the start of every frame header (little-endian on wire).
pub const FRAME_MAGIC: u32 = 0x55AA_55AA;

/// Total size of the frame header in bytes.
pub const HEADER_SIZE: usize = 16;

// ── Message type codes ────────────────────────────────────────────────────────

/// All frame type codes spoken by the dongle.
///
/// Codes not listed here do occur on real hardware (newer firmware); the
/// decoder treats them as a forward-compatibility no-op, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u32)]
pub enum MessageType {
    Open = 0x01,
    Plugged = 0x02,
    Phase = 0x03,
    Unplugged = 0x04,
    Touch = 0x05,
    VideoData = 0x06,
    AudioData = 0x07,
    Command = 0x08,
    LogoType = 0x09,
    BluetoothAddress = 0x0A,
    BluetoothPin = 0x0C,
    BluetoothDeviceName = 0x0D,
    WifiDeviceName = 0x0E,
    DisconnectPhone = 0x0F,
    BluetoothPairedList = 0x12,
    ManufacturerInfo = 0x14,
    CloseDongle = 0x15,
    MultiTouch = 0x17,
    HiCarLink = 0x18,
    BoxSettings = 0x19,
    MediaData = 0x2A,
    SendFile = 0x99,
    HeartBeat = 0xAA,
    SoftwareVersion = 0xCC,
}

impl TryFrom<u32> for MessageType {
    type Error = ();

    fn try_from(value: u32) -> Result<Self, ()> {
        match value {
            0x01 => Ok(MessageType::Open),
            0x02 => Ok(MessageType::Plugged),
            0x03 => Ok(MessageType::Phase),
            0x04 => Ok(MessageType::Unplugged),
            0x05 => Ok(MessageType::Touch),
            0x06 => Ok(MessageType::VideoData),
            0x07 => Ok(MessageType::AudioData),
            0x08 => Ok(MessageType::Command),
            0x09 => Ok(MessageType::LogoType),
            0x0A => Ok(MessageType::BluetoothAddress),
            0x0C => Ok(MessageType::BluetoothPin),
            0x0D => Ok(MessageType::BluetoothDeviceName),
            0x0E => Ok(MessageType::WifiDeviceName),
            0x0F => Ok(MessageType::DisconnectPhone),
            0x12 => Ok(MessageType::BluetoothPairedList),
            0x14 => Ok(MessageType::ManufacturerInfo),
            0x15 => Ok(MessageType::CloseDongle),
            0x17 => Ok(MessageType::MultiTouch),
            0x18 => Ok(MessageType::HiCarLink),
            0x19 => Ok(MessageType::BoxSettings),
            0x2A => Ok(MessageType::MediaData),
            0x99 => Ok(MessageType::SendFile),
            0xAA => Ok(MessageType::HeartBeat),
            0xCC => Ok(MessageType::SoftwareVersion),
            _ => Err(()),
        }
    }
}

// ── Command table ─────────────────────────────────────────────────────────────

/// Command codes carried by `Command` frames in both directions.
///
/// Host→device these are control requests (wifi setup, mic selection, media
/// keys); device→host they report link state transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u32)]
pub enum CommandMapping {
    Invalid = 0,
    StartRecordAudio = 1,
    StopRecordAudio = 2,
    /// "My Car" button on the CarPlay interface.
    RequestHostUi = 3,
    Siri = 5,
    /// Use the car (host OS) microphone.
    Mic = 7,
    /// Periodic frame-request nudge some phones need to keep streaming.
    Frame = 12,
    /// Use the dongle's own microphone.
    BoxMic = 15,
    EnableNightMode = 16,
    DisableNightMode = 17,
    /// Phone streams audio directly to the car, bypassing the dongle.
    AudioTransferOn = 22,
    /// Default: phone streams audio to the dongle, dongle relays it.
    AudioTransferOff = 23,
    Wifi24g = 24,
    Wifi5g = 25,
    Left = 100,
    Right = 101,
    SelectDown = 104,
    SelectUp = 105,
    Back = 106,
    Up = 113,
    Down = 114,
    Home = 200,
    Play = 201,
    Pause = 202,
    PlayOrPause = 203,
    Next = 204,
    Prev = 205,
    AcceptPhone = 300,
    RejectPhone = 301,
    RequestVideoFocus = 500,
    ReleaseVideoFocus = 501,
    WifiEnable = 1000,
    AutoConnectEnable = 1001,
    WifiConnect = 1002,
    ScanningDevice = 1003,
    DeviceFound = 1004,
    DeviceNotFound = 1005,
    ConnectDeviceFailed = 1006,
    BtConnected = 1007,
    BtDisconnected = 1008,
    WifiConnected = 1009,
    WifiDisconnected = 1010,
    BtPairStart = 1011,
    WifiPair = 1012,
}

impl TryFrom<u32> for CommandMapping {
    type Error = ();

    fn try_from(value: u32) -> Result<Self, ()> {
        match value {
            0 => Ok(CommandMapping::Invalid),
            1 => Ok(CommandMapping::StartRecordAudio),
            2 => Ok(CommandMapping::StopRecordAudio),
            3 => Ok(CommandMapping::RequestHostUi),
            5 => Ok(CommandMapping::Siri),
            7 => Ok(CommandMapping::Mic),
            12 => Ok(CommandMapping::Frame),
            15 => Ok(CommandMapping::BoxMic),
            16 => Ok(CommandMapping::EnableNightMode),
            17 => Ok(CommandMapping::DisableNightMode),
            22 => Ok(CommandMapping::AudioTransferOn),
            23 => Ok(CommandMapping::AudioTransferOff),
            24 => Ok(CommandMapping::Wifi24g),
            25 => Ok(CommandMapping::Wifi5g),
            100 => Ok(CommandMapping::Left),
            101 => Ok(CommandMapping::Right),
            104 => Ok(CommandMapping::SelectDown),
            105 => Ok(CommandMapping::SelectUp),
            106 => Ok(CommandMapping::Back),
            113 => Ok(CommandMapping::Up),
            114 => Ok(CommandMapping::Down),
            200 => Ok(CommandMapping::Home),
            201 => Ok(CommandMapping::Play),
            202 => Ok(CommandMapping::Pause),
            203 => Ok(CommandMapping::PlayOrPause),
            204 => Ok(CommandMapping::Next),
            205 => Ok(CommandMapping::Prev),
            300 => Ok(CommandMapping::AcceptPhone),
            301 => Ok(CommandMapping::RejectPhone),
            500 => Ok(CommandMapping::RequestVideoFocus),
            501 => Ok(CommandMapping::ReleaseVideoFocus),
            1000 => Ok(CommandMapping::WifiEnable),
            1001 => Ok(CommandMapping::AutoConnectEnable),
            1002 => Ok(CommandMapping::WifiConnect),
            1003 => Ok(CommandMapping::ScanningDevice),
            1004 => Ok(CommandMapping::DeviceFound),
            1005 => Ok(CommandMapping::DeviceNotFound),
            1006 => Ok(CommandMapping::ConnectDeviceFailed),
            1007 => Ok(CommandMapping::BtConnected),
            1008 => Ok(CommandMapping::BtDisconnected),
            1009 => Ok(CommandMapping::WifiConnected),
            1010 => Ok(CommandMapping::WifiDisconnected),
            1011 => Ok(CommandMapping::BtPairStart),
            1012 => Ok(CommandMapping::WifiPair),
            _ => Err(()),
        }
    }
}

/// A `Command` payload value as read off the wire.
///
/// Newer firmware emits command codes this build's table does not have; those
/// are passed through numerically instead of being dropped, so consumers can
/// still log or forward them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandValue {
    Known(CommandMapping),
    Unknown(u32),
}

impl CommandValue {
    /// The table entry, if the code is in the table.
    pub fn known(self) -> Option<CommandMapping> {
        match self {
            CommandValue::Known(command) => Some(command),
            CommandValue::Unknown(_) => None,
        }
    }

    /// The wire code, known or not.
    pub fn as_u32(self) -> u32 {
        match self {
            CommandValue::Known(command) => command as u32,
            CommandValue::Unknown(raw) => raw,
        }
    }
}

impl From<u32> for CommandValue {
    fn from(raw: u32) -> CommandValue {
        CommandMapping::try_from(raw)
            .map(CommandValue::Known)
            .unwrap_or(CommandValue::Unknown(raw))
    }
}

// ── Phone types ───────────────────────────────────────────────────────────────

/// Phone protocol variant reported in `Plugged` frames.
///
/// Affects frame-request cadence: CarPlay phones need a periodic `Frame`
/// command nudge, Android Auto phones stream without one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum PhoneType {
    AndroidMirror = 1,
    CarPlay = 3,
    IPhoneMirror = 4,
    AndroidAuto = 5,
    HiCar = 6,
}

impl TryFrom<u32> for PhoneType {
    type Error = ();

    fn try_from(value: u32) -> Result<Self, ()> {
        match value {
            1 => Ok(PhoneType::AndroidMirror),
            3 => Ok(PhoneType::CarPlay),
            4 => Ok(PhoneType::IPhoneMirror),
            5 => Ok(PhoneType::AndroidAuto),
            6 => Ok(PhoneType::HiCar),
            _ => Err(()),
        }
    }
}

/// Phone type as reported in a `Plugged` frame.
///
/// Codes outside the [`PhoneType`] table are preserved numerically; the
/// session treats them as phones without a frame-request cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhoneTypeValue {
    Known(PhoneType),
    Unknown(u32),
}

impl PhoneTypeValue {
    pub fn known(self) -> Option<PhoneType> {
        match self {
            PhoneTypeValue::Known(phone_type) => Some(phone_type),
            PhoneTypeValue::Unknown(_) => None,
        }
    }

    pub fn as_u32(self) -> u32 {
        match self {
            PhoneTypeValue::Known(phone_type) => phone_type as u32,
            PhoneTypeValue::Unknown(raw) => raw,
        }
    }
}

impl From<u32> for PhoneTypeValue {
    fn from(raw: u32) -> PhoneTypeValue {
        PhoneType::try_from(raw)
            .map(PhoneTypeValue::Known)
            .unwrap_or(PhoneTypeValue::Unknown(raw))
    }
}

// ── Audio ─────────────────────────────────────────────────────────────────────

/// Audio stream control commands carried in 1-byte `AudioData` payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i8)]
pub enum AudioCommand {
    AudioOutputStart = 1,
    AudioOutputStop = 2,
    AudioInputConfig = 3,
    AudioPhonecallStart = 4,
    AudioPhonecallStop = 5,
    AudioNaviStart = 6,
    AudioNaviStop = 7,
    AudioSiriStart = 8,
    AudioSiriStop = 9,
    AudioMediaStart = 10,
    AudioMediaStop = 11,
    AudioAlertStart = 12,
    AudioAlertStop = 13,
}

impl TryFrom<i8> for AudioCommand {
    type Error = ();

    fn try_from(value: i8) -> Result<Self, ()> {
        match value {
            1 => Ok(AudioCommand::AudioOutputStart),
            2 => Ok(AudioCommand::AudioOutputStop),
            3 => Ok(AudioCommand::AudioInputConfig),
            4 => Ok(AudioCommand::AudioPhonecallStart),
            5 => Ok(AudioCommand::AudioPhonecallStop),
            6 => Ok(AudioCommand::AudioNaviStart),
            7 => Ok(AudioCommand::AudioNaviStop),
            8 => Ok(AudioCommand::AudioSiriStart),
            9 => Ok(AudioCommand::AudioSiriStop),
            10 => Ok(AudioCommand::AudioMediaStart),
            11 => Ok(AudioCommand::AudioMediaStop),
            12 => Ok(AudioCommand::AudioAlertStart),
            13 => Ok(AudioCommand::AudioAlertStop),
            _ => Err(()),
        }
    }
}

/// PCM format described by a `decode_type` code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    pub frequency: u32,
    pub channels: u8,
    pub bit_depth: u8,
}

/// Maps the 7 known `decode_type` codes to their PCM format.
///
/// Protocol constant, not configurable.
pub fn decode_type_format(decode_type: u32) -> Option<AudioFormat> {
    let (frequency, channels) = match decode_type {
        1 | 2 => (44_100, 2),
        3 => (8_000, 1),
        4 => (48_000, 2),
        5 => (16_000, 1),
        6 => (24_000, 1),
        7 => (16_000, 2),
        _ => return None,
    };
    Some(AudioFormat {
        frequency,
        channels,
        bit_depth: 16,
    })
}

/// Shape of the bytes following the fixed 12-byte `AudioData` prefix.
///
/// The wire format has no discriminant; the remaining payload length is the
/// only signal (1 byte ⇒ command, 4 bytes ⇒ volume duration, else PCM).
#[derive(Debug, Clone, PartialEq)]
pub enum AudioContent {
    /// Stream control command (Siri / phonecall / media start-stop).
    Command(AudioCommand),
    /// Duration in seconds for a volume ramp.
    VolumeDuration(f32),
    /// Raw signed 16-bit little-endian PCM samples.
    Pcm(Vec<i16>),
}

/// Decoded `AudioData` frame.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioData {
    /// Index into the audio format table, see [`decode_type_format`].
    pub decode_type: u32,
    pub volume: f32,
    pub audio_type: u32,
    pub content: AudioContent,
}

// ── Video ─────────────────────────────────────────────────────────────────────

/// Decoded `VideoData` frame: one H.264 chunk plus stream geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoData {
    pub width: u32,
    pub height: u32,
    pub flags: u32,
    pub length: u32,
    pub unknown: u32,
    /// Raw H.264 bytes, handed to the consumer's decoder untouched.
    pub data: Vec<u8>,
}

// ── Media metadata ────────────────────────────────────────────────────────────

/// Now-playing metadata reported by the phone.
///
/// Field names mirror the JSON keys the dongle emits.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MediaInfo {
    #[serde(rename = "MediaSongName", skip_serializing_if = "Option::is_none")]
    pub song_name: Option<String>,
    #[serde(rename = "MediaAlbumName", skip_serializing_if = "Option::is_none")]
    pub album_name: Option<String>,
    #[serde(rename = "MediaArtistName", skip_serializing_if = "Option::is_none")]
    pub artist_name: Option<String>,
    #[serde(rename = "MediaAPPName", skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    #[serde(rename = "MediaSongDuration", skip_serializing_if = "Option::is_none")]
    pub song_duration: Option<f64>,
    #[serde(rename = "MediaSongPlayTime", skip_serializing_if = "Option::is_none")]
    pub song_play_time: Option<f64>,
}

/// Payload of a `MediaData` frame, selected by the u32 type tag at offset 0.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaPayload {
    /// Tag 1: JSON song metadata.
    SongInfo(MediaInfo),
    /// Tag 3: album art, JPEG/JFIF bytes.
    AlbumCover(Vec<u8>),
}

// ── Misc payload structs ──────────────────────────────────────────────────────

/// Stream parameters echoed by the dongle in response to `Open`.
#[derive(Debug, Clone, PartialEq)]
pub struct Opened {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub format: u32,
    pub packet_max: u32,
    pub i_box: u32,
    pub phone_mode: u32,
}

// ── The readable message sum type ─────────────────────────────────────────────

/// Every device→host message, decoded.
///
/// Produced by [`crate::protocol::codec::decode_payload`], consumed once by
/// the dispatch callback, then dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Command(CommandValue),
    ManufacturerInfo { a: u32, b: u32 },
    SoftwareVersion(String),
    BluetoothAddress(String),
    BluetoothPin(String),
    BluetoothDeviceName(String),
    WifiDeviceName(String),
    HiCarLink(String),
    BluetoothPairedList(String),
    Plugged { phone_type: PhoneTypeValue, wifi: Option<u32> },
    Unplugged,
    Audio(AudioData),
    Video(VideoData),
    Media(MediaPayload),
    Opened(Opened),
    /// Dongle hardware/firmware description, a free-form JSON blob.
    BoxInfo(serde_json::Value),
    Phase(u32),
}
