//! Binary codec for the CarLink dongle frame format.
//!
//! Wire format:
//! ```text
//! [magic:4][length:4][type:4][type_check:4][payload:N]
//! ```
//! Total header size: 16 bytes.  All multi-byte integers are little-endian.
//! `type_check` is the bitwise complement of `type`, a cheap integrity check
//! that catches desynchronised reads on the bulk endpoint.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::protocol::messages::{
    AudioCommand, AudioContent, AudioData, CommandValue, MediaInfo, MediaPayload, Message,
    MessageType, Opened, PhoneTypeValue, VideoData, FRAME_MAGIC, HEADER_SIZE,
};

/// Errors produced while decoding a frame header.
#[derive(Debug, Error, PartialEq)]
pub enum HeaderError {
    /// The buffer is not exactly 16 bytes.
    #[error("invalid header size: expected {HEADER_SIZE}, got {received}")]
    InvalidSize { received: usize },

    /// The magic number does not match [`FRAME_MAGIC`].
    #[error("invalid magic number: received 0x{received:08X}")]
    InvalidMagic { received: u32 },

    /// The type-check word is not the complement of the type word.
    #[error("invalid type check: received 0x{received:08X}")]
    InvalidTypeCheck { received: u32 },
}

/// Decoded frame header.
///
/// `kind` keeps the raw u32 so that frames with type codes this build does
/// not know are still well-formed; payload decoding treats them as a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    /// Payload length in bytes (not including this header).
    pub length: u32,
    /// Raw frame type code.
    pub kind: u32,
}

impl MessageHeader {
    /// Returns the typed message kind, if this build knows the code.
    pub fn message_type(&self) -> Option<MessageType> {
        MessageType::try_from(self.kind).ok()
    }
}

// ── Header codec ──────────────────────────────────────────────────────────────

/// Decodes a 16-byte frame header.
///
/// # Errors
///
/// Returns [`HeaderError`] if the buffer size, magic number, or type-check
/// word is wrong.  An unknown type code is NOT an error here.
pub fn decode_header(bytes: &[u8]) -> Result<MessageHeader, HeaderError> {
    if bytes.len() != HEADER_SIZE {
        return Err(HeaderError::InvalidSize {
            received: bytes.len(),
        });
    }

    let magic = read_u32(bytes, 0);
    if magic != FRAME_MAGIC {
        return Err(HeaderError::InvalidMagic { received: magic });
    }

    let length = read_u32(bytes, 4);
    let kind = read_u32(bytes, 8);
    let type_check = read_u32(bytes, 12);
    if type_check != !kind {
        return Err(HeaderError::InvalidTypeCheck {
            received: type_check,
        });
    }

    Ok(MessageHeader { length, kind })
}

/// Encodes a frame header for `kind` with `payload_len` payload bytes.
pub fn encode_header(kind: MessageType, payload_len: u32) -> [u8; HEADER_SIZE] {
    encode_header_raw(kind as u32, payload_len)
}

pub(crate) fn encode_header_raw(kind: u32, payload_len: u32) -> [u8; HEADER_SIZE] {
    let mut buf = [0u8; HEADER_SIZE];
    buf[0..4].copy_from_slice(&FRAME_MAGIC.to_le_bytes());
    buf[4..8].copy_from_slice(&payload_len.to_le_bytes());
    buf[8..12].copy_from_slice(&kind.to_le_bytes());
    buf[12..16].copy_from_slice(&(!kind).to_le_bytes());
    buf
}

// ── Payload decoding ──────────────────────────────────────────────────────────

/// Decodes the payload following `header` into a typed [`Message`].
///
/// Returns `None` for unrecognized type codes and for payloads whose contents
/// cannot be interpreted; both are logged and dropped by the caller.  This is
/// a forward-compatibility no-op, not an error: newer firmware emits frames
/// this build does not know.
pub fn decode_payload(header: &MessageHeader, payload: &[u8]) -> Option<Message> {
    let Some(kind) = header.message_type() else {
        debug!(kind = header.kind, len = payload.len(), "unknown message type, dropping frame");
        return None;
    };

    match kind {
        MessageType::Command => decode_command(payload),
        MessageType::ManufacturerInfo => decode_manufacturer_info(payload),
        MessageType::SoftwareVersion => Some(Message::SoftwareVersion(decode_ascii(payload))),
        MessageType::BluetoothAddress => Some(Message::BluetoothAddress(decode_ascii(payload))),
        MessageType::BluetoothPin => Some(Message::BluetoothPin(decode_ascii(payload))),
        MessageType::BluetoothDeviceName => {
            Some(Message::BluetoothDeviceName(decode_ascii(payload)))
        }
        MessageType::WifiDeviceName => Some(Message::WifiDeviceName(decode_ascii(payload))),
        MessageType::HiCarLink => Some(Message::HiCarLink(decode_ascii(payload))),
        MessageType::BluetoothPairedList => {
            Some(Message::BluetoothPairedList(decode_ascii(payload)))
        }
        MessageType::Plugged => decode_plugged(payload),
        MessageType::Unplugged => Some(Message::Unplugged),
        MessageType::AudioData => decode_audio(payload),
        MessageType::VideoData => decode_video(payload),
        MessageType::MediaData => decode_media(payload),
        MessageType::Open => decode_opened(payload),
        MessageType::BoxSettings => decode_box_info(payload),
        MessageType::Phase => {
            if payload.len() < 4 {
                warn!(len = payload.len(), "short Phase payload");
                return None;
            }
            Some(Message::Phase(read_u32(payload, 0)))
        }
        // Host→device kinds; a dongle never sends these.
        MessageType::Touch
        | MessageType::MultiTouch
        | MessageType::LogoType
        | MessageType::SendFile
        | MessageType::HeartBeat
        | MessageType::CloseDongle
        | MessageType::DisconnectPhone => {
            debug!(?kind, "unexpected host-side message kind from dongle");
            None
        }
    }
}

fn decode_command(payload: &[u8]) -> Option<Message> {
    if payload.len() < 4 {
        warn!(len = payload.len(), "short Command payload");
        return None;
    }
    let value = CommandValue::from(read_u32(payload, 0));
    if let CommandValue::Unknown(raw) = value {
        debug!(value = raw, "command value not in the table, passing through");
    }
    Some(Message::Command(value))
}

fn decode_manufacturer_info(payload: &[u8]) -> Option<Message> {
    if payload.len() < 8 {
        warn!(len = payload.len(), "short ManufacturerInfo payload");
        return None;
    }
    Some(Message::ManufacturerInfo {
        a: read_u32(payload, 0),
        b: read_u32(payload, 4),
    })
}

/// `Plugged` carries either 4 bytes (phone type) or 8 bytes (phone type +
/// wifi flag).  The length is the only discriminant.  Other lengths occur on
/// some firmware; take the phone type from offset 0 when at least 4 bytes
/// are present.
fn decode_plugged(payload: &[u8]) -> Option<Message> {
    if payload.len() < 4 {
        warn!(len = payload.len(), "short Plugged payload");
        return None;
    }
    if payload.len() != 4 && payload.len() != 8 {
        warn!(len = payload.len(), "unexpected Plugged payload length");
    }

    let phone_type = PhoneTypeValue::from(read_u32(payload, 0));
    if let PhoneTypeValue::Unknown(raw) = phone_type {
        warn!(phone_type = raw, "phone type not in the table, passing through");
    }

    let wifi = if payload.len() == 8 {
        Some(read_u32(payload, 4))
    } else {
        None
    };
    Some(Message::Plugged { phone_type, wifi })
}

/// The bytes after the fixed 12-byte prefix have no discriminant; the
/// remaining length disambiguates: 1 ⇒ command, 4 ⇒ volume duration,
/// anything else ⇒ raw PCM.
fn decode_audio(payload: &[u8]) -> Option<Message> {
    if payload.len() < 12 {
        warn!(len = payload.len(), "short AudioData payload");
        return None;
    }
    let decode_type = read_u32(payload, 0);
    let volume = f32::from_le_bytes([payload[4], payload[5], payload[6], payload[7]]);
    let audio_type = read_u32(payload, 8);
    let rest = &payload[12..];

    let content = match rest.len() {
        1 => {
            let raw = rest[0] as i8;
            match AudioCommand::try_from(raw) {
                Ok(command) => AudioContent::Command(command),
                Err(()) => {
                    warn!(command = raw, "unknown audio command, dropping frame");
                    return None;
                }
            }
        }
        4 => AudioContent::VolumeDuration(f32::from_le_bytes([rest[0], rest[1], rest[2], rest[3]])),
        _ => AudioContent::Pcm(
            rest.chunks_exact(2)
                .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
                .collect(),
        ),
    };

    Some(Message::Audio(AudioData {
        decode_type,
        volume,
        audio_type,
        content,
    }))
}

fn decode_video(payload: &[u8]) -> Option<Message> {
    if payload.len() < 20 {
        warn!(len = payload.len(), "short VideoData payload");
        return None;
    }
    Some(Message::Video(VideoData {
        width: read_u32(payload, 0),
        height: read_u32(payload, 4),
        flags: read_u32(payload, 8),
        length: read_u32(payload, 12),
        unknown: read_u32(payload, 16),
        data: payload[20..].to_vec(),
    }))
}

/// JFIF start-of-image marker including the APP0 segment prefix, used to
/// locate album art inside an oversized media payload.
const JFIF_MARKER: [u8; 12] = [
    0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0x01,
];

/// JPEG end-of-image marker.
const EOI_MARKER: [u8; 2] = [0xFF, 0xD9];

fn decode_media(payload: &[u8]) -> Option<Message> {
    if payload.len() < 4 {
        warn!(len = payload.len(), "short MediaData payload");
        return None;
    }
    match read_u32(payload, 0) {
        1 => {
            // Metadata JSON, with a trailing NUL byte to strip.
            let text = &payload[4..payload.len().saturating_sub(1).max(4)];
            match serde_json::from_slice::<MediaInfo>(text) {
                Ok(info) => Some(Message::Media(MediaPayload::SongInfo(info))),
                Err(e) => {
                    warn!(error = %e, "malformed media metadata JSON");
                    None
                }
            }
        }
        3 => Some(Message::Media(MediaPayload::AlbumCover(extract_album_cover(
            &payload[4..],
        )))),
        other => {
            info!(media_type = other, "unexpected media type");
            None
        }
    }
}

/// Trims album-art bytes to the JFIF SOI..EOI range.
///
/// Payloads over 512 bytes sometimes carry framing garbage around the image;
/// scanning for the markers recovers the picture.  Smaller payloads, and
/// payloads without recognizable markers, pass through unchanged.
fn extract_album_cover(image: &[u8]) -> Vec<u8> {
    if image.len() <= 512 {
        return image.to_vec();
    }
    let Some(start) = find_subslice(image, &JFIF_MARKER) else {
        return image.to_vec();
    };
    match find_subslice(&image[start + JFIF_MARKER.len()..], &EOI_MARKER) {
        Some(rel_end) => {
            let end = start + JFIF_MARKER.len() + rel_end + EOI_MARKER.len();
            image[start..end].to_vec()
        }
        None => {
            debug!("no JPEG end-of-image marker found in album cover");
            image[start..].to_vec()
        }
    }
}

fn decode_opened(payload: &[u8]) -> Option<Message> {
    if payload.len() < 28 {
        warn!(len = payload.len(), "short Opened payload");
        return None;
    }
    Some(Message::Opened(Opened {
        width: read_u32(payload, 0),
        height: read_u32(payload, 4),
        fps: read_u32(payload, 8),
        format: read_u32(payload, 12),
        packet_max: read_u32(payload, 16),
        i_box: read_u32(payload, 20),
        phone_mode: read_u32(payload, 24),
    }))
}

fn decode_box_info(payload: &[u8]) -> Option<Message> {
    match serde_json::from_slice(payload) {
        Ok(settings) => Some(Message::BoxInfo(settings)),
        Err(e) => {
            warn!(error = %e, "malformed box info JSON");
            None
        }
    }
}

// ── Utility helpers ───────────────────────────────────────────────────────────

fn read_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]])
}

/// ASCII string payloads are not null-terminated; lossy conversion keeps the
/// decoder total in the face of junk bytes.
fn decode_ascii(payload: &[u8]) -> String {
    String::from_utf8_lossy(payload).into_owned()
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::messages::{CommandMapping, PhoneType};

    fn header_for(kind: MessageType, length: u32) -> MessageHeader {
        decode_header(&encode_header(kind, length)).expect("header must decode")
    }

    // ── Header ───────────────────────────────────────────────────────────────

    #[test]
    fn test_header_round_trip() {
        for (kind, length) in [
            (MessageType::Open, 28),
            (MessageType::HeartBeat, 0),
            (MessageType::VideoData, 65_536),
            (MessageType::SoftwareVersion, 12),
        ] {
            let header = header_for(kind, length);
            assert_eq!(header.length, length);
            assert_eq!(header.message_type(), Some(kind));
        }
    }

    #[test]
    fn test_header_wire_layout() {
        let bytes = encode_header(MessageType::Command, 4);
        assert_eq!(&bytes[0..4], &0x55AA_55AAu32.to_le_bytes());
        assert_eq!(&bytes[4..8], &4u32.to_le_bytes());
        assert_eq!(&bytes[8..12], &8u32.to_le_bytes());
        assert_eq!(&bytes[12..16], &(!8u32).to_le_bytes());
    }

    #[test]
    fn test_decode_header_rejects_wrong_size() {
        assert_eq!(
            decode_header(&[0u8; 15]),
            Err(HeaderError::InvalidSize { received: 15 })
        );
        assert_eq!(
            decode_header(&[0u8; 17]),
            Err(HeaderError::InvalidSize { received: 17 })
        );
        assert_eq!(decode_header(&[]), Err(HeaderError::InvalidSize { received: 0 }));
    }

    #[test]
    fn test_decode_header_rejects_corrupted_magic() {
        let mut bytes = encode_header(MessageType::Open, 0);
        bytes[0] = 0x00;
        let received = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        assert_eq!(
            decode_header(&bytes),
            Err(HeaderError::InvalidMagic { received })
        );
    }

    #[test]
    fn test_decode_header_rejects_corrupted_type_check() {
        let mut bytes = encode_header(MessageType::Open, 0);
        bytes[12] ^= 0xFF;
        let received = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]);
        assert_eq!(
            decode_header(&bytes),
            Err(HeaderError::InvalidTypeCheck { received })
        );
    }

    #[test]
    fn test_decode_header_accepts_unknown_type_code() {
        // Forward compatibility: the header is valid, payload decode drops it.
        let bytes = encode_header_raw(0x7777, 4);
        let header = decode_header(&bytes).expect("unknown kind must still decode");
        assert_eq!(header.kind, 0x7777);
        assert_eq!(header.message_type(), None);
        assert_eq!(decode_payload(&header, &[0, 0, 0, 0]), None);
    }

    // ── Plugged ──────────────────────────────────────────────────────────────

    #[test]
    fn test_plugged_with_wifi_field() {
        let header = header_for(MessageType::Plugged, 8);
        let mut payload = Vec::new();
        payload.extend_from_slice(&3u32.to_le_bytes());
        payload.extend_from_slice(&1u32.to_le_bytes());

        let msg = decode_payload(&header, &payload).unwrap();
        assert_eq!(
            msg,
            Message::Plugged {
                phone_type: PhoneTypeValue::Known(PhoneType::CarPlay),
                wifi: Some(1),
            }
        );
    }

    #[test]
    fn test_plugged_without_wifi_field() {
        let header = header_for(MessageType::Plugged, 4);
        let payload = 3u32.to_le_bytes();

        let msg = decode_payload(&header, &payload).unwrap();
        assert_eq!(
            msg,
            Message::Plugged {
                phone_type: PhoneTypeValue::Known(PhoneType::CarPlay),
                wifi: None,
            }
        );
    }

    #[test]
    fn test_plugged_odd_length_takes_phone_type_from_offset_zero() {
        let header = header_for(MessageType::Plugged, 6);
        let mut payload = Vec::new();
        payload.extend_from_slice(&5u32.to_le_bytes());
        payload.extend_from_slice(&[0xAA, 0xBB]);

        let msg = decode_payload(&header, &payload).unwrap();
        assert_eq!(
            msg,
            Message::Plugged {
                phone_type: PhoneTypeValue::Known(PhoneType::AndroidAuto),
                wifi: None,
            }
        );
    }

    #[test]
    fn test_plugged_unknown_phone_type_is_preserved_numerically() {
        let header = header_for(MessageType::Plugged, 8);
        let mut payload = Vec::new();
        payload.extend_from_slice(&9u32.to_le_bytes());
        payload.extend_from_slice(&1u32.to_le_bytes());

        let msg = decode_payload(&header, &payload).unwrap();
        assert_eq!(
            msg,
            Message::Plugged {
                phone_type: PhoneTypeValue::Unknown(9),
                wifi: Some(1),
            }
        );
    }

    // ── AudioData ────────────────────────────────────────────────────────────

    fn audio_prefix(decode_type: u32, volume: f32, audio_type: u32) -> Vec<u8> {
        let mut payload = Vec::new();
        payload.extend_from_slice(&decode_type.to_le_bytes());
        payload.extend_from_slice(&volume.to_le_bytes());
        payload.extend_from_slice(&audio_type.to_le_bytes());
        payload
    }

    #[test]
    fn test_audio_one_trailing_byte_is_a_command() {
        let mut payload = audio_prefix(5, 0.5, 1);
        payload.push(1); // AudioOutputStart

        let header = header_for(MessageType::AudioData, payload.len() as u32);
        let Message::Audio(audio) = decode_payload(&header, &payload).unwrap() else {
            panic!("expected AudioData");
        };
        assert_eq!(audio.decode_type, 5);
        assert_eq!(audio.audio_type, 1);
        assert_eq!(audio.content, AudioContent::Command(AudioCommand::AudioOutputStart));
    }

    #[test]
    fn test_audio_four_trailing_bytes_are_volume_duration() {
        let mut payload = audio_prefix(5, 1.0, 2);
        payload.extend_from_slice(&0.25f32.to_le_bytes());

        let header = header_for(MessageType::AudioData, payload.len() as u32);
        let Message::Audio(audio) = decode_payload(&header, &payload).unwrap() else {
            panic!("expected AudioData");
        };
        assert_eq!(audio.content, AudioContent::VolumeDuration(0.25));
    }

    #[test]
    fn test_audio_other_lengths_are_pcm_samples() {
        let mut payload = audio_prefix(1, 1.0, 2);
        // 500 sample bytes = 250 i16 samples, total payload 512 bytes
        for i in 0..250u16 {
            payload.extend_from_slice(&(i as i16).to_le_bytes());
        }
        assert_eq!(payload.len(), 512);

        let header = header_for(MessageType::AudioData, payload.len() as u32);
        let Message::Audio(audio) = decode_payload(&header, &payload).unwrap() else {
            panic!("expected AudioData");
        };
        let AudioContent::Pcm(samples) = audio.content else {
            panic!("expected PCM content");
        };
        assert_eq!(samples.len(), 250);
        assert_eq!(samples[0], 0);
        assert_eq!(samples[249], 249);
    }

    #[test]
    fn test_audio_empty_tail_is_empty_pcm() {
        let payload = audio_prefix(5, 0.0, 3);
        let header = header_for(MessageType::AudioData, payload.len() as u32);
        let Message::Audio(audio) = decode_payload(&header, &payload).unwrap() else {
            panic!("expected AudioData");
        };
        assert_eq!(audio.content, AudioContent::Pcm(Vec::new()));
    }

    // ── VideoData ────────────────────────────────────────────────────────────

    #[test]
    fn test_video_payload_starts_at_offset_20() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&800u32.to_le_bytes());
        payload.extend_from_slice(&480u32.to_le_bytes());
        payload.extend_from_slice(&0u32.to_le_bytes());
        payload.extend_from_slice(&4u32.to_le_bytes());
        payload.extend_from_slice(&0u32.to_le_bytes());
        payload.extend_from_slice(&[0x00, 0x00, 0x00, 0x01]); // NAL start code

        let header = header_for(MessageType::VideoData, payload.len() as u32);
        let Message::Video(video) = decode_payload(&header, &payload).unwrap() else {
            panic!("expected VideoData");
        };
        assert_eq!(video.width, 800);
        assert_eq!(video.height, 480);
        assert_eq!(video.data, vec![0x00, 0x00, 0x00, 0x01]);
    }

    // ── MediaData ────────────────────────────────────────────────────────────

    #[test]
    fn test_media_song_info() {
        let json = br#"{"MediaSongName":"Track","MediaSongDuration":12.5}"#;
        let mut payload = Vec::new();
        payload.extend_from_slice(&1u32.to_le_bytes());
        payload.extend_from_slice(json);
        payload.push(0); // trailing NUL

        let header = header_for(MessageType::MediaData, payload.len() as u32);
        let Message::Media(MediaPayload::SongInfo(info)) =
            decode_payload(&header, &payload).unwrap()
        else {
            panic!("expected song info");
        };
        assert_eq!(info.song_name.as_deref(), Some("Track"));
        assert_eq!(info.song_duration, Some(12.5));
    }

    #[test]
    fn test_media_small_album_cover_passes_through() {
        let image = vec![0xFF, 0xD8, 0xFF, 0xD9];
        let mut payload = Vec::new();
        payload.extend_from_slice(&3u32.to_le_bytes());
        payload.extend_from_slice(&image);

        let header = header_for(MessageType::MediaData, payload.len() as u32);
        let Message::Media(MediaPayload::AlbumCover(data)) =
            decode_payload(&header, &payload).unwrap()
        else {
            panic!("expected album cover");
        };
        assert_eq!(data, image);
    }

    #[test]
    fn test_media_large_album_cover_is_trimmed_to_jfif_markers() {
        let mut image = vec![0xAB; 100]; // leading garbage
        image.extend_from_slice(&JFIF_MARKER);
        image.extend_from_slice(&[0x11; 600]); // image body
        image.extend_from_slice(&EOI_MARKER);
        image.extend_from_slice(&[0xCD; 50]); // trailing garbage

        let mut payload = Vec::new();
        payload.extend_from_slice(&3u32.to_le_bytes());
        payload.extend_from_slice(&image);

        let header = header_for(MessageType::MediaData, payload.len() as u32);
        let Message::Media(MediaPayload::AlbumCover(data)) =
            decode_payload(&header, &payload).unwrap()
        else {
            panic!("expected album cover");
        };
        assert_eq!(&data[..JFIF_MARKER.len()], &JFIF_MARKER);
        assert_eq!(&data[data.len() - 2..], &EOI_MARKER);
        assert_eq!(data.len(), JFIF_MARKER.len() + 600 + EOI_MARKER.len());
    }

    #[test]
    fn test_media_unknown_tag_is_dropped() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&7u32.to_le_bytes());
        let header = header_for(MessageType::MediaData, payload.len() as u32);
        assert_eq!(decode_payload(&header, &payload), None);
    }

    // ── Misc ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_unplugged_has_no_payload() {
        let header = header_for(MessageType::Unplugged, 0);
        assert_eq!(decode_payload(&header, &[]), Some(Message::Unplugged));
    }

    #[test]
    fn test_command_decodes_known_value() {
        let header = header_for(MessageType::Command, 4);
        let payload = (CommandMapping::Siri as u32).to_le_bytes();
        assert_eq!(
            decode_payload(&header, &payload),
            Some(Message::Command(CommandValue::Known(CommandMapping::Siri)))
        );
    }

    #[test]
    fn test_command_unknown_value_passes_through_raw() {
        let header = header_for(MessageType::Command, 4);
        let payload = 0x9999u32.to_le_bytes();
        assert_eq!(
            decode_payload(&header, &payload),
            Some(Message::Command(CommandValue::Unknown(0x9999)))
        );
    }

    #[test]
    fn test_opened_decodes_seven_words() {
        let mut payload = Vec::new();
        for v in [800u32, 480, 60, 5, 49_152, 2, 2] {
            payload.extend_from_slice(&v.to_le_bytes());
        }
        let header = header_for(MessageType::Open, payload.len() as u32);
        let Message::Opened(opened) = decode_payload(&header, &payload).unwrap() else {
            panic!("expected Opened");
        };
        assert_eq!(opened.width, 800);
        assert_eq!(opened.packet_max, 49_152);
        assert_eq!(opened.phone_mode, 2);
    }

    #[test]
    fn test_box_info_decodes_json_blob() {
        let json = br#"{"boxType":"adapter","hwVersion":"1.0","WiFiChannel":36}"#;
        let header = header_for(MessageType::BoxSettings, json.len() as u32);
        let Message::BoxInfo(settings) = decode_payload(&header, json).unwrap() else {
            panic!("expected BoxInfo");
        };
        assert_eq!(settings["WiFiChannel"], 36);
    }

    #[test]
    fn test_software_version_is_ascii() {
        let header = header_for(MessageType::SoftwareVersion, 10);
        assert_eq!(
            decode_payload(&header, b"2021.03.01"),
            Some(Message::SoftwareVersion("2021.03.01".to_string()))
        );
    }
}
