//! Dongle configuration.
//!
//! Everything here flows into the configuration batch sent right after the
//! `Open` frame, plus a few host-side knobs (frame-request cadence per phone
//! type, mic selection).  Defaults match what the adapter firmware expects
//! out of the box.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::protocol::messages::PhoneType;

/// Steering wheel side, written to `/tmp/hand_drive_mode` on the dongle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u32)]
pub enum HandDriveType {
    Lhd = 0,
    Rhd = 1,
}

/// Wifi band the dongle should advertise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WifiType {
    #[serde(rename = "2.4ghz")]
    Band24,
    #[serde(rename = "5ghz")]
    Band5,
}

/// Which microphone feeds voice audio to the phone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MicType {
    /// Host OS microphone, forwarded over USB.
    Os,
    /// The dongle's own built-in microphone.
    Box,
}

/// Per-phone-type tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhoneTypeConfig {
    /// Interval in milliseconds between `Frame` command nudges while this
    /// phone type is streaming.  `None` disables the nudge.
    pub frame_interval: Option<u64>,
}

/// Full dongle configuration.
///
/// Every field has a default so a partial config file (or none at all)
/// still yields a working setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DongleConfig {
    /// Enables Android work mode on firmware that supports it.
    #[serde(default)]
    pub android_work_mode: Option<bool>,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_dpi")]
    pub dpi: u32,
    #[serde(default = "default_format")]
    pub format: u32,
    #[serde(default = "default_i_box_version")]
    pub i_box_version: u32,
    #[serde(default = "default_packet_max")]
    pub packet_max: u32,
    #[serde(default = "default_phone_work_mode")]
    pub phone_work_mode: u32,
    #[serde(default)]
    pub night_mode: bool,
    #[serde(default = "default_box_name")]
    pub box_name: String,
    #[serde(default = "default_hand")]
    pub hand: HandDriveType,
    /// Audio/video sync delay in milliseconds, sent in the box settings JSON.
    #[serde(default = "default_media_delay")]
    pub media_delay: u32,
    /// When true the phone streams audio directly to the car instead of
    /// relaying PCM through the dongle.
    #[serde(default)]
    pub audio_transfer_mode: bool,
    #[serde(default = "default_wifi_type")]
    pub wifi_type: WifiType,
    #[serde(default = "default_mic_type")]
    pub mic_type: MicType,
    #[serde(default = "default_phone_config")]
    pub phone_config: HashMap<PhoneType, PhoneTypeConfig>,
}

fn default_width() -> u32 {
    800
}

fn default_height() -> u32 {
    480
}

fn default_fps() -> u32 {
    60
}

fn default_dpi() -> u32 {
    160
}

fn default_format() -> u32 {
    5
}

fn default_i_box_version() -> u32 {
    2
}

fn default_packet_max() -> u32 {
    49_152
}

fn default_phone_work_mode() -> u32 {
    2
}

fn default_box_name() -> String {
    "carlink".to_string()
}

fn default_hand() -> HandDriveType {
    HandDriveType::Lhd
}

fn default_media_delay() -> u32 {
    300
}

fn default_wifi_type() -> WifiType {
    WifiType::Band5
}

fn default_mic_type() -> MicType {
    MicType::Os
}

fn default_phone_config() -> HashMap<PhoneType, PhoneTypeConfig> {
    let mut map = HashMap::new();
    // CarPlay stalls without a periodic frame request; Android Auto streams
    // continuously on its own.
    map.insert(
        PhoneType::CarPlay,
        PhoneTypeConfig {
            frame_interval: Some(5000),
        },
    );
    map.insert(PhoneType::AndroidAuto, PhoneTypeConfig { frame_interval: None });
    map
}

impl Default for DongleConfig {
    fn default() -> Self {
        DongleConfig {
            android_work_mode: None,
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
            dpi: default_dpi(),
            format: default_format(),
            i_box_version: default_i_box_version(),
            packet_max: default_packet_max(),
            phone_work_mode: default_phone_work_mode(),
            night_mode: false,
            box_name: default_box_name(),
            hand: default_hand(),
            media_delay: default_media_delay(),
            audio_transfer_mode: false,
            wifi_type: default_wifi_type(),
            mic_type: default_mic_type(),
            phone_config: default_phone_config(),
        }
    }
}

impl DongleConfig {
    /// Frame-request interval for `phone_type`, if one is configured.
    pub fn frame_interval(&self, phone_type: PhoneType) -> Option<u64> {
        self.phone_config
            .get(&phone_type)
            .and_then(|cfg| cfg.frame_interval)
    }
}
