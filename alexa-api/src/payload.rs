//! Player session payload returned by `get_state`
//!
//! Every field is optional on the wire: devices that are idle report a bare
//! `playerInfo` with no `state`, and devices without the music skill report
//! no `playerInfo` at all.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Top-level response of the player state endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    #[serde(default)]
    pub player_info: Option<PlayerInfo>,
}

impl SessionState {
    pub fn new(player_info: PlayerInfo) -> Self {
        Self {
            player_info: Some(player_info),
        }
    }

    /// An empty session (device has nothing to report)
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Player details of one device or group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    /// PLAYING, PAUSED, IDLE or anything else the service invents
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub progress: Option<Progress>,
    #[serde(default)]
    pub info_text: Option<InfoText>,
    #[serde(default)]
    pub main_art: Option<MainArt>,
    #[serde(default)]
    pub volume: Option<VolumeInfo>,
    /// Group ("lemur") volume, present when the session is a multi-room group
    #[serde(default)]
    pub lemur_volume: Option<LemurVolume>,
    /// Set when this device is currently playing as part of a group
    #[serde(default)]
    pub is_playing_in_lemur: Option<bool>,
    #[serde(default)]
    pub transport: Option<Transport>,
}

impl PlayerInfo {
    pub fn playing_in_group(&self) -> bool {
        self.is_playing_in_lemur.unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    /// Position in seconds
    #[serde(default)]
    pub media_progress: Option<u64>,
    /// Track length in seconds
    #[serde(default)]
    pub media_length: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoText {
    #[serde(default)]
    pub title: Option<String>,
    /// Artist
    #[serde(default)]
    pub sub_text1: Option<String>,
    /// Album
    #[serde(default)]
    pub sub_text2: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MainArt {
    #[serde(default)]
    pub url: Option<String>,
}

/// Volume block, level in percent (0-100)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeInfo {
    #[serde(default)]
    pub volume: Option<u32>,
    #[serde(default)]
    pub muted: Option<bool>,
}

impl VolumeInfo {
    pub fn new(volume: u32, muted: bool) -> Self {
        Self {
            volume: Some(volume),
            muted: Some(muted),
        }
    }
}

/// Group volume: a composite level plus each member's own contribution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LemurVolume {
    #[serde(default)]
    pub composite_volume: Option<VolumeInfo>,
    /// Member serial -> that member's volume
    #[serde(default)]
    pub member_volume: BTreeMap<String, VolumeInfo>,
}

/// Transport controls advertised by the session
///
/// Values use the SELECTED / DISABLED vocabulary; other values such as
/// ENABLED or HIDDEN carry no on/off information.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transport {
    #[serde(default)]
    pub shuffle: Option<String>,
    #[serde(default)]
    pub repeat: Option<String>,
}
