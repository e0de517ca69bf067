//! The mutable state record of one device

use std::collections::BTreeSet;

use alexa_api::{AuthInfo, BluetoothState, DeviceListing, PlayerInfo};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::serial::DeviceSerial;

/// Capability tag gating source resolution
pub const CAPABILITY_BLUETOOTH: &str = "PAIR_BT_SOURCE";

/// Capability tag gating music-session resolution
pub const CAPABILITY_MUSIC: &str = "MUSIC_SKILL";

/// Name of the synthetic source for the built-in speaker
pub const LOCAL_SOURCE: &str = "Local Speaker";

/// Playback state as reported by the remote session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerState {
    Playing,
    Paused,
    Idle,
    /// Anything the session reports that is not one of the above
    Standby,
}

impl PlayerState {
    pub fn from_remote(state: &str) -> Self {
        match state {
            "PLAYING" => PlayerState::Playing,
            "PAUSED" => PlayerState::Paused,
            "IDLE" => PlayerState::Idle,
            _ => PlayerState::Standby,
        }
    }
}

/// State exposed to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VisibleState {
    Unavailable,
    Playing,
    Paused,
    Idle,
    Standby,
}

impl VisibleState {
    /// Play/pause/next/previous are accepted in these states
    pub fn accepts_transport(self) -> bool {
        matches!(self, VisibleState::Playing | VisibleState::Paused)
    }
}

impl From<PlayerState> for VisibleState {
    fn from(state: PlayerState) -> Self {
        match state {
            PlayerState::Playing => VisibleState::Playing,
            PlayerState::Paused => VisibleState::Paused,
            PlayerState::Idle => VisibleState::Idle,
            PlayerState::Standby => VisibleState::Standby,
        }
    }
}

/// Identity fields, replaced verbatim from every fresh listing
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceIdentity {
    pub serial: DeviceSerial,
    pub name: String,
    pub family: String,
    pub device_type: String,
    pub owner_customer_id: Option<String>,
    pub software_version: Option<String>,
    /// Companion app serials that count as this device for last-called
    pub app_device_serials: Vec<String>,
    pub locale: String,
    pub timezone: String,
}

impl DeviceIdentity {
    pub fn from_listing(listing: &DeviceListing) -> Self {
        Self {
            serial: DeviceSerial::new(listing.serial_number.as_str()),
            name: listing.account_name.clone(),
            family: listing.device_family.clone(),
            device_type: listing.device_type.clone(),
            owner_customer_id: listing.device_owner_customer_id.clone(),
            software_version: listing.software_version.clone(),
            app_device_serials: listing
                .app_device_list
                .iter()
                .map(|app| app.serial_number.clone())
                .collect(),
            locale: listing.locale.clone(),
            timezone: listing.time_zone_id.clone(),
        }
    }
}

/// Media detail fields, always cleared together
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaDetails {
    pub player_state: Option<PlayerState>,
    /// Seconds
    pub position: Option<u64>,
    /// Seconds
    pub duration: Option<u64>,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub image_url: Option<String>,
    /// Muted flag as reported by the session
    pub muted: Option<bool>,
}

/// Everything known about one device
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSnapshot {
    pub identity: DeviceIdentity,
    pub auth: AuthInfo,
    pub capabilities: BTreeSet<String>,
    pub available: bool,
    pub parent_clusters: Vec<DeviceSerial>,
    pub cluster_members: Vec<DeviceSerial>,
    pub bluetooth: BluetoothState,
    pub dnd: Option<bool>,

    pub media: MediaDetails,
    /// Level in [0, 1]; survives media clears since TTS and announcements use it
    pub volume: Option<f64>,
    pub shuffle: Option<bool>,
    pub repeat: Option<bool>,
    pub source: Option<String>,
    pub source_list: Vec<String>,

    pub last_called: bool,
    pub last_called_timestamp: Option<i64>,

    /// Session the media details were taken from
    pub session: Option<PlayerInfo>,
    /// Group this device currently defers transport commands to
    pub playing_parent: Option<DeviceSerial>,

    /// Volume cached by mute, restored by unmute
    pub previous_volume: Option<f64>,
    pub last_update: Option<DateTime<Utc>>,
    pub poll_enabled: bool,
}

impl DeviceSnapshot {
    /// Build the initial snapshot of a device from its listing
    pub fn from_listing(listing: &DeviceListing) -> Self {
        let mut snapshot = Self {
            identity: DeviceIdentity::from_listing(listing),
            auth: AuthInfo::default(),
            capabilities: BTreeSet::new(),
            available: false,
            parent_clusters: Vec::new(),
            cluster_members: Vec::new(),
            bluetooth: BluetoothState::default(),
            dnd: None,
            media: MediaDetails::default(),
            volume: None,
            shuffle: None,
            repeat: None,
            source: None,
            source_list: Vec::new(),
            last_called: false,
            last_called_timestamp: None,
            session: None,
            playing_parent: None,
            previous_volume: None,
            last_update: None,
            poll_enabled: true,
        };
        crate::reconciler::apply_listing(&mut snapshot, listing);
        snapshot
    }

    pub fn serial(&self) -> &DeviceSerial {
        &self.identity.serial
    }

    /// The externally visible state; unavailable masks everything else
    pub fn visible_state(&self) -> VisibleState {
        if !self.available {
            return VisibleState::Unavailable;
        }
        self.media
            .player_state
            .map(VisibleState::from)
            .unwrap_or(VisibleState::Standby)
    }

    /// Muted means a volume of exactly zero
    pub fn is_muted(&self) -> bool {
        self.volume == Some(0.0)
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }

    pub fn supports_bluetooth(&self) -> bool {
        self.has_capability(CAPABILITY_BLUETOOTH)
    }

    pub fn supports_music(&self) -> bool {
        self.has_capability(CAPABILITY_MUSIC)
    }

    /// Whether `serial` is this device or one of its companion apps
    pub fn answers_to(&self, serial: &str) -> bool {
        self.identity.serial == *serial
            || self
                .identity
                .app_device_serials
                .iter()
                .any(|app| app == serial)
    }

    pub fn clear_media(&mut self) {
        self.media = MediaDetails::default();
    }
}
