//! Attributes exposed to the host platform

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::snapshot::{DeviceSnapshot, VisibleState};

const MANUFACTURER: &str = "Amazon";

/// Device registry information
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceInfo {
    pub identifier: String,
    pub name: String,
    pub manufacturer: String,
    /// `<family> <type>`
    pub model: String,
    pub sw_version: Option<String>,
}

/// Read-only view of a device as published to watchers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceAttributes {
    pub state: VisibleState,
    pub available: bool,
    pub last_called: bool,
    pub last_called_timestamp: Option<i64>,

    pub media_content_type: String,
    pub media_position: Option<u64>,
    pub media_duration: Option<u64>,
    pub media_position_updated_at: Option<DateTime<Utc>>,
    pub media_title: Option<String>,
    pub media_artist: Option<String>,
    pub media_album_name: Option<String>,
    pub media_image_url: Option<String>,
    pub media_image_remotely_accessible: bool,

    pub volume_level: Option<f64>,
    pub is_volume_muted: bool,
    pub shuffle: Option<bool>,
    pub repeat: Option<bool>,
    pub source: Option<String>,
    pub source_list: Vec<String>,

    pub should_poll: bool,
    pub hidden: bool,
    pub dnd_state: Option<bool>,
    pub locale: String,
    pub timezone: String,
    pub device_info: DeviceInfo,
}

impl From<&DeviceSnapshot> for DeviceAttributes {
    fn from(snapshot: &DeviceSnapshot) -> Self {
        let state = snapshot.visible_state();
        let identity = &snapshot.identity;
        let media = &snapshot.media;

        let media_content_type = if state.accepts_transport() {
            "music"
        } else {
            "standby"
        };

        Self {
            state,
            available: snapshot.available,
            last_called: snapshot.last_called,
            last_called_timestamp: snapshot.last_called_timestamp,
            media_content_type: media_content_type.to_string(),
            media_position: media.position,
            media_duration: media.duration,
            media_position_updated_at: snapshot.last_update,
            media_title: media.title.clone(),
            media_artist: media.artist.clone(),
            media_album_name: media.album.clone(),
            media_image_url: media.image_url.as_deref().map(escape_image_url),
            media_image_remotely_accessible: media
                .image_url
                .as_deref()
                .is_some_and(|url| !url.is_empty()),
            volume_level: snapshot.volume,
            is_volume_muted: snapshot.is_muted(),
            shuffle: snapshot.shuffle,
            repeat: snapshot.repeat,
            source: snapshot.source.clone(),
            source_list: snapshot.source_list.clone(),
            should_poll: snapshot.poll_enabled,
            hidden: !snapshot.supports_music(),
            dnd_state: snapshot.dnd,
            locale: identity.locale.clone(),
            timezone: identity.timezone.clone(),
            device_info: DeviceInfo {
                identifier: identity.serial.to_string(),
                name: identity.name.clone(),
                manufacturer: MANUFACTURER.to_string(),
                model: format!("{} {}", identity.family, identity.device_type),
                sw_version: identity.software_version.clone(),
            },
        }
    }
}

/// Percent-escape parentheses, which host frontends fail to quote
pub fn escape_image_url(url: &str) -> String {
    url.replace('(', "%28").replace(')', "%29")
}
