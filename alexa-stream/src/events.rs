//! Push notification shapes and the typed event union
//!
//! A raw notification is an object with exactly one meaningful field out of
//! five. [`PushNotification`] mirrors that wire shape; [`PushEvent`] is the
//! typed form the state core works with, one variant per shape, always
//! carrying the target serial.

use alexa_api::BluetoothState;
use serde::{Deserialize, Serialize};

use crate::error::{EventError, Result};

// ============================================================================
// Wire shapes
// ============================================================================

/// Raw push notification as delivered by the push transport
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PushNotification {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_called_change: Option<LastCalledPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bluetooth_change: Option<BluetoothChangePayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_state: Option<PlayerStatePayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_state: Option<QueueStatePayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_activity: Option<PushActivityPayload>,
}

impl PushNotification {
    /// Parse a notification from its JSON body
    pub fn from_json(body: &str) -> Result<Self> {
        Ok(serde_json::from_str(body)?)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastCalledPayload {
    #[serde(default)]
    pub serial_number: Option<String>,
    /// Milliseconds since the epoch
    #[serde(default)]
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BluetoothChangePayload {
    #[serde(default)]
    pub device_serial_number: Option<String>,
    #[serde(flatten)]
    pub state: BluetoothState,
}

/// Device address used by player and queue notifications
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DopplerId {
    #[serde(default)]
    pub device_serial_number: Option<String>,
    #[serde(default)]
    pub device_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStatePayload {
    #[serde(default)]
    pub doppler_id: Option<DopplerId>,
    #[serde(default)]
    pub audio_player_state: Option<String>,
    #[serde(default)]
    pub media_reference_id: Option<String>,
    /// Volume in percent
    #[serde(default)]
    pub volume_setting: Option<u32>,
    #[serde(default)]
    pub doppler_connection_state: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatePayload {
    #[serde(default)]
    pub doppler_id: Option<DopplerId>,
    #[serde(default)]
    pub track_order_changed: Option<bool>,
    #[serde(default)]
    pub loop_mode: Option<String>,
    #[serde(default)]
    pub play_back_order: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PushActivityPayload {
    #[serde(default)]
    pub key: Option<ActivityKey>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityKey {
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub entry_id: Option<String>,
}

// ============================================================================
// Typed events
// ============================================================================

/// Which of the five shapes an event has
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PushEventKind {
    LastCalled,
    Bluetooth,
    PlayerState,
    QueueState,
    PushActivity,
}

/// What a player-state notification reports
///
/// Only the first present field counts, in this order.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerStateChange {
    /// Playback state changed (PLAYING, FINISHED, ...)
    AudioPlayerState(String),
    /// A new media item started
    MediaReference(String),
    /// Volume in percent
    Volume(u32),
    /// Cloud connection state of the device (ONLINE, OFFLINE)
    Connection(String),
    /// None of the known fields were present
    Unrecognized,
}

/// Queue notification details
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueueStateChange {
    pub track_order_changed: Option<bool>,
    pub loop_mode: Option<String>,
    pub play_back_order: Option<String>,
}

/// A push notification addressed to one device
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    LastCalled {
        serial: String,
        timestamp: Option<i64>,
    },
    Bluetooth {
        serial: String,
        state: BluetoothState,
    },
    PlayerState {
        serial: String,
        change: PlayerStateChange,
    },
    QueueState {
        serial: String,
        change: QueueStateChange,
    },
    PushActivity {
        serial: String,
    },
}

impl PushEvent {
    /// Serial number the event targets
    pub fn serial(&self) -> &str {
        match self {
            PushEvent::LastCalled { serial, .. }
            | PushEvent::Bluetooth { serial, .. }
            | PushEvent::PlayerState { serial, .. }
            | PushEvent::QueueState { serial, .. }
            | PushEvent::PushActivity { serial } => serial,
        }
    }

    pub fn kind(&self) -> PushEventKind {
        match self {
            PushEvent::LastCalled { .. } => PushEventKind::LastCalled,
            PushEvent::Bluetooth { .. } => PushEventKind::Bluetooth,
            PushEvent::PlayerState { .. } => PushEventKind::PlayerState,
            PushEvent::QueueState { .. } => PushEventKind::QueueState,
            PushEvent::PushActivity { .. } => PushEventKind::PushActivity,
        }
    }
}

fn require_serial(serial: Option<String>, kind: PushEventKind) -> Result<String> {
    match serial {
        Some(serial) if !serial.is_empty() => Ok(serial),
        _ => Err(EventError::MissingSerial { kind }),
    }
}

impl TryFrom<PushNotification> for PushEvent {
    type Error = EventError;

    fn try_from(notification: PushNotification) -> Result<Self> {
        if let Some(payload) = notification.last_called_change {
            return Ok(PushEvent::LastCalled {
                serial: require_serial(payload.serial_number, PushEventKind::LastCalled)?,
                timestamp: payload.timestamp,
            });
        }

        if let Some(payload) = notification.bluetooth_change {
            return Ok(PushEvent::Bluetooth {
                serial: require_serial(payload.device_serial_number, PushEventKind::Bluetooth)?,
                state: payload.state,
            });
        }

        if let Some(payload) = notification.player_state {
            let serial = require_serial(
                payload.doppler_id.and_then(|d| d.device_serial_number),
                PushEventKind::PlayerState,
            )?;
            let change = if let Some(state) = payload.audio_player_state {
                PlayerStateChange::AudioPlayerState(state)
            } else if let Some(reference) = payload.media_reference_id {
                PlayerStateChange::MediaReference(reference)
            } else if let Some(volume) = payload.volume_setting {
                PlayerStateChange::Volume(volume)
            } else if let Some(connection) = payload.doppler_connection_state {
                PlayerStateChange::Connection(connection)
            } else {
                PlayerStateChange::Unrecognized
            };
            return Ok(PushEvent::PlayerState { serial, change });
        }

        if let Some(payload) = notification.queue_state {
            let serial = require_serial(
                payload.doppler_id.and_then(|d| d.device_serial_number),
                PushEventKind::QueueState,
            )?;
            return Ok(PushEvent::QueueState {
                serial,
                change: QueueStateChange {
                    track_order_changed: payload.track_order_changed,
                    loop_mode: payload.loop_mode,
                    play_back_order: payload.play_back_order,
                },
            });
        }

        if let Some(payload) = notification.push_activity {
            return Ok(PushEvent::PushActivity {
                serial: require_serial(
                    payload.key.and_then(|k| k.serial_number),
                    PushEventKind::PushActivity,
                )?,
            });
        }

        Err(EventError::UnknownShape)
    }
}
