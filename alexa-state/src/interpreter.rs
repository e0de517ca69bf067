//! Classification of push events
//!
//! [`classify`] looks at one typed event from the account bus and decides,
//! for one device, what changes in place and whether a full refresh must
//! follow. It never touches the snapshot; the device entity applies the
//! result.

use alexa_api::BluetoothState;
use alexa_stream::{PlayerStateChange, PushEvent, QueueStateChange};

use crate::model::{DeviceSnapshot, VisibleState};
use crate::poll::PushHealth;
use crate::reconciler::percent_to_level;

/// Loop mode value meaning the queue repeats
const LOOP_QUEUE: &str = "LOOP_QUEUE";
/// Playback order value meaning shuffle is on
const SHUFFLE_ALL: &str = "SHUFFLE_ALL";
/// Neutral value of both queue vocabularies
const NORMAL: &str = "NORMAL";
const ONLINE: &str = "ONLINE";

/// In-place change an event causes on the target device
#[derive(Debug, Clone, PartialEq)]
pub enum EventAction {
    UpdateLastCalled { timestamp: Option<i64> },
    UpdateBluetooth(BluetoothState),
    /// Level in [0, 1]
    UpdatePlayerVolume(f64),
    UpdateConnection { available: bool },
    UpdateRepeat(Option<bool>),
    UpdateShuffle(Option<bool>),
    /// Nothing changes in place; a refresh carries the update
    FullRefresh,
    Ignore,
}

/// Whether and how a refresh follows the in-place change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPlan {
    None,
    /// Refresh right away
    Immediate,
    /// Wait the configured debounce, then refresh
    Debounced,
}

/// Outcome of classifying one event for one device
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Serial the event was addressed to
    pub target: String,
    /// The event concerns this device; matched events mark it available
    pub matched: bool,
    pub action: EventAction,
    pub refresh: RefreshPlan,
}

impl Classification {
    fn ignore(target: &str) -> Self {
        Self {
            target: target.to_string(),
            matched: false,
            action: EventAction::Ignore,
            refresh: RefreshPlan::None,
        }
    }

    fn matched(target: &str, action: EventAction, refresh: RefreshPlan) -> Self {
        Self {
            target: target.to_string(),
            matched: true,
            action,
            refresh,
        }
    }

    /// An in-place update; refreshes anyway while push updates are unproven
    fn in_place(target: &str, action: EventAction, push: PushHealth) -> Self {
        let refresh = if push.audio_push_seen {
            RefreshPlan::None
        } else {
            RefreshPlan::Immediate
        };
        Self::matched(target, action, refresh)
    }
}

/// Decide what `event` means for the device described by `snapshot`
pub fn classify(event: &PushEvent, snapshot: &DeviceSnapshot, push: PushHealth) -> Classification {
    let target = event.serial();

    if let PushEvent::LastCalled { timestamp, .. } = event {
        if !snapshot.answers_to(target) {
            return Classification::ignore(target);
        }
        let refresh = if push.websocket_active {
            RefreshPlan::None
        } else {
            RefreshPlan::Immediate
        };
        return Classification::matched(
            target,
            EventAction::UpdateLastCalled {
                timestamp: *timestamp,
            },
            refresh,
        );
    }

    if snapshot.serial() != target {
        return Classification::ignore(target);
    }

    match event {
        PushEvent::Bluetooth { state, .. } => {
            Classification::in_place(target, EventAction::UpdateBluetooth(state.clone()), push)
        }
        PushEvent::PlayerState { change, .. } => match change {
            PlayerStateChange::AudioPlayerState(_) | PlayerStateChange::MediaReference(_) => {
                Classification::matched(target, EventAction::FullRefresh, RefreshPlan::Debounced)
            }
            PlayerStateChange::Volume(percent) => Classification::in_place(
                target,
                EventAction::UpdatePlayerVolume(percent_to_level(*percent)),
                push,
            ),
            PlayerStateChange::Connection(state) => Classification::in_place(
                target,
                EventAction::UpdateConnection {
                    available: state == ONLINE,
                },
                push,
            ),
            PlayerStateChange::Unrecognized => Classification::ignore(target),
        },
        PushEvent::QueueState { change, .. } => classify_queue(target, change, push),
        PushEvent::PushActivity { .. } => match snapshot.visible_state() {
            VisibleState::Idle | VisibleState::Paused | VisibleState::Playing => {
                Classification::matched(target, EventAction::FullRefresh, RefreshPlan::Debounced)
            }
            _ => Classification::ignore(target),
        },
        PushEvent::LastCalled { .. } => Classification::ignore(target),
    }
}

fn classify_queue(target: &str, change: &QueueStateChange, push: PushHealth) -> Classification {
    if change.track_order_changed == Some(false) {
        if let Some(mode) = change.loop_mode.as_deref() {
            return Classification::in_place(
                target,
                EventAction::UpdateRepeat(vocabulary(mode, LOOP_QUEUE)),
                push,
            );
        }
    }
    if let Some(order) = change.play_back_order.as_deref() {
        return Classification::in_place(
            target,
            EventAction::UpdateShuffle(vocabulary(order, SHUFFLE_ALL)),
            push,
        );
    }
    Classification::ignore(target)
}

/// `on` maps to true, NORMAL to false, anything else to unknown
fn vocabulary(value: &str, on: &str) -> Option<bool> {
    if value == on {
        Some(true)
    } else if value == NORMAL {
        Some(false)
    } else {
        None
    }
}
