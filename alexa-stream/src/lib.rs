//! # alexa-stream
//!
//! Push notifications for Alexa media devices and the per-account bus that
//! carries them.
//!
//! The transport that receives notifications (a websocket in practice) is
//! not part of this crate. Whatever receives them turns each raw JSON
//! notification into a [`PushNotification`], converts it into the typed
//! [`PushEvent`] union and publishes it, together with the [`PushCommand`]
//! kind that produced it, on the account topic of an [`EventBus`].
//!
//! ```text
//! websocket → PushNotification → PushEvent ─┐
//!                                           ├→ PushEnvelope → EventBus(topic) → device listeners
//!              command name → PushCommand ──┘
//! ```

mod bus;
mod command;
mod error;
mod events;

pub use bus::{AccountTopic, EventBus, PushEnvelope, Subscription};
pub use command::PushCommand;
pub use error::{EventError, Result};
pub use events::{
    ActivityKey, BluetoothChangePayload, DopplerId, LastCalledPayload, PlayerStateChange,
    PlayerStatePayload, PushActivityPayload, PushEvent, PushEventKind, PushNotification,
    QueueStateChange, QueueStatePayload,
};
