//! # alexa-state
//!
//! State synchronization and command dispatch for Alexa media devices.
//!
//! Each device entity keeps one [`DeviceSnapshot`] current by merging three
//! sources: periodic refreshes against its [`RemoteSession`], push events
//! from the account [`EventBus`], and the session of a playing parent group
//! it belongs to. The pieces:
//!
//! - [`reconciler`] folds listings and session payloads into a snapshot
//! - [`interpreter`] decides what a push event means for one device
//! - [`PollScheduler`] decides after each refresh whether polling continues
//! - [`RefreshGuard`] serializes and spaces the refreshes of one device
//! - the command methods on [`Device`] forward media controls to the
//!   session or to a playing parent
//!
//! Devices of one account share an [`AccountContext`], passed explicitly to
//! every operation.
//!
//! ```rust,ignore
//! let ctx = AccountContext::builder("owner@example.com")
//!     .with_login(login)
//!     .build()?;
//! let devices = ctx.setup_devices(listings, |listing| session_for(listing)).await;
//!
//! // push transport
//! ctx.set_websocket_active(true);
//! ctx.deliver(PushEnvelope::new(command, event));
//!
//! // host
//! devices[0].set_volume(&ctx, 0.4).await?;
//! let mut changes = devices[0].watch();
//! ```
//!
//! [`RemoteSession`]: alexa_api::RemoteSession
//! [`EventBus`]: alexa_stream::EventBus

pub mod account;
pub mod config;
pub mod device;
pub mod dispatcher;
pub mod error;
pub mod interpreter;
pub mod logging;
pub mod model;
pub mod poll;
pub mod reconciler;
pub mod throttle;

pub use account::{AccountContext, AccountContextBuilder};
pub use config::StateConfig;
pub use device::{Device, RefreshOutcome};
pub use dispatcher::TransportCommand;
pub use error::{Result, StateError};
pub use interpreter::{classify, Classification, EventAction, RefreshPlan};
pub use logging::{init_logging, init_logging_from_env, LoggingMode};
pub use model::{
    DeviceAttributes, DeviceInfo, DeviceSerial, DeviceSnapshot, LastCalled, MediaDetails,
    PlayerState, VisibleState, LOCAL_SOURCE,
};
pub use poll::{PollDecision, PollScheduler, PushHealth};
pub use throttle::{RefreshGuard, RefreshMode, RefreshSkipped};

// Collaborator crates, re-exported for hosts
pub use alexa_api;
pub use alexa_stream;
