//! # alexa-api
//!
//! Contract between the Alexa media state core and the remote cloud session.
//!
//! The HTTP session itself (login, cookies, request signing) lives outside this
//! workspace. This crate only describes what the core consumes from it:
//!
//! - [`RemoteSession`]: device-scoped playback, volume, bluetooth and
//!   announcement operations plus the `get_state` poll
//! - [`LoginHandler`]: the shared re-login flow invoked on authentication errors
//! - Payload types for the device listing ([`DeviceListing`]) and the player
//!   session ([`SessionState`]) as they arrive from the remote service
//!
//! # Example
//!
//! ```rust,ignore
//! use alexa_api::{RemoteSession, SessionState};
//!
//! async fn current_title(session: &dyn RemoteSession) -> alexa_api::Result<Option<String>> {
//!     let state: SessionState = session.get_state().await?;
//!     Ok(state
//!         .player_info
//!         .and_then(|info| info.info_text)
//!         .and_then(|text| text.title))
//! }
//! ```

pub mod device;
pub mod error;
pub mod payload;
pub mod privacy;
pub mod session;

#[cfg(feature = "test-support")]
pub mod mock;

pub use device::{AppDevice, AuthInfo, BluetoothState, DeviceListing, PairedDevice};
pub use error::{ApiError, Result};
pub use payload::{
    InfoText, LemurVolume, MainArt, PlayerInfo, Progress, SessionState, Transport, VolumeInfo,
};
pub use privacy::{hide_email, hide_serial};
pub use session::{CommandOptions, LoginHandler, RemoteSession};
