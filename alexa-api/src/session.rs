//! Remote session and login contracts

use async_trait::async_trait;

use crate::error::Result;
use crate::payload::SessionState;

/// Free-form options forwarded untouched to announcement, TTS, sequence,
/// sound and music calls (target lists, chime, locale, ...).
pub type CommandOptions = serde_json::Map<String, serde_json::Value>;

/// Device-scoped session against the remote voice-assistant service.
///
/// One implementation instance is bound to one physical or virtual device.
/// Every call may fail with [`ApiError::Authentication`](crate::ApiError),
/// which callers route to the shared [`LoginHandler`], or with a transient
/// error that the next refresh retries naturally.
#[async_trait]
pub trait RemoteSession: Send + Sync {
    /// Fetch the current player session of the device
    async fn get_state(&self) -> Result<SessionState>;

    /// Set the volume, `level` in [0, 1]
    async fn set_volume(&self, level: f64) -> Result<()>;

    async fn play(&self) -> Result<()>;

    async fn pause(&self) -> Result<()>;

    async fn next(&self) -> Result<()>;

    async fn previous(&self) -> Result<()>;

    /// Enable or disable shuffle on the active queue
    async fn shuffle(&self, enabled: bool) -> Result<()>;

    /// Connect the paired bluetooth device with the given address as source
    async fn set_bluetooth(&self, address: &str) -> Result<()>;

    /// Drop the bluetooth source and return to the local speaker
    async fn disconnect_bluetooth(&self) -> Result<()>;

    async fn send_tts(
        &self,
        message: &str,
        customer_id: Option<&str>,
        options: &CommandOptions,
    ) -> Result<()>;

    async fn send_announcement(
        &self,
        message: &str,
        customer_id: Option<&str>,
        options: &CommandOptions,
    ) -> Result<()>;

    /// Push a notification to the companion apps of the device owner
    async fn send_mobilepush(
        &self,
        message: &str,
        customer_id: Option<&str>,
        options: &CommandOptions,
    ) -> Result<()>;

    /// Run a raw behaviour sequence (e.g. `Alexa.Weather.Play`)
    async fn send_sequence(
        &self,
        sequence: &str,
        customer_id: Option<&str>,
        options: &CommandOptions,
    ) -> Result<()>;

    /// Run a user-defined routine by utterance or name
    async fn run_routine(&self, routine: &str) -> Result<()>;

    async fn play_sound(
        &self,
        sound: &str,
        customer_id: Option<&str>,
        options: &CommandOptions,
    ) -> Result<()>;

    /// Ask a music provider to play the result of a search
    async fn play_music(
        &self,
        provider: &str,
        search: &str,
        customer_id: Option<&str>,
        options: &CommandOptions,
    ) -> Result<()>;
}

/// Shared re-login flow of an account.
///
/// Invoked once per failed call; a successful re-login lets the caller retry
/// the call exactly once.
#[async_trait]
pub trait LoginHandler: Send + Sync {
    async fn relogin(&self) -> Result<()>;
}
