//! Recording mock session for tests.
//!
//! `MockSession` answers `get_state` with a scripted [`SessionState`] and
//! records every call it receives. Failures can be queued so that the next
//! N calls (of any kind) return an error, which is how tests exercise the
//! re-login and transient-error paths.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{ApiError, Result};
use crate::payload::SessionState;
use crate::session::{CommandOptions, LoginHandler, RemoteSession};

/// A call received by [`MockSession`]
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCall {
    GetState,
    SetVolume(f64),
    Play,
    Pause,
    Next,
    Previous,
    Shuffle(bool),
    SetBluetooth(String),
    DisconnectBluetooth,
    Tts { message: String, customer_id: Option<String> },
    Announcement { message: String, customer_id: Option<String> },
    MobilePush { message: String, customer_id: Option<String> },
    Sequence { sequence: String, customer_id: Option<String> },
    Routine(String),
    Sound { sound: String, customer_id: Option<String> },
    Music { provider: String, search: String, customer_id: Option<String> },
}

#[derive(Default)]
struct Inner {
    state: SessionState,
    calls: Vec<SessionCall>,
    failures: VecDeque<ApiError>,
}

/// Scriptable in-memory [`RemoteSession`]
#[derive(Clone, Default)]
pub struct MockSession {
    inner: Arc<Mutex<Inner>>,
}

impl MockSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock whose `get_state` returns `state`
    pub fn with_state(state: SessionState) -> Self {
        let mock = Self::new();
        mock.set_state(state);
        mock
    }

    /// Replace the state returned by subsequent `get_state` calls
    pub fn set_state(&self, state: SessionState) {
        self.inner.lock().state = state;
    }

    /// Make the next call fail with `error`; failures queue up in order
    pub fn fail_next(&self, error: ApiError) {
        self.inner.lock().failures.push_back(error);
    }

    /// Every call received so far, oldest first
    pub fn calls(&self) -> Vec<SessionCall> {
        self.inner.lock().calls.clone()
    }

    /// Number of `get_state` calls received so far
    pub fn get_state_count(&self) -> usize {
        self.count(|call| matches!(call, SessionCall::GetState))
    }

    /// Number of recorded calls matching `predicate`
    pub fn count(&self, predicate: impl Fn(&SessionCall) -> bool) -> usize {
        self.inner.lock().calls.iter().filter(|c| predicate(c)).count()
    }

    pub fn clear_calls(&self) {
        self.inner.lock().calls.clear();
    }

    fn record(&self, call: SessionCall) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.calls.push(call);
        match inner.failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteSession for MockSession {
    async fn get_state(&self) -> Result<SessionState> {
        self.record(SessionCall::GetState)?;
        Ok(self.inner.lock().state.clone())
    }

    async fn set_volume(&self, level: f64) -> Result<()> {
        self.record(SessionCall::SetVolume(level))
    }

    async fn play(&self) -> Result<()> {
        self.record(SessionCall::Play)
    }

    async fn pause(&self) -> Result<()> {
        self.record(SessionCall::Pause)
    }

    async fn next(&self) -> Result<()> {
        self.record(SessionCall::Next)
    }

    async fn previous(&self) -> Result<()> {
        self.record(SessionCall::Previous)
    }

    async fn shuffle(&self, enabled: bool) -> Result<()> {
        self.record(SessionCall::Shuffle(enabled))
    }

    async fn set_bluetooth(&self, address: &str) -> Result<()> {
        self.record(SessionCall::SetBluetooth(address.to_string()))
    }

    async fn disconnect_bluetooth(&self) -> Result<()> {
        self.record(SessionCall::DisconnectBluetooth)
    }

    async fn send_tts(
        &self,
        message: &str,
        customer_id: Option<&str>,
        _options: &CommandOptions,
    ) -> Result<()> {
        self.record(SessionCall::Tts {
            message: message.to_string(),
            customer_id: customer_id.map(str::to_string),
        })
    }

    async fn send_announcement(
        &self,
        message: &str,
        customer_id: Option<&str>,
        _options: &CommandOptions,
    ) -> Result<()> {
        self.record(SessionCall::Announcement {
            message: message.to_string(),
            customer_id: customer_id.map(str::to_string),
        })
    }

    async fn send_mobilepush(
        &self,
        message: &str,
        customer_id: Option<&str>,
        _options: &CommandOptions,
    ) -> Result<()> {
        self.record(SessionCall::MobilePush {
            message: message.to_string(),
            customer_id: customer_id.map(str::to_string),
        })
    }

    async fn send_sequence(
        &self,
        sequence: &str,
        customer_id: Option<&str>,
        _options: &CommandOptions,
    ) -> Result<()> {
        self.record(SessionCall::Sequence {
            sequence: sequence.to_string(),
            customer_id: customer_id.map(str::to_string),
        })
    }

    async fn run_routine(&self, routine: &str) -> Result<()> {
        self.record(SessionCall::Routine(routine.to_string()))
    }

    async fn play_sound(
        &self,
        sound: &str,
        customer_id: Option<&str>,
        _options: &CommandOptions,
    ) -> Result<()> {
        self.record(SessionCall::Sound {
            sound: sound.to_string(),
            customer_id: customer_id.map(str::to_string),
        })
    }

    async fn play_music(
        &self,
        provider: &str,
        search: &str,
        customer_id: Option<&str>,
        _options: &CommandOptions,
    ) -> Result<()> {
        self.record(SessionCall::Music {
            provider: provider.to_string(),
            search: search.to_string(),
            customer_id: customer_id.map(str::to_string),
        })
    }
}

/// Login handler that counts re-login attempts
#[derive(Clone, Default)]
pub struct MockLogin {
    attempts: Arc<AtomicU32>,
    fail: Arc<Mutex<bool>>,
}

impl MockLogin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent re-login attempt fail
    pub fn set_fail(&self, fail: bool) {
        *self.fail.lock() = fail;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl LoginHandler for MockLogin {
    async fn relogin(&self) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        if *self.fail.lock() {
            Err(ApiError::Authentication("re-login rejected".to_string()))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::PlayerInfo;

    #[tokio::test]
    async fn test_records_calls_and_returns_state() {
        let mock = MockSession::with_state(SessionState::new(PlayerInfo {
            state: Some("IDLE".to_string()),
            ..Default::default()
        }));

        let state = mock.get_state().await.unwrap();
        assert_eq!(state.player_info.unwrap().state.as_deref(), Some("IDLE"));

        mock.set_volume(0.4).await.unwrap();
        mock.play().await.unwrap();
        assert_eq!(
            mock.calls(),
            vec![SessionCall::GetState, SessionCall::SetVolume(0.4), SessionCall::Play]
        );
        assert_eq!(mock.get_state_count(), 1);
    }

    #[tokio::test]
    async fn test_queued_failures() {
        let mock = MockSession::new();
        mock.fail_next(ApiError::Network("timeout".to_string()));

        assert!(mock.pause().await.is_err());
        assert!(mock.pause().await.is_ok());
        assert_eq!(mock.count(|c| *c == SessionCall::Pause), 2);
    }

    #[tokio::test]
    async fn test_mock_login() {
        let login = MockLogin::new();
        assert!(login.relogin().await.is_ok());
        login.set_fail(true);
        assert!(login.relogin().await.unwrap_err().is_auth());
        assert_eq!(login.attempts(), 2);
    }
}
