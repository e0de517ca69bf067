//! Adaptive polling decisions
//!
//! After every refresh the device asks the scheduler what to do next. The
//! answer depends on the visible state, on whether regular polling is still
//! enabled and on how much the account's push channel can be trusted.

use std::time::Duration;

use crate::config::StateConfig;
use crate::model::VisibleState;

/// What the account's push channel is known to deliver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PushHealth {
    /// The push transport is connected
    pub websocket_active: bool,
    /// At least one playback-progress command kind has been delivered
    pub audio_push_seen: bool,
}

impl PushHealth {
    /// Push updates alone keep playback state current
    pub fn is_trusted(&self) -> bool {
        self.websocket_active && self.audio_push_seen
    }
}

/// Next polling action after a refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollDecision {
    /// Nothing changes
    Unchanged,
    /// Schedule one forced refresh after the delay
    SchedulePlayRefresh(Duration),
    /// Playing with a trusted push channel; stop regular polling
    DisablePolling,
    /// Not playing; the refresh just done was the last regular poll.
    /// Optionally schedule one more forced refresh after a longer delay.
    FinalPoll { final_refresh: Option<Duration> },
}

/// Polling controller of one device
#[derive(Debug, Clone)]
pub struct PollScheduler {
    play_scan_interval: Duration,
    final_poll_delay: Duration,
    play_timer_pending: bool,
}

impl PollScheduler {
    pub fn new(config: &StateConfig) -> Self {
        Self {
            play_scan_interval: config.play_scan_interval,
            final_poll_delay: config.final_poll_delay,
            play_timer_pending: false,
        }
    }

    /// Decide the next action after a completed refresh
    pub fn after_refresh(
        &mut self,
        state: VisibleState,
        poll_enabled: bool,
        push: PushHealth,
    ) -> PollDecision {
        if state == VisibleState::Playing {
            if push.is_trusted() {
                return if poll_enabled {
                    PollDecision::DisablePolling
                } else {
                    PollDecision::Unchanged
                };
            }
            if self.play_timer_pending {
                return PollDecision::Unchanged;
            }
            self.play_timer_pending = true;
            return PollDecision::SchedulePlayRefresh(self.play_scan_interval);
        }

        if poll_enabled {
            let final_refresh = (!push.websocket_active).then_some(self.final_poll_delay);
            return PollDecision::FinalPoll { final_refresh };
        }

        PollDecision::Unchanged
    }

    /// The play refresh timer fired or was dropped
    pub fn play_timer_done(&mut self) {
        self.play_timer_pending = false;
    }

    /// The play refresh timer was pushed back and is waiting again
    pub fn play_timer_rearmed(&mut self) {
        self.play_timer_pending = true;
    }

    pub fn play_timer_pending(&self) -> bool {
        self.play_timer_pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNPROVEN: PushHealth = PushHealth {
        websocket_active: true,
        audio_push_seen: false,
    };
    const TRUSTED: PushHealth = PushHealth {
        websocket_active: true,
        audio_push_seen: true,
    };
    const OFFLINE: PushHealth = PushHealth {
        websocket_active: false,
        audio_push_seen: false,
    };

    fn scheduler() -> PollScheduler {
        PollScheduler::new(&StateConfig::default())
    }

    #[test]
    fn test_playing_without_proven_push_schedules_one_timer() {
        let mut scheduler = scheduler();

        assert_eq!(
            scheduler.after_refresh(VisibleState::Playing, true, UNPROVEN),
            PollDecision::SchedulePlayRefresh(Duration::from_secs(20))
        );
        assert!(scheduler.play_timer_pending());
        assert_eq!(
            scheduler.after_refresh(VisibleState::Playing, true, UNPROVEN),
            PollDecision::Unchanged
        );

        scheduler.play_timer_done();
        assert_eq!(
            scheduler.after_refresh(VisibleState::Playing, true, OFFLINE),
            PollDecision::SchedulePlayRefresh(Duration::from_secs(20))
        );
    }

    #[test]
    fn test_rearmed_play_timer_blocks_a_second_timer() {
        let mut scheduler = scheduler();
        scheduler.after_refresh(VisibleState::Playing, true, UNPROVEN);

        // Fired too early and waits again
        scheduler.play_timer_done();
        scheduler.play_timer_rearmed();
        assert!(scheduler.play_timer_pending());
        assert_eq!(
            scheduler.after_refresh(VisibleState::Playing, true, UNPROVEN),
            PollDecision::Unchanged
        );
    }

    #[test]
    fn test_playing_with_trusted_push_disables_polling() {
        let mut scheduler = scheduler();
        assert_eq!(
            scheduler.after_refresh(VisibleState::Playing, true, TRUSTED),
            PollDecision::DisablePolling
        );
        assert_eq!(
            scheduler.after_refresh(VisibleState::Playing, false, TRUSTED),
            PollDecision::Unchanged
        );
        assert!(!scheduler.play_timer_pending());
    }

    #[test]
    fn test_stopping_does_one_last_poll() {
        let mut scheduler = scheduler();
        assert_eq!(
            scheduler.after_refresh(VisibleState::Idle, true, OFFLINE),
            PollDecision::FinalPoll {
                final_refresh: Some(Duration::from_secs(300))
            }
        );
        assert_eq!(
            scheduler.after_refresh(VisibleState::Paused, true, UNPROVEN),
            PollDecision::FinalPoll {
                final_refresh: None
            }
        );
        assert_eq!(
            scheduler.after_refresh(VisibleState::Standby, false, OFFLINE),
            PollDecision::Unchanged
        );
    }
}
