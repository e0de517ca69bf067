//! Timing and behaviour settings of the state core

use std::time::Duration;

use crate::error::{Result, StateError};

/// Configuration shared by every device of an account
#[derive(Debug, Clone, PartialEq)]
pub struct StateConfig {
    /// Minimum interval between regular refreshes, and the period of the
    /// host poll loop
    /// Default: 60 seconds
    pub scan_interval: Duration,

    /// Minimum interval between forced refreshes
    /// Default: 1 second
    pub forced_scan_interval: Duration,

    /// Cadence of the forced refresh timer while a device plays without a
    /// proven push channel
    /// Default: 20 seconds
    pub play_scan_interval: Duration,

    /// Delay of the last forced refresh scheduled when polling stops while
    /// the push channel is inactive
    /// Default: 300 seconds
    pub final_poll_delay: Duration,

    /// Wait before an event-triggered full refresh
    /// Default: 2 seconds
    pub event_debounce: Duration,

    /// Volume restored by unmute when no pre-mute volume was cached
    /// Default: 0.5
    pub default_unmute_volume: f64,

    /// Start a host poll loop for every device added to the account
    /// Default: true
    pub periodic_polling: bool,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            scan_interval: Duration::from_secs(60),
            forced_scan_interval: Duration::from_secs(1),
            play_scan_interval: Duration::from_secs(20),
            final_poll_delay: Duration::from_secs(300),
            event_debounce: Duration::from_secs(2),
            default_unmute_volume: 0.5,
            periodic_polling: true,
        }
    }
}

impl StateConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorter intervals for accounts without a push channel
    pub fn fast_polling() -> Self {
        Self {
            scan_interval: Duration::from_secs(15),
            play_scan_interval: Duration::from_secs(10),
            final_poll_delay: Duration::from_secs(120),
            ..Default::default()
        }
    }

    /// Devices refresh only on events, timers and commands
    pub fn without_periodic_polling() -> Self {
        Self {
            periodic_polling: false,
            ..Default::default()
        }
    }

    /// Validate the configuration and return the first issue found
    pub fn validate(&self) -> Result<()> {
        let intervals = [
            ("scan_interval", self.scan_interval),
            ("forced_scan_interval", self.forced_scan_interval),
            ("play_scan_interval", self.play_scan_interval),
            ("final_poll_delay", self.final_poll_delay),
        ];
        for (name, value) in intervals {
            if value.is_zero() {
                return Err(StateError::Configuration(format!(
                    "{} must be greater than 0",
                    name
                )));
            }
        }

        if self.forced_scan_interval >= self.scan_interval {
            return Err(StateError::Configuration(
                "forced_scan_interval must be less than scan_interval".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.default_unmute_volume) {
            return Err(StateError::Configuration(format!(
                "default_unmute_volume must be within [0, 1], got {}",
                self.default_unmute_volume
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_presets_are_valid() {
        assert!(StateConfig::default().validate().is_ok());
        assert!(StateConfig::fast_polling().validate().is_ok());
        assert!(StateConfig::without_periodic_polling().validate().is_ok());
        assert!(!StateConfig::without_periodic_polling().periodic_polling);
    }

    #[rstest]
    #[case(StateConfig { scan_interval: Duration::ZERO, ..Default::default() }, "scan_interval")]
    #[case(StateConfig { play_scan_interval: Duration::ZERO, ..Default::default() }, "play_scan_interval")]
    #[case(StateConfig { forced_scan_interval: Duration::from_secs(90), ..Default::default() }, "forced_scan_interval")]
    #[case(StateConfig { default_unmute_volume: 1.5, ..Default::default() }, "default_unmute_volume")]
    fn test_invalid_configs(#[case] config: StateConfig, #[case] field: &str) {
        match config.validate() {
            Err(StateError::Configuration(message)) => assert!(message.contains(field)),
            other => panic!("expected configuration error, got {:?}", other),
        }
    }
}
