//! Reconnect backoff.

use std::time::Duration;

use finboard_settings::RealtimeSettings;

/// Exponential backoff with a hard attempt ceiling.
///
/// Attempt `n` (1-indexed) waits `2^n * base`; with the defaults that is
/// 2 s, 4 s, 8 s, 16 s, 32 s and then no further attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Unit the exponential factor multiplies.
    pub base: Duration,
    /// Last attempt that will be scheduled.
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(1000),
            max_attempts: 5,
        }
    }
}

impl ReconnectPolicy {
    /// Policy from realtime settings.
    pub fn from_settings(settings: &RealtimeSettings) -> Self {
        Self {
            base: settings.reconnect_base(),
            max_attempts: settings.max_reconnect_attempts,
        }
    }

    /// Delay before reconnect attempt `attempt`, or `None` past the ceiling.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.max_attempts {
            return None;
        }
        let factor = 1u32.checked_shl(attempt)?;
        self.base.checked_mul(factor)
    }

    /// Every delay the policy will ever schedule, in order.
    pub fn schedule(&self) -> Vec<Duration> {
        (1..=self.max_attempts).map_while(|n| self.delay_for(n)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schedule() {
        let secs: Vec<u64> = ReconnectPolicy::default()
            .schedule()
            .iter()
            .map(Duration::as_secs)
            .collect();
        assert_eq!(secs, vec![2, 4, 8, 16, 32]);
    }

    #[test]
    fn no_attempt_past_ceiling() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay_for(5), Some(Duration::from_secs(32)));
        assert_eq!(policy.delay_for(6), None);
        assert_eq!(policy.delay_for(0), None);
    }

    #[test]
    fn zero_ceiling_never_reconnects() {
        let policy = ReconnectPolicy {
            base: Duration::from_millis(1),
            max_attempts: 0,
        };
        assert!(policy.schedule().is_empty());
    }

    #[test]
    fn huge_attempts_do_not_overflow() {
        let policy = ReconnectPolicy {
            base: Duration::from_secs(1),
            max_attempts: 64,
        };
        assert_eq!(policy.delay_for(40), None);
        assert_eq!(policy.delay_for(10), Some(Duration::from_secs(1024)));
    }

    #[test]
    fn from_settings_uses_configured_base() {
        let settings = RealtimeSettings {
            reconnect_base_ms: 1,
            max_reconnect_attempts: 3,
            ..RealtimeSettings::default()
        };
        let policy = ReconnectPolicy::from_settings(&settings);
        assert_eq!(
            policy.schedule(),
            vec![
                Duration::from_millis(2),
                Duration::from_millis(4),
                Duration::from_millis(8)
            ]
        );
    }
}
