//! Reconnection backoff math.
//!
//! Kept free of runtime dependencies; the socket client owns the actual
//! sleeping.

pub const INITIAL_RETRY_DELAY_MS: u64 = 1_000;
pub const MAX_RETRY_DELAY_MS: u64 = 30_000;
pub const MAX_RETRY_ATTEMPTS: u32 = 10;
pub const BACKOFF_MULTIPLIER: f64 = 2.0;

/// Exponential backoff state for the reconnect loop.
#[derive(Debug, Clone, Copy)]
pub struct BackoffState {
    attempts: u32,
    delay_ms: u64,
}

impl Default for BackoffState {
    fn default() -> Self {
        Self {
            attempts: 0,
            delay_ms: INITIAL_RETRY_DELAY_MS,
        }
    }
}

impl BackoffState {
    /// Reset after a connection was successfully established.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts >= MAX_RETRY_ATTEMPTS
    }

    /// Advance to the next attempt, updating the delay for the subsequent attempt.
    ///
    /// Returns the delay to wait *before* performing this attempt.
    pub fn next_delay_and_advance(&mut self) -> Option<u64> {
        if self.is_exhausted() {
            return None;
        }

        let current_delay = self.delay_ms;
        self.attempts += 1;
        self.delay_ms =
            ((self.delay_ms as f64) * BACKOFF_MULTIPLIER).min(MAX_RETRY_DELAY_MS as f64) as u64;
        Some(current_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delays_double_up_to_cap() {
        let mut backoff = BackoffState::default();

        assert_eq!(backoff.next_delay_and_advance(), Some(1_000));
        assert_eq!(backoff.next_delay_and_advance(), Some(2_000));
        assert_eq!(backoff.next_delay_and_advance(), Some(4_000));
        assert_eq!(backoff.next_delay_and_advance(), Some(8_000));
        assert_eq!(backoff.next_delay_and_advance(), Some(16_000));
        // Capped from here on.
        assert_eq!(backoff.next_delay_and_advance(), Some(30_000));
        assert_eq!(backoff.next_delay_and_advance(), Some(30_000));
    }

    #[test]
    fn test_exhausts_after_max_attempts() {
        let mut backoff = BackoffState::default();

        for _ in 0..MAX_RETRY_ATTEMPTS {
            assert!(backoff.next_delay_and_advance().is_some());
        }
        assert!(backoff.is_exhausted());
        assert_eq!(backoff.next_delay_and_advance(), None);
    }

    #[test]
    fn test_reset_restores_initial_delay() {
        let mut backoff = BackoffState::default();
        let _ = backoff.next_delay_and_advance();
        let _ = backoff.next_delay_and_advance();

        backoff.reset();
        assert_eq!(backoff.attempts(), 0);
        assert_eq!(backoff.next_delay_and_advance(), Some(INITIAL_RETRY_DELAY_MS));
    }
}
