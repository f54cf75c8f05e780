//! Capped exponential backoff for broker reconnects.

use std::time::Duration;

/// Doubling delay sequence with an upper bound and no attempt limit.
///
/// ```
/// use std::time::Duration;
/// use nexus_events::Backoff;
///
/// let mut backoff = Backoff::new(Duration::from_secs(2), Duration::from_secs(30));
/// let delays: Vec<u64> = (0..6).map(|_| backoff.next_delay().as_secs()).collect();
/// assert_eq!(delays, vec![2, 4, 8, 16, 30, 30]);
/// ```
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        let initial = initial.min(max);
        Self {
            initial,
            max,
            current: initial,
        }
    }

    /// Returns the delay to sleep now and advances the sequence.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }

    /// Restarts the sequence from the initial delay.
    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}
