//! Deadline-based timers for event loops that sleep until the next wakeup
use std::time::{Duration, Instant};

/// Fixed rate timer - fires once per period, exposes the next deadline
///
/// Missed periods are skipped rather than replayed, so a stalled event loop
/// resumes at the normal rate instead of bursting.
#[derive(Debug, Clone, Copy)]
pub struct TickTimer {
    period: Duration,
    next: Instant,
}

impl TickTimer {
    /// Create timer whose first fire is one period from `now`
    pub fn new(period: Duration, now: Instant) -> Self {
        Self { period, next: now + period }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// When the event loop should wake up next
    pub fn next_deadline(&self) -> Instant {
        self.next
    }

    /// Returns true if a period elapsed, and schedules the next one
    pub fn poll(&mut self, now: Instant) -> bool {
        if now < self.next {
            return false;
        }
        self.next += self.period;
        if self.next <= now {
            self.next = now + self.period;
        }
        true
    }

    /// Restart the period from `now`
    pub fn reset(&mut self, now: Instant) {
        self.next = now + self.period;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_once_per_period() {
        let start = Instant::now();
        let mut timer = TickTimer::new(Duration::from_millis(10), start);

        assert!(!timer.poll(start));
        assert!(!timer.poll(start + Duration::from_millis(9)));
        assert!(timer.poll(start + Duration::from_millis(10)));
        assert!(!timer.poll(start + Duration::from_millis(15)));
        assert!(timer.poll(start + Duration::from_millis(20)));
    }

    #[test]
    fn test_skips_missed_periods() {
        let start = Instant::now();
        let mut timer = TickTimer::new(Duration::from_millis(10), start);

        let late = start + Duration::from_millis(55);
        assert!(timer.poll(late));
        assert!(!timer.poll(late));
        assert_eq!(timer.next_deadline(), late + Duration::from_millis(10));
    }

    #[test]
    fn test_reset_moves_deadline() {
        let start = Instant::now();
        let mut timer = TickTimer::new(Duration::from_millis(10), start);
        let later = start + Duration::from_millis(7);
        timer.reset(later);
        assert!(!timer.poll(start + Duration::from_millis(12)));
        assert!(timer.poll(later + Duration::from_millis(10)));
    }
}
