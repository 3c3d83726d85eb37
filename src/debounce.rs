//! Cancel-and-restart single-shot timer for filter text changes.
//!
//! The host event loop owns the clock: it passes `Instant`s in and asks how
//! long it may block before the pending value is due. Latest value wins.

use std::time::{Duration, Instant};

/// Default quiescence window before a typed filter is applied.
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone)]
struct Pending<V> {
    value: V,
    deadline: Instant,
}

#[derive(Debug, Clone)]
pub struct Debouncer<V> {
    window: Duration,
    pending: Option<Pending<V>>,
}

impl<V> Default for Debouncer<V> {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl<V> Debouncer<V> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Change the window. A pending value keeps its original deadline.
    pub fn set_window(&mut self, window: Duration) {
        self.window = window;
    }

    /// Replace any pending value and restart the timer from `now`.
    pub fn schedule(&mut self, value: V, now: Instant) {
        self.pending = Some(Pending {
            value,
            deadline: now + self.window,
        });
    }

    /// Drop the pending value without firing.
    pub fn cancel(&mut self) -> Option<V> {
        self.pending.take().map(|p| p.value)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    /// Time the caller may wait before the pending value is due, zero when
    /// already due, `None` when nothing is pending.
    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        self.deadline()
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    /// Take the pending value if its window has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<V> {
        let due = self
            .pending
            .as_ref()
            .is_some_and(|p| now >= p.deadline);
        if due {
            self.pending.take().map(|p| p.value)
        } else {
            None
        }
    }

    /// Take the pending value immediately, regardless of the deadline.
    pub fn flush(&mut self) -> Option<V> {
        self.cancel()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(1000);

    #[test]
    fn test_fires_after_window() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(WINDOW);
        debouncer.schedule("c", start);

        assert_eq!(debouncer.poll(start + Duration::from_millis(999)), None);
        assert_eq!(debouncer.poll(start + WINDOW), Some("c"));
        assert!(!debouncer.is_pending());
        assert_eq!(debouncer.poll(start + WINDOW * 2), None);
    }

    #[test]
    fn test_reschedule_restarts_timer_and_latest_wins() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(WINDOW);
        debouncer.schedule("c", start);
        debouncer.schedule("c1", start + Duration::from_millis(600));

        // The first deadline has passed but the restart pushed it out.
        assert_eq!(debouncer.poll(start + Duration::from_millis(1100)), None);
        assert_eq!(
            debouncer.poll(start + Duration::from_millis(1600)),
            Some("c1")
        );
    }

    #[test]
    fn test_time_until_due() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(WINDOW);
        assert_eq!(debouncer.time_until_due(start), None);

        debouncer.schedule(1, start);
        assert_eq!(
            debouncer.time_until_due(start + Duration::from_millis(250)),
            Some(Duration::from_millis(750))
        );
        assert_eq!(
            debouncer.time_until_due(start + Duration::from_secs(5)),
            Some(Duration::ZERO)
        );
    }

    #[test]
    fn test_cancel_and_flush() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(WINDOW);
        debouncer.schedule("a", start);
        assert_eq!(debouncer.cancel(), Some("a"));
        assert_eq!(debouncer.poll(start + WINDOW), None);

        debouncer.schedule("b", start);
        assert_eq!(debouncer.flush(), Some("b"));
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn test_default_window_is_one_second() {
        let debouncer: Debouncer<String> = Debouncer::default();
        assert_eq!(debouncer.window(), Duration::from_secs(1));
    }
}
