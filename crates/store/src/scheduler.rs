// Debounced save handle

use std::time::{Duration, Instant};

pub const DEFAULT_SAVE_DELAY: Duration = Duration::from_secs(3);

/// At most one pending save. Scheduling again replaces the pending one, so a
/// burst of edits inside the delay collapses into a single save.
///
/// Time is passed in by the caller; the host's event loop drives
/// [`SaveScheduler::take_due`].
#[derive(Debug, Clone)]
pub struct SaveScheduler {
    delay: Duration,
    due: Option<Instant>,
}

impl Default for SaveScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_SAVE_DELAY)
    }
}

impl SaveScheduler {
    pub fn new(delay: Duration) -> Self {
        Self { delay, due: None }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Cancel any pending save and schedule one at `now + delay`.
    pub fn schedule(&mut self, now: Instant) -> Instant {
        let due = now + self.delay;
        self.due = Some(due);
        due
    }

    /// Returns true if a save was pending.
    pub fn cancel(&mut self) -> bool {
        self.due.take().is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.due.is_some()
    }

    pub fn due_at(&self) -> Option<Instant> {
        self.due
    }

    /// If the pending save is due at `now`, clear it and return true.
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.due {
            Some(due) if due <= now => {
                self.due = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reschedule_pushes_deadline() {
        let t0 = Instant::now();
        let mut scheduler = SaveScheduler::default();

        scheduler.schedule(t0);
        scheduler.schedule(t0 + Duration::from_secs(2));

        assert!(!scheduler.take_due(t0 + Duration::from_secs(3)));
        assert!(scheduler.is_pending());
        assert!(scheduler.take_due(t0 + Duration::from_secs(5)));
        assert!(!scheduler.is_pending());
        assert!(!scheduler.take_due(t0 + Duration::from_secs(10)));
    }

    #[test]
    fn test_cancel() {
        let t0 = Instant::now();
        let mut scheduler = SaveScheduler::new(Duration::from_millis(10));
        assert!(!scheduler.cancel());

        scheduler.schedule(t0);
        assert!(scheduler.cancel());
        assert!(!scheduler.take_due(t0 + Duration::from_secs(1)));
    }

    #[test]
    fn test_due_at() {
        let t0 = Instant::now();
        let mut scheduler = SaveScheduler::new(Duration::from_millis(250));
        assert_eq!(scheduler.due_at(), None);
        assert_eq!(scheduler.schedule(t0), t0 + Duration::from_millis(250));
        assert_eq!(scheduler.due_at(), Some(t0 + Duration::from_millis(250)));
    }
}
