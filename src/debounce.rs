use std::time::{Duration, Instant};

/// Cooperative debounce: every `schedule` cancels the pending deadline and
/// sets a new one, `fire` is polled by the event loop.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Debouncer {
            window,
            deadline: None,
        }
    }

    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.window);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Returns true exactly once after the quiet window has passed.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
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
    fn fires_once_after_quiet_window() {
        let start = Instant::now();
        let mut debounce = Debouncer::new(Duration::from_millis(500));
        assert!(!debounce.fire(start + Duration::from_secs(10)));

        debounce.schedule(start);
        assert!(debounce.is_pending());
        assert!(!debounce.fire(start + Duration::from_millis(499)));
        assert!(debounce.fire(start + Duration::from_millis(500)));
        assert!(!debounce.fire(start + Duration::from_millis(900)));
        assert!(!debounce.is_pending());
    }

    #[test]
    fn rescheduling_pushes_the_deadline() {
        let start = Instant::now();
        let mut debounce = Debouncer::new(Duration::from_millis(500));
        for step in 0..5 {
            debounce.schedule(start + Duration::from_millis(step * 200));
            assert!(!debounce.fire(start + Duration::from_millis(step * 200 + 100)));
        }
        assert!(!debounce.fire(start + Duration::from_millis(1200)));
        assert!(debounce.fire(start + Duration::from_millis(1300)));
    }

    #[test]
    fn cancel_drops_pending_call() {
        let start = Instant::now();
        let mut debounce = Debouncer::new(Duration::from_millis(50));
        debounce.schedule(start);
        debounce.cancel();
        assert!(!debounce.fire(start + Duration::from_secs(1)));
    }
}
