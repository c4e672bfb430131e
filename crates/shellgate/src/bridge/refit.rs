use std::time::Duration;
use tokio::time::Instant;

/// Deferred geometry recomputation; a new schedule replaces the pending one
#[derive(Debug, Clone)]
pub struct RefitDebounce {
    delay: Duration,
    deadline: Option<Instant>,
}

impl RefitDebounce {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn schedule(&mut self, now: Instant) -> Instant {
        let deadline = now + self.delay;
        self.deadline = Some(deadline);
        deadline
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Clear and report the pending refit if its deadline has passed
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_supersedes() {
        let start = Instant::now();
        let mut debounce = RefitDebounce::new(Duration::from_millis(150));
        debounce.schedule(start);
        let later = debounce.schedule(start + Duration::from_millis(100));

        assert!(!debounce.take_due(start + Duration::from_millis(200)));
        assert!(debounce.take_due(later));
        assert!(!debounce.is_pending());
    }

    #[test]
    fn test_cancel() {
        let start = Instant::now();
        let mut debounce = RefitDebounce::new(Duration::from_millis(10));
        debounce.schedule(start);
        debounce.cancel();
        assert!(!debounce.take_due(start + Duration::from_secs(1)));
    }
}
