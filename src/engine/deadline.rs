// src/engine/deadline.rs
//
// Request-scoped wall-clock budget. Checked at stage boundaries and
// disarmed once the result is ready.

use crate::error::MockupError;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug)]
pub struct Deadline {
    started_at: Instant,
    limit: Duration,
}

impl Deadline {
    pub fn start(limit: Duration) -> Self {
        Self::started_at(Instant::now(), limit)
    }

    pub fn started_at(started_at: Instant, limit: Duration) -> Self {
        Self { started_at, limit }
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Fail with `Timeout` when the budget is spent by the end of `stage`.
    pub fn enforce(&self, stage: &'static str) -> Result<(), MockupError> {
        let elapsed = self.elapsed();
        debug!(stage, elapsed_ms = elapsed.as_millis() as u64, "stage finished");
        if elapsed > self.limit {
            return Err(MockupError::timeout(
                stage,
                self.limit.as_millis() as u64,
                elapsed.as_millis() as u64,
            ));
        }
        Ok(())
    }

    /// Last check before the result leaves the dispatcher. Consumes the
    /// deadline so nothing can be checked against it afterwards.
    pub fn disarm(self, stage: &'static str) -> Result<Duration, MockupError> {
        self.enforce(stage)?;
        Ok(self.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_deadline_passes() {
        let deadline = Deadline::start(Duration::from_secs(25));
        assert!(deadline.enforce("decode").is_ok());
        assert!(deadline.disarm("encode").is_ok());
    }

    #[test]
    fn timeout_enforced() {
        let fake_start = Instant::now() - Duration::from_millis(50);
        let deadline = Deadline::started_at(fake_start, Duration::from_millis(1));
        let err = deadline.enforce("fit").unwrap_err();
        match err {
            MockupError::Timeout {
                stage, limit_ms, ..
            } => {
                assert_eq!(stage, "fit");
                assert_eq!(limit_ms, 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn disarm_reports_overrun() {
        let fake_start = Instant::now() - Duration::from_millis(50);
        let deadline = Deadline::started_at(fake_start, Duration::from_millis(1));
        assert!(deadline.disarm("encode").is_err());
    }
}
