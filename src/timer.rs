use log::debug;
use std::time::{Duration, Instant};

/// A periodic deadline with a single active handle. Reconfiguring cancels the pending deadline
/// and starts a fresh period; nothing carries over from the old one.
#[derive(Clone, Debug)]
pub struct PeriodicTask {
    period: Duration,
    next_due: Instant,
}

impl PeriodicTask {
    pub fn new(period: Duration, now: Instant) -> Self {
        PeriodicTask {
            period,
            next_due: now + period,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn next_due(&self) -> Instant {
        self.next_due
    }

    /// Returns true (once) if the deadline has passed. The following deadline is one period
    /// after the one that fired, unless the loop fell more than a period behind.
    pub fn poll(&mut self, now: Instant) -> bool {
        if now < self.next_due {
            return false;
        }

        self.next_due += self.period;
        if self.next_due <= now {
            self.next_due = now + self.period;
        }

        true
    }

    pub fn reschedule(&mut self, period: Duration, now: Instant) {
        debug!("Rescheduling periodic task from {:?} to {:?}", self.period, period);
        self.period = period;
        self.next_due = now + period;
    }
}
