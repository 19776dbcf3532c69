use chrono::{DateTime, Duration, FixedOffset, Local};

/// Source of the wall-clock instant handed to the model on each tick
pub trait Clock: Send {
    fn now(&mut self) -> DateTime<FixedOffset>;
}

/// Local system time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&mut self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// Synthetic clock: returns `start`, then advances by `step` on every call
#[derive(Debug, Clone, Copy)]
pub struct SteppedClock {
    next: DateTime<FixedOffset>,
    step: Duration,
}

impl SteppedClock {
    pub fn new(start: DateTime<FixedOffset>, step: Duration) -> Self {
        Self { next: start, step }
    }
}

impl Clock for SteppedClock {
    fn now(&mut self) -> DateTime<FixedOffset> {
        let now = self.next;
        self.next = now + self.step;
        now
    }
}
