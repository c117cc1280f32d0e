//! Bounded waits against the tick counter

use asc_platform::TickSource;

/// Budget for one polling loop
///
/// Expires on whichever comes first: the tick budget or the iteration
/// ceiling. The ceiling matters on machines whose tick counter is driven
/// by an interrupt and therefore stops while the probe holds the mask.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    start: u32,
    ticks: u32,
    iterations_left: u32,
}

impl Deadline {
    pub fn start<T: TickSource + ?Sized>(clock: &mut T, ticks: u32, iteration_ceiling: u32) -> Self {
        Self {
            start: clock.now(),
            ticks,
            iterations_left: iteration_ceiling,
        }
    }

    /// Spend one iteration; returns the current tick while budget remains
    pub fn poll<T: TickSource + ?Sized>(&mut self, clock: &mut T) -> Option<u32> {
        if self.iterations_left == 0 {
            return None;
        }
        self.iterations_left -= 1;

        let now = clock.now();
        if now.wrapping_sub(self.start) >= self.ticks {
            None
        } else {
            Some(now)
        }
    }
}

/// Largest increase of a counter within a single tick
#[derive(Debug, Clone, Copy)]
pub struct RateSampler {
    tick: u32,
    base: u32,
    max_delta: u32,
}

impl RateSampler {
    pub fn new(tick: u32, value: u32) -> Self {
        Self {
            tick,
            base: value,
            max_delta: 0,
        }
    }

    /// Feed the counter; closes the interval when the tick moves on
    pub fn sample(&mut self, tick: u32, value: u32) {
        if tick != self.tick {
            self.close(value);
            self.tick = tick;
            self.base = value;
        }
    }

    /// Account for the final, partial interval
    pub fn finish(mut self, value: u32) -> u32 {
        self.close(value);
        self.max_delta
    }

    fn close(&mut self, value: u32) {
        self.max_delta = self.max_delta.max(value.wrapping_sub(self.base));
    }
}
