//! Per-channel sample FIFO with rate-driven draining

/// Fixed-capacity sample ring
pub struct SampleRing {
    buffer: Vec<u8>,
    head: usize,  // Write position
    tail: usize,  // Read position
    count: usize, // Number of samples
}

impl SampleRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0; capacity],
            head: 0,
            tail: 0,
            count: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count == self.buffer.len()
    }

    pub fn len(&self) -> usize {
        self.count
    }

    /// Push a sample; a full FIFO drops it
    pub fn push(&mut self, sample: u8) -> bool {
        if self.is_full() {
            return false;
        }

        self.buffer[self.head] = sample;
        self.head = (self.head + 1) % self.buffer.len();
        self.count += 1;
        true
    }

    pub fn pop(&mut self) -> Option<u8> {
        if self.is_empty() {
            return None;
        }

        let sample = self.buffer[self.tail];
        self.tail = (self.tail + 1) % self.buffer.len();
        self.count -= 1;
        Some(sample)
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.count = 0;
    }
}

/// One playback channel
pub struct Channel {
    ring: SampleRing,
    /// Virtual time up to which draining has been accounted
    drained_to_ns: u64,
}

impl Channel {
    pub fn new(depth: u16) -> Self {
        Self {
            ring: SampleRing::new(depth as usize),
            drained_to_ns: 0,
        }
    }

    pub fn occupancy(&self) -> usize {
        self.ring.len()
    }

    pub fn push(&mut self, sample: u8) -> bool {
        self.ring.push(sample)
    }

    pub fn clear(&mut self) {
        self.ring.clear();
    }

    /// Consume whatever the DAC would have played by `now_ns`
    pub fn advance(&mut self, now_ns: u64, playing: bool, sample_period_ns: u64) {
        if !playing || self.ring.is_empty() {
            self.drained_to_ns = now_ns;
            return;
        }

        let due = (now_ns.saturating_sub(self.drained_to_ns)) / sample_period_ns;
        for _ in 0..due {
            if self.ring.pop().is_none() {
                break;
            }
        }
        self.drained_to_ns += due * sample_period_ns;
    }

    /// `(half_empty, full_or_empty)` as the status register reports them
    pub fn flags(&self) -> (bool, bool) {
        let depth = self.ring.capacity();
        let occupancy = self.ring.len();
        let half_empty = occupancy < depth / 2;
        let full_or_empty = occupancy == 0 || occupancy >= depth;
        (half_empty, full_or_empty)
    }
}
