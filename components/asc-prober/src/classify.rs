//! Per-channel FIFO flag classification
//!
//! Each status bit is only trusted once the bit before it in the chain
//! behaved: half-empty is only meaningful if it was off while "full" was
//! asserted, and "empty" is only meaningful if the full/empty bit was off
//! when half-empty first appeared. The state machine makes it impossible to
//! record a later conclusion without the earlier one.
//!
//! ```text
//! Unknown ──► TooSoon
//!    │
//!    ▼
//! AwaitingFull ──► Full (half-empty also on: chain stops)
//!    │
//!    ▼
//! AwaitingHalfEmpty ──► HalfEmpty (full/empty also on: chain stops)
//!    │
//!    ▼
//! AwaitingEmpty ──► Empty
//! ```

use asc_platform::regs::asc::FifoStatus;

/// FIFO channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    A,
    B,
}

impl Channel {
    pub const BOTH: [Channel; 2] = [Channel::A, Channel::B];

    /// Bit position of this channel's pair in the status register
    pub const fn shift(self) -> u8 {
        match self {
            Channel::A => 0,
            Channel::B => 2,
        }
    }

    pub const fn index(self) -> usize {
        match self {
            Channel::A => 0,
            Channel::B => 1,
        }
    }

    /// Write port for this channel
    pub const fn port(self) -> u16 {
        match self {
            Channel::A => asc_platform::regs::asc::FIFO_A,
            Channel::B => asc_platform::regs::asc::FIFO_B,
        }
    }

    /// This channel's two status bits, shifted down to bits 0..2
    pub fn bits(self, status: FifoStatus) -> u8 {
        (status.bits() >> self.shift()) & 0x03
    }

    pub fn flags(self, status: FifoStatus) -> ChannelFlags {
        let bits = self.bits(status);
        ChannelFlags {
            half_empty: bits & 0x01 != 0,
            full_empty: bits & 0x02 != 0,
        }
    }
}

/// One channel's view of the status register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelFlags {
    pub half_empty: bool,
    /// Full while filling, empty once drained
    pub full_empty: bool,
}

/// Classification progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelState {
    /// Not primed yet
    #[default]
    Unknown,
    /// "Full" already asserted after the priming burst; excluded
    TooSoon,
    AwaitingFull,
    /// Reached full, but half-empty was on at the same time
    Full,
    AwaitingHalfEmpty,
    /// Half-empty turned on, but full/empty was on at the same time
    HalfEmpty,
    AwaitingEmpty,
    Empty,
}

impl ChannelState {
    /// Distance along the chain; `TooSoon` is off the chain
    const fn rank(self) -> u8 {
        match self {
            ChannelState::Unknown | ChannelState::TooSoon => 0,
            ChannelState::AwaitingFull => 1,
            ChannelState::Full => 2,
            ChannelState::AwaitingHalfEmpty => 3,
            ChannelState::HalfEmpty => 4,
            ChannelState::AwaitingEmpty => 5,
            ChannelState::Empty => 6,
        }
    }
}

/// Classification record for one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelRecord {
    state: ChannelState,
    fill_count: Option<u16>,
}

impl ChannelRecord {
    pub fn state(&self) -> ChannelState {
        self.state
    }

    /// Samples written when "full" was first observed
    pub fn fill_count(&self) -> Option<u16> {
        self.fill_count
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Status after the priming burst
    pub fn primed(&mut self, flags: ChannelFlags) {
        if self.state != ChannelState::Unknown {
            return;
        }
        self.state = if flags.full_empty {
            ChannelState::TooSoon
        } else {
            ChannelState::AwaitingFull
        };
    }

    /// Status after sample `written` of the fill burst; true on transition
    pub fn observe_fill(&mut self, flags: ChannelFlags, written: u16) -> bool {
        if self.state != ChannelState::AwaitingFull || !flags.full_empty {
            return false;
        }
        self.fill_count = Some(written);
        self.state = if flags.half_empty {
            ChannelState::Full
        } else {
            ChannelState::AwaitingHalfEmpty
        };
        true
    }

    /// Status while draining toward half-empty; true on transition
    pub fn observe_drain(&mut self, flags: ChannelFlags) -> bool {
        if self.state != ChannelState::AwaitingHalfEmpty || !flags.half_empty {
            return false;
        }
        self.state = if flags.full_empty {
            ChannelState::HalfEmpty
        } else {
            ChannelState::AwaitingEmpty
        };
        true
    }

    /// Status while draining toward empty; true on transition
    pub fn observe_empty(&mut self, flags: ChannelFlags) -> bool {
        if self.state != ChannelState::AwaitingEmpty || !flags.full_empty {
            return false;
        }
        self.state = ChannelState::Empty;
        true
    }

    // ========================================================================
    // Derived conclusions
    // ========================================================================

    pub fn full_too_soon(&self) -> bool {
        self.state == ChannelState::TooSoon
    }

    pub fn reaches_full(&self) -> bool {
        self.state.rank() >= ChannelState::Full.rank()
    }

    pub fn half_empty_off_when_full(&self) -> bool {
        self.state.rank() >= ChannelState::AwaitingHalfEmpty.rank()
    }

    pub fn half_empty_turns_on(&self) -> bool {
        self.state.rank() >= ChannelState::HalfEmpty.rank()
    }

    pub fn empty_off_when_half_empty(&self) -> bool {
        self.state.rank() >= ChannelState::AwaitingEmpty.rank()
    }

    pub fn reaches_empty(&self) -> bool {
        self.state == ChannelState::Empty
    }

    /// Full, half-empty and empty all behaved
    pub fn fully_validated(&self) -> bool {
        self.reaches_empty()
    }

    /// Good enough to drive the interrupt probe
    pub fn trustworthy(&self) -> bool {
        self.empty_off_when_half_empty()
    }
}
