//! Interrupt plumbing - critical sections, the ASC dispatch slot and the
//! exchange cell shared with a temporary handler
//!
//! A probe that wants to observe the ASC interrupt installs its own handler
//! into the VIA2 dispatch slot, arms an [`ExchangeCell`], unmasks, waits,
//! re-masks, reads the cell back and restores the previous handler. The
//! cell is the only state the handler may touch.

use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

use crate::bus::RegisterBus;

/// Interrupt-context entry point
///
/// Called by the backend's dispatcher each time the ASC interrupt is taken.
/// Runs with the ASC source implicitly masked until it returns, so it
/// never re-enters itself. Must not allocate, block or log.
pub type HandlerFn = fn(bus: &mut dyn RegisterBus, cell: &ExchangeCell);

/// Prior interrupt-mask state returned by [`CriticalSection::enter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "the token must be passed back to CriticalSection::exit"]
pub struct IrqToken(u16);

impl IrqToken {
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u16 {
        self.0
    }
}

/// Processor interrupt masking
///
/// Nesting is not supported: every `enter` must be matched by an `exit`
/// before the next `enter`.
pub trait CriticalSection {
    /// Mask all maskable interrupts, returning the prior state
    fn enter(&mut self) -> IrqToken;

    /// Restore the mask state captured by `enter`
    ///
    /// If this unmasks, anything pending is taken before `exit` returns.
    fn exit(&mut self, token: IrqToken);
}

/// Previous contents of the ASC dispatch slot
///
/// Opaque to callers. A backend stores whatever it needs to put the slot
/// back exactly as it was.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a replaced handler must be restored"]
pub struct SavedHandler {
    vector: usize,
    context: [usize; 2],
}

impl SavedHandler {
    pub const fn from_raw(vector: usize, context: [usize; 2]) -> Self {
        Self { vector, context }
    }

    pub const fn vector(&self) -> usize {
        self.vector
    }

    pub const fn context(&self) -> [usize; 2] {
        self.context
    }
}

/// The VIA2 dispatch-table slot for the ASC interrupt
pub trait InterruptSlot {
    /// Install `entry` with `cell`, returning the previous occupant
    ///
    /// Must be called with interrupts masked.
    ///
    /// # Safety
    ///
    /// `cell` must stay valid until the returned [`SavedHandler`] has been
    /// passed to [`InterruptSlot::restore`].
    unsafe fn install(&mut self, entry: HandlerFn, cell: *const ExchangeCell) -> SavedHandler;

    /// Put back the handler returned by the matching `install`
    ///
    /// Must be called with interrupts masked.
    ///
    /// # Safety
    ///
    /// `saved` must come from the most recent `install` on this slot.
    unsafe fn restore(&mut self, saved: SavedHandler);
}

/// Number of per-condition counters in an [`ExchangeCell`]
pub const EXCHANGE_SLOTS: usize = 4;

/// State shared between the main context and an installed handler
///
/// Every field is an atomic so the handler can update it without a lock and
/// the main context can poll it without tearing. The handler only writes;
/// the main context arms it before unmasking and reads it back afterwards.
#[derive(Debug)]
pub struct ExchangeCell {
    slots: [AtomicU32; EXCHANGE_SLOTS],
    total: AtomicU32,
    threshold: AtomicU32,
    options: AtomicU8,
    last_status: AtomicU8,
    tripped: AtomicBool,
}

impl ExchangeCell {
    pub const fn new() -> Self {
        Self {
            slots: [
                AtomicU32::new(0),
                AtomicU32::new(0),
                AtomicU32::new(0),
                AtomicU32::new(0),
            ],
            total: AtomicU32::new(0),
            threshold: AtomicU32::new(u32::MAX),
            options: AtomicU8::new(0),
            last_status: AtomicU8::new(0),
            tripped: AtomicBool::new(false),
        }
    }

    /// Reset all counters and load the handler parameters
    pub fn arm(&self, threshold: u32, options: u8) {
        for slot in &self.slots {
            slot.store(0, Ordering::Relaxed);
        }
        self.total.store(0, Ordering::Relaxed);
        self.threshold.store(threshold, Ordering::Relaxed);
        self.options.store(options, Ordering::Relaxed);
        self.last_status.store(0, Ordering::Relaxed);
        self.tripped.store(false, Ordering::Release);
    }

    /// Count one event in `slot`, returning that slot's new count
    ///
    /// Out-of-range slots are folded into the last one.
    pub fn bump(&self, slot: usize) -> u32 {
        let slot = slot.min(EXCHANGE_SLOTS - 1);
        self.total.fetch_add(1, Ordering::Relaxed);
        self.slots[slot].fetch_add(1, Ordering::Relaxed).saturating_add(1)
    }

    pub fn slot(&self, slot: usize) -> u32 {
        self.slots[slot.min(EXCHANGE_SLOTS - 1)].load(Ordering::Relaxed)
    }

    pub fn total(&self) -> u32 {
        self.total.load(Ordering::Relaxed)
    }

    pub fn threshold(&self) -> u32 {
        self.threshold.load(Ordering::Relaxed)
    }

    pub fn options(&self) -> u8 {
        self.options.load(Ordering::Relaxed)
    }

    pub fn set_last_status(&self, status: u8) {
        self.last_status.store(status, Ordering::Relaxed);
    }

    pub fn last_status(&self) -> u8 {
        self.last_status.load(Ordering::Relaxed)
    }

    /// Mark that the handler shut its source down
    pub fn trip(&self) {
        self.tripped.store(true, Ordering::Release);
    }

    pub fn tripped(&self) -> bool {
        self.tripped.load(Ordering::Acquire)
    }
}

impl Default for ExchangeCell {
    fn default() -> Self {
        Self::new()
    }
}
