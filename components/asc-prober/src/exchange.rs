//! Interrupt handlers installed by the interrupt probes
//!
//! Both handlers run in interrupt context. They touch the bus and the
//! [`ExchangeCell`] and nothing else: no logging, no allocation, no report.
//!
//! # Flood containment
//!
//! Some chips re-assert their interrupt the instant it is acknowledged.
//! Left alone that starves the main context forever, so each handler
//! disables the ASC source in VIA2 itself once any bucket reaches the
//! cell's threshold, and marks the cell tripped. The probe sees the trip
//! after re-masking and records a flood.

use asc_platform::regs::asc;
use asc_platform::{ExchangeCell, RegisterBus};
use bitflags::bitflags;

use crate::classify::Channel;
use crate::report::BucketCounts;

/// Exchange-cell slot per status pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum Bucket {
    Full = 0,
    HalfEmpty = 1,
    Empty = 2,
    Other = 3,
}

static_assertions::const_assert_eq!(Bucket::Other as usize + 1, asc_platform::irq::EXCHANGE_SLOTS);

impl Bucket {
    /// Classify one channel's two status bits (already shifted down)
    pub const fn classify(bits: u8) -> Self {
        match bits & 0x03 {
            0b10 => Bucket::Full,
            0b01 => Bucket::HalfEmpty,
            0b11 => Bucket::Empty,
            _ => Bucket::Other,
        }
    }

    pub const fn slot(self) -> usize {
        self as usize
    }
}

bitflags! {
    /// Parameters passed to the FIFO handler through the cell
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct HandlerOptions: u8 {
        /// Classify channel B's bits instead of channel A's
        const CHANNEL_B = 1 << 0;
        /// Close the interrupt gate on the first half-empty interrupt
        const CLOSE_GATE_ON_HALF_EMPTY = 1 << 1;
    }
}

impl HandlerOptions {
    pub fn for_channel(channel: Channel) -> Self {
        match channel {
            Channel::A => HandlerOptions::empty(),
            Channel::B => HandlerOptions::CHANNEL_B,
        }
    }

    fn channel(self) -> Channel {
        if self.contains(HandlerOptions::CHANNEL_B) {
            Channel::B
        } else {
            Channel::A
        }
    }
}

impl From<&ExchangeCell> for BucketCounts {
    fn from(cell: &ExchangeCell) -> Self {
        Self {
            full: cell.slot(Bucket::Full.slot()),
            half_empty: cell.slot(Bucket::HalfEmpty.slot()),
            empty: cell.slot(Bucket::Empty.slot()),
            other: cell.slot(Bucket::Other.slot()),
        }
    }
}

/// Shut the source down once a bucket hits the threshold
fn contain_flood(bus: &mut dyn RegisterBus, cell: &ExchangeCell, count: u32) {
    if count >= cell.threshold() {
        bus.set_asc_irq_enabled(false);
        cell.trip();
    }
}

/// Counts every interrupt taken while the chip sits idle
pub fn idle_handler(bus: &mut dyn RegisterBus, cell: &ExchangeCell) {
    let status = bus.asc_read(asc::FIFO_IRQ_STATUS);
    bus.ack_asc_irq();
    cell.set_last_status(status);

    let count = cell.bump(Bucket::Other.slot());
    contain_flood(bus, cell, count);
}

/// Buckets each interrupt by the tested channel's status bits
pub fn fifo_handler(bus: &mut dyn RegisterBus, cell: &ExchangeCell) {
    bus.ack_asc_irq();
    let status = bus.asc_status();
    cell.set_last_status(status.bits());

    let options = HandlerOptions::from_bits_truncate(cell.options());
    let bucket = Bucket::classify(options.channel().bits(status));

    if bucket == Bucket::HalfEmpty && options.contains(HandlerOptions::CLOSE_GATE_ON_HALF_EMPTY) {
        bus.asc_write(asc::IRQ_GATE, 1);
    }

    let count = cell.bump(bucket.slot());
    contain_flood(bus, cell, count);
}

#[cfg(test)]
mod tests {
    use super::*;
    use asc_platform::regs::via2;
    use asc_platform::Window;

    /// Bus with a fixed status byte that records the writes it sees
    struct ScriptedBus {
        status: u8,
        writes: [(u16, u8); 8],
        len: usize,
    }

    impl ScriptedBus {
        fn new(status: u8) -> Self {
            Self {
                status,
                writes: [(0, 0); 8],
                len: 0,
            }
        }

        fn wrote(&self, offset: u16, value: u8) -> bool {
            self.writes[..self.len].contains(&(offset, value))
        }
    }

    impl RegisterBus for ScriptedBus {
        fn read(&mut self, window: Window, offset: u16) -> u8 {
            match (window, offset) {
                (Window::Asc, asc::FIFO_IRQ_STATUS) => self.status,
                _ => 0,
            }
        }

        fn write(&mut self, _window: Window, offset: u16, value: u8) {
            if self.len < self.writes.len() {
                self.writes[self.len] = (offset, value);
                self.len += 1;
            }
        }
    }

    #[test]
    fn test_bucket_patterns() {
        assert_eq!(Bucket::classify(0b10), Bucket::Full);
        assert_eq!(Bucket::classify(0b01), Bucket::HalfEmpty);
        assert_eq!(Bucket::classify(0b11), Bucket::Empty);
        assert_eq!(Bucket::classify(0b00), Bucket::Other);
    }

    #[test]
    fn test_fifo_handler_reads_channel_b_bits() {
        let cell = ExchangeCell::new();
        cell.arm(100, HandlerOptions::CHANNEL_B.bits());

        // A says full, B says half-empty
        let mut bus = ScriptedBus::new(0b0110);
        fifo_handler(&mut bus, &cell);

        assert_eq!(cell.slot(Bucket::HalfEmpty.slot()), 1);
        assert_eq!(cell.slot(Bucket::Full.slot()), 0);
        assert!(bus.wrote(via2::IFR_ALIAS, 0x90));
        assert!(!bus.wrote(asc::IRQ_GATE, 1));
    }

    #[test]
    fn test_fifo_handler_closes_gate_on_half_empty() {
        let cell = ExchangeCell::new();
        cell.arm(100, HandlerOptions::CLOSE_GATE_ON_HALF_EMPTY.bits());

        let mut bus = ScriptedBus::new(0b01);
        fifo_handler(&mut bus, &cell);

        assert!(bus.wrote(asc::IRQ_GATE, 1));
    }

    #[test]
    fn test_handler_disables_source_at_threshold() {
        let cell = ExchangeCell::new();
        cell.arm(3, 0);
        let mut bus = ScriptedBus::new(0);

        idle_handler(&mut bus, &cell);
        idle_handler(&mut bus, &cell);
        assert!(!cell.tripped());
        assert!(!bus.wrote(via2::IER_ALIAS, 0x10));

        idle_handler(&mut bus, &cell);
        assert!(cell.tripped());
        assert!(bus.wrote(via2::IER_ALIAS, 0x10));
    }

    #[test]
    fn test_counts_copy_out_of_cell() {
        let cell = ExchangeCell::new();
        cell.arm(100, 0);
        cell.bump(Bucket::Full.slot());
        cell.bump(Bucket::Empty.slot());
        cell.bump(Bucket::Empty.slot());

        let counts = BucketCounts::from(&cell);
        assert_eq!(counts.full, 1);
        assert_eq!(counts.empty, 2);
        assert_eq!(counts.total(), 3);
    }
}
