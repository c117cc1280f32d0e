//! Byte-granular register access
//!
//! Both device windows are accessed one byte at a time. Reads take
//! `&mut self` because several registers (the ASC FIFO status register on
//! some revisions) clear on read.

use crate::regs::{asc, via2};

/// Memory-mapped device window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Window {
    /// Apple Sound Chip (or its integrated successor)
    Asc,
    /// VIA2, or the pseudo-VIA inside an integrated controller
    Via2,
}

/// Raw register access
///
/// Object safe: interrupt handlers receive `&mut dyn RegisterBus`.
/// There is no error return. Absent registers read back whatever the bus
/// floats to, which is exactly what the probes are trying to observe.
pub trait RegisterBus {
    /// Read one byte at `offset` within `window`
    fn read(&mut self, window: Window, offset: u16) -> u8;

    /// Write one byte at `offset` within `window`
    fn write(&mut self, window: Window, offset: u16, value: u8);

    fn asc_read(&mut self, offset: u16) -> u8 {
        self.read(Window::Asc, offset)
    }

    fn asc_write(&mut self, offset: u16, value: u8) {
        self.write(Window::Asc, offset, value)
    }

    fn via2_read(&mut self, offset: u16) -> u8 {
        self.read(Window::Via2, offset)
    }

    fn via2_write(&mut self, offset: u16, value: u8) {
        self.write(Window::Via2, offset, value)
    }

    /// Acknowledge the ASC interrupt in VIA2 through the flag alias
    fn ack_asc_irq(&mut self) {
        self.via2_write(via2::IFR_ALIAS, (via2::Irq::SET | via2::Irq::ASC).bits());
    }

    /// Enable or disable the ASC interrupt in VIA2 through the enable alias
    fn set_asc_irq_enabled(&mut self, enabled: bool) {
        let value = if enabled {
            via2::Irq::SET | via2::Irq::ASC
        } else {
            via2::Irq::ASC
        };
        self.via2_write(via2::IER_ALIAS, value.bits());
    }

    /// Read the FIFO interrupt status register
    fn asc_status(&mut self) -> asc::FifoStatus {
        asc::FifoStatus::from_bits_retain(self.asc_read(asc::FIFO_IRQ_STATUS))
    }
}
