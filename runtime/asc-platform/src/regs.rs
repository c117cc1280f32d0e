//! Register map for the ASC and VIA2 windows
//!
//! Offsets are relative to the window base. Only the registers the probes
//! touch are named here.

use static_assertions::const_assert;

// ============================================================================
// ASC
// ============================================================================

pub mod asc {
    use bitflags::bitflags;

    /// FIFO A write port (any offset in 0x000..0x400 feeds channel A)
    pub const FIFO_A: u16 = 0x000;
    /// FIFO B write port (any offset in 0x400..0x800 feeds channel B)
    pub const FIFO_B: u16 = 0x400;
    /// Chip revision byte (read-only)
    pub const VERSION: u16 = 0x800;
    /// Operating mode: 0 off, 1 FIFO, 2 wavetable
    pub const MODE: u16 = 0x801;
    /// Channel configuration
    pub const CONTROL: u16 = 0x802;
    /// FIFO control; bit 7 clears both FIFOs
    pub const FIFO_MODE: u16 = 0x803;
    /// FIFO interrupt status
    pub const FIFO_IRQ_STATUS: u16 = 0x804;
    pub const WAVETABLE_CONTROL: u16 = 0x805;
    pub const VOLUME: u16 = 0x806;
    pub const CLOCK_RATE: u16 = 0x807;
    /// Interrupt gate on later revisions: 0 lets the ASC interrupt through, 1 blocks it
    pub const IRQ_GATE: u16 = 0xF29;

    /// Samples each channel FIFO holds
    pub const FIFO_DEPTH: u16 = 0x400;

    /// Size of the ASC window
    pub const WINDOW_SIZE: u16 = 0x1000;

    /// Operating mode register values
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[repr(u8)]
    pub enum Mode {
        Off = 0,
        Fifo = 1,
        Wavetable = 2,
    }

    impl Mode {
        pub const ALL: [Mode; 3] = [Mode::Off, Mode::Fifo, Mode::Wavetable];
    }

    bitflags! {
        /// FIFO interrupt status register (0x804)
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct FifoStatus: u8 {
            const A_HALF_EMPTY = 1 << 0;
            /// Asserted when channel A is full, and again when it runs empty
            const A_FULL_EMPTY = 1 << 1;
            const B_HALF_EMPTY = 1 << 2;
            const B_FULL_EMPTY = 1 << 3;
        }
    }

    bitflags! {
        /// Control register (0x802)
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct Control: u8 {
            const STEREO = 1 << 1;
        }
    }

    bitflags! {
        /// FIFO mode register (0x803)
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct FifoMode: u8 {
            const CLEAR = 1 << 7;
        }
    }
}

// ============================================================================
// VIA2
// ============================================================================

pub mod via2 {
    use bitflags::bitflags;

    /// Interrupt flag register, real VIA layout (register 13, 0x200 stride)
    pub const IFR: u16 = 0x1A00;
    /// Interrupt enable register, real VIA layout (register 14, 0x200 stride)
    pub const IER: u16 = 0x1C00;
    /// Interrupt flag register, pseudo-VIA layout
    pub const IFR_PSEUDO: u16 = 0x03;
    /// Interrupt enable register, pseudo-VIA layout
    pub const IER_PSEUDO: u16 = 0x13;
    /// Flag address that decodes correctly on both layouts
    pub const IFR_ALIAS: u16 = 0x1A03;
    /// Enable address that decodes correctly on both layouts
    pub const IER_ALIAS: u16 = 0x1C13;

    /// Real VIA register stride
    pub const REGISTER_STRIDE: u16 = 0x200;

    /// Dispatch-table slot the ROM calls for the ASC interrupt
    pub const ASC_SLOT: usize = 4;

    bitflags! {
        /// Interrupt flag / enable bits
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct Irq: u8 {
            /// Enable register: set the selected bits (clear when absent)
            const SET = 1 << 7;
            /// ASC interrupt (CB1 on a real VIA2)
            const ASC = 1 << 4;
        }
    }
}

const_assert!(asc::FIFO_DEPTH.is_power_of_two());
const_assert!(asc::FIFO_B == asc::FIFO_A + asc::FIFO_DEPTH);
const_assert!(via2::IFR_ALIAS & !(via2::REGISTER_STRIDE - 1) == via2::IFR);
const_assert!(via2::IER_ALIAS & !(via2::REGISTER_STRIDE - 1) == via2::IER);
const_assert!(via2::IER_ALIAS & 0x1F == via2::IER_PSEUDO);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases_decode_on_both_layouts() {
        // Real VIA: register index lives in bits 9..13
        assert_eq!(via2::IFR_ALIAS >> 9, via2::IFR >> 9);
        assert_eq!(via2::IER_ALIAS >> 9, via2::IER >> 9);

        // Pseudo-VIA: register index lives in the low five bits
        assert_eq!(via2::IFR_ALIAS & 0x1F, via2::IFR_PSEUDO);
        assert_eq!(via2::IER_ALIAS & 0x1F, via2::IER_PSEUDO);
    }

    #[test]
    fn test_irq_bit_encodings() {
        assert_eq!((via2::Irq::SET | via2::Irq::ASC).bits(), 0x90);
        assert_eq!(via2::Irq::ASC.bits(), 0x10);
    }

    #[test]
    fn test_status_channel_layout() {
        let a = asc::FifoStatus::A_HALF_EMPTY | asc::FifoStatus::A_FULL_EMPTY;
        let b = asc::FifoStatus::B_HALF_EMPTY | asc::FifoStatus::B_FULL_EMPTY;
        assert_eq!(a.bits() << 2, b.bits());
    }
}
