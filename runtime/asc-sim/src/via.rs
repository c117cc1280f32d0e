//! VIA2 (real or pseudo) - interrupt flag/enable registers and address decode

use asc_platform::regs::via2::{self, Irq};

use crate::profile::Via2Layout;

/// Number of plain latches behind the decoded window
const LATCHES: usize = 32;

/// Register selected by an offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Register {
    Flags,
    Enable,
    Latch(usize),
}

pub struct Via2 {
    layout: Via2Layout,
    ifr: u8,
    ier: u8,
    latches: [u8; LATCHES],
    /// Level of the ASC line at the last sample, for edge detection
    asc_line: bool,
    noise_reads: u32,
}

impl Via2 {
    pub fn new(layout: Via2Layout, initial_ier: u8, noise_reads: u32) -> Self {
        let mut latches = [0u8; LATCHES];
        for (index, latch) in latches.iter_mut().enumerate() {
            *latch = 0x5A ^ (index as u8).wrapping_mul(0x1D);
        }

        Self {
            layout,
            ifr: 0,
            ier: initial_ier & !Irq::SET.bits(),
            latches,
            asc_line: false,
            noise_reads,
        }
    }

    fn decode(&self, offset: u16) -> Register {
        match self.layout {
            Via2Layout::Real => match (offset / via2::REGISTER_STRIDE) & 0x0F {
                13 => Register::Flags,
                14 => Register::Enable,
                index => Register::Latch(index as usize),
            },
            Via2Layout::Pseudo { decode_mask } => {
                let key = offset & decode_mask;
                if key == via2::IFR_ALIAS & decode_mask {
                    Register::Flags
                } else if key == via2::IER_ALIAS & decode_mask {
                    Register::Enable
                } else {
                    Register::Latch(key as usize % LATCHES)
                }
            }
        }
    }

    pub fn read(&mut self, offset: u16) -> u8 {
        match self.decode(offset) {
            Register::Flags => {
                let any = if self.pending() { Irq::SET.bits() } else { 0 };
                self.ifr | any
            }
            Register::Enable => self.ier | Irq::SET.bits(),
            Register::Latch(index) => {
                let value = self.latches[index];
                if index == 0 && self.noise_reads > 0 {
                    self.noise_reads -= 1;
                    value ^ 0x40
                } else {
                    value
                }
            }
        }
    }

    /// Write a register; returns the enable bits switched on by this write
    pub fn write(&mut self, offset: u16, value: u8) -> u8 {
        match self.decode(offset) {
            Register::Flags => {
                self.ifr &= !(value & !Irq::SET.bits());
                0
            }
            Register::Enable => {
                let bits = value & !Irq::SET.bits();
                if value & Irq::SET.bits() != 0 {
                    self.ier |= bits;
                    bits
                } else {
                    self.ier &= !bits;
                    0
                }
            }
            Register::Latch(index) => {
                self.latches[index] = value;
                0
            }
        }
    }

    /// Sample the ASC interrupt line; a rising edge sets the flag
    pub fn drive_asc_line(&mut self, level: bool) {
        if level && !self.asc_line {
            self.raise_asc();
        }
        self.asc_line = level;
    }

    pub fn raise_asc(&mut self) {
        self.ifr |= Irq::ASC.bits();
    }

    pub fn asc_flagged(&self) -> bool {
        self.ifr & Irq::ASC.bits() != 0
    }

    /// Any enabled flag set
    pub fn pending(&self) -> bool {
        self.ifr & self.ier & !Irq::SET.bits() != 0
    }

    pub fn ier(&self) -> u8 {
        self.ier
    }

    pub fn latches(&self) -> [u8; LATCHES] {
        self.latches
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_reaches_enable_on_both_layouts() {
        for layout in [Via2Layout::Real, Via2Layout::Pseudo { decode_mask: 0x1F }] {
            let mut via = Via2::new(layout, 0, 0);
            via.write(via2::IER_ALIAS, 0x90);
            assert_eq!(via.ier(), 0x10, "{layout:?}");
            via.write(via2::IER_ALIAS, 0x10);
            assert_eq!(via.ier(), 0x00, "{layout:?}");
        }
    }

    #[test]
    fn test_flags_latch_on_rising_edge_only() {
        let mut via = Via2::new(Via2Layout::Real, 0x10, 0);
        via.drive_asc_line(true);
        assert!(via.pending());

        via.write(via2::IFR_ALIAS, 0x90);
        assert!(!via.pending());

        // Line still high: no new edge
        via.drive_asc_line(true);
        assert!(!via.pending());

        via.drive_asc_line(false);
        via.drive_asc_line(true);
        assert!(via.pending());
    }

    #[test]
    fn test_real_layout_repeats_one_register_per_stride() {
        let mut via = Via2::new(Via2Layout::Real, 0, 0);
        let first = via.read(0x000);
        assert!((1..0x200).all(|offset| via.read(offset) == first));
        assert_ne!(via.read(0x200), first);
    }

    #[test]
    fn test_noise_only_hits_first_reads() {
        let mut via = Via2::new(Via2Layout::Real, 0, 2);
        let a = via.read(0);
        let b = via.read(0);
        let c = via.read(0);
        let d = via.read(0);
        assert_eq!(a, b);
        assert_ne!(b, c);
        assert_eq!(c, d);
    }
}
