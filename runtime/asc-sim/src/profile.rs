//! Chip profiles - the knobs that make one simulated machine differ from another

use asc_platform::regs::{asc, via2};
use asc_platform::{PlatformError, Result, SystemVersion};

/// How the VIA2 window decodes addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Via2Layout {
    /// Real 6522: register index in address bits 9..13
    Real,
    /// Pseudo-VIA: register selected by `offset & decode_mask`
    Pseudo { decode_mask: u16 },
}

/// What the ASC interrupt does while the chip sits idle with its gate open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleIrq {
    Silent,
    /// One spurious interrupt each time VIA2 enables the source
    OnEnable,
    /// Line held while starved; re-fires on every acknowledgment
    Flood,
}

/// How FIFO occupancy (and therefore the status register) evolves
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FifoModel {
    /// Samples drain at a fixed rate against virtual time
    Timed { sample_period_ns: u64 },
    /// Status follows a script keyed on stream position
    Stepped(StepScript),
}

/// Scripted status register
///
/// The stream position advances on every FIFO A write, and on every status
/// read that was not preceded by a FIFO write since the previous status
/// read (the drain clock). Position resets when the FIFOs are cleared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepScript {
    /// `(position, status)` breakpoints, sorted by position
    breakpoints: Vec<(u32, u8)>,
}

impl StepScript {
    pub fn new(mut breakpoints: Vec<(u32, u8)>) -> Self {
        breakpoints.sort_by_key(|&(at, _)| at);
        Self { breakpoints }
    }

    /// Status register value at stream position `position`
    pub fn status_at(&self, position: u32) -> u8 {
        self.breakpoints
            .iter()
            .take_while(|&&(at, _)| at <= position)
            .last()
            .map_or(0, |&(_, status)| status)
    }
}

/// Everything that distinguishes one simulated machine from another
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChipProfile {
    pub name: &'static str,
    /// Value of the ASC version register
    pub version: u8,
    pub box_flag: u8,
    pub system_version: SystemVersion,

    /// Which of modes 0, 1, 2 the mode register latches
    pub accepted_modes: [bool; 3],
    pub initial_mode: u8,
    /// Control-register bits that latch writes
    pub control_writable: u8,
    /// Channel B plays regardless of the stereo bit
    pub forced_stereo: bool,
    /// Initial value of the interrupt gate register, if the chip has one
    pub irq_gate: Option<u8>,
    pub idle_irq: IdleIrq,
    pub fifo: FifoModel,
    pub fifo_depth: u16,
    /// Status bits that read as set no matter what
    pub status_stuck: u8,

    pub via2: Via2Layout,
    /// Initial VIA2 enable bits (without the set/clear bit)
    pub initial_ier: u8,
    /// Reads of the VIA2 port register that return jittered values
    pub via2_noise_reads: u32,

    /// Virtual time consumed by one bus access
    pub access_ns: u64,
    /// Virtual time between ticks
    pub tick_ns: u64,
}

/// One sample every 1/22257 s
const SAMPLE_PERIOD_NS: u64 = 44_930;
/// 60.15 Hz
const TICK_NS: u64 = 16_625_000;
const ACCESS_NS: u64 = 2_000;

impl ChipProfile {
    /// Discrete ASC behind a real VIA2 (Mac II class)
    pub fn classic() -> Self {
        Self {
            name: "classic",
            version: 0x00,
            box_flag: 0x01,
            system_version: SystemVersion::new(7, 1, 0),
            accepted_modes: [true, true, true],
            initial_mode: asc::Mode::Off as u8,
            control_writable: asc::Control::STEREO.bits(),
            forced_stereo: false,
            irq_gate: None,
            idle_irq: IdleIrq::Silent,
            fifo: FifoModel::Timed {
                sample_period_ns: SAMPLE_PERIOD_NS,
            },
            fifo_depth: asc::FIFO_DEPTH,
            status_stuck: 0,
            via2: Via2Layout::Real,
            initial_ier: via2::Irq::ASC.bits(),
            via2_noise_reads: 3,
            access_ns: ACCESS_NS,
            tick_ns: TICK_NS,
        }
    }

    /// Sonora-class integrated controller: stereo bit reads back 0, gated
    /// interrupt that floods when opened on an idle chip
    pub fn sonora() -> Self {
        Self {
            name: "sonora",
            version: 0xBC,
            box_flag: 0x2E,
            system_version: SystemVersion::new(7, 5, 5),
            accepted_modes: [true, true, true],
            control_writable: 0,
            forced_stereo: true,
            irq_gate: Some(1),
            idle_irq: IdleIrq::Flood,
            via2: Via2Layout::Pseudo { decode_mask: 0x1F },
            via2_noise_reads: 0,
            ..Self::classic()
        }
    }

    /// V8-class integrated controller: mono only, no wavetable, one
    /// spurious interrupt whenever the source is enabled
    pub fn v8() -> Self {
        Self {
            name: "v8",
            version: 0xE8,
            box_flag: 0x14,
            system_version: SystemVersion::new(7, 0, 1),
            accepted_modes: [true, true, false],
            control_writable: 0,
            idle_irq: IdleIrq::OnEnable,
            via2: Via2Layout::Pseudo { decode_mask: 0x1F },
            via2_noise_reads: 0,
            ..Self::classic()
        }
    }

    /// Look a preset up by name
    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "classic" => Some(Self::classic()),
            "sonora" => Some(Self::sonora()),
            "v8" => Some(Self::v8()),
            _ => None,
        }
    }

    pub fn with_fifo(mut self, fifo: FifoModel) -> Self {
        self.fifo = fifo;
        self
    }

    pub fn with_idle_irq(mut self, idle_irq: IdleIrq) -> Self {
        self.idle_irq = idle_irq;
        self
    }

    pub fn with_via2(mut self, layout: Via2Layout) -> Self {
        self.via2 = layout;
        self
    }

    pub fn with_status_stuck(mut self, bits: u8) -> Self {
        self.status_stuck = bits;
        self
    }

    /// Reject profiles that would stall virtual time or divide by zero
    pub fn validate(&self) -> Result<()> {
        if self.fifo_depth == 0 {
            return Err(PlatformError::InvalidProfile {
                reason: "zero FIFO depth",
            });
        }
        if self.access_ns == 0 {
            return Err(PlatformError::InvalidProfile {
                reason: "zero bus access time",
            });
        }
        if self.tick_ns == 0 {
            return Err(PlatformError::InvalidProfile {
                reason: "zero tick period",
            });
        }
        if let FifoModel::Timed { sample_period_ns: 0 } = self.fifo {
            return Err(PlatformError::InvalidProfile {
                reason: "zero sample period",
            });
        }
        if let Via2Layout::Pseudo { decode_mask: 0 } = self.via2 {
            return Err(PlatformError::InvalidProfile {
                reason: "pseudo-VIA with empty decode mask",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_validate() {
        for name in ["classic", "sonora", "v8"] {
            let profile = ChipProfile::by_name(name).unwrap();
            assert_eq!(profile.name, name);
            profile.validate().unwrap();
        }
        assert!(ChipProfile::by_name("quadra").is_none());
    }

    #[test]
    fn test_validate_rejects_zero_timing() {
        let mut profile = ChipProfile::classic();
        profile.tick_ns = 0;
        assert_eq!(
            profile.validate(),
            Err(PlatformError::InvalidProfile {
                reason: "zero tick period"
            })
        );
    }

    #[test]
    fn test_step_script_breakpoints() {
        let script = StepScript::new(vec![(513, 0x01), (257, 0x02), (769, 0x03)]);
        assert_eq!(script.status_at(0), 0x00);
        assert_eq!(script.status_at(256), 0x00);
        assert_eq!(script.status_at(257), 0x02);
        assert_eq!(script.status_at(512), 0x02);
        assert_eq!(script.status_at(513), 0x01);
        assert_eq!(script.status_at(10_000), 0x03);
    }
}
