//! The shared report every probe writes into
//!
//! One `Report` per run, owned by the runner's caller and passed by `&mut`
//! to each probe in turn. Nothing here is touched from interrupt context:
//! handlers talk to probes through an `ExchangeCell`, and the probe copies
//! the results in once interrupts are masked again.

use asc_platform::SystemVersion;
use bitflags::bitflags;

use crate::classify::{Channel, ChannelRecord};

bitflags! {
    /// Report sections, used to declare what each probe reads and writes
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Sections: u8 {
        const IDENTITY = 1 << 0;
        const REGISTERS = 1 << 1;
        const MONO_FIFO = 1 << 2;
        const STEREO_FIFO = 1 << 3;
        const DECODE = 1 << 4;
        const IDLE_IRQ = 1 << 5;
        const FIFO_IRQ = 1 << 6;
    }
}

/// Broad chip family, from the version register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AscFamily {
    /// Discrete ASC, version 0x00
    Original,
    /// Sonora-class, version 0xBx
    SonoraClass,
    /// Integrated controllers reporting 0xEx (V8 and relatives)
    IntegratedClass,
    #[default]
    Unknown,
}

impl AscFamily {
    pub fn from_version(version: u8) -> Self {
        match version {
            0x00 => AscFamily::Original,
            0xB0..=0xBF => AscFamily::SonoraClass,
            0xE0..=0xEF => AscFamily::IntegratedClass,
            _ => AscFamily::Unknown,
        }
    }
}

/// Who we are running on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MachineIdentity {
    pub asc_version: u8,
    pub family: AscFamily,
    /// Sonora-class chips leave the stereo bit at 0 but are really stereo
    pub is_sonora: bool,
    pub box_flag: u8,
    pub system_version: SystemVersion,
}

/// Which registers exist and which values they accept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegisterCapability {
    /// Interrupt gate register (0xF29) accepts and returns both 1 and 0
    pub irq_gate_exists: bool,
    /// Gate value found before probing (only meaningful if it exists)
    pub irq_gate_initial: u8,
    /// Status register after two reads in FIFO mode
    pub status_idle: u8,
    pub initial_mode: u8,
    pub initial_control: u8,
    /// Mode register latches 0, 1, 2
    pub accepts_mode: [bool; 3],
    pub accepts_mono: bool,
    pub accepts_stereo: bool,
    pub should_test_mono: bool,
    pub should_test_stereo: bool,
}

/// Channel configuration a FIFO test ran with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelMode {
    Mono,
    Stereo,
}

/// FIFO flag behavior in one channel mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FifoBehavior {
    pub tested: bool,
    pub channels: [ChannelRecord; 2],
}

impl FifoBehavior {
    pub fn channel(&self, channel: Channel) -> &ChannelRecord {
        &self.channels[channel.index()]
    }

    pub fn channel_mut(&mut self, channel: Channel) -> &mut ChannelRecord {
        &mut self.channels[channel.index()]
    }

    pub fn a(&self) -> &ChannelRecord {
        self.channel(Channel::A)
    }

    pub fn b(&self) -> &ChannelRecord {
        self.channel(Channel::B)
    }
}

/// First repeat found by the word-compare heuristic
///
/// Known limitation: a decode pattern that itself changes across
/// sub-ranges (for example a four-byte repeat that alternates every
/// sixteen bytes) is reported by its first repeat only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepeatStride {
    #[default]
    NotObserved,
    /// Word 0 recurs this many bytes in
    Every(u16),
    /// Every word in the window is identical
    Uniform,
}

/// Alias/canonical agreement for the VIA2 enable register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MirrorCheck {
    pub tested: bool,
    /// Canonical enable offset used (0x1C00 or 0x13)
    pub canonical_enable: u16,
    pub alias_matches_canonical: bool,
    pub set_via_alias_seen: bool,
    pub clear_via_alias_seen: bool,
    pub set_via_canonical_seen: bool,
    pub clear_via_canonical_seen: bool,
}

impl MirrorCheck {
    pub fn ok(&self) -> bool {
        self.tested
            && self.alias_matches_canonical
            && self.set_via_alias_seen
            && self.clear_via_alias_seen
            && self.set_via_canonical_seen
            && self.clear_via_canonical_seen
    }
}

/// VIA2 address decode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AddressDecode {
    /// Two consecutive window snapshots matched
    pub consistent: bool,
    /// Snapshots taken before they matched (or the retry budget)
    pub attempts: u16,
    /// Low address bits that change what a read returns
    pub decode_mask: u16,
    pub repeat_stride: RepeatStride,
    pub mirror: MirrorCheck,
}

/// Gate re-arm phase of the idle probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RearmRecord {
    /// No interrupts with the gate closed
    pub silent_while_gated: bool,
    /// Interrupts again once the gate reopened
    pub refires_when_opened: bool,
}

/// Interrupts taken while the chip sat idle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IdleIrqRecord {
    pub tested: bool,
    pub count: u32,
    /// Interrupts already taken when the main context got its first turn
    pub immediate: u32,
    /// At least one interrupt anywhere in the observation window
    pub fires_immediately: bool,
    /// Handler hit the flood threshold and shut the source down
    pub floods: bool,
    /// The flood ran to the threshold before the main context got a turn
    pub takes_over_cpu: bool,
    pub max_delta_per_tick: u32,
    pub rearm: Option<RearmRecord>,
}

/// Handler counters, one per status pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BucketCounts {
    pub full: u32,
    pub half_empty: u32,
    pub empty: u32,
    pub other: u32,
}

impl BucketCounts {
    pub fn total(&self) -> u32 {
        self.full + self.half_empty + self.empty + self.other
    }
}

/// Interrupts taken while a FIFO filled and drained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FifoIrqRecord {
    pub tested: bool,
    pub channel: Option<Channel>,
    pub mode: Option<ChannelMode>,
    /// Gate register opened for the test
    pub gate_opened: bool,
    pub counts: BucketCounts,
    /// Half-empty interrupt arrived before the full one
    pub half_empty_too_soon: bool,
    /// Empty interrupt arrived before (or with) the half-empty one
    pub empty_too_soon: bool,
    /// Empty phase attempted (skipped when the gate floods at idle)
    pub checked_empty: bool,
    pub floods: bool,
    pub max_delta_per_tick: u32,
}

/// All interrupt observations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InterruptBehavior {
    /// Gate register left alone
    pub idle: IdleIrqRecord,
    /// Gate register opened
    pub idle_gated: IdleIrqRecord,
    pub fifo: FifoIrqRecord,
}

impl InterruptBehavior {
    /// Idle record for the gate configuration in question
    pub fn idle_for(&self, gate_opened: bool) -> &IdleIrqRecord {
        if gate_opened {
            &self.idle_gated
        } else {
            &self.idle
        }
    }
}

/// Capability report for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Report {
    pub identity: MachineIdentity,
    pub registers: RegisterCapability,
    pub mono: FifoBehavior,
    pub stereo: FifoBehavior,
    pub decode: AddressDecode,
    pub interrupts: InterruptBehavior,
}

impl Report {
    pub fn fifo(&self, mode: ChannelMode) -> &FifoBehavior {
        match mode {
            ChannelMode::Mono => &self.mono,
            ChannelMode::Stereo => &self.stereo,
        }
    }

    pub fn fifo_mut(&mut self, mode: ChannelMode) -> &mut FifoBehavior {
        match mode {
            ChannelMode::Mono => &mut self.mono,
            ChannelMode::Stereo => &mut self.stereo,
        }
    }
}
