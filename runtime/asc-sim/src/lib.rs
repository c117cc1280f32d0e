//! # Simulated ASC Machine
//!
//! A host-side stand-in for a classic Mac with an Apple Sound Chip, used by
//! the prober's tests and by the `asc-probe` tool. It implements every
//! `asc-platform` trait against a virtual clock:
//!
//! - every bus access costs `access_ns` of virtual time
//! - the tick counter is virtual time divided by `tick_ns`
//! - FIFOs drain against the same clock (or follow a step script)
//! - the ASC line feeds an edge-latched VIA2 flag; when unmasked and
//!   enabled, the installed handler runs before the next access returns
//!
//! ## Usage
//!
//! ```rust
//! use asc_sim::{ChipProfile, SimMachine};
//! use asc_platform::{RegisterBus, Window};
//!
//! let mut machine = SimMachine::new(ChipProfile::sonora()).unwrap();
//! assert_eq!(machine.read(Window::Asc, 0x800), 0xBC);
//! ```
//!
//! A handler that never disables a flooding source would hang real
//! hardware. Here it panics after [`STORM_CEILING`] back-to-back deliveries.

mod asc;
mod fifo;
mod profile;
mod via;

pub use profile::{ChipProfile, FifoModel, IdleIrq, StepScript, Via2Layout};

use asc_platform::regs::{asc as asc_regs, via2};
use asc_platform::{
    CriticalSection, ExchangeCell, HandlerFn, InterruptSlot, IrqToken, MachineInfo, RegisterBus,
    Result, SavedHandler, SystemVersion, TickSource, Window,
};

use crate::asc::Asc;
use crate::via::Via2;

/// Back-to-back interrupt deliveries before the simulator gives up
pub const STORM_CEILING: u32 = 1 << 22;

/// Token raw value for "interrupts were masked"
const MASKED: u16 = 0x0700;

/// Occupant of the ASC dispatch slot
#[derive(Clone, Copy)]
enum SlotEntry {
    /// The ROM handler: read status, acknowledge
    Rom,
    Installed {
        entry: HandlerFn,
        cell: *const ExchangeCell,
    },
}

/// Configuration registers a probe is expected to put back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterSnapshot {
    pub asc_mode: u8,
    pub asc_control: u8,
    pub asc_fifo_mode: u8,
    pub asc_irq_gate: Option<u8>,
    pub asc_general: Vec<u8>,
    pub via2_ier: u8,
    pub via2_latches: [u8; 32],
    pub handler_installed: bool,
    pub masked: bool,
}

/// Counters for assertions about what the probes did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimStats {
    pub bus_accesses: u64,
    pub status_reads: u64,
    pub deliveries: u64,
    /// Longest run of deliveries without the main context getting a turn
    pub longest_storm: u32,
}

/// The simulated machine
pub struct SimMachine {
    profile: ChipProfile,
    now_ns: u64,
    asc: Asc,
    via2: Via2,

    masked: bool,
    in_section: bool,
    in_handler: bool,
    slot: SlotEntry,
    saved_slots: Vec<SlotEntry>,

    stats: SimStats,
}

impl SimMachine {
    pub fn new(profile: ChipProfile) -> Result<Self> {
        profile.validate()?;
        log::debug!("sim: building '{}' (ASC version {:#04x})", profile.name, profile.version);

        Ok(Self {
            asc: Asc::new(&profile),
            via2: Via2::new(profile.via2, profile.initial_ier, profile.via2_noise_reads),
            profile,
            now_ns: 0,
            masked: false,
            in_section: false,
            in_handler: false,
            slot: SlotEntry::Rom,
            saved_slots: Vec::new(),
            stats: SimStats::default(),
        })
    }

    pub fn profile(&self) -> &ChipProfile {
        &self.profile
    }

    pub fn stats(&self) -> SimStats {
        self.stats
    }

    pub fn now_ns(&self) -> u64 {
        self.now_ns
    }

    pub fn masked(&self) -> bool {
        self.masked
    }

    /// Samples currently queued in `channel` (0 = A, 1 = B)
    pub fn occupancy(&self, channel: usize) -> usize {
        self.asc.occupancy(channel)
    }

    /// ASC interrupt flagged in VIA2 and not yet acknowledged
    pub fn asc_irq_flagged(&self) -> bool {
        self.via2.asc_flagged()
    }

    pub fn register_snapshot(&self) -> RegisterSnapshot {
        RegisterSnapshot {
            asc_mode: self.asc.mode(),
            asc_control: self.asc.control(),
            asc_fifo_mode: self.asc.fifo_mode(),
            asc_irq_gate: self.asc.irq_gate(),
            asc_general: self.asc.general_registers().to_vec(),
            via2_ier: self.via2.ier(),
            via2_latches: self.via2.latches(),
            handler_installed: matches!(self.slot, SlotEntry::Installed { .. }),
            masked: self.masked,
        }
    }

    /// Let virtual time pass without touching the bus
    pub fn idle(&mut self, duration_ns: u64) {
        let steps = duration_ns / self.profile.access_ns;
        for _ in 0..steps {
            self.step();
            self.settle();
        }
    }

    /// One bus cycle of virtual time
    fn step(&mut self) {
        self.now_ns += self.profile.access_ns;
        self.stats.bus_accesses += 1;
        self.asc.advance(self.now_ns);
    }

    /// Propagate the ASC line and take any interrupt the CPU would take
    fn settle(&mut self) {
        self.via2.drive_asc_line(self.asc.irq_line());
        if !self.masked && !self.in_handler {
            self.deliver_pending();
        }
    }

    fn deliver_pending(&mut self) {
        let mut storm = 0u32;
        while self.via2.pending() {
            storm += 1;
            if storm > STORM_CEILING {
                panic!(
                    "interrupt storm on '{}': ASC source never disabled",
                    self.profile.name
                );
            }

            self.in_handler = true;
            self.stats.deliveries += 1;
            match self.slot {
                SlotEntry::Rom => {
                    self.read(Window::Asc, asc_regs::FIFO_IRQ_STATUS);
                    self.ack_asc_irq();
                }
                SlotEntry::Installed { entry, cell } => {
                    // SAFETY: `install` callers keep the cell alive until `restore`
                    let cell = unsafe { &*cell };
                    entry(self, cell);
                }
            }
            self.in_handler = false;
            self.via2.drive_asc_line(self.asc.irq_line());
        }
        self.stats.longest_storm = self.stats.longest_storm.max(storm);
    }
}

impl RegisterBus for SimMachine {
    fn read(&mut self, window: Window, offset: u16) -> u8 {
        self.step();
        let value = match window {
            Window::Asc => {
                if offset == asc_regs::FIFO_IRQ_STATUS {
                    self.stats.status_reads += 1;
                }
                self.asc.read(offset)
            }
            Window::Via2 => self.via2.read(offset),
        };
        self.settle();
        value
    }

    fn write(&mut self, window: Window, offset: u16, value: u8) {
        self.step();
        match window {
            Window::Asc => self.asc.write(offset, value),
            Window::Via2 => {
                let had_flag = self.via2.asc_flagged();
                let enabled = self.via2.write(offset, value);
                if enabled & via2::Irq::ASC.bits() != 0 {
                    self.asc.source_enabled();
                }
                // A flooding chip re-asserts the moment it is acknowledged
                if had_flag && !self.via2.asc_flagged() && self.asc.flooding() {
                    self.via2.raise_asc();
                }
            }
        }
        self.settle();
    }
}

impl CriticalSection for SimMachine {
    fn enter(&mut self) -> IrqToken {
        assert!(!self.in_section, "critical sections do not nest");
        self.in_section = true;
        let prior = if self.masked { MASKED } else { 0 };
        self.masked = true;
        IrqToken::from_raw(prior)
    }

    fn exit(&mut self, token: IrqToken) {
        self.in_section = false;
        self.masked = token.raw() & MASKED != 0;
        if !self.masked {
            self.deliver_pending();
        }
    }
}

impl TickSource for SimMachine {
    fn now(&mut self) -> u32 {
        self.step();
        self.settle();
        (self.now_ns / self.profile.tick_ns) as u32
    }
}

impl MachineInfo for SimMachine {
    fn box_flag(&mut self) -> u8 {
        self.profile.box_flag
    }

    fn system_version(&mut self) -> SystemVersion {
        self.profile.system_version
    }
}

impl InterruptSlot for SimMachine {
    unsafe fn install(&mut self, entry: HandlerFn, cell: *const ExchangeCell) -> SavedHandler {
        debug_assert!(self.masked, "handler installed with interrupts unmasked");
        self.saved_slots.push(self.slot);
        self.slot = SlotEntry::Installed { entry, cell };
        SavedHandler::from_raw(self.saved_slots.len(), [0, 0])
    }

    unsafe fn restore(&mut self, saved: SavedHandler) {
        debug_assert!(self.masked, "handler restored with interrupts unmasked");
        debug_assert_eq!(saved.vector(), self.saved_slots.len(), "restore out of order");
        if let Some(previous) = self.saved_slots.pop() {
            self.slot = previous;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counting_handler(bus: &mut dyn RegisterBus, cell: &ExchangeCell) {
        bus.asc_read(asc_regs::FIFO_IRQ_STATUS);
        bus.ack_asc_irq();
        if cell.bump(0) >= cell.threshold() {
            bus.set_asc_irq_enabled(false);
            cell.trip();
        }
    }

    #[test]
    fn test_tick_counter_follows_virtual_time() {
        let mut machine = SimMachine::new(ChipProfile::classic()).unwrap();
        let start = machine.now();
        machine.idle(machine.profile().tick_ns * 3);
        assert_eq!(machine.ticks_since(start), 3);
    }

    #[test]
    fn test_invalid_profile_rejected() {
        let mut profile = ChipProfile::classic();
        profile.access_ns = 0;
        assert!(SimMachine::new(profile).is_err());
    }

    #[test]
    fn test_flood_is_contained_by_handler() {
        let mut machine = SimMachine::new(ChipProfile::sonora()).unwrap();
        let cell = ExchangeCell::new();
        cell.arm(500, 0);

        let token = machine.enter();
        let saved = unsafe { machine.install(counting_handler, &cell) };
        machine.write(Window::Asc, asc_regs::IRQ_GATE, 0);
        machine.set_asc_irq_enabled(true);
        machine.exit(token);

        assert!(cell.tripped());
        assert_eq!(cell.slot(0), 500);

        let token = machine.enter();
        machine.write(Window::Asc, asc_regs::IRQ_GATE, 1);
        unsafe { machine.restore(saved) };
        machine.exit(token);
        assert!(!machine.register_snapshot().handler_installed);
    }

    #[test]
    fn test_masked_interrupts_wait_for_exit() {
        let mut machine = SimMachine::new(ChipProfile::v8()).unwrap();
        let cell = ExchangeCell::new();
        cell.arm(u32::MAX, 0);

        let token = machine.enter();
        let saved = unsafe { machine.install(counting_handler, &cell) };
        machine.set_asc_irq_enabled(true);
        machine.idle(1_000_000);
        assert_eq!(cell.total(), 0);

        machine.exit(token);
        assert_eq!(cell.total(), 1);

        let token = machine.enter();
        unsafe { machine.restore(saved) };
        machine.exit(token);
    }

    #[test]
    fn test_rom_handler_services_stray_interrupts() {
        let mut machine = SimMachine::new(ChipProfile::v8()).unwrap();
        machine.set_asc_irq_enabled(true);
        assert_eq!(machine.stats().deliveries, 1);
        assert!(!machine.asc_irq_flagged());
    }
}
