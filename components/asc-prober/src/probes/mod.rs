//! The probe battery
//!
//! Probes run once each, in the order [`battery`] returns them. Later
//! probes decide whether to run (and how) from fields earlier probes wrote,
//! so every probe declares which report sections it reads and writes, and
//! [`order_violation`] checks the declarations against the order.
//!
//! Every probe leaves each register it touched as it found it, on every
//! path out of the probe.

pub mod decode;
pub mod fifo;
pub mod identity;
pub mod irq;
pub mod registers;

use asc_platform::Platform;

use crate::config::ProbeConfig;
use crate::report::{Report, Sections};

/// Number of probes in the battery
pub const BATTERY_LEN: usize = 12;

/// One step of the battery
pub struct Probe<P: Platform> {
    pub name: &'static str,
    /// Sections consulted by `applies` or `run`
    pub reads: Sections,
    /// Sections `run` fills in
    pub writes: Sections,
    /// Precondition against what earlier probes found
    pub applies: fn(&Report) -> bool,
    pub run: fn(&mut P, &ProbeConfig, &mut Report),
}

impl<P: Platform> Clone for Probe<P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P: Platform> Copy for Probe<P> {}

impl<P: Platform> core::fmt::Debug for Probe<P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Probe")
            .field("name", &self.name)
            .field("reads", &self.reads)
            .field("writes", &self.writes)
            .finish()
    }
}

fn always(_: &Report) -> bool {
    true
}

/// The battery, in execution order
pub fn battery<P: Platform>() -> [Probe<P>; BATTERY_LEN] {
    [
        Probe {
            name: "machine-info",
            reads: Sections::empty(),
            writes: Sections::IDENTITY,
            applies: always,
            run: identity::machine_info::<P>,
        },
        Probe {
            name: "reg-f29-exists",
            reads: Sections::empty(),
            writes: Sections::REGISTERS,
            applies: always,
            run: registers::irq_gate_exists::<P>,
        },
        Probe {
            name: "reg-804-idle",
            reads: Sections::empty(),
            writes: Sections::REGISTERS,
            applies: always,
            run: registers::status_idle::<P>,
        },
        Probe {
            name: "mode-register",
            reads: Sections::empty(),
            writes: Sections::REGISTERS,
            applies: always,
            run: registers::mode_register::<P>,
        },
        Probe {
            name: "channel-config",
            reads: Sections::IDENTITY,
            writes: Sections::REGISTERS,
            applies: always,
            run: registers::channel_config::<P>,
        },
        Probe {
            name: "fifo-mono",
            reads: Sections::REGISTERS,
            writes: Sections::MONO_FIFO,
            applies: |report| report.registers.should_test_mono,
            run: fifo::fifo_mono::<P>,
        },
        Probe {
            name: "fifo-stereo",
            reads: Sections::REGISTERS,
            writes: Sections::STEREO_FIFO,
            applies: |report| report.registers.should_test_stereo,
            run: fifo::fifo_stereo::<P>,
        },
        Probe {
            name: "via2-decode",
            reads: Sections::empty(),
            writes: Sections::DECODE,
            applies: always,
            run: decode::via2_decode::<P>,
        },
        Probe {
            name: "via2-mirror",
            reads: Sections::DECODE,
            writes: Sections::DECODE,
            applies: always,
            run: decode::via2_mirror::<P>,
        },
        Probe {
            name: "idle-irq",
            reads: Sections::empty(),
            writes: Sections::IDLE_IRQ,
            applies: always,
            run: irq::idle_irq::<P>,
        },
        Probe {
            name: "idle-irq-f29",
            reads: Sections::REGISTERS,
            writes: Sections::IDLE_IRQ,
            applies: |report| report.registers.irq_gate_exists,
            run: irq::idle_irq_gated::<P>,
        },
        Probe {
            name: "fifo-irq",
            reads: Sections::REGISTERS
                .union(Sections::MONO_FIFO)
                .union(Sections::STEREO_FIFO)
                .union(Sections::IDLE_IRQ),
            writes: Sections::FIFO_IRQ,
            applies: irq::fifo_irq_applies,
            run: irq::fifo_irq::<P>,
        },
    ]
}

/// First probe that reads a section no earlier probe writes
pub fn order_violation<P: Platform>(probes: &[Probe<P>]) -> Option<&'static str> {
    let mut written = Sections::empty();
    for probe in probes {
        if !written.contains(probe.reads) {
            return Some(probe.name);
        }
        written |= probe.writes;
    }
    None
}

/// Run `f` with processor interrupts masked
pub(crate) fn masked<P: Platform, R>(platform: &mut P, f: impl FnOnce(&mut P) -> R) -> R {
    let token = platform.enter();
    let result = f(platform);
    platform.exit(token);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use asc_sim::SimMachine;

    #[test]
    fn test_battery_order_is_consistent() {
        let probes = battery::<SimMachine>();
        assert_eq!(order_violation(&probes), None);
    }

    #[test]
    fn test_order_violation_names_offender() {
        let mut probes = battery::<SimMachine>();
        // Mirror before decode
        probes.swap(7, 8);
        assert_eq!(order_violation(&probes), Some("via2-mirror"));
    }

    #[test]
    fn test_battery_names_are_unique() {
        let probes = battery::<SimMachine>();
        for (i, a) in probes.iter().enumerate() {
            for b in &probes[i + 1..] {
                assert_ne!(a.name, b.name);
            }
        }
    }
}
