//! # ASC Platform Abstraction Layer
//!
//! Everything the probing engine needs from the machine, expressed as traits:
//! - **Register access**: byte reads/writes into the ASC and VIA2 windows
//! - **Critical section**: masking processor interrupts around sensitive sequences
//! - **Interrupt slot**: the VIA2 dispatch-table entry for the ASC interrupt
//! - **Tick source**: the free-running 60.15 Hz tick counter
//! - **Machine info**: platform identifier byte and system-software version
//!
//! ## Backends
//!
//! - `asc-sim` (separate crate): simulated chip harness for tests and host runs
//! - `lowmem` (feature `classic-mac`, `target_arch = "m68k"`): real hardware,
//!   with device bases taken from classic Mac OS low-memory globals
//!
//! ```bash
//! # Host (simulator)
//! cargo test
//!
//! # Real hardware
//! cargo build -p asc-platform --features classic-mac --target m68k-unknown-none-elf
//! ```

#![no_std]
#![cfg_attr(
    all(target_arch = "m68k", feature = "classic-mac"),
    feature(asm_experimental_arch)
)]

pub mod bus;
pub mod irq;
pub mod machine;
pub mod regs;

#[cfg(all(target_arch = "m68k", feature = "classic-mac"))]
pub mod lowmem;

pub use bus::{RegisterBus, Window};
pub use irq::{CriticalSection, ExchangeCell, HandlerFn, InterruptSlot, IrqToken, SavedHandler};
pub use machine::{MachineInfo, SystemVersion, TickSource};

use thiserror::Error;

/// Platform errors
///
/// Only backend construction can fail. Once a backend exists, register
/// access is infallible: a missing register simply reads back garbage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PlatformError {
    #[error("device window not mapped: {window:?}")]
    MissingWindow { window: Window },

    #[error("invalid machine profile: {reason}")]
    InvalidProfile { reason: &'static str },
}

pub type Result<T> = core::result::Result<T, PlatformError>;

/// Everything a probe needs from the machine
///
/// Blanket-implemented for any type providing all five capabilities, so a
/// backend only implements the individual traits.
pub trait Platform: RegisterBus + CriticalSection + InterruptSlot + TickSource + MachineInfo {}

impl<T> Platform for T where T: RegisterBus + CriticalSection + InterruptSlot + TickSource + MachineInfo {}

/// Platform configuration and detection
pub mod config {
    /// Which backend this build can run against
    pub fn platform_mode() -> &'static str {
        #[cfg(all(target_arch = "m68k", feature = "classic-mac"))]
        return "classic-mac";

        #[cfg(not(all(target_arch = "m68k", feature = "classic-mac")))]
        return "simulated";
    }

    /// Check if the real low-memory backend is compiled in
    pub const fn is_classic_mac() -> bool {
        cfg!(all(target_arch = "m68k", feature = "classic-mac"))
    }
}
