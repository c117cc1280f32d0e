//! # ASC Prober
//!
//! Behavioral probing engine for the Apple Sound Chip family and the VIA2
//! interrupt path behind it. Many hardware revisions share one register
//! map but disagree on what the registers do; the battery provokes the
//! chip and records how it reacts.
//!
//! ## Battery
//!
//! | Probe            | Finds out                                           |
//! |------------------|-----------------------------------------------------|
//! | `machine-info`   | ASC version, family, BoxFlag, system version        |
//! | `reg-f29-exists` | whether the interrupt gate register exists          |
//! | `reg-804-idle`   | idle status register value                          |
//! | `mode-register`  | which operating modes latch                         |
//! | `channel-config` | mono/stereo support, which FIFO tests to run        |
//! | `fifo-mono`      | FIFO flag semantics, mono                           |
//! | `fifo-stereo`    | FIFO flag semantics, stereo                         |
//! | `via2-decode`    | VIA2 address decode                                 |
//! | `via2-mirror`    | whether the enable alias reaches the real register  |
//! | `idle-irq`       | idle interrupts with the gate untouched             |
//! | `idle-irq-f29`   | idle interrupts with the gate open                  |
//! | `fifo-irq`       | which FIFO conditions interrupt                     |
//!
//! ## Usage
//!
//! ```rust
//! use asc_prober::{ProbeConfig, Runner};
//! use asc_sim::{ChipProfile, SimMachine};
//!
//! let mut machine = SimMachine::new(ChipProfile::v8()).unwrap();
//! let config = ProbeConfig { idle_wait_ticks: 4, rearm_wait_ticks: 2, ..ProbeConfig::default() };
//! let report = Runner::new(config).unwrap().run(&mut machine);
//! assert!(report.registers.should_test_mono);
//! ```
//!
//! Probes never fail. Whatever the chip does ends up as a field in the
//! [`Report`]; the only errors are invalid tunables ([`ConfigError`]).

#![no_std]

pub mod classify;
pub mod config;
pub mod exchange;
pub mod format;
pub mod probes;
pub mod report;
pub mod runner;
pub mod timing;

pub use classify::{Channel, ChannelRecord, ChannelState};
pub use config::{ConfigError, ProbeConfig};
pub use probes::{battery, order_violation, Probe};
pub use report::Report;
pub use runner::Runner;
