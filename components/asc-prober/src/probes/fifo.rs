//! FIFO flag characterization
//!
//! Runs with interrupts masked throughout. The chip is filled until "full"
//! shows, then left to drain while the status register is polled for
//! half-empty and finally empty. Which bit means what is decided per
//! channel by [`ChannelRecord`](crate::classify::ChannelRecord).

use asc_platform::regs::asc::{self, Control, FifoMode, Mode};
use asc_platform::{Platform, RegisterBus};

use super::masked;
use crate::classify::{Channel, ChannelFlags, ChannelRecord, ChannelState};
use crate::config::ProbeConfig;
use crate::report::{ChannelMode, FifoBehavior, Report};
use crate::timing::Deadline;

pub fn fifo_mono<P: Platform>(platform: &mut P, config: &ProbeConfig, report: &mut Report) {
    characterize(platform, config, report, ChannelMode::Mono);
}

pub fn fifo_stereo<P: Platform>(platform: &mut P, config: &ProbeConfig, report: &mut Report) {
    characterize(platform, config, report, ChannelMode::Stereo);
}

/// Channel configuration saved across a FIFO test
#[derive(Debug, Clone, Copy)]
pub(crate) struct SavedChannelConfig {
    mode: u8,
    control: u8,
    fifo_mode: u8,
}

impl SavedChannelConfig {
    pub(crate) fn save(bus: &mut impl RegisterBus) -> Self {
        Self {
            mode: bus.asc_read(asc::MODE),
            control: bus.asc_read(asc::CONTROL),
            fifo_mode: bus.asc_read(asc::FIFO_MODE),
        }
    }

    pub(crate) fn restore(self, bus: &mut impl RegisterBus) {
        bus.asc_write(asc::CONTROL, self.control);
        bus.asc_write(asc::MODE, self.mode);
        bus.asc_write(asc::FIFO_MODE, self.fifo_mode);
    }

    /// Configure FIFO playback in `mode` and start from empty FIFOs
    pub(crate) fn start_fifo(&self, bus: &mut impl RegisterBus, mode: ChannelMode) {
        bus.asc_write(asc::MODE, Mode::Fifo as u8);
        let control = match mode {
            ChannelMode::Mono => self.control & !Control::STEREO.bits(),
            ChannelMode::Stereo => self.control | Control::STEREO.bits(),
        };
        bus.asc_write(asc::CONTROL, control);

        bus.asc_write(asc::FIFO_MODE, FifoMode::CLEAR.bits());
        bus.asc_write(asc::FIFO_MODE, 0);

        // Stale bits from before the clear
        bus.asc_read(asc::FIFO_IRQ_STATUS);
    }
}

/// Push one sample into every channel active in `mode`
pub(crate) fn write_sample(bus: &mut impl RegisterBus, mode: ChannelMode, sample: u8) {
    bus.asc_write(asc::FIFO_A, sample);
    if mode == ChannelMode::Stereo {
        bus.asc_write(asc::FIFO_B, sample);
    }
}

fn any_in(behavior: &FifoBehavior, state: ChannelState) -> bool {
    behavior.channels.iter().any(|record| record.state() == state)
}

fn characterize<P: Platform>(
    platform: &mut P,
    config: &ProbeConfig,
    report: &mut Report,
    mode: ChannelMode,
) {
    log::debug!("FIFO characterization ({:?})", mode);

    let mut behavior = FifoBehavior {
        tested: true,
        ..FifoBehavior::default()
    };

    masked(platform, |p| {
        let saved = SavedChannelConfig::save(p);
        saved.start_fifo(p, mode);
        run_phases(p, config, mode, &mut behavior);
        saved.restore(p);
    });

    for channel in Channel::BOTH {
        let record = behavior.channel(channel);
        log::info!(
            "FIFO {:?} {:?}: {:?}, full after {:?} samples",
            mode,
            channel,
            record.state(),
            record.fill_count()
        );
    }

    *report.fifo_mut(mode) = behavior;
}

fn run_phases<P: Platform>(
    p: &mut P,
    config: &ProbeConfig,
    mode: ChannelMode,
    behavior: &mut FifoBehavior,
) {
    // Prime
    for i in 0..config.prime_samples {
        write_sample(p, mode, i as u8);
    }
    let status = p.asc_status();
    for channel in Channel::BOTH {
        behavior.channel_mut(channel).primed(channel.flags(status));
    }

    // Fill until every candidate channel shows "full"
    for i in 0..config.fill_burst {
        if !any_in(behavior, ChannelState::AwaitingFull) {
            break;
        }
        write_sample(p, mode, i as u8);
        let written = config.prime_samples.saturating_add(i + 1);
        let status = p.asc_status();
        for channel in Channel::BOTH {
            behavior.channel_mut(channel).observe_fill(channel.flags(status), written);
        }
    }

    // Drain to half-empty
    if any_in(behavior, ChannelState::AwaitingHalfEmpty) {
        poll_status(p, config, behavior, ChannelState::AwaitingHalfEmpty, |record, flags| {
            record.observe_drain(flags);
        });
    }

    // Drain to empty
    if any_in(behavior, ChannelState::AwaitingEmpty) {
        poll_status(p, config, behavior, ChannelState::AwaitingEmpty, |record, flags| {
            record.observe_empty(flags);
        });
    }
}

/// Poll the status register until no channel is left in `waiting`
fn poll_status<P: Platform>(
    p: &mut P,
    config: &ProbeConfig,
    behavior: &mut FifoBehavior,
    waiting: ChannelState,
    mut observe: impl FnMut(&mut ChannelRecord, ChannelFlags),
) {
    let mut deadline = Deadline::start(p, config.drain_wait_ticks, config.poll_iteration_ceiling);
    while deadline.poll(p).is_some() {
        let status = p.asc_status();
        for channel in Channel::BOTH {
            observe(behavior.channel_mut(channel), channel.flags(status));
        }
        if !any_in(behavior, waiting) {
            return;
        }
    }
    log::debug!("FIFO poll for {:?} ran out of budget", waiting);
}
