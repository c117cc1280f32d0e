//! Interrupt behavior
//!
//! Every probe here follows the same exchange protocol:
//!
//! 1. Masked: save the VIA2 enable state (and the gate, if touched), arm
//!    an [`ExchangeCell`], install a handler, clear stale status,
//!    acknowledge, enable the source, open the gate.
//! 2. Unmask and wait on the tick counter, watching the cell.
//! 3. Masked again: copy the cell out, then put back the gate, acknowledge,
//!    and restore the previous handler and enable state.
//!
//! The cell lives on the probe's stack and the handler is removed before
//! the probe returns, on every path. A runaway source is shut down by the
//! handler itself (see [`crate::exchange`]).

use asc_platform::regs::asc;
use asc_platform::regs::via2::{self, Irq};
use asc_platform::{ExchangeCell, HandlerFn, Platform, RegisterBus, SavedHandler};

use super::fifo::{write_sample, SavedChannelConfig};
use crate::classify::Channel;
use crate::config::ProbeConfig;
use crate::exchange::{self, Bucket, HandlerOptions};
use crate::report::{BucketCounts, ChannelMode, FifoIrqRecord, IdleIrqRecord, RearmRecord, Report};
use crate::timing::{Deadline, RateSampler};

/// Interrupt path state replaced for the duration of a probe
struct SavedIrqPath {
    enabled: bool,
    gate: Option<u8>,
    handler: SavedHandler,
}

impl SavedIrqPath {
    /// Save the path and put `entry` in the ASC slot
    ///
    /// # Safety
    ///
    /// Interrupts must be masked, and `cell` must outlive the matching
    /// [`SavedIrqPath::restore`].
    unsafe fn install<P: Platform>(
        p: &mut P,
        entry: HandlerFn,
        cell: &ExchangeCell,
        touch_gate: bool,
    ) -> Self {
        let enabled = p.via2_read(via2::IER_ALIAS) & Irq::ASC.bits() != 0;
        let gate = touch_gate.then(|| p.asc_read(asc::IRQ_GATE));
        // SAFETY: forwarded from the caller
        let handler = unsafe { p.install(entry, cell) };
        Self { enabled, gate, handler }
    }

    /// Put everything back; interrupts must be masked
    fn restore<P: Platform>(self, p: &mut P) {
        if let Some(gate) = self.gate {
            p.asc_write(asc::IRQ_GATE, gate);
        }
        p.ack_asc_irq();
        // SAFETY: `handler` came from the install on this slot that created `self`
        unsafe { p.restore(self.handler) };
        p.set_asc_irq_enabled(self.enabled);
    }
}

/// Clear stale status, acknowledge, enable the source, open the gate
fn arm_source(bus: &mut impl RegisterBus, open_gate: bool) {
    bus.asc_read(asc::FIFO_IRQ_STATUS);
    bus.ack_asc_irq();
    bus.set_asc_irq_enabled(true);
    if open_gate {
        bus.asc_write(asc::IRQ_GATE, 0);
    }
}

/// Unmasked wait that stops early once the handler has tripped
fn wait_tracking<P: Platform>(
    p: &mut P,
    ticks: u32,
    config: &ProbeConfig,
    cell: &ExchangeCell,
    sampler: &mut RateSampler,
    mut done: impl FnMut(&ExchangeCell) -> bool,
) {
    let mut deadline = Deadline::start(p, ticks, config.poll_iteration_ceiling);
    while let Some(tick) = deadline.poll(p) {
        sampler.sample(tick, cell.total());
        if cell.tripped() || done(cell) {
            break;
        }
    }
}

// ============================================================================
// Idle
// ============================================================================

pub fn idle_irq<P: Platform>(platform: &mut P, config: &ProbeConfig, report: &mut Report) {
    report.interrupts.idle = observe_idle(platform, config, false);
}

pub fn idle_irq_gated<P: Platform>(platform: &mut P, config: &ProbeConfig, report: &mut Report) {
    report.interrupts.idle_gated = observe_idle(platform, config, true);
}

fn observe_idle<P: Platform>(p: &mut P, config: &ProbeConfig, open_gate: bool) -> IdleIrqRecord {
    log::debug!("idle interrupt probe (gate opened: {})", open_gate);

    let cell = ExchangeCell::new();
    let threshold = config.flood_threshold;

    let token = p.enter();
    cell.arm(threshold, 0);
    // SAFETY: masked; `cell` outlives the restore at the end of this function
    let saved = unsafe { SavedIrqPath::install(p, exchange::idle_handler, &cell, open_gate) };
    arm_source(p, open_gate);
    // Sampling starts before the unmask so a flood that owns the CPU
    // lands in the first interval
    let mut sampler = RateSampler::new(p.now(), 0);
    p.exit(token);

    let immediate = cell.total();
    wait_tracking(p, config.idle_wait_ticks, config, &cell, &mut sampler, |_| false);

    let token = p.enter();
    let count = cell.total();
    let mut record = IdleIrqRecord {
        tested: true,
        count,
        immediate,
        fires_immediately: count > 0,
        floods: cell.tripped(),
        takes_over_cpu: immediate >= threshold,
        max_delta_per_tick: sampler.finish(count),
        rearm: None,
    };
    p.exit(token);

    if open_gate && config.rearm_phase && count > 0 {
        record.rearm = Some(rearm_gate(p, config, &cell));
    }

    let token = p.enter();
    saved.restore(p);
    p.exit(token);

    if record.floods {
        log::warn!(
            "idle interrupt flood (gate opened: {}): contained at {} interrupts",
            open_gate,
            count
        );
    }
    log::info!(
        "idle interrupts (gate opened: {}): {} taken ({} before first poll), takes-over={} peak {}/tick",
        open_gate,
        record.count,
        record.immediate,
        record.takes_over_cpu,
        record.max_delta_per_tick
    );
    record
}

/// Close the gate and check for silence, then reopen it and check for a re-fire
fn rearm_gate<P: Platform>(p: &mut P, config: &ProbeConfig, cell: &ExchangeCell) -> RearmRecord {
    let token = p.enter();
    p.asc_write(asc::IRQ_GATE, 1);
    cell.arm(config.flood_threshold, 0);
    arm_source(p, false);
    p.exit(token);

    let mut sampler = RateSampler::new(p.now(), 0);
    wait_tracking(p, config.rearm_wait_ticks, config, cell, &mut sampler, |_| false);
    let silent_while_gated = cell.total() == 0;

    let token = p.enter();
    p.asc_write(asc::IRQ_GATE, 0);
    p.exit(token);

    wait_tracking(p, config.rearm_wait_ticks, config, cell, &mut sampler, |_| false);

    let token = p.enter();
    let refires_when_opened = cell.total() > 0;
    p.exit(token);

    log::debug!(
        "gate re-arm: silent while closed={}, re-fires when opened={}",
        silent_while_gated,
        refires_when_opened
    );
    RearmRecord {
        silent_while_gated,
        refires_when_opened,
    }
}

// ============================================================================
// FIFO
// ============================================================================

fn fifo_irq_mode(report: &Report) -> ChannelMode {
    if report.registers.should_test_stereo {
        ChannelMode::Stereo
    } else {
        ChannelMode::Mono
    }
}

/// Channel whose flags the masked FIFO test validated, B first
pub fn select_channel(report: &Report) -> Option<Channel> {
    let fifo = report.fifo(fifo_irq_mode(report));
    let preference = [Channel::B, Channel::A];
    preference
        .into_iter()
        .find(|&channel| fifo.channel(channel).fully_validated())
        .or_else(|| {
            preference
                .into_iter()
                .find(|&channel| fifo.channel(channel).trustworthy())
        })
}

pub fn fifo_irq_applies(report: &Report) -> bool {
    select_channel(report).is_some()
}

pub fn fifo_irq<P: Platform>(platform: &mut P, config: &ProbeConfig, report: &mut Report) {
    let Some(channel) = select_channel(report) else {
        log::warn!("FIFO interrupt probe: no trustworthy channel");
        return;
    };
    let mode = fifo_irq_mode(report);
    let open_gate = report.registers.irq_gate_exists;
    let check_empty = !report.interrupts.idle_for(open_gate).floods;

    let mut options = HandlerOptions::for_channel(channel);
    if open_gate && report.interrupts.idle_gated.floods {
        options |= HandlerOptions::CLOSE_GATE_ON_HALF_EMPTY;
    }

    log::debug!(
        "FIFO interrupt probe: {:?} channel {:?}, gate opened {}, empty phase {}",
        mode,
        channel,
        open_gate,
        check_empty
    );

    let record = FifoIrqRecord {
        tested: true,
        channel: Some(channel),
        mode: Some(mode),
        gate_opened: open_gate,
        checked_empty: check_empty,
        ..FifoIrqRecord::default()
    };
    report.interrupts.fifo = run_fifo_irq(platform, config, record, options);

    let record = &report.interrupts.fifo;
    if record.floods {
        log::warn!("FIFO interrupt flood contained: {:?}", record.counts);
    }
    log::info!(
        "FIFO interrupts: full={} half-empty={} empty={} other={} (too soon: half-empty={} empty={})",
        record.counts.full,
        record.counts.half_empty,
        record.counts.empty,
        record.counts.other,
        record.half_empty_too_soon,
        record.empty_too_soon
    );
}

fn run_fifo_irq<P: Platform>(
    p: &mut P,
    config: &ProbeConfig,
    mut record: FifoIrqRecord,
    options: HandlerOptions,
) -> FifoIrqRecord {
    let mode = record.mode.unwrap_or(ChannelMode::Mono);
    let cell = ExchangeCell::new();

    // Masked: preload past half-full, then arm
    let token = p.enter();
    let channel_config = SavedChannelConfig::save(p);
    cell.arm(config.flood_threshold, options.bits());
    // SAFETY: masked; `cell` outlives the restore at the end of this function
    let saved = unsafe { SavedIrqPath::install(p, exchange::fifo_handler, &cell, record.gate_opened) };
    channel_config.start_fifo(p, mode);
    for i in 0..config.irq_prime_samples {
        write_sample(p, mode, i as u8);
    }
    arm_source(p, record.gate_opened);
    let mut sampler = RateSampler::new(p.now(), 0);
    p.exit(token);

    // Keep writing until the chip says "full"
    for i in 0..config.fill_burst {
        sampler.sample(p.now(), cell.total());
        if cell.slot(Bucket::Full.slot()) > 0 || cell.tripped() {
            break;
        }
        write_sample(p, mode, i as u8);
    }

    let early = BucketCounts::from(&cell);
    record.half_empty_too_soon = early.half_empty > 0;
    record.empty_too_soon = early.empty > 0;

    let half_empty_base = cell.slot(Bucket::HalfEmpty.slot());
    wait_tracking(p, config.drain_wait_ticks, config, &cell, &mut sampler, |cell| {
        cell.slot(Bucket::HalfEmpty.slot()) > half_empty_base
    });
    if cell.slot(Bucket::HalfEmpty.slot()) > half_empty_base && cell.slot(Bucket::Empty.slot()) > 0 {
        record.empty_too_soon = true;
    }

    if record.checked_empty {
        let empty_base = cell.slot(Bucket::Empty.slot());
        wait_tracking(p, config.drain_wait_ticks, config, &cell, &mut sampler, |cell| {
            cell.slot(Bucket::Empty.slot()) > empty_base
        });
    }

    let token = p.enter();
    record.counts = BucketCounts::from(&cell);
    record.floods = cell.tripped();
    record.max_delta_per_tick = sampler.finish(cell.total());
    saved.restore(p);
    channel_config.restore(p);
    p.exit(token);

    record
}
