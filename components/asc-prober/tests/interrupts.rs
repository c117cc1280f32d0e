//! Interrupt probes on simulated chips: idle silence, flood containment,
//! and FIFO interrupt bucketing

use asc_platform::regs::asc;
use asc_platform::RegisterBus;
use asc_prober::probes::irq::{fifo_irq, idle_irq, idle_irq_gated};
use asc_prober::{battery, Channel, ProbeConfig, Report, Runner};
use asc_prober::report::ChannelMode;
use asc_sim::{ChipProfile, IdleIrq, SimMachine};

fn quick_config() -> ProbeConfig {
    ProbeConfig {
        flood_threshold: 5_000,
        idle_wait_ticks: 10,
        rearm_wait_ticks: 5,
        ..ProbeConfig::default()
    }
}

/// Fill in everything the interrupt probes depend on
fn prepared(machine: &mut SimMachine, config: ProbeConfig) -> Report {
    let runner = Runner::new(config).expect("Failed to validate config");
    let probes = battery::<SimMachine>();
    runner.run_probes(machine, &probes[..9], Report::default())
}

/// A silent chip stays silent for the whole observation window
#[test]
fn test_silent_chip_never_interrupts() {
    let mut machine = SimMachine::new(ChipProfile::classic()).expect("Failed to build machine");
    let config = ProbeConfig::default();
    let mut report = Report::default();

    let start = machine.now_ns();
    idle_irq(&mut machine, &config, &mut report);

    let idle = report.interrupts.idle;
    assert!(idle.tested);
    assert!(!idle.fires_immediately);
    assert!(!idle.floods);
    assert_eq!(idle.count, 0);
    assert_eq!(idle.immediate, 0);
    assert_eq!(idle.max_delta_per_tick, 0);

    // Waited out the window
    let waited = machine.now_ns() - start;
    assert!(waited >= (config.idle_wait_ticks as u64 - 1) * machine.profile().tick_ns);
}

/// Interrupts that only start partway through the window still count as idle firing
#[test]
fn test_late_idle_interrupts_are_reported() {
    let mut machine = SimMachine::new(ChipProfile::classic()).expect("Failed to build machine");

    // Leave the FIFO playing out a burst so it crosses half-empty and empty later
    machine.asc_write(asc::MODE, 1);
    for i in 0..0x300u16 {
        machine.asc_write(asc::FIFO_A, i as u8);
    }

    let config = ProbeConfig::default();
    let mut report = Report::default();
    idle_irq(&mut machine, &config, &mut report);

    let idle = report.interrupts.idle;
    assert!(idle.count > 0);
    assert!(idle.immediate < idle.count);
    assert!(idle.fires_immediately);
    assert!(!idle.floods);
}

/// A source that re-fires on every acknowledgment is shut down by the handler
#[test]
fn test_flood_contained_by_handler() {
    let mut profile = ChipProfile::classic().with_idle_irq(IdleIrq::Flood);
    profile.initial_ier = 0;
    let mut machine = SimMachine::new(profile).expect("Failed to build machine");
    let config = quick_config();
    let mut report = Report::default();

    let start = machine.now_ns();
    idle_irq(&mut machine, &config, &mut report);

    let idle = report.interrupts.idle;
    assert!(idle.floods);
    assert!(idle.takes_over_cpu);
    assert!(idle.fires_immediately);
    assert_eq!(idle.count, config.flood_threshold);
    assert!(idle.max_delta_per_tick >= config.flood_threshold);

    // The wait loop noticed the trip instead of running out the window
    let waited = machine.now_ns() - start;
    assert!(waited < config.idle_wait_ticks as u64 * machine.profile().tick_ns);

    // Storm stopped at the threshold, and the path is back as it was
    assert!(machine.stats().longest_storm <= config.flood_threshold + 1);
    let snapshot = machine.register_snapshot();
    assert!(!snapshot.handler_installed);
    assert_eq!(snapshot.via2_ier, 0);
    assert!(!snapshot.masked);
}

/// Sonora floods only once its gate is opened, and the gate controls it
#[test]
fn test_sonora_gate_flood_and_rearm() {
    let mut machine = SimMachine::new(ChipProfile::sonora()).expect("Failed to build machine");
    let config = quick_config();
    let mut report = prepared(&mut machine, config);

    idle_irq(&mut machine, &config, &mut report);
    idle_irq_gated(&mut machine, &config, &mut report);

    assert_eq!(report.interrupts.idle.count, 0);
    assert!(!report.interrupts.idle.floods);

    let gated = report.interrupts.idle_gated;
    assert!(gated.floods);
    assert!(gated.takes_over_cpu);
    assert!(gated.max_delta_per_tick >= config.flood_threshold);
    let rearm = gated.rearm.expect("re-arm phase should run after a flood");
    assert!(rearm.silent_while_gated);
    assert!(rearm.refires_when_opened);

    assert_eq!(machine.register_snapshot().asc_irq_gate, Some(1));
}

/// Re-arm phase can be switched off
#[test]
fn test_rearm_phase_optional() {
    let mut machine = SimMachine::new(ChipProfile::sonora()).expect("Failed to build machine");
    let config = ProbeConfig {
        rearm_phase: false,
        ..quick_config()
    };
    let mut report = Report::default();
    idle_irq_gated(&mut machine, &config, &mut report);

    assert!(report.interrupts.idle_gated.floods);
    assert_eq!(report.interrupts.idle_gated.rearm, None);
}

/// Classic ASC interrupts on full, half-empty and empty, in that order
#[test]
fn test_classic_fifo_interrupts_in_order() {
    let mut machine = SimMachine::new(ChipProfile::classic()).expect("Failed to build machine");
    let config = quick_config();
    let mut report = prepared(&mut machine, config);
    idle_irq(&mut machine, &config, &mut report);
    fifo_irq(&mut machine, &config, &mut report);

    let fifo = report.interrupts.fifo;
    assert!(fifo.tested);
    assert_eq!(fifo.mode, Some(ChannelMode::Stereo));
    assert_eq!(fifo.channel, Some(Channel::B));
    assert!(!fifo.gate_opened);
    assert!(fifo.checked_empty);

    assert!(fifo.counts.full >= 1);
    assert!(fifo.counts.half_empty >= 1);
    assert!(fifo.counts.empty >= 1);
    assert!(!fifo.half_empty_too_soon);
    assert!(!fifo.empty_too_soon);
    assert!(!fifo.floods);

    // Deliveries during the unmasked fill count toward the peak
    assert!(fifo.max_delta_per_tick >= 1);
    assert!(fifo.max_delta_per_tick <= fifo.counts.total());
}

/// Sonora: the handler closes the gate at half-empty and the empty phase is skipped
#[test]
fn test_sonora_fifo_interrupts_skip_empty_phase() {
    let mut machine = SimMachine::new(ChipProfile::sonora()).expect("Failed to build machine");
    let config = quick_config();
    let mut report = prepared(&mut machine, config);
    idle_irq(&mut machine, &config, &mut report);
    idle_irq_gated(&mut machine, &config, &mut report);
    fifo_irq(&mut machine, &config, &mut report);

    let fifo = report.interrupts.fifo;
    assert!(fifo.tested);
    assert_eq!(fifo.channel, Some(Channel::B));
    assert!(fifo.gate_opened);
    assert!(!fifo.checked_empty);
    assert!(fifo.counts.full >= 1);
    assert!(fifo.counts.half_empty >= 1);
    assert_eq!(fifo.counts.empty, 0);
    assert!(!fifo.floods);

    let snapshot = machine.register_snapshot();
    assert_eq!(snapshot.asc_irq_gate, Some(1));
    assert_eq!(snapshot.asc_mode, 0);
    assert!(!snapshot.handler_installed);
}

/// FIFO interrupt probe is skipped without a trustworthy channel
#[test]
fn test_fifo_irq_needs_validated_channel() {
    let runner = Runner::new(quick_config()).expect("Failed to validate config");
    let mut machine = SimMachine::new(ChipProfile::classic()).expect("Failed to build machine");
    let probes = battery::<SimMachine>();

    let report = runner.run_probes(&mut machine, &probes[11..], Report::default());
    assert!(!report.interrupts.fifo.tested);
    assert_eq!(machine.stats().deliveries, 0);
}
