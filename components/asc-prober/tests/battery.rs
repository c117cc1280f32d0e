//! Full battery against each simulated chip profile

use asc_prober::report::{AscFamily, ChannelMode, RepeatStride};
use asc_prober::{Channel, ProbeConfig, Report, Runner};
use asc_sim::{ChipProfile, SimMachine};

fn run(profile: ChipProfile) -> (SimMachine, Report) {
    let config = ProbeConfig {
        flood_threshold: 5_000,
        idle_wait_ticks: 10,
        rearm_wait_ticks: 5,
        ..ProbeConfig::default()
    };
    let runner = Runner::new(config).expect("Failed to validate config");
    let mut machine = SimMachine::new(profile).expect("Failed to build machine");
    let report = runner.run(&mut machine);
    (machine, report)
}

/// Mac II class: discrete ASC, real VIA2, no gate, quiet at idle
#[test]
fn test_classic_battery() {
    let (_, report) = run(ChipProfile::classic());

    assert_eq!(report.identity.family, AscFamily::Original);
    assert!(!report.identity.is_sonora);
    assert!(!report.registers.irq_gate_exists);
    assert_eq!(report.registers.accepts_mode, [true, true, true]);

    assert!(report.mono.tested);
    assert!(report.mono.a().fully_validated());
    assert!(report.stereo.tested);
    assert!(report.stereo.a().fully_validated());
    assert!(report.stereo.b().fully_validated());

    assert_eq!(report.decode.decode_mask, 0);
    assert_eq!(report.decode.repeat_stride, RepeatStride::Uniform);
    assert!(report.decode.mirror.ok());

    assert!(report.interrupts.idle.tested);
    assert_eq!(report.interrupts.idle.count, 0);
    assert!(!report.interrupts.idle_gated.tested);

    let fifo = report.interrupts.fifo;
    assert_eq!(fifo.mode, Some(ChannelMode::Stereo));
    assert_eq!(fifo.channel, Some(Channel::B));
    assert!(fifo.counts.full > 0 && fifo.counts.half_empty > 0 && fifo.counts.empty > 0);
}

/// Sonora: forced stereo, pseudo-VIA, gate that floods an idle chip
#[test]
fn test_sonora_battery() {
    let (machine, report) = run(ChipProfile::sonora());

    assert_eq!(report.identity.family, AscFamily::SonoraClass);
    assert!(report.identity.is_sonora);
    assert!(report.registers.irq_gate_exists);

    assert!(!report.mono.tested);
    assert!(report.stereo.tested);
    assert!(report.stereo.b().fully_validated());

    assert_eq!(report.decode.decode_mask, 0x1F);
    assert!(report.decode.mirror.ok());

    assert!(!report.interrupts.idle.floods);
    assert!(report.interrupts.idle_gated.floods);

    let fifo = report.interrupts.fifo;
    assert!(fifo.gate_opened);
    assert!(!fifo.checked_empty);
    assert!(fifo.counts.half_empty > 0);
    assert!(!fifo.floods);

    assert_eq!(machine.register_snapshot().asc_irq_gate, Some(1));
}

/// V8: mono only, no wavetable, one spurious interrupt on every enable
#[test]
fn test_v8_battery() {
    let (_, report) = run(ChipProfile::v8());

    assert_eq!(report.identity.family, AscFamily::IntegratedClass);
    assert!(!report.registers.accepts_mode[2]);
    assert!(report.registers.should_test_mono);
    assert!(!report.registers.should_test_stereo);

    assert!(report.mono.a().fully_validated());
    assert!(report.mono.b().full_too_soon());
    assert!(!report.stereo.tested);

    assert!(report.interrupts.idle.fires_immediately);
    assert!(!report.interrupts.idle.floods);

    let fifo = report.interrupts.fifo;
    assert_eq!(fifo.mode, Some(ChannelMode::Mono));
    assert_eq!(fifo.channel, Some(Channel::A));
    assert!(fifo.counts.other > 0);
    assert!(fifo.counts.full > 0);
    assert!(fifo.counts.empty > 0);
}

/// The rendered report covers every section
#[test]
fn test_report_renders() {
    let (_, report) = run(ChipProfile::sonora());
    let text = report.to_string();

    for heading in ["Machine", "Registers", "FIFO", "VIA2", "Interrupts"] {
        assert!(text.contains(heading), "missing {heading}");
    }
    assert!(text.contains("0xF29 present"));
    assert!(text.contains("Sonora"));
}
