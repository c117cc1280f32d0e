//! Register existence and configurability
//!
//! Each check is write, read back, compare, and always put the original
//! value back before unmasking.

use asc_platform::regs::asc::{self, Control, Mode};
use asc_platform::Platform;

use super::masked;
use crate::config::ProbeConfig;
use crate::report::Report;

/// Interrupt gate (0xF29): exists iff it round-trips both 1 and 0
pub fn irq_gate_exists<P: Platform>(platform: &mut P, _config: &ProbeConfig, report: &mut Report) {
    let (initial, reads_one, reads_zero) = masked(platform, |p| {
        let initial = p.asc_read(asc::IRQ_GATE);
        p.asc_write(asc::IRQ_GATE, 1);
        let one = p.asc_read(asc::IRQ_GATE);
        p.asc_write(asc::IRQ_GATE, 0);
        let zero = p.asc_read(asc::IRQ_GATE);
        p.asc_write(asc::IRQ_GATE, initial);
        (initial, one == 1, zero == 0)
    });

    let regs = &mut report.registers;
    regs.irq_gate_exists = reads_one && reads_zero;
    regs.irq_gate_initial = if regs.irq_gate_exists { initial } else { 0 };

    log::info!(
        "register 0xF29: {} (initial {:#04x})",
        if regs.irq_gate_exists { "present" } else { "absent" },
        initial
    );
}

/// Status register value with FIFO mode on and nothing queued
pub fn status_idle<P: Platform>(platform: &mut P, _config: &ProbeConfig, report: &mut Report) {
    let idle = masked(platform, |p| {
        let mode = p.asc_read(asc::MODE);
        p.asc_write(asc::MODE, Mode::Fifo as u8);
        // First read may clear stale bits
        p.asc_read(asc::FIFO_IRQ_STATUS);
        let idle = p.asc_read(asc::FIFO_IRQ_STATUS);
        p.asc_write(asc::MODE, mode);
        idle
    });

    report.registers.status_idle = idle;
    log::info!("register 0x804 idle: {:#04x}", idle);
}

/// Which operating modes the mode register latches
pub fn mode_register<P: Platform>(platform: &mut P, _config: &ProbeConfig, report: &mut Report) {
    let regs = &mut report.registers;
    masked(platform, |p| {
        regs.initial_mode = p.asc_read(asc::MODE);
        regs.initial_control = p.asc_read(asc::CONTROL);

        for mode in Mode::ALL {
            p.asc_write(asc::MODE, mode as u8);
            regs.accepts_mode[mode as usize] = p.asc_read(asc::MODE) == mode as u8;
        }

        p.asc_write(asc::MODE, regs.initial_mode);
    });

    log::info!(
        "mode register: initial {}, accepts off={} fifo={} wavetable={}",
        regs.initial_mode,
        regs.accepts_mode[0],
        regs.accepts_mode[1],
        regs.accepts_mode[2]
    );
}

/// Mono/stereo bit, and which channel modes the FIFO probes should use
pub fn channel_config<P: Platform>(platform: &mut P, _config: &ProbeConfig, report: &mut Report) {
    let stereo = Control::STEREO.bits();
    let (mono_ok, stereo_ok) = masked(platform, |p| {
        let control = p.asc_read(asc::CONTROL);

        p.asc_write(asc::CONTROL, control & !stereo);
        let mono_ok = p.asc_read(asc::CONTROL) & stereo == 0;

        p.asc_write(asc::CONTROL, control | stereo);
        let stereo_ok = p.asc_read(asc::CONTROL) & stereo != 0;

        p.asc_write(asc::CONTROL, control);
        (mono_ok, stereo_ok)
    });

    // Sonora leaves the stereo bit at 0 but always plays both channels
    let sonora = report.identity.is_sonora;
    let regs = &mut report.registers;
    regs.accepts_mono = mono_ok;
    regs.accepts_stereo = stereo_ok;
    regs.should_test_mono = mono_ok && !sonora;
    regs.should_test_stereo = stereo_ok || sonora;

    log::info!(
        "channel config: mono={} stereo={} -> test mono={} stereo={}",
        mono_ok,
        stereo_ok,
        regs.should_test_mono,
        regs.should_test_stereo
    );
}
