//! Plain-text rendering of a [`Report`]

use core::fmt;

use crate::classify::{Channel, ChannelRecord};
use crate::report::{FifoBehavior, IdleIrqRecord, RepeatStride, Report};

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

fn fmt_channel(f: &mut fmt::Formatter<'_>, channel: Channel, record: &ChannelRecord) -> fmt::Result {
    write!(f, "    {:?}: {:?}", channel, record.state())?;
    if let Some(count) = record.fill_count() {
        write!(f, ", full after {} samples", count)?;
    }
    writeln!(f)?;
    writeln!(
        f,
        "       full too soon {}, reaches full {}, half-empty off when full {}",
        yes_no(record.full_too_soon()),
        yes_no(record.reaches_full()),
        yes_no(record.half_empty_off_when_full())
    )?;
    writeln!(
        f,
        "       half-empty turns on {}, empty off when half-empty {}, reaches empty {}",
        yes_no(record.half_empty_turns_on()),
        yes_no(record.empty_off_when_half_empty()),
        yes_no(record.reaches_empty())
    )
}

fn fmt_fifo(f: &mut fmt::Formatter<'_>, title: &str, fifo: &FifoBehavior) -> fmt::Result {
    if !fifo.tested {
        return writeln!(f, "  {}: not tested", title);
    }
    writeln!(f, "  {}:", title)?;
    for channel in Channel::BOTH {
        fmt_channel(f, channel, fifo.channel(channel))?;
    }
    Ok(())
}

fn fmt_idle(f: &mut fmt::Formatter<'_>, title: &str, idle: &IdleIrqRecord) -> fmt::Result {
    if !idle.tested {
        return writeln!(f, "  {}: not tested", title);
    }
    writeln!(
        f,
        "  {}: {} interrupts ({} before first poll), fires immediately {}, floods {}, takes over CPU {}, peak {}/tick",
        title,
        idle.count,
        idle.immediate,
        yes_no(idle.fires_immediately),
        yes_no(idle.floods),
        yes_no(idle.takes_over_cpu),
        idle.max_delta_per_tick
    )?;
    if let Some(rearm) = idle.rearm {
        writeln!(
            f,
            "    re-arm: silent while gated {}, re-fires when opened {}",
            yes_no(rearm.silent_while_gated),
            yes_no(rearm.refires_when_opened)
        )?;
    }
    Ok(())
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = &self.identity;
        writeln!(f, "Machine")?;
        writeln!(
            f,
            "  ASC version {:#04x} ({:?}{})",
            id.asc_version,
            id.family,
            if id.is_sonora { ", Sonora" } else { "" }
        )?;
        writeln!(f, "  BoxFlag {:#04x}, system {}", id.box_flag, id.system_version)?;

        let regs = &self.registers;
        writeln!(f, "Registers")?;
        if regs.irq_gate_exists {
            writeln!(f, "  0xF29 present, initial {:#04x}", regs.irq_gate_initial)?;
        } else {
            writeln!(f, "  0xF29 absent")?;
        }
        writeln!(f, "  0x804 idle {:#04x}", regs.status_idle)?;
        writeln!(
            f,
            "  mode {:#04x} initially; accepts off {}, FIFO {}, wavetable {}",
            regs.initial_mode,
            yes_no(regs.accepts_mode[0]),
            yes_no(regs.accepts_mode[1]),
            yes_no(regs.accepts_mode[2])
        )?;
        writeln!(
            f,
            "  control {:#04x} initially; mono {}, stereo {} (test mono {}, stereo {})",
            regs.initial_control,
            yes_no(regs.accepts_mono),
            yes_no(regs.accepts_stereo),
            yes_no(regs.should_test_mono),
            yes_no(regs.should_test_stereo)
        )?;

        writeln!(f, "FIFO")?;
        fmt_fifo(f, "mono", &self.mono)?;
        fmt_fifo(f, "stereo", &self.stereo)?;

        let decode = &self.decode;
        writeln!(f, "VIA2")?;
        writeln!(
            f,
            "  readback {} after {} reads, decode mask {:#06x}",
            if decode.consistent { "stable" } else { "unstable" },
            decode.attempts,
            decode.decode_mask
        )?;
        match decode.repeat_stride {
            RepeatStride::NotObserved => writeln!(f, "  no repeat in window")?,
            RepeatStride::Every(stride) => writeln!(f, "  repeats every {:#x} bytes", stride)?,
            RepeatStride::Uniform => writeln!(f, "  whole window reads one register")?,
        }
        let mirror = &decode.mirror;
        if mirror.tested {
            writeln!(
                f,
                "  enable alias 0x1C13 mirrors {:#06x}: {}",
                mirror.canonical_enable,
                yes_no(mirror.ok())
            )?;
        }

        let irq = &self.interrupts;
        writeln!(f, "Interrupts")?;
        fmt_idle(f, "idle", &irq.idle)?;
        fmt_idle(f, "idle, 0xF29 open", &irq.idle_gated)?;

        let fifo = &irq.fifo;
        if !fifo.tested {
            return writeln!(f, "  FIFO: not tested");
        }
        writeln!(
            f,
            "  FIFO ({:?}, channel {:?}{}): full {}, half-empty {}, empty {}, other {}",
            fifo.mode.unwrap_or(crate::report::ChannelMode::Mono),
            fifo.channel.unwrap_or(Channel::A),
            if fifo.gate_opened { ", 0xF29 open" } else { "" },
            fifo.counts.full,
            fifo.counts.half_empty,
            fifo.counts.empty,
            fifo.counts.other
        )?;
        writeln!(
            f,
            "    half-empty too soon {}, empty too soon {}, empty checked {}, floods {}, peak {}/tick",
            yes_no(fifo.half_empty_too_soon),
            yes_no(fifo.empty_too_soon),
            yes_no(fifo.checked_empty),
            yes_no(fifo.floods),
            fifo.max_delta_per_tick
        )
    }
}
