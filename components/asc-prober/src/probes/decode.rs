//! VIA2 address decode and enable-register mirroring
//!
//! A real 6522 spreads its sixteen registers 0x200 bytes apart, so every
//! byte of the first 0x200 reads back the same register. A pseudo-VIA
//! decodes only a few low address bits and repeats its registers many
//! times inside that window. System software writes the enable register
//! through the alias 0x1C13, which lands on the right register in both
//! layouts; the mirror probe checks that it really does.

use asc_platform::regs::via2::{self, Irq};
use asc_platform::{Platform, RegisterBus};

use super::masked;
use crate::config::{ProbeConfig, MAX_DECODE_WINDOW};
use crate::report::{AddressDecode, MirrorCheck, Report, RepeatStride};

type Snapshot = [u8; MAX_DECODE_WINDOW as usize];

fn read_window(bus: &mut impl RegisterBus, window: &mut [u8]) {
    for (offset, byte) in window.iter_mut().enumerate() {
        *byte = bus.via2_read(offset as u16);
    }
}

/// Low address bits whose flip changes what a read returns
pub fn decode_mask(window: &[u8]) -> u16 {
    let len = window.len();
    let mut mask = 0u16;
    let mut bit = 1usize;
    while bit < len {
        if (0..len).any(|offset| window[offset] != window[offset ^ bit]) {
            mask |= bit as u16;
        }
        bit <<= 1;
    }
    mask
}

/// Offset of the first 32-bit word equal to word 0
///
/// Only word 0 is matched. A controller whose pattern varies across
/// sub-ranges of the window (a four-byte repeat that itself changes every
/// sixteen bytes, say) is reported by its first recurrence alone.
pub fn repeat_stride(window: &[u8]) -> RepeatStride {
    let Some(first) = window.get(..4) else {
        return RepeatStride::NotObserved;
    };

    let stride = window
        .chunks_exact(4)
        .enumerate()
        .skip(1)
        .find(|(_, word)| *word == first)
        .map(|(index, _)| (index * 4) as u16);

    match stride {
        Some(4) if window.iter().all(|&byte| byte == window[0]) => RepeatStride::Uniform,
        Some(stride) => RepeatStride::Every(stride),
        None => RepeatStride::NotObserved,
    }
}

pub fn via2_decode<P: Platform>(platform: &mut P, config: &ProbeConfig, report: &mut Report) {
    let len = config.decode_window.min(MAX_DECODE_WINDOW) as usize;
    let mut previous: Snapshot = [0; MAX_DECODE_WINDOW as usize];
    let mut current: Snapshot = [0; MAX_DECODE_WINDOW as usize];

    let (consistent, attempts) = masked(platform, |p| {
        read_window(p, &mut previous[..len]);
        let mut attempts = 1u16;
        while attempts < config.decode_retries {
            read_window(p, &mut current[..len]);
            attempts += 1;
            if current[..len] == previous[..len] {
                return (true, attempts);
            }
            previous[..len].copy_from_slice(&current[..len]);
        }
        (false, attempts)
    });

    let window = &previous[..len];
    report.decode.consistent = consistent;
    report.decode.attempts = attempts;
    report.decode.decode_mask = decode_mask(window);
    report.decode.repeat_stride = repeat_stride(window);

    if consistent {
        log::info!(
            "VIA2 decode: mask {:#06x}, repeat {:?} ({} reads)",
            report.decode.decode_mask,
            report.decode.repeat_stride,
            attempts
        );
    } else {
        log::warn!(
            "VIA2 window never read back the same twice in {} attempts; mask {:#06x} is a guess",
            attempts,
            report.decode.decode_mask
        );
    }
}

/// Canonical enable register for the decode observed
pub const fn canonical_enable(decode: &AddressDecode) -> u16 {
    if decode.decode_mask == 0 {
        via2::IER
    } else {
        via2::IER_PSEUDO
    }
}

pub fn via2_mirror<P: Platform>(platform: &mut P, _config: &ProbeConfig, report: &mut Report) {
    let canonical = canonical_enable(&report.decode);
    let asc = Irq::ASC.bits();
    let on = (Irq::SET | Irq::ASC).bits();

    let mirror = masked(platform, |p| {
        let was_enabled = p.via2_read(via2::IER_ALIAS) & asc != 0;
        let mut check = MirrorCheck {
            tested: true,
            canonical_enable: canonical,
            ..MirrorCheck::default()
        };

        check.alias_matches_canonical = p.via2_read(canonical) == p.via2_read(via2::IER_ALIAS);

        p.via2_write(via2::IER_ALIAS, on);
        check.set_via_alias_seen = p.via2_read(canonical) & asc != 0;
        p.via2_write(via2::IER_ALIAS, asc);
        check.clear_via_alias_seen = p.via2_read(canonical) & asc == 0;

        p.via2_write(canonical, on);
        check.set_via_canonical_seen = p.via2_read(via2::IER_ALIAS) & asc != 0;
        p.via2_write(canonical, asc);
        check.clear_via_canonical_seen = p.via2_read(via2::IER_ALIAS) & asc == 0;

        p.set_asc_irq_enabled(was_enabled);
        p.ack_asc_irq();
        check
    });

    report.decode.mirror = mirror;
    if mirror.ok() {
        log::info!("VIA2 enable alias mirrors {:#06x}", canonical);
    } else {
        log::warn!("VIA2 enable alias does not mirror {:#06x}: {:?}", canonical, mirror);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asc_sim::{ChipProfile, SimMachine};

    #[test]
    fn test_mask_of_uniform_window_is_zero() {
        assert_eq!(decode_mask(&[0xA5; 0x200]), 0);
    }

    #[test]
    fn test_mask_of_alternating_window() {
        let window: [u8; 16] = core::array::from_fn(|i| (i & 1) as u8);
        assert_eq!(decode_mask(&window), 0x1);

        let window: [u8; 16] = core::array::from_fn(|i| (i & 0x6) as u8);
        assert_eq!(decode_mask(&window), 0x6);
    }

    #[test]
    fn test_repeat_stride_cases() {
        assert_eq!(repeat_stride(&[7; 64]), RepeatStride::Uniform);

        let window: [u8; 64] = core::array::from_fn(|i| (i % 16) as u8);
        assert_eq!(repeat_stride(&window), RepeatStride::Every(16));

        let window: [u8; 64] = core::array::from_fn(|i| i as u8);
        assert_eq!(repeat_stride(&window), RepeatStride::NotObserved);
    }

    #[test]
    fn test_repeat_stride_reports_first_repeat_only() {
        // Four-byte repeat that changes every sixteen bytes
        let window: [u8; 64] = core::array::from_fn(|i| ((i % 4) + 10 * ((i / 16) % 2)) as u8);
        assert_eq!(repeat_stride(&window), RepeatStride::Every(4));
    }

    #[test]
    fn test_real_via_decodes_nothing_in_window() {
        let mut machine = SimMachine::new(ChipProfile::classic()).unwrap();
        let mut report = Report::default();
        via2_decode(&mut machine, &ProbeConfig::default(), &mut report);

        assert!(report.decode.consistent);
        // Noisy first reads force at least one retry
        assert!(report.decode.attempts > 2);
        assert_eq!(report.decode.decode_mask, 0);
        assert_eq!(report.decode.repeat_stride, RepeatStride::Uniform);
        assert_eq!(canonical_enable(&report.decode), via2::IER);
    }

    #[test]
    fn test_pseudo_via_decodes_low_bits() {
        let mut machine = SimMachine::new(ChipProfile::sonora()).unwrap();
        let mut report = Report::default();
        via2_decode(&mut machine, &ProbeConfig::default(), &mut report);

        assert_eq!(report.decode.attempts, 2);
        assert_eq!(report.decode.decode_mask, 0x1F);
        assert_eq!(canonical_enable(&report.decode), via2::IER_PSEUDO);
    }

    #[test]
    fn test_mirror_restores_enable_state() {
        let mut machine = SimMachine::new(ChipProfile::classic()).unwrap();
        let before = machine.register_snapshot().via2_ier;

        let mut report = Report::default();
        via2_decode(&mut machine, &ProbeConfig::default(), &mut report);
        via2_mirror(&mut machine, &ProbeConfig::default(), &mut report);

        assert!(report.decode.mirror.ok());
        assert_eq!(machine.register_snapshot().via2_ier, before);
    }
}
