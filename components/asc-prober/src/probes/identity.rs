//! Machine identity

use asc_platform::regs::asc;
use asc_platform::Platform;

use super::masked;
use crate::config::ProbeConfig;
use crate::report::{AscFamily, MachineIdentity, Report};

/// Sonora-class revisions report 0xBx
pub const fn is_sonora_version(version: u8) -> bool {
    version & 0xF0 == 0xB0
}

pub fn machine_info<P: Platform>(platform: &mut P, _config: &ProbeConfig, report: &mut Report) {
    let asc_version = masked(platform, |p| p.asc_read(asc::VERSION));

    report.identity = MachineIdentity {
        asc_version,
        family: AscFamily::from_version(asc_version),
        is_sonora: is_sonora_version(asc_version),
        box_flag: platform.box_flag(),
        system_version: platform.system_version(),
    };

    log::info!(
        "ASC version {:#04x} ({:?}), BoxFlag {:#04x}, system {}",
        asc_version,
        report.identity.family,
        report.identity.box_flag,
        report.identity.system_version
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use asc_sim::{ChipProfile, SimMachine};

    #[test]
    fn test_sonora_nibble_match() {
        assert!(is_sonora_version(0xBC));
        assert!(is_sonora_version(0xB0));
        assert!(!is_sonora_version(0xF0));
        assert!(!is_sonora_version(0xE8));
    }

    #[test]
    fn test_identity_from_simulated_sonora() {
        let mut machine = SimMachine::new(ChipProfile::sonora()).unwrap();
        let mut report = Report::default();
        machine_info(&mut machine, &ProbeConfig::default(), &mut report);

        assert_eq!(report.identity.asc_version, 0xBC);
        assert_eq!(report.identity.family, AscFamily::SonoraClass);
        assert!(report.identity.is_sonora);
        assert_eq!(report.identity.box_flag, 0x2E);
    }
}
