//! Battery runner

use asc_platform::Platform;

use crate::config::{ConfigError, ProbeConfig};
use crate::probes::{battery, Probe};
use crate::report::Report;

/// Runs the battery once, in order, against one machine
///
/// No retries and no abort: a probe that finds nothing leaves its report
/// fields at their defaults and the next probe runs.
#[derive(Debug, Clone, Copy)]
pub struct Runner {
    config: ProbeConfig,
}

impl Default for Runner {
    /// The calibrated defaults always validate
    fn default() -> Self {
        Self {
            config: ProbeConfig::default(),
        }
    }
}

impl Runner {
    /// Only validated configurations are accepted
    pub fn new(config: ProbeConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Run the full battery into a fresh report
    pub fn run<P: Platform>(&self, platform: &mut P) -> Report {
        self.run_with(platform, Report::default())
    }

    /// Run the full battery on top of a partially filled report
    pub fn run_with<P: Platform>(&self, platform: &mut P, report: Report) -> Report {
        self.run_probes(platform, &battery::<P>(), report)
    }

    /// Run an arbitrary probe list, in order
    pub fn run_probes<P: Platform>(
        &self,
        platform: &mut P,
        probes: &[Probe<P>],
        mut report: Report,
    ) -> Report {
        log::info!(
            "running {} probes ({} backend)",
            probes.len(),
            asc_platform::config::platform_mode()
        );

        for probe in probes {
            if !(probe.applies)(&report) {
                log::warn!("{}: skipped, precondition not met", probe.name);
                continue;
            }
            log::debug!("{}: start", probe.name);
            (probe.run)(platform, &self.config, &mut report);
        }

        report
    }
}
