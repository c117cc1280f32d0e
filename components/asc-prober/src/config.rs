//! Probe tunables
//!
//! Defaults reproduce the timings the battery was calibrated against on
//! real machines. Every wait is bounded twice: by ticks, and by an
//! iteration ceiling for machines whose tick counter stops while
//! interrupts are masked.

use thiserror::Error;

/// Largest VIA2 window the decode probe can snapshot
pub const MAX_DECODE_WINDOW: u16 = 0x200;

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("flood threshold must be non-zero")]
    ZeroFloodThreshold,

    #[error("decode window {0:#x} must be a power of two no larger than 0x200")]
    DecodeWindow(u16),

    #[error("priming burst of {0} samples does not fit in the FIFO")]
    PrimingTooLarge(u16),

    #[error("priming {prime} plus fill burst {burst} samples overflows the fill counter")]
    FillOverflow { prime: u16, burst: u16 },

    #[error("{0} must be non-zero")]
    ZeroBudget(&'static str),
}

/// Tunables for one battery run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct ProbeConfig {
    /// Interrupts in one bucket before the handler shuts its source down
    pub flood_threshold: u32,

    /// Samples written before the first status check
    pub prime_samples: u16,
    /// Additional samples allowed while waiting for "full"
    pub fill_burst: u16,
    /// Samples preloaded, masked, before the FIFO interrupt probe unmasks
    pub irq_prime_samples: u16,

    /// Tick budget for each FIFO drain phase
    pub drain_wait_ticks: u32,
    /// Tick budget for the idle interrupt observation window
    pub idle_wait_ticks: u32,
    /// Tick budget for each half of the gate re-arm phase
    pub rearm_wait_ticks: u32,
    /// Hard cap on polling iterations for any single wait
    pub poll_iteration_ceiling: u32,

    /// Bytes of VIA2 address space inspected by the decode probe
    pub decode_window: u16,
    /// Attempts at a byte-identical pair of window snapshots
    pub decode_retries: u16,

    /// Re-arm the interrupt gate after the idle observation
    pub rearm_phase: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            flood_threshold: 20_000,
            prime_samples: 0x100,
            fill_burst: 0x1000,
            irq_prime_samples: 0x300,
            drain_wait_ticks: 60,
            idle_wait_ticks: 120,
            rearm_wait_ticks: 30,
            poll_iteration_ceiling: 1_000_000,
            decode_window: MAX_DECODE_WINDOW,
            decode_retries: 1000,
            rearm_phase: true,
        }
    }
}

impl ProbeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.flood_threshold == 0 {
            return Err(ConfigError::ZeroFloodThreshold);
        }

        if !self.decode_window.is_power_of_two() || self.decode_window > MAX_DECODE_WINDOW {
            return Err(ConfigError::DecodeWindow(self.decode_window));
        }

        let depth = asc_platform::regs::asc::FIFO_DEPTH;
        if self.prime_samples >= depth {
            return Err(ConfigError::PrimingTooLarge(self.prime_samples));
        }
        if self.irq_prime_samples >= depth {
            return Err(ConfigError::PrimingTooLarge(self.irq_prime_samples));
        }
        if self.prime_samples.checked_add(self.fill_burst).is_none() {
            return Err(ConfigError::FillOverflow {
                prime: self.prime_samples,
                burst: self.fill_burst,
            });
        }

        for (name, value) in [
            ("fill_burst", self.fill_burst as u32),
            ("drain_wait_ticks", self.drain_wait_ticks),
            ("idle_wait_ticks", self.idle_wait_ticks),
            ("rearm_wait_ticks", self.rearm_wait_ticks),
            ("poll_iteration_ceiling", self.poll_iteration_ceiling),
            ("decode_retries", self.decode_retries as u32),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroBudget(name));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert_eq!(ProbeConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_rejects_zero_threshold() {
        let config = ProbeConfig {
            flood_threshold: 0,
            ..ProbeConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroFloodThreshold));
    }

    #[test]
    fn test_rejects_bad_decode_window() {
        for window in [0, 0x180, 0x400] {
            let config = ProbeConfig {
                decode_window: window,
                ..ProbeConfig::default()
            };
            assert_eq!(config.validate(), Err(ConfigError::DecodeWindow(window)));
        }
    }

    #[test]
    fn test_rejects_oversized_priming() {
        let config = ProbeConfig {
            irq_prime_samples: 0x400,
            ..ProbeConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::PrimingTooLarge(0x400)));
    }

    #[test]
    fn test_rejects_fill_count_overflow() {
        let config = ProbeConfig {
            fill_burst: u16::MAX,
            ..ProbeConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::FillOverflow {
                prime: 256,
                burst: u16::MAX,
            })
        );

        let config = ProbeConfig {
            fill_burst: u16::MAX - 256,
            ..ProbeConfig::default()
        };
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_rejects_zero_budget() {
        let config = ProbeConfig {
            poll_iteration_ceiling: 0,
            ..ProbeConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroBudget("poll_iteration_ceiling"))
        );
    }
}
