//! Tick counter and machine identification

use core::fmt;

/// Nominal tick rate of the platform vertical-blanking counter, in millihertz
pub const TICK_RATE_MILLIHZ: u32 = 60_150;

/// Free-running tick counter
pub trait TickSource {
    /// Current tick count; wraps at `u32::MAX`
    fn now(&mut self) -> u32;

    /// Ticks elapsed since `start`, tolerant of wraparound
    fn ticks_since(&mut self, start: u32) -> u32 {
        self.now().wrapping_sub(start)
    }
}

/// Host system-software version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SystemVersion {
    pub major: u8,
    pub minor: u8,
    pub bugfix: u8,
}

impl SystemVersion {
    pub const fn new(major: u8, minor: u8, bugfix: u8) -> Self {
        Self { major, minor, bugfix }
    }

    /// Decode the packed BCD form (`0x0755` is 7.5.5)
    pub const fn from_bcd(raw: u16) -> Self {
        Self {
            major: (((raw >> 12) & 0x0F) * 10 + ((raw >> 8) & 0x0F)) as u8,
            minor: ((raw >> 4) & 0x0F) as u8,
            bugfix: (raw & 0x0F) as u8,
        }
    }
}

impl fmt::Display for SystemVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.bugfix)
    }
}

/// Static facts about the host machine
pub trait MachineInfo {
    /// Platform identifier byte (BoxFlag)
    fn box_flag(&mut self) -> u8;

    fn system_version(&mut self) -> SystemVersion;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Wrapping(u32);

    impl TickSource for Wrapping {
        fn now(&mut self) -> u32 {
            self.0
        }
    }

    #[test]
    fn test_bcd_version() {
        assert_eq!(SystemVersion::from_bcd(0x0755), SystemVersion::new(7, 5, 5));
        assert_eq!(SystemVersion::from_bcd(0x0710), SystemVersion::new(7, 1, 0));
        assert_eq!(SystemVersion::from_bcd(0x1004), SystemVersion::new(10, 0, 4));
    }

    #[test]
    fn test_ticks_since_wraps() {
        let mut ticks = Wrapping(5);
        assert_eq!(ticks.ticks_since(u32::MAX - 4), 10);
    }
}
