//! # Scheduling Parameters

use crate::ConfigError;

/// Sleep priority of a process.
///
/// Lower is more urgent. Kernel subsystems sleep with negative priorities,
/// user code runs at [`Priority::USER`]. The lottery recomputes a process's
/// tickets from its priority whenever it is dispatched, and dispatch always
/// resets the priority to [`Priority::USER`] first.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority(i32);

impl Priority {
    pub const IO: Self = Self(-100);
    pub const BUFFER: Self = Self(-80);
    pub const INODE: Self = Self(-60);
    pub const SUPERBLOCK: Self = Self(-40);
    pub const TTY: Self = Self(-20);
    pub const SIG: Self = Self(0);
    pub const USER: Self = Self(40);

    #[must_use]
    pub const fn new(value: i32) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn get(self) -> i32 {
        self.0
    }
}

/// Largest accepted niceness; valid values are `0..=MAX_NICE`.
pub const MAX_NICE: i32 = 39;

/// Scheduler sizing and lottery parameters.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SchedConfig {
    /// Number of process table slots, the idle process included.
    pub nr_procs: usize,
    /// Quantum length in clock ticks.
    pub quantum: u32,
    /// Ticket normalization: `tickets = normalization - priority - nice`.
    pub normalization: i32,
    /// Niceness given to newly spawned processes.
    pub default_nice: i32,
}

impl SchedConfig {
    pub const DEFAULT: Self = Self {
        nr_procs: 64,
        quantum: 50,
        normalization: 100,
        default_nice: 20,
    };

    /// Ticket base for a process with the given priority and niceness.
    ///
    /// Saturates at zero so a misconfigured table never yields negative weight.
    #[must_use]
    pub const fn tickets(&self, priority: Priority, nice: i32) -> u32 {
        let t = self.normalization - priority.get() - nice;
        if t < 0 { 0 } else { t.unsigned_abs() }
    }

    /// # Errors
    /// Returns the first violated invariant.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.nr_procs < 2 {
            return Err(ConfigError::TooFewProcesses);
        }
        if self.quantum == 0 {
            return Err(ConfigError::ZeroQuantum);
        }
        if self.tickets(Priority::USER, MAX_NICE) == 0 {
            return Err(ConfigError::NormalizationTooSmall {
                normalization: self.normalization,
            });
        }
        Ok(())
    }
}

impl Default for SchedConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

const _: () = {
    assert!(SchedConfig::DEFAULT.validate().is_ok());
    assert!(SchedConfig::DEFAULT.default_nice <= MAX_NICE);
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_user_tickets() {
        let cfg = SchedConfig::DEFAULT;
        assert_eq!(cfg.tickets(Priority::USER, cfg.default_nice), 40);
        assert_eq!(cfg.tickets(Priority::USER, 0), 60);
    }

    #[test]
    fn tickets_never_negative() {
        let cfg = SchedConfig {
            normalization: 10,
            ..SchedConfig::DEFAULT
        };
        assert_eq!(cfg.tickets(Priority::USER, 0), 0);
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::NormalizationTooSmall { normalization: 10 })
        );
    }

    #[test]
    fn kernel_priorities_are_more_urgent() {
        assert!(Priority::IO < Priority::BUFFER);
        assert!(Priority::BUFFER < Priority::USER);
    }
}
