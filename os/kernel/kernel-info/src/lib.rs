//! # Kernel Configuration
//!
//! Compile- and boot-time constants shared by the block buffer cache and the
//! process scheduler, together with the checks that keep them consistent.
//!
//! Nothing in here is runtime-mutable. A configuration is chosen once, handed
//! to the subsystem constructors and validated there; the built-in defaults
//! are additionally validated at compile time.
//!
//! ## Modules
//!
//! * [`cache`]: buffer pool size, hash table size, block size and the
//!   metadata reservation rule.
//! * [`sched`]: quantum length, ticket normalization, nice range and the
//!   sleep priorities used by kernel subsystems.
//!
//! ## Example
//!
//! ```
//! use kernel_info::{CacheConfig, ConfigError};
//!
//! let cfg = CacheConfig { nr_buffers: 1024, ..CacheConfig::DEFAULT };
//! assert_eq!(
//!     cfg.validate(),
//!     Err(ConfigError::TooManyBuffers { requested: 1024, max: 512 })
//! );
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

pub mod cache;
pub mod sched;

pub use cache::{CacheConfig, MAX_BUFFERS};
pub use sched::{Priority, SchedConfig};

/// A configuration invariant was violated.
///
/// These are configuration errors detected before the subsystems start, never
/// runtime faults.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("too many buffers: {requested} requested, at most {max} supported")]
    TooManyBuffers { requested: usize, max: usize },
    #[error("buffer pool must hold at least one buffer")]
    EmptyPool,
    #[error("buffer hash table must have at least one chain")]
    EmptyHashTable,
    #[error("block size must be non-zero")]
    ZeroBlockSize,
    #[error("disk too small: {reserved} metadata blocks exceed 1/16 of the pool ({limit})")]
    MetadataTooLarge { reserved: usize, limit: usize },
    #[error("process table must hold the idle process and at least one other")]
    TooFewProcesses,
    #[error("quantum must be at least one tick")]
    ZeroQuantum,
    #[error("normalization {normalization} leaves no tickets at user priority and maximum nice")]
    NormalizationTooSmall { normalization: i32 },
}
