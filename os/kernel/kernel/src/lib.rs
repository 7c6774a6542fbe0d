//! # Kernel
//!
//! The explicit kernel state: one [`Scheduler`] and one [`BufferCache`],
//! created together by [`Kernel::boot`] and passed around by reference.
//! There is no ambient global state; whoever owns the `Kernel` owns every
//! process slot and every buffer.
//!
//! The buffer cache blocks through the scheduler: all cache operations
//! invoked through the `Kernel` run on behalf of the current process and
//! sleep on the scheduler's wait channels when they have to wait.
//!
//! ## Example
//!
//! ```
//! use kernel::{BlockDevice, BlockId, DeviceError, DeviceId, Kernel, KernelConfig};
//! use kernel_sched::{ContextSwitch, Pid, Signal, SignalSink};
//!
//! struct Disk;
//!
//! impl BlockDevice for Disk {
//!     fn read_block(&self, id: BlockId, data: &mut [u8]) -> Result<(), DeviceError> {
//!         data.fill(id.block as u8);
//!         Ok(())
//!     }
//!
//!     fn write_block(&self, _: BlockId, _: &[u8]) -> Result<(), DeviceError> {
//!         Ok(())
//!     }
//! }
//!
//! struct Uniprocessor;
//!
//! impl ContextSwitch for Uniprocessor {
//!     fn switch_to(&self, _: Pid, _: Pid) {}
//!     fn exit_to(&self, _: Pid, _: Pid) {}
//! }
//!
//! impl SignalSink for Uniprocessor {
//!     fn send_signal(&self, _: Pid, _: Signal) {}
//! }
//!
//! let kernel = Kernel::boot(KernelConfig::DEFAULT, Disk, Uniprocessor, Uniprocessor).unwrap();
//! let buf = kernel.bread(BlockId::new(DeviceId(1), 7)).unwrap();
//! assert_eq!(kernel.bcache().with_data(&buf, |d| d[0]).unwrap(), 7);
//! kernel.brelse(buf).unwrap();
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

mod error;
mod tracing;

pub use error::KernelError;
pub use kernel_bcache::{
    BlockDevice, BlockId, BufferCache, BufferRef, CacheError, DeviceError, DeviceId,
};
pub use kernel_info::{CacheConfig, ConfigError, Priority, SchedConfig};
pub use kernel_sched::{Pid, SchedError, Scheduler, Xorshift64};

use kernel_sched::{ContextSwitch, SignalSink, TicketSource};
use log::info;

/// Boot-time configuration of the whole kernel.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct KernelConfig {
    pub cache: CacheConfig,
    pub sched: SchedConfig,
    /// Seed of the lottery generator.
    pub seed: u64,
}

impl KernelConfig {
    pub const DEFAULT: Self = Self {
        cache: CacheConfig::DEFAULT,
        sched: SchedConfig::DEFAULT,
        seed: 0x2545_f491_4f6c_dd1d,
    };

    /// # Errors
    /// Returns the first violated invariant of either subsystem.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if let Err(e) = self.cache.validate() {
            return Err(e);
        }
        self.sched.validate()
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Scheduler and buffer cache of one machine.
pub struct Kernel<D, C, S, R = Xorshift64> {
    sched: Scheduler<C, S, R>,
    bcache: BufferCache<D>,
}

impl<D, C, S> Kernel<D, C, S, Xorshift64>
where
    D: BlockDevice,
    C: ContextSwitch,
    S: SignalSink,
{
    /// Brings up the kernel with the lottery seeded from `config.seed`.
    ///
    /// # Errors
    /// [`KernelError::Config`] if `config` is inconsistent.
    pub fn boot(config: KernelConfig, device: D, switch: C, signals: S) -> Result<Self, KernelError> {
        Self::boot_with(config, device, switch, signals, Xorshift64::new(config.seed))
    }
}

impl<D, C, S, R> Kernel<D, C, S, R>
where
    D: BlockDevice,
    C: ContextSwitch,
    S: SignalSink,
    R: TicketSource,
{
    /// Brings up the kernel with an explicit ticket source. The caller becomes
    /// the idle process.
    ///
    /// # Errors
    /// [`KernelError::Config`] if `config` is inconsistent.
    pub fn boot_with(
        config: KernelConfig,
        device: D,
        switch: C,
        signals: S,
        rng: R,
    ) -> Result<Self, KernelError> {
        config.validate()?;
        tracing::trace_config(&config);

        let bcache = BufferCache::new(config.cache, device)?;
        let sched = Scheduler::new(config.sched, switch, signals, rng)?;
        info!("kernel: up");
        Ok(Self { sched, bcache })
    }

    #[must_use]
    pub const fn sched(&self) -> &Scheduler<C, S, R> {
        &self.sched
    }

    #[must_use]
    pub const fn bcache(&self) -> &BufferCache<D> {
        &self.bcache
    }

    /// Clock interrupt handler. Preempts the current process when its
    /// quantum runs out; returns whether it did.
    pub fn clock(&self) -> bool {
        let expired = self.sched.tick();
        if expired {
            self.sched.yield_now();
        }
        expired
    }

    /// See [`BufferCache::getblk`].
    ///
    /// # Errors
    /// See [`BufferCache::getblk`].
    pub fn getblk(&self, id: BlockId) -> Result<BufferRef, KernelError> {
        Ok(self.bcache.getblk(&self.sched, id)?)
    }

    /// See [`BufferCache::bread`].
    ///
    /// # Errors
    /// See [`BufferCache::bread`].
    pub fn bread(&self, id: BlockId) -> Result<BufferRef, KernelError> {
        Ok(self.bcache.bread(&self.sched, id)?)
    }

    /// See [`BufferCache::brelse`].
    ///
    /// # Errors
    /// See [`BufferCache::brelse`].
    pub fn brelse(&self, buf: BufferRef) -> Result<(), KernelError> {
        Ok(self.bcache.brelse(&self.sched, buf)?)
    }

    /// See [`BufferCache::bwrite`].
    ///
    /// # Errors
    /// See [`BufferCache::bwrite`].
    pub fn bwrite(&self, buf: &BufferRef) -> Result<(), KernelError> {
        Ok(self.bcache.bwrite(buf)?)
    }

    /// See [`BufferCache::blklock`].
    ///
    /// # Errors
    /// See [`BufferCache::blklock`].
    pub fn blklock(&self, buf: &BufferRef) -> Result<(), KernelError> {
        Ok(self.bcache.blklock(&self.sched, buf)?)
    }

    /// See [`BufferCache::blkunlock`].
    ///
    /// # Errors
    /// See [`BufferCache::blkunlock`].
    pub fn blkunlock(&self, buf: &BufferRef) -> Result<(), KernelError> {
        Ok(self.bcache.blkunlock(&self.sched, buf)?)
    }

    /// See [`BufferCache::bsync`].
    ///
    /// # Errors
    /// See [`BufferCache::bsync`].
    pub fn bsync(&self) -> Result<(), KernelError> {
        Ok(self.bcache.bsync(&self.sched)?)
    }
}
