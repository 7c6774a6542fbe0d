//! # Block Buffer Cache
//!
//! A fixed pool of block-sized buffers that sits between file-system code and
//! the block device driver.
//!
//! * Every buffer holds at most one `(device, block)` pair; no two buffers
//!   ever hold the same pair.
//! * Buffers are found through a hash table of chains indexed by
//!   `(device ^ block) % chains`.
//! * Unreferenced buffers sit on a free list in eviction order. Released clean
//!   buffers go to the head and are recycled first; released dirty buffers go
//!   to the tail and stay cached longest.
//! * A referenced buffer is on no free list; an unreferenced one is on exactly
//!   one position of it.
//!
//! Callers never see pointers into the pool. [`BufferCache::getblk`] and
//! [`BufferCache::bread`] hand out a [`BufferRef`], which must be given back
//! to [`BufferCache::brelse`]. Payload access goes through
//! [`BufferCache::with_data`] and [`BufferCache::with_data_mut`].
//!
//! ## Waiting
//!
//! All bookkeeping happens inside the interrupt-masked critical section of
//! the cache. When an operation cannot proceed, because the buffer it wants is
//! locked or because no buffer is free, it sleeps on the process scheduler's
//! [`WaitQueue`](kernel_sync::WaitQueue) and starts over after being woken.
//!
//! ## Example
//!
//! ```
//! use kernel_bcache::{BlockDevice, BlockId, BufferCache, DeviceError, DeviceId};
//! use kernel_info::{CacheConfig, Priority};
//! use kernel_sync::{WaitChannel, WaitQueue};
//!
//! struct Zeroes;
//!
//! impl BlockDevice for Zeroes {
//!     fn read_block(&self, _: BlockId, data: &mut [u8]) -> Result<(), DeviceError> {
//!         data.fill(0);
//!         Ok(())
//!     }
//!
//!     fn write_block(&self, _: BlockId, _: &[u8]) -> Result<(), DeviceError> {
//!         Ok(())
//!     }
//! }
//!
//! struct NeverBlocks;
//!
//! impl WaitQueue for NeverBlocks {
//!     fn sleep(&self, _: WaitChannel, _: Priority) {
//!         unreachable!("single caller never waits")
//!     }
//!
//!     fn wakeup(&self, _: WaitChannel) {}
//! }
//!
//! let cache = BufferCache::new(CacheConfig::DEFAULT, Zeroes).unwrap();
//! let buf = cache.bread(&NeverBlocks, BlockId::new(DeviceId(1), 42)).unwrap();
//! assert!(cache.info(&buf).unwrap().flags.valid());
//! cache.brelse(&NeverBlocks, buf).unwrap();
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

extern crate alloc;

mod buffer;
mod cache;
mod device;
mod error;
mod links;

pub use buffer::{BlockId, BufferFlags, BufferInfo, BufferRef, DeviceId};
pub use cache::BufferCache;
pub use device::{BlockDevice, DeviceError};
pub use error::CacheError;
