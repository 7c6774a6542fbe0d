//! # Kernel synchronization primitives
//!
//! The kernel runs on one CPU with cooperative multitasking. Two tools keep
//! shared state consistent:
//!
//! * [`irq`] masks interrupts around short read-then-mutate sections, with
//!   [`SpinLock::lock_irq`] pairing the mask with access to the guarded data.
//! * [`wait`] defines the sleep/wakeup seam through which long waits hand the
//!   CPU to the scheduler.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod irq;
mod spin_lock;
pub mod wait;

pub use irq::{IrqGuard, IrqSpinLockGuard};
pub use spin_lock::{SpinLock, SpinLockGuard};
pub use wait::{Attempt, WaitChannel, WaitQueue, retry};
