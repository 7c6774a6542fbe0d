//! # Interrupt masking
//!
//! On a single CPU the only way to make a read-modify-write of shared kernel
//! state atomic is to keep interrupt handlers from running in the middle of
//! it. [`IrqGuard`] masks interrupts for its lifetime and restores the
//! previous state on drop, so critical sections nest.
//!
//! ## Platform
//!
//! On bare-metal `x86_64` (`target_os = "none"`) the guard uses `cli`/`sti`
//! and reads `IF` (bit 9 of `RFLAGS`) via `pushfq/pop`. On hosted targets
//! there are no interrupts to mask; a single emulated `IF` flag stands in for
//! the CPU flag so the same code runs under `cargo test`.
//!
//! Critical sections must stay short and must never block. The one exception
//! is [`retry`](crate::retry), which sleeps with interrupts masked so that
//! the check and the transition to sleeping are atomic; the guard is dropped,
//! and the caller's state restored, once the sleeper runs again and its
//! attempt completes.

use crate::spin_lock::{SpinLock, SpinLockGuard};
use core::ops::{Deref, DerefMut};

#[cfg(all(target_arch = "x86_64", target_os = "none"))]
mod cpu {
    const RFLAGS_IF: u64 = 1 << 9;

    /// Returns the current `RFLAGS` value (via `pushfq/pop`).
    #[inline]
    fn rflags() -> u64 {
        let r: u64;
        unsafe { core::arch::asm!("pushfq; pop {}", out(reg) r, options(nostack, preserves_flags)) }
        r
    }

    #[inline]
    pub fn enabled() -> bool {
        rflags() & RFLAGS_IF != 0
    }

    /// Masks interrupts, returning whether they were enabled before.
    #[inline]
    pub fn disable() -> bool {
        let was = enabled();
        if was {
            unsafe { core::arch::asm!("cli", options(nomem, nostack, preserves_flags)) }
        }
        was
    }

    #[inline]
    pub fn enable() {
        unsafe { core::arch::asm!("sti", options(nomem, nostack, preserves_flags)) }
    }
}

#[cfg(not(all(target_arch = "x86_64", target_os = "none")))]
mod cpu {
    use core::sync::atomic::{AtomicBool, Ordering};

    /// Emulated interrupt-enable flag of the one simulated CPU.
    static IF: AtomicBool = AtomicBool::new(true);

    #[inline]
    pub fn enabled() -> bool {
        IF.load(Ordering::Acquire)
    }

    #[inline]
    pub fn disable() -> bool {
        IF.swap(false, Ordering::AcqRel)
    }

    #[inline]
    pub fn enable() {
        IF.store(true, Ordering::Release);
    }
}

/// Whether interrupts are currently enabled.
#[inline]
#[must_use]
pub fn enabled() -> bool {
    cpu::enabled()
}

/// RAII guard that disables interrupts on creation and restores them on drop.
///
/// Interrupts are re-enabled on drop **only** if they were enabled when the
/// guard was created, so guards nest without unmasking early.
///
/// ```
/// use kernel_sync::irq::{self, IrqGuard};
///
/// {
///     let _outer = IrqGuard::new();
///     {
///         let _inner = IrqGuard::new();
///     }
///     // still masked: the inner guard found interrupts already disabled
///     assert!(!irq::enabled());
/// }
/// ```
#[must_use = "interrupts are restored as soon as the guard is dropped"]
pub struct IrqGuard {
    were_enabled: bool,
}

impl Default for IrqGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl IrqGuard {
    #[inline]
    pub fn new() -> Self {
        Self {
            were_enabled: cpu::disable(),
        }
    }
}

impl Drop for IrqGuard {
    fn drop(&mut self) {
        if self.were_enabled {
            cpu::enable();
        }
    }
}

/// Runs `f` with interrupts masked.
#[inline]
pub fn without_interrupts<R>(f: impl FnOnce() -> R) -> R {
    let _irq = IrqGuard::new();
    f()
}

/// A [`SpinLock`] guard that also keeps interrupts masked while held.
///
/// The lock is released before interrupts are restored.
pub struct IrqSpinLockGuard<'a, T> {
    // Field order is drop order: unlock first, then unmask.
    guard: SpinLockGuard<'a, T>,
    _irq: IrqGuard,
}

impl<T> SpinLock<T> {
    /// Masks interrupts, then acquires the lock.
    ///
    /// This is the kernel's critical-section primitive: every read-then-mutate
    /// of process or buffer state goes through it.
    #[inline]
    pub fn lock_irq(&self) -> IrqSpinLockGuard<'_, T> {
        let irq = IrqGuard::new();
        let guard = self.lock();
        IrqSpinLockGuard { guard, _irq: irq }
    }

    /// Closure form of [`SpinLock::lock_irq`].
    #[inline]
    pub fn with_lock_irq<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut g = self.lock_irq();
        f(&mut g)
    }
}

impl<T> Deref for IrqSpinLockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> DerefMut for IrqSpinLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}
