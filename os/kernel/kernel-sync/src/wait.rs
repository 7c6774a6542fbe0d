//! # Wait channels
//!
//! A [`WaitChannel`] is an event identity processes block on. It owns no
//! state: the set of waiters is whatever processes currently record the
//! channel as the thing they sleep on. Waking a channel moves **all** of its
//! waiters back to the ready set; it does not run any of them. Who runs next
//! is the scheduler's decision, so a woken process must re-check the
//! condition it was waiting for.
//!
//! [`retry`] packages that discipline: an attempt either completes or names
//! the channel to sleep on, and is repeated from scratch after every wakeup.
//! Interrupts stay masked from a failed attempt until the caller is recorded
//! as sleeping, so a wakeup cannot slip in between the check and the sleep.

use crate::irq::IrqGuard;
use core::num::NonZeroUsize;
use core::sync::atomic::{AtomicUsize, Ordering};
use kernel_info::Priority;

/// Opaque event identity.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct WaitChannel(NonZeroUsize);

impl WaitChannel {
    /// Allocates a channel identity distinct from every other one.
    #[must_use]
    pub fn new() -> Self {
        static NEXT: AtomicUsize = AtomicUsize::new(1);
        let id = NEXT.fetch_add(1, Ordering::Relaxed);
        Self(NonZeroUsize::new(id).unwrap_or(NonZeroUsize::MIN))
    }

    #[must_use]
    pub const fn id(self) -> usize {
        self.0.get()
    }
}

impl Default for WaitChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// The blocking primitive, provided by the scheduler.
pub trait WaitQueue {
    /// Blocks the calling process on `chan`.
    ///
    /// Returns once a [`wakeup`](Self::wakeup) has made the caller ready again
    /// **and** the scheduler has dispatched it. Nothing is guaranteed about the
    /// condition the caller waited for.
    ///
    /// A caller that checked its condition before sleeping must keep
    /// interrupts masked until this call; otherwise the wakeup it waits for
    /// may run in between and be lost.
    fn sleep(&self, chan: WaitChannel, priority: Priority);

    /// Makes every process sleeping on `chan` ready. Never switches context.
    fn wakeup(&self, chan: WaitChannel);
}

impl<Q: WaitQueue + ?Sized> WaitQueue for &Q {
    fn sleep(&self, chan: WaitChannel, priority: Priority) {
        (**self).sleep(chan, priority);
    }

    fn wakeup(&self, chan: WaitChannel) {
        (**self).wakeup(chan);
    }
}

/// Outcome of one attempt at a contended operation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Attempt<T> {
    /// The operation completed.
    Done(T),
    /// The operation must wait for `chan` and then start over.
    Wait(WaitChannel),
}

/// Runs `attempt` until it completes, sleeping on the channel each failed
/// attempt names.
///
/// Interrupts are masked for the whole loop, sleeps included; the state the
/// caller entered with is restored on return.
///
/// # Errors
/// Propagates the first error returned by `attempt`; no sleep follows it.
pub fn retry<Q, T, E>(
    queue: &Q,
    priority: Priority,
    mut attempt: impl FnMut() -> Result<Attempt<T>, E>,
) -> Result<T, E>
where
    Q: WaitQueue + ?Sized,
{
    let _irq = IrqGuard::new();
    loop {
        match attempt()? {
            Attempt::Done(value) => return Ok(value),
            Attempt::Wait(chan) => queue.sleep(chan, priority),
        }
    }
}
