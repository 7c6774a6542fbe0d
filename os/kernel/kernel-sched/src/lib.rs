//! # Lottery Scheduler
//!
//! Cooperative, single-CPU process scheduling with fairness-compensated
//! lottery dispatch, and the sleep/wakeup primitive built on it.
//!
//! ## Dispatch
//!
//! Each call to [`Scheduler::yield_now`]:
//!
//! 1. puts the outgoing process back into the ready set if it is still
//!    running, crediting [compensation](lottery::compensation) for the part
//!    of its quantum it did not use,
//! 2. sums the weight of all ready processes and fires expired alarms,
//! 3. draws a ticket and picks its owner, or the idle process if nothing is
//!    ready,
//! 4. gives the winner a fresh quantum, recomputes its tickets at user
//!    priority, clears its compensation, and
//! 5. switches to it through the [`ContextSwitch`] collaborator.
//!
//! ## Blocking
//!
//! [`Scheduler`] implements [`kernel_sync::WaitQueue`]. Sleeping marks the
//! caller as blocked on a channel and dispatches; waking a channel makes all
//! its sleepers ready but runs none of them. Which one runs first is decided
//! by the next lottery, not by arrival order.
//!
//! ## Collaborators
//!
//! The scheduler does not switch stacks or deliver signals itself. Both are
//! injected: [`ContextSwitch`] transfers the CPU, [`SignalSink`] posts
//! signals, and [`TicketSource`] supplies lottery draws.

#![cfg_attr(not(any(test, doctest)), no_std)]

extern crate alloc;

mod error;
pub mod lottery;
mod process;
mod scheduler;
mod table;

use alloc::sync::Arc;

pub use error::SchedError;
pub use lottery::{TicketSource, Xorshift64};
pub use process::{Pid, Process, ProcessState};
pub use scheduler::Scheduler;

/// Signals the scheduler raises.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Signal {
    /// A child stopped or exited (`SIGCHLD`).
    Child,
    /// An alarm expired (`SIGALRM`).
    Alarm,
}

/// Signal delivery. Fire-and-forget from the scheduler's perspective.
pub trait SignalSink {
    fn send_signal(&self, pid: Pid, signal: Signal);
}

/// Transfers the CPU between processes.
pub trait ContextSwitch {
    /// Saves `from`, resumes `to`. Returns when `from` is dispatched again.
    fn switch_to(&self, from: Pid, to: Pid);

    /// Resumes `to` without saving `from`, whose slot is gone.
    fn exit_to(&self, from: Pid, to: Pid);
}

impl<T: SignalSink + ?Sized> SignalSink for Arc<T> {
    fn send_signal(&self, pid: Pid, signal: Signal) {
        (**self).send_signal(pid, signal);
    }
}

impl<T: ContextSwitch + ?Sized> ContextSwitch for Arc<T> {
    fn switch_to(&self, from: Pid, to: Pid) {
        (**self).switch_to(from, to);
    }

    fn exit_to(&self, from: Pid, to: Pid) {
        (**self).exit_to(from, to);
    }
}
