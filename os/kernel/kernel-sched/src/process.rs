use core::fmt;
use kernel_info::Priority;
use kernel_sync::WaitChannel;

/// Process identifier: the index of the process's slot in the table.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pid(usize);

impl Pid {
    /// The idle process. It owns slot 0, never takes part in the lottery and
    /// is dispatched whenever nothing else is ready.
    pub const IDLE: Self = Self(0);

    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }

    #[must_use]
    pub const fn is_idle(self) -> bool {
        self.0 == Self::IDLE.0
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Scheduling state of a process slot.
///
/// ```text
///           dispatch            yield / quantum
///  Ready ─────────────▶ Running ───────────────▶ Ready
///    ▲                   │   │
///    │ wakeup            │   │ stop
///    │                   ▼   ▼
///    └────────────── Sleeping  Stopped ──resume──▶ Ready
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ProcessState {
    /// Free slot.
    Unused,
    /// Runnable; holds lottery tickets.
    Ready,
    /// Owns the CPU.
    Running,
    /// Blocked on a wait channel until woken.
    Sleeping,
    /// Stopped until explicitly resumed.
    Stopped,
}

/// One process table entry.
///
/// Returned by value from [`Scheduler::info`](crate::Scheduler::info) as a
/// snapshot; the live entry is only reachable through the scheduler.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Process {
    pub state: ProcessState,
    pub priority: Priority,
    pub nice: i32,
    /// Lottery weight derived from priority and niceness.
    pub tickets: u32,
    /// Extra weight earned by giving up the CPU early; cleared on dispatch.
    pub compensation: u32,
    /// Quantum ticks left.
    pub counter: u32,
    /// Absolute tick at which `SIGALRM` is due, or 0.
    pub alarm: u64,
    pub parent: Option<Pid>,
    /// Channel the process sleeps on while [`ProcessState::Sleeping`].
    pub chan: Option<WaitChannel>,
}

impl Process {
    pub(crate) const UNUSED: Self = Self {
        state: ProcessState::Unused,
        priority: Priority::USER,
        nice: 0,
        tickets: 0,
        compensation: 0,
        counter: 0,
        alarm: 0,
        parent: None,
        chan: None,
    };

    #[must_use]
    pub const fn is_valid(&self) -> bool {
        !matches!(self.state, ProcessState::Unused)
    }

    /// Weight in the lottery: base tickets plus compensation.
    #[must_use]
    pub fn weight(&self) -> u64 {
        u64::from(self.tickets) + u64::from(self.compensation)
    }

    /// Puts the process back into the ready set with an empty quantum; it gets
    /// a fresh one only when dispatched.
    pub(crate) fn make_ready(&mut self) {
        self.state = ProcessState::Ready;
        self.counter = 0;
        self.chan = None;
    }
}
