use crate::error::SchedError;
use crate::lottery::{self, TicketSource, Xorshift64};
use crate::process::{Pid, Process, ProcessState};
use crate::table::ProcessTable;
use crate::{ContextSwitch, Signal, SignalSink};
use kernel_info::sched::MAX_NICE;
use kernel_info::{ConfigError, Priority, SchedConfig};
use kernel_sync::{SpinLock, WaitChannel, WaitQueue};
use log::{debug, info, trace};

struct SchedState<R> {
    table: ProcessTable,
    current: Pid,
    ticks: u64,
    rng: R,
}

/// The process scheduler.
///
/// Owns the process table and decides, on every [`yield_now`](Self::yield_now),
/// which ready process runs next by lottery. All table mutations happen inside
/// an interrupt-masked critical section; context switches happen after it
/// ends.
///
/// The [`SignalSink`] is invoked from inside that critical section and must
/// not call back into the scheduler.
pub struct Scheduler<C, S, R = Xorshift64> {
    config: SchedConfig,
    switch: C,
    signals: S,
    state: SpinLock<SchedState<R>>,
}

impl<C, S> Scheduler<C, S, Xorshift64>
where
    C: ContextSwitch,
    S: SignalSink,
{
    /// Creates a scheduler drawing from a [`Xorshift64`] seeded with `seed`.
    ///
    /// # Errors
    /// Returns the violated invariant if `config` is inconsistent.
    pub fn with_seed(
        config: SchedConfig,
        switch: C,
        signals: S,
        seed: u64,
    ) -> Result<Self, ConfigError> {
        Self::new(config, switch, signals, Xorshift64::new(seed))
    }
}

impl<C, S, R> Scheduler<C, S, R>
where
    C: ContextSwitch,
    S: SignalSink,
    R: TicketSource,
{
    /// Creates a scheduler whose only process is idle, currently running.
    ///
    /// # Errors
    /// Returns the violated invariant if `config` is inconsistent.
    pub fn new(config: SchedConfig, switch: C, signals: S, rng: R) -> Result<Self, ConfigError> {
        config.validate()?;
        info!(
            "pm: {} process slots, quantum {} ticks",
            config.nr_procs, config.quantum
        );
        Ok(Self {
            config,
            switch,
            signals,
            state: SpinLock::new(SchedState {
                table: ProcessTable::new(config.nr_procs),
                current: Pid::IDLE,
                ticks: 0,
                rng,
            }),
        })
    }

    #[must_use]
    pub const fn config(&self) -> &SchedConfig {
        &self.config
    }

    /// The process that owns the CPU.
    #[must_use]
    pub fn current(&self) -> Pid {
        self.state.lock_irq().current
    }

    /// Clock ticks since boot.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.state.lock_irq().ticks
    }

    /// Snapshot of a process table entry.
    #[must_use]
    pub fn info(&self, pid: Pid) -> Option<Process> {
        self.state.lock_irq().table.get(pid).copied()
    }

    /// Number of live processes besides idle.
    #[must_use]
    pub fn live(&self) -> usize {
        self.state.lock_irq().table.live()
    }

    /// Creates a ready child of the current process.
    ///
    /// # Errors
    /// [`SchedError::InvalidNice`] outside `0..=MAX_NICE`,
    /// [`SchedError::TableFull`] if no slot is free.
    pub fn spawn(&self, nice: i32) -> Result<Pid, SchedError> {
        if !(0..=MAX_NICE).contains(&nice) {
            return Err(SchedError::InvalidNice(nice));
        }
        let mut st = self.state.lock_irq();
        let parent = st.current;
        let (pid, p) = st.table.alloc().ok_or(SchedError::TableFull)?;
        *p = Process {
            state: ProcessState::Ready,
            priority: Priority::USER,
            nice,
            tickets: self.config.tickets(Priority::USER, nice),
            parent: Some(parent),
            ..Process::UNUSED
        };
        debug!("pm: spawned {pid} (parent {parent}, {} tickets)", p.tickets);
        Ok(pid)
    }

    /// Makes `pid` ready with an empty quantum.
    ///
    /// # Errors
    /// [`SchedError::NoSuchProcess`] if the slot is unused.
    pub fn sched(&self, pid: Pid) -> Result<(), SchedError> {
        let mut st = self.state.lock_irq();
        let p = st.table.get_mut(pid).ok_or(SchedError::NoSuchProcess(pid))?;
        p.make_ready();
        Ok(())
    }

    /// Stops the current process, notifies its parent and gives up the CPU.
    ///
    /// Returns once another process has resumed it and it has been dispatched.
    pub fn stop(&self) {
        {
            let mut st = self.state.lock_irq();
            let cur = st.current;
            if let Some(p) = st.table.get_mut(cur) {
                p.state = ProcessState::Stopped;
                if let Some(parent) = p.parent {
                    self.signals.send_signal(parent, Signal::Child);
                }
            }
        }
        self.yield_now();
    }

    /// Resumes a stopped process. Returns whether it was stopped.
    ///
    /// # Errors
    /// [`SchedError::NoSuchProcess`] if the slot is unused.
    pub fn resume(&self, pid: Pid) -> Result<bool, SchedError> {
        let mut st = self.state.lock_irq();
        let p = st.table.get_mut(pid).ok_or(SchedError::NoSuchProcess(pid))?;
        if p.state != ProcessState::Stopped {
            return Ok(false);
        }
        p.make_ready();
        Ok(true)
    }

    /// Schedules `SIGALRM` for `pid` once `after` more ticks have passed;
    /// `after == 0` cancels. Returns the ticks that were left on the previous
    /// alarm, or 0.
    ///
    /// # Errors
    /// [`SchedError::NoSuchProcess`] if the slot is unused.
    pub fn set_alarm(&self, pid: Pid, after: u64) -> Result<u64, SchedError> {
        let mut st = self.state.lock_irq();
        let now = st.ticks;
        let p = st.table.get_mut(pid).ok_or(SchedError::NoSuchProcess(pid))?;
        let previous = if p.alarm == 0 {
            0
        } else {
            p.alarm.saturating_sub(now)
        };
        p.alarm = if after == 0 { 0 } else { now + after };
        Ok(previous)
    }

    /// Clock interrupt: advances time and consumes one tick of the running
    /// process's quantum.
    ///
    /// Returns `true` when a non-idle process has exhausted its quantum and
    /// the caller should preempt it with [`yield_now`](Self::yield_now).
    pub fn tick(&self) -> bool {
        let mut st = self.state.lock_irq();
        st.ticks += 1;
        let cur = st.current;
        let Some(p) = st.table.get_mut(cur) else {
            return false;
        };
        if p.state != ProcessState::Running {
            return false;
        }
        p.counter = p.counter.saturating_sub(1);
        !cur.is_idle() && p.counter == 0
    }

    /// Gives up the CPU and runs the lottery.
    ///
    /// If the caller is still running it stays ready (with compensation for
    /// unused quantum) and may well win again, in which case this returns
    /// without switching.
    pub fn yield_now(&self) {
        let (from, to) = self.dispatch();
        if from != to {
            self.switch.switch_to(from, to);
        }
    }

    /// Releases the current process's slot, notifies its parent and
    /// dispatches without saving the caller's context.
    ///
    /// Children of the exiting process are orphaned.
    ///
    /// # Errors
    /// [`SchedError::IdleExit`] when called from the idle process.
    pub fn exit(&self) -> Result<(), SchedError> {
        {
            let mut st = self.state.lock_irq();
            let cur = st.current;
            if cur.is_idle() {
                return Err(SchedError::IdleExit);
            }
            for (_, p) in st.table.user_mut() {
                if p.parent == Some(cur) {
                    p.parent = None;
                }
            }
            if let Some(p) = st.table.get_mut(cur) {
                if let Some(parent) = p.parent {
                    self.signals.send_signal(parent, Signal::Child);
                }
                *p = Process::UNUSED;
            }
            debug!("pm: {cur} exited");
        }
        let (from, to) = self.dispatch();
        self.switch.exit_to(from, to);
        Ok(())
    }

    /// The dispatch decision. Returns `(outgoing, incoming)` and leaves the
    /// incoming process marked running; the caller performs the switch.
    fn dispatch(&self) -> (Pid, Pid) {
        let quantum = self.config.quantum;
        let mut guard = self.state.lock_irq();
        let st = &mut *guard;
        let from = st.current;

        if let Some(p) = st.table.get_mut(from)
            && p.state == ProcessState::Running
        {
            p.compensation = lottery::compensation(p.tickets, p.counter, quantum);
            p.make_ready();
        }

        let now = st.ticks;
        let mut total = 0u64;
        for (pid, p) in st.table.user_mut() {
            if p.state == ProcessState::Ready {
                total += p.weight();
            }
            if p.is_valid() && p.alarm != 0 && p.alarm < now {
                p.alarm = 0;
                debug!("pm: alarm expired for {pid}");
                self.signals.send_signal(pid, Signal::Alarm);
            }
        }

        let next = if total == 0 {
            Pid::IDLE
        } else {
            let draw = st.rng.draw(total);
            let next = lottery::winner(st.table.entrants(), draw).unwrap_or(Pid::IDLE);
            debug!("pm: draw {draw} of {total} tickets -> {next}");
            next
        };

        if let Some(p) = st.table.get_mut(next) {
            p.priority = Priority::USER;
            p.state = ProcessState::Running;
            p.counter = quantum;
            p.tickets = self.config.tickets(p.priority, p.nice);
            p.compensation = 0;
        }
        st.current = next;
        (from, next)
    }
}

impl<C, S, R> WaitQueue for Scheduler<C, S, R>
where
    C: ContextSwitch,
    S: SignalSink,
    R: TicketSource,
{
    /// Blocks the current process on `chan`.
    ///
    /// The idle process never truly blocks: it is the fallback of every
    /// dispatch, so it returns as soon as nothing else is ready.
    fn sleep(&self, chan: WaitChannel, priority: Priority) {
        {
            let mut st = self.state.lock_irq();
            let cur = st.current;
            if let Some(p) = st.table.get_mut(cur) {
                p.state = ProcessState::Sleeping;
                p.chan = Some(chan);
                p.priority = priority;
            }
            trace!("pm: {cur} sleeps on {}", chan.id());
        }
        self.yield_now();
    }

    fn wakeup(&self, chan: WaitChannel) {
        let mut st = self.state.lock_irq();
        for (pid, p) in st.table.iter_mut() {
            if p.state == ProcessState::Sleeping && p.chan == Some(chan) {
                p.make_ready();
                trace!("pm: {pid} woken from {}", chan.id());
            }
        }
    }
}
