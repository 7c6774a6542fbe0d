use crate::process::{Pid, Process, ProcessState};
use alloc::vec::Vec;

/// Fixed-size process table. Slot 0 belongs to the idle process.
pub(crate) struct ProcessTable {
    procs: Vec<Process>,
}

impl ProcessTable {
    /// Creates a table of `nr_procs` slots with the idle process running.
    pub(crate) fn new(nr_procs: usize) -> Self {
        let mut procs = alloc::vec![Process::UNUSED; nr_procs];
        procs[Pid::IDLE.index()].state = ProcessState::Running;
        Self { procs }
    }

    pub(crate) fn get(&self, pid: Pid) -> Option<&Process> {
        self.procs.get(pid.index()).filter(|p| p.is_valid())
    }

    pub(crate) fn get_mut(&mut self, pid: Pid) -> Option<&mut Process> {
        self.procs.get_mut(pid.index()).filter(|p| p.is_valid())
    }

    /// Claims the first free slot after idle.
    pub(crate) fn alloc(&mut self) -> Option<(Pid, &mut Process)> {
        self.procs
            .iter_mut()
            .enumerate()
            .skip(1)
            .find(|(_, p)| !p.is_valid())
            .map(|(i, p)| (Pid::new(i), p))
    }

    /// Every slot, idle included.
    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (Pid, &mut Process)> {
        self.procs
            .iter_mut()
            .enumerate()
            .map(|(i, p)| (Pid::new(i), p))
    }

    /// Slots eligible for the lottery and the alarm scan: everything but idle.
    pub(crate) fn user_mut(&mut self) -> impl Iterator<Item = (Pid, &mut Process)> {
        self.iter_mut().skip(1)
    }

    /// `(pid, weight)` of every ready non-idle process, in table order.
    pub(crate) fn entrants(&self) -> impl Iterator<Item = (Pid, u64)> + '_ {
        self.procs
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, p)| p.state == ProcessState::Ready)
            .map(|(i, p)| (Pid::new(i), p.weight()))
    }

    /// Number of valid processes other than idle.
    pub(crate) fn live(&self) -> usize {
        self.procs.iter().skip(1).filter(|p| p.is_valid()).count()
    }
}
