use crate::process::Pid;

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedError {
    #[error("process table is full")]
    TableFull,
    #[error("no such process: {0}")]
    NoSuchProcess(Pid),
    #[error("niceness {0} out of range")]
    InvalidNice(i32),
    #[error("the idle process cannot exit")]
    IdleExit,
}
