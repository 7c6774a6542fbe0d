use kernel_bcache::CacheError;
use kernel_info::ConfigError;
use kernel_sched::SchedError;

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KernelError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("fs: {0}")]
    Cache(#[from] CacheError),
    #[error("pm: {0}")]
    Sched(#[from] SchedError),
}

impl KernelError {
    /// Whether the kernel must halt. Device failures and process management
    /// refusals are reported to the caller instead.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        match self {
            Self::Config(_) => true,
            Self::Cache(e) => e.is_fatal(),
            Self::Sched(_) => false,
        }
    }
}
