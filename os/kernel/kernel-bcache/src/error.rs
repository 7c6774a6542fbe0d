use crate::buffer::BlockId;
use crate::device::DeviceError;

/// Failures of buffer cache operations.
///
/// Everything but [`CacheError::Device`] is a broken caller contract or a
/// known design gap; the kernel halts on those. Running out of free buffers
/// is not an error: the caller sleeps until one is released.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    #[error("getblk(0, 0)")]
    InvalidKey,
    #[error("no buffer slot {0}")]
    NoSuchBuffer(usize),
    #[error("freeing buffer {slot} twice")]
    DoubleRelease { slot: usize },
    #[error("dirty buffer {slot} holding {block} needs asynchronous write-back")]
    DirtyEviction { slot: usize, block: BlockId },
    #[error(transparent)]
    Device(#[from] DeviceError),
}

impl CacheError {
    /// Whether this is an unrecoverable fault rather than a device failure.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::Device(_))
    }
}
