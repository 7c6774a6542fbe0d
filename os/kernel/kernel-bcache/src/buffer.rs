use bitfield_struct::bitfield;
use core::fmt;

/// Device number.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct DeviceId(pub u32);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a cached block: device and block number.
///
/// `(0, 0)` is reserved as the "no block" key and is never looked up.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct BlockId {
    pub dev: DeviceId,
    pub block: u32,
}

impl BlockId {
    pub const SENTINEL: Self = Self::new(DeviceId(0), 0);

    #[must_use]
    pub const fn new(dev: DeviceId, block: u32) -> Self {
        Self { dev, block }
    }

    #[must_use]
    pub const fn is_sentinel(self) -> bool {
        self.dev.0 == 0 && self.block == 0
    }

    /// Hash chain index in a table of `buckets` chains.
    #[must_use]
    pub const fn bucket(self, buckets: usize) -> usize {
        (self.dev.0 ^ self.block) as usize % buckets
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.dev, self.block)
    }
}

/// Buffer state bits.
#[bitfield(u8)]
pub struct BufferFlags {
    /// Payload mirrors the block on the device.
    pub valid: bool,
    /// Payload was modified and not written back yet.
    pub dirty: bool,
    /// Held by a process; waiters sleep on the buffer's channel.
    pub locked: bool,
    /// A device transfer is in flight.
    pub busy: bool,
    #[bits(4)]
    __: u8,
}

/// Handle to a referenced buffer, as returned by
/// [`BufferCache::getblk`](crate::BufferCache::getblk) and
/// [`BufferCache::bread`](crate::BufferCache::bread).
///
/// Holding a `BufferRef` means holding one reference count on its slot.
/// It is not `Clone`: [`BufferCache::brelse`](crate::BufferCache::brelse)
/// consumes it.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a buffer reference must be released with brelse"]
pub struct BufferRef {
    slot: usize,
}

impl BufferRef {
    pub(crate) const fn new(slot: usize) -> Self {
        Self { slot }
    }

    #[must_use]
    pub const fn slot(&self) -> usize {
        self.slot
    }

    pub(crate) const fn into_slot(self) -> usize {
        self.slot
    }
}

/// Snapshot of one buffer's bookkeeping.
#[derive(Debug, Copy, Clone)]
pub struct BufferInfo {
    pub slot: usize,
    pub id: BlockId,
    pub count: u32,
    pub flags: BufferFlags,
}
