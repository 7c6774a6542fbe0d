use crate::buffer::{BlockId, DeviceId};

/// Synchronous block device driver.
///
/// Both calls block until the transfer is complete and operate on exactly one
/// block-sized payload.
pub trait BlockDevice {
    /// # Errors
    /// Returns a [`DeviceError`] if the transfer failed.
    fn read_block(&self, id: BlockId, data: &mut [u8]) -> Result<(), DeviceError>;

    /// # Errors
    /// Returns a [`DeviceError`] if the transfer failed.
    fn write_block(&self, id: BlockId, data: &[u8]) -> Result<(), DeviceError>;
}

impl<D: BlockDevice + ?Sized> BlockDevice for &D {
    fn read_block(&self, id: BlockId, data: &mut [u8]) -> Result<(), DeviceError> {
        (**self).read_block(id, data)
    }

    fn write_block(&self, id: BlockId, data: &[u8]) -> Result<(), DeviceError> {
        (**self).write_block(id, data)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    #[error("no such device: {0}")]
    NoDevice(DeviceId),
    #[error("block {0} out of range")]
    OutOfRange(BlockId),
    #[error("I/O error on block {0}")]
    Io(BlockId),
}
