use crate::buffer::{BlockId, BufferFlags, BufferInfo, BufferRef};
use crate::device::BlockDevice;
use crate::error::CacheError;
use crate::links::Links;
use alloc::boxed::Box;
use alloc::vec::Vec;
use kernel_info::{CacheConfig, ConfigError, Priority};
use kernel_sync::{Attempt, SpinLock, WaitChannel, WaitQueue, retry};
use log::{info, warn};

struct Slot {
    id: BlockId,
    count: u32,
    flags: BufferFlags,
    /// Processes waiting for this buffer's lock.
    chan: WaitChannel,
}

/// Bookkeeping shared by all buffers; only touched inside `lock_irq`.
struct CacheState {
    slots: Vec<Slot>,
    /// Free list: slot nodes followed by one head node.
    free: Links,
    /// Hash chains: slot nodes followed by one head node per bucket.
    hash: Links,
}

impl CacheState {
    fn free_head(&self) -> usize {
        self.slots.len()
    }

    fn bucket_head(&self, id: BlockId, buckets: usize) -> usize {
        self.slots.len() + id.bucket(buckets)
    }

    fn slot(&self, slot: usize) -> Result<&Slot, CacheError> {
        self.slots.get(slot).ok_or(CacheError::NoSuchBuffer(slot))
    }

    fn slot_mut(&mut self, slot: usize) -> Result<&mut Slot, CacheError> {
        self.slots.get_mut(slot).ok_or(CacheError::NoSuchBuffer(slot))
    }

    /// Takes a reference on `slot`, pulling it off the free list if it was
    /// unreferenced.
    fn pin(&mut self, slot: usize) {
        if self.slots[slot].count == 0 {
            self.free.unlink(slot);
        }
        self.slots[slot].count += 1;
    }
}

/// The block buffer cache.
///
/// A fixed pool of block-sized buffers indexed by a hash table of
/// `(device, block)` chains, with unreferenced buffers kept on a free list in
/// eviction order (head first). Every buffer handed out is locked and
/// referenced; its payload belongs to the lock holder.
///
/// Operations that may have to wait take the [`WaitQueue`] of the calling
/// context; waits are retried from scratch after every wakeup.
pub struct BufferCache<D> {
    config: CacheConfig,
    device: D,
    state: SpinLock<CacheState>,
    data: Vec<SpinLock<Box<[u8]>>>,
    /// Processes waiting for any buffer to become free.
    freed: WaitChannel,
}

impl<D: BlockDevice> BufferCache<D> {
    /// Sets up the pool: zeroed payloads, every buffer on the free list in
    /// slot order, every hash chain empty.
    ///
    /// # Errors
    /// Returns the violated invariant if `config` is inconsistent.
    pub fn new(config: CacheConfig, device: D) -> Result<Self, ConfigError> {
        config.validate()?;
        info!("fs: initializing the block buffer cache");

        let n = config.nr_buffers;
        let slots = (0..n)
            .map(|_| Slot {
                id: BlockId::SENTINEL,
                count: 0,
                flags: BufferFlags::new(),
                chan: WaitChannel::new(),
            })
            .collect();
        let mut free = Links::new(n + 1);
        for slot in 0..n {
            free.insert_before(n, slot);
        }
        let data = (0..n)
            .map(|_| SpinLock::new(alloc::vec![0u8; config.block_size].into_boxed_slice()))
            .collect();

        info!("fs: {n} slots in the block buffer cache");
        Ok(Self {
            config,
            device,
            state: SpinLock::new(CacheState {
                slots,
                free,
                hash: Links::new(n + config.hashtab_size),
            }),
            data,
            freed: WaitChannel::new(),
        })
    }

    #[must_use]
    pub const fn config(&self) -> &CacheConfig {
        &self.config
    }

    #[must_use]
    pub const fn device(&self) -> &D {
        &self.device
    }

    /// Returns the locked, referenced buffer for `id`, recycling the least
    /// recently released buffer on a miss. The buffer may or may not be
    /// valid.
    ///
    /// Sleeps while the buffer is locked by someone else, or while no buffer
    /// is free.
    ///
    /// # Errors
    /// [`CacheError::InvalidKey`] for `(0, 0)`; [`CacheError::DirtyEviction`]
    /// if the eviction victim holds unwritten data.
    pub fn getblk<Q>(&self, waits: &Q, id: BlockId) -> Result<BufferRef, CacheError>
    where
        Q: WaitQueue + ?Sized,
    {
        if id.is_sentinel() {
            return Err(CacheError::InvalidKey);
        }
        retry(waits, Priority::BUFFER, || self.try_getblk(id)).map(BufferRef::new)
    }

    fn try_getblk(&self, id: BlockId) -> Result<Attempt<usize>, CacheError> {
        let mut st = self.state.lock_irq();
        let head = st.bucket_head(id, self.config.hashtab_size);

        let found = st.hash.iter(head).find(|&s| st.slots[s].id == id);
        if let Some(slot) = found {
            let s = &st.slots[slot];
            if s.flags.locked() {
                return Ok(Attempt::Wait(s.chan));
            }
            st.pin(slot);
            st.slots[slot].flags.set_locked(true);
            return Ok(Attempt::Done(slot));
        }

        let free_head = st.free_head();
        let Some(victim) = st.free.first(free_head) else {
            warn!("fs: no free buffers");
            return Ok(Attempt::Wait(self.freed));
        };

        let s = &st.slots[victim];
        debug_assert!(s.count == 0 && !s.flags.locked());
        if s.flags.dirty() {
            return Err(CacheError::DirtyEviction {
                slot: victim,
                block: s.id,
            });
        }

        st.pin(victim);
        st.hash.unlink(victim);
        let s = &mut st.slots[victim];
        s.id = id;
        s.flags.set_valid(false);
        s.flags.set_locked(true);
        st.hash.insert_after(head, victim);
        Ok(Attempt::Done(victim))
    }

    /// Acquires the lock of a referenced buffer, sleeping while it is held.
    ///
    /// # Errors
    /// [`CacheError::NoSuchBuffer`] for a handle outside the pool.
    pub fn blklock<Q>(&self, waits: &Q, buf: &BufferRef) -> Result<(), CacheError>
    where
        Q: WaitQueue + ?Sized,
    {
        retry(waits, Priority::BUFFER, || {
            let mut st = self.state.lock_irq();
            let s = st.slot_mut(buf.slot())?;
            if s.flags.locked() {
                return Ok(Attempt::Wait(s.chan));
            }
            s.flags.set_locked(true);
            Ok(Attempt::Done(()))
        })
    }

    /// Releases the lock of a buffer and wakes **every** process waiting for
    /// it. The reference is kept.
    ///
    /// # Errors
    /// [`CacheError::NoSuchBuffer`] for a handle outside the pool.
    pub fn blkunlock<Q>(&self, waits: &Q, buf: &BufferRef) -> Result<(), CacheError>
    where
        Q: WaitQueue + ?Sized,
    {
        let mut st = self.state.lock_irq();
        let s = st.slot_mut(buf.slot())?;
        s.flags.set_locked(false);
        waits.wakeup(s.chan);
        Ok(())
    }

    /// Drops a reference and unlocks the buffer.
    ///
    /// On the last reference the buffer goes back on the free list: valid
    /// dirty buffers at the tail, so they stay cached longest and collect more
    /// writes, everything else at the head, to be recycled first. Processes
    /// waiting for a free buffer are woken.
    ///
    /// # Errors
    /// [`CacheError::DoubleRelease`] if the buffer has no references; nothing
    /// is modified in that case.
    pub fn brelse<Q>(&self, waits: &Q, buf: BufferRef) -> Result<(), CacheError>
    where
        Q: WaitQueue + ?Sized,
    {
        let slot = buf.into_slot();
        let mut st = self.state.lock_irq();
        let free_head = st.free_head();
        let s = st.slot_mut(slot)?;
        if s.count == 0 {
            return Err(CacheError::DoubleRelease { slot });
        }

        s.count -= 1;
        let last = s.count == 0;
        let keep_long = s.flags.valid() && s.flags.dirty();
        s.flags.set_locked(false);
        let chan = s.chan;

        if last {
            waits.wakeup(self.freed);
            if keep_long {
                st.free.insert_before(free_head, slot);
            } else {
                st.free.insert_after(free_head, slot);
            }
        }
        waits.wakeup(chan);
        Ok(())
    }

    /// Returns the locked buffer for `id`, reading it from the device unless
    /// the cached copy is valid.
    ///
    /// # Errors
    /// As [`getblk`](Self::getblk), plus [`CacheError::Device`] if the read
    /// fails; the buffer is released in that case.
    pub fn bread<Q>(&self, waits: &Q, id: BlockId) -> Result<BufferRef, CacheError>
    where
        Q: WaitQueue + ?Sized,
    {
        let buf = self.getblk(waits, id)?;
        if self.info(&buf)?.flags.valid() {
            return Ok(buf);
        }
        match self.read(&buf) {
            Ok(()) => Ok(buf),
            Err(e) => {
                self.brelse(waits, buf)?;
                Err(e)
            }
        }
    }

    /// Writes a locked buffer to its device and marks it clean. Locking and
    /// reference state are left alone.
    ///
    /// # Errors
    /// [`CacheError::Device`] if the write fails; the buffer stays dirty.
    pub fn bwrite(&self, buf: &BufferRef) -> Result<(), CacheError> {
        let id = self.begin_transfer(buf)?;
        let res = {
            let data = self.data[buf.slot()].lock();
            self.device.write_block(id, &data)
        };
        self.end_transfer(buf.slot(), |flags| {
            if res.is_ok() {
                flags.set_dirty(false);
            }
        });
        res.map_err(CacheError::from)
    }

    /// Writes every valid buffer back to its device.
    ///
    /// Each buffer is locked in turn; invalid ones are unlocked and skipped,
    /// valid ones are pinned against reuse, written and released. All buffers
    /// are visited even if a write fails.
    ///
    /// # Errors
    /// The first device failure encountered; release faults abort at once.
    pub fn bsync<Q>(&self, waits: &Q) -> Result<(), CacheError>
    where
        Q: WaitQueue + ?Sized,
    {
        let mut first_error = None;
        for slot in 0..self.config.nr_buffers {
            let pinned = retry(waits, Priority::BUFFER, || {
                let mut st = self.state.lock_irq();
                let s = &mut st.slots[slot];
                if s.flags.locked() {
                    return Ok::<_, CacheError>(Attempt::Wait(s.chan));
                }
                if !s.flags.valid() {
                    return Ok(Attempt::Done(false));
                }
                s.flags.set_locked(true);
                st.pin(slot);
                Ok(Attempt::Done(true))
            })?;
            if !pinned {
                continue;
            }

            let buf = BufferRef::new(slot);
            let res = self.bwrite(&buf);
            self.brelse(waits, buf)?;
            if let Err(e) = res {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Marks a held buffer as modified (or clean).
    ///
    /// # Errors
    /// [`CacheError::NoSuchBuffer`] for a handle outside the pool.
    pub fn set_dirty(&self, buf: &BufferRef, dirty: bool) -> Result<(), CacheError> {
        let mut st = self.state.lock_irq();
        st.slot_mut(buf.slot())?.flags.set_dirty(dirty);
        Ok(())
    }

    /// Marks a held buffer's payload as mirroring its block, for callers that
    /// fill a buffer obtained with [`getblk`](Self::getblk) without reading
    /// it first.
    ///
    /// # Errors
    /// [`CacheError::NoSuchBuffer`] for a handle outside the pool.
    pub fn set_valid(&self, buf: &BufferRef, valid: bool) -> Result<(), CacheError> {
        let mut st = self.state.lock_irq();
        st.slot_mut(buf.slot())?.flags.set_valid(valid);
        Ok(())
    }

    /// Borrows the payload of a held buffer.
    ///
    /// # Errors
    /// [`CacheError::NoSuchBuffer`] for a handle outside the pool.
    pub fn with_data<R>(&self, buf: &BufferRef, f: impl FnOnce(&[u8]) -> R) -> Result<R, CacheError> {
        let data = self
            .data
            .get(buf.slot())
            .ok_or(CacheError::NoSuchBuffer(buf.slot()))?;
        Ok(f(&data.lock()))
    }

    /// Mutably borrows the payload of a held buffer. Does not mark it dirty.
    ///
    /// # Errors
    /// [`CacheError::NoSuchBuffer`] for a handle outside the pool.
    pub fn with_data_mut<R>(
        &self,
        buf: &BufferRef,
        f: impl FnOnce(&mut [u8]) -> R,
    ) -> Result<R, CacheError> {
        let data = self
            .data
            .get(buf.slot())
            .ok_or(CacheError::NoSuchBuffer(buf.slot()))?;
        Ok(f(&mut data.lock()))
    }

    /// Bookkeeping snapshot of a buffer.
    ///
    /// # Errors
    /// [`CacheError::NoSuchBuffer`] for a handle outside the pool.
    pub fn info(&self, buf: &BufferRef) -> Result<BufferInfo, CacheError> {
        let st = self.state.lock_irq();
        Self::snapshot(&st, buf.slot())
    }

    /// Bookkeeping snapshots of all buffers, by slot.
    #[must_use]
    pub fn slots(&self) -> Vec<BufferInfo> {
        let st = self.state.lock_irq();
        (0..st.slots.len())
            .filter_map(|slot| Self::snapshot(&st, slot).ok())
            .collect()
    }

    /// Slots on the free list, head (next victim) first.
    #[must_use]
    pub fn free_list(&self) -> Vec<usize> {
        let st = self.state.lock_irq();
        st.free.iter(st.free_head()).collect()
    }

    /// The slot currently holding `id`, without taking a reference.
    #[must_use]
    pub fn lookup(&self, id: BlockId) -> Option<usize> {
        let st = self.state.lock_irq();
        let head = st.bucket_head(id, self.config.hashtab_size);
        st.hash.iter(head).find(|&s| st.slots[s].id == id)
    }

    fn snapshot(st: &CacheState, slot: usize) -> Result<BufferInfo, CacheError> {
        let s = st.slot(slot)?;
        Ok(BufferInfo {
            slot,
            id: s.id,
            count: s.count,
            flags: s.flags,
        })
    }

    fn read(&self, buf: &BufferRef) -> Result<(), CacheError> {
        let id = self.begin_transfer(buf)?;
        let res = {
            let mut data = self.data[buf.slot()].lock();
            self.device.read_block(id, &mut data)
        };
        self.end_transfer(buf.slot(), |flags| {
            if res.is_ok() {
                flags.set_valid(true);
                flags.set_dirty(false);
            }
        });
        res.map_err(CacheError::from)
    }

    /// Marks the buffer busy for a device transfer and returns its identity.
    fn begin_transfer(&self, buf: &BufferRef) -> Result<BlockId, CacheError> {
        let mut st = self.state.lock_irq();
        let s = st.slot_mut(buf.slot())?;
        debug_assert!(s.flags.locked(), "device transfer on unlocked buffer");
        s.flags.set_busy(true);
        Ok(s.id)
    }

    fn end_transfer(&self, slot: usize, update: impl FnOnce(&mut BufferFlags)) {
        let mut st = self.state.lock_irq();
        let flags = &mut st.slots[slot].flags;
        flags.set_busy(false);
        update(flags);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::DeviceId;
    use crate::device::DeviceError;

    struct Null;

    impl BlockDevice for Null {
        fn read_block(&self, _: BlockId, _: &mut [u8]) -> Result<(), DeviceError> {
            Ok(())
        }

        fn write_block(&self, _: BlockId, _: &[u8]) -> Result<(), DeviceError> {
            Ok(())
        }
    }

    impl WaitQueue for Null {
        fn sleep(&self, _: WaitChannel, _: Priority) {
            panic!("unexpected sleep");
        }

        fn wakeup(&self, _: WaitChannel) {}
    }

    fn cache() -> BufferCache<Null> {
        let config = CacheConfig {
            nr_buffers: 4,
            hashtab_size: 7,
            block_size: 16,
            reserved_blocks: 0,
        };
        BufferCache::new(config, Null).unwrap()
    }

    #[test]
    fn double_release_is_fatal_and_changes_nothing() {
        let cache = cache();
        let buf = cache.getblk(&Null, BlockId::new(DeviceId(1), 1)).unwrap();
        let slot = buf.slot();
        cache.brelse(&Null, buf).unwrap();
        let before = cache.free_list();

        let err = cache.brelse(&Null, BufferRef::new(slot)).unwrap_err();
        assert_eq!(err, CacheError::DoubleRelease { slot });
        assert!(err.is_fatal());
        assert_eq!(cache.free_list(), before);
    }

    #[test]
    fn handles_outside_the_pool_are_rejected() {
        let cache = cache();
        assert_eq!(
            cache.brelse(&Null, BufferRef::new(99)),
            Err(CacheError::NoSuchBuffer(99))
        );
        assert_eq!(
            cache.info(&BufferRef::new(4)).unwrap_err(),
            CacheError::NoSuchBuffer(4)
        );
    }
}
