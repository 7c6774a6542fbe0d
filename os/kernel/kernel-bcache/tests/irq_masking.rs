//! A release that lands between a failed `getblk` check and the sleep would
//! wake nobody. Observes the emulated interrupt flag, so it is alone in this
//! binary: the flag is process-wide.

use kernel_bcache::{BlockDevice, BlockId, BufferCache, DeviceError, DeviceId};
use kernel_info::{CacheConfig, Priority};
use kernel_sync::{WaitChannel, WaitQueue, irq};
use std::cell::RefCell;

struct Zeroes;

impl BlockDevice for Zeroes {
    fn read_block(&self, _: BlockId, data: &mut [u8]) -> Result<(), DeviceError> {
        data.fill(0);
        Ok(())
    }

    fn write_block(&self, _: BlockId, _: &[u8]) -> Result<(), DeviceError> {
        Ok(())
    }
}

/// Notes the interrupt flag on every sleep, then lets the holder run.
#[derive(Default)]
struct Holder<'a> {
    masked: RefCell<Vec<bool>>,
    release: RefCell<Option<Box<dyn FnOnce() + 'a>>>,
}

impl WaitQueue for Holder<'_> {
    fn sleep(&self, _: WaitChannel, _: Priority) {
        self.masked.borrow_mut().push(!irq::enabled());
        let release = self.release.borrow_mut().take();
        release.expect("sleeping with nobody left to wake us")();
    }

    fn wakeup(&self, _: WaitChannel) {}
}

struct Alone;

impl WaitQueue for Alone {
    fn sleep(&self, _: WaitChannel, _: Priority) {
        panic!("unexpected sleep");
    }

    fn wakeup(&self, _: WaitChannel) {}
}

#[test]
fn waiter_sleeps_with_interrupts_masked() {
    let cache = BufferCache::new(
        CacheConfig {
            nr_buffers: 2,
            hashtab_size: 3,
            block_size: 8,
            reserved_blocks: 0,
        },
        Zeroes,
    )
    .unwrap();
    let id = BlockId::new(DeviceId(1), 4);
    assert!(irq::enabled());

    let held = cache.getblk(&Alone, id).unwrap();
    let slot = held.slot();
    let queue = Holder::default();
    *queue.release.borrow_mut() = Some(Box::new(|| cache.brelse(&Alone, held).unwrap()));

    let buf = cache.getblk(&queue, id).unwrap();

    // masked from the failed check through the sleep, restored afterwards
    assert_eq!(*queue.masked.borrow(), [true]);
    assert!(irq::enabled());
    assert_eq!(buf.slot(), slot);
    let info = cache.info(&buf).unwrap();
    assert_eq!(info.count, 1);
    assert!(info.flags.locked());
    cache.brelse(&Alone, buf).unwrap();
}
