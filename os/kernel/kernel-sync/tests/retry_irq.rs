//! Observes the emulated interrupt flag across `retry`; alone in this binary
//! because the flag is process-wide.

use kernel_info::Priority;
use kernel_sync::{Attempt, SpinLock, WaitChannel, WaitQueue, irq, retry};
use std::cell::RefCell;

/// Records whether interrupts were enabled each time it is asked to sleep.
#[derive(Default)]
struct Masking(RefCell<Vec<bool>>);

impl WaitQueue for Masking {
    fn sleep(&self, _: WaitChannel, _: Priority) {
        self.0.borrow_mut().push(irq::enabled());
    }

    fn wakeup(&self, _: WaitChannel) {}
}

#[test]
fn failed_attempts_sleep_with_interrupts_masked() {
    assert!(irq::enabled());

    let queue = Masking::default();
    let chan = WaitChannel::new();
    let free = SpinLock::new(0u32);

    let out: Result<u32, ()> = retry(&queue, Priority::BUFFER, || {
        // the critical section ends here, before the sleep
        let mut tries = free.lock_irq();
        *tries += 1;
        Ok(if *tries < 3 {
            Attempt::Wait(chan)
        } else {
            Attempt::Done(*tries)
        })
    });

    assert_eq!(out, Ok(3));
    assert_eq!(*queue.0.borrow(), [false, false]);
    assert!(irq::enabled());
}
