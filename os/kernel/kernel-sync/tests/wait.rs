use kernel_info::Priority;
use kernel_sync::{Attempt, WaitChannel, WaitQueue, retry};
use std::cell::RefCell;

#[derive(Default)]
struct Recorder {
    slept: RefCell<Vec<(WaitChannel, Priority)>>,
    woken: RefCell<Vec<WaitChannel>>,
}

impl WaitQueue for Recorder {
    fn sleep(&self, chan: WaitChannel, priority: Priority) {
        self.slept.borrow_mut().push((chan, priority));
    }

    fn wakeup(&self, chan: WaitChannel) {
        self.woken.borrow_mut().push(chan);
    }
}

#[test]
fn channels_are_distinct() {
    let a = WaitChannel::new();
    let b = WaitChannel::new();
    assert_ne!(a, b);
    assert_eq!(a, a);
}

#[test]
fn retry_sleeps_until_attempt_completes() {
    let queue = Recorder::default();
    let chan = WaitChannel::new();
    let mut tries = 0;

    let out: Result<u32, ()> = retry(&queue, Priority::BUFFER, || {
        tries += 1;
        Ok(if tries < 3 {
            Attempt::Wait(chan)
        } else {
            Attempt::Done(7)
        })
    });

    assert_eq!(out, Ok(7));
    assert_eq!(tries, 3);
    assert_eq!(
        *queue.slept.borrow(),
        vec![(chan, Priority::BUFFER), (chan, Priority::BUFFER)]
    );
}

#[test]
fn retry_stops_on_error_without_sleeping() {
    let queue = Recorder::default();
    let out: Result<(), &str> = retry(&queue, Priority::IO, || Err("fault"));
    assert_eq!(out, Err("fault"));
    assert!(queue.slept.borrow().is_empty());
}

#[test]
fn queue_by_reference_forwards() {
    let queue = Recorder::default();
    let chan = WaitChannel::new();
    let by_ref = &queue;
    by_ref.wakeup(chan);
    assert_eq!(*queue.woken.borrow(), vec![chan]);
}
