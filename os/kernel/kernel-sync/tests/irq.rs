//! Observes the emulated interrupt flag; kept as the only test in this binary
//! because the flag is process-wide.

use kernel_sync::{SpinLock, irq};

#[test]
fn critical_sections_mask_and_restore_interrupts() {
    assert!(irq::enabled());

    let l = SpinLock::new(0u8);
    {
        let _g = l.lock_irq();
        assert!(!irq::enabled());

        // nested sections must not unmask early
        irq::without_interrupts(|| assert!(!irq::enabled()));
        assert!(!irq::enabled());
    }
    assert!(irq::enabled());

    let seen = irq::without_interrupts(irq::enabled);
    assert!(!seen);
    assert!(irq::enabled());
}
