//! # Lottery
//!
//! Every ready process holds `tickets + compensation` lottery tickets. A draw
//! picks one ticket uniformly from `1..=total`; the process owning it runs
//! next. Owners are laid out in table order, so process `i` owns the range
//! `(sum_{j<i} w_j, sum_{j<=i} w_j]` and wins with probability `w_i / total`.
//!
//! ## Compensation
//!
//! A process that gives up the CPU after using only a fraction `f` of its
//! quantum would be under-represented if it kept its base weight, since it
//! holds the CPU for less time per win. It is compensated so that its
//! weight becomes `tickets / f`:
//!
//! ```text
//! compensation = tickets / f - tickets = ceil(tickets * unused / used)
//! ```
//!
//! The ceiling keeps any partial use strictly rewarded; a process that used
//! its whole quantum, or none of it, earns nothing.

use crate::process::Pid;

/// Source of lottery draws.
///
/// Injected into the scheduler so draws are reproducible under test.
pub trait TicketSource: Send {
    /// Returns a number uniformly distributed in `1..=total`.
    ///
    /// Only called with `total > 0`.
    fn draw(&mut self, total: u64) -> u64;
}

/// Explicitly seeded xorshift64 generator.
#[derive(Debug, Clone)]
pub struct Xorshift64 {
    state: u64,
}

impl Xorshift64 {
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        // xorshift has a fixed point at zero
        Self {
            state: if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed },
        }
    }

    pub const fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }
}

impl TicketSource for Xorshift64 {
    fn draw(&mut self, total: u64) -> u64 {
        debug_assert!(total > 0);
        1 + self.next_u64() % total
    }
}

/// Compensation tickets for a process leaving the CPU with `counter` of its
/// `quantum` ticks unused.
#[must_use]
pub fn compensation(tickets: u32, counter: u32, quantum: u32) -> u32 {
    if counter == 0 || counter >= quantum {
        return 0;
    }
    let used = u64::from(quantum - counter);
    let owed = (u64::from(tickets) * u64::from(counter)).div_ceil(used);
    u32::try_from(owed).unwrap_or(u32::MAX)
}

/// Finds the owner of ticket `draw` among `(pid, weight)` pairs in table order.
pub(crate) fn winner(entrants: impl IntoIterator<Item = (Pid, u64)>, draw: u64) -> Option<Pid> {
    let mut sum = 0u64;
    entrants.into_iter().find_map(|(pid, weight)| {
        sum += weight;
        (sum >= draw).then_some(pid)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticket_ranges_follow_table_order() {
        let entrants = [(Pid::new(1), 10), (Pid::new(2), 0), (Pid::new(3), 30)];
        assert_eq!(winner(entrants, 1), Some(Pid::new(1)));
        assert_eq!(winner(entrants, 10), Some(Pid::new(1)));
        assert_eq!(winner(entrants, 11), Some(Pid::new(3)));
        assert_eq!(winner(entrants, 40), Some(Pid::new(3)));
        assert_eq!(winner(entrants, 41), None);
    }

    #[test]
    fn zero_weight_never_wins() {
        let entrants = [(Pid::new(1), 0), (Pid::new(2), 5)];
        for draw in 1..=5 {
            assert_eq!(winner(entrants, draw), Some(Pid::new(2)));
        }
    }

    #[test]
    fn compensation_is_positive_below_full_quantum() {
        let quantum = 50;
        for counter in 1..quantum {
            assert!(compensation(1, counter, quantum) > 0, "counter {counter}");
        }
        assert_eq!(compensation(40, 0, quantum), 0);
        assert_eq!(compensation(40, quantum, quantum), 0);
    }

    #[test]
    fn compensation_strictly_decreases_with_use() {
        let quantum = 50;
        let tickets = 1000;
        let mut previous = u32::MAX;
        for used in 1..=quantum {
            let c = compensation(tickets, quantum - used, quantum);
            assert!(c < previous, "used {used}: {c} !< {previous}");
            previous = c;
        }
        assert_eq!(previous, 0);
    }

    #[test]
    fn half_quantum_doubles_weight() {
        assert_eq!(compensation(40, 25, 50), 40);
        assert_eq!(compensation(40, 40, 50), 160);
    }

    #[test]
    fn draws_stay_in_range() {
        let mut rng = Xorshift64::new(0);
        for total in [1, 2, 7, 40, 1000] {
            for _ in 0..1000 {
                let d = rng.draw(total);
                assert!((1..=total).contains(&d));
            }
        }
    }
}
