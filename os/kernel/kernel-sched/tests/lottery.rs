use kernel_info::SchedConfig;
use kernel_sched::{ContextSwitch, Pid, Scheduler, Signal, SignalSink};

struct NoSwitch;

impl ContextSwitch for NoSwitch {
    fn switch_to(&self, _from: Pid, _to: Pid) {}
    fn exit_to(&self, _from: Pid, _to: Pid) {}
}

struct NoSignals;

impl SignalSink for NoSignals {
    fn send_signal(&self, _pid: Pid, _signal: Signal) {}
}

/// With normalization 80 a user process holds `40 - nice` tickets.
const CONFIG: SchedConfig = SchedConfig {
    normalization: 80,
    ..SchedConfig::DEFAULT
};

/// Dispatches `rounds` times without ticking, so no process ever earns
/// compensation and every draw uses the base weights.
fn win_counts(nices: &[i32], rounds: usize, seed: u64) -> Vec<usize> {
    let sched = Scheduler::with_seed(CONFIG, NoSwitch, NoSignals, seed).unwrap();
    let pids: Vec<Pid> = nices.iter().map(|&n| sched.spawn(n).unwrap()).collect();
    let mut wins = vec![0; pids.len()];
    for _ in 0..rounds {
        sched.yield_now();
        let winner = sched.current();
        let i = pids.iter().position(|&p| p == winner).unwrap();
        wins[i] += 1;
    }
    wins
}

#[allow(clippy::cast_precision_loss)]
fn share(wins: usize, rounds: usize) -> f64 {
    wins as f64 / rounds as f64
}

#[test]
fn ten_versus_thirty_tickets() {
    // nice 30 -> 10 tickets, nice 10 -> 30 tickets
    let rounds = 10_000;
    let wins = win_counts(&[30, 10], rounds, 0x5eed);
    let b = share(wins[1], rounds);
    assert!((b - 0.75).abs() < 0.03, "B won {b:.3} of draws");
}

#[test]
fn win_rate_tracks_ticket_share() {
    // 40, 20 and 5 tickets
    let rounds = 20_000;
    let wins = win_counts(&[0, 20, 35], rounds, 7);
    let total = 65.0;
    for (w, tickets) in wins.iter().zip([40.0, 20.0, 5.0]) {
        let got = share(*w, rounds);
        let want = tickets / total;
        assert!((got - want).abs() < 0.02, "got {got:.3}, want {want:.3}");
    }
}

#[test]
fn same_seed_same_schedule() {
    assert_eq!(
        win_counts(&[0, 10, 20], 500, 99),
        win_counts(&[0, 10, 20], 500, 99)
    );
}
