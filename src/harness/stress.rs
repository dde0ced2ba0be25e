//! Varies the concurrency level to shake out exclusion and liveness bugs.
//!
//! Lock bugs often never show in steady state. Every interval all workers are quiesced and a
//! random subset is released, so the live concurrency moves M -> 0 -> K instead of M -> K and the
//! lock flips between contended and uncontended far more often.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use crossbeam_utils::CachePadded;
use log::trace;
use rand::Rng;

use crate::primitives::pause;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StressConfig {
    pub interval: Duration,
    /// Number of halts to raise before stopping; `None` runs forever.
    pub epochs: Option<u64>,
}

impl StressConfig {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            epochs: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StressReport {
    pub raised: u64,
    pub epochs: u64,
}

/// Ticket rendezvous with distinct arrival and departure phases.
///
/// Followers wait in ticket order; the leader holds the grant until the full quorum has
/// arrived, then picks the next concurrency level and releases that many workers.
pub struct StressModulator {
    threads: usize,
    verbose: bool,
    halt: CachePadded<AtomicBool>,
    ticket: CachePadded<AtomicUsize>,
    grant: CachePadded<AtomicUsize>,
    gate: AtomicUsize,
    nrun: AtomicUsize,
    level: AtomicUsize,
    epochs: AtomicU64,
    retired: AtomicBool,
}

impl StressModulator {
    /// Chance of forcing a single runner, to favour uncontended epochs.
    const SOLO_ONE_IN: u32 = 10;

    pub fn new(threads: usize) -> Self {
        assert!(threads > 0, "stress needs at least one worker");
        Self {
            threads,
            verbose: true,
            halt: CachePadded::new(AtomicBool::new(false)),
            ticket: CachePadded::new(AtomicUsize::new(0)),
            grant: CachePadded::new(AtomicUsize::new(0)),
            gate: AtomicUsize::new(0),
            nrun: AtomicUsize::new(0),
            level: AtomicUsize::new(0),
            epochs: AtomicU64::new(0),
            retired: AtomicBool::new(false),
        }
    }

    /// Suppresses the `L<k>` diagnostic stream on stdout.
    pub fn quiet(mut self) -> Self {
        self.verbose = false;
        self
    }

    pub fn raise_halt(&self) {
        self.halt.store(true, Ordering::SeqCst);
    }

    /// Releases every parked worker for good; later polls return immediately.
    pub fn retire(&self) {
        self.retired.store(true, Ordering::SeqCst);
    }

    pub fn epochs(&self) -> u64 {
        self.epochs.load(Ordering::SeqCst)
    }

    /// Concurrency level chosen for the current epoch.
    pub fn level(&self) -> usize {
        self.level.load(Ordering::SeqCst)
    }

    fn retired(&self) -> bool {
        self.retired.load(Ordering::SeqCst)
    }

    /// Spins until `cond` holds, or returns false once retired.
    fn wait(&self, cond: impl Fn() -> bool) -> bool {
        while !cond() {
            if self.retired() {
                return false;
            }
            pause()
        }
        true
    }

    fn choose_level(&self) -> usize {
        let mut rng = rand::thread_rng();
        if rng.gen_ratio(1, Self::SOLO_ONE_IN) {
            1
        } else {
            rng.gen_range(1..=self.threads)
        }
    }

    fn emit(&self, text: &str) {
        if self.verbose {
            let mut out = io::stdout().lock();
            // Diagnostics only, a closed stdout must not stop the workers.
            let _ = out.write_all(text.as_bytes()).and_then(|_| out.flush());
        }
    }

    /// Poll point, called by workers outside their critical section.
    pub fn poll(&self) {
        if !self.halt.load(Ordering::SeqCst) || self.retired() {
            return;
        }

        let t = self.ticket.fetch_add(1, Ordering::SeqCst);
        if !self.wait(|| self.grant.load(Ordering::SeqCst) == t) {
            return;
        }

        if self.gate.load(Ordering::SeqCst) == 0 {
            // Lead: wait for the full quorum, then open the next epoch.
            if !self.wait(|| self.ticket.load(Ordering::SeqCst).wrapping_sub(t) == self.threads) {
                return;
            }
            let level = self.choose_level();
            self.gate.store(level, Ordering::SeqCst);
            self.level.store(level, Ordering::SeqCst);
            self.emit(&format!("L{level}"));
            self.halt.store(false, Ordering::SeqCst);
            self.nrun.store(0, Ordering::SeqCst);
            let epoch = self.epochs.fetch_add(1, Ordering::SeqCst) + 1;
            trace!("stress epoch {epoch}: releasing {level} of {} workers", self.threads);
        }

        let level = self.level();
        let k = self.nrun.fetch_add(1, Ordering::SeqCst);
        if k + 1 == level {
            self.emit("; ");
        }
        if k >= level {
            self.emit("?");
        }

        self.gate.fetch_sub(1, Ordering::SeqCst);
        self.grant.fetch_add(1, Ordering::SeqCst);
    }
}
