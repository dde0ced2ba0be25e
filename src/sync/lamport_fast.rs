//! Leslie Lamport, A Fast Mutual Exclusion Algorithm, ACM TOCS 5(1), 1987, Fig. 2.
//!
//! `y == n` marks the lock as free, where the paper uses 0, so ids stay 0-based.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crossbeam_utils::CachePadded;

use super::MutexProtocol;
use crate::error::Error;
use crate::primitives::{aligned_array, fence, spin_until};

pub struct LamportFast {
    b: Box<[CachePadded<AtomicBool>]>,
    x: CachePadded<AtomicUsize>,
    y: CachePadded<AtomicUsize>,
    contended: CachePadded<AtomicUsize>,
}

impl LamportFast {
    pub fn new(n: usize) -> Result<Self, Error> {
        Ok(Self {
            b: aligned_array(n, || AtomicBool::new(false))?,
            x: CachePadded::new(AtomicUsize::new(0)),
            y: CachePadded::new(AtomicUsize::new(n)),
            contended: CachePadded::new(AtomicUsize::new(0)),
        })
    }

    /// Number of entries that found `x` overwritten after claiming `y`.
    pub fn contended_entries(&self) -> usize {
        self.contended.load(Ordering::Relaxed)
    }

    fn free(&self) -> usize {
        self.b.len()
    }

    fn withdraw(&self, id: usize) {
        self.b[id].store(false, Ordering::SeqCst);
        fence();
    }
}

impl MutexProtocol for LamportFast {
    fn name(&self) -> &'static str {
        "lamport-fast"
    }

    fn threads(&self) -> usize {
        self.b.len()
    }

    fn entry(&self, id: usize) {
        loop {
            self.b[id].store(true, Ordering::SeqCst);
            self.x.store(id, Ordering::SeqCst);
            fence();
            if self.y.load(Ordering::SeqCst) != self.free() {
                // someone is already past the gate
                self.withdraw(id);
                spin_until(|| self.y.load(Ordering::SeqCst) == self.free());
                continue;
            }
            self.y.store(id, Ordering::SeqCst);
            fence();
            if self.x.load(Ordering::SeqCst) != id {
                self.contended.fetch_add(1, Ordering::Relaxed);
                self.withdraw(id);
                for b in self.b.iter() {
                    spin_until(|| !b.load(Ordering::SeqCst));
                }
                if self.y.load(Ordering::SeqCst) != id {
                    continue;
                }
            }
            return;
        }
    }

    fn exit(&self, id: usize) {
        self.y.store(self.free(), Ordering::SeqCst);
        self.b[id].store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use super::*;
    use crate::sync::testing::assert_exclusive;

    const N_THREADS: usize = 4;
    const RUN_FOR: Duration = Duration::from_millis(500);

    #[test]
    fn mutual_exclusion() {
        assert_exclusive(Arc::new(LamportFast::new(N_THREADS).unwrap()), RUN_FOR);
    }

    #[test]
    fn lone_contender_stays_on_fast_path() {
        let mu = LamportFast::new(N_THREADS).unwrap();
        for id in (0..N_THREADS).cycle().take(10_000) {
            mu.entry(id);
            assert_eq!(mu.y.load(Ordering::SeqCst), id);
            mu.exit(id);
        }
        assert_eq!(mu.contended_entries(), 0);
        assert_eq!(mu.y.load(Ordering::SeqCst), N_THREADS);
    }

    #[test]
    fn contention_counter_has_its_own_line() {
        let mu = LamportFast::new(2).unwrap();
        let counter = &*mu.contended as *const AtomicUsize as usize;
        let y = &*mu.y as *const AtomicUsize as usize;
        assert!(counter.abs_diff(y) >= std::mem::size_of::<CachePadded<AtomicUsize>>());
        assert_eq!(counter % std::mem::align_of::<CachePadded<AtomicUsize>>(), 0);
    }

    #[test]
    fn exit_frees_the_gate() {
        let mu = LamportFast::new(2).unwrap();
        mu.entry(1);
        assert!(mu.b[1].load(Ordering::SeqCst));
        mu.exit(1);
        assert!(!mu.b[1].load(Ordering::SeqCst));
        assert_eq!(mu.y.load(Ordering::SeqCst), 2);
    }
}
