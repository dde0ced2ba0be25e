//! Murray A. Eisenberg and Michael R. McGuire, Further Comments on Dijkstra's Concurrent
//! Programming Control Problem, CACM 15(11), 1972, p. 999.

use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_utils::CachePadded;

use super::MutexProtocol;
use crate::error::Error;
use crate::primitives::{aligned_array, cycle_up, fence, pause};

pub struct EisenbergMcGuire {
    control: Box<[CachePadded<AtomicUsize>]>,
    /// Last winner, or the id picked by the last exit as the likely next one.
    high: CachePadded<AtomicUsize>,
}

impl EisenbergMcGuire {
    const IDLE: usize = 0;
    const WANTING: usize = 1;
    const IN_CS: usize = 2;

    pub fn new(n: usize) -> Result<Self, Error> {
        Ok(Self {
            control: aligned_array(n, || AtomicUsize::new(Self::IDLE))?,
            high: CachePadded::new(AtomicUsize::new(0)),
        })
    }

    fn intent(&self, j: usize) -> usize {
        self.control[j].load(Ordering::SeqCst)
    }

    fn announce(&self, id: usize, intent: usize) {
        self.control[id].store(intent, Ordering::SeqCst);
        fence();
    }

    /// Waits until every id from `high` up to (excluding) `id` is idle.
    fn wait_for_priority(&self, id: usize) {
        let n = self.control.len();
        'scan: loop {
            let mut j = self.high.load(Ordering::SeqCst);
            while j != id {
                if self.intent(j) != Self::IDLE {
                    pause();
                    continue 'scan;
                }
                j = cycle_up(j, n);
            }
            return;
        }
    }
}

impl MutexProtocol for EisenbergMcGuire {
    fn name(&self) -> &'static str {
        "eisenberg"
    }

    fn threads(&self) -> usize {
        self.control.len()
    }

    fn entry(&self, id: usize) {
        let n = self.control.len();
        loop {
            self.announce(id, Self::WANTING);
            self.wait_for_priority(id);
            self.announce(id, Self::IN_CS);

            // Someone else escalated at the same time.
            if (0..n).any(|j| j != id && self.intent(j) == Self::IN_CS) {
                continue;
            }
            let high = self.high.load(Ordering::SeqCst);
            if high != id && self.intent(high) != Self::IDLE {
                continue;
            }
            self.high.store(id, Ordering::SeqCst);
            return;
        }
    }

    fn exit(&self, id: usize) {
        let n = self.control.len();
        // Scan starts just after `high`. Starting just after `id` is the inactive alternative.
        let mut j = cycle_up(self.high.load(Ordering::SeqCst), n);
        while self.intent(j) == Self::IDLE {
            j = cycle_up(j, n);
        }
        self.high.store(j, Ordering::SeqCst);
        self.control[id].store(Self::IDLE, Ordering::SeqCst);
    }
}
