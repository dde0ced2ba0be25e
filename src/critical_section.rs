//! The self-checking critical section every protocol is validated against.

use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_utils::CachePadded;

use crate::primitives::fence;

/// Number of times the occupant is re-read while inside.
const CHECKS: usize = 100;
const VACANT: usize = usize::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Interference Id:{id} intruder:{intruder}")]
pub struct Interference {
    pub id: usize,
    pub intruder: usize,
}

pub struct CriticalSection {
    occupant: CachePadded<AtomicUsize>,
}

impl Default for CriticalSection {
    fn default() -> Self {
        Self::new()
    }
}

impl CriticalSection {
    pub fn new() -> Self {
        Self {
            occupant: CachePadded::new(AtomicUsize::new(VACANT)),
        }
    }

    /// Claims the section for `id` and verifies nobody else writes the occupant meanwhile.
    pub fn check(&self, id: usize) -> Result<(), Interference> {
        self.occupant.store(id, Ordering::SeqCst);
        fence();
        for _ in 0..CHECKS {
            let intruder = self.occupant.load(Ordering::SeqCst);
            if intruder != id {
                return Err(Interference { id, intruder });
            }
        }
        Ok(())
    }

    /// Like [`CriticalSection::check`], but a violation aborts the process.
    pub fn enter(&self, id: usize) {
        if let Err(interference) = self.check(id) {
            eprintln!("{interference}");
            std::process::abort();
        }
    }
}
