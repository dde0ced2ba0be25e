//! Joep L. W. Kessels, Arbitration Without Common Modifiable Variables, Acta Informatica 17(2),
//! 1982, p. 137.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crossbeam_utils::CachePadded;

use super::MutexProtocol;
use crate::error::Error;
use crate::primitives::{fence, pause};

/// Two-thread arbiter: each side only writes its own variables, so no read-modify-write is needed.
#[derive(Default)]
pub struct Kessels {
    q: [CachePadded<AtomicBool>; 2],
    r: [CachePadded<AtomicUsize>; 2],
}

impl Kessels {
    pub fn new(n: usize) -> Result<Self, Error> {
        if n != 2 {
            return Err(Error::ThreadCount {
                algorithm: "kessels",
                required: 2,
                threads: n,
            });
        }
        Ok(Self::default())
    }

    fn token(&self, id: usize) -> usize {
        (self.r[1 - id].load(Ordering::SeqCst) + id) % 2
    }
}

impl MutexProtocol for Kessels {
    fn name(&self) -> &'static str {
        "kessels"
    }

    fn threads(&self) -> usize {
        2
    }

    fn entry(&self, id: usize) {
        let other = 1 - id;
        self.q[id].store(true, Ordering::SeqCst);
        fence();
        self.r[id].store(self.token(id), Ordering::SeqCst);
        fence();
        while self.q[other].load(Ordering::SeqCst)
            && self.r[id].load(Ordering::SeqCst) == self.token(id)
        {
            pause()
        }
    }

    fn exit(&self, id: usize) {
        self.q[id].store(false, Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread, time::Duration};

    use super::*;
    use crate::sync::testing::assert_exclusive;

    #[test]
    fn mutual_exclusion() {
        assert_exclusive(Arc::new(Kessels::new(2).unwrap()), Duration::from_millis(500));
    }

    #[test]
    fn uncontended_entry_does_not_wait() {
        let mu = Kessels::new(2).unwrap();
        for _ in 0..1000 {
            mu.entry(0);
            mu.exit(0);
            mu.entry(1);
            mu.exit(1);
        }
    }

    #[test]
    fn second_contender_waits_for_exit() {
        let mu = Arc::new(Kessels::new(2).unwrap());
        mu.entry(0);
        let th = thread::spawn({
            let mu = mu.clone();
            move || {
                mu.entry(1);
                mu.exit(1);
            }
        });
        thread::sleep(Duration::from_millis(100));
        assert!(!th.is_finished());
        mu.exit(0);
        th.join().unwrap();
    }
}
