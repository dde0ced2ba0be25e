use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crossbeam_utils::CachePadded;

use crate::primitives::pause;

/// Two-phase quiescence barrier separating timed rounds.
///
/// The controller raises `stop`, waits until every worker has arrived, clears `stop` and waits
/// until every worker has left again before the next round starts.
#[derive(Default)]
pub struct RoundBarrier {
    stop: CachePadded<AtomicBool>,
    arrived: CachePadded<AtomicUsize>,
}

impl RoundBarrier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Polled by workers before each entry attempt.
    pub fn stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    pub fn arrived(&self) -> usize {
        self.arrived.load(Ordering::SeqCst)
    }

    /// Worker side: parks until the controller reopens the next round.
    pub fn park(&self) {
        self.arrived.fetch_add(1, Ordering::SeqCst);
        while self.stopped() {
            pause()
        }
        self.arrived.fetch_sub(1, Ordering::SeqCst);
    }

    /// Controller side: ends the current round once all `workers` are parked.
    pub fn close_round(&self, workers: usize) {
        self.stop.store(true, Ordering::SeqCst);
        while self.arrived() != workers {
            pause()
        }
        self.stop.store(false, Ordering::SeqCst);
        while self.arrived() != 0 {
            pause()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        thread,
        time::Duration,
    };

    use rand::Rng;

    use super::*;

    #[test]
    fn rounds_wait_for_every_worker() {
        const N_THREADS: usize = 4;
        const ROUNDS: usize = 5;
        let barrier = Arc::new(RoundBarrier::new());
        let in_round = Arc::new(AtomicUsize::new(0));

        let ths = (0..N_THREADS)
            .map(|_| {
                let barrier = barrier.clone();
                let in_round = in_round.clone();
                thread::spawn(move || {
                    let mut rng = rand::thread_rng();
                    for _ in 0..ROUNDS {
                        in_round.fetch_add(1, Ordering::SeqCst);
                        while !barrier.stopped() {
                            // injected scheduling delay
                            thread::sleep(Duration::from_millis(rng.gen_range(0..5)));
                        }
                        in_round.fetch_sub(1, Ordering::SeqCst);
                        barrier.park();
                    }
                })
            })
            .collect::<Vec<_>>();

        for _ in 0..ROUNDS {
            thread::sleep(Duration::from_millis(20));
            barrier.close_round(N_THREADS);
            assert_eq!(barrier.arrived(), 0);
            assert!(!barrier.stopped());
        }
        ths.into_iter().for_each(|th| th.join().unwrap());
        assert_eq!(in_round.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn close_round_blocks_until_quorum() {
        let barrier = Arc::new(RoundBarrier::new());
        let controller = thread::spawn({
            let barrier = barrier.clone();
            move || barrier.close_round(2)
        });

        let first = thread::spawn({
            let barrier = barrier.clone();
            move || {
                while !barrier.stopped() {
                    std::hint::spin_loop()
                }
                barrier.park()
            }
        });
        thread::sleep(Duration::from_millis(100));
        assert_eq!(barrier.arrived(), 1);
        assert!(barrier.stopped());
        assert!(!controller.is_finished());

        barrier.park();
        controller.join().unwrap();
        first.join().unwrap();
        assert_eq!(barrier.arrived(), 0);
    }
}
