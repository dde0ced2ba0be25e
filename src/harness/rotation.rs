use std::iter::{Copied, Cycle};
use std::slice;

use rand::{seq::SliceRandom, Rng};

/// Approximate number of working ids a rotating worker cycles through.
pub const MAX_START_POINTS: usize = 64;

/// Working ids for a single physical worker that impersonates every logical id in turn.
///
/// The table is a sequence of blocks, each a random permutation of `0..n`, so no id repeats
/// within a block. Ids may repeat across a block boundary.
#[derive(Debug, Clone)]
pub struct RotationTable {
    n: usize,
    ids: Box<[usize]>,
}

impl RotationTable {
    pub fn new(n: usize) -> Self {
        Self::with_rng(n, &mut rand::thread_rng())
    }

    pub fn with_rng<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Self {
        assert!(n > 0, "rotation needs at least one id");
        let blocks = (MAX_START_POINTS / n).max(1);
        let mut ids = Vec::with_capacity(blocks * n);
        for _ in 0..blocks {
            let mut block = (0..n).collect::<Vec<_>>();
            block.shuffle(rng);
            ids.extend(block);
        }
        Self {
            n,
            ids: ids.into_boxed_slice(),
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn blocks(&self) -> slice::Chunks<'_, usize> {
        self.ids.chunks(self.n)
    }

    /// Endless sequence of working ids, one per entry attempt.
    pub fn cycle(&self) -> Cycle<Copied<slice::Iter<'_, usize>>> {
        self.ids.iter().copied().cycle()
    }
}
