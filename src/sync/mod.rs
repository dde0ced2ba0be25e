use std::sync::Arc;

use crate::error::Error;

pub mod eisenberg;
pub mod kessels;
pub mod lamport_fast;

/// Entry and exit protocol of an N-thread mutual exclusion algorithm over plain shared memory.
///
/// The shared control state is built by [`AlgorithmKind::build`] before any worker starts and
/// released when the last handle drops, after every worker has joined.
///
/// Callers must pass ids in `0..threads()`, and a given id must be used by one thread at a time.
pub trait MutexProtocol: Send + Sync {
    fn name(&self) -> &'static str;
    /// Number of logical ids the shared state was built for.
    fn threads(&self) -> usize;
    /// Returns once `id` holds exclusive access.
    fn entry(&self, id: usize);
    fn exit(&self, id: usize);
}

impl dyn MutexProtocol {
    /// Runs the entry protocol for `id`; the exit protocol runs when the guard drops.
    pub fn acquire(&self, id: usize) -> MutexGuard<'_> {
        self.entry(id);
        MutexGuard { mutex: self, id }
    }
}

pub struct MutexGuard<'a> {
    mutex: &'a dyn MutexProtocol,
    id: usize,
}

impl MutexGuard<'_> {
    pub fn id(&self) -> usize {
        self.id
    }
}

impl Drop for MutexGuard<'_> {
    fn drop(&mut self) {
        self.mutex.exit(self.id)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum AlgorithmKind {
    Eisenberg,
    Kessels,
    LamportFast,
}

impl AlgorithmKind {
    pub const ALL: [AlgorithmKind; 3] = [
        AlgorithmKind::Eisenberg,
        AlgorithmKind::Kessels,
        AlgorithmKind::LamportFast,
    ];

    /// Builds the shared state for `n` logical ids.
    pub fn build(self, n: usize) -> Result<Arc<dyn MutexProtocol>, Error> {
        if n == 0 {
            return Err(Error::InvalidThreads(n));
        }
        Ok(match self {
            AlgorithmKind::Eisenberg => Arc::new(eisenberg::EisenbergMcGuire::new(n)?),
            AlgorithmKind::Kessels => Arc::new(kessels::Kessels::new(n)?),
            AlgorithmKind::LamportFast => Arc::new(lamport_fast::LamportFast::new(n)?),
        })
    }

    /// Thread count the algorithm is restricted to, if any.
    pub fn fixed_threads(self) -> Option<usize> {
        match self {
            AlgorithmKind::Kessels => Some(2),
            _ => None,
        }
    }
}
