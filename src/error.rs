use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("number of threads must be at least 1, got {0}")]
    InvalidThreads(usize),
    #[error("run duration must be at least 1 second, got {0}")]
    InvalidDuration(u64),
    #[error("tree degree must be at least 2, got {0}")]
    InvalidDegree(usize),
    #[error("{algorithm} requires exactly {required} threads, got {threads}")]
    ThreadCount {
        algorithm: &'static str,
        required: usize,
        threads: usize,
    },
    #[error("cannot allocate {slots} cache-aligned slots")]
    Allocation { slots: usize },
    #[error("cannot spawn worker thread")]
    Spawn(#[from] io::Error),
}
