//! Drives timed rounds of N workers through a [`MutexProtocol`] and reduces their entry counts.

use std::iter::Copied;
use std::iter::Cycle;
use std::slice;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, info, warn};
use rand::seq::SliceRandom;

use crate::critical_section::CriticalSection;
use crate::error::Error;
use crate::sync::{AlgorithmKind, MutexProtocol};

mod barrier;
mod rotation;
mod stats;
mod stress;

pub use barrier::*;
pub use rotation::*;
pub use stats::*;
pub use stress::*;

/// Number of timed rounds per experiment.
pub const RUNS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Number of logical ids.
    pub threads: usize,
    /// Length of one round.
    pub duration: Duration,
    /// Arity for tree-shaped locks; none of the built-in algorithms use it.
    pub degree: Option<usize>,
    /// Run a single physical worker that rotates through every logical id.
    pub rotate: bool,
    pub stress: Option<StressConfig>,
}

impl Config {
    pub fn new(threads: usize, seconds: u64) -> Result<Self, Error> {
        if threads < 1 {
            return Err(Error::InvalidThreads(threads));
        }
        if seconds < 1 {
            return Err(Error::InvalidDuration(seconds));
        }
        Ok(Self {
            threads,
            duration: Duration::from_secs(seconds),
            degree: None,
            rotate: false,
            stress: None,
        })
    }

    pub fn with_degree(mut self, degree: Option<usize>) -> Result<Self, Error> {
        if let Some(d) = degree {
            if d < 2 {
                return Err(Error::InvalidDegree(d));
            }
        }
        self.degree = degree;
        Ok(self)
    }

    /// Number of physical worker threads.
    pub fn workers(&self) -> usize {
        if self.rotate {
            1
        } else {
            self.threads
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Summary(Summary),
    Stress(StressReport),
}

/// State shared by the controller and all workers for the lifetime of one run.
struct Shared {
    protocol: Arc<dyn MutexProtocol>,
    oracle: CriticalSection,
    barrier: RoundBarrier,
    rotation: Option<RotationTable>,
    stress: Option<StressModulator>,
}

/// Where a worker takes its working id from on each entry attempt.
enum Identity<'a> {
    Fixed(usize),
    Rotating(Cycle<Copied<slice::Iter<'a, usize>>>),
}

impl Identity<'_> {
    fn next(&mut self) -> usize {
        match self {
            Identity::Fixed(id) => *id,
            // A cycle over a non-empty table never ends.
            Identity::Rotating(ids) => ids.next().unwrap_or_default(),
        }
    }
}

impl Shared {
    /// Worker body: enters the critical section until stopped, once per round. Counts are
    /// attributed to `id` even when rotating through other working ids.
    fn work(&self, id: usize, rounds: usize) -> Vec<usize> {
        let mut identity = match &self.rotation {
            Some(table) => Identity::Rotating(table.cycle()),
            None => Identity::Fixed(id),
        };
        let mut entries = vec![0; rounds];
        for count in entries.iter_mut() {
            while !self.barrier.stopped() {
                if let Some(stress) = &self.stress {
                    stress.poll();
                }
                let who = identity.next();
                let _guard = self.protocol.acquire(who);
                self.oracle.enter(who);
                *count += 1;
            }
            self.barrier.park();
        }
        entries
    }
}

fn spawn_workers(
    shared: &Arc<Shared>,
    workers: usize,
    rounds: usize,
) -> Result<Vec<JoinHandle<Vec<usize>>>, Error> {
    // Creation order must not line up with the algorithms' id priorities.
    let mut ids = (0..workers).collect::<Vec<_>>();
    ids.shuffle(&mut rand::thread_rng());
    debug!("worker ids in creation order: {ids:?}");

    ids.into_iter()
        .map(|id| {
            let shared = shared.clone();
            thread::Builder::new()
                .name(format!("worker-{id}"))
                .spawn(move || shared.work(id, rounds))
                .map_err(Error::from)
        })
        .collect()
}

fn join_workers(handles: Vec<JoinHandle<Vec<usize>>>) -> Vec<Vec<usize>> {
    handles
        .into_iter()
        .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
        .collect()
}

/// Runs one experiment of `kind` under `config`.
///
/// With stress enabled and no epoch bound this never returns.
pub fn run(kind: AlgorithmKind, config: &Config) -> Result<Outcome, Error> {
    let workers = config.workers();
    if config.degree.is_some() {
        warn!("degree is ignored by {kind:?}");
    }

    let protocol = kind.build(config.threads)?;
    debug!("constructed {} for {} ids", protocol.name(), protocol.threads());
    let shared = Arc::new(Shared {
        protocol,
        oracle: CriticalSection::new(),
        barrier: RoundBarrier::new(),
        rotation: config.rotate.then(|| RotationTable::new(config.threads)),
        stress: config.stress.map(|_| StressModulator::new(workers)),
    });

    let outcome = match (&config.stress, &shared.stress) {
        (Some(stress_config), Some(stress)) => {
            Outcome::Stress(stress_rounds(&shared, stress, workers, stress_config)?)
        }
        _ => Outcome::Summary(timed_rounds(&shared, workers, config)?),
    };
    // Last handle: drops the protocol's shared state.
    drop(shared);
    Ok(outcome)
}

fn timed_rounds(shared: &Arc<Shared>, workers: usize, config: &Config) -> Result<Summary, Error> {
    info!(
        "running {} with {} ids on {workers} workers, {RUNS} rounds of {:?}",
        shared.protocol.name(),
        config.threads,
        config.duration
    );
    let handles = spawn_workers(shared, workers, RUNS)?;
    for round in 0..RUNS {
        thread::sleep(config.duration);
        shared.barrier.close_round(workers);
        debug!("round {} of {RUNS} closed", round + 1);
    }

    let medians = join_workers(handles)
        .into_iter()
        .map(|mut entries| median(&mut entries))
        .collect::<Vec<_>>();
    Ok(Summary::new(config.threads, config.duration.as_secs(), medians))
}

fn stress_rounds(
    shared: &Arc<Shared>,
    stress: &StressModulator,
    workers: usize,
    config: &StressConfig,
) -> Result<StressReport, Error> {
    let interval = config.interval.as_millis();
    match config.epochs {
        None => println!(
            "Stress mode : Threads={workers} Interval={interval}\n\
             The program runs indefinitely in this mode.\n\
             Performance data has no meaning, and should not be reported or collected!"
        ),
        Some(epochs) => println!(
            "Stress mode : Threads={workers} Interval={interval} Epochs={epochs}\n\
             Performance data has no meaning, and should not be reported or collected!"
        ),
    }
    let handles = spawn_workers(shared, workers, 1)?;

    let mut raised = 0;
    while config.epochs.map_or(true, |bound| raised < bound) {
        thread::sleep(config.interval);
        stress.raise_halt();
        raised += 1;
    }

    // Parked workers must be released before they can reach the barrier.
    stress.retire();
    shared.barrier.close_round(workers);
    join_workers(handles);
    println!();
    info!("stress run finished after {} epochs", stress.epochs());
    Ok(StressReport {
        raised,
        epochs: stress.epochs(),
    })
}
