//! A testbed for N-thread mutual exclusion protocols built from plain shared memory.
//!
//! Each algorithm implements [`sync::MutexProtocol`]. The [`harness`] runs it on N workers for
//! a number of timed rounds, checks every admission with the [`critical_section`] oracle and
//! reports throughput and fairness.

pub mod critical_section;
pub mod error;
pub mod harness;
pub mod primitives;
pub mod sync;

pub use error::Error;
