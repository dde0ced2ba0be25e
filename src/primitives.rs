//! Shared-memory building blocks used by every protocol and by the harness.

use std::sync::atomic::{self, Ordering};

use crossbeam_utils::CachePadded;

use crate::error::Error;

/// Successor of `v` on a ring of `n` slots.
#[inline]
pub fn cycle_up(v: usize, n: usize) -> usize {
    if v + 1 >= n {
        0
    } else {
        v + 1
    }
}

/// Predecessor of `v` on a ring of `n` slots.
#[inline]
pub fn cycle_down(v: usize, n: usize) -> usize {
    if v == 0 {
        n - 1
    } else {
        v - 1
    }
}

/// Full store-load barrier. Every shared write that a later read depends on is followed by one.
#[inline]
pub fn fence() {
    atomic::fence(Ordering::SeqCst)
}

#[inline]
pub fn pause() {
    std::hint::spin_loop()
}

/// Spins until `cond` holds.
#[inline]
pub fn spin_until(mut cond: impl FnMut() -> bool) {
    while !cond() {
        pause()
    }
}

/// Allocates `n` slots, each on its own cache line so neighbouring ids never share one.
pub fn aligned_array<T>(
    n: usize,
    mut init: impl FnMut() -> T,
) -> Result<Box<[CachePadded<T>]>, Error> {
    let mut slots = Vec::new();
    slots
        .try_reserve_exact(n)
        .map_err(|_| Error::Allocation { slots: n })?;
    slots.extend((0..n).map(|_| CachePadded::new(init())));
    Ok(slots.into_boxed_slice())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use test_case::test_case;

    use super::*;

    #[test_case(0, 5 => 1)]
    #[test_case(3, 5 => 4)]
    #[test_case(4, 5 => 0)]
    #[test_case(0, 1 => 0)]
    fn cycle_up_wraps(v: usize, n: usize) -> usize {
        cycle_up(v, n)
    }

    #[test_case(4, 5 => 3)]
    #[test_case(1, 5 => 0)]
    #[test_case(0, 5 => 4)]
    #[test_case(0, 1 => 0)]
    fn cycle_down_wraps(v: usize, n: usize) -> usize {
        cycle_down(v, n)
    }

    #[test]
    fn cycles_are_inverse() {
        for n in 1..10 {
            for v in 0..n {
                assert_eq!(cycle_down(cycle_up(v, n), n), v);
                assert_eq!(cycle_up(cycle_down(v, n), n), v);
            }
        }
    }

    #[test]
    fn slots_do_not_share_cache_lines() {
        let slots = aligned_array(4, || AtomicUsize::new(7)).unwrap();
        assert_eq!(slots.len(), 4);
        assert!(slots.iter().all(|s| s.load(Ordering::SeqCst) == 7));

        let a = &*slots[0] as *const AtomicUsize as usize;
        let b = &*slots[1] as *const AtomicUsize as usize;
        assert_eq!(b - a, std::mem::size_of::<CachePadded<AtomicUsize>>());
        assert_eq!(a % std::mem::align_of::<CachePadded<AtomicUsize>>(), 0);
    }

    #[test]
    fn spin_until_returns_once_flag_set() {
        let flag = std::sync::Arc::new(AtomicBool::new(false));
        let th = std::thread::spawn({
            let flag = flag.clone();
            move || flag.store(true, Ordering::SeqCst)
        });
        spin_until(|| flag.load(Ordering::SeqCst));
        th.join().unwrap();
    }
}
