//! The dated, owning vector engine (spec §3/§4.C), grounded on
//! `tachy_vector_engine.h`: aligned storage anchored to a start [`Date`],
//! plus the aliasing-guard reference count that `Lag` engines register
//! against (spec §4.I).

use rustc_hash::FxHashSet;

use tachyon_common::Date;

use crate::Lane;
use crate::arch::{Packed, SimdOps};
use crate::storage::AlignedStorage;

/// Monotone source of guard identities, so distinct `Lag` engine instances
/// (including ones produced by cloning) never collide in a `VectorEngine`'s
/// guard set. Stands in for the original's back-reference identity
/// (DESIGN NOTES (iii)).
static NEXT_GUARD_ID: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(1);

pub fn next_guard_id() -> u64 {
    NEXT_GUARD_ID.fetch_add(1, std::sync::atomic::Ordering::Relaxed)
}

/// Owning, date-anchored storage: the only engine variant that holds data
/// rather than deriving it.
#[derive(Clone)]
pub struct VectorEngine<T: Lane> {
    data: AlignedStorage<T>,
    start_date: Date,
    guard: FxHashSet<u64>,
}

impl<T: Lane> VectorEngine<T> {
    pub fn from_values(start_date: Date, values: &[T]) -> Self {
        let mut data = AlignedStorage::new(values.len()).expect("aligned allocation failed");
        data.as_mut_slice().copy_from_slice(values);
        Self {
            data,
            start_date,
            guard: FxHashSet::default(),
        }
    }

    pub fn zeros(start_date: Date, len: usize) -> Self {
        Self {
            data: AlignedStorage::new(len).expect("aligned allocation failed"),
            start_date,
            guard: FxHashSet::default(),
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn start_date(&self) -> Date {
        self.start_date
    }

    pub fn read(&self, i: usize) -> T {
        self.data.get(i)
    }

    pub fn write(&mut self, i: usize, v: T) {
        self.data.set(i, v);
    }

    pub fn as_slice(&self) -> &[T] {
        self.data.as_slice()
    }

    pub fn packed(&self, i: usize) -> Packed<T> {
        let w = <T::Ops as SimdOps<T>>::WIDTH;
        if i + w <= self.data.len() {
            self.data.load_packed(i)
        } else {
            // Partial tail: gather whatever logical values remain, scalar.
            (i..self.data.len()).map(|j| self.data.get(j)).collect()
        }
    }

    pub fn store_packed_aligned(&mut self, i: usize, lanes: &[T]) {
        self.data.store_packed(i, lanes);
    }

    /// `add_guard`/`remove_guard`/`is_guarded` (spec §4.C): a `Lag` engine
    /// with positive shift registers itself here on construction and
    /// deregisters on drop.
    pub fn add_guard(&mut self, guard_id: u64) {
        self.guard.insert(guard_id);
    }

    pub fn remove_guard(&mut self, guard_id: u64) {
        self.guard.remove(&guard_id);
    }

    pub fn is_guarded(&self) -> bool {
        !self.guard.is_empty()
    }

    /// Date-preserving reset (spec §4.C, Open Question (i)): shifts existing
    /// values so index `i` keeps corresponding to the same calendar month
    /// whenever that month survives into the new window.
    pub fn reset(&mut self, new_date: Date, new_size: usize) {
        let delta = new_date - self.start_date;
        crate::trace!(
            old_start = %self.start_date,
            new_start = %new_date,
            delta,
            new_size,
            "vector_engine reset"
        );
        match delta.cmp(&0) {
            std::cmp::Ordering::Greater => {
                self.data.shift_left_zero_fill(delta as usize);
                self.data.resize(new_size).expect("aligned allocation failed");
            }
            std::cmp::Ordering::Less => {
                self.data.resize(new_size).expect("aligned allocation failed");
                self.data.shift_right_zero_fill((-delta) as usize);
            }
            std::cmp::Ordering::Equal => {
                self.data.resize(new_size).expect("aligned allocation failed");
            }
        }
        self.start_date = new_date;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(yyyymm: u32) -> Date {
        Date::from_yyyymm(yyyymm).unwrap()
    }

    #[test]
    fn reset_forward_shifts_and_truncates() {
        let values: Vec<f64> = (0..12).map(|i| i as f64).collect();
        let mut v = VectorEngine::from_values(d(201701), &values);
        v.reset(d(201704), 12);
        assert_eq!(v.start_date(), d(201704));
        assert_eq!(v.size(), 12);
        assert_eq!(&v.as_slice()[0..8], &[3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0]);
        assert_eq!(&v.as_slice()[9..12], &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn reset_backward_prepends_zeros() {
        let values: Vec<f64> = (0..4).map(|i| (i + 1) as f64).collect();
        let mut v = VectorEngine::from_values(d(201703), &values);
        v.reset(d(201701), 6);
        assert_eq!(v.start_date(), d(201701));
        assert_eq!(v.as_slice(), &[0.0, 0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn guard_set_tracks_liveness() {
        let mut v = VectorEngine::<f64>::zeros(d(201701), 4);
        assert!(!v.is_guarded());
        v.add_guard(1);
        v.add_guard(2);
        assert!(v.is_guarded());
        v.remove_guard(1);
        assert!(v.is_guarded());
        v.remove_guard(2);
        assert!(!v.is_guarded());
    }
}
