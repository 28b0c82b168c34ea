//! Aligned contiguous storage (spec §4.B), grounded on
//! `tachy_aligned_allocator.h`'s `aligned_malloc`/`aligned_free` pair and on
//! `tachy_vector_engine.h`'s `storage_t` member. Implemented directly with
//! `std::alloc` rather than a crate: the buffer's only requirement is
//! alignment to `W * size_of::<T>()`, which `Layout` expresses exactly, and
//! the original's own `aligned_allocator` is itself a thin wrapper over the
//! platform allocator — there's no behaviour here an external crate would
//! add.

use std::alloc::{Layout, alloc_zeroed, dealloc, handle_alloc_error};
use std::ptr::NonNull;

use tachyon_common::{TachyonError, TachyonErrorKind};

use crate::Lane;
use crate::arch::{Packed, SimdOps};

/// Owns a zero-initialised buffer of `T`, capacity rounded up to a multiple
/// of the active lane width and aligned to `W * size_of::<T>()` bytes.
pub struct AlignedStorage<T: Lane> {
    ptr: NonNull<T>,
    len: usize,
    cap: usize,
}

unsafe impl<T: Lane + Send> Send for AlignedStorage<T> {}
unsafe impl<T: Lane + Sync> Sync for AlignedStorage<T> {}

fn lane_width<T: Lane>() -> usize {
    <T::Ops as SimdOps<T>>::WIDTH
}

fn round_up(n: usize, multiple: usize) -> usize {
    if multiple <= 1 {
        return n;
    }
    n.div_ceil(multiple) * multiple
}

fn layout_for<T: Lane>(cap: usize) -> Layout {
    let align = lane_width::<T>() * std::mem::size_of::<T>();
    let align = align.max(std::mem::align_of::<T>());
    Layout::from_size_align(cap * std::mem::size_of::<T>(), align).expect("valid layout")
}

impl<T: Lane> AlignedStorage<T> {
    /// Allocates a zero-filled buffer of exactly `len` logical elements.
    pub fn new(len: usize) -> Result<Self, TachyonError> {
        let w = lane_width::<T>();
        let cap = round_up(len.max(1), w);
        let layout = layout_for::<T>(cap);
        let ptr = unsafe { alloc_zeroed(layout) } as *mut T;
        let Some(ptr) = NonNull::new(ptr) else {
            handle_alloc_error(layout);
        };
        Ok(Self { ptr, len, cap })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[T] {
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    pub fn get(&self, i: usize) -> T {
        self.as_slice()[i]
    }

    pub fn set(&mut self, i: usize, v: T) {
        self.as_mut_slice()[i] = v;
    }

    /// Capacity in elements: `len` rounded up to a multiple of the active
    /// lane width, always zero-initialised past `len`. Packed reads/writes
    /// may touch this padding; it never holds meaningful data.
    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Loads `WIDTH` consecutive lanes starting at `i`. Requires
    /// `i + WIDTH <= cap()` — reads may dip into the zero-padded tail past
    /// `len`, never past the allocation. Callers that need exactly `len`
    /// logical values fall back to scalar reads for a partial final lane
    /// (spec §4.F).
    pub fn load_packed(&self, i: usize) -> Packed<T> {
        let w = lane_width::<T>();
        debug_assert!(i + w <= self.cap);
        unsafe {
            let reg = <T::Ops as SimdOps<T>>::load_unaligned(self.ptr.as_ptr().add(i));
            <T::Ops as SimdOps<T>>::to_lanes(reg)
        }
    }

    /// Stores `WIDTH` consecutive lanes starting at `i`. Same bounds
    /// contract as [`Self::load_packed`].
    pub fn store_packed(&mut self, i: usize, lanes: &[T]) {
        let w = lane_width::<T>();
        debug_assert!(i + w <= self.cap);
        debug_assert_eq!(lanes.len(), w);
        unsafe {
            let reg = <T::Ops as SimdOps<T>>::from_lanes(lanes);
            <T::Ops as SimdOps<T>>::store_unaligned(self.ptr.as_mut_ptr().add(i), reg);
        }
    }

    /// Grows or shrinks in place, preserving existing contents at unchanged
    /// indices (spec §4.B); new tail elements, if any, are zeroed.
    pub fn resize(&mut self, new_len: usize) -> Result<(), TachyonError> {
        let w = lane_width::<T>();
        let new_cap = round_up(new_len.max(1), w);
        if new_cap != self.cap {
            let mut replacement = Self::new(new_len).map_err(|_| {
                TachyonError::new(TachyonErrorKind::AlignmentAllocationFailure)
            })?;
            let common = self.len.min(new_len);
            replacement.as_mut_slice()[..common].copy_from_slice(&self.as_slice()[..common]);
            *self = replacement;
        } else {
            if new_len > self.len {
                self.as_mut_slice()[self.len..new_len].fill(zero_of::<T>());
            }
            self.len = new_len;
        }
        Ok(())
    }

    /// Shifts contents left by `shift` elements (dropping the first `shift`
    /// values) and zero-fills the freed tail. Used by `reset()` when the
    /// new start date is later than the old one.
    pub fn shift_left_zero_fill(&mut self, shift: usize) {
        let len = self.len;
        if shift == 0 {
            return;
        }
        if shift >= len {
            self.as_mut_slice().fill(zero_of::<T>());
            return;
        }
        self.as_mut_slice().copy_within(shift..len, 0);
        self.as_mut_slice()[len - shift..].fill(zero_of::<T>());
    }

    /// Shifts contents right by `shift` elements and zero-fills the freed
    /// prefix. Used by `reset()` when the new start date is earlier.
    pub fn shift_right_zero_fill(&mut self, shift: usize) {
        let len = self.len;
        if shift == 0 {
            return;
        }
        if shift >= len {
            self.as_mut_slice().fill(zero_of::<T>());
            return;
        }
        self.as_mut_slice().copy_within(0..len - shift, shift);
        self.as_mut_slice()[..shift].fill(zero_of::<T>());
    }
}

fn zero_of<T: Lane>() -> T {
    T::ZERO
}

impl<T: Lane> Drop for AlignedStorage<T> {
    fn drop(&mut self) {
        let layout = layout_for::<T>(self.cap);
        unsafe {
            dealloc(self.ptr.as_ptr() as *mut u8, layout);
        }
    }
}

impl<T: Lane> Clone for AlignedStorage<T> {
    fn clone(&self) -> Self {
        let mut out = Self::new(self.len).expect("aligned allocation failed during clone");
        out.as_mut_slice().copy_from_slice(self.as_slice());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_initialised_on_construction() {
        let s = AlignedStorage::<f64>::new(5).unwrap();
        assert_eq!(s.as_slice(), &[0.0; 5]);
    }

    #[test]
    fn resize_preserves_prefix_and_zero_fills_tail() {
        let mut s = AlignedStorage::<f64>::new(3).unwrap();
        s.set(0, 1.0);
        s.set(1, 2.0);
        s.set(2, 3.0);
        s.resize(5).unwrap();
        assert_eq!(s.as_slice(), &[1.0, 2.0, 3.0, 0.0, 0.0]);
        s.resize(2).unwrap();
        assert_eq!(s.as_slice(), &[1.0, 2.0]);
    }

    #[test]
    fn shift_left_drops_prefix_and_zero_fills_tail() {
        let mut s = AlignedStorage::<f64>::new(4).unwrap();
        for i in 0..4 {
            s.set(i, (i + 1) as f64);
        }
        s.shift_left_zero_fill(2);
        assert_eq!(s.as_slice(), &[3.0, 4.0, 0.0, 0.0]);
    }

    #[test]
    fn shift_right_drops_suffix_and_zero_fills_prefix() {
        let mut s = AlignedStorage::<f64>::new(4).unwrap();
        for i in 0..4 {
            s.set(i, (i + 1) as f64);
        }
        s.shift_right_zero_fill(2);
        assert_eq!(s.as_slice(), &[0.0, 0.0, 1.0, 2.0]);
    }

    #[test]
    fn packed_round_trip() {
        let mut s = AlignedStorage::<f64>::new(8).unwrap();
        for i in 0..8 {
            s.set(i, i as f64);
        }
        let lanes = s.load_packed(0);
        let w = lanes.len();
        let mut scratch = vec![0.0; w];
        for i in 0..w {
            scratch[i] = lanes[i] * 2.0;
        }
        s.store_packed(0, &scratch);
        assert_eq!(&s.as_slice()[..w], &scratch[..]);
    }
}
