//! The user-facing calc-vector handle (spec §3/§4.F), grounded on
//! `tachy_calc_vector.h` for the assignment protocol and on the teacher's
//! `formualizer-eval` facade types for the general shape of a cache-aware,
//! id-carrying owning handle.
//!
//! A `CalcVector` constructed [`CalcVector::from_values`] owns a real
//! [`VectorEngine`] (`own_engine = true`) and is the only kind that can be
//! the target of [`CalcVector::assign`]. A `CalcVector` constructed
//! [`CalcVector::from_engine`] (produced by the operator overloads in
//! [`crate::ops`], or by [`CalcVector::lag`]) is a read-only view over a
//! lazy expression — it has nothing to write into, so assigning into it
//! simply rebinds the view.

use std::cell::RefCell;
use std::rc::Rc;

use tachyon_common::{Date, TachyonError, TachyonErrorKind};

use crate::Lane;
use crate::arch::{Packed, SimdOps};
use crate::cache::Cache;
use crate::date_vector::VectorEngine;
use crate::engine::Engine;

pub struct CalcVector<T: Lane> {
    id: String,
    engine: Rc<Engine<T>>,
    cache: Option<Rc<RefCell<dyn Cache<T>>>>,
    own_engine: bool,
    do_cache: bool,
}

impl<T: Lane> CalcVector<T> {
    /// Copies `values` into a freshly owned [`VectorEngine`] (spec §4.F
    /// "Construction from (id, start_date, values, cache, do_cache)"). Fails
    /// with [`TachyonErrorKind::DuplicateKey`] if `id` is already present in
    /// `cache`.
    pub fn from_values(
        id: impl Into<String>,
        start_date: Date,
        values: &[T],
        cache: Option<Rc<RefCell<dyn Cache<T>>>>,
        do_cache: bool,
    ) -> Result<Self, TachyonError> {
        let id = id.into();
        if let Some(c) = &cache {
            if c.borrow().contains(&id) {
                return Err(TachyonError::new(TachyonErrorKind::DuplicateKey)
                    .with_message(format!("{id} already present in cache")));
            }
        }
        let storage = Rc::new(RefCell::new(VectorEngine::from_values(start_date, values)));
        Ok(Self {
            id,
            engine: Rc::new(Engine::Stored(storage)),
            cache,
            own_engine: true,
            do_cache,
        })
    }

    /// Wraps an arbitrary lazy `engine` under `id` (spec §4.F "Construction
    /// from another engine"). The result is a view: it has no storage of its
    /// own, so [`Self::assign`] on it only rebinds the view.
    pub fn from_engine(
        id: impl Into<String>,
        engine: Rc<Engine<T>>,
        cache: Option<Rc<RefCell<dyn Cache<T>>>>,
        do_cache: bool,
    ) -> Self {
        Self {
            id: id.into(),
            engine,
            cache,
            own_engine: false,
            do_cache,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn engine(&self) -> Rc<Engine<T>> {
        self.engine.clone()
    }

    /// The cache this vector is registered against, if any (used by
    /// [`crate::ops`] to decide eager vs delayed fusion per spec §4.D).
    pub fn cache_handle(&self) -> Option<Rc<RefCell<dyn Cache<T>>>> {
        self.cache.clone()
    }

    /// `0` when uncached, matching spec §3's "scalar is level-infinity, no
    /// caching contribution" treatment being handled separately by callers.
    pub fn cache_level(&self) -> u32 {
        self.cache.as_ref().map(|c| c.borrow().level()).unwrap_or(0)
    }

    pub fn size(&self) -> usize {
        self.engine.size()
    }

    pub fn start_date(&self) -> Date {
        self.engine.start_date()
    }

    pub fn read(&self, i: usize) -> T {
        self.engine.read(i)
    }

    pub fn packed(&self, i: usize) -> Packed<T> {
        self.engine.packed(i)
    }

    /// `drop()` in spec §4.F/§6: stops this instance from registering itself
    /// into its cache on destruction.
    pub fn disable_caching(&mut self) {
        self.do_cache = false;
    }

    /// `keep()` in spec §4.F/§6: the inverse of [`Self::disable_caching`].
    pub fn enable_caching(&mut self) {
        self.do_cache = true;
    }

    /// Lag subscript `v[t+k]` (spec §4.F): returns a view wrapping a `Lag`
    /// engine with shift `-k` (lag inverts the offset sign). Checked by
    /// default, matching spec §6's default lag semantics.
    pub fn lag(&self, k: i32) -> CalcVector<T> {
        self.lag_with(k, true)
    }

    pub fn lag_with(&self, k: i32, checked: bool) -> CalcVector<T> {
        let shift = -k;
        let inner = self.engine.clone();
        let lagged = Rc::new(Engine::lag(inner, shift, checked));
        let id = format!("{}[t{:+}]", self.id, k);
        CalcVector::from_engine(id, lagged, self.cache.clone(), false)
    }

    pub fn debug_print(&self) {
        let n = self.size();
        print!("{} @ {}: [", self.id, self.start_date());
        for i in 0..n {
            if i > 0 {
                print!(", ");
            }
            print!("{:?}", self.read(i));
        }
        println!("]");
    }

    /// Assignment (spec §4.F). Follows the four numbered steps: cached-reassign
    /// check, forcing a top-level `DelayedCache`, aliasing-guard detection,
    /// then either scalar-sequential or packed-lane evaluation.
    pub fn assign(&mut self, rhs: Rc<Engine<T>>) -> Result<(), TachyonError> {
        if let Some(cache) = &self.cache {
            if cache.borrow().contains(&self.id) {
                return Err(TachyonError::new(TachyonErrorKind::CachedReassign)
                    .with_message(format!("{} is already registered in its cache", self.id)));
            }
        }

        let rhs = match rhs.as_ref() {
            Engine::DelayedCache(_) => rhs.force(),
            _ => rhs,
        };

        if !self.own_engine {
            self.engine = rhs;
            return Ok(());
        }

        let storage = match self.engine.as_ref() {
            Engine::Stored(v) => v.clone(),
            _ => unreachable!("own_engine invariant: engine is always Stored when own_engine"),
        };

        let aliased = storage.borrow().is_guarded() && rhs.depends_on(&storage);
        if aliased {
            crate::trace!(id = %self.id, "assign: aliased self-reference, scalar sequential path");
            assign_scalar_sequential(&storage, &rhs);
        } else {
            crate::trace!(id = %self.id, "assign: packed path");
            assign_packed(&storage, &rhs);
        }
        Ok(())
    }
}

impl<T: Lane> Drop for CalcVector<T> {
    fn drop(&mut self) {
        if self.do_cache && self.own_engine {
            if let Some(cache) = &self.cache {
                let mut cache = cache.borrow_mut();
                if !cache.contains(&self.id) {
                    if let Engine::Stored(v) = self.engine.as_ref() {
                        cache.force_insert(self.id.clone(), v.clone());
                    }
                }
            }
        }
    }
}

/// Step 3 of spec §4.F assignment: ascending-index scalar writes, so a
/// lag-of-self read at `i-k` on the right observes the value this loop just
/// wrote at `i-k`, not the pre-assignment one.
fn assign_scalar_sequential<T: Lane>(storage: &Rc<RefCell<VectorEngine<T>>>, rhs: &Rc<Engine<T>>) {
    let n = storage.borrow().size();
    for i in 0..n {
        let v = rhs.read(i);
        storage.borrow_mut().write(i, v);
    }
}

/// Step 4 of spec §4.F assignment: date-aligned packed-lane evaluation with
/// a scalar prefix/tail around the aligned body, and carry-forward fill for
/// any indices past the overlap of `rhs` and `self`.
fn assign_packed<T: Lane>(storage: &Rc<RefCell<VectorEngine<T>>>, rhs: &Rc<Engine<T>>) {
    let self_start = storage.borrow().start_date();
    let self_len = storage.borrow().size();
    let rhs_start = rhs.start_date();
    let rhs_len = rhs.size();

    let delta = rhs_start - self_start;
    let i_tgt = delta.max(0) as usize;
    let i_src = (-delta).max(0) as usize;
    let n = rhs_len.saturating_sub(i_src).min(self_len.saturating_sub(i_tgt));

    let w = <T::Ops as SimdOps<T>>::WIDTH;
    let aligned_entry = i_tgt % w == 0 && i_src % w == 0 && (i_src == 0 || i_tgt == 0);

    let mut k = 0usize;
    if !aligned_entry && w > 1 {
        let rem = i_tgt % w;
        let prefix = if rem == 0 { 0 } else { (w - rem).min(n) };
        while k < prefix {
            let v = rhs.read(i_src + k);
            storage.borrow_mut().write(i_tgt + k, v);
            k += 1;
        }
    }
    while k + w <= n {
        let lanes = rhs.packed(i_src + k);
        storage.borrow_mut().store_packed_aligned(i_tgt + k, &lanes);
        k += w;
    }
    while k < n {
        let v = rhs.read(i_src + k);
        storage.borrow_mut().write(i_tgt + k, v);
        k += 1;
    }

    if n > 0 {
        let last = storage.borrow().read(i_tgt + n - 1);
        for j in (i_tgt + n)..self_len {
            storage.borrow_mut().write(j, last);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CalcCache;
    use crate::engine::BinOpKind;

    fn d(yyyymm: u32) -> Date {
        Date::from_yyyymm(yyyymm).unwrap()
    }

    #[test]
    fn construction_rejects_duplicate_cache_key() {
        let cache: Rc<RefCell<dyn Cache<f64>>> =
            Rc::new(RefCell::new(CalcCache::<f64>::new("c1", 1).unwrap()));
        let _v1 = CalcVector::from_values("v", d(201701), &[1.0, 2.0], Some(cache.clone()), true)
            .unwrap();
        drop(_v1); // registers "v" into the cache on drop
        let err = CalcVector::from_values("v", d(201701), &[3.0, 4.0], Some(cache), true)
            .unwrap_err();
        assert_eq!(err, TachyonErrorKind::DuplicateKey);
    }

    #[test]
    fn reassigning_a_cached_vector_fails() {
        let cache: Rc<RefCell<dyn Cache<f64>>> =
            Rc::new(RefCell::new(CalcCache::<f64>::new("c1", 1).unwrap()));
        let mut v =
            CalcVector::from_values("v", d(201701), &[1.0, 2.0], Some(cache.clone()), false)
                .unwrap();
        // Registered out-of-band (e.g. by an earlier drop of another handle
        // sharing the same id) so `assign` must see it and refuse.
        cache.borrow_mut().force_insert(
            "v".into(),
            Rc::new(RefCell::new(VectorEngine::from_values(d(201701), &[9.0, 9.0]))),
        );
        let err = v.assign(Rc::new(Engine::scalar(5.0))).unwrap_err();
        assert_eq!(err, TachyonErrorKind::CachedReassign);
    }

    #[test]
    fn packed_assignment_aligns_and_carries_tail_forward() {
        let mut target = CalcVector::from_values(
            "r",
            d(201701),
            &[0.0; 12],
            None,
            false,
        )
        .unwrap();
        let x: Vec<f64> = (1..=10).map(|i| i as f64).collect();
        let x = CalcVector::from_values("x", d(201703), &x, None, false).unwrap();
        target.assign(x.engine()).unwrap();
        assert_eq!(target.read(0), 0.0);
        assert_eq!(target.read(1), 0.0);
        assert_eq!(target.read(2), 1.0);
        assert_eq!(target.read(11), 10.0);
    }

    #[test]
    fn lag_subscript_inverts_k_into_shift() {
        let v = CalcVector::from_values("v", d(201701), &[10.0, 20.0, 30.0], None, false).unwrap();
        let lagged = v.lag(-1);
        assert_eq!(lagged.read(0), 10.0);
        assert_eq!(lagged.read(1), 10.0);
        assert_eq!(lagged.read(2), 20.0);
    }

    #[test]
    fn self_referential_recurrence_uses_scalar_sequential_path() {
        let mut v =
            CalcVector::from_values("v", d(201701), &[0.1, 0.0, 0.0, 0.0], None, false).unwrap();
        let lagged = Rc::new(Engine::lag(v.engine(), 1, true));
        let rhs = Rc::new(Engine::bin_op(
            BinOpKind::Add,
            lagged,
            v.engine(),
            0,
            0,
            v.start_date(),
            v.size(),
        ));
        v.assign(rhs).unwrap();
        // Ascending scalar writes mean each step reads the just-updated
        // predecessor: v[0] = v_orig[0] + v_orig[0]; v[i>0] = v[i-1]_new + v_orig[i].
        assert_eq!(v.read(0), 0.2);
        assert_eq!(v.read(1), 0.2);
        assert_eq!(v.read(2), 0.2);
        assert_eq!(v.read(3), 0.2);
    }
}
