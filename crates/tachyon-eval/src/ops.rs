//! Expression operators (spec §4.G) and the clamp functor family (spec §6).
//!
//! The binary-operator caching decision is grounded on `tachy_expression.h`'s
//! `op_engine` / `op_engine_delayed_cache` split and on spec §4.D's caching
//! policy table: operands at equal non-zero cache levels fuse lazily into
//! one `DelayedCache`; operands at differing levels are evaluated eagerly
//! into the stronger (lower-numbered) cache; level-0-on-both-sides produces
//! a plain, uncached node. Overloading Rust's arithmetic traits on borrowed
//! operands (so one named vector can feed more than one subexpression, as
//! `u`/`v`/`w`/`x` do in spec §1's example) has no direct precedent in the
//! teacher crate — see DESIGN.md.

use std::cell::RefCell;
use std::ops::{Add, Div, Mul, Neg, Sub};
use std::rc::Rc;

use tachyon_common::ScalarId;

use crate::Lane;
use crate::arch::{Packed, SimdOps};
use crate::cache::Cache;
use crate::calc_vector::CalcVector;
use crate::engine::{BinOpKind, Engine, Functor, UnaryOpKind};

type CacheHandle<T> = Option<Rc<RefCell<dyn Cache<T>>>>;

/// Builds the aligned `BinOp` node for `lhs OP rhs` (spec §4.D "BinOp
/// alignment") and applies the caching-policy table.
fn combine<T: Lane>(
    op: BinOpKind,
    lhs: &CalcVector<T>,
    rhs: &CalcVector<T>,
) -> (Rc<Engine<T>>, String, CacheHandle<T>) {
    let start = lhs.start_date().max(rhs.start_date());
    let off1 = (start - lhs.start_date()).max(0) as usize;
    let off2 = (start - rhs.start_date()).max(0) as usize;
    let n = if lhs.size() == 0 {
        rhs.size().saturating_sub(off2)
    } else if rhs.size() == 0 {
        lhs.size().saturating_sub(off1)
    } else {
        (lhs.size().saturating_sub(off1)).min(rhs.size().saturating_sub(off2))
    };

    let bin_engine =
        Rc::new(Engine::bin_op(op, lhs.engine(), rhs.engine(), off1, off2, start, n));
    let text_id = format!("{}{}{}", lhs.id(), op.symbol(), rhs.id());

    let l1 = lhs.cache_level();
    let l2 = rhs.cache_level();
    if l1 == l2 {
        if l1 == 0 {
            return (bin_engine, text_id, None);
        }
        let cache = lhs
            .cache_handle()
            .or_else(|| rhs.cache_handle())
            .expect("non-zero level implies a cache handle");
        let key = cache.borrow_mut().hash_key(&text_id);
        let delayed = Rc::new(Engine::delayed_cache(key.clone(), bin_engine, cache.clone()));
        return (delayed, key, Some(cache));
    }
    // Differing levels: the smaller (stronger) one wins. If that smaller
    // level is 0, its handle is `None` and `finish_with_cache` leaves the
    // node plain, exactly matching spec §4.D's "both levels 0" case.
    let handle = if l1 < l2 { lhs.cache_handle() } else { rhs.cache_handle() };
    finish_with_cache(bin_engine, text_id, handle)
}

fn combine_scalar_rhs<T: Lane + ScalarId>(
    op: BinOpKind,
    lhs: &CalcVector<T>,
    scalar: T,
) -> (Rc<Engine<T>>, String, CacheHandle<T>) {
    let rhs_engine = Rc::new(Engine::scalar(scalar));
    let bin_engine =
        Rc::new(Engine::bin_op(op, lhs.engine(), rhs_engine, 0, 0, lhs.start_date(), lhs.size()));
    let text_id = format!("{}{}{}", lhs.id(), op.symbol(), scalar.scalar_id());
    finish_with_cache(bin_engine, text_id, lhs.cache_handle())
}

fn combine_scalar_lhs<T: Lane + ScalarId>(
    op: BinOpKind,
    scalar: T,
    rhs: &CalcVector<T>,
) -> (Rc<Engine<T>>, String, CacheHandle<T>) {
    let lhs_engine = Rc::new(Engine::scalar(scalar));
    let bin_engine =
        Rc::new(Engine::bin_op(op, lhs_engine, rhs.engine(), 0, 0, rhs.start_date(), rhs.size()));
    let text_id = format!("{}{}{}", scalar.scalar_id(), op.symbol(), rhs.id());
    finish_with_cache(bin_engine, text_id, rhs.cache_handle())
}

/// A scalar operand never carries caching "weight" of its own (spec §4.D
/// "scalar as level-infinity, no caching contribution"): the result either
/// stays plain (the cache handle is `None`, whether because the vector side
/// is level 0 or uncached) or is evaluated eagerly into whatever cache is
/// handed in — never a `DelayedCache` fusion, since fusion requires two
/// genuine chains to still be pending.
fn finish_with_cache<T: Lane>(
    bin_engine: Rc<Engine<T>>,
    text_id: String,
    cache: CacheHandle<T>,
) -> (Rc<Engine<T>>, String, CacheHandle<T>) {
    match cache {
        None => (bin_engine, text_id, None),
        Some(cache) => {
            let key = cache.borrow_mut().hash_key(&text_id);
            let rc = Rc::new(RefCell::new(bin_engine.evaluate()));
            cache.borrow_mut().force_insert(key.clone(), rc.clone());
            (Rc::new(Engine::memoised(rc)), key, Some(cache))
        }
    }
}

fn unary<T: Lane>(op: UnaryOpKind<T>, v: &CalcVector<T>) -> CalcVector<T> {
    let id = format!("{}({})", op.symbol(), v.id());
    let engine = Rc::new(Engine::unary_static(op, v.engine()));
    CalcVector::from_engine(id, engine, v.cache_handle(), false)
}

/// Wraps `v` in a `Functor` engine node under a `"<functor-id>(<operand-id>)"`
/// textual id. Shared by the clamp functors below and by [`crate::spline`]'s
/// spline-invocation operators (spec §6 "spline invocation `S(v)`").
pub(crate) fn functor<T: Lane>(f: Rc<dyn Functor<T>>, v: &CalcVector<T>) -> CalcVector<T> {
    let id = format!("{}({})", f.id(), v.id());
    let engine = Rc::new(Engine::functor(f, v.engine()));
    CalcVector::from_engine(id, engine, v.cache_handle(), false)
}

macro_rules! impl_vec_vec_op {
    ($trait:ident, $method:ident, $kind:expr) => {
        impl<T: Lane> $trait<&CalcVector<T>> for &CalcVector<T> {
            type Output = CalcVector<T>;
            fn $method(self, rhs: &CalcVector<T>) -> CalcVector<T> {
                let (engine, id, cache) = combine($kind, self, rhs);
                CalcVector::from_engine(id, engine, cache, false)
            }
        }
    };
}

impl_vec_vec_op!(Add, add, BinOpKind::Add);
impl_vec_vec_op!(Sub, sub, BinOpKind::Sub);
impl_vec_vec_op!(Mul, mul, BinOpKind::Mul);
impl_vec_vec_op!(Div, div, BinOpKind::Div);

macro_rules! impl_vec_scalar_op {
    ($trait:ident, $method:ident, $kind:expr) => {
        impl<T: Lane + ScalarId> $trait<T> for &CalcVector<T> {
            type Output = CalcVector<T>;
            fn $method(self, scalar: T) -> CalcVector<T> {
                let (engine, id, cache) = combine_scalar_rhs($kind, self, scalar);
                CalcVector::from_engine(id, engine, cache, false)
            }
        }
    };
}

impl_vec_scalar_op!(Add, add, BinOpKind::Add);
impl_vec_scalar_op!(Sub, sub, BinOpKind::Sub);
impl_vec_scalar_op!(Mul, mul, BinOpKind::Mul);
impl_vec_scalar_op!(Div, div, BinOpKind::Div);

macro_rules! impl_scalar_vec_op {
    ($scalar:ty, $trait:ident, $method:ident, $kind:expr) => {
        impl $trait<&CalcVector<$scalar>> for $scalar {
            type Output = CalcVector<$scalar>;
            fn $method(self, rhs: &CalcVector<$scalar>) -> CalcVector<$scalar> {
                let (engine, id, cache) = combine_scalar_lhs($kind, self, rhs);
                CalcVector::from_engine(id, engine, cache, false)
            }
        }
    };
}

macro_rules! impl_scalar_vec_op_for {
    ($scalar:ty) => {
        impl_scalar_vec_op!($scalar, Add, add, BinOpKind::Add);
        impl_scalar_vec_op!($scalar, Sub, sub, BinOpKind::Sub);
        impl_scalar_vec_op!($scalar, Mul, mul, BinOpKind::Mul);
        impl_scalar_vec_op!($scalar, Div, div, BinOpKind::Div);
    };
}

impl_scalar_vec_op_for!(f32);
impl_scalar_vec_op_for!(f64);

impl<T: Lane> Neg for &CalcVector<T> {
    type Output = CalcVector<T>;
    fn neg(self) -> CalcVector<T> {
        unary(UnaryOpKind::Neg, self)
    }
}

pub fn exp<T: Lane>(v: &CalcVector<T>) -> CalcVector<T> {
    unary(UnaryOpKind::Exp, v)
}

pub fn ln<T: Lane>(v: &CalcVector<T>) -> CalcVector<T> {
    unary(UnaryOpKind::Log, v)
}

pub fn abs<T: Lane>(v: &CalcVector<T>) -> CalcVector<T> {
    unary(UnaryOpKind::Abs, v)
}

/// `exp(max(lo, x))` (spec §4.G "specialised fusions"): avoids a separate
/// max node and the numerical-range fault of computing `exp` on very
/// negative arguments before clamping.
pub fn exp_clamped_lo<T: Lane>(v: &CalcVector<T>, lo: T) -> CalcVector<T> {
    unary(UnaryOpKind::ExpClampLo(lo), v)
}

/// `exp(min(hi, x))`, the upper-bound counterpart of [`exp_clamped_lo`].
pub fn exp_clamped_hi<T: Lane>(v: &CalcVector<T>, hi: T) -> CalcVector<T> {
    unary(UnaryOpKind::ExpClampHi(hi), v)
}

/// `min(v, ub)` (spec §6 clamp functor family): clips from above.
pub struct MinClip<T: Lane> {
    pub ub: T,
}

impl<T: Lane> Functor<T> for MinClip<T> {
    fn apply(&self, _i: usize, x: T) -> T {
        let reg = <T::Ops as SimdOps<T>>::min(<T::Ops as SimdOps<T>>::set1(x), <T::Ops as SimdOps<T>>::set1(self.ub));
        <T::Ops as SimdOps<T>>::to_lanes(reg)[0]
    }
    fn apply_packed(&self, _i: usize, xs: &Packed<T>) -> Packed<T> {
        let reg = <T::Ops as SimdOps<T>>::from_lanes(xs);
        let ub = <T::Ops as SimdOps<T>>::set1(self.ub);
        <T::Ops as SimdOps<T>>::to_lanes(<T::Ops as SimdOps<T>>::min(reg, ub))
    }
    fn id(&self) -> String {
        format!("MIN_CLIP({:?})", self.ub)
    }
}

/// `max(v, lb)`: clips from below.
pub struct MaxClip<T: Lane> {
    pub lb: T,
}

impl<T: Lane> Functor<T> for MaxClip<T> {
    fn apply(&self, _i: usize, x: T) -> T {
        let reg = <T::Ops as SimdOps<T>>::max(<T::Ops as SimdOps<T>>::set1(x), <T::Ops as SimdOps<T>>::set1(self.lb));
        <T::Ops as SimdOps<T>>::to_lanes(reg)[0]
    }
    fn apply_packed(&self, _i: usize, xs: &Packed<T>) -> Packed<T> {
        let reg = <T::Ops as SimdOps<T>>::from_lanes(xs);
        let lb = <T::Ops as SimdOps<T>>::set1(self.lb);
        <T::Ops as SimdOps<T>>::to_lanes(<T::Ops as SimdOps<T>>::max(reg, lb))
    }
    fn id(&self) -> String {
        format!("MAX_CLIP({:?})", self.lb)
    }
}

/// `min_max(lb, v, ub)`: clips both ways.
pub struct MinMaxClip<T: Lane> {
    pub lb: T,
    pub ub: T,
}

impl<T: Lane> Functor<T> for MinMaxClip<T> {
    fn apply(&self, _i: usize, x: T) -> T {
        let reg = <T::Ops as SimdOps<T>>::set1(x);
        let reg = <T::Ops as SimdOps<T>>::max(reg, <T::Ops as SimdOps<T>>::set1(self.lb));
        let reg = <T::Ops as SimdOps<T>>::min(reg, <T::Ops as SimdOps<T>>::set1(self.ub));
        <T::Ops as SimdOps<T>>::to_lanes(reg)[0]
    }
    fn apply_packed(&self, _i: usize, xs: &Packed<T>) -> Packed<T> {
        let reg = <T::Ops as SimdOps<T>>::from_lanes(xs);
        let reg = <T::Ops as SimdOps<T>>::max(reg, <T::Ops as SimdOps<T>>::set1(self.lb));
        let reg = <T::Ops as SimdOps<T>>::min(reg, <T::Ops as SimdOps<T>>::set1(self.ub));
        <T::Ops as SimdOps<T>>::to_lanes(reg)
    }
    fn id(&self) -> String {
        format!("MIN_MAX_CLIP({:?},{:?})", self.lb, self.ub)
    }
}

pub fn min_clip<T: Lane>(v: &CalcVector<T>, ub: T) -> CalcVector<T> {
    functor(Rc::new(MinClip { ub }), v)
}

pub fn max_clip<T: Lane>(v: &CalcVector<T>, lb: T) -> CalcVector<T> {
    functor(Rc::new(MaxClip { lb }), v)
}

pub fn min_max_clip<T: Lane>(v: &CalcVector<T>, lb: T, ub: T) -> CalcVector<T> {
    functor(Rc::new(MinMaxClip { lb, ub }), v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CalcCache;
    use tachyon_common::Date;

    fn d(yyyymm: u32) -> Date {
        Date::from_yyyymm(yyyymm).unwrap()
    }

    #[test]
    fn binop_alignment_scenario_via_operator_overload() {
        let x: Vec<f64> = (1..=10).map(|i| i as f64).collect();
        let y: Vec<f64> = (100..=109).map(|i| i as f64).collect();
        let x = CalcVector::from_values("x", d(201701), &x, None, false).unwrap();
        let y = CalcVector::from_values("y", d(201703), &y, None, false).unwrap();
        let r = &x + &y;
        assert_eq!(r.start_date(), d(201703));
        assert_eq!(r.size(), 8);
        assert_eq!(r.read(0), 3.0 + 100.0);
        assert_eq!(r.read(7), 10.0 + 107.0);
    }

    #[test]
    fn scalar_combos_compute_correctly() {
        let v = CalcVector::from_values("v", d(201701), &[1.0, 2.0, 3.0], None, false).unwrap();
        let r1 = &v * 2.0;
        assert_eq!(r1.read(0), 2.0);
        assert_eq!(r1.read(2), 6.0);
        let r2 = 10.0 - &v;
        assert_eq!(r2.read(0), 9.0);
        assert_eq!(r2.read(2), 7.0);
    }

    #[test]
    fn equal_level_operands_fuse_into_one_delayed_cache() {
        let cache: Rc<RefCell<dyn Cache<f64>>> =
            Rc::new(RefCell::new(CalcCache::<f64>::new("c1", 2).unwrap()));
        let u = CalcVector::from_values("u", d(201701), &[1.0, 2.0], Some(cache.clone()), false)
            .unwrap();
        let v = CalcVector::from_values("v", d(201701), &[3.0, 4.0], Some(cache.clone()), false)
            .unwrap();
        let r = &u + &v;
        assert!(matches!(r.engine().as_ref(), Engine::DelayedCache(_)));
        assert_eq!(cache.borrow().len(), 0);
        let forced = r.engine().force();
        assert_eq!(forced.read(0), 4.0);
        assert_eq!(cache.borrow().len(), 1);
    }

    #[test]
    fn differing_levels_evaluate_eagerly_into_stronger_cache() {
        let strong: Rc<RefCell<dyn Cache<f64>>> =
            Rc::new(RefCell::new(CalcCache::<f64>::new("strong", 1).unwrap()));
        let weak: Rc<RefCell<dyn Cache<f64>>> =
            Rc::new(RefCell::new(CalcCache::<f64>::new("weak", 2).unwrap()));
        let u = CalcVector::from_values("u", d(201701), &[1.0, 2.0], Some(strong.clone()), false)
            .unwrap();
        let v = CalcVector::from_values("v", d(201701), &[10.0, 20.0], Some(weak), false).unwrap();
        let r = &u + &v;
        assert!(matches!(r.engine().as_ref(), Engine::Memoised(_)));
        assert_eq!(strong.borrow().len(), 1);
        assert_eq!(r.read(0), 11.0);
    }

    #[test]
    fn clamp_functors_clip_correctly() {
        let v = CalcVector::from_values("v", d(201701), &[-1.0, 0.1, 0.5], None, false).unwrap();
        let clipped = min_max_clip(&v, 0.0, 0.2);
        assert_eq!(clipped.read(0), 0.0);
        assert_eq!(clipped.read(1), 0.1);
        assert_eq!(clipped.read(2), 0.2);
    }

    #[test]
    fn exp_clamp_fusion_matches_manual_max_then_exp() {
        let v = CalcVector::from_values("v", d(201701), &[-1000.0, 0.0, 1.0], None, false).unwrap();
        let fused = exp_clamped_lo(&v, -10.0);
        assert!((fused.read(0) - (-10.0f64).exp()).abs() < 1e-12);
        assert!((fused.read(2) - 1.0f64.exp()).abs() < 1e-12);
    }
}
