//! Universal algebraic properties (spec.md §8 "Universal properties"),
//! checked with `proptest` across randomly generated scalars/vectors the
//! same way `property_roundtrip.rs`-style tests do in the pack: a plain
//! `proptest! { #[test] fn ... }` block per property, no custom strategy
//! types.

use proptest::prelude::*;

use tachyon_common::Date;
use tachyon_eval::calc_vector::CalcVector;
use tachyon_eval::engine::Engine;

fn d(yyyymm: u32) -> Date {
    Date::from_yyyymm(yyyymm).unwrap()
}

proptest! {
    /// `(vec_of_x OP vec_of_y)[i] ~= x OP y` within 2*eps per element, for
    /// every arithmetic operator save division by zero.
    #[test]
    fn operator_matches_scalar_arithmetic(
        x in -1.0e6f64..1.0e6,
        y in -1.0e6f64..1.0e6,
    ) {
        let vx = CalcVector::from_values("x", d(201701), &[x; 4], None, false).unwrap();
        let vy = CalcVector::from_values("y", d(201701), &[y; 4], None, false).unwrap();

        let sum = &vx + &vy;
        let diff = &vx - &vy;
        let prod = &vx * &vy;
        prop_assert!((sum.read(0) - (x + y)).abs() <= 2.0 * f64::EPSILON * (x.abs() + y.abs() + 1.0));
        prop_assert!((diff.read(0) - (x - y)).abs() <= 2.0 * f64::EPSILON * (x.abs() + y.abs() + 1.0));
        prop_assert!((prod.read(0) - (x * y)).abs() <= 2.0 * f64::EPSILON * (x.abs() * y.abs() + 1.0));

        if y.abs() > 1e-9 {
            let quot = &vx / &vy;
            prop_assert!((quot.read(0) - (x / y)).abs() <= 1e-9 * (x / y).abs().max(1.0));
        }
    }

    /// Date alignment (spec §8): `r = x + y` starts at `max(d1, d2)` and its
    /// length is the min of each operand's suffix past that start.
    #[test]
    fn binop_alignment_matches_spec_formula(
        offset in -24i32..24,
        len_x in 1usize..40,
        len_y in 1usize..40,
    ) {
        let d1 = d(201701);
        let d2 = d1 + offset;
        let xs: Vec<f64> = (0..len_x).map(|i| i as f64).collect();
        let ys: Vec<f64> = (0..len_y).map(|i| i as f64 * 10.0).collect();
        let vx = CalcVector::from_values("x", d1, &xs, None, false).unwrap();
        let vy = CalcVector::from_values("y", d2, &ys, None, false).unwrap();

        let r = &vx + &vy;
        let expect_start = d1.max(d2);
        let off1 = (expect_start - d1).max(0) as usize;
        let off2 = (expect_start - d2).max(0) as usize;
        let expect_n = (len_x.saturating_sub(off1)).min(len_y.saturating_sub(off2));

        prop_assert_eq!(r.start_date(), expect_start);
        prop_assert_eq!(r.size(), expect_n);
        for i in 0..expect_n {
            prop_assert_eq!(r.read(i), xs[i + off1] + ys[i + off2]);
        }
    }

    /// Lag correctness (spec §8): `v[t-k][i] = v[max(0,i-k)]` when checked.
    #[test]
    fn checked_lag_clamps_to_storage_start(
        values in prop::collection::vec(-1.0e3f64..1.0e3, 1..40),
        k in 0i32..40,
    ) {
        let v = CalcVector::from_values("v", d(201701), &values, None, false).unwrap();
        let lagged = v.lag(-k);
        for i in 0..v.size() {
            let expect = values[(i as i64 - k as i64).max(0) as usize];
            prop_assert_eq!(lagged.read(i), expect);
        }
    }

    /// Reset preserves dated values (spec §8): for every month that survives
    /// into the new window, the value at that month is unchanged.
    #[test]
    fn reset_preserves_overlapping_dated_values(
        values in prop::collection::vec(-1.0e3f64..1.0e3, 1..30),
        shift in -20i32..20,
        new_len in 1usize..30,
    ) {
        use tachyon_eval::date_vector::VectorEngine;

        let start = d(201701);
        let mut v = VectorEngine::from_values(start, &values);
        let new_start = start + shift;
        v.reset(new_start, new_len);

        let overlap_start = start.max(new_start);
        let overlap_end_old = start + values.len() as i32;
        let overlap_end_new = new_start + new_len as i32;
        let overlap_end = overlap_end_old.min(overlap_end_new);

        let mut m = overlap_start;
        while m - overlap_end < 0 {
            let old_i = (m - start) as usize;
            let new_i = (m - new_start) as usize;
            prop_assert_eq!(v.read(new_i), values[old_i]);
            m = m + 1;
        }
    }

    /// Idempotence of force (spec §8): calling `force()` on a `DelayedCache`
    /// twice yields the same stored `VectorEngine` pointer.
    #[test]
    fn force_is_idempotent(values in prop::collection::vec(-1.0e2f64..1.0e2, 1..20)) {
        use std::cell::RefCell;
        use std::rc::Rc;
        use tachyon_eval::cache::{Cache, CalcCache};

        let cache: Rc<RefCell<dyn Cache<f64>>> =
            Rc::new(RefCell::new(CalcCache::<f64>::new("c", 1).unwrap()));
        let u = CalcVector::from_values("u", d(201701), &values, Some(cache.clone()), false)
            .unwrap();
        let v = CalcVector::from_values("v", d(201701), &values, Some(cache.clone()), false)
            .unwrap();
        let r = &u + &v;
        prop_assert!(matches!(r.engine().as_ref(), Engine::DelayedCache(_)));

        let forced_once = r.engine().force();
        let forced_twice = r.engine().force();
        let (Engine::Memoised(a), Engine::Memoised(b)) =
            (forced_once.as_ref(), forced_twice.as_ref())
        else {
            panic!("force() must return Memoised");
        };
        prop_assert!(Rc::ptr_eq(a, b));
    }
}
