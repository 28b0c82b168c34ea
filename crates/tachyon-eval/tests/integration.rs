//! Cross-module integration behaviour that doesn't belong to any single
//! source file: date-aligned binary operators, cache fusion end to end, and
//! spline continuity, exercised through the public `CalcVector`/`ops`/
//! `spline` surface rather than any one module's internals.

use std::cell::RefCell;
use std::rc::Rc;

use tachyon_common::Date;
use tachyon_eval::cache::{Cache, CalcCache};
use tachyon_eval::calc_vector::CalcVector;
use tachyon_eval::ops;
use tachyon_eval::spline::{IncrSlopeSpline, Spline, spline};

fn d(yyyymm: u32) -> Date {
    Date::from_yyyymm(yyyymm).unwrap()
}

#[test]
fn misaligned_vectors_combine_on_their_overlapping_window() {
    let a: Vec<f64> = (0..12).map(|i| i as f64).collect();
    let b: Vec<f64> = (0..12).map(|i| (i * 10) as f64).collect();
    let va = CalcVector::from_values("a", d(201701), &a, None, false).unwrap();
    let vb = CalcVector::from_values("b", d(201704), &b, None, false).unwrap();

    let sum = &va + &vb;
    assert_eq!(sum.start_date(), d(201704));
    assert_eq!(sum.size(), 9);
    // a's index 3 (201704) aligns with b's index 0.
    assert_eq!(sum.read(0), 3.0 + 0.0);
    assert_eq!(sum.read(8), 11.0 + 80.0);
}

#[test]
fn same_level_chain_fuses_and_forces_once_into_cache() {
    let cache: Rc<RefCell<dyn Cache<f64>>> =
        Rc::new(RefCell::new(CalcCache::<f64>::new("shared", 1).unwrap()));
    let u = CalcVector::from_values("u", d(201701), &[1.0, 2.0, 3.0], Some(cache.clone()), false)
        .unwrap();
    let v = CalcVector::from_values("v", d(201701), &[10.0, 20.0, 30.0], Some(cache.clone()), false)
        .unwrap();
    let w = CalcVector::from_values("w", d(201701), &[100.0, 200.0, 300.0], Some(cache.clone()), false)
        .unwrap();

    let sum = &(&u + &v) + &w;
    assert_eq!(cache.borrow().len(), 0, "nothing forced yet");
    // Plain reads stay lazy (`Engine::read` on a `DelayedCache` falls
    // through to the inner engine, spec §4.D); only `force()` or an
    // assignment into a `Stored` target materialises it into the cache.
    assert_eq!(sum.read(0), 111.0);
    assert_eq!(sum.read(2), 333.0);
    assert_eq!(cache.borrow().len(), 0, "reads alone must not force the delayed cache");

    let forced = sum.engine().force();
    assert_eq!(forced.read(0), 111.0);
    assert_eq!(forced.read(2), 333.0);
    assert!(cache.borrow().len() >= 1, "forcing should have materialised at least one entry");
}

#[test]
fn spline_applied_through_a_calc_vector_is_continuous_across_break_points() {
    let nodes: Vec<(f64, f64)> = vec![
        (0.0, 0.02),
        (0.1, 0.05),
        (0.3, 0.08),
        (0.4, 0.02),
        (0.5, -0.02),
        (0.6, -0.05),
        (0.75, -0.08),
        (0.85, -0.02),
    ];
    let s = Rc::new(Spline::from_incr_slopes("curve", &nodes).unwrap());
    let oracle = IncrSlopeSpline::new("curve", &nodes);

    let xs: Vec<f64> = (0..200).map(|i| -0.1 + i as f64 * 0.01).collect();
    let v = CalcVector::from_values("xs", d(201701), &xs, None, false).unwrap();
    let out = spline(s, &v);

    for i in 0..out.size() {
        let got = out.read(i);
        let want = oracle.eval(xs[i]);
        assert!((got - want).abs() < 1e-8, "i={i} got={got} want={want}");
    }
}

#[test]
fn clamp_and_spline_compose_through_the_same_operator_surface() {
    let nodes: Vec<(f64, f64)> = vec![(0.0, 0.02), (0.2, 0.08), (0.4, -0.05)];
    let s = Rc::new(Spline::from_incr_slopes("curve", &nodes).unwrap());
    let v = CalcVector::from_values("xs", d(201701), &[0.0, 0.1, 0.3, 0.5], None, false).unwrap();

    let curved = spline(s, &v);
    let clipped = ops::min_max_clip(&curved, -0.01, 0.01);
    for i in 0..clipped.size() {
        assert!(clipped.read(i) >= -0.01 - 1e-12 && clipped.read(i) <= 0.01 + 1e-12);
    }
}
