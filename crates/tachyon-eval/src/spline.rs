//! Piecewise-linear spline functors (spec §1 item 4, §3 "Spline S<T>", §4.H).
//!
//! Three families, each grounded on its own original header:
//! - [`IncrSlopeSpline`] — `tachy_linear_spline_incr_slope.h`: an O(n)-per-call
//!   direct sum of `slope_k * max(0, x - x_k)` over every break point. No
//!   uniform-grid requirement; this is also the independent oracle spec §8
//!   scenario 4 checks the faster families against.
//! - [`Spline`] — `tachy_linear_spline_uniform_index.h`, the variant spec
//!   §4.H walks through step by step: break points resampled onto a uniform
//!   grid plus a gather-indirected `idx` map, so evaluation is one gather
//!   plus one `fmadd` regardless of how many break points there are.
//! - [`TimeDependentSpline`] — `tachy_mod_linear_spline_uniform.h`: layers a
//!   per-break-point multiplicative modulation on top of a [`Spline`],
//!   producing a `(time × interval)` table instead of a single row.
//!
//! All three implement [`Functor`], so [`spline`] wraps any of them into a
//! `CalcVector` exactly the way [`crate::ops::min_clip`] and friends wrap the
//! clamp functors.

use std::rc::Rc;

use smallvec::SmallVec;
use tachyon_common::{Result, TachyonError, TachyonErrorKind};

use crate::Lane;
use crate::arch::{Packed, SimdOps, floor_to_int};
use crate::calc_vector::CalcVector;
use crate::engine::Functor;

/// `spline_util<NumType>::epsilon()` (spec §4.H step 1): the unit grid-step
/// detection is scaled by before integerising.
const GRID_EPSILON: f64 = 1e-6;

/// How a [`Spline`]'s break points are interpreted (spec §3 "init mode").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitMode {
    /// Nodes are `(x, y)` pairs; the interval between consecutive nodes gets
    /// its own independent slope. Cannot be modulated (spec §4.H "Failure
    /// modes").
    FromXyPoints,
    /// Nodes are `(x, slope)` pairs; slopes accumulate left to right
    /// (`b[i] = b[i-1] + slope[i-1]`).
    FromIncrSlopes,
    /// Nodes are `(x, slope)` pairs; each interval's slope is used as-is,
    /// not accumulated (`b[i] = slope[i-1]`).
    FromLocalSlopes,
}

/// Binary GCD (`tachy_spline_util.h::gcd`), used to find the common grid
/// step across break-point deltas (spec §4.H step 1).
fn gcd_u32(mut u: u32, mut v: u32) -> u32 {
    while v != 0 {
        let t = v;
        v = u % v;
        u = t;
    }
    u
}

/// Verifies the break points in `xs` lie on a common grid (spec §4.H step 1):
/// scales each adjacent delta by `1/GRID_EPSILON`, rounds to the nearest
/// integer, and takes the GCD across all of them. Returns the grid step in
/// `xs`'s own units. Fails with [`TachyonErrorKind::NonUniform`] if no common
/// divisor exists (all deltas round to zero, or there are none to compare).
fn uniform_grid_step<T: Lane>(xs: &[T]) -> Result<f64> {
    if xs.len() < 2 {
        return Err(TachyonError::new(TachyonErrorKind::NonUniform)
            .with_message("spline needs at least two break points to detect a grid step"));
    }
    let steps: Vec<u32> = xs
        .windows(2)
        .map(|w| (((w[1].to_f64() - w[0].to_f64()) / GRID_EPSILON) + 0.5) as u32)
        .collect();
    let d0 = steps.iter().copied().reduce(gcd_u32).unwrap_or(0);
    if d0 == 0 {
        return Err(TachyonError::new(TachyonErrorKind::NonUniform)
            .with_message("spline break points share no common grid step"));
    }
    Ok(d0 as f64 * GRID_EPSILON)
}

/// Walks the uniform grid cell by cell (spec §4.H step 4): `idx[k]` is the
/// greatest interval index whose break point lies at or before the cell
/// centre `x0 + (k+0.5)*delta`. Mirrors the original's forward-scan
/// construction rather than a binary search per cell, since break points are
/// monotone and the whole table is built once.
fn build_index_map<T: Lane>(x0: T, delta: f64, node_xs: &[T], cell_count: usize) -> Vec<i32> {
    let mut out = Vec::with_capacity(cell_count);
    if cell_count == 0 {
        return out;
    }
    let mut idx: i32 = 0;
    let mut x = x0.to_f64() + 0.5 * delta;
    out.push(idx);
    for _ in 1..cell_count {
        x += delta;
        if (idx as usize) < node_xs.len() && x > node_xs[idx as usize].to_f64() {
            idx += 1;
        }
        out.push(idx);
    }
    out
}

/// Direct, non-uniform piecewise-linear spline (spec §1 item 4
/// "incremental-slope"). `S(x) = Σ slope_k · max(0, x - x_k)`. O(n) per call;
/// used as the correctness oracle for [`Spline`] in spec §8 scenario 4.
pub struct IncrSlopeSpline<T: Lane> {
    id: String,
    xs: Vec<T>,
    slopes: Vec<T>,
}

impl<T: Lane> IncrSlopeSpline<T> {
    pub fn new(name: impl Into<String>, nodes: &[(T, T)]) -> Self {
        let xs = nodes.iter().map(|&(x, _)| x).collect();
        let slopes = nodes.iter().map(|&(_, s)| s).collect();
        Self { id: format!("LSis_{}", name.into()), xs, slopes }
    }

    pub fn eval(&self, x: T) -> T {
        let mut y = 0.0f64;
        for (&xk, &sk) in self.xs.iter().zip(&self.slopes) {
            y += sk.to_f64() * (x.to_f64() - xk.to_f64()).max(0.0);
        }
        T::from_f64(y)
    }

    pub fn eval_packed(&self, xs: &Packed<T>) -> Packed<T> {
        xs.iter().map(|&x| self.eval(x)).collect()
    }
}

impl<T: Lane> Functor<T> for IncrSlopeSpline<T> {
    fn apply(&self, _i: usize, x: T) -> T {
        self.eval(x)
    }
    fn apply_packed(&self, _i: usize, xs: &Packed<T>) -> Packed<T> {
        self.eval_packed(xs)
    }
    fn id(&self) -> String {
        self.id.clone()
    }
}

/// Uniform-indexed piecewise-linear spline (spec §3 "Spline S<T>", §4.H) —
/// the hardest-engineering piece named in spec §1. `S(x) = a[i] + b[i]*x`
/// where `i = idx[clamp(floor((x-x0)*dx), 0, M-1)]`.
pub struct Spline<T: Lane> {
    id: String,
    init_mode: InitMode,
    dx: T,
    x0: T,
    a: Vec<T>,
    b: Vec<T>,
    idx: Vec<i32>,
    /// Original break-point x's, kept so [`TimeDependentSpline::new`] can
    /// rebuild `a`/`b` under modulation without re-detecting the grid.
    node_xs: Vec<T>,
    /// Original per-node slopes (`from_incr_slopes`/`from_local_slopes`) or
    /// `y` values (`from_xy_points`), same purpose as `node_xs`.
    raw_vals: Vec<T>,
    delta: f64,
}

impl<T: Lane> Spline<T> {
    /// `from_incr_slopes` init mode (spec §4.H step 3): `a[0]=b[0]=0`;
    /// `b[i]=b[i-1]+slope[i-1]`, `a[i]=a[i-1]-slope[i-1]*x[i-1]` for `i>=1`.
    pub fn from_incr_slopes(name: impl Into<String>, nodes: &[(T, T)]) -> Result<Self> {
        Self::from_slope_nodes(name, nodes, InitMode::FromIncrSlopes)
    }

    /// `from_local_slopes` init mode (spec §4.H step 3): `a[0]=b[0]=0`;
    /// `b[i]=slope[i-1]`, `a[i]=a[i-1]-(b[i]-b[i-1])*x[i-1]` for `i>=1`.
    pub fn from_local_slopes(name: impl Into<String>, nodes: &[(T, T)]) -> Result<Self> {
        Self::from_slope_nodes(name, nodes, InitMode::FromLocalSlopes)
    }

    fn from_slope_nodes(
        name: impl Into<String>,
        nodes: &[(T, T)],
        mode: InitMode,
    ) -> Result<Self> {
        if nodes.is_empty() {
            return Err(TachyonError::new(TachyonErrorKind::NonUniform)
                .with_message("spline needs at least one break point"));
        }
        let xs: Vec<T> = nodes.iter().map(|&(x, _)| x).collect();
        let vals: Vec<T> = nodes.iter().map(|&(_, s)| s).collect();
        let delta = uniform_grid_step(&xs)?;
        let dx = T::from_f64(1.0 / delta);
        let x0 = T::from_f64(xs[0].to_f64() - delta);
        let raw_size = nodes.len();
        let xmax = xs[raw_size - 1].to_f64() + delta;

        let m = raw_size + 1;
        let mut a = vec![T::ZERO; m];
        let mut b = vec![T::ZERO; m];
        for i in 1..m {
            let slope = vals[i - 1].to_f64();
            let xprev = xs[i - 1].to_f64();
            let b_prev = b[i - 1].to_f64();
            let a_prev = a[i - 1].to_f64();
            let b_i = match mode {
                InitMode::FromIncrSlopes => b_prev + slope,
                InitMode::FromLocalSlopes => slope,
                InitMode::FromXyPoints => unreachable!("xy points use a separate constructor"),
            };
            a[i] = T::from_f64(a_prev - (b_i - b_prev) * xprev);
            b[i] = T::from_f64(b_i);
        }

        let cell_count = (((xmax - x0.to_f64()) * dx.to_f64()) + 0.5) as usize;
        let idx = build_index_map(x0, delta, &xs, cell_count);

        Ok(Self {
            id: format!("LSui_{}", name.into()),
            init_mode: mode,
            dx,
            x0,
            a,
            b,
            idx,
            node_xs: xs,
            raw_vals: vals,
            delta,
        })
    }

    /// `from_xy_points` init mode (spec §4.H step 3): `b[i]=(y[i+1]-y[i])/
    /// (x[i+1]-x[i])`, `a[i]=y[i]-b[i]*x[i]`, one interval per adjacent pair
    /// — no leading zero-sentinel interval, unlike the slope-based modes.
    pub fn from_xy_points(name: impl Into<String>, nodes: &[(T, T)]) -> Result<Self> {
        if nodes.len() < 2 {
            return Err(TachyonError::new(TachyonErrorKind::NonUniform)
                .with_message("xy spline needs at least two points"));
        }
        let xs: Vec<T> = nodes.iter().map(|&(x, _)| x).collect();
        let ys: Vec<T> = nodes.iter().map(|&(_, y)| y).collect();
        let delta = uniform_grid_step(&xs)?;
        let dx = T::from_f64(1.0 / delta);
        let x0 = xs[0];
        let raw_size = nodes.len();
        let xmax = xs[raw_size - 1].to_f64();
        let m = raw_size - 1;

        let mut a = vec![T::ZERO; m];
        let mut b = vec![T::ZERO; m];
        for i in 0..m {
            let x_i = xs[i].to_f64();
            let x_ip1 = xs[i + 1].to_f64();
            let y_i = ys[i].to_f64();
            let y_ip1 = ys[i + 1].to_f64();
            let slope = (y_ip1 - y_i) / (x_ip1 - x_i);
            a[i] = T::from_f64(y_i - slope * x_i);
            b[i] = T::from_f64(slope);
        }

        let cell_count = (((xmax - x0.to_f64()) * dx.to_f64()) + 0.5) as usize;
        let idx = build_index_map(x0, delta, &xs[..m], cell_count);

        Ok(Self {
            id: format!("LSui_{}", name.into()),
            init_mode: InitMode::FromXyPoints,
            dx,
            x0,
            a,
            b,
            idx,
            node_xs: xs,
            raw_vals: ys,
            delta,
        })
    }

    fn clamp_cell(&self, cell: i64) -> usize {
        let max_cell = (self.idx.len() as i64 - 1).max(0);
        cell.clamp(0, max_cell) as usize
    }

    /// Scalar evaluation (spec §4.H "Evaluation (scalar)").
    pub fn eval(&self, x: T) -> T {
        let t = (x.to_f64() - self.x0.to_f64()) * self.dx.to_f64();
        let cell = self.clamp_cell(t.floor() as i64);
        let i = self.idx[cell] as usize;
        T::from_f64(self.a[i].to_f64() + self.b[i].to_f64() * x.to_f64())
    }

    /// Packed evaluation via gather + FMA (spec §4.H "Evaluation (packed, W
    /// lanes)"): `t=(x-x0)*dx`, `k=clamp(floor(t),0,M-1)`, `i=gather(idx,k)`,
    /// `S=fmadd(x,gather(b,i),gather(a,i))`.
    pub fn eval_packed(&self, xs: &Packed<T>) -> Packed<T> {
        let x_reg = <T::Ops as SimdOps<T>>::from_lanes(xs);
        let x0_reg = <T::Ops as SimdOps<T>>::set1(self.x0);
        let dx_reg = <T::Ops as SimdOps<T>>::set1(self.dx);
        let t_reg = <T::Ops as SimdOps<T>>::mul(dx_reg, <T::Ops as SimdOps<T>>::sub(x_reg, x0_reg));
        let cells = floor_to_int::<T, T::Ops>(t_reg);
        let idx_lanes: SmallVec<[i32; 8]> =
            cells.iter().map(|&c| self.idx[self.clamp_cell(c as i64)]).collect();
        let a_reg = <T::Ops as SimdOps<T>>::gather(&self.a, &idx_lanes);
        let b_reg = <T::Ops as SimdOps<T>>::gather(&self.b, &idx_lanes);
        let res = <T::Ops as SimdOps<T>>::fmadd(x_reg, b_reg, a_reg);
        <T::Ops as SimdOps<T>>::to_lanes(res)
    }
}

impl<T: Lane> Functor<T> for Spline<T> {
    fn apply(&self, _i: usize, x: T) -> T {
        self.eval(x)
    }
    fn apply_packed(&self, _i: usize, xs: &Packed<T>) -> Packed<T> {
        self.eval_packed(xs)
    }
    fn id(&self) -> String {
        self.id.clone()
    }
}

/// Time-dependent uniform-indexed spline (spec §3/§4.H "Time-dependent
/// variant", `tachy_mod_linear_spline_uniform.h`). Holds `(a, b)` as a
/// flattened `(mod_len × m)` table built by applying a per-break-point
/// multiplicative modulation to a base [`Spline`]'s slopes, with `a`
/// recomputed at each step to keep continuity at the shared break points.
pub struct TimeDependentSpline<T: Lane> {
    id: String,
    dx: T,
    x0: T,
    m: usize,
    idx: Vec<i32>,
    a: Vec<T>,
    b: Vec<T>,
}

impl<T: Lane> TimeDependentSpline<T> {
    /// `modulation` must carry exactly one vector per break point of `base`
    /// (i.e. `base.node_xs.len()` vectors), all of the same non-zero length
    /// `T_len`. Fails with [`TachyonErrorKind::UnsupportedInitModeForModulation`]
    /// if `base` was built `from_xy_points`, or
    /// [`TachyonErrorKind::ModulationShapeMismatch`] if the vector count or
    /// lengths disagree.
    pub fn new(base: &Spline<T>, modulation: &[Vec<T>]) -> Result<Self> {
        if base.init_mode == InitMode::FromXyPoints {
            return Err(TachyonError::new(TachyonErrorKind::UnsupportedInitModeForModulation)
                .with_message("from_xy_points splines cannot be modulated"));
        }
        let raw_size = base.node_xs.len();
        if modulation.len() != raw_size {
            return Err(TachyonError::new(TachyonErrorKind::ModulationShapeMismatch).with_message(
                format!("expected {raw_size} modulation vectors, got {}", modulation.len()),
            ));
        }
        let t_len = modulation.first().map(Vec::len).unwrap_or(0);
        if t_len == 0 || modulation.iter().any(|v| v.len() != t_len) {
            return Err(TachyonError::new(TachyonErrorKind::ModulationShapeMismatch)
                .with_message("modulation vectors must share one non-zero length"));
        }

        let m = base.a.len();
        let mut a = vec![T::ZERO; t_len * m];
        let mut b = vec![T::ZERO; t_len * m];
        for t in 0..t_len {
            let row = t * m;
            for i in 1..m {
                let base_slope = base.raw_vals[i - 1].to_f64();
                let factor = modulation[i - 1][t].to_f64();
                let slope = base_slope * factor;
                let xprev = base.node_xs[i - 1].to_f64();
                let b_prev = b[row + i - 1].to_f64();
                let a_prev = a[row + i - 1].to_f64();
                let b_i = match base.init_mode {
                    InitMode::FromIncrSlopes => b_prev + slope,
                    InitMode::FromLocalSlopes => slope,
                    InitMode::FromXyPoints => unreachable!(),
                };
                a[row + i] = T::from_f64(a_prev - (b_i - b_prev) * xprev);
                b[row + i] = T::from_f64(b_i);
            }
        }

        Ok(Self { id: format!("MOD_{}", base.id), dx: base.dx, x0: base.x0, m, idx: base.idx.clone(), a, b })
    }

    fn clamp_cell(&self, cell: i64) -> usize {
        let max_cell = (self.idx.len() as i64 - 1).max(0);
        cell.clamp(0, max_cell) as usize
    }

    /// Evaluation at `(t, x)` (spec §4.H "Time-dependent variant"): same cell
    /// lookup as [`Spline::eval`], indexed into row `t` of the flattened
    /// table.
    pub fn eval(&self, t: usize, x: T) -> T {
        let tt = (x.to_f64() - self.x0.to_f64()) * self.dx.to_f64();
        let cell = self.clamp_cell(tt.floor() as i64);
        let i = t * self.m + self.idx[cell] as usize;
        T::from_f64(self.a[i].to_f64() + self.b[i].to_f64() * x.to_f64())
    }
}

impl<T: Lane> Functor<T> for TimeDependentSpline<T> {
    /// Time-dependent functors are always queried through the vector index
    /// `i` (spec §4.D `Functor` "per-scalar time-dependent `apply(i,x)`").
    fn apply(&self, i: usize, x: T) -> T {
        self.eval(i, x)
    }

    fn apply_packed(&self, i: usize, xs: &Packed<T>) -> Packed<T> {
        let x_reg = <T::Ops as SimdOps<T>>::from_lanes(xs);
        let x0_reg = <T::Ops as SimdOps<T>>::set1(self.x0);
        let dx_reg = <T::Ops as SimdOps<T>>::set1(self.dx);
        let t_reg = <T::Ops as SimdOps<T>>::mul(dx_reg, <T::Ops as SimdOps<T>>::sub(x_reg, x0_reg));
        let cells = floor_to_int::<T, T::Ops>(t_reg);
        let idx_lanes: SmallVec<[i32; 8]> = cells
            .iter()
            .enumerate()
            .map(|(k, &c)| ((i + k) * self.m) as i32 + self.idx[self.clamp_cell(c as i64)])
            .collect();
        let a_reg = <T::Ops as SimdOps<T>>::gather(&self.a, &idx_lanes);
        let b_reg = <T::Ops as SimdOps<T>>::gather(&self.b, &idx_lanes);
        let res = <T::Ops as SimdOps<T>>::fmadd(x_reg, b_reg, a_reg);
        <T::Ops as SimdOps<T>>::to_lanes(res)
    }

    fn id(&self) -> String {
        self.id.clone()
    }
}

/// Spline invocation `S(v)` (spec §6 "spline invocation"): wraps any
/// [`Functor`] — an [`IncrSlopeSpline`], [`Spline`], or [`TimeDependentSpline`]
/// — around `v`, the same way [`crate::ops::min_clip`] wraps a clamp functor.
pub fn spline<T: Lane, F: Functor<T> + 'static>(f: Rc<F>, v: &CalcVector<T>) -> CalcVector<T> {
    crate::ops::functor(f as Rc<dyn Functor<T>>, v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tachyon_common::Date;

    fn d(yyyymm: u32) -> Date {
        Date::from_yyyymm(yyyymm).unwrap()
    }

    /// Spec §8 scenario 4: the eight-node `from_incr_slopes` example, checked
    /// against the direct `Σ s_k·max(0, x-x_k)` formula across its domain.
    #[test]
    fn uniform_index_matches_incr_slope_oracle() {
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
        let indexed = Spline::from_incr_slopes("s", &nodes).unwrap();
        let oracle = IncrSlopeSpline::new("s", &nodes);

        let mut x = -0.1;
        while x <= 1.1 {
            let got = indexed.eval(x);
            let want = oracle.eval(x);
            let rel = (got - want).abs() / want.abs().max(1.0);
            assert!(rel < 1e-8, "x={x} got={got} want={want}");
            x += 0.01;
        }
    }

    #[test]
    fn packed_evaluation_matches_scalar() {
        let nodes: Vec<(f64, f64)> =
            vec![(0.0, 0.02), (0.1, 0.05), (0.3, 0.08), (0.4, -0.02)];
        let s = Spline::from_incr_slopes("s", &nodes).unwrap();
        let xs: Packed<f64> = [0.05, 0.25, 0.35, 1.0].into_iter().collect();
        let packed = s.eval_packed(&xs);
        for (i, &x) in xs.iter().enumerate() {
            assert!((packed[i] - s.eval(x)).abs() < 1e-12);
        }
    }

    #[test]
    fn non_uniform_grid_is_rejected() {
        let nodes = vec![(0.0, 0.02), (0.1, 0.05), (0.35, 0.08)];
        let err = Spline::from_incr_slopes("s", &nodes).unwrap_err();
        assert_eq!(err, TachyonErrorKind::NonUniform);
    }

    #[test]
    fn from_xy_points_interpolates_linearly() {
        let nodes = vec![(0.0, 1.0), (1.0, 3.0), (2.0, 3.0)];
        let s = Spline::from_xy_points("s", &nodes).unwrap();
        assert!((s.eval(0.0) - 1.0).abs() < 1e-8);
        assert!((s.eval(0.5) - 2.0).abs() < 1e-8);
        assert!((s.eval(1.0) - 3.0).abs() < 1e-8);
    }

    #[test]
    fn xy_points_cannot_be_modulated() {
        let nodes = vec![(0.0, 1.0), (1.0, 3.0), (2.0, 3.0)];
        let base = Spline::from_xy_points("s", &nodes).unwrap();
        let err = TimeDependentSpline::new(&base, &[vec![1.0], vec![1.0]]).unwrap_err();
        assert_eq!(err, TachyonErrorKind::UnsupportedInitModeForModulation);
    }

    #[test]
    fn modulation_shape_mismatch_is_rejected() {
        let nodes = vec![(0.0, 0.02), (0.1, 0.05), (0.2, 0.08)];
        let base = Spline::from_incr_slopes("s", &nodes).unwrap();
        // Only 2 modulation vectors for 3 break points.
        let err = TimeDependentSpline::new(&base, &[vec![1.0, 1.0], vec![1.0, 1.0]]).unwrap_err();
        assert_eq!(err, TachyonErrorKind::ModulationShapeMismatch);

        let mismatched_len = vec![vec![1.0, 1.0], vec![1.0, 1.0], vec![1.0]];
        let err = TimeDependentSpline::new(&base, &mismatched_len).unwrap_err();
        assert_eq!(err, TachyonErrorKind::ModulationShapeMismatch);
    }

    #[test]
    fn modulation_scales_slope_at_each_time_step() {
        // Two break points at x=0, x=0.1, both slope 1 (needs >=2 points for
        // `uniform_grid_step` to find a grid delta at all). Modulating both
        // nodes by the same factor `f` at time `t` scales every slope in
        // the base spline by `f`, so `S_t(x) = f * S_base(x)`.
        let nodes = vec![(0.0, 1.0), (0.1, 1.0)];
        let base = Spline::from_incr_slopes("s", &nodes).unwrap();
        let modulated = TimeDependentSpline::new(
            &base,
            &[vec![1.0, 2.0, 0.5], vec![1.0, 2.0, 0.5]],
        )
        .unwrap();

        let base_val = base.eval(1.0);
        assert!((modulated.eval(0, 1.0) - base_val).abs() < 1e-8);
        assert!((modulated.eval(1, 1.0) - 2.0 * base_val).abs() < 1e-8);
        assert!((modulated.eval(2, 1.0) - 0.5 * base_val).abs() < 1e-8);
    }

    #[test]
    fn spline_wraps_into_a_calc_vector_via_functor() {
        let nodes = vec![(0.0, 0.02), (0.1, 0.05), (0.3, 0.08)];
        let s = Rc::new(Spline::from_incr_slopes("s", &nodes).unwrap());
        let v = CalcVector::from_values("v", d(201701), &[0.0, 0.05, 0.2, 0.4], None, false)
            .unwrap();
        let out = spline(s.clone(), &v);
        for i in 0..v.size() {
            assert!((out.read(i) - s.eval(v.read(i))).abs() < 1e-12);
        }
    }
}
