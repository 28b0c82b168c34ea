//! Lazily-evaluated, SIMD-vectorised, memoising expression engine for dated
//! cashflow vectors.
//!
//! The crate is organised leaf-first, mirroring spec.md's own component
//! table: [`arch`] (SIMD lanes) underlies [`storage`] (aligned buffers),
//! which underlies [`date_vector`] (the date-anchored owning vector), which
//! [`engine`] wraps into the lazy expression-tree sum type. [`cache`] memoises
//! named engines; [`calc_vector`] is the user-facing handle that ties an
//! engine to a cache and mediates assignment; [`ops`] supplies the operator
//! overloads that build `Engine` nodes; [`spline`] implements the
//! piecewise-linear functor family.

pub mod arch;
pub mod cache;
pub mod calc_vector;
pub mod date_vector;
pub mod engine;
pub mod ops;
pub mod spline;
pub mod storage;

use arch::{ActiveF32Ops, ActiveF64Ops, ExpScalar, SimdOps};

/// A numeric type this engine can operate over. Only `f32` and `f64`
/// instantiate it (spec §6 — "operations are not mixable").
pub trait Lane: Copy + PartialEq + std::fmt::Debug + Default + ExpScalar + 'static {
    /// The SIMD tier active for this type, chosen once at compile time.
    type Ops: SimdOps<Self>;
    const ZERO: Self;

    /// Widening conversion used by the `Iota` engine (spec §3 row D).
    fn from_i64(x: i64) -> Self;

    /// Widening conversion to `f64`, used by [`crate::spline`]'s grid-uniformity
    /// detection and break-point bookkeeping, which is done in `f64` regardless
    /// of `T` (the grid-step GCD only needs to be accurate to `1e-6`).
    fn to_f64(self) -> f64;

    /// Narrowing conversion from `f64`, the inverse of [`Self::to_f64`].
    fn from_f64(x: f64) -> Self;
}

impl Lane for f32 {
    type Ops = ActiveF32Ops;
    const ZERO: Self = 0.0;

    fn from_i64(x: i64) -> Self {
        x as f32
    }

    fn to_f64(self) -> f64 {
        self as f64
    }

    fn from_f64(x: f64) -> Self {
        x as f32
    }
}

impl Lane for f64 {
    type Ops = ActiveF64Ops;
    const ZERO: Self = 0.0;

    fn from_i64(x: i64) -> Self {
        x as f64
    }

    fn to_f64(self) -> f64 {
        self
    }

    fn from_f64(x: f64) -> Self {
        x
    }
}

#[cfg(feature = "tracing")]
pub(crate) use tracing::{debug, trace};

#[cfg(not(feature = "tracing"))]
pub(crate) mod no_tracing {
    //! No-op stand-ins for `tracing::{debug,trace}!` when the `tracing`
    //! feature is off, so call sites never need a `cfg` of their own.
    macro_rules! debug {
        ($($arg:tt)*) => {};
    }
    macro_rules! trace {
        ($($arg:tt)*) => {};
    }
    pub(crate) use debug;
    pub(crate) use trace;
}

#[cfg(not(feature = "tracing"))]
pub(crate) use no_tracing::{debug, trace};
