//! Meta crate that re-exports the Tachyon expression engine's building
//! blocks with sensible defaults. Downstream users can depend on this crate
//! alone and reach everything through [`prelude`], or depend on
//! `tachyon-common`/`tachyon-eval` directly for finer-grained imports.

pub use tachyon_common as common;
pub use tachyon_eval as eval;

/// Glob-importable surface covering the types most call sites need: the
/// dated vector facade, the calc cache, spline construction, and the shared
/// `Date`/error types.
pub mod prelude {
    pub use tachyon_common::{Date, ScalarId, TachyonError, TachyonErrorKind};
    pub use tachyon_eval::cache::CalcCache;
    pub use tachyon_eval::calc_vector::CalcVector;
    pub use tachyon_eval::spline::{IncrSlopeSpline, InitMode, Spline, TimeDependentSpline};
}
