//! Compile-time SIMD lane abstraction (spec §4.A).
//!
//! `SimdOps<T>` is the uniform operation set every tier implements for a
//! numeric type `T`. Tier selection happens once, at compile time, via
//! `cfg(target_feature = "...")` — there is no runtime dispatch, matching
//! `tachy_arch_traits.h`'s template-specialisation-per-arch design. Three
//! tiers are implemented: [`x86::Avx2FmaOps`] (AVX2+FMA), [`sse2::Sse2Ops`]
//! (SSE2 baseline, always present on `x86_64`), and [`scalar::ScalarOps`]
//! (any target, width 1). The fourth tier named in spec.md's ordering
//! (`FMA+AVX2 > AVX > SSE2 > scalar`) collapses AVX-without-FMA into the
//! `Sse2` tier in this port (see DESIGN.md).

pub mod scalar;
#[cfg(target_arch = "x86_64")]
pub mod sse2;
#[cfg(target_arch = "x86_64")]
pub mod x86;

use smallvec::SmallVec;

/// A packed lane value: up to 8 scalars (the widest tier implemented,
/// `Avx2FmaOps` on `f32`). Narrower tiers simply use a shorter `SmallVec`.
pub type Packed<T> = SmallVec<[T; 8]>;

/// The uniform SIMD operation contract (spec §4.A table).
///
/// Implementors hold no state; every method is a free function in disguise,
/// dispatched at compile time through the concrete `Self` type bound into
/// [`crate::Lane::Ops`].
pub trait SimdOps<T: Copy>: Copy {
    /// The hardware (or scalar) register type backing a packed value.
    type Reg: Copy;

    /// Lane count of one packed value at this tier.
    const WIDTH: usize;

    fn zero() -> Self::Reg;
    fn set1(x: T) -> Self::Reg;

    /// # Safety
    /// `ptr` must be valid for `WIDTH` reads of `T` and aligned to
    /// `WIDTH * size_of::<T>()`.
    unsafe fn load_aligned(ptr: *const T) -> Self::Reg;

    /// # Safety
    /// `ptr` must be valid for `WIDTH` reads of `T`; no alignment required.
    unsafe fn load_unaligned(ptr: *const T) -> Self::Reg;

    /// # Safety
    /// `ptr` must be valid for `WIDTH` writes of `T`; no alignment required.
    unsafe fn store_unaligned(ptr: *mut T, v: Self::Reg);

    fn add(a: Self::Reg, b: Self::Reg) -> Self::Reg;
    fn sub(a: Self::Reg, b: Self::Reg) -> Self::Reg;
    fn mul(a: Self::Reg, b: Self::Reg) -> Self::Reg;
    fn div(a: Self::Reg, b: Self::Reg) -> Self::Reg;
    fn min(a: Self::Reg, b: Self::Reg) -> Self::Reg;
    fn max(a: Self::Reg, b: Self::Reg) -> Self::Reg;
    fn sqrt(a: Self::Reg) -> Self::Reg;
    fn neg(a: Self::Reg) -> Self::Reg;
    fn floor(a: Self::Reg) -> Self::Reg;
    fn ceil(a: Self::Reg) -> Self::Reg;

    /// `x*y + c`, using hardware FMA when the tier has it; otherwise
    /// `add(mul(x,y),c)`. May differ from the fused result by <=1 ULP.
    fn fmadd(x: Self::Reg, y: Self::Reg, c: Self::Reg) -> Self::Reg;

    /// Lane `k` <- `base[idx[k]]`. Tiers without a hardware gather synthesise
    /// it with per-lane scalar loads, matching every non-AVX2 specialisation
    /// in `tachy_arch_traits.h`.
    fn gather(base: &[T], idx: &[i32]) -> Self::Reg;

    fn to_lanes(v: Self::Reg) -> Packed<T>;
    fn from_lanes(lanes: &[T]) -> Self::Reg;
}

/// Per-lane exponential, shared by every tier.
///
/// `tachy_arch_traits.h` never vectorises `exp` in any specialisation shown
/// in the source (SSE, SSE2, AVX, and AVX2 all reassemble a register from
/// `std::exp` called lane-by-lane) — this port keeps that shape rather than
/// inventing a vectorised transcendental that the original never had. Within
/// 1e-14 relative error on `[-709.4, 709.4]` per spec §4.A; outside that
/// range the caller clamps before calling (see `ops::exp_checked`).
pub fn exp_lanewise<T, Ops>(v: Ops::Reg) -> Ops::Reg
where
    T: Copy + Lane<Ops = Ops> + ExpScalar,
    Ops: SimdOps<T>,
{
    let lanes: Packed<T> = Ops::to_lanes(v);
    let out: Packed<T> = lanes.iter().map(|x| x.exp_scalar()).collect();
    Ops::from_lanes(&out)
}

/// Per-lane natural log, shared by every tier for the same reason as
/// [`exp_lanewise`] — the source never vectorises transcendentals.
pub fn ln_lanewise<T, Ops>(v: Ops::Reg) -> Ops::Reg
where
    T: Copy + Lane<Ops = Ops> + ExpScalar,
    Ops: SimdOps<T>,
{
    let lanes: Packed<T> = Ops::to_lanes(v);
    let out: Packed<T> = lanes.iter().map(|x| x.ln_scalar()).collect();
    Ops::from_lanes(&out)
}

/// `|x| = max(x, -x)`; correct for all reals and avoids needing a dedicated
/// sign-mask intrinsic per tier.
pub fn abs<T, Ops>(v: Ops::Reg) -> Ops::Reg
where
    T: Copy,
    Ops: SimdOps<T>,
{
    Ops::max(v, Ops::neg(v))
}

/// Per-lane round-to-nearest-even conversion to `i32`, used by spline index
/// computation (`cvt_to_int` in spec §4.A).
pub fn cvt_to_int<T, Ops>(v: Ops::Reg) -> SmallVec<[i32; 8]>
where
    T: Copy + Lane<Ops = Ops> + ExpScalar,
    Ops: SimdOps<T>,
{
    Ops::to_lanes(v).iter().map(|x| x.round_to_i32()).collect()
}

/// Per-lane floor-to-`i32`, used by [`crate::spline`] to compute the
/// uniform-index cell for an evaluation point.
pub fn floor_to_int<T, Ops>(v: Ops::Reg) -> SmallVec<[i32; 8]>
where
    T: Copy + Lane<Ops = Ops> + ExpScalar,
    Ops: SimdOps<T>,
{
    Ops::to_lanes(v)
        .iter()
        .map(|x| x.floor_scalar().round_to_i32())
        .collect()
}

/// Scalar transcendental/rounding helpers needed by [`exp_lanewise`] and the
/// spline index path, implemented once per numeric type rather than per
/// tier (mirrors the original's scalar fallback for these operations).
pub trait ExpScalar: Copy {
    fn exp_scalar(self) -> Self;
    fn ln_scalar(self) -> Self;
    fn floor_scalar(self) -> Self;
    fn round_to_i32(self) -> i32;
}

impl ExpScalar for f32 {
    fn exp_scalar(self) -> Self {
        self.exp()
    }
    fn ln_scalar(self) -> Self {
        self.ln()
    }
    fn floor_scalar(self) -> Self {
        self.floor()
    }
    fn round_to_i32(self) -> i32 {
        (self + 0.5).floor() as i32
    }
}

impl ExpScalar for f64 {
    fn exp_scalar(self) -> Self {
        self.exp()
    }
    fn ln_scalar(self) -> Self {
        self.ln()
    }
    fn floor_scalar(self) -> Self {
        self.floor()
    }
    fn round_to_i32(self) -> i32 {
        (self + 0.5).floor() as i32
    }
}

use crate::Lane;

#[cfg(all(target_arch = "x86_64", target_feature = "avx2", target_feature = "fma"))]
pub type ActiveF32Ops = x86::Avx2FmaOps;
#[cfg(all(target_arch = "x86_64", target_feature = "avx2", target_feature = "fma"))]
pub type ActiveF64Ops = x86::Avx2FmaOps;

#[cfg(all(
    target_arch = "x86_64",
    not(all(target_feature = "avx2", target_feature = "fma"))
))]
pub type ActiveF32Ops = sse2::Sse2Ops;
#[cfg(all(
    target_arch = "x86_64",
    not(all(target_feature = "avx2", target_feature = "fma"))
))]
pub type ActiveF64Ops = sse2::Sse2Ops;

#[cfg(not(target_arch = "x86_64"))]
pub type ActiveF32Ops = scalar::ScalarOps;
#[cfg(not(target_arch = "x86_64"))]
pub type ActiveF64Ops = scalar::ScalarOps;
