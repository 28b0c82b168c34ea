//! SSE2 tier: `f32x4` / `f64x2`. Always available on `x86_64` (SSE2 is part
//! of the x86_64 baseline ABI), so this is the floor of the ladder below
//! `Avx2FmaOps`. Grounded on `tachy_arch_traits.h`'s
//! `arch_traits<float, ARCH_IA_SSE2>` / `arch_traits<double, ARCH_IA_SSE2>`
//! specialisations, including their choice to fall back to scalar
//! `floor`/`ceil` (SSE2 itself has no rounding instruction — that needs
//! SSE4.1, which this tier deliberately does not assume).

use std::arch::x86_64::*;

use super::{Packed, SimdOps};

#[derive(Debug, Clone, Copy)]
pub struct Sse2Ops;

impl SimdOps<f32> for Sse2Ops {
    type Reg = __m128;
    const WIDTH: usize = 4;

    fn zero() -> Self::Reg {
        unsafe { _mm_setzero_ps() }
    }
    fn set1(x: f32) -> Self::Reg {
        unsafe { _mm_set1_ps(x) }
    }
    unsafe fn load_aligned(ptr: *const f32) -> Self::Reg {
        unsafe { _mm_load_ps(ptr) }
    }
    unsafe fn load_unaligned(ptr: *const f32) -> Self::Reg {
        unsafe { _mm_loadu_ps(ptr) }
    }
    unsafe fn store_unaligned(ptr: *mut f32, v: Self::Reg) {
        unsafe { _mm_storeu_ps(ptr, v) }
    }
    fn add(a: Self::Reg, b: Self::Reg) -> Self::Reg {
        unsafe { _mm_add_ps(a, b) }
    }
    fn sub(a: Self::Reg, b: Self::Reg) -> Self::Reg {
        unsafe { _mm_sub_ps(a, b) }
    }
    fn mul(a: Self::Reg, b: Self::Reg) -> Self::Reg {
        unsafe { _mm_mul_ps(a, b) }
    }
    fn div(a: Self::Reg, b: Self::Reg) -> Self::Reg {
        unsafe { _mm_div_ps(a, b) }
    }
    fn min(a: Self::Reg, b: Self::Reg) -> Self::Reg {
        unsafe { _mm_min_ps(a, b) }
    }
    fn max(a: Self::Reg, b: Self::Reg) -> Self::Reg {
        unsafe { _mm_max_ps(a, b) }
    }
    fn sqrt(a: Self::Reg) -> Self::Reg {
        unsafe { _mm_sqrt_ps(a) }
    }
    fn neg(a: Self::Reg) -> Self::Reg {
        unsafe { _mm_sub_ps(_mm_setzero_ps(), a) }
    }
    fn floor(a: Self::Reg) -> Self::Reg {
        let lanes = Self::to_lanes(a);
        let floored: Packed<f32> = lanes.iter().map(|x| x.floor()).collect();
        Self::from_lanes(&floored)
    }
    fn ceil(a: Self::Reg) -> Self::Reg {
        let lanes = Self::to_lanes(a);
        let ceiled: Packed<f32> = lanes.iter().map(|x| x.ceil()).collect();
        Self::from_lanes(&ceiled)
    }
    fn fmadd(x: Self::Reg, y: Self::Reg, c: Self::Reg) -> Self::Reg {
        Self::add(Self::mul(x, y), c)
    }
    fn gather(base: &[f32], idx: &[i32]) -> Self::Reg {
        unsafe {
            _mm_setr_ps(
                base[idx[0] as usize],
                base[idx[1] as usize],
                base[idx[2] as usize],
                base[idx[3] as usize],
            )
        }
    }
    fn to_lanes(v: Self::Reg) -> Packed<f32> {
        let mut out = [0f32; 4];
        unsafe { _mm_storeu_ps(out.as_mut_ptr(), v) };
        out.into_iter().collect()
    }
    fn from_lanes(lanes: &[f32]) -> Self::Reg {
        unsafe { _mm_setr_ps(lanes[0], lanes[1], lanes[2], lanes[3]) }
    }
}

impl SimdOps<f64> for Sse2Ops {
    type Reg = __m128d;
    const WIDTH: usize = 2;

    fn zero() -> Self::Reg {
        unsafe { _mm_setzero_pd() }
    }
    fn set1(x: f64) -> Self::Reg {
        unsafe { _mm_set1_pd(x) }
    }
    unsafe fn load_aligned(ptr: *const f64) -> Self::Reg {
        unsafe { _mm_load_pd(ptr) }
    }
    unsafe fn load_unaligned(ptr: *const f64) -> Self::Reg {
        unsafe { _mm_loadu_pd(ptr) }
    }
    unsafe fn store_unaligned(ptr: *mut f64, v: Self::Reg) {
        unsafe { _mm_storeu_pd(ptr, v) }
    }
    fn add(a: Self::Reg, b: Self::Reg) -> Self::Reg {
        unsafe { _mm_add_pd(a, b) }
    }
    fn sub(a: Self::Reg, b: Self::Reg) -> Self::Reg {
        unsafe { _mm_sub_pd(a, b) }
    }
    fn mul(a: Self::Reg, b: Self::Reg) -> Self::Reg {
        unsafe { _mm_mul_pd(a, b) }
    }
    fn div(a: Self::Reg, b: Self::Reg) -> Self::Reg {
        unsafe { _mm_div_pd(a, b) }
    }
    fn min(a: Self::Reg, b: Self::Reg) -> Self::Reg {
        unsafe { _mm_min_pd(a, b) }
    }
    fn max(a: Self::Reg, b: Self::Reg) -> Self::Reg {
        unsafe { _mm_max_pd(a, b) }
    }
    fn sqrt(a: Self::Reg) -> Self::Reg {
        unsafe { _mm_sqrt_pd(a) }
    }
    fn neg(a: Self::Reg) -> Self::Reg {
        unsafe { _mm_sub_pd(_mm_setzero_pd(), a) }
    }
    fn floor(a: Self::Reg) -> Self::Reg {
        let lanes = Self::to_lanes(a);
        let floored: Packed<f64> = lanes.iter().map(|x| x.floor()).collect();
        Self::from_lanes(&floored)
    }
    fn ceil(a: Self::Reg) -> Self::Reg {
        let lanes = Self::to_lanes(a);
        let ceiled: Packed<f64> = lanes.iter().map(|x| x.ceil()).collect();
        Self::from_lanes(&ceiled)
    }
    fn fmadd(x: Self::Reg, y: Self::Reg, c: Self::Reg) -> Self::Reg {
        Self::add(Self::mul(x, y), c)
    }
    fn gather(base: &[f64], idx: &[i32]) -> Self::Reg {
        unsafe { _mm_setr_pd(base[idx[0] as usize], base[idx[1] as usize]) }
    }
    fn to_lanes(v: Self::Reg) -> Packed<f64> {
        let mut out = [0f64; 2];
        unsafe { _mm_storeu_pd(out.as_mut_ptr(), v) };
        out.into_iter().collect()
    }
    fn from_lanes(lanes: &[f64]) -> Self::Reg {
        unsafe { _mm_setr_pd(lanes[0], lanes[1]) }
    }
}
