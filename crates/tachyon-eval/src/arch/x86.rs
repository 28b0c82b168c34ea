//! AVX2+FMA tier: `f32x8` / `f64x4`, the fastest lane width this port
//! implements. Only selected when the crate is compiled with both `avx2`
//! and `fma` target features active (see `arch::ActiveF32Ops`/`ActiveF64Ops`
//! in `arch/mod.rs`) — there is no runtime feature probe. Grounded on
//! `tachy_arch_traits.h`'s `arch_traits<double, ARCH_IA_AVX2>` (real
//! hardware `fmadd`/`gather`) and `arch_traits<float, ARCH_IA_AVX>` /
//! `arch_traits<double, ARCH_IA_AVX>` (real `floor`/`ceil`, which AVX has
//! and plain SSE2 does not).

use std::arch::x86_64::*;

use super::{Packed, SimdOps};

#[derive(Debug, Clone, Copy)]
pub struct Avx2FmaOps;

impl SimdOps<f32> for Avx2FmaOps {
    type Reg = __m256;
    const WIDTH: usize = 8;

    fn zero() -> Self::Reg {
        unsafe { _mm256_setzero_ps() }
    }
    fn set1(x: f32) -> Self::Reg {
        unsafe { _mm256_set1_ps(x) }
    }
    unsafe fn load_aligned(ptr: *const f32) -> Self::Reg {
        unsafe { _mm256_load_ps(ptr) }
    }
    unsafe fn load_unaligned(ptr: *const f32) -> Self::Reg {
        unsafe { _mm256_loadu_ps(ptr) }
    }
    unsafe fn store_unaligned(ptr: *mut f32, v: Self::Reg) {
        unsafe { _mm256_storeu_ps(ptr, v) }
    }
    fn add(a: Self::Reg, b: Self::Reg) -> Self::Reg {
        unsafe { _mm256_add_ps(a, b) }
    }
    fn sub(a: Self::Reg, b: Self::Reg) -> Self::Reg {
        unsafe { _mm256_sub_ps(a, b) }
    }
    fn mul(a: Self::Reg, b: Self::Reg) -> Self::Reg {
        unsafe { _mm256_mul_ps(a, b) }
    }
    fn div(a: Self::Reg, b: Self::Reg) -> Self::Reg {
        unsafe { _mm256_div_ps(a, b) }
    }
    fn min(a: Self::Reg, b: Self::Reg) -> Self::Reg {
        unsafe { _mm256_min_ps(a, b) }
    }
    fn max(a: Self::Reg, b: Self::Reg) -> Self::Reg {
        unsafe { _mm256_max_ps(a, b) }
    }
    fn sqrt(a: Self::Reg) -> Self::Reg {
        unsafe { _mm256_sqrt_ps(a) }
    }
    fn neg(a: Self::Reg) -> Self::Reg {
        unsafe { _mm256_sub_ps(_mm256_setzero_ps(), a) }
    }
    fn floor(a: Self::Reg) -> Self::Reg {
        unsafe { _mm256_floor_ps(a) }
    }
    fn ceil(a: Self::Reg) -> Self::Reg {
        unsafe { _mm256_ceil_ps(a) }
    }
    fn fmadd(x: Self::Reg, y: Self::Reg, c: Self::Reg) -> Self::Reg {
        unsafe { _mm256_fmadd_ps(x, y, c) }
    }
    fn gather(base: &[f32], idx: &[i32]) -> Self::Reg {
        unsafe {
            let idx_reg = _mm256_setr_epi32(
                idx[0], idx[1], idx[2], idx[3], idx[4], idx[5], idx[6], idx[7],
            );
            _mm256_i32gather_ps(base.as_ptr(), idx_reg, 4)
        }
    }
    fn to_lanes(v: Self::Reg) -> Packed<f32> {
        let mut out = [0f32; 8];
        unsafe { _mm256_storeu_ps(out.as_mut_ptr(), v) };
        out.into_iter().collect()
    }
    fn from_lanes(lanes: &[f32]) -> Self::Reg {
        unsafe {
            _mm256_setr_ps(
                lanes[0], lanes[1], lanes[2], lanes[3], lanes[4], lanes[5], lanes[6], lanes[7],
            )
        }
    }
}

impl SimdOps<f64> for Avx2FmaOps {
    type Reg = __m256d;
    const WIDTH: usize = 4;

    fn zero() -> Self::Reg {
        unsafe { _mm256_setzero_pd() }
    }
    fn set1(x: f64) -> Self::Reg {
        unsafe { _mm256_set1_pd(x) }
    }
    unsafe fn load_aligned(ptr: *const f64) -> Self::Reg {
        unsafe { _mm256_load_pd(ptr) }
    }
    unsafe fn load_unaligned(ptr: *const f64) -> Self::Reg {
        unsafe { _mm256_loadu_pd(ptr) }
    }
    unsafe fn store_unaligned(ptr: *mut f64, v: Self::Reg) {
        unsafe { _mm256_storeu_pd(ptr, v) }
    }
    fn add(a: Self::Reg, b: Self::Reg) -> Self::Reg {
        unsafe { _mm256_add_pd(a, b) }
    }
    fn sub(a: Self::Reg, b: Self::Reg) -> Self::Reg {
        unsafe { _mm256_sub_pd(a, b) }
    }
    fn mul(a: Self::Reg, b: Self::Reg) -> Self::Reg {
        unsafe { _mm256_mul_pd(a, b) }
    }
    fn div(a: Self::Reg, b: Self::Reg) -> Self::Reg {
        unsafe { _mm256_div_pd(a, b) }
    }
    fn min(a: Self::Reg, b: Self::Reg) -> Self::Reg {
        unsafe { _mm256_min_pd(a, b) }
    }
    fn max(a: Self::Reg, b: Self::Reg) -> Self::Reg {
        unsafe { _mm256_max_pd(a, b) }
    }
    fn sqrt(a: Self::Reg) -> Self::Reg {
        unsafe { _mm256_sqrt_pd(a) }
    }
    fn neg(a: Self::Reg) -> Self::Reg {
        unsafe { _mm256_sub_pd(_mm256_setzero_pd(), a) }
    }
    fn floor(a: Self::Reg) -> Self::Reg {
        unsafe { _mm256_floor_pd(a) }
    }
    fn ceil(a: Self::Reg) -> Self::Reg {
        unsafe { _mm256_ceil_pd(a) }
    }
    fn fmadd(x: Self::Reg, y: Self::Reg, c: Self::Reg) -> Self::Reg {
        unsafe { _mm256_fmadd_pd(x, y, c) }
    }
    fn gather(base: &[f64], idx: &[i32]) -> Self::Reg {
        unsafe {
            let idx_reg = _mm_setr_epi32(idx[0], idx[1], idx[2], idx[3]);
            _mm256_i32gather_pd(base.as_ptr(), idx_reg, 8)
        }
    }
    fn to_lanes(v: Self::Reg) -> Packed<f64> {
        let mut out = [0f64; 4];
        unsafe { _mm256_storeu_pd(out.as_mut_ptr(), v) };
        out.into_iter().collect()
    }
    fn from_lanes(lanes: &[f64]) -> Self::Reg {
        unsafe { _mm256_setr_pd(lanes[0], lanes[1], lanes[2], lanes[3]) }
    }
}
