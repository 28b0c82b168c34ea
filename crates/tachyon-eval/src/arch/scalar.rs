//! Fallback tier: lane width 1, no hardware vectorisation. Used on any
//! target and as the baseline contract every other tier must match
//! (`tachy_arch_traits.h`'s primary, non-specialised `arch_traits` template).

use super::{Packed, SimdOps};

#[derive(Debug, Clone, Copy)]
pub struct ScalarOps;

macro_rules! impl_scalar_ops {
    ($t:ty) => {
        impl SimdOps<$t> for ScalarOps {
            type Reg = $t;
            const WIDTH: usize = 1;

            fn zero() -> Self::Reg {
                0 as $t
            }
            fn set1(x: $t) -> Self::Reg {
                x
            }
            unsafe fn load_aligned(ptr: *const $t) -> Self::Reg {
                unsafe { *ptr }
            }
            unsafe fn load_unaligned(ptr: *const $t) -> Self::Reg {
                unsafe { *ptr }
            }
            unsafe fn store_unaligned(ptr: *mut $t, v: Self::Reg) {
                unsafe {
                    *ptr = v;
                }
            }
            fn add(a: Self::Reg, b: Self::Reg) -> Self::Reg {
                a + b
            }
            fn sub(a: Self::Reg, b: Self::Reg) -> Self::Reg {
                a - b
            }
            fn mul(a: Self::Reg, b: Self::Reg) -> Self::Reg {
                a * b
            }
            fn div(a: Self::Reg, b: Self::Reg) -> Self::Reg {
                a / b
            }
            fn min(a: Self::Reg, b: Self::Reg) -> Self::Reg {
                a.min(b)
            }
            fn max(a: Self::Reg, b: Self::Reg) -> Self::Reg {
                a.max(b)
            }
            fn sqrt(a: Self::Reg) -> Self::Reg {
                a.sqrt()
            }
            fn neg(a: Self::Reg) -> Self::Reg {
                -a
            }
            fn floor(a: Self::Reg) -> Self::Reg {
                a.floor()
            }
            fn ceil(a: Self::Reg) -> Self::Reg {
                a.ceil()
            }
            fn fmadd(x: Self::Reg, y: Self::Reg, c: Self::Reg) -> Self::Reg {
                x.mul_add(y, c)
            }
            fn gather(base: &[$t], idx: &[i32]) -> Self::Reg {
                base[idx[0] as usize]
            }
            fn to_lanes(v: Self::Reg) -> Packed<$t> {
                let mut p = Packed::<$t>::new();
                p.push(v);
                p
            }
            fn from_lanes(lanes: &[$t]) -> Self::Reg {
                lanes[0]
            }
        }
    };
}

impl_scalar_ops!(f32);
impl_scalar_ops!(f64);
