//! Shared element-wise reduction primitives used by the collective
//! algorithms.
//!
//! Operates on little-endian byte slices so ring rounds never reinterpret
//! unaligned network buffers as typed slices. f16 arithmetic widens to f32
//! per element, matching how accelerators accumulate half-precision sums.

use crate::types::{DataType, ReduceOp};
use half::f16;

/// Trait for types that support the reduction operations.
trait Reducible: Copy + 'static {
    fn reduce(a: Self, b: Self, op: ReduceOp) -> Self;
}

macro_rules! impl_reducible_float {
    ($($ty:ty),*) => {
        $(
            impl Reducible for $ty {
                #[inline]
                fn reduce(a: Self, b: Self, op: ReduceOp) -> Self {
                    match op {
                        ReduceOp::Sum => a + b,
                        ReduceOp::Min => a.min(b),
                        ReduceOp::Max => a.max(b),
                    }
                }
            }
        )*
    };
}

impl_reducible_float!(f32, f64);

impl Reducible for f16 {
    #[inline]
    fn reduce(a: Self, b: Self, op: ReduceOp) -> Self {
        match op {
            ReduceOp::Sum => f16::from_f32(a.to_f32() + b.to_f32()),
            ReduceOp::Min => f16::from_f32(a.to_f32().min(b.to_f32())),
            ReduceOp::Max => f16::from_f32(a.to_f32().max(b.to_f32())),
        }
    }
}

impl Reducible for i64 {
    #[inline]
    fn reduce(a: Self, b: Self, op: ReduceOp) -> Self {
        match op {
            ReduceOp::Sum => a.wrapping_add(b),
            ReduceOp::Min => a.min(b),
            ReduceOp::Max => a.max(b),
        }
    }
}

/// Read/write a value from a little-endian byte slice (alignment-safe).
trait LeBytes: Sized {
    fn read_le(bytes: &[u8]) -> Self;
    fn write_le(self, bytes: &mut [u8]);
}

macro_rules! impl_le_bytes {
    ($($ty:ty),*) => {
        $(
            impl LeBytes for $ty {
                #[inline]
                fn read_le(bytes: &[u8]) -> Self {
                    Self::from_le_bytes(
                        bytes.try_into().expect("slice length matches type size"),
                    )
                }
                #[inline]
                fn write_le(self, bytes: &mut [u8]) {
                    bytes.copy_from_slice(&self.to_le_bytes());
                }
            }
        )*
    };
}

impl_le_bytes!(f32, f64, i64);

impl LeBytes for f16 {
    #[inline]
    fn read_le(bytes: &[u8]) -> Self {
        f16::from_le_bytes(bytes.try_into().expect("slice length matches type size"))
    }
    #[inline]
    fn write_le(self, bytes: &mut [u8]) {
        bytes.copy_from_slice(&self.to_le_bytes());
    }
}

/// Element-wise reduce on byte slices interpreted as `dtype` elements.
///
/// `dst` and `src` must both contain exactly `count * dtype.size_in_bytes()`
/// bytes.
pub(crate) fn reduce_slice(dst: &mut [u8], src: &[u8], count: usize, dtype: DataType, op: ReduceOp) {
    match dtype {
        DataType::F32 => reduce_slice_typed::<f32>(dst, src, count, op),
        DataType::F64 => reduce_slice_typed::<f64>(dst, src, count, op),
        DataType::F16 => reduce_slice_typed::<f16>(dst, src, count, op),
        DataType::I64 => reduce_slice_typed::<i64>(dst, src, count, op),
    }
}

fn reduce_slice_typed<T: Reducible + LeBytes>(dst: &mut [u8], src: &[u8], count: usize, op: ReduceOp) {
    let t_size = std::mem::size_of::<T>();
    for i in 0..count {
        let off = i * t_size;
        let a = T::read_le(&dst[off..off + t_size]);
        let b = T::read_le(&src[off..off + t_size]);
        T::reduce(a, b, op).write_le(&mut dst[off..off + t_size]);
    }
}
