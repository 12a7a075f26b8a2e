//! Half-precision codec: halves the wire volume of an already-quantized
//! payload. Lossy within f16 precision (~3 decimal digits); sign-quantized
//! payloads carry only ±scale, so the relative error stays at the f16
//! rounding of a single magnitude.

use crate::error::{GradixError, Result};
use crate::types::DataType;
use half::f16;

use super::{CodecContext, CompressionCodec};

/// Casts f32 to f16 on the wire; the reducer sums in half precision.
pub struct Fp16Codec;

impl CompressionCodec for Fp16Codec {
    fn compress(&self, values: &[f32]) -> (Vec<u8>, CodecContext) {
        let mut out = Vec::with_capacity(values.len() * 2);
        for &v in values {
            out.extend_from_slice(&f16::from_f32(v).to_le_bytes());
        }
        (
            out,
            CodecContext {
                count: values.len(),
            },
        )
    }

    fn decompress(&self, encoded: &[u8], ctx: &CodecContext) -> Result<Vec<f32>> {
        if encoded.len() != ctx.count * 2 {
            return Err(GradixError::BufferSizeMismatch {
                expected: ctx.count * 2,
                actual: encoded.len(),
            });
        }
        Ok(encoded
            .chunks_exact(2)
            .map(|c| f16::from_le_bytes([c[0], c[1]]).to_f32())
            .collect())
    }

    fn wire_dtype(&self) -> DataType {
        DataType::F16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_within_half_precision() {
        let codec = Fp16Codec;
        let input = vec![1.0f32, -0.5, 0.125, 3.14159, -2048.0];
        let (encoded, ctx) = codec.compress(&input);
        assert_eq!(encoded.len(), input.len() * 2);
        let output = codec.decompress(&encoded, &ctx).unwrap();
        for (a, b) in input.iter().zip(&output) {
            let tol = a.abs() * 1e-3 + 1e-7;
            assert!((a - b).abs() <= tol, "{a} vs {b}");
        }
    }

    #[test]
    fn test_exactly_representable_values_survive() {
        let codec = Fp16Codec;
        let input = vec![0.0f32, 1.0, -1.0, 0.5, 2.0];
        let (encoded, ctx) = codec.compress(&input);
        assert_eq!(codec.decompress(&encoded, &ctx).unwrap(), input);
    }

    #[test]
    fn test_size_mismatch_rejected() {
        let codec = Fp16Codec;
        let (encoded, ctx) = codec.compress(&[1.0, 2.0]);
        assert!(codec.decompress(&encoded[..2], &ctx).is_err());
    }

    #[test]
    fn test_wire_dtype() {
        assert_eq!(Fp16Codec.wire_dtype(), DataType::F16);
    }
}
