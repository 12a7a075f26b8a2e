//! Identity codec. Passes data through unmodified.

use crate::error::Result;
use crate::tensor::{bytes_to_f32s, f32s_to_bytes};
use crate::types::DataType;

use super::{CodecContext, CompressionCodec};

/// No-op codec: f32 values cross the wire as-is. Exact round-trip.
pub struct NoneCodec;

impl CompressionCodec for NoneCodec {
    fn compress(&self, values: &[f32]) -> (Vec<u8>, CodecContext) {
        (
            f32s_to_bytes(values),
            CodecContext {
                count: values.len(),
            },
        )
    }

    fn decompress(&self, encoded: &[u8], ctx: &CodecContext) -> Result<Vec<f32>> {
        let values = bytes_to_f32s(encoded)?;
        if values.len() != ctx.count {
            return Err(crate::error::GradixError::BufferSizeMismatch {
                expected: ctx.count * 4,
                actual: encoded.len(),
            });
        }
        Ok(values)
    }

    fn wire_dtype(&self) -> DataType {
        DataType::F32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_exact() {
        let codec = NoneCodec;
        let input = vec![1.0f32, -2.5, 0.0, f32::MIN_POSITIVE, 3.4e38];
        let (encoded, ctx) = codec.compress(&input);
        assert_eq!(ctx.count, 5);
        assert_eq!(codec.decompress(&encoded, &ctx).unwrap(), input);
    }

    #[test]
    fn test_count_mismatch_rejected() {
        let codec = NoneCodec;
        let (encoded, _) = codec.compress(&[1.0, 2.0]);
        let wrong_ctx = CodecContext { count: 3 };
        assert!(codec.decompress(&encoded, &wrong_ctx).is_err());
    }

    #[test]
    fn test_wire_dtype() {
        assert_eq!(NoneCodec.wire_dtype(), DataType::F32);
    }
}
