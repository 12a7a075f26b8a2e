mod fp16;
mod none;

pub use fp16::Fp16Codec;
pub use none::NoneCodec;

use crate::error::Result;
use crate::types::DataType;

/// Metadata needed to invert one compress call. Lifetime is one reduction;
/// nothing is persisted across calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecContext {
    /// Element count of the original tensor.
    pub count: usize,
}

/// Secondary encoding applied to the quantized payload before the wire.
///
/// Implementations are stateless across calls: the returned context fully
/// describes how to invert one specific call. `decompress(compress(t)) == t`
/// must hold exactly for lossless codecs and within the codec's precision
/// for lossy ones.
pub trait CompressionCodec: Send + Sync {
    /// Encode f32 values into the wire representation.
    fn compress(&self, values: &[f32]) -> (Vec<u8>, CodecContext);

    /// Decode the wire representation back into f32 values.
    fn decompress(&self, encoded: &[u8], ctx: &CodecContext) -> Result<Vec<f32>>;

    /// Element type the encoded payload reduces as on the wire.
    fn wire_dtype(&self) -> DataType;
}

/// Codec selection, part of the process-wide configuration. Must match on
/// every rank: the wire dtype determines payload sizes and reduction
/// arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecKind {
    /// Identity transform.
    None,
    /// Cast to half precision on the wire.
    Fp16,
}

impl CodecKind {
    pub fn build(self) -> Box<dyn CompressionCodec> {
        match self {
            CodecKind::None => Box::new(NoneCodec),
            CodecKind::Fp16 => Box::new(Fp16Codec),
        }
    }
}
