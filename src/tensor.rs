//! Dense and sparse gradient containers.
//!
//! Gradients are f32 at this level. The collective layer underneath works on
//! little-endian byte buffers; the conversion helpers here are the only
//! crossing point.

use crate::error::{GradixError, Result};

/// Dense n-dimensional array of f32 values, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    data: Vec<f32>,
    shape: Vec<usize>,
}

impl Tensor {
    /// Create a tensor from data and shape, validating the element count.
    pub fn new(data: Vec<f32>, shape: Vec<usize>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(GradixError::BufferSizeMismatch {
                expected: expected * 4,
                actual: data.len() * 4,
            });
        }
        Ok(Self { data, shape })
    }

    /// All-zero tensor of the given shape.
    pub fn zeros(shape: Vec<usize>) -> Self {
        let len = shape.iter().product();
        Self {
            data: vec![0.0; len],
            shape,
        }
    }

    /// 1-D tensor wrapping a vector.
    pub fn from_vec(data: Vec<f32>) -> Self {
        let len = data.len();
        Self {
            data,
            shape: vec![len],
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    /// Number of elements in one row (everything past the leading axis).
    pub fn row_width(&self) -> usize {
        self.shape.iter().skip(1).product()
    }
}

/// Sparse gradient: values for a subset of rows of a logically dense tensor.
///
/// Invariant: `indices.len() == values.shape()[0]`. Indices are not
/// deduplicated; a downstream sparse-apply sums values at colliding indices.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedSlices {
    values: Tensor,
    indices: Vec<i64>,
    dense_shape: Vec<usize>,
}

impl IndexedSlices {
    pub fn new(values: Tensor, indices: Vec<i64>, dense_shape: Vec<usize>) -> Result<Self> {
        let rows = values.shape().first().copied().unwrap_or(0);
        if indices.len() != rows {
            return Err(GradixError::IndexCountMismatch {
                indices: indices.len(),
                rows,
            });
        }
        Ok(Self {
            values,
            indices,
            dense_shape,
        })
    }

    pub fn values(&self) -> &Tensor {
        &self.values
    }

    pub fn indices(&self) -> &[i64] {
        &self.indices
    }

    pub fn dense_shape(&self) -> &[usize] {
        &self.dense_shape
    }

    /// Number of stored rows.
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    /// Densify: scatter rows into a zero tensor of `dense_shape`, summing
    /// values at duplicate indices. An index outside `[0, dense_shape[0])`
    /// is a caller bug and fails fast.
    pub fn to_dense(&self) -> Result<Tensor> {
        let rows = self.dense_shape.first().copied().unwrap_or(0);
        let mut dense = Tensor::zeros(self.dense_shape.clone());
        let width = self.values.row_width();
        for (row, &idx) in self.indices.iter().enumerate() {
            if idx < 0 || idx as usize >= rows {
                return Err(GradixError::IndexOutOfRange { index: idx, rows });
            }
            let dst = idx as usize * width;
            let src = row * width;
            for i in 0..width {
                dense.data[dst + i] += self.values.data[src + i];
            }
        }
        Ok(dense)
    }
}

/// A gradient as produced by backpropagation: dense or sparse.
#[derive(Debug, Clone, PartialEq)]
pub enum Gradient {
    Dense(Tensor),
    Sparse(IndexedSlices),
}

impl Gradient {
    pub fn shape(&self) -> &[usize] {
        match self {
            Gradient::Dense(t) => t.shape(),
            Gradient::Sparse(s) => s.dense_shape(),
        }
    }
}

/// Serialize f32 values as little-endian bytes.
pub(crate) fn f32s_to_bytes(values: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * 4);
    for v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

/// Deserialize little-endian bytes into f32 values.
pub(crate) fn bytes_to_f32s(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(GradixError::DecodeFailed(format!(
            "f32 payload length {} not a multiple of 4",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Serialize i64 indices as little-endian bytes.
pub(crate) fn i64s_to_bytes(values: &[i64]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * 8);
    for v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

/// Deserialize little-endian bytes into i64 indices.
pub(crate) fn bytes_to_i64s(bytes: &[u8]) -> Result<Vec<i64>> {
    if bytes.len() % 8 != 0 {
        return Err(GradixError::DecodeFailed(format!(
            "i64 payload length {} not a multiple of 8",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(8)
        .map(|c| i64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tensor_shape_validation() {
        assert!(Tensor::new(vec![1.0; 6], vec![2, 3]).is_ok());
        assert!(Tensor::new(vec![1.0; 5], vec![2, 3]).is_err());
    }

    #[test]
    fn test_tensor_zeros() {
        let t = Tensor::zeros(vec![3, 2]);
        assert_eq!(t.len(), 6);
        assert!(t.data().iter().all(|&v| v == 0.0));
        assert_eq!(t.row_width(), 2);
    }

    #[test]
    fn test_indexed_slices_invariant() {
        let values = Tensor::new(vec![1.0, 2.0, 3.0, 4.0], vec![2, 2]).unwrap();
        assert!(IndexedSlices::new(values.clone(), vec![0, 3], vec![5, 2]).is_ok());
        assert!(IndexedSlices::new(values, vec![0], vec![5, 2]).is_err());
    }

    #[test]
    fn test_to_dense_sums_duplicates() {
        let values = Tensor::new(vec![1.0, 2.0, 10.0, 20.0], vec![2, 2]).unwrap();
        let slices = IndexedSlices::new(values, vec![1, 1], vec![3, 2]).unwrap();
        let dense = slices.to_dense().unwrap();
        assert_eq!(dense.data(), &[0.0, 0.0, 11.0, 22.0, 0.0, 0.0]);
    }

    #[test]
    fn test_to_dense_rejects_out_of_range_indices() {
        let values = Tensor::new(vec![1.0, 2.0], vec![2, 1]).unwrap();
        let slices = IndexedSlices::new(values.clone(), vec![0, 3], vec![3, 1]).unwrap();
        assert!(matches!(
            slices.to_dense(),
            Err(GradixError::IndexOutOfRange { index: 3, rows: 3 })
        ));

        let slices = IndexedSlices::new(values, vec![-1, 0], vec![3, 1]).unwrap();
        assert!(matches!(
            slices.to_dense(),
            Err(GradixError::IndexOutOfRange { index: -1, .. })
        ));
    }

    #[test]
    fn test_f32_byte_roundtrip() {
        let values = vec![1.5f32, -2.25, 0.0, f32::MAX];
        let bytes = f32s_to_bytes(&values);
        assert_eq!(bytes_to_f32s(&bytes).unwrap(), values);
        assert!(bytes_to_f32s(&bytes[1..]).is_err());
    }

    #[test]
    fn test_i64_byte_roundtrip() {
        let values = vec![0i64, -7, i64::MAX];
        let bytes = i64s_to_bytes(&values);
        assert_eq!(bytes_to_i64s(&bytes).unwrap(), values);
        assert!(bytes_to_i64s(&bytes[..7]).is_err());
    }
}
