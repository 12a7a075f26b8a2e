use crate::types::Rank;

pub type Result<T> = std::result::Result<T, GradixError>;

#[derive(Debug, thiserror::Error)]
pub enum GradixError {
    #[error("shape mismatch for parameter {param}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        param: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("indexed slices invariant violated: {indices} indices for {rows} value rows")]
    IndexCountMismatch { indices: usize, rows: usize },

    #[error("row index {index} out of range for {rows} rows")]
    IndexOutOfRange { index: i64, rows: usize },

    #[error("buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    #[error("invalid rank {rank}: world size is {world_size}")]
    InvalidRank { rank: Rank, world_size: u32 },

    #[error("rank {rank} not found in communicator")]
    UnknownPeer { rank: Rank },

    #[error("communicator used before mesh establishment: {operation}")]
    Uninitialized { operation: &'static str },

    #[error("{operation} failed at rank {rank}: {reason}")]
    CollectiveFailed {
        operation: &'static str,
        rank: Rank,
        reason: String,
    },

    #[error("transport error: {message}")]
    Transport { message: String },

    #[error("message decode failed: {0}")]
    DecodeFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GradixError {
    /// Create a `Transport` error from a message.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport {
            message: msg.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_mismatch_display() {
        let e = GradixError::ShapeMismatch {
            param: "dense/kernel".into(),
            expected: vec![4, 2],
            actual: vec![2, 4],
        };
        assert_eq!(
            e.to_string(),
            "shape mismatch for parameter dense/kernel: expected [4, 2], got [2, 4]"
        );
    }

    #[test]
    fn test_collective_failed_display() {
        let e = GradixError::CollectiveFailed {
            operation: "allreduce",
            rank: 3,
            reason: "recv timed out after 30s".into(),
        };
        assert_eq!(
            e.to_string(),
            "allreduce failed at rank 3: recv timed out after 30s"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::AddrInUse, "port busy");
        let err: GradixError = io_err.into();
        assert!(err.to_string().contains("port busy"));
    }

    #[test]
    fn test_all_variants_display() {
        let errors: Vec<GradixError> = vec![
            GradixError::ShapeMismatch {
                param: "w".into(),
                expected: vec![1],
                actual: vec![2],
            },
            GradixError::IndexCountMismatch {
                indices: 3,
                rows: 2,
            },
            GradixError::IndexOutOfRange { index: -1, rows: 4 },
            GradixError::BufferSizeMismatch {
                expected: 16,
                actual: 8,
            },
            GradixError::InvalidRank {
                rank: 5,
                world_size: 4,
            },
            GradixError::UnknownPeer { rank: 1 },
            GradixError::Uninitialized {
                operation: "allreduce",
            },
            GradixError::CollectiveFailed {
                operation: "allgather",
                rank: 0,
                reason: "x".into(),
            },
            GradixError::transport("conn reset"),
            GradixError::DecodeFailed("bad frame".into()),
        ];
        for e in &errors {
            assert!(!e.to_string().is_empty(), "empty display for {e:?}");
        }
    }
}
