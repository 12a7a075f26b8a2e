//! Per-parameter residual buffers for error feedback.

use crate::error::{GradixError, Result};
use std::collections::HashMap;

/// Persistent compression residuals, one buffer per parameter.
///
/// Buffers are lazily zero-initialized on first access and survive across
/// steps. Access is single-writer per parameter per step; the synchronizer
/// reads the residual before quantizing and stores the new one after the
/// reduction completes. `reset` returns every buffer to zero (checkpoint
/// restore rebuilds state through here).
#[derive(Debug, Default)]
pub struct ErrorFeedbackMemory {
    buffers: HashMap<String, Vec<f32>>,
}

impl ErrorFeedbackMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Residual for `param`, zero-initialized to `len` elements on first
    /// access. A stored residual of a different length means the caller
    /// changed a parameter's shape mid-training, which is a programming
    /// error, not a recoverable condition.
    pub fn residual(&mut self, param: &str, len: usize) -> Result<&[f32]> {
        let buf = self
            .buffers
            .entry(param.to_string())
            .or_insert_with(|| vec![0.0; len]);
        if buf.len() != len {
            return Err(GradixError::ShapeMismatch {
                param: param.to_string(),
                expected: vec![buf.len()],
                actual: vec![len],
            });
        }
        Ok(buf)
    }

    /// Overwrite the residual for `param`.
    pub fn store(&mut self, param: &str, residual: Vec<f32>) {
        self.buffers.insert(param.to_string(), residual);
    }

    /// Zero every buffer, keeping allocations.
    pub fn reset(&mut self) {
        for buf in self.buffers.values_mut() {
            buf.fill(0.0);
        }
    }

    /// Number of parameters with a residual buffer.
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}
