//! Gradient synchronization across the worker group.
//!
//! The synchronizer takes one step's worth of named gradients, launches the
//! appropriate collective per gradient, and returns the synchronized result
//! in the input order. Dense gradients go through quantization, a wire
//! codec, and a ring allreduce; sparse gradients are allgathered and
//! concatenated so that per-rank row subsets are never summed by position.
//!
//! Each parameter reduces on its own tag lane derived from the parameter
//! name, so all reductions in a step run concurrently. Every rank must call
//! [`GradientSynchronizer::synchronize`] with the same parameter names each
//! step; a missing parameter on one rank stalls that lane until the
//! collective timeout fires.

mod optimizer;

pub use optimizer::{broadcast_parameters, DistributedOptimizer, GradientComputer};

use std::sync::Arc;

use crate::collective::{fnv1a_tag, CollectiveHandle};
use crate::comm::Communicator;
use crate::compression::{CodecContext, CompressionCodec};
use crate::config::DIV_EPSILON;
use crate::error::Result;
use crate::quantize::{quantize, ErrorFeedbackMemory};
use crate::tensor::{
    bytes_to_f32s, bytes_to_i64s, f32s_to_bytes, i64s_to_bytes, Gradient, IndexedSlices, Tensor,
};
use crate::types::ReduceOp;

/// Per-step gradient reducer with error feedback.
///
/// Owns the compression residuals, so one synchronizer instance must live
/// for the duration of training. Not `Sync`: one training loop drives it.
pub struct GradientSynchronizer {
    comm: Arc<Communicator>,
    codec: Box<dyn CompressionCodec>,
    memory: ErrorFeedbackMemory,
}

enum PendingSync {
    /// Gradient passed through untouched (single-process bypass).
    Ready(Gradient),
    Dense {
        shape: Vec<usize>,
        ctx: CodecContext,
        handle: CollectiveHandle<Vec<u8>>,
    },
    Sparse {
        dense_shape: Vec<usize>,
        values: CollectiveHandle<Vec<Vec<u8>>>,
        indices: CollectiveHandle<Vec<Vec<u8>>>,
    },
}

impl GradientSynchronizer {
    pub fn new(comm: Arc<Communicator>) -> Self {
        let codec = comm.config().codec.build();
        Self {
            comm,
            codec,
            memory: ErrorFeedbackMemory::new(),
        }
    }

    /// Synchronize one step's gradients. Returns them in input order.
    ///
    /// Dense gradients come back identical on every rank. Sparse gradients
    /// come back as the rank-order concatenation of all contributions, with
    /// values divided by world size when averaging.
    pub async fn synchronize(
        &mut self,
        gradients: Vec<(String, Gradient)>,
    ) -> Result<Vec<Gradient>> {
        tracing::debug!(
            rank = self.comm.rank(),
            count = gradients.len(),
            "synchronizing gradients"
        );

        // Launch every collective before awaiting any of them.
        let mut pending = Vec::with_capacity(gradients.len());
        for (name, gradient) in gradients {
            pending.push(self.launch(&name, gradient)?);
        }

        let mut out = Vec::with_capacity(pending.len());
        for p in pending {
            out.push(self.finish(p).await?);
        }
        Ok(out)
    }

    fn launch(&mut self, name: &str, gradient: Gradient) -> Result<PendingSync> {
        if self.comm.world_size() <= 1 {
            return Ok(PendingSync::Ready(gradient));
        }
        match gradient {
            Gradient::Dense(tensor) => self.launch_dense(name, tensor),
            Gradient::Sparse(slices) => {
                if self.comm.config().sparse_as_dense {
                    self.launch_dense(name, slices.to_dense()?)
                } else {
                    Ok(self.launch_sparse(name, slices))
                }
            }
        }
    }

    fn launch_dense(&mut self, name: &str, tensor: Tensor) -> Result<PendingSync> {
        let comm = Arc::clone(&self.comm);
        let config = comm.config();
        let shape = tensor.shape().to_vec();
        let mut values = tensor.into_data();

        if let Some(factor) = config.pre_scale {
            for v in &mut values {
                *v *= factor;
            }
        }

        let payload = if config.quantization {
            let residual = if config.error_feedback {
                self.memory.residual(name, values.len())?.to_vec()
            } else {
                vec![0.0; values.len()]
            };
            let out = quantize(&values, &residual, config.top_k.as_ref());
            if config.error_feedback {
                self.memory.store(name, out.residual);
            }
            out.quantized
        } else {
            values
        };

        let (encoded, ctx) = self.codec.compress(&payload);
        let tag = fnv1a_tag(&[name]);
        let handle = comm.all_reduce_nb(
            encoded,
            ctx.count,
            self.codec.wire_dtype(),
            ReduceOp::Sum,
            tag,
        );
        Ok(PendingSync::Dense { shape, ctx, handle })
    }

    fn launch_sparse(&mut self, name: &str, slices: IndexedSlices) -> PendingSync {
        let dense_shape = slices.dense_shape().to_vec();
        let mut local_values = slices.values().data().to_vec();
        // Pre-scaling applies to both paths; finish() undoes it for both.
        if let Some(factor) = self.comm.config().pre_scale {
            for v in &mut local_values {
                *v *= factor;
            }
        }
        let values = self
            .comm
            .all_gather_nb(f32s_to_bytes(&local_values), fnv1a_tag(&[name, "values"]));
        let indices = self
            .comm
            .all_gather_nb(i64s_to_bytes(slices.indices()), fnv1a_tag(&[name, "indices"]));
        PendingSync::Sparse {
            dense_shape,
            values,
            indices,
        }
    }

    async fn finish(&mut self, pending: PendingSync) -> Result<Gradient> {
        let config = self.comm.config();
        let world = self.comm.world_size() as f32;
        match pending {
            PendingSync::Ready(gradient) => Ok(gradient),
            PendingSync::Dense {
                shape,
                ctx,
                mut handle,
            } => {
                let reduced = handle.wait().await?;
                let mut values = self.codec.decompress(&reduced, &ctx)?;
                if config.average {
                    for v in &mut values {
                        *v /= world;
                    }
                }
                if let Some(factor) = config.pre_scale {
                    for v in &mut values {
                        *v /= factor + DIV_EPSILON;
                    }
                }
                Ok(Gradient::Dense(Tensor::new(values, shape)?))
            }
            PendingSync::Sparse {
                dense_shape,
                mut values,
                mut indices,
            } => {
                let value_parts = values.wait().await?;
                let index_parts = indices.wait().await?;

                let mut all_values = Vec::new();
                for part in &value_parts {
                    all_values.extend(bytes_to_f32s(part)?);
                }
                let mut all_indices = Vec::new();
                for part in &index_parts {
                    all_indices.extend(bytes_to_i64s(part)?);
                }

                // Averaging divides by world size, not by how many ranks
                // touched a given row, matching the dense semantics.
                if config.average {
                    for v in &mut all_values {
                        *v /= world;
                    }
                }
                if let Some(factor) = config.pre_scale {
                    for v in &mut all_values {
                        *v /= factor + DIV_EPSILON;
                    }
                }

                let rows = all_indices.len();
                let mut shape = vec![rows];
                shape.extend(dense_shape.iter().skip(1));
                let tensor = Tensor::new(all_values, shape)?;
                Ok(Gradient::Sparse(IndexedSlices::new(
                    tensor,
                    all_indices,
                    dense_shape,
                )?))
            }
        }
    }

    /// Drop all accumulated compression residuals, e.g. after a checkpoint
    /// restore where the optimizer state was rebuilt.
    pub fn reset_memory(&mut self) {
        self.memory.reset();
    }

    pub fn communicator(&self) -> &Arc<Communicator> {
        &self.comm
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GradixConfig;

    #[tokio::test]
    async fn test_single_process_bypass() {
        let comm = Arc::new(Communicator::single(GradixConfig::default()));
        let mut sync = GradientSynchronizer::new(comm);
        let grad = Gradient::Dense(Tensor::from_vec(vec![1.0, -2.0, 3.0]));
        let out = sync
            .synchronize(vec![("w".to_string(), grad.clone())])
            .await
            .unwrap();
        assert_eq!(out, vec![grad]);
    }

    #[tokio::test]
    async fn test_single_process_sparse_bypass() {
        let comm = Arc::new(Communicator::single(GradixConfig::default()));
        let mut sync = GradientSynchronizer::new(comm);
        let values = Tensor::new(vec![1.0, 2.0], vec![1, 2]).unwrap();
        let grad = Gradient::Sparse(IndexedSlices::new(values, vec![3], vec![5, 2]).unwrap());
        let out = sync
            .synchronize(vec![("e".to_string(), grad.clone())])
            .await
            .unwrap();
        assert_eq!(out, vec![grad]);
    }
}
