//! Training-loop integration: the optimizer wrapper and parameter broadcast.

use std::sync::Arc;

use crate::comm::Communicator;
use crate::error::Result;
use crate::tensor::{bytes_to_f32s, f32s_to_bytes, Gradient, Tensor};
use crate::types::Rank;

use super::GradientSynchronizer;

/// The two optimizer hooks the synchronizer interposes between.
///
/// Implemented by whatever produces gradients locally (a model plus a local
/// optimizer). `compute_gradients` returns named gradients for one step;
/// `apply_gradients` consumes the synchronized result.
pub trait GradientComputer {
    fn compute_gradients(&mut self) -> Result<Vec<(String, Gradient)>>;
    fn apply_gradients(&mut self, gradients: Vec<(String, Gradient)>) -> Result<()>;
}

/// Wraps a local optimizer so that gradients are synchronized across the
/// worker group between computation and application.
///
/// The wrapped optimizer never sees raw local gradients: every gradient that
/// reaches `apply_gradients` has already been reduced (or allgathered, for
/// sparse) across all ranks.
pub struct DistributedOptimizer<O> {
    inner: O,
    synchronizer: GradientSynchronizer,
}

impl<O: GradientComputer> DistributedOptimizer<O> {
    pub fn new(inner: O, comm: Arc<Communicator>) -> Self {
        Self {
            inner,
            synchronizer: GradientSynchronizer::new(comm),
        }
    }

    /// Compute local gradients and synchronize them across the group.
    pub async fn compute_gradients(&mut self) -> Result<Vec<(String, Gradient)>> {
        let gradients = self.inner.compute_gradients()?;
        let names: Vec<String> = gradients.iter().map(|(n, _)| n.clone()).collect();
        let synced = self.synchronizer.synchronize(gradients).await?;
        Ok(names.into_iter().zip(synced).collect())
    }

    /// Apply already-synchronized gradients through the wrapped optimizer.
    pub fn apply_gradients(&mut self, gradients: Vec<(String, Gradient)>) -> Result<()> {
        self.inner.apply_gradients(gradients)
    }

    /// One full step: compute, synchronize, apply.
    pub async fn step(&mut self) -> Result<()> {
        let gradients = self.compute_gradients().await?;
        self.apply_gradients(gradients)
    }

    pub fn synchronizer(&mut self) -> &mut GradientSynchronizer {
        &mut self.synchronizer
    }

    pub fn inner(&self) -> &O {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut O {
        &mut self.inner
    }
}

/// Overwrite every rank's parameters with `root`'s values.
///
/// Run once after initialization (and after any restore on `root`) so that
/// all ranks start training from identical weights. Parameters must be
/// passed in the same order on every rank.
pub async fn broadcast_parameters(
    comm: &Communicator,
    parameters: &mut [(String, Tensor)],
    root: Rank,
) -> Result<()> {
    tracing::info!(
        rank = comm.rank(),
        root,
        count = parameters.len(),
        "broadcasting parameters"
    );
    for (_, tensor) in parameters.iter_mut() {
        let mut bytes = f32s_to_bytes(tensor.data());
        comm.broadcast(&mut bytes, root).await?;
        let values = bytes_to_f32s(&bytes)?;
        tensor.data_mut().copy_from_slice(&values);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GradixConfig;

    struct FixedGradients {
        gradients: Vec<(String, Gradient)>,
        applied: Vec<Vec<(String, Gradient)>>,
    }

    impl GradientComputer for FixedGradients {
        fn compute_gradients(&mut self) -> Result<Vec<(String, Gradient)>> {
            Ok(self.gradients.clone())
        }

        fn apply_gradients(&mut self, gradients: Vec<(String, Gradient)>) -> Result<()> {
            self.applied.push(gradients);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_step_single_process() {
        let comm = Arc::new(Communicator::single(GradixConfig::default()));
        let grad = Gradient::Dense(Tensor::from_vec(vec![0.5, -0.5]));
        let inner = FixedGradients {
            gradients: vec![("w".to_string(), grad.clone())],
            applied: Vec::new(),
        };
        let mut opt = DistributedOptimizer::new(inner, comm);
        opt.step().await.unwrap();
        assert_eq!(opt.inner().applied, vec![vec![("w".to_string(), grad)]]);
    }
}
