//! Public collective operations on [`Communicator`].
//!
//! Blocking variants run on the program-order tag lane and must be issued in
//! the same relative order on every rank. Non-blocking variants take an
//! explicit tag (typically derived from a parameter id via
//! [`fnv1a_tag`](crate::collective::fnv1a_tag)) so reductions for different
//! parameters can be outstanding at the same time.

use crate::collective::{
    ring_allgather, ring_allreduce, tree_broadcast, CollectiveHandle, DEFAULT_TAG,
};
use crate::error::Result;
use crate::types::{DataType, Rank, ReduceOp};
use std::sync::Arc;

use super::Communicator;

impl Communicator {
    /// Ring allreduce, in place. `buf` holds `count` little-endian `dtype`
    /// elements; on return it holds the element-wise reduction across all
    /// ranks, identical on every rank.
    pub async fn all_reduce(
        &self,
        buf: &mut [u8],
        count: usize,
        dtype: DataType,
        op: ReduceOp,
    ) -> Result<()> {
        ring_allreduce(self, buf, count, dtype, op, DEFAULT_TAG).await
    }

    /// Non-blocking allreduce. Takes ownership of the buffer; the handle
    /// resolves to the reduced buffer.
    pub fn all_reduce_nb(
        self: &Arc<Self>,
        mut buf: Vec<u8>,
        count: usize,
        dtype: DataType,
        op: ReduceOp,
        tag: u64,
    ) -> CollectiveHandle<Vec<u8>> {
        let comm = Arc::clone(self);
        CollectiveHandle::spawn(async move {
            ring_allreduce(&comm, &mut buf, count, dtype, op, tag).await?;
            Ok(buf)
        })
    }

    /// Ring allgather: returns every rank's contribution in rank order.
    /// Contributions may differ in length across ranks.
    pub async fn all_gather(&self, send: &[u8]) -> Result<Vec<Vec<u8>>> {
        ring_allgather(self, send, DEFAULT_TAG).await
    }

    /// Non-blocking allgather.
    pub fn all_gather_nb(
        self: &Arc<Self>,
        send: Vec<u8>,
        tag: u64,
    ) -> CollectiveHandle<Vec<Vec<u8>>> {
        let comm = Arc::clone(self);
        CollectiveHandle::spawn(async move { ring_allgather(&comm, &send, tag).await })
    }

    /// Broadcast `buf` from `root` to all ranks, in place.
    pub async fn broadcast(&self, buf: &mut [u8], root: Rank) -> Result<()> {
        tree_broadcast(self, buf, root, DEFAULT_TAG).await
    }
}
