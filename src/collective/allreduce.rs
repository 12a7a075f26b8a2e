use crate::collective::helpers::{collective_recv, collective_send, ChunkLayout};
use crate::comm::Communicator;
use crate::error::{GradixError, Result};
use crate::reduce::reduce_slice;
use crate::types::{DataType, ReduceOp};

/// Ring allreduce: in-place reduce across all ranks.
///
/// Algorithm:
/// 1. Scatter-reduce: N-1 rounds. Each rank sends one chunk to the next rank
///    and receives one chunk from the previous rank, reducing in-place.
/// 2. Allgather: N-1 rounds. Each rank sends its fully-reduced chunk to the
///    next rank and receives from the previous rank.
///
/// After completion, `buf` on every rank contains the reduced result of all
/// ranks' original data. Chunk walk order is a pure function of (rank, step,
/// world), so every rank applies the same combination order and the result
/// bit pattern is identical everywhere.
///
/// `buf` must contain exactly `count * dtype.size_in_bytes()` bytes.
pub(crate) async fn ring_allreduce(
    comm: &Communicator,
    buf: &mut [u8],
    count: usize,
    dtype: DataType,
    op: ReduceOp,
    tag: u64,
) -> Result<()> {
    let world = comm.world_size() as usize;
    let rank = comm.rank() as usize;

    if world <= 1 {
        return Ok(());
    }

    let elem_size = dtype.size_in_bytes();
    let total_bytes = count * elem_size;
    if buf.len() != total_bytes {
        return Err(GradixError::BufferSizeMismatch {
            expected: total_bytes,
            actual: buf.len(),
        });
    }

    let layout = ChunkLayout::new(count, world);

    let next = ((rank + 1) % world) as u32;
    let prev = ((rank + world - 1) % world) as u32;

    // Phase 1: Scatter-reduce (N-1 rounds).
    for step in 0..(world - 1) {
        let send_idx = (rank + world - step) % world;
        let send_off = layout.offset(send_idx) * elem_size;
        let send_len = layout.chunk_count(send_idx) * elem_size;

        let recv_idx = (rank + world - step - 1) % world;
        let recv_off = layout.offset(recv_idx) * elem_size;
        let recv_count = layout.chunk_count(recv_idx);
        let recv_len = recv_count * elem_size;

        // Copy out the send chunk so recv can borrow buf mutably below.
        let send_snapshot = buf[send_off..send_off + send_len].to_vec();

        let (_, received) = tokio::try_join!(
            collective_send(comm, next, tag, &send_snapshot, "allreduce"),
            collective_recv(comm, prev, tag, "allreduce"),
        )?;

        if received.len() != recv_len {
            return Err(GradixError::BufferSizeMismatch {
                expected: recv_len,
                actual: received.len(),
            });
        }
        let dst = &mut buf[recv_off..recv_off + recv_len];
        reduce_slice(dst, &received, recv_count, dtype, op);
    }

    // Phase 2: Allgather (N-1 rounds).
    for step in 0..(world - 1) {
        let send_idx = (rank + world + 1 - step) % world;
        let send_off = layout.offset(send_idx) * elem_size;
        let send_len = layout.chunk_count(send_idx) * elem_size;

        let recv_idx = (rank + world - step) % world;
        let recv_off = layout.offset(recv_idx) * elem_size;
        let recv_len = layout.chunk_count(recv_idx) * elem_size;

        let send_snapshot = buf[send_off..send_off + send_len].to_vec();

        let (_, received) = tokio::try_join!(
            collective_send(comm, next, tag, &send_snapshot, "allreduce"),
            collective_recv(comm, prev, tag, "allreduce"),
        )?;

        if received.len() != recv_len {
            return Err(GradixError::BufferSizeMismatch {
                expected: recv_len,
                actual: received.len(),
            });
        }
        buf[recv_off..recv_off + recv_len].copy_from_slice(&received);
    }

    Ok(())
}
