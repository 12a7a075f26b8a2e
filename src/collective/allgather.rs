use crate::collective::helpers::{collective_recv, collective_send};
use crate::comm::Communicator;
use crate::error::Result;

/// Ring allgather: each rank contributes one byte buffer, result is every
/// rank's contribution in rank order.
///
/// Contributions may differ in length across ranks (sparse gradients have a
/// per-rank nnz); the frame length carries the size, so no layout agreement
/// is needed. Uses N-1 ring rounds where each rank forwards the latest
/// received chunk to its successor.
pub(crate) async fn ring_allgather(
    comm: &Communicator,
    send: &[u8],
    tag: u64,
) -> Result<Vec<Vec<u8>>> {
    let world = comm.world_size() as usize;
    let rank = comm.rank() as usize;

    let mut chunks: Vec<Vec<u8>> = vec![Vec::new(); world];
    chunks[rank] = send.to_vec();

    if world <= 1 {
        return Ok(chunks);
    }

    let next = ((rank + 1) % world) as u32;
    let prev = ((rank + world - 1) % world) as u32;

    // N-1 rounds: each round, send the latest received chunk to next,
    // receive a chunk from prev and place it at its owner's slot.
    for step in 0..(world - 1) {
        let send_idx = (rank + world - step) % world;
        let recv_idx = (rank + world - step - 1) % world;

        let send_data = chunks[send_idx].clone();

        let (_, received) = tokio::try_join!(
            collective_send(comm, next, tag, &send_data, "allgather"),
            collective_recv(comm, prev, tag, "allgather"),
        )?;

        chunks[recv_idx] = received;
    }

    Ok(chunks)
}
