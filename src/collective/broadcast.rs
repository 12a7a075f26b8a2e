use crate::collective::helpers::{collective_recv, collective_send};
use crate::comm::Communicator;
use crate::error::{GradixError, Result};
use crate::types::Rank;
use futures::future::try_join_all;

/// Threshold: use flat broadcast for small worlds, tree broadcast for larger.
const TREE_BROADCAST_THRESHOLD: u32 = 4;

/// Broadcast `buf` from `root` to all other ranks, in place.
///
/// Root sends to all directly for small world sizes; above the threshold a
/// binary tree over logically-remapped ranks (root becomes logical rank 0)
/// keeps the root's fan-out at two.
pub(crate) async fn tree_broadcast(
    comm: &Communicator,
    buf: &mut [u8],
    root: Rank,
    tag: u64,
) -> Result<()> {
    let world = comm.world_size();

    if world <= 1 {
        return Ok(());
    }
    if root >= world {
        return Err(GradixError::InvalidRank {
            rank: root,
            world_size: world,
        });
    }

    if world < TREE_BROADCAST_THRESHOLD {
        return flat_broadcast(comm, buf, root, tag).await;
    }

    let rank = comm.rank();
    let total_bytes = buf.len();

    // Remap ranks so root becomes logical rank 0.
    let logical = |r: Rank| -> Rank { (r + world - root) % world };
    let physical = |l: Rank| -> Rank { (l + root) % world };
    let my_logical = logical(rank);

    if my_logical != 0 {
        let parent = physical((my_logical - 1) / 2);
        let received = collective_recv(comm, parent, tag, "broadcast").await?;
        if received.len() != total_bytes {
            return Err(GradixError::BufferSizeMismatch {
                expected: total_bytes,
                actual: received.len(),
            });
        }
        buf.copy_from_slice(&received);
    }

    // Forward to children concurrently.
    let mut futs = Vec::new();
    for child_logical in [2 * my_logical + 1, 2 * my_logical + 2] {
        if child_logical < world {
            let child = physical(child_logical);
            futs.push(collective_send(comm, child, tag, &*buf, "broadcast"));
        }
    }
    if !futs.is_empty() {
        try_join_all(futs).await?;
    }

    Ok(())
}

/// Flat broadcast: root sends directly to every other rank.
async fn flat_broadcast(comm: &Communicator, buf: &mut [u8], root: Rank, tag: u64) -> Result<()> {
    let world = comm.world_size();
    let rank = comm.rank();

    if rank == root {
        let futs = (0..world)
            .filter(|&r| r != root)
            .map(|r| collective_send(comm, r, tag, &*buf, "broadcast"));
        try_join_all(futs).await?;
    } else {
        let received = collective_recv(comm, root, tag, "broadcast").await?;
        if received.len() != buf.len() {
            return Err(GradixError::BufferSizeMismatch {
                expected: buf.len(),
                actual: received.len(),
            });
        }
        buf.copy_from_slice(&received);
    }

    Ok(())
}
