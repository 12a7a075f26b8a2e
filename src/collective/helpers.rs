use crate::comm::Communicator;
use crate::error::{GradixError, Result};
use crate::types::Rank;

/// Tag used by blocking collectives issued in program order. Collectives
/// that may overlap (per-parameter reductions) must use distinct tags,
/// agreed on by every rank; see [`fnv1a_tag`].
pub(crate) const DEFAULT_TAG: u64 = 0;

/// Compute a non-zero FNV-1a hash over an iterator of byte slices.
///
/// Used to derive collective tags all ranks agree on from stable parameter
/// identifiers, so concurrent reductions for different parameters never pair
/// the wrong tensors across ranks. Returns a non-zero `u64` (zero is the
/// program-order lane).
pub fn fnv1a_tag<I, S>(parts: I) -> u64
where
    I: IntoIterator<Item = S>,
    S: AsRef<[u8]>,
{
    let mut h: u64 = 0xcbf29ce484222325; // FNV-1a offset basis
    for part in parts {
        for &b in part.as_ref() {
            h ^= b as u64;
            h = h.wrapping_mul(0x100000001b3);
        }
        // Part boundary marker so ["w", "values"] and ["wvalues"] land on
        // distinct lanes.
        h ^= 0x1f;
        h = h.wrapping_mul(0x100000001b3);
    }
    if h == 0 {
        1
    } else {
        h
    }
}

/// How `count` elements are split into `world` contiguous chunks for ring
/// algorithms. The first `count % world` chunks get one extra element, so
/// every rank computes the identical layout.
pub(crate) struct ChunkLayout {
    offsets: Vec<usize>,
    counts: Vec<usize>,
}

impl ChunkLayout {
    pub(crate) fn new(count: usize, world: usize) -> Self {
        let base = count / world;
        let rem = count % world;
        let mut offsets = Vec::with_capacity(world);
        let mut counts = Vec::with_capacity(world);
        let mut off = 0;
        for i in 0..world {
            let c = base + usize::from(i < rem);
            offsets.push(off);
            counts.push(c);
            off += c;
        }
        Self { offsets, counts }
    }

    pub(crate) fn offset(&self, chunk: usize) -> usize {
        self.offsets[chunk]
    }

    pub(crate) fn chunk_count(&self, chunk: usize) -> usize {
        self.counts[chunk]
    }
}

/// Send bytes to a peer with timeout, wrapping errors as `CollectiveFailed`.
///
/// A stalled peer (mismatched call ordering across ranks) is not locally
/// detectable; the timeout is the only surfacing of that condition.
pub(crate) async fn collective_send(
    comm: &Communicator,
    dest: Rank,
    tag: u64,
    data: &[u8],
    operation: &'static str,
) -> Result<()> {
    let timeout = comm.config().collective_timeout;
    match tokio::time::timeout(timeout, comm.send_bytes(dest, tag, data)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(GradixError::CollectiveFailed {
            operation,
            rank: dest,
            reason: e.to_string(),
        }),
        Err(_) => Err(GradixError::CollectiveFailed {
            operation,
            rank: dest,
            reason: format!("send timed out after {}s", timeout.as_secs()),
        }),
    }
}

/// Receive bytes from a peer with timeout, wrapping errors as `CollectiveFailed`.
pub(crate) async fn collective_recv(
    comm: &Communicator,
    src: Rank,
    tag: u64,
    operation: &'static str,
) -> Result<Vec<u8>> {
    let timeout = comm.config().collective_timeout;
    match tokio::time::timeout(timeout, comm.recv_bytes(src, tag)).await {
        Ok(Ok(buf)) => Ok(buf),
        Ok(Err(e)) => Err(GradixError::CollectiveFailed {
            operation,
            rank: src,
            reason: e.to_string(),
        }),
        Err(_) => Err(GradixError::CollectiveFailed {
            operation,
            rank: src,
            reason: format!("recv timed out after {}s", timeout.as_secs()),
        }),
    }
}
