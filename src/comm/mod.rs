mod collectives;

use crate::cluster::ClusterContext;
use crate::config::GradixConfig;
use crate::error::{GradixError, Result};
use crate::transport::TcpChannel;
use crate::types::Rank;
use std::collections::HashMap;

/// The collective communication endpoint for one worker process.
///
/// Holds one [`TcpChannel`] per remote rank over a full mesh. All collective
/// operations are order-sensitive across ranks: every rank must issue the
/// matching call with the matching tag, or the operation stalls until the
/// collective timeout fires. There is no recovery from a stalled collective;
/// orchestration restarts the job.
pub struct Communicator {
    rank: Rank,
    world_size: u32,
    local_rank: u32,
    config: GradixConfig,
    peers: HashMap<Rank, TcpChannel>,
}

impl Communicator {
    /// Create a communicator from a fully-established peer mesh.
    ///
    /// Every rank other than our own must have a channel; a partial mesh
    /// means the process group was not initialized and any collective would
    /// deadlock, so this fails fast instead.
    pub fn new(
        ctx: ClusterContext,
        peers: HashMap<Rank, TcpChannel>,
        config: GradixConfig,
    ) -> Result<Self> {
        for r in 0..ctx.world_size() {
            if r != ctx.rank() && !peers.contains_key(&r) {
                return Err(GradixError::Uninitialized {
                    operation: "communicator construction",
                });
            }
        }
        Ok(Self {
            rank: ctx.rank(),
            world_size: ctx.world_size(),
            local_rank: ctx.local_rank(),
            config,
            peers,
        })
    }

    /// Single-process communicator (world size 1). Collectives become
    /// no-ops; the synchronizer bypasses reduction entirely.
    pub fn single(config: GradixConfig) -> Self {
        Self {
            rank: 0,
            world_size: 1,
            local_rank: 0,
            config,
            peers: HashMap::new(),
        }
    }

    /// This worker's rank (0-indexed).
    pub fn rank(&self) -> Rank {
        self.rank
    }

    /// Total number of worker processes.
    pub fn world_size(&self) -> u32 {
        self.world_size
    }

    /// Rank among the workers on the same host.
    pub fn local_rank(&self) -> u32 {
        self.local_rank
    }

    pub fn config(&self) -> &GradixConfig {
        &self.config
    }

    fn peer(&self, rank: Rank) -> Result<&TcpChannel> {
        self.peers
            .get(&rank)
            .ok_or(GradixError::UnknownPeer { rank })
    }

    /// Send raw bytes to a peer on a tag lane.
    pub(crate) async fn send_bytes(&self, dest: Rank, tag: u64, data: &[u8]) -> Result<()> {
        if dest >= self.world_size {
            return Err(GradixError::InvalidRank {
                rank: dest,
                world_size: self.world_size,
            });
        }
        self.peer(dest)?.send(tag, data).await
    }

    /// Receive raw bytes from a peer on a tag lane.
    pub(crate) async fn recv_bytes(&self, src: Rank, tag: u64) -> Result<Vec<u8>> {
        if src >= self.world_size {
            return Err(GradixError::InvalidRank {
                rank: src,
                world_size: self.world_size,
            });
        }
        self.peer(src)?.recv(tag).await
    }
}
