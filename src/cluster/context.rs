use crate::error::{GradixError, Result};
use crate::types::Rank;

/// Identity of this worker within the process group.
///
/// Set once at initialization, immutable for the process lifetime. Every
/// component that issues collective calls takes the context (or a
/// communicator built from it) explicitly; there are no process-wide
/// globals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterContext {
    rank: Rank,
    world_size: u32,
    local_rank: u32,
}

impl ClusterContext {
    pub fn new(rank: Rank, world_size: u32, local_rank: u32) -> Result<Self> {
        if world_size == 0 || rank >= world_size {
            return Err(GradixError::InvalidRank { rank, world_size });
        }
        Ok(Self {
            rank,
            world_size,
            local_rank,
        })
    }

    /// Read the context from `GRADIX_RANK`, `GRADIX_WORLD_SIZE` and
    /// `GRADIX_LOCAL_RANK` (local rank defaults to 0 when unset).
    pub fn from_env() -> Result<Self> {
        let rank = env_u32("GRADIX_RANK")?;
        let world_size = env_u32("GRADIX_WORLD_SIZE")?;
        let local_rank = match std::env::var("GRADIX_LOCAL_RANK") {
            Ok(v) => v.parse::<u32>().map_err(|e| {
                GradixError::DecodeFailed(format!("GRADIX_LOCAL_RANK not a u32: {e}"))
            })?,
            Err(_) => 0,
        };
        Self::new(rank, world_size, local_rank)
    }

    pub fn rank(&self) -> Rank {
        self.rank
    }

    pub fn world_size(&self) -> u32 {
        self.world_size
    }

    pub fn local_rank(&self) -> u32 {
        self.local_rank
    }
}

fn env_u32(name: &'static str) -> Result<u32> {
    let v = std::env::var(name)
        .map_err(|_| GradixError::DecodeFailed(format!("{name} is not set")))?;
    v.parse::<u32>()
        .map_err(|e| GradixError::DecodeFailed(format!("{name} not a u32: {e}")))
}
