mod allgather;
mod allreduce;
mod broadcast;
mod handle;
mod helpers;

pub use handle::CollectiveHandle;
pub use helpers::fnv1a_tag;

pub(crate) use allgather::ring_allgather;
pub(crate) use allreduce::ring_allreduce;
pub(crate) use broadcast::tree_broadcast;
pub(crate) use helpers::DEFAULT_TAG;
