pub mod cluster;
pub mod collective;
pub mod comm;
pub mod compression;
pub mod config;
pub mod error;
pub mod quantize;
mod reduce;
pub mod sync;
pub mod tensor;
pub mod transport;
pub mod types;

pub use cluster::{bootstrap_local, bootstrap_tcp, ClusterContext};
pub use collective::{fnv1a_tag, CollectiveHandle};
pub use comm::Communicator;
pub use compression::{CodecKind, CompressionCodec};
pub use config::{GradixConfig, TopKPolicy, TopKSelection};
pub use error::{GradixError, Result};
pub use quantize::{quantize, sign_quantize, ErrorFeedbackMemory};
pub use sync::{broadcast_parameters, DistributedOptimizer, GradientComputer, GradientSynchronizer};
pub use tensor::{Gradient, IndexedSlices, Tensor};
pub use transport::TcpChannel;
pub use types::{DataType, Rank, ReduceOp};
