mod bootstrap;
mod context;

pub use bootstrap::{bootstrap_local, bootstrap_tcp};
pub use context::ClusterContext;
