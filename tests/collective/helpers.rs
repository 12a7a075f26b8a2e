use gradix::{bootstrap_local, Communicator, GradixConfig};
use std::sync::Arc;

/// Helper: run a collective operation across N ranks concurrently.
/// Keeps all communicators alive until every task completes.
pub async fn run_collective<F, Fut>(world_size: u32, f: F)
where
    F: Fn(Arc<Communicator>) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    let comms = bootstrap_local(world_size, GradixConfig::default())
        .await
        .unwrap();

    let f = Arc::new(f);
    let mut handles = Vec::new();
    for c in &comms {
        let c = Arc::clone(c);
        let f = Arc::clone(&f);
        handles.push(tokio::spawn(async move { f(c).await }));
    }
    for h in handles {
        h.await.unwrap();
    }
}

pub fn f32_bytes(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub fn bytes_f32(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

pub fn i64_bytes(values: &[i64]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub fn bytes_i64(bytes: &[u8]) -> Vec<i64> {
    bytes
        .chunks_exact(8)
        .map(|c| i64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
        .collect()
}
