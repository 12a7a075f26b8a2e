use gradix::{fnv1a_tag, DataType, ReduceOp};

use super::helpers::{bytes_f32, f32_bytes, run_collective};

#[tokio::test]
async fn test_concurrent_tagged_allreduces() {
    run_collective(3, |comm| async move {
        let rank = comm.rank();

        // Launch one reduction per "parameter", each on its own tag lane.
        let mut handles = Vec::new();
        for p in 0..4u32 {
            let buf = f32_bytes(&vec![(rank + p) as f32; 3]);
            let tag = fnv1a_tag(&[format!("param/{p}")]);
            handles.push((
                p,
                comm.all_reduce_nb(buf, 3, DataType::F32, ReduceOp::Sum, tag),
            ));
        }

        // Await in reverse launch order; lanes are independent.
        for (p, mut handle) in handles.into_iter().rev() {
            let out = handle.wait().await.unwrap();
            let expected = 3.0 * p as f32 + 3.0;
            assert_eq!(bytes_f32(&out), vec![expected; 3], "rank {rank} param {p}");
        }
    })
    .await;
}

#[tokio::test]
async fn test_nonblocking_allgather() {
    run_collective(2, |comm| async move {
        let rank = comm.rank();
        let mut handle =
            comm.all_gather_nb(f32_bytes(&[rank as f32]), fnv1a_tag(&["embedding"]));
        let parts = handle.wait().await.unwrap();
        assert_eq!(bytes_f32(&parts[0]), vec![0.0]);
        assert_eq!(bytes_f32(&parts[1]), vec![1.0]);
    })
    .await;
}

#[tokio::test]
async fn test_wait_twice_is_an_error() {
    run_collective(2, |comm| async move {
        let mut handle = comm.all_reduce_nb(
            f32_bytes(&[1.0]),
            1,
            DataType::F32,
            ReduceOp::Sum,
            fnv1a_tag(&["w"]),
        );
        handle.wait().await.unwrap();
        assert!(handle.wait().await.is_err());
    })
    .await;
}
