use gradix::{DataType, ReduceOp};

use super::helpers::{bytes_f32, bytes_i64, f32_bytes, i64_bytes, run_collective};

#[tokio::test]
async fn test_allreduce_2_ranks_f32() {
    run_collective(2, |comm| async move {
        let rank = comm.rank();
        let val = (rank + 1) as f32;
        let mut buf = f32_bytes(&vec![val; 4]);

        comm.all_reduce(&mut buf, 4, DataType::F32, ReduceOp::Sum)
            .await
            .unwrap();

        assert_eq!(bytes_f32(&buf), vec![3.0f32; 4], "rank {rank}");
    })
    .await;
}

#[tokio::test]
async fn test_allreduce_3_ranks_f32() {
    run_collective(3, |comm| async move {
        let rank = comm.rank();
        let val = (rank + 1) as f32;
        let mut buf = f32_bytes(&vec![val; 6]);

        comm.all_reduce(&mut buf, 6, DataType::F32, ReduceOp::Sum)
            .await
            .unwrap();

        assert_eq!(bytes_f32(&buf), vec![6.0f32; 6], "rank {rank}");
    })
    .await;
}

#[tokio::test]
async fn test_allreduce_uneven_count() {
    run_collective(3, |comm| async move {
        let rank = comm.rank();
        let data: Vec<f32> = (0..7).map(|i| (i as f32) * ((rank + 1) as f32)).collect();
        let mut buf = f32_bytes(&data);

        comm.all_reduce(&mut buf, 7, DataType::F32, ReduceOp::Sum)
            .await
            .unwrap();

        let expected: Vec<f32> = (0..7).map(|i| (i as f32) * 6.0).collect();
        assert_eq!(bytes_f32(&buf), expected, "rank {rank}");
    })
    .await;
}

#[tokio::test]
async fn test_allreduce_fewer_elements_than_ranks() {
    run_collective(4, |comm| async move {
        let rank = comm.rank();
        let mut buf = f32_bytes(&[(rank + 1) as f32]);

        comm.all_reduce(&mut buf, 1, DataType::F32, ReduceOp::Sum)
            .await
            .unwrap();

        assert_eq!(bytes_f32(&buf), vec![10.0f32], "rank {rank}");
    })
    .await;
}

#[tokio::test]
async fn test_allreduce_min_3_ranks() {
    run_collective(3, |comm| async move {
        let rank = comm.rank();
        let mut buf = f32_bytes(&vec![(rank + 1) as f32; 4]);

        comm.all_reduce(&mut buf, 4, DataType::F32, ReduceOp::Min)
            .await
            .unwrap();

        assert_eq!(bytes_f32(&buf), vec![1.0f32; 4], "rank {rank}");
    })
    .await;
}

#[tokio::test]
async fn test_allreduce_max_3_ranks() {
    run_collective(3, |comm| async move {
        let rank = comm.rank();
        let mut buf = f32_bytes(&vec![(rank + 1) as f32; 4]);

        comm.all_reduce(&mut buf, 4, DataType::F32, ReduceOp::Max)
            .await
            .unwrap();

        assert_eq!(bytes_f32(&buf), vec![3.0f32; 4], "rank {rank}");
    })
    .await;
}

#[tokio::test]
async fn test_allreduce_i64_sum() {
    run_collective(3, |comm| async move {
        let rank = comm.rank();
        let mut buf = i64_bytes(&vec![(rank as i64) + 1; 5]);

        comm.all_reduce(&mut buf, 5, DataType::I64, ReduceOp::Sum)
            .await
            .unwrap();

        assert_eq!(bytes_i64(&buf), vec![6i64; 5], "rank {rank}");
    })
    .await;
}

#[tokio::test]
async fn test_allreduce_empty_buffer() {
    run_collective(2, |comm| async move {
        let mut buf = Vec::new();
        comm.all_reduce(&mut buf, 0, DataType::F32, ReduceOp::Sum)
            .await
            .unwrap();
        assert!(buf.is_empty());
    })
    .await;
}
