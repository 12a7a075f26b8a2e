use super::helpers::{bytes_f32, f32_bytes, run_collective};

#[tokio::test]
async fn test_allgather_2_ranks() {
    run_collective(2, |comm| async move {
        let rank = comm.rank();
        let send = f32_bytes(&[rank as f32, rank as f32 + 0.5]);

        let parts = comm.all_gather(&send).await.unwrap();

        assert_eq!(parts.len(), 2, "rank {rank}");
        assert_eq!(bytes_f32(&parts[0]), vec![0.0, 0.5]);
        assert_eq!(bytes_f32(&parts[1]), vec![1.0, 1.5]);
    })
    .await;
}

#[tokio::test]
async fn test_allgather_variable_lengths() {
    run_collective(3, |comm| async move {
        let rank = comm.rank();
        // Rank r contributes r+1 elements.
        let send: Vec<f32> = (0..=rank).map(|i| (rank * 10 + i) as f32).collect();

        let parts = comm.all_gather(&f32_bytes(&send)).await.unwrap();

        assert_eq!(parts.len(), 3, "rank {rank}");
        for (r, part) in parts.iter().enumerate() {
            let expected: Vec<f32> = (0..=r as u32).map(|i| (r as u32 * 10 + i) as f32).collect();
            assert_eq!(bytes_f32(part), expected, "rank {rank} part {r}");
        }
    })
    .await;
}

#[tokio::test]
async fn test_allgather_empty_contribution() {
    run_collective(3, |comm| async move {
        let rank = comm.rank();
        // Rank 1 contributes nothing.
        let send = if rank == 1 {
            Vec::new()
        } else {
            f32_bytes(&[rank as f32])
        };

        let parts = comm.all_gather(&send).await.unwrap();

        assert_eq!(parts.len(), 3);
        assert_eq!(bytes_f32(&parts[0]), vec![0.0]);
        assert!(parts[1].is_empty());
        assert_eq!(bytes_f32(&parts[2]), vec![2.0]);
    })
    .await;
}

#[tokio::test]
async fn test_allgather_single_rank() {
    run_collective(1, |comm| async move {
        let parts = comm.all_gather(&f32_bytes(&[7.0])).await.unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(bytes_f32(&parts[0]), vec![7.0]);
    })
    .await;
}
