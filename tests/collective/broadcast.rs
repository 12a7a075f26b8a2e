use super::helpers::{bytes_f32, f32_bytes, run_collective};

#[tokio::test]
async fn test_broadcast_2_ranks_flat() {
    run_collective(2, |comm| async move {
        let rank = comm.rank();
        let mut buf = if rank == 0 {
            f32_bytes(&[1.0, 2.0, 3.0])
        } else {
            vec![0u8; 12]
        };

        comm.broadcast(&mut buf, 0).await.unwrap();

        assert_eq!(bytes_f32(&buf), vec![1.0, 2.0, 3.0], "rank {rank}");
    })
    .await;
}

#[tokio::test]
async fn test_broadcast_5_ranks_tree() {
    run_collective(5, |comm| async move {
        let rank = comm.rank();
        let mut buf = if rank == 0 {
            f32_bytes(&[42.0; 8])
        } else {
            vec![0u8; 32]
        };

        comm.broadcast(&mut buf, 0).await.unwrap();

        assert_eq!(bytes_f32(&buf), vec![42.0; 8], "rank {rank}");
    })
    .await;
}

#[tokio::test]
async fn test_broadcast_nonzero_root() {
    run_collective(4, |comm| async move {
        let rank = comm.rank();
        let mut buf = if rank == 2 {
            f32_bytes(&[-1.5, 0.25])
        } else {
            vec![0u8; 8]
        };

        comm.broadcast(&mut buf, 2).await.unwrap();

        assert_eq!(bytes_f32(&buf), vec![-1.5, 0.25], "rank {rank}");
    })
    .await;
}

#[tokio::test]
async fn test_broadcast_invalid_root() {
    run_collective(2, |comm| async move {
        let mut buf = vec![0u8; 4];
        assert!(comm.broadcast(&mut buf, 9).await.is_err());
    })
    .await;
}
