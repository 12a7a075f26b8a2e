//! Mesh establishment: every pair of ranks gets one TCP channel.
//!
//! `bootstrap_local` wires a whole world inside one process (tests,
//! single-host workers). `bootstrap_tcp` wires one rank of a multi-process
//! deployment from a list of peer addresses.

use crate::cluster::ClusterContext;
use crate::comm::Communicator;
use crate::config::GradixConfig;
use crate::error::{GradixError, Result};
use crate::transport::{tcp_accept, tcp_connect, tcp_listen, TcpChannel};
use crate::types::Rank;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// Tag lane reserved for the rank handshake during mesh establishment.
const HANDSHAKE_TAG: u64 = u64::MAX;

/// Delay between connect retries while waiting for a peer's listener.
const CONNECT_RETRY: Duration = Duration::from_millis(50);

fn loopback() -> SocketAddr {
    SocketAddr::V4(std::net::SocketAddrV4::new(
        std::net::Ipv4Addr::LOCALHOST,
        0,
    ))
}

/// Build a full in-process mesh of `world_size` communicators on localhost.
///
/// For each pair (i, j) with i < j: rank i listens, rank j connects.
pub async fn bootstrap_local(
    world_size: u32,
    config: GradixConfig,
) -> Result<Vec<Arc<Communicator>>> {
    if world_size == 0 {
        return Err(GradixError::InvalidRank {
            rank: 0,
            world_size,
        });
    }
    if world_size == 1 {
        return Ok(vec![Arc::new(Communicator::single(config))]);
    }

    let n = world_size as usize;
    let mut meshes: Vec<HashMap<Rank, TcpChannel>> = (0..n).map(|_| HashMap::new()).collect();

    for i in 0..n {
        for j in (i + 1)..n {
            let (listener, addr) = tcp_listen(loopback()).await?;
            let (chan_i, chan_j) = tokio::try_join!(tcp_accept(&listener), tcp_connect(addr))?;
            meshes[i].insert(j as Rank, chan_i);
            meshes[j].insert(i as Rank, chan_j);
        }
    }

    tracing::info!(world_size, "local mesh established");

    meshes
        .into_iter()
        .enumerate()
        .map(|(rank, peers)| {
            let ctx = ClusterContext::new(rank as Rank, world_size, rank as Rank)?;
            Ok(Arc::new(Communicator::new(ctx, peers, config.clone())?))
        })
        .collect()
}

/// Wire one rank of a multi-process mesh.
///
/// `peer_addrs[r]` is the listen address of rank `r` (our own entry is used
/// as our bind address). Each rank connects to every lower rank and accepts
/// from every higher rank; the first frame on a fresh connection carries the
/// connector's rank so the acceptor can slot the channel.
pub async fn bootstrap_tcp(
    ctx: ClusterContext,
    peer_addrs: &[SocketAddr],
    config: GradixConfig,
) -> Result<Arc<Communicator>> {
    let world = ctx.world_size() as usize;
    if peer_addrs.len() != world {
        return Err(GradixError::Uninitialized {
            operation: "bootstrap: peer address list does not cover the world",
        });
    }
    if world == 1 {
        return Ok(Arc::new(Communicator::single(config)));
    }

    let rank = ctx.rank();
    let (listener, local) = tcp_listen(peer_addrs[rank as usize]).await?;
    tracing::info!(rank, %local, "listening for mesh peers");

    let deadline = tokio::time::Instant::now() + config.collective_timeout;

    // Connect to all lower ranks, retrying until their listeners are up.
    let connect_fut = async {
        let mut channels: Vec<(Rank, TcpChannel)> = Vec::new();
        for peer in 0..rank {
            let chan = loop {
                match tcp_connect(peer_addrs[peer as usize]).await {
                    Ok(chan) => break chan,
                    Err(e) => {
                        if tokio::time::Instant::now() >= deadline {
                            return Err(GradixError::CollectiveFailed {
                                operation: "bootstrap",
                                rank: peer,
                                reason: e.to_string(),
                            });
                        }
                        tokio::time::sleep(CONNECT_RETRY).await;
                    }
                }
            };
            chan.send(HANDSHAKE_TAG, &rank.to_le_bytes()).await?;
            channels.push((peer, chan));
        }
        Ok(channels)
    };

    // Accept from all higher ranks; the handshake frame identifies them.
    let accept_fut = async {
        let mut channels: Vec<(Rank, TcpChannel)> = Vec::new();
        for _ in (rank + 1)..ctx.world_size() {
            let chan = tcp_accept(&listener).await?;
            let frame = chan.recv(HANDSHAKE_TAG).await?;
            let bytes: [u8; 4] = frame.as_slice().try_into().map_err(|_| {
                GradixError::DecodeFailed(format!("handshake frame of {} bytes", frame.len()))
            })?;
            let peer = Rank::from_le_bytes(bytes);
            if peer <= rank || peer >= ctx.world_size() {
                return Err(GradixError::InvalidRank {
                    rank: peer,
                    world_size: ctx.world_size(),
                });
            }
            channels.push((peer, chan));
        }
        Ok(channels)
    };

    let timeout = config.collective_timeout;
    let (connected, accepted) =
        match tokio::time::timeout(timeout, async { tokio::try_join!(connect_fut, accept_fut) })
            .await
        {
            Ok(r) => r?,
            Err(_) => {
                return Err(GradixError::CollectiveFailed {
                    operation: "bootstrap",
                    rank,
                    reason: format!("mesh establishment timed out after {}s", timeout.as_secs()),
                });
            }
        };

    let mut peers = HashMap::new();
    for (peer, chan) in connected.into_iter().chain(accepted) {
        peers.insert(peer, chan);
    }

    tracing::info!(rank, world, "mesh established");
    Ok(Arc::new(Communicator::new(ctx, peers, config)?))
}
