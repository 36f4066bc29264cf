use std::time::Duration;

use comms::msg::{Command, Msg};
use log::{debug, info, warn};
use tokio::net::{
    TcpListener, TcpStream, ToSocketAddrs,
    tcp::{OwnedReadHalf, OwnedWriteHalf},
};

use super::{Link, StarCollective};
use crate::{CollectiveErr, ROOT, Result, WorkerContext};

/// A star collective over tcp sockets.
pub type TcpCollective = StarCollective<OwnedReadHalf, OwnedWriteHalf>;

type TcpLink = Link<OwnedReadHalf, OwnedWriteHalf>;

const CONNECT_RETRIES: usize = 50;
const CONNECT_DELAY: Duration = Duration::from_millis(100);

fn tcp_link(stream: TcpStream) -> Result<TcpLink> {
    stream.set_nodelay(true)?;
    let (rx, tx) = stream.into_split();
    let (rx, tx) = comms::channel(rx, tx);
    Ok(Link::new(rx, tx))
}

/// Binds `addr` and waits for every other rank to join.
///
/// # Arguments
/// * `addr` - The address to listen at.
/// * `ctx` - The root's context.
pub async fn bind_root<A: ToSocketAddrs>(addr: A, ctx: WorkerContext) -> Result<TcpCollective> {
    let listener = TcpListener::bind(addr).await?;
    info!("listening at {}", listener.local_addr()?);
    accept_peers(&listener, ctx).await
}

/// Accepts a connection from every non root rank of the group.
///
/// Each peer must introduce itself with a `Join` command carrying its rank and the
/// group size, the links are then ordered by rank.
///
/// # Returns
/// An error if a peer announces a different group size, an invalid rank or a rank
/// that already joined.
pub async fn accept_peers(listener: &TcpListener, ctx: WorkerContext) -> Result<TcpCollective> {
    let world_size = ctx.world_size().get();
    let mut peers: Vec<Option<TcpLink>> = (1..world_size).map(|_| None).collect();
    let mut joined = 0;

    while joined < peers.len() {
        let (stream, addr) = listener.accept().await?;
        let mut link = tcp_link(stream)?;

        let (rank, peer_world) = match link.recv().await? {
            Msg::Control(Command::Join { rank, world_size }) => (rank, world_size),
            msg => {
                warn!("expected join from {addr}, got {}", msg.kind());
                continue;
            }
        };

        if peer_world != world_size {
            return Err(CollectiveErr::Bootstrap(format!(
                "rank {rank} expects {peer_world} workers, the root expects {world_size}"
            )));
        }

        if rank == ROOT || rank >= world_size {
            return Err(CollectiveErr::InvalidRank { rank, world_size });
        }

        let slot = &mut peers[rank - 1];
        if slot.is_some() {
            return Err(CollectiveErr::Bootstrap(format!("rank {rank} joined twice")));
        }

        debug!(rank = rank; "peer joined from {addr}");
        *slot = Some(link);
        joined += 1;
    }

    info!("every peer joined");

    // SAFETY: Every slot was filled in the loop above.
    let peers = peers.into_iter().map(Option::unwrap).collect();
    StarCollective::root(ctx, peers)
}

/// Connects to the root, retrying for a while if it's not listening yet.
///
/// # Arguments
/// * `addr` - The root's address.
/// * `ctx` - This worker's context.
pub async fn connect_root<A>(addr: A, ctx: WorkerContext) -> Result<TcpCollective>
where
    A: ToSocketAddrs + Clone,
{
    let mut attempt = 0;

    let stream = loop {
        match TcpStream::connect(addr.clone()).await {
            Ok(stream) => break stream,
            Err(e) if attempt < CONNECT_RETRIES => {
                attempt += 1;
                debug!(attempt = attempt; "root not reachable yet: {e}");
                tokio::time::sleep(CONNECT_DELAY).await;
            }
            Err(e) => return Err(e.into()),
        }
    };

    let mut link = tcp_link(stream)?;
    let join = Command::Join {
        rank: ctx.rank(),
        world_size: ctx.world_size().get(),
    };

    link.send(&Msg::Control(join)).await?;
    info!(rank = ctx.rank(); "joined the root");

    StarCollective::leaf(ctx, link)
}
