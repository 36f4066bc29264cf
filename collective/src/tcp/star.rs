use comms::{
    FrameReceiver, FrameSender,
    msg::{Command, Msg, Payload},
};
use log::debug;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::{Collective, CollectiveErr, Result, WorkerContext};

/// A framed link to a single peer with its own receive buffer.
pub struct Link<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    rx: FrameReceiver<R>,
    tx: FrameSender<W>,
    rx_buf: Vec<u32>,
}

impl<R, W> Link<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a new `Link`.
    pub fn new(rx: FrameReceiver<R>, tx: FrameSender<W>) -> Self {
        Self {
            rx,
            tx,
            rx_buf: Vec::new(),
        }
    }

    pub(super) async fn send(&mut self, msg: &Msg<'_>) -> Result<()> {
        self.tx.send(msg).await?;
        Ok(())
    }

    pub(super) async fn recv(&mut self) -> Result<Msg<'_>> {
        let msg = self.rx.recv_into(&mut self.rx_buf).await?;
        Ok(msg)
    }

    async fn expect_command(&mut self, op: &'static str, expected: Command) -> Result<()> {
        match self.recv().await? {
            Msg::Control(cmd) if cmd == expected => Ok(()),
            msg => Err(unexpected(op, msg)),
        }
    }

    async fn recv_nums(&mut self, op: &'static str, buf: &mut [f32], add: bool) -> Result<()> {
        let nums = match self.recv().await? {
            Msg::Data(Payload::Grad(nums)) if add => nums,
            Msg::Data(Payload::Params(nums)) if !add => nums,
            msg => return Err(unexpected(op, msg)),
        };

        if nums.len() != buf.len() {
            return Err(CollectiveErr::SizeMismatch {
                op,
                got: nums.len(),
                expected: buf.len(),
            });
        }

        if add {
            for (acc, x) in buf.iter_mut().zip(nums) {
                *acc += x;
            }
        } else {
            buf.copy_from_slice(nums);
        }

        Ok(())
    }
}

fn unexpected(op: &'static str, msg: Msg<'_>) -> CollectiveErr {
    match msg {
        Msg::Err(detail) => CollectiveErr::Remote(detail.into_owned()),
        msg => CollectiveErr::UnexpectedMessage {
            op,
            got: msg.kind(),
        },
    }
}

enum Role<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Links to every other rank, in ascending rank order.
    Root(Vec<Link<R, W>>),
    Leaf(Link<R, W>),
}

/// A collective where every rank talks only to the root.
///
/// The root folds incoming gradients in rank order and fans parameters and barrier
/// releases back out.
pub struct StarCollective<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    ctx: WorkerContext,
    role: Role<R, W>,
}

impl<R, W> StarCollective<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates the root's end of the star.
    ///
    /// # Arguments
    /// * `ctx` - The root's context.
    /// * `peers` - A link to every other rank, ordered by rank.
    ///
    /// # Returns
    /// An error if `ctx` is not the root's or there isn't one link per peer.
    pub fn root(ctx: WorkerContext, peers: Vec<Link<R, W>>) -> Result<Self> {
        if !ctx.is_root() {
            return Err(CollectiveErr::Bootstrap(format!(
                "rank {} can't be the root",
                ctx.rank()
            )));
        }

        let expected = ctx.world_size().get() - 1;
        if peers.len() != expected {
            return Err(CollectiveErr::SizeMismatch {
                op: "bootstrap",
                got: peers.len(),
                expected,
            });
        }

        Ok(Self {
            ctx,
            role: Role::Root(peers),
        })
    }

    /// Creates a non root end of the star.
    ///
    /// # Returns
    /// An error if `ctx` is the root's.
    pub fn leaf(ctx: WorkerContext, root: Link<R, W>) -> Result<Self> {
        if ctx.is_root() {
            return Err(CollectiveErr::Bootstrap(
                "the root can't be a leaf".to_string(),
            ));
        }

        Ok(Self {
            ctx,
            role: Role::Leaf(root),
        })
    }
}

impl<R, W> Collective for StarCollective<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    fn context(&self) -> WorkerContext {
        self.ctx
    }

    async fn reduce_sum(&mut self, buf: &mut [f32]) -> Result<()> {
        match &mut self.role {
            Role::Root(peers) => {
                for peer in peers.iter_mut() {
                    peer.recv_nums("reduce", buf, true).await?;
                }
            }
            Role::Leaf(root) => root.send(&Msg::Data(Payload::Grad(&*buf))).await?,
        }

        Ok(())
    }

    async fn broadcast(&mut self, buf: &mut [f32]) -> Result<()> {
        match &mut self.role {
            Role::Root(peers) => {
                let msg = Msg::Data(Payload::Params(&*buf));
                for peer in peers.iter_mut() {
                    peer.send(&msg).await?;
                }
            }
            Role::Leaf(root) => root.recv_nums("broadcast", buf, false).await?,
        }

        Ok(())
    }

    async fn barrier(&mut self) -> Result<()> {
        match &mut self.role {
            Role::Root(peers) => {
                for peer in peers.iter_mut() {
                    peer.expect_command("barrier", Command::Barrier).await?;
                }

                for peer in peers.iter_mut() {
                    peer.send(&Msg::Control(Command::Release)).await?;
                }
            }
            Role::Leaf(root) => {
                root.send(&Msg::Control(Command::Barrier)).await?;
                root.expect_command("barrier", Command::Release).await?;
            }
        }

        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        let rank = self.ctx.rank();

        match &mut self.role {
            Role::Root(peers) => {
                for peer in peers.iter_mut() {
                    peer.expect_command("finish", Command::Disconnect).await?;
                    peer.send(&Msg::Control(Command::Disconnect)).await?;
                }
            }
            Role::Leaf(root) => {
                root.send(&Msg::Control(Command::Disconnect)).await?;
                root.expect_command("finish", Command::Disconnect).await?;
            }
        }

        debug!(rank = rank; "collective finished");
        Ok(())
    }
}
