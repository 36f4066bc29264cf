use std::{num::NonZeroUsize, sync::Arc};

use parking_lot::{Mutex, RwLock};
use tokio::sync::Barrier;

use crate::{Collective, CollectiveErr, ROOT, Result, WorkerContext};

struct Shared {
    barrier: Barrier,
    slots: Vec<Mutex<Vec<f32>>>,
    board: RwLock<Vec<f32>>,
}

/// A collective among tasks of the same process.
///
/// Every operation is a write phase and a read phase split by the shared barrier,
/// with a second wait so nobody overwrites a slot before it was read.
pub struct LocalCollective {
    ctx: WorkerContext,
    shared: Arc<Shared>,
}

/// Creates the members of a new in process group, in rank order.
pub fn group(world_size: NonZeroUsize) -> Vec<LocalCollective> {
    let shared = Arc::new(Shared {
        barrier: Barrier::new(world_size.get()),
        slots: (0..world_size.get()).map(|_| Mutex::new(Vec::new())).collect(),
        board: RwLock::new(Vec::new()),
    });

    (0..world_size.get())
        .map(|rank| LocalCollective {
            // SAFETY: `rank` is lower than `world_size`.
            ctx: WorkerContext::new(rank, world_size).unwrap(),
            shared: shared.clone(),
        })
        .collect()
}

impl LocalCollective {
    fn check_len(op: &'static str, got: usize, expected: usize) -> Result<()> {
        if got != expected {
            return Err(CollectiveErr::SizeMismatch { op, got, expected });
        }

        Ok(())
    }

    fn sum_slots(&self, buf: &mut [f32]) -> Result<()> {
        for slot in self.shared.slots.iter().skip(ROOT + 1) {
            let slot = slot.lock();
            Self::check_len("reduce", slot.len(), buf.len())?;

            for (acc, x) in buf.iter_mut().zip(slot.iter()) {
                *acc += x;
            }
        }

        Ok(())
    }

    fn read_board(&self, buf: &mut [f32]) -> Result<()> {
        let board = self.shared.board.read();
        Self::check_len("broadcast", buf.len(), board.len())?;
        buf.copy_from_slice(&board);
        Ok(())
    }
}

impl Collective for LocalCollective {
    fn context(&self) -> WorkerContext {
        self.ctx
    }

    async fn reduce_sum(&mut self, buf: &mut [f32]) -> Result<()> {
        if !self.ctx.is_root() {
            let mut slot = self.shared.slots[self.ctx.rank()].lock();
            slot.clear();
            slot.extend_from_slice(buf);
        }

        self.shared.barrier.wait().await;

        let res = if self.ctx.is_root() {
            self.sum_slots(buf)
        } else {
            Ok(())
        };

        self.shared.barrier.wait().await;
        res
    }

    async fn broadcast(&mut self, buf: &mut [f32]) -> Result<()> {
        if self.ctx.is_root() {
            let mut board = self.shared.board.write();
            board.clear();
            board.extend_from_slice(buf);
        }

        self.shared.barrier.wait().await;

        let res = if self.ctx.is_root() {
            Ok(())
        } else {
            self.read_board(buf)
        };

        self.shared.barrier.wait().await;
        res
    }

    async fn barrier(&mut self) -> Result<()> {
        self.shared.barrier.wait().await;
        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}
