use std::num::NonZeroUsize;

use crate::{CollectiveErr, Result};

/// The rank every reduction ends at and every broadcast starts from.
pub const ROOT: usize = 0;

/// Who a worker is within its group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerContext {
    rank: usize,
    world_size: NonZeroUsize,
}

impl WorkerContext {
    /// Creates a new `WorkerContext`.
    ///
    /// # Returns
    /// An error if `rank` is not lower than `world_size`.
    pub fn new(rank: usize, world_size: NonZeroUsize) -> Result<Self> {
        if rank >= world_size.get() {
            return Err(CollectiveErr::InvalidRank {
                rank,
                world_size: world_size.get(),
            });
        }

        Ok(Self { rank, world_size })
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn world_size(&self) -> NonZeroUsize {
        self.world_size
    }

    pub fn is_root(&self) -> bool {
        self.rank == ROOT
    }
}
