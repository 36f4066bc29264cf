use crate::{Result, WorkerContext};

/// The communication a group of workers needs to train in lockstep.
///
/// Every worker of the group must call the same operations in the same order,
/// a worker that diverges leaves the rest blocked on the next call.
#[allow(unused)]
#[trait_variant::make(Collective: Send)]
pub trait CollectiveTemplate {
    /// The caller's place in the group.
    fn context(&self) -> WorkerContext;

    /// Sums `buf` element wise across the group into the root's `buf`.
    ///
    /// Terms are added in ascending rank order starting from the root's own buffer.
    /// Only the root's `buf` holds the result, the rest are left untouched.
    ///
    /// # Returns
    /// An error if the buffers' lengths differ or the link fails.
    async fn reduce_sum(&mut self, buf: &mut [f32]) -> Result<()>;

    /// Overwrites every worker's `buf` with the root's.
    ///
    /// # Returns
    /// An error if the buffers' lengths differ or the link fails.
    async fn broadcast(&mut self, buf: &mut [f32]) -> Result<()>;

    /// Waits until every worker of the group reaches this point.
    async fn barrier(&mut self) -> Result<()>;

    /// Tears down the group's links, the collective can't be used afterwards.
    async fn finish(&mut self) -> Result<()>;
}
