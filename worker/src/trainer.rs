use std::{
    num::NonZeroUsize,
    time::{Duration, Instant},
};

use collective::{Collective, WorkerContext};
use log::{debug, info};
use machine_learning::{model::Parameters, optimization::Optimizer, training::StepExecutor};
use tokio::task;

use crate::{Result, metrics::WorkerMetrics, report::StepReport, state::WorkerState};

/// What a worker is left with once training is over.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub ctx: WorkerContext,
    pub reports: Vec<StepReport>,
    /// The final parameters, identical on every worker.
    pub params: Parameters,
    pub metrics: WorkerMetrics,
    pub elapsed: Duration,
}

impl TrainingOutcome {
    /// The mean wall time of a step.
    pub fn mean_step_time(&self) -> Duration {
        match self.reports.len() {
            0 => Duration::ZERO,
            n => self.reports.iter().map(|report| report.duration).sum::<Duration>() / n as u32,
        }
    }

    /// The total loss of the last step, only known by the root.
    pub fn final_loss(&self) -> Option<f32> {
        self.reports.last().and_then(|report| report.total_loss)
    }
}

/// Drives a single worker through every training step in lockstep with its group.
///
/// Design:
/// - Keeps persistent buffers in `WorkerState`.
/// - Compute is CPU-bound and runs on Tokio's blocking pool via `spawn_blocking`,
///   the executor and buffers are moved in and back out every step.
/// - Only the root updates the parameters, every other worker gets them by broadcast.
pub struct Trainer<C, E, O> {
    steps: NonZeroUsize,
    samples: usize,
    collective: C,
    executor: E,
    optimizer: O,
    state: WorkerState,
    metrics: WorkerMetrics,
}

impl<C, E, O> Trainer<C, E, O>
where
    C: Collective,
    E: StepExecutor,
    O: Optimizer + Send,
{
    /// Creates a new `Trainer`.
    ///
    /// # Arguments
    /// * `steps` - The amount of training steps.
    /// * `samples` - The size of the whole training set, used to average the reported loss.
    /// * `collective` - This worker's end of the group.
    /// * `executor` - Computes this worker's partition.
    /// * `optimizer` - Applies the reduced gradient, only used by the root.
    /// * `params` - The initial parameters, only the root's are kept.
    pub fn new(
        steps: NonZeroUsize,
        samples: usize,
        collective: C,
        executor: E,
        optimizer: O,
        params: Parameters,
    ) -> Self {
        Self {
            steps,
            samples,
            collective,
            executor,
            optimizer,
            state: WorkerState::new(params),
            metrics: WorkerMetrics::default(),
        }
    }

    pub fn context(&self) -> WorkerContext {
        self.collective.context()
    }

    /// Runs every step and tears the group down.
    ///
    /// # Returns
    /// The reports and the final parameters, or the first failure. A failure leaves the
    /// rest of the group blocked on their next collective operation.
    pub async fn run(self) -> Result<TrainingOutcome> {
        let Self {
            steps,
            samples,
            mut collective,
            mut executor,
            mut optimizer,
            mut state,
            mut metrics,
        } = self;

        let ctx = collective.context();
        let rank = ctx.rank();
        let start = Instant::now();

        collective.broadcast(state.params.as_mut_slice()).await?;
        debug!(rank = rank; "initial parameters in place");

        executor = task::spawn_blocking(move || {
            executor.prepare();
            executor
        })
        .await?;

        let mut reports = Vec::with_capacity(steps.get());

        for _ in 0..steps.get() {
            let step_start = Instant::now();
            state.zero_grad();

            let t = Instant::now();
            (executor, state) = task::spawn_blocking(move || {
                executor.execute(&state.params, &mut state.grad);
                (executor, state)
            })
            .await?;
            metrics.compute_time += t.elapsed();
            metrics.add_samples(executor.samples());

            let local_loss = state.grad.loss();

            let t = Instant::now();
            collective.reduce_sum(state.grad.as_mut_slice()).await?;
            metrics.reduce_time += t.elapsed();

            let total_loss = if ctx.is_root() {
                let t = Instant::now();
                optimizer.update_params(state.params.as_mut_slice(), state.grad.params_grad())?;
                metrics.update_time += t.elapsed();
                Some(state.grad.loss())
            } else {
                None
            };

            let t = Instant::now();
            collective.broadcast(state.params.as_mut_slice()).await?;
            metrics.broadcast_time += t.elapsed();

            let t = Instant::now();
            collective.barrier().await?;
            metrics.barrier_time += t.elapsed();

            let report = StepReport {
                step: state.step,
                duration: step_start.elapsed(),
                elapsed: start.elapsed(),
                local_loss,
                total_loss,
            };

            match (report.total_loss, report.mean_loss(samples)) {
                (Some(total), Some(mean)) => info!(
                    step = report.step,
                    time = report.duration.as_secs_f32(),
                    total_loss = total,
                    loss = mean;
                    "step done"
                ),
                _ => debug!(
                    rank = rank,
                    step = report.step,
                    time = report.duration.as_secs_f32(),
                    local_loss = local_loss;
                    "step done"
                ),
            }

            reports.push(report);
            state.inc_step();
            metrics.bump_step();
        }

        let elapsed = start.elapsed();

        task::spawn_blocking(move || executor.release()).await?;
        collective.finish().await?;

        info!(
            rank = rank,
            steps = metrics.steps,
            samples = metrics.samples,
            compute = metrics.compute_time.as_secs_f32(),
            update = metrics.update_time.as_secs_f32(),
            comm = metrics.comm_time().as_secs_f32();
            "worker done"
        );

        Ok(TrainingOutcome {
            ctx,
            reports,
            params: state.params,
            metrics,
            elapsed,
        })
    }
}
