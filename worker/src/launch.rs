//! Entry points that turn a config into finished training runs.

use std::{num::NonZeroUsize, sync::Arc};

use collective::{WorkerContext, group, tcp};
use log::{info, warn};
use machine_learning::{
    data::{Dataset, mnist},
    evaluation::accuracy,
    model::Parameters,
};
use tokio::task::{self, JoinSet};

use crate::{
    Result, TrainingOutcome, WorkerBuilder, WorkerErr,
    config::{DatasetConfig, TrainingConfig},
};

async fn load(dataset: &DatasetConfig) -> Result<Dataset> {
    let dataset = dataset.clone();
    let loaded = task::spawn_blocking(move || mnist::load(&dataset.images, &dataset.labels)).await??;
    Ok(loaded)
}

/// Runs a whole training session as configured.
///
/// # Returns
/// This process' outcome, the root's when every worker is local.
pub async fn run(cfg: TrainingConfig) -> Result<TrainingOutcome> {
    let dataset = Arc::new(load(&cfg.train).await?);
    let test = cfg.test.clone();
    let builder = WorkerBuilder::new(cfg, dataset)?;

    let outcome = match builder.config().tcp_context()? {
        Some((ctx, root_addr)) => run_tcp(&builder, root_addr, ctx).await?,
        None => {
            let workers = builder.config().world_size();
            let mut outcomes = run_local(&builder, workers).await?;
            // SAFETY: There's at least one worker and outcomes are sorted by rank.
            outcomes.swap_remove(0)
        }
    };

    if outcome.ctx.is_root() {
        info!(
            steps = outcome.reports.len(),
            total = outcome.elapsed.as_secs_f32(),
            mean = outcome.mean_step_time().as_secs_f32();
            "training finished"
        );

        if let Some(test) = test {
            let test = load(&test).await?;
            let acc = evaluate(test, outcome.params.clone()).await?;
            info!(accuracy = acc; "evaluated test set");
        }
    }

    Ok(outcome)
}

/// Trains with every worker as a task of this process.
///
/// # Returns
/// Every worker's outcome, sorted by rank.
pub async fn run_local(
    builder: &WorkerBuilder,
    workers: NonZeroUsize,
) -> Result<Vec<TrainingOutcome>> {
    let mut join_set = JoinSet::new();

    for member in group(workers) {
        let trainer = builder.build(member)?;
        join_set.spawn(trainer.run());
    }

    let mut outcomes = Vec::with_capacity(workers.get());
    while let Some(res) = join_set.join_next().await {
        match res? {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => {
                warn!("worker failed: {e}");
                join_set.abort_all();
                return Err(e);
            }
        }
    }

    outcomes.sort_by_key(|outcome| outcome.ctx.rank());
    Ok(outcomes)
}

/// Trains as a single worker of a tcp star.
///
/// The root listens at `root_addr`, every other rank connects to it.
pub async fn run_tcp(
    builder: &WorkerBuilder,
    root_addr: &str,
    ctx: WorkerContext,
) -> Result<TrainingOutcome> {
    let collective = if ctx.is_root() {
        tcp::bind_root(root_addr, ctx).await?
    } else {
        tcp::connect_root(root_addr.to_string(), ctx).await?
    };

    builder.build(collective)?.run().await
}

async fn evaluate(dataset: Dataset, params: Parameters) -> Result<f32> {
    let shape = params.shape();
    if dataset.image_size() != shape.image_size() {
        return Err(WorkerErr::InvalidConfig(format!(
            "test images hold {} pixels, the model expects {}",
            dataset.image_size(),
            shape.image_size()
        )));
    }

    dataset.check_labels(shape.labels())?;
    let acc = task::spawn_blocking(move || accuracy(dataset.as_batch(), &params)).await?;
    Ok(acc)
}
