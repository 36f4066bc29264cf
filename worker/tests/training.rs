mod common;

use std::{sync::Arc, time::Duration};

use common::{assert_close, config, initial_params, n, random_dataset, serial_training};
use machine_learning::{
    MlErr, ModelShape,
    data::Dataset,
    partition::partition,
};
use worker::{
    WorkerBuilder, WorkerErr,
    config::{ComputeConfig, ParamGenConfig},
    launch::run_local,
};

#[tokio::test(flavor = "multi_thread")]
async fn four_images_two_workers() {
    let pixels = vec![
        255, 0, 0, 0, //
        0, 255, 0, 0, //
        0, 0, 255, 0, //
        0, 0, 0, 255,
    ];
    let dataset = Arc::new(Dataset::new(4, pixels, vec![0, 1, 0, 1]).unwrap());

    let mut cfg = config(2, 1, 0.5);
    cfg.labels = 2;
    cfg.init = ParamGenConfig::Const { value: 0. };

    assert_eq!(partition(4, 0, n(2)), 0..2);
    assert_eq!(partition(4, 1, n(2)), 2..4);

    let builder = WorkerBuilder::new(cfg, dataset).unwrap();
    let outcomes = run_local(&builder, n(2)).await.unwrap();

    let root = &outcomes[0].reports[0];
    let total = root.total_loss.unwrap();
    assert!((total - 4. * 2f32.ln()).abs() < 1e-4, "{total}");
    assert!((total - 2.7726).abs() < 1e-4);

    for outcome in &outcomes {
        let report = outcome.reports[0];
        assert!((report.local_loss - 2. * 2f32.ln()).abs() < 1e-5);
        assert_eq!(outcome.params, outcomes[0].params);
    }

    assert!(outcomes[1].reports[0].total_loss.is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn zero_learning_rate_keeps_initial_params() {
    let dataset = random_dataset(30, 8, 3, 1);
    let shape = ModelShape::new(3, 8).unwrap();

    let builder = WorkerBuilder::new(config(3, 5, 0.), dataset).unwrap();
    let outcomes = run_local(&builder, n(3)).await.unwrap();

    let initial = initial_params(shape, 7);
    for outcome in outcomes {
        assert_eq!(outcome.reports.len(), 5);
        assert_eq!(outcome.params, initial);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn single_worker_is_bit_identical_to_serial() {
    let dataset = random_dataset(50, 6, 3, 2);
    let shape = ModelShape::new(3, 6).unwrap();

    let builder = WorkerBuilder::new(config(1, 4, 0.5), dataset.clone()).unwrap();
    let outcome = run_local(&builder, n(1)).await.unwrap().remove(0);

    let (params, losses) = serial_training(&dataset, initial_params(shape, 7), 4, 0.5);
    assert_eq!(outcome.params, params);

    let reported: Vec<_> = outcome.reports.iter().map(|r| r.total_loss.unwrap()).collect();
    assert_eq!(reported, losses);
}

#[tokio::test(flavor = "multi_thread")]
async fn partitioned_runs_match_serial() {
    let dataset = random_dataset(97, 10, 3, 3);
    let shape = ModelShape::new(3, 10).unwrap();
    let (expected, losses) = serial_training(&dataset, initial_params(shape, 7), 3, 0.5);

    for workers in [2, 3, 5, 8] {
        let builder = WorkerBuilder::new(config(workers, 3, 0.5), dataset.clone()).unwrap();
        let outcomes = run_local(&builder, n(workers)).await.unwrap();
        assert_eq!(outcomes.len(), workers);

        for outcome in &outcomes {
            assert_eq!(outcome.params, outcomes[0].params);
        }

        assert_close(outcomes[0].params.as_slice(), expected.as_slice(), 1e-4);

        let last = outcomes[0].final_loss().unwrap();
        assert!((last - losses[2]).abs() < 1e-2, "{last} != {}", losses[2]);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn executors_agree() {
    let dataset = random_dataset(64, 5, 3, 4);
    let shape = ModelShape::new(3, 5).unwrap();
    let (expected, _) = serial_training(&dataset, initial_params(shape, 7), 2, 0.5);

    let computes = [
        ComputeConfig::Threads { threads: n(4) },
        ComputeConfig::Devices {
            devices: n(2),
            threads_per_device: n(1),
        },
        ComputeConfig::Devices {
            devices: n(3),
            threads_per_device: n(2),
        },
    ];

    for compute in computes {
        let mut cfg = config(2, 2, 0.5);
        cfg.compute = compute;

        let builder = WorkerBuilder::new(cfg, dataset.clone()).unwrap();
        let outcomes = run_local(&builder, n(2)).await.unwrap();

        assert_eq!(outcomes[0].params, outcomes[1].params);
        assert_close(outcomes[0].params.as_slice(), expected.as_slice(), 1e-4);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn more_workers_than_samples() {
    let dataset = random_dataset(3, 4, 3, 5);
    let shape = ModelShape::new(3, 4).unwrap();
    let (expected, _) = serial_training(&dataset, initial_params(shape, 7), 2, 0.5);

    let builder = WorkerBuilder::new(config(5, 2, 0.5), dataset).unwrap();
    let outcomes = run_local(&builder, n(5)).await.unwrap();

    assert_eq!(outcomes[0].reports[0].local_loss, 0.);
    assert_close(outcomes[4].params.as_slice(), expected.as_slice(), 1e-5);
}

#[test]
fn builder_rejects_bad_datasets() {
    let empty = Arc::new(Dataset::new(4, vec![], vec![]).unwrap());
    assert!(matches!(
        WorkerBuilder::new(config(1, 1, 0.5), empty),
        Err(WorkerErr::Ml(MlErr::EmptyDataset))
    ));

    let bad_label = Arc::new(Dataset::new(1, vec![0, 0], vec![0, 3]).unwrap());
    assert!(matches!(
        WorkerBuilder::new(config(1, 1, 0.5), bad_label),
        Err(WorkerErr::Ml(MlErr::LabelOutOfRange { index: 1, label: 3, .. }))
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn step_durations_are_per_step() {
    let dataset = random_dataset(60, 8, 3, 5);

    let builder = WorkerBuilder::new(config(2, 6, 0.5), dataset).unwrap();
    let outcomes = run_local(&builder, n(2)).await.unwrap();

    for outcome in &outcomes {
        let mut prev_elapsed = Duration::ZERO;
        for report in &outcome.reports {
            assert!(report.duration <= report.elapsed - prev_elapsed);
            prev_elapsed = report.elapsed;
        }

        let total: Duration = outcome.reports.iter().map(|r| r.duration).sum();
        assert!(total <= outcome.elapsed);
        assert!(outcome.mean_step_time() <= outcome.elapsed / 6);
    }

    let last = outcomes[0].reports.last().unwrap();
    assert!(last.duration < last.elapsed);
}
