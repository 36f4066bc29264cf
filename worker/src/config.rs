use std::{
    cmp::Ordering,
    env, fs,
    num::NonZeroUsize,
    path::{Path, PathBuf},
};

use collective::WorkerContext;
use serde::{Deserialize, Serialize};

use crate::{Result, WorkerErr};

const DEFAULT_STEPS: usize = 100;
const DEFAULT_LEARNING_RATE: f32 = 0.5;
const DEFAULT_LABELS: usize = 10;

/// The env var read for the config path when none is given as argument.
pub const CONFIG_VAR: &str = "CONFIG";

/// The env var that overrides the rank of a tcp worker.
pub const RANK_VAR: &str = "RANK";

/// A pair of IDX files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub images: PathBuf,
    pub labels: PathBuf,
}

/// How the initial parameters are generated at the root.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamGenConfig {
    Uniform { low: f32, high: f32 },
    Const { value: f32 },
}

impl Default for ParamGenConfig {
    fn default() -> Self {
        Self::Uniform { low: 0., high: 1. }
    }
}

/// How a worker computes over its partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComputeConfig {
    Threads {
        threads: NonZeroUsize,
    },
    Devices {
        devices: NonZeroUsize,
        threads_per_device: NonZeroUsize,
    },
}

impl Default for ComputeConfig {
    fn default() -> Self {
        Self::Threads {
            threads: NonZeroUsize::MIN,
        }
    }
}

/// Where the workers live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterConfig {
    /// Every worker is a task of this process.
    Local { workers: NonZeroUsize },
    /// This process is a single worker of a star around `root_addr`.
    Tcp {
        root_addr: String,
        workers: NonZeroUsize,
        rank: usize,
    },
}

/// Immutable settings for a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub train: DatasetConfig,
    #[serde(default)]
    pub test: Option<DatasetConfig>,
    #[serde(default = "default_labels")]
    pub labels: usize,
    #[serde(default = "default_steps")]
    pub steps: NonZeroUsize,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f32,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub init: ParamGenConfig,
    #[serde(default)]
    pub compute: ComputeConfig,
    pub cluster: ClusterConfig,
}

fn default_labels() -> usize {
    DEFAULT_LABELS
}

fn default_steps() -> NonZeroUsize {
    // SAFETY: The default is a positive constant.
    NonZeroUsize::new(DEFAULT_STEPS).unwrap()
}

fn default_learning_rate() -> f32 {
    DEFAULT_LEARNING_RATE
}

impl TrainingConfig {
    /// Parses and validates a json config.
    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reads, parses and validates a json config file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Loads the config from the path in the first argument or the `CONFIG` env var.
    ///
    /// A `RANK` env var overrides the rank of a tcp cluster, so a single file can be
    /// shared by every process.
    pub fn from_env() -> Result<Self> {
        let path = env::args()
            .nth(1)
            .or_else(|| env::var(CONFIG_VAR).ok())
            .ok_or_else(|| {
                WorkerErr::InvalidConfig(format!(
                    "expected a config path as argument or in {CONFIG_VAR}"
                ))
            })?;

        let mut cfg = Self::from_file(path)?;

        if let Ok(rank) = env::var(RANK_VAR) {
            let rank = rank.parse().map_err(|e| {
                WorkerErr::InvalidConfig(format!("{RANK_VAR} must be a rank: {e}"))
            })?;

            cfg.override_rank(rank)?;
        }

        Ok(cfg)
    }

    /// Replaces the rank of a tcp cluster.
    pub fn override_rank(&mut self, new_rank: usize) -> Result<()> {
        match &mut self.cluster {
            ClusterConfig::Tcp { rank, .. } => *rank = new_rank,
            ClusterConfig::Local { .. } => {
                return Err(WorkerErr::InvalidConfig(
                    "a rank can only be set for tcp clusters".into(),
                ));
            }
        }

        self.validate()
    }

    /// Checks the constraints serde can't.
    pub fn validate(&self) -> Result<()> {
        if self.labels == 0 || self.labels > u8::MAX as usize + 1 {
            return Err(WorkerErr::InvalidConfig(format!(
                "labels must be in [1, 256], got {}",
                self.labels
            )));
        }

        if !self.learning_rate.is_finite() || self.learning_rate <= 0. {
            return Err(WorkerErr::InvalidConfig(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }

        if let ParamGenConfig::Uniform { low, high } = self.init
            && low.partial_cmp(&high) != Some(Ordering::Less)
        {
            return Err(WorkerErr::InvalidConfig(format!(
                "uniform init needs low < high, got [{low}, {high})"
            )));
        }

        if let ClusterConfig::Tcp { rank, workers, .. } = &self.cluster
            && *rank >= workers.get()
        {
            return Err(WorkerErr::InvalidConfig(format!(
                "rank {rank} is out of range for {workers} workers"
            )));
        }

        Ok(())
    }

    /// The amount of workers taking part in the run.
    pub fn world_size(&self) -> NonZeroUsize {
        match &self.cluster {
            ClusterConfig::Local { workers } | ClusterConfig::Tcp { workers, .. } => *workers,
        }
    }

    /// This process' context and the root's address, `None` for local clusters where the
    /// process holds every rank.
    pub fn tcp_context(&self) -> Result<Option<(WorkerContext, &str)>> {
        match &self.cluster {
            ClusterConfig::Local { .. } => Ok(None),
            ClusterConfig::Tcp {
                root_addr,
                workers,
                rank,
            } => Ok(Some((WorkerContext::new(*rank, *workers)?, root_addr))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "train": { "images": "train-images.idx3-ubyte", "labels": "train-labels.idx1-ubyte" },
        "cluster": { "local": { "workers": 4 } }
    }"#;

    #[test]
    fn defaults() {
        let cfg = TrainingConfig::from_json(MINIMAL).unwrap();

        assert_eq!(cfg.steps.get(), DEFAULT_STEPS);
        assert_eq!(cfg.learning_rate, DEFAULT_LEARNING_RATE);
        assert_eq!(cfg.labels, DEFAULT_LABELS);
        assert_eq!(cfg.init, ParamGenConfig::Uniform { low: 0., high: 1. });
        assert_eq!(cfg.compute, ComputeConfig::default());
        assert_eq!(cfg.world_size().get(), 4);
        assert!(cfg.test.is_none());
        assert!(cfg.tcp_context().unwrap().is_none());
    }

    #[test]
    fn full_tcp_config() {
        let json = r#"{
            "train": { "images": "a", "labels": "b" },
            "test": { "images": "c", "labels": "d" },
            "steps": 5,
            "learning_rate": 0.1,
            "seed": 42,
            "init": { "const": { "value": 0.0 } },
            "compute": { "devices": { "devices": 2, "threads_per_device": 3 } },
            "cluster": { "tcp": { "root_addr": "10.0.0.1:5000", "workers": 3, "rank": 2 } }
        }"#;

        let cfg = TrainingConfig::from_json(json).unwrap();
        assert_eq!(cfg.seed, Some(42));
        assert_eq!(cfg.init, ParamGenConfig::Const { value: 0. });

        let (ctx, root_addr) = cfg.tcp_context().unwrap().unwrap();
        assert_eq!(root_addr, "10.0.0.1:5000");
        assert_eq!(ctx.rank(), 2);
        assert_eq!(ctx.world_size().get(), 3);
    }

    #[test]
    fn rejects_zero_steps() {
        let json = MINIMAL.replace("\"cluster\"", "\"steps\": 0, \"cluster\"");
        assert!(matches!(
            TrainingConfig::from_json(&json),
            Err(WorkerErr::Json(_))
        ));
    }

    #[test]
    fn rejects_non_positive_learning_rate() {
        let json = MINIMAL.replace("\"cluster\"", "\"learning_rate\": 0.0, \"cluster\"");
        assert!(matches!(
            TrainingConfig::from_json(&json),
            Err(WorkerErr::InvalidConfig(_))
        ));
    }

    #[test]
    fn rejects_empty_uniform_range() {
        for init in [r#"{ "low": 1.0, "high": 1.0 }"#, r#"{ "low": 2.0, "high": -1.0 }"#] {
            let json = MINIMAL.replace(
                "\"cluster\"",
                &format!("\"init\": {{ \"uniform\": {init} }}, \"cluster\""),
            );

            assert!(matches!(
                TrainingConfig::from_json(&json),
                Err(WorkerErr::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn rank_override() {
        let json = r#"{
            "train": { "images": "a", "labels": "b" },
            "cluster": { "tcp": { "root_addr": "localhost:5000", "workers": 2, "rank": 0 } }
        }"#;

        let mut cfg = TrainingConfig::from_json(json).unwrap();
        cfg.override_rank(1).unwrap();
        assert_eq!(cfg.tcp_context().unwrap().unwrap().0.rank(), 1);

        assert!(cfg.override_rank(2).is_err());

        let mut local = TrainingConfig::from_json(MINIMAL).unwrap();
        assert!(local.override_rank(0).is_err());
    }
}
