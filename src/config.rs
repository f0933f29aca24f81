use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::TrainError;

/// Run configuration, loadable from a TOML file. Every threshold the
/// workers consult is an explicit knob here; nothing is guessed at
/// runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub experiment: u32,
    pub batch_size: usize,
    pub resume: bool,
    pub num_self_play_workers: usize,
    pub replay_capacity: usize,
    /// The trainer idles until the store holds at least this many samples.
    pub min_replay_size: usize,
    /// The run ends normally once the trainer reaches this many steps.
    pub total_steps: u64,
    /// Publish candidate parameters every this many optimizer steps.
    pub publish_interval: u64,
    /// Persist a training checkpoint every this many optimizer steps.
    pub checkpoint_interval: u64,
    /// Games per evaluation contest.
    pub eval_rounds: u32,
    /// Candidate win rate required for promotion to best.
    pub promotion_threshold: f32,
    /// Timed-wait length for workers idling on an unmet precondition.
    pub idle_wait_ms: u64,
    /// Coordinator's blocking-receive timeout on the telemetry channel.
    pub drain_timeout_ms: u64,
    pub data_dir: PathBuf,
}

impl Default for TrainConfig {
    fn default() -> Self {
        TrainConfig {
            experiment: 0,
            batch_size: 128,
            resume: false,
            num_self_play_workers: 4,
            replay_capacity: 100_000,
            min_replay_size: 1_000,
            total_steps: 1_000_000,
            publish_interval: 100,
            checkpoint_interval: 1_000,
            eval_rounds: 100,
            promotion_threshold: 0.55,
            idle_wait_ms: 1_000,
            drain_timeout_ms: 1_000,
            data_dir: PathBuf::from("data"),
        }
    }
}

impl TrainConfig {
    pub fn load(path: &Path) -> Result<Self, TrainError> {
        let content = std::fs::read_to_string(path)?;
        let config: TrainConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, falling back to defaults if the file is absent.
    pub fn load_or_default(path: &Path) -> Result<Self, TrainError> {
        if path.exists() {
            Self::load(path)
        } else {
            log::warn!("config file {} not found, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), TrainError> {
        if self.batch_size == 0 {
            return Err(TrainError::Config("batch_size must be > 0".into()));
        }
        if self.num_self_play_workers == 0 {
            return Err(TrainError::Config(
                "num_self_play_workers must be > 0".into(),
            ));
        }
        if self.replay_capacity < self.batch_size {
            return Err(TrainError::Config(
                "replay_capacity must be >= batch_size".into(),
            ));
        }
        if self.min_replay_size < self.batch_size {
            return Err(TrainError::Config(
                "min_replay_size must be >= batch_size".into(),
            ));
        }
        if self.total_steps == 0 {
            return Err(TrainError::Config("total_steps must be > 0".into()));
        }
        if self.publish_interval == 0 || self.checkpoint_interval == 0 {
            return Err(TrainError::Config(
                "publish_interval and checkpoint_interval must be > 0".into(),
            ));
        }
        if self.eval_rounds == 0 {
            return Err(TrainError::Config("eval_rounds must be > 0".into()));
        }
        if !(0.0..=1.0).contains(&self.promotion_threshold) {
            return Err(TrainError::Config(
                "promotion_threshold must be in [0, 1]".into(),
            ));
        }
        Ok(())
    }

    pub fn experiment_dir(&self) -> PathBuf {
        self.data_dir.join(format!("exp-{:03}", self.experiment))
    }

    pub fn replay_path(&self) -> PathBuf {
        self.experiment_dir().join("replay.json")
    }

    pub fn checkpoint_dir(&self) -> PathBuf {
        self.experiment_dir().join("checkpoints")
    }

    pub fn summary_path(&self) -> PathBuf {
        self.experiment_dir().join("summary.json")
    }

    pub fn idle_wait(&self) -> Duration {
        Duration::from_millis(self.idle_wait_ms)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        TrainConfig::default().validate().unwrap();
    }

    #[test]
    fn zero_batch_rejected() {
        let config = TrainConfig {
            batch_size: 0,
            ..TrainConfig::default()
        };
        assert!(matches!(config.validate(), Err(TrainError::Config(_))));
    }

    #[test]
    fn min_replay_below_batch_rejected() {
        let config = TrainConfig {
            batch_size: 256,
            min_replay_size: 100,
            ..TrainConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn threshold_out_of_range_rejected() {
        let config = TrainConfig {
            promotion_threshold: 1.5,
            ..TrainConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn experiment_paths() {
        let config = TrainConfig {
            experiment: 7,
            data_dir: PathBuf::from("data"),
            ..TrainConfig::default()
        };
        assert_eq!(config.replay_path(), PathBuf::from("data/exp-007/replay.json"));
        assert_eq!(config.checkpoint_dir(), PathBuf::from("data/exp-007/checkpoints"));
    }

    #[test]
    fn toml_round_trip() {
        let config = TrainConfig::default();
        let text = toml::to_string(&config).unwrap();
        let parsed: TrainConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.batch_size, config.batch_size);
        assert_eq!(parsed.promotion_threshold, config.promotion_threshold);
    }
}
