use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::TrainError;
use crate::registry::ModelParams;
use crate::replay::Sample;

/// Mid-training state persisted by the training worker, distinct from
/// the replay snapshot: enough to pick up optimization where it left
/// off.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainCheckpoint {
    pub params: ModelParams,
    pub global_step: u64,
}

/* Write to a temp file and rename, so a crash mid-write never leaves a
 * truncated artifact under the real name. */
fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), TrainError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    let file = fs::File::create(&tmp)?;
    serde_json::to_writer(file, value)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

pub fn save_replay_snapshot(path: &Path, samples: &[Sample]) -> Result<(), TrainError> {
    write_json(path, &samples)
}

pub fn load_replay_snapshot(path: &Path) -> Result<Vec<Sample>, TrainError> {
    if !path.exists() {
        return Err(TrainError::MissingSnapshot(path.to_path_buf()));
    }
    let file = fs::File::open(path)?;
    Ok(serde_json::from_reader(file)?)
}

pub fn save_checkpoint(dir: &Path, checkpoint: &TrainCheckpoint) -> Result<PathBuf, TrainError> {
    let path = dir.join(format!("checkpoint_{:09}.json", checkpoint.global_step));
    write_json(&path, checkpoint)?;
    Ok(path)
}

/// Latest checkpoint in `dir`, i.e. the one with the highest global
/// step. `None` when the directory is absent or holds no checkpoints.
pub fn load_latest_checkpoint(dir: &Path) -> Result<Option<TrainCheckpoint>, TrainError> {
    if !dir.is_dir() {
        return Ok(None);
    }
    let mut latest: Option<(u64, PathBuf)> = None;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(step) = name
            .strip_prefix("checkpoint_")
            .and_then(|s| s.strip_suffix(".json"))
            .and_then(|s| s.parse::<u64>().ok())
        else {
            continue;
        };
        if latest.as_ref().map_or(true, |(best, _)| step > *best) {
            latest = Some((step, path));
        }
    }
    match latest {
        Some((_, path)) => {
            let file = fs::File::open(&path)?;
            Ok(Some(serde_json::from_reader(file)?))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(seq: u64) -> Sample {
        Sample {
            planes: vec![seq],
            probs: vec![seq as f32],
            winner: 0,
        }
    }

    fn checkpoint(global_step: u64) -> TrainCheckpoint {
        TrainCheckpoint {
            params: ModelParams {
                generation: global_step / 10,
                weights: vec![1, 2, 3],
            },
            global_step,
        }
    }

    #[test]
    fn snapshot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("replay.json");
        let samples = (0..10).map(sample).collect::<Vec<_>>();

        save_replay_snapshot(&path, &samples).unwrap();
        assert_eq!(load_replay_snapshot(&path).unwrap(), samples);
    }

    #[test]
    fn missing_snapshot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("replay.json");
        assert!(matches!(
            load_replay_snapshot(&path),
            Err(TrainError::MissingSnapshot(_))
        ));
    }

    #[test]
    fn checkpoint_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let saved = checkpoint(100);
        save_checkpoint(dir.path(), &saved).unwrap();
        let loaded = load_latest_checkpoint(dir.path()).unwrap().unwrap();
        assert_eq!(loaded, saved);
    }

    #[test]
    fn latest_checkpoint_has_highest_step() {
        let dir = tempfile::tempdir().unwrap();
        for step in [10, 100, 20] {
            save_checkpoint(dir.path(), &checkpoint(step)).unwrap();
        }
        let loaded = load_latest_checkpoint(dir.path()).unwrap().unwrap();
        assert_eq!(loaded.global_step, 100);
    }

    #[test]
    fn no_checkpoint_dir_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("checkpoints");
        assert!(load_latest_checkpoint(&missing).unwrap().is_none());
    }
}
