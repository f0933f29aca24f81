use std::path::PathBuf;

/// Errors surfaced by the training core.
#[derive(Debug, thiserror::Error)]
pub enum TrainError {
    #[error("replay store holds {available} samples, {requested} requested")]
    InsufficientData { available: usize, requested: usize },

    #[error("game engine failure: {0}")]
    Engine(String),

    #[error("learner failure: {0}")]
    Learner(String),

    #[error("no replay snapshot at {0}, cannot resume")]
    MissingSnapshot(PathBuf),

    #[error("serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("config validation error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_data_display() {
        let err = TrainError::InsufficientData {
            available: 0,
            requested: 128,
        };
        assert_eq!(
            err.to_string(),
            "replay store holds 0 samples, 128 requested"
        );
    }

    #[test]
    fn missing_snapshot_display() {
        let err = TrainError::MissingSnapshot(PathBuf::from("data/exp-003/replay.json"));
        assert_eq!(
            err.to_string(),
            "no replay snapshot at data/exp-003/replay.json, cannot resume"
        );
    }

    #[test]
    fn config_display() {
        let err = TrainError::Config("batch_size must be > 0".to_string());
        assert_eq!(
            err.to_string(),
            "config validation error: batch_size must be > 0"
        );
    }
}
