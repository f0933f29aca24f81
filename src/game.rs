use std::collections::VecDeque;
use std::sync::Mutex;

use rand::Rng;

use crate::error::TrainError;
use crate::registry::ModelParams;
use crate::replay::Sample;

/// Boundary to the game rules and the search procedure.
pub trait GameEngine: Send + Sync {
    /// Play one full self-play game with the given model and return the
    /// trajectory as training samples.
    fn play_game(&self, model: &ModelParams) -> Result<Vec<Sample>, TrainError>;

    /// Pit `candidate` against `best` for `rounds` games and return the
    /// candidate's win rate in [0, 1].
    fn evaluate(
        &self,
        best: &ModelParams,
        candidate: &ModelParams,
        rounds: u32,
    ) -> Result<f32, TrainError>;
}

/// Boundary to the optimizer: one gradient step plus weight transfer.
pub trait Learner: Send {
    /// Perform one optimization step over the batch, returning the loss.
    fn train_step(&mut self, batch: &[Sample]) -> Result<f32, TrainError>;

    /// Current weights, stamped with the given generation counter.
    fn export_params(&self, generation: u64) -> ModelParams;

    /// Load weights, e.g. when resuming from a checkpoint.
    fn import_params(&mut self, params: &ModelParams) -> Result<(), TrainError>;
}

/// Engine stand-in producing random trajectories and scriptable
/// evaluation outcomes. Serves the demo binary and the tests; a real
/// integration supplies its own `GameEngine`.
pub struct TrivialEngine {
    planes_num: usize,
    moves_num: usize,
    game_length: Option<usize>,
    win_rates: Mutex<VecDeque<f32>>,
    default_win_rate: f32,
}

impl TrivialEngine {
    pub fn new() -> Self {
        Self {
            planes_num: 3,
            moves_num: 64,
            game_length: None,
            win_rates: Mutex::new(VecDeque::new()),
            default_win_rate: 0.5,
        }
    }

    /// Evaluation rounds pop these win rates in order, then fall back to
    /// the default of 0.5.
    pub fn with_win_rates(rates: impl IntoIterator<Item = f32>) -> Self {
        Self {
            win_rates: Mutex::new(rates.into_iter().collect()),
            ..Self::new()
        }
    }

    /// Every game produces exactly `length` samples.
    pub fn with_game_length(length: usize) -> Self {
        Self {
            game_length: Some(length),
            ..Self::new()
        }
    }
}

impl Default for TrivialEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl GameEngine for TrivialEngine {
    fn play_game(&self, _model: &ModelParams) -> Result<Vec<Sample>, TrainError> {
        let mut rng = rand::rng();
        let length = self
            .game_length
            .unwrap_or_else(|| rng.random_range(8..=60));
        let winner = [-1i8, 0, 1][rng.random_range(0..3)];
        let uniform = 1.0 / self.moves_num as f32;
        Ok((0..length)
            .map(|_| Sample {
                planes: (0..self.planes_num).map(|_| rng.random()).collect(),
                probs: vec![uniform; self.moves_num],
                winner,
            })
            .collect())
    }

    fn evaluate(
        &self,
        _best: &ModelParams,
        _candidate: &ModelParams,
        _rounds: u32,
    ) -> Result<f32, TrainError> {
        let mut rates = self.win_rates.lock().unwrap();
        Ok(rates.pop_front().unwrap_or(self.default_win_rate))
    }
}

/// Learner stand-in: weights are an opaque byte blob and the loss is a
/// synthetic value decaying with the step count.
pub struct TrivialLearner {
    weights: Vec<u8>,
    steps: u64,
}

impl TrivialLearner {
    pub fn new(size: usize) -> Self {
        Self {
            weights: vec![0; size],
            steps: 0,
        }
    }
}

impl Learner for TrivialLearner {
    fn train_step(&mut self, batch: &[Sample]) -> Result<f32, TrainError> {
        if batch.is_empty() {
            return Err(TrainError::Learner("empty batch".to_string()));
        }
        self.steps += 1;
        Ok(1.0 / (1.0 + self.steps as f32 * 0.01))
    }

    fn export_params(&self, generation: u64) -> ModelParams {
        ModelParams {
            generation,
            weights: self.weights.clone(),
        }
    }

    fn import_params(&mut self, params: &ModelParams) -> Result<(), TrainError> {
        self.weights = params.weights.clone();
        Ok(())
    }
}
