use std::sync::Arc;
use std::time::Duration;

use crate::config::TrainConfig;
use crate::control::ShutdownReceiver;
use crate::game::GameEngine;
use crate::registry::{ModelRegistry, Slot};
use crate::telemetry::{TelemetryEvent, TelemetrySender};

/// Periodically pits the candidate model against the current best and
/// promotes it on a sufficient win rate.
pub struct EvaluationWorker {
    engine: Arc<dyn GameEngine>,
    registry: Arc<ModelRegistry>,
    shutdown: ShutdownReceiver,
    telemetry: TelemetrySender,
    eval_rounds: u32,
    promotion_threshold: f32,
    idle_wait: Duration,
}

impl EvaluationWorker {
    pub fn new(
        config: &TrainConfig,
        engine: Arc<dyn GameEngine>,
        registry: Arc<ModelRegistry>,
        shutdown: ShutdownReceiver,
        telemetry: TelemetrySender,
    ) -> Self {
        Self {
            engine,
            registry,
            shutdown,
            telemetry,
            eval_rounds: config.eval_rounds,
            promotion_threshold: config.promotion_threshold,
            idle_wait: config.idle_wait(),
        }
    }

    pub fn run(self) {
        log::info!("evaluation: started");
        while !self.shutdown.stop_requested() {
            self.contest();
        }
        log::info!("evaluation: stopped");
    }

    /// One iteration: when a candidate newer than best exists, contest
    /// it over the configured rounds and promote on a win rate at or
    /// above the threshold. No telemetry is emitted for skipped rounds.
    pub(crate) fn contest(&self) {
        let (best, candidate) = match (
            self.registry.read(Slot::Best),
            self.registry.read(Slot::Candidate),
        ) {
            (Some(best), Some(candidate)) => (best, candidate),
            _ => {
                self.shutdown.wait(self.idle_wait);
                return;
            }
        };
        if candidate.generation <= best.generation {
            /* no new challenger */
            self.shutdown.wait(self.idle_wait);
            return;
        }
        let win_rate = match self
            .engine
            .evaluate(&best, &candidate, self.eval_rounds)
        {
            Ok(win_rate) => win_rate,
            Err(err) => {
                log::warn!("evaluation: contest failed, retrying: {}", err);
                return;
            }
        };
        if win_rate >= self.promotion_threshold {
            /* the candidate's generation was observed greater than
             * best's, and this worker is the only writer of best, so
             * promotion never regresses the generation counter */
            log::info!(
                "evaluation: promoting generation {} (win rate {:.3})",
                candidate.generation,
                win_rate
            );
            self.registry.write(Slot::Best, (*candidate).clone());
        } else {
            log::info!(
                "evaluation: keeping best, generation {} scored {:.3}",
                candidate.generation,
                win_rate
            );
        }
        let _ = self.telemetry.send(TelemetryEvent::scalar(
            "evaluation.win_rate",
            win_rate as f64,
            candidate.generation,
        ));
    }
}
