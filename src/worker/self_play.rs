use std::sync::Arc;
use std::time::Duration;

use crate::control::ShutdownReceiver;
use crate::game::GameEngine;
use crate::registry::{ModelRegistry, Slot};
use crate::replay::ReplayStore;
use crate::telemetry::{TelemetryEvent, TelemetrySender};

/// Generates training data by repeatedly playing full games with the
/// current best model and appending every resulting sample to the
/// replay store.
pub struct SelfPlayWorker {
    name: String,
    engine: Arc<dyn GameEngine>,
    replay: Arc<ReplayStore>,
    registry: Arc<ModelRegistry>,
    shutdown: ShutdownReceiver,
    telemetry: TelemetrySender,
    idle_wait: Duration,
    games_played: u64,
    errors: u64,
}

impl SelfPlayWorker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: String,
        engine: Arc<dyn GameEngine>,
        replay: Arc<ReplayStore>,
        registry: Arc<ModelRegistry>,
        shutdown: ShutdownReceiver,
        telemetry: TelemetrySender,
        idle_wait: Duration,
    ) -> Self {
        Self {
            name,
            engine,
            replay,
            registry,
            shutdown,
            telemetry,
            idle_wait,
            games_played: 0,
            errors: 0,
        }
    }

    pub fn run(mut self) {
        log::info!("{}: started", self.name);
        while !self.shutdown.stop_requested() {
            self.play_one();
        }
        log::info!("{}: stopped after {} games", self.name, self.games_played);
    }

    /// One iteration: read `best` once, play a full game, emit the
    /// samples. The model is read per game, not per move, to bound
    /// staleness and registry traffic.
    pub(crate) fn play_one(&mut self) {
        let Some(model) = self.registry.read(Slot::Best) else {
            /* nothing published yet */
            self.shutdown.wait(self.idle_wait);
            return;
        };
        match self.engine.play_game(&model) {
            Ok(samples) => {
                let game_length = samples.len();
                for sample in samples {
                    self.replay.append(sample);
                }
                self.games_played += 1;
                let _ = self.telemetry.send(TelemetryEvent::scalar(
                    "self_play.game_length",
                    game_length as f64,
                    self.games_played,
                ));
            }
            Err(err) => {
                /* a single bad game must not kill the worker */
                self.errors += 1;
                log::warn!("{}: game failed, skipping: {}", self.name, err);
                let _ = self.telemetry.send(TelemetryEvent::scalar(
                    "self_play.errors",
                    self.errors as f64,
                    self.games_played,
                ));
            }
        }
    }
}
