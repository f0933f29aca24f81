use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::TrainConfig;
use crate::control::ShutdownReceiver;
use crate::error::TrainError;
use crate::game::Learner;
use crate::persist::{self, TrainCheckpoint};
use crate::registry::{ModelRegistry, Slot};
use crate::replay::ReplayStore;
use crate::telemetry::{TelemetryEvent, TelemetrySender};

/// Consumes replay batches to advance the model, periodically publishing
/// candidate parameters and checkpoints. Its exit is the authoritative
/// end-of-run signal the coordinator watches.
pub struct TrainingWorker {
    learner: Box<dyn Learner>,
    replay: Arc<ReplayStore>,
    registry: Arc<ModelRegistry>,
    shutdown: ShutdownReceiver,
    telemetry: TelemetrySender,
    batch_size: usize,
    min_replay_size: usize,
    total_steps: u64,
    publish_interval: u64,
    checkpoint_interval: u64,
    checkpoint_dir: PathBuf,
    idle_wait: Duration,
    global_step: u64,
    generation: u64,
}

impl TrainingWorker {
    pub fn new(
        config: &TrainConfig,
        learner: Box<dyn Learner>,
        replay: Arc<ReplayStore>,
        registry: Arc<ModelRegistry>,
        shutdown: ShutdownReceiver,
        telemetry: TelemetrySender,
    ) -> Self {
        Self {
            learner,
            replay,
            registry,
            shutdown,
            telemetry,
            batch_size: config.batch_size,
            min_replay_size: config.min_replay_size,
            total_steps: config.total_steps,
            publish_interval: config.publish_interval,
            checkpoint_interval: config.checkpoint_interval,
            checkpoint_dir: config.checkpoint_dir(),
            idle_wait: config.idle_wait(),
            global_step: 0,
            generation: 0,
        }
    }

    /// Restore mid-training state from a persisted checkpoint.
    pub fn resume_from(&mut self, checkpoint: &TrainCheckpoint) -> Result<(), TrainError> {
        self.learner.import_params(&checkpoint.params)?;
        self.global_step = checkpoint.global_step;
        self.generation = checkpoint.params.generation;
        Ok(())
    }

    /// Publish the current parameters into both slots, so self-play and
    /// evaluation have a model to read before the first publish.
    pub fn seed_registry(&self) {
        let params = self.learner.export_params(self.generation);
        self.registry.write(Slot::Best, params.clone());
        self.registry.write(Slot::Candidate, params);
    }

    pub fn run(mut self) {
        log::info!("training: started at step {}", self.global_step);
        while !self.shutdown.stop_requested() && self.global_step < self.total_steps {
            self.step();
        }
        log::info!("training: stopped at step {}", self.global_step);
    }

    /// One iteration: batch, optimize, and on the configured intervals
    /// publish a candidate and persist a checkpoint.
    pub(crate) fn step(&mut self) {
        if self.replay.len() < self.min_replay_size {
            self.shutdown.wait(self.idle_wait);
            return;
        }
        let batch = match self.replay.sample_batch(self.batch_size) {
            Ok(batch) => batch,
            Err(err) => {
                /* raced with the size check; wait for more data */
                log::debug!("training: {}", err);
                self.shutdown.wait(self.idle_wait);
                return;
            }
        };
        let loss = match self.learner.train_step(&batch) {
            Ok(loss) => loss,
            Err(err) => {
                log::warn!("training: step failed, skipping batch: {}", err);
                return;
            }
        };
        self.global_step += 1;
        let _ = self.telemetry.send(TelemetryEvent::scalar(
            "training.loss",
            loss as f64,
            self.global_step,
        ));

        if self.global_step % self.publish_interval == 0 {
            self.generation += 1;
            self.registry
                .write(Slot::Candidate, self.learner.export_params(self.generation));
        }

        if self.global_step % self.checkpoint_interval == 0 {
            let checkpoint = TrainCheckpoint {
                params: self.learner.export_params(self.generation),
                global_step: self.global_step,
            };
            match persist::save_checkpoint(&self.checkpoint_dir, &checkpoint) {
                Ok(path) => log::info!("training: checkpoint written to {}", path.display()),
                Err(err) => log::error!("training: checkpoint failed: {}", err),
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn global_step(&self) -> u64 {
        self.global_step
    }
}
