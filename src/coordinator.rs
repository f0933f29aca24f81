use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::RecvTimeoutError;
use itertools::Itertools;

use crate::config::TrainConfig;
use crate::control::shutdown_channel;
use crate::error::TrainError;
use crate::game::{GameEngine, Learner};
use crate::persist;
use crate::replay::{ReplayStore, Sample};
use crate::registry::ModelRegistry;
use crate::telemetry::{telemetry_channel, MetricsSink, TelemetryEvent};
use crate::worker::evaluation::EvaluationWorker;
use crate::worker::self_play::SelfPlayWorker;
use crate::worker::training::TrainingWorker;

/// Build the shared state, run the workers, and drain telemetry until
/// the training worker exits or an external interrupt arrives; then
/// broadcast stop, join every worker and persist the replay store.
pub fn run(
    config: &TrainConfig,
    engine: Arc<dyn GameEngine>,
    learner: Box<dyn Learner>,
    sink: &mut dyn MetricsSink,
    interrupt: Arc<AtomicBool>,
) -> Result<(), TrainError> {
    config.validate()?;

    let replay = Arc::new(ReplayStore::new(config.replay_capacity));
    let registry = Arc::new(ModelRegistry::new());
    let (controller, shutdown) = shutdown_channel();
    let (telemetry_tx, telemetry_rx) = telemetry_channel();

    let mut training = TrainingWorker::new(
        config,
        learner,
        replay.clone(),
        registry.clone(),
        shutdown.clone(),
        telemetry_tx.clone(),
    );

    if config.resume {
        log::info!("loading replay snapshot to resume training...");
        let samples = persist::load_replay_snapshot(&config.replay_path())?;
        log::info!("replay snapshot loaded ({} samples)", samples.len());
        replay.restore(samples);
        match persist::load_latest_checkpoint(&config.checkpoint_dir())? {
            Some(checkpoint) => {
                log::info!("resuming from checkpoint at step {}", checkpoint.global_step);
                training.resume_from(&checkpoint)?;
            }
            None => log::warn!("no training checkpoint found, starting from a fresh model"),
        }
    }
    training.seed_registry();

    log::info!(
        "starting training with {} self-play workers...",
        config.num_self_play_workers
    );
    let training_handle = thread::spawn(move || training.run());

    let evaluation = EvaluationWorker::new(
        config,
        engine.clone(),
        registry.clone(),
        shutdown.clone(),
        telemetry_tx.clone(),
    );
    let evaluation_handle = thread::spawn(move || evaluation.run());

    let self_play_handles = (0..config.num_self_play_workers)
        .map(|i| {
            let worker = SelfPlayWorker::new(
                format!("self-play-{i}"),
                engine.clone(),
                replay.clone(),
                registry.clone(),
                shutdown.clone(),
                telemetry_tx.clone(),
                config.idle_wait(),
            );
            thread::spawn(move || worker.run())
        })
        .collect_vec();

    /* The workers hold the only remaining senders; once they all exit,
     * the receiver disconnects and the drain loop ends on its own. */
    drop(telemetry_tx);

    /* The training worker's exit is the authoritative end of the run;
     * the coordinator only reacts to it (or to an interrupt). */
    while !training_handle.is_finished() && !interrupt.load(Ordering::Relaxed) {
        match telemetry_rx.recv_timeout(config.drain_timeout()) {
            Ok(event) => dispatch(event, sink),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    if interrupt.load(Ordering::Relaxed) {
        log::info!("interrupt received, stopping training...");
    }

    controller.signal();
    if training_handle.join().is_err() {
        log::error!("training worker panicked");
    }
    if evaluation_handle.join().is_err() {
        log::error!("evaluation worker panicked");
    }
    for handle in self_play_handles {
        if handle.join().is_err() {
            log::error!("a self-play worker panicked");
        }
    }

    /* Events emitted between the last receive and the joins */
    while let Ok(event) = telemetry_rx.try_recv() {
        dispatch(event, sink);
    }

    log::info!("saving replay snapshot...");
    let samples = replay.snapshot();
    save_snapshot_with_retry(&config.replay_path(), &samples)?;
    log::info!("replay snapshot saved ({} samples)", samples.len());
    Ok(())
}

pub(crate) fn dispatch(event: TelemetryEvent, sink: &mut dyn MetricsSink) {
    match event {
        TelemetryEvent::Scalar { name, value, step } => sink.record(&name, value, step),
        TelemetryEvent::Unknown { tag } => {
            log::warn!("unknown telemetry event type: {}", tag)
        }
    }
}

/* The in-memory samples outlive a failed write attempt: retry once to a
 * fallback path before surfacing the error. */
fn save_snapshot_with_retry(path: &Path, samples: &[Sample]) -> Result<(), TrainError> {
    match persist::save_replay_snapshot(path, samples) {
        Ok(()) => Ok(()),
        Err(err) => {
            let fallback = path.with_extension("retry.json");
            log::error!(
                "replay snapshot failed ({}), retrying at {}",
                err,
                fallback.display()
            );
            persist::save_replay_snapshot(&fallback, samples)?;
            Ok(())
        }
    }
}
