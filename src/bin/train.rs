use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};

use zerotrain::config::TrainConfig;
use zerotrain::coordinator;
use zerotrain::error::TrainError;
use zerotrain::game::{TrivialEngine, TrivialLearner};
use zerotrain::telemetry::GaugeSink;
use zerotrain::util;

#[derive(Parser, Debug)]
#[clap(about, long_about = None)]
struct TrainArgs {
    #[clap(long)]
    experiment: u32,
    #[clap(long)]
    batch_size: usize,
    #[clap(long)]
    resume: bool,
    #[clap(long, default_value = "train.toml")]
    config: PathBuf,
    #[clap(long)]
    workers: Option<usize>,
}

fn main() -> Result<(), TrainError> {
    util::init_globals();
    let args = TrainArgs::parse();

    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder.install().unwrap();

    let mut config = TrainConfig::load_or_default(&args.config)?;
    config.experiment = args.experiment;
    config.batch_size = args.batch_size;
    config.resume = args.resume;
    if let Some(workers) = args.workers {
        config.num_self_play_workers = workers;
    }
    config.validate()?;

    let interrupt = Arc::new(AtomicBool::new(false));
    {
        let interrupt = interrupt.clone();
        ctrlc::set_handler(move || interrupt.store(true, Ordering::Relaxed)).unwrap();
    }

    /* The trivial engine/learner pair stands in for a real game and
     * network integration; swap in your own GameEngine and Learner. */
    let engine = Arc::new(TrivialEngine::new());
    let learner = Box::new(TrivialLearner::new(1024));
    let mut sink = GaugeSink;

    coordinator::run(&config, engine, learner, &mut sink, interrupt)?;

    write_summary(&config, snapshotter)
}

fn write_summary(config: &TrainConfig, snapshotter: Snapshotter) -> Result<(), TrainError> {
    let mut metrics = HashMap::new();
    for (key, _unit, _desc, value) in snapshotter.snapshot().into_vec() {
        let key = key.key().name().to_string();
        let value = match value {
            DebugValue::Counter(value) => serde_json::json!(value),
            DebugValue::Gauge(value) => serde_json::json!(value.0),
            DebugValue::Histogram(values) => {
                serde_json::Value::Array(values.into_iter().map(|v| serde_json::json!(v.0)).collect())
            }
        };
        metrics.insert(key, value);
    }

    let writer = std::fs::File::create(config.summary_path())?;
    serde_json::to_writer(writer, &metrics)?;
    Ok(())
}
