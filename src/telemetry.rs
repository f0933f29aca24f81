use crossbeam_channel::{unbounded, Receiver, Sender};

/// Structured event flowing from the workers to the coordinator.
///
/// `Scalar` is the only variant with numeric recording; anything else a
/// worker may emit in the future lands in `Unknown` and is reported,
/// never fatal.
#[derive(Clone, Debug, PartialEq)]
pub enum TelemetryEvent {
    Scalar { name: String, value: f64, step: u64 },
    Unknown { tag: String },
}

impl TelemetryEvent {
    pub fn scalar(name: impl Into<String>, value: f64, step: u64) -> Self {
        TelemetryEvent::Scalar {
            name: name.into(),
            value,
            step,
        }
    }
}

pub type TelemetrySender = Sender<TelemetryEvent>;
pub type TelemetryReceiver = Receiver<TelemetryEvent>;

/// Every worker owns a sender clone; the coordinator owns the sole
/// receiver and drains it into the metrics sink.
pub fn telemetry_channel() -> (TelemetrySender, TelemetryReceiver) {
    unbounded()
}

/// Destination for scalar metrics, keyed by name and global step.
pub trait MetricsSink: Send {
    fn record(&mut self, name: &str, value: f64, step: u64);
}

/// Forwards scalars to the `metrics` facade. With a debugging recorder
/// installed by the binary, the final gauge values land in the run
/// summary file.
#[derive(Default)]
pub struct GaugeSink;

impl MetricsSink for GaugeSink {
    fn record(&mut self, name: &str, value: f64, _step: u64) {
        metrics::gauge!(name.to_owned()).set(value);
    }
}

#[cfg(test)]
#[derive(Default)]
pub(crate) struct VecSink {
    pub records: Vec<(String, f64, u64)>,
}

#[cfg(test)]
impl MetricsSink for VecSink {
    fn record(&mut self, name: &str, value: f64, step: u64) {
        self.records.push((name.to_string(), value, step));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_constructor() {
        let event = TelemetryEvent::scalar("training.loss", 0.25, 7);
        assert_eq!(
            event,
            TelemetryEvent::Scalar {
                name: "training.loss".to_string(),
                value: 0.25,
                step: 7,
            }
        );
    }

    #[test]
    fn channel_carries_events_in_order() {
        let (tx, rx) = telemetry_channel();
        tx.send(TelemetryEvent::scalar("a", 1.0, 1)).unwrap();
        tx.send(TelemetryEvent::Unknown {
            tag: "histogram".to_string(),
        })
        .unwrap();
        drop(tx);

        assert_eq!(rx.recv().unwrap(), TelemetryEvent::scalar("a", 1.0, 1));
        assert!(matches!(rx.recv().unwrap(), TelemetryEvent::Unknown { .. }));
        assert!(rx.recv().is_err());
    }
}
