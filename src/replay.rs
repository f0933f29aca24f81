use std::collections::VecDeque;
use std::sync::RwLock;

use rand::seq::index;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::TrainError;

/// One training datum: encoded position planes, the target move
/// distribution over the full move space, and the outcome label.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub planes: Vec<u64>,
    pub probs: Vec<f32>,
    pub winner: i8,
}

struct StoreInner {
    samples: VecDeque<Sample>,
}

/// Bounded FIFO of recent training samples, shared across workers.
///
/// Many self-play workers append concurrently while the training worker
/// draws batches; every access is a short critical section, so a reader
/// can never observe a partially written sample. When full, the oldest
/// samples are evicted, keeping a sliding window of recent self-play.
pub struct ReplayStore {
    lock: RwLock<StoreInner>,
    capacity: usize,
    appends: metrics::Counter,
    evictions: metrics::Counter,
}

impl ReplayStore {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0);
        Self {
            lock: RwLock::new(StoreInner {
                samples: VecDeque::with_capacity(capacity),
            }),
            capacity,
            appends: metrics::counter!("replay.appends"),
            evictions: metrics::counter!("replay.evictions"),
        }
    }

    /// Append a sample, evicting the oldest entry if at capacity.
    pub fn append(&self, sample: Sample) {
        let mut store = self.lock.write().unwrap();
        while store.samples.len() >= self.capacity {
            store.samples.pop_front();
            self.evictions.increment(1);
        }
        store.samples.push_back(sample);
        self.appends.increment(1);
    }

    /// Draw `n` samples uniformly at random. Indices are distinct when
    /// the store holds at least `n` samples, drawn with replacement
    /// otherwise. Fails if the store is empty.
    pub fn sample_batch(&self, n: usize) -> Result<Vec<Sample>, TrainError> {
        let store = self.lock.read().unwrap();
        let len = store.samples.len();
        if len == 0 {
            return Err(TrainError::InsufficientData {
                available: 0,
                requested: n,
            });
        }
        let mut rng = rand::rng();
        let batch = if len >= n {
            index::sample(&mut rng, len, n)
                .iter()
                .map(|i| store.samples[i].clone())
                .collect()
        } else {
            (0..n)
                .map(|_| store.samples[rng.random_range(0..len)].clone())
                .collect()
        };
        Ok(batch)
    }

    /// Full copy of the current contents, oldest first. Used only for
    /// persistence, never for training reads.
    pub fn snapshot(&self) -> Vec<Sample> {
        let store = self.lock.read().unwrap();
        store.samples.iter().cloned().collect()
    }

    /// Replace the contents wholesale, keeping the newest `capacity`
    /// samples. Used once at startup when resuming.
    pub fn restore(&self, samples: Vec<Sample>) {
        let mut store = self.lock.write().unwrap();
        store.samples.clear();
        for sample in samples {
            while store.samples.len() >= self.capacity {
                store.samples.pop_front();
            }
            store.samples.push_back(sample);
        }
    }

    pub fn len(&self) -> usize {
        self.lock.read().unwrap().samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
