use std::fmt;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

/// Opaque serialized model weights plus their generation counter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    pub generation: u64,
    pub weights: Vec<u8>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Slot {
    Best,
    Candidate,
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Best => write!(f, "best"),
            Slot::Candidate => write!(f, "candidate"),
        }
    }
}

/// Shared registry of the current best and candidate model parameters.
///
/// Readers clone an `Arc` under a short read lock, so nobody touches the
/// weight blob while holding the lock. Last writer wins within a slot;
/// generation monotonicity of `best` is enforced by its single writer
/// (the evaluation worker), not here.
pub struct ModelRegistry {
    best: RwLock<Option<Arc<ModelParams>>>,
    candidate: RwLock<Option<Arc<ModelParams>>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self {
            best: RwLock::new(None),
            candidate: RwLock::new(None),
        }
    }

    fn slot(&self, slot: Slot) -> &RwLock<Option<Arc<ModelParams>>> {
        match slot {
            Slot::Best => &self.best,
            Slot::Candidate => &self.candidate,
        }
    }

    /// Latest parameters in the slot, or `None` before the first write.
    pub fn read(&self, slot: Slot) -> Option<Arc<ModelParams>> {
        self.slot(slot).read().unwrap().clone()
    }

    /// Atomically replace the slot's value.
    pub fn write(&self, slot: Slot, params: ModelParams) {
        *self.slot(slot).write().unwrap() = Some(Arc::new(params));
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_slots_read_none() {
        let registry = ModelRegistry::new();
        assert!(registry.read(Slot::Best).is_none());
        assert!(registry.read(Slot::Candidate).is_none());
    }

    #[test]
    fn write_then_read() {
        let registry = ModelRegistry::new();
        registry.write(
            Slot::Candidate,
            ModelParams {
                generation: 3,
                weights: vec![1, 2, 3],
            },
        );
        let params = registry.read(Slot::Candidate).unwrap();
        assert_eq!(params.generation, 3);
        assert_eq!(params.weights, vec![1, 2, 3]);
        assert!(registry.read(Slot::Best).is_none());
    }

    #[test]
    fn last_writer_wins() {
        let registry = ModelRegistry::new();
        registry.write(
            Slot::Best,
            ModelParams {
                generation: 1,
                weights: vec![1],
            },
        );
        registry.write(
            Slot::Best,
            ModelParams {
                generation: 2,
                weights: vec![2],
            },
        );
        assert_eq!(registry.read(Slot::Best).unwrap().generation, 2);
    }

    #[test]
    fn slot_display() {
        assert_eq!(Slot::Best.to_string(), "best");
        assert_eq!(Slot::Candidate.to_string(), "candidate");
    }
}
