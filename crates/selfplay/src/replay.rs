//! Bounded FIFO of training examples.

use crate::{
    checkpoint::{read_msgpack, write_msgpack},
    example::TrainingExample,
};
use alphazero_core::{Result, ZeroError};
use rand::Rng;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::Path;

/// Sliding window over the most recent training examples.
///
/// New examples are appended at the back; once `capacity` is exceeded the
/// oldest are evicted from the front.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReplayBuffer<S> {
    capacity: usize,
    examples: VecDeque<TrainingExample<S>>,
}

impl<S> ReplayBuffer<S> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            examples: VecDeque::with_capacity(capacity.min(1 << 16)),
        }
    }

    pub fn push(&mut self, example: TrainingExample<S>) {
        self.examples.push_back(example);
        while self.examples.len() > self.capacity {
            self.examples.pop_front();
        }
    }

    /// Append examples in order, evicting the oldest on overflow.
    pub fn extend(&mut self, examples: impl IntoIterator<Item = TrainingExample<S>>) {
        for example in examples {
            self.push(example);
        }
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &TrainingExample<S>> {
        self.examples.iter()
    }

    /// Draw `batch_size` examples uniformly with replacement.
    pub fn sample<R: Rng>(&self, batch_size: usize, rng: &mut R) -> Result<Vec<&TrainingExample<S>>> {
        if self.examples.is_empty() {
            return Err(ZeroError::EmptyReplayBuffer);
        }
        Ok((0..batch_size)
            .map(|_| &self.examples[rng.gen_range(0..self.examples.len())])
            .collect())
    }

    /// Number of batches that make up one pass over the buffer.
    pub fn batches_per_epoch(&self, batch_size: usize) -> usize {
        self.examples.len().div_ceil(batch_size.max(1))
    }
}

impl<S: Serialize + DeserializeOwned> ReplayBuffer<S> {
    pub fn save(&self, path: &Path) -> Result<()> {
        write_msgpack(path, self)
    }

    pub fn load(path: &Path) -> Result<Self> {
        read_msgpack(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alphazero_core::{Policy, Value};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn example(state: u32) -> TrainingExample<u32> {
        TrainingExample {
            state,
            policy: Policy::uniform(3).unwrap(),
            value: Value::DRAW,
        }
    }

    #[test]
    fn test_evicts_oldest() {
        let mut buffer = ReplayBuffer::new(3);
        buffer.extend((0..5).map(example));

        assert_eq!(buffer.len(), 3);
        let states: Vec<u32> = buffer.iter().map(|e| e.state).collect();
        assert_eq!(states, vec![2, 3, 4]);
    }

    #[test]
    fn test_sample_from_empty_fails() {
        let buffer: ReplayBuffer<u32> = ReplayBuffer::new(4);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(matches!(
            buffer.sample(2, &mut rng),
            Err(ZeroError::EmptyReplayBuffer)
        ));
    }

    #[test]
    fn test_sample_with_replacement() {
        let mut buffer = ReplayBuffer::new(10);
        buffer.extend((0..2).map(example));
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let batch = buffer.sample(16, &mut rng).unwrap();
        assert_eq!(batch.len(), 16);
        assert!(batch.iter().all(|e| e.state < 2));
    }

    #[test]
    fn test_batches_per_epoch() {
        let mut buffer = ReplayBuffer::new(100);
        buffer.extend((0..10).map(example));
        assert_eq!(buffer.batches_per_epoch(4), 3);
        assert_eq!(buffer.batches_per_epoch(10), 1);
        assert_eq!(ReplayBuffer::<u32>::new(5).batches_per_epoch(4), 0);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("replay.msgpack");

        let mut buffer = ReplayBuffer::new(8);
        buffer.extend((0..5).map(example));
        buffer.save(&path).unwrap();

        let loaded: ReplayBuffer<u32> = ReplayBuffer::load(&path).unwrap();
        assert_eq!(loaded.capacity(), 8);
        let states: Vec<u32> = loaded.iter().map(|e| e.state).collect();
        assert_eq!(states, vec![0, 1, 2, 3, 4]);
    }
}
