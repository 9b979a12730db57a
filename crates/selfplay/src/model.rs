//! Trainable evaluators.
//!
//! A [`Model`] is an [`Evaluator`] that can be trained on batches of
//! examples and persisted. Candidate generations are made by cloning the
//! champion, so training never touches the champion's parameters.

use crate::{
    checkpoint::{read_msgpack, write_msgpack},
    example::TrainingExample,
};
use alphazero_core::{Game, Policy, Result, Value};
use alphazero_mcts::{Evaluation, Evaluator};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::Hash;
use std::path::Path;

/// Probabilities below this are clamped before taking the log.
const LOG_EPSILON: f32 = 1e-8;

/// Losses over one batch, measured before the parameter update.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainStats {
    /// Mean policy cross-entropy.
    pub policy_loss: f32,

    /// Mean squared value error.
    pub value_loss: f32,

    pub examples: usize,
}

impl TrainStats {
    pub fn total_loss(&self) -> f32 {
        self.policy_loss + self.value_loss
    }
}

/// An evaluator with trainable parameters.
pub trait Model<G: Game>: Evaluator<G> + Clone + Send + Sync {
    /// Take one optimization step on `batch`.
    fn train(&mut self, batch: &[&TrainingExample<G::State>]) -> Result<TrainStats>;

    fn save(&self, path: &Path) -> Result<()>;

    fn load(path: &Path) -> Result<Self>;
}

/// Cross-entropy `-Σ t·log p` of a predicted distribution against a target.
pub fn policy_cross_entropy(target: &Policy, predicted: &[f32]) -> f32 {
    target
        .iter()
        .zip(predicted)
        .filter(|&(&t, _)| t > 0.0)
        .map(|(&t, &p)| -t * p.max(LOG_EPSILON).ln())
        .sum()
}

pub fn value_squared_error(target: Value, predicted: f32) -> f32 {
    let diff = target.get() - predicted;
    diff * diff
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct TableEntry {
    policy: Vec<f32>,
    value: f32,
}

/// Lookup-table model keyed by canonical state.
///
/// Unseen states evaluate to a uniform prior over legal actions and value 0.
/// Training moves each visited entry toward its target by `learning_rate`,
/// which keeps stored policies normalized.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TabularModel<S: Eq + Hash> {
    learning_rate: f32,
    entries: HashMap<S, TableEntry>,
}

impl<S: Eq + Hash> TabularModel<S> {
    pub fn new(learning_rate: f32) -> Self {
        Self {
            learning_rate,
            entries: HashMap::new(),
        }
    }

    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    /// Number of states with learned values.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stored value for a state, if it has been trained on.
    pub fn value_of(&self, state: &S) -> Option<f32> {
        self.entries.get(state).map(|e| e.value)
    }
}

impl<G> Evaluator<G> for TabularModel<G::State>
where
    G: Game,
{
    fn evaluate(&self, game: &G, state: &G::State) -> Result<Evaluation> {
        match self.entries.get(state) {
            Some(entry) => Ok(Evaluation {
                policy: entry.policy.clone(),
                value: entry.value,
            }),
            None => Evaluation::uniform(game, state, 0.0),
        }
    }
}

impl<G> Model<G> for TabularModel<G::State>
where
    G: Game,
    G::State: Serialize + DeserializeOwned,
{
    fn train(&mut self, batch: &[&TrainingExample<G::State>]) -> Result<TrainStats> {
        if batch.is_empty() {
            return Ok(TrainStats::default());
        }

        let lr = self.learning_rate;
        let mut policy_loss = 0.0;
        let mut value_loss = 0.0;

        for example in batch {
            let target = example.policy.as_slice();
            let entry = self
                .entries
                .entry(example.state.clone())
                .or_insert_with(|| TableEntry {
                    // Unseen states start uniform over the whole action space
                    policy: vec![1.0 / target.len() as f32; target.len()],
                    value: 0.0,
                });

            policy_loss += policy_cross_entropy(&example.policy, &entry.policy);
            value_loss += value_squared_error(example.value, entry.value);

            for (p, &t) in entry.policy.iter_mut().zip(target) {
                *p += lr * (t - *p);
            }
            entry.value += lr * (example.value.get() - entry.value);
        }

        let n = batch.len() as f32;
        Ok(TrainStats {
            policy_loss: policy_loss / n,
            value_loss: value_loss / n,
            examples: batch.len(),
        })
    }

    fn save(&self, path: &Path) -> Result<()> {
        write_msgpack(path, self)
    }

    fn load(path: &Path) -> Result<Self> {
        read_msgpack(path)
    }
}
