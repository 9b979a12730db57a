//! Training examples produced by self-play.

use alphazero_core::{Game, Policy, Result, Value};
use serde::{Deserialize, Serialize};

/// One supervised target: a canonical state, the search policy there and the
/// final game result from the perspective of the player to move.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingExample<S> {
    pub state: S,
    pub policy: Policy,
    pub value: Value,
}

/// Back-fill value targets once a game is over.
///
/// `history` holds one `(canonical state, policy)` pair per ply in play order
/// and `last_mover_outcome` is the result for the player who made the final
/// move. With `L` plies, the pair at 0-based index `j` was recorded by the
/// last mover iff `L - 1 - j` is even, so it receives the outcome unchanged;
/// the other player's pairs receive it negated.
pub fn assign_outcome<S>(history: Vec<(S, Policy)>, last_mover_outcome: f32) -> Vec<TrainingExample<S>> {
    let plies = history.len();
    let outcome = Value::clamped(last_mover_outcome);
    history
        .into_iter()
        .enumerate()
        .map(|(j, (state, policy))| TrainingExample {
            state,
            policy,
            value: if (plies - 1 - j) % 2 == 0 {
                outcome
            } else {
                outcome.negate()
            },
        })
        .collect()
}

/// Expand each example into all of its symmetric variants.
///
/// Values are shared by every variant; policies are permuted by the game.
pub fn augment<G: Game>(game: &G, examples: Vec<TrainingExample<G::State>>) -> Result<Vec<TrainingExample<G::State>>> {
    let mut augmented = Vec::with_capacity(examples.len());
    for example in examples {
        for (state, policy) in game.symmetries(&example.state, example.policy.as_slice()) {
            augmented.push(TrainingExample {
                state,
                policy: Policy::from_unnormalized(policy)?,
                value: example.value,
            });
        }
    }
    Ok(augmented)
}
