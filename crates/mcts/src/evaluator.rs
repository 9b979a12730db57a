//! Evaluation abstraction for MCTS.
//!
//! The `Evaluator` trait allows swapping between evaluation strategies:
//! a trained model, a uniform prior, or random playouts.

use alphazero_core::{Game, Policy, Result};
use rand::Rng;
use std::cell::RefCell;

/// Evaluation result: prior policy + value estimate.
#[derive(Clone, Debug)]
pub struct Evaluation {
    /// Prior probability for each action index.
    /// Length must equal `game.num_actions()`. Search masks and renormalizes it.
    pub policy: Vec<f32>,

    /// Value estimate from this position (from perspective of player to move).
    /// Should be in range [-1, 1].
    pub value: f32,
}

impl Evaluation {
    /// Uniform prior over the legal actions of `state` with the given value.
    pub fn uniform<G: Game>(game: &G, state: &G::State, value: f32) -> Result<Self> {
        let policy = Policy::uniform_over(&game.legal_actions(state))?;
        Ok(Self {
            policy: policy.into_inner(),
            value,
        })
    }
}

/// Trait for evaluating game positions.
///
/// Search always hands evaluators canonical states.
pub trait Evaluator<G: Game> {
    /// Evaluate a position, returning prior policy and value estimate.
    ///
    /// The value is from the perspective of the player to move,
    /// in the range [-1, 1] where +1 is winning and -1 is losing.
    ///
    /// # Errors
    /// Failures are returned to the caller of the search unchanged.
    fn evaluate(&self, game: &G, state: &G::State) -> Result<Evaluation>;
}

impl<G: Game, E: Evaluator<G> + ?Sized> Evaluator<G> for &E {
    fn evaluate(&self, game: &G, state: &G::State) -> Result<Evaluation> {
        (**self).evaluate(game, state)
    }
}

/// Uniform prior over legal actions and a value of 0 everywhere.
#[derive(Clone, Copy, Debug, Default)]
pub struct UniformEvaluator;

impl<G: Game> Evaluator<G> for UniformEvaluator {
    fn evaluate(&self, game: &G, state: &G::State) -> Result<Evaluation> {
        Evaluation::uniform(game, state, 0.0)
    }
}

/// Uniform prior over legal actions and a value drawn uniformly from [-1, 1].
pub struct RandomValueEvaluator<R: Rng> {
    rng: RefCell<R>,
}

impl<R: Rng> RandomValueEvaluator<R> {
    pub fn new(rng: R) -> Self {
        Self {
            rng: RefCell::new(rng),
        }
    }
}

impl<G: Game, R: Rng> Evaluator<G> for RandomValueEvaluator<R> {
    fn evaluate(&self, game: &G, state: &G::State) -> Result<Evaluation> {
        let value = self.rng.borrow_mut().gen_range(-1.0f32..=1.0);
        Evaluation::uniform(game, state, value)
    }
}

/// Evaluator using uniform prior and random rollouts.
///
/// - Policy: uniform distribution over legal actions
/// - Value: result of a random playout from the position
pub struct RolloutEvaluator<R: Rng> {
    /// Random number generator (wrapped in RefCell for interior mutability).
    rng: RefCell<R>,

    /// Maximum depth for random rollouts.
    max_rollout_depth: usize,
}

impl<R: Rng> RolloutEvaluator<R> {
    /// Create a new rollout evaluator.
    ///
    /// # Arguments
    /// * `rng` - Random number generator for rollouts
    /// * `max_rollout_depth` - Maximum moves in a random playout
    pub fn new(rng: R, max_rollout_depth: usize) -> Self {
        Self {
            rng: RefCell::new(rng),
            max_rollout_depth,
        }
    }

    /// Perform a random rollout from the given state.
    ///
    /// Returns the game outcome from the perspective of the player
    /// who was to move at the start of the rollout.
    fn rollout<G: Game>(&self, game: &G, initial_state: &G::State) -> f32 {
        let mut state = initial_state.clone();
        let mut depth = 0;

        while !game.is_terminal(&state) && depth < self.max_rollout_depth {
            let legal: Vec<usize> = game
                .legal_actions(&state)
                .iter()
                .enumerate()
                .filter(|&(_, &l)| l)
                .map(|(a, _)| a)
                .collect();
            if legal.is_empty() {
                break;
            }

            let idx = self.rng.borrow_mut().gen_range(0..legal.len());
            state = game.apply(&state, legal[idx]);
            depth += 1;
        }

        match game.outcome(&state) {
            // outcome is from the perspective of the player who just moved:
            // after an odd number of moves that is the initial player
            Some(outcome) if depth % 2 == 1 => outcome,
            Some(outcome) => -outcome,
            // Game didn't end in rollout - return 0 (draw estimate)
            None => 0.0,
        }
    }
}

impl<G: Game, R: Rng> Evaluator<G> for RolloutEvaluator<R> {
    fn evaluate(&self, game: &G, state: &G::State) -> Result<Evaluation> {
        let value = self.rollout(game, state);
        Evaluation::uniform(game, state, value)
    }
}
