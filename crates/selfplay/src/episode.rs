//! Self-play: one game of the current evaluator against itself.

use crate::{
    config::SelfPlayConfig,
    example::{assign_outcome, augment, TrainingExample},
};
use alphazero_core::{Game, Result, ZeroError};
use alphazero_mcts::{Evaluator, Mcts};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, warn};

/// A finished self-play game.
#[derive(Clone, Debug)]
pub struct GameRecord<S> {
    /// Training examples in play order (times the symmetry count when
    /// augmented).
    pub examples: Vec<TrainingExample<S>>,

    /// Plies played.
    pub plies: usize,

    /// Result for the player who made the last move. 0 for truncated games.
    pub outcome: f32,

    /// Result for the player who moved first.
    pub first_player_outcome: f32,

    /// The game hit the ply cap and was scored as a draw.
    pub truncated: bool,
}

/// Play one game of self-play and return its training examples.
///
/// Every move runs a full search from the canonical state, picks a move from
/// the visit counts at the configured temperature and records the normalized
/// visit counts as the policy target.
///
/// # Errors
/// - `InvalidAction` if move selection ever leaves the legal mask
/// - evaluator and search errors, unchanged
pub fn play_one_game<G, E, R>(
    game: &G,
    evaluator: E,
    config: &SelfPlayConfig,
    rng: &mut R,
) -> Result<GameRecord<G::State>>
where
    G: Game,
    E: Evaluator<G>,
    R: Rng,
{
    let mut engine = Mcts::new(
        config.mcts.clone(),
        &evaluator,
        ChaCha8Rng::seed_from_u64(rng.gen()),
    );

    let mut state = game.initial_state();
    let mut history = Vec::new();
    let mut ply = 0;
    let mut truncated = false;

    while !game.is_terminal(&state) {
        if ply >= config.max_ply {
            let err = ZeroError::NonTerminatingGame {
                max_ply: config.max_ply,
            };
            warn!(%err, "scoring self-play game as a draw");
            truncated = true;
            break;
        }

        if ply > 0 && !config.mcts.reuse_tree {
            engine = Mcts::new(
                config.mcts.clone(),
                &evaluator,
                ChaCha8Rng::seed_from_u64(rng.gen()),
            );
        }

        let canonical = game.canonical_form(&state);
        let result = engine.search(game, &canonical)?;

        let action = result.select_action(config.effective_temperature(ply), rng)?;
        if !game.is_legal(&canonical, action) {
            return Err(ZeroError::InvalidAction { action, ply });
        }

        history.push((canonical, result.policy(1.0)?));
        state = game.apply(&state, action);
        ply += 1;
    }

    let outcome = if truncated {
        0.0
    } else {
        game.outcome(&state).unwrap_or(0.0)
    };
    // The first player made the last move iff the game had an odd length
    let first_player_outcome = match ply {
        0 => 0.0,
        n if n % 2 == 1 => outcome,
        _ => -outcome,
    };

    let mut examples = assign_outcome(history, outcome);
    if config.augment_symmetries {
        examples = augment(game, examples)?;
    }

    debug!(
        plies = ply,
        outcome,
        first_player_outcome,
        truncated,
        examples = examples.len(),
        "self-play game finished"
    );

    Ok(GameRecord {
        examples,
        plies: ply,
        outcome,
        first_player_outcome,
        truncated,
    })
}
