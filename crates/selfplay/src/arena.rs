//! Candidate versus champion evaluation.
//!
//! Both sides search with their own engine, a fresh tree per move, no root
//! noise and greedy move choice. Colours alternate so that first-move
//! advantage cancels out.

use crate::config::ArenaConfig;
use alphazero_core::{Game, Result, ZeroError};
use alphazero_mcts::{Evaluator, Mcts};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Tally of arena games from the candidate's point of view.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArenaReport {
    pub candidate_wins: usize,
    pub champion_wins: usize,
    pub draws: usize,
}

impl ArenaReport {
    pub fn games(&self) -> usize {
        self.candidate_wins + self.champion_wins + self.draws
    }

    /// Candidate share of decisive games; `None` if every game was drawn.
    pub fn win_rate(&self) -> Option<f32> {
        let decisive = self.candidate_wins + self.champion_wins;
        if decisive == 0 {
            None
        } else {
            Some(self.candidate_wins as f32 / decisive as f32)
        }
    }

    /// Whether the candidate cleared the promotion bar.
    pub fn should_promote(&self, win_threshold: f32) -> bool {
        self.win_rate().is_some_and(|rate| rate >= win_threshold)
    }

    fn record(&mut self, candidate_result: f32) {
        if candidate_result > 0.5 {
            self.candidate_wins += 1;
        } else if candidate_result < -0.5 {
            self.champion_wins += 1;
        } else {
            self.draws += 1;
        }
    }
}

/// Head-to-head match between two evaluators.
pub struct Arena<'a, G, C, H> {
    game: &'a G,
    candidate: C,
    champion: H,
    config: &'a ArenaConfig,
}

impl<'a, G, C, H> Arena<'a, G, C, H>
where
    G: Game,
    C: Evaluator<G>,
    H: Evaluator<G>,
{
    pub fn new(game: &'a G, candidate: C, champion: H, config: &'a ArenaConfig) -> Self {
        Self {
            game,
            candidate,
            champion,
            config,
        }
    }

    /// Play `config.games` games. The candidate moves first in even games.
    pub fn play_games(&self, seed: u64) -> Result<ArenaReport> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut report = ArenaReport::default();

        for i in 0..self.config.games {
            let candidate_first = i % 2 == 0;
            let result = self.play_game(candidate_first, rng.gen())?;
            report.record(result);
            debug!(game = i, candidate_first, result, "arena game finished");
        }

        Ok(report)
    }

    /// Play one game and return the result for the candidate.
    pub fn play_game(&self, candidate_first: bool, seed: u64) -> Result<f32> {
        let game = self.game;
        let mcts_config = self.config.mcts.clone().without_noise();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let mut state = game.initial_state();
        let mut ply = 0;

        while !game.is_terminal(&state) {
            if ply >= self.config.max_ply {
                let err = ZeroError::NonTerminatingGame {
                    max_ply: self.config.max_ply,
                };
                warn!(%err, "scoring arena game as a draw");
                return Ok(0.0);
            }

            let canonical = game.canonical_form(&state);
            let candidate_to_move = (ply % 2 == 0) == candidate_first;
            let engine_rng = ChaCha8Rng::seed_from_u64(rng.gen());
            let result = if candidate_to_move {
                Mcts::new(mcts_config.clone(), &self.candidate, engine_rng).search(game, &canonical)?
            } else {
                Mcts::new(mcts_config.clone(), &self.champion, engine_rng).search(game, &canonical)?
            };

            let action = result.best_action();
            if !game.is_legal(&canonical, action) {
                return Err(ZeroError::InvalidAction { action, ply });
            }
            state = game.apply(&state, action);
            ply += 1;
        }

        if ply == 0 {
            return Ok(0.0);
        }
        let last_mover_outcome = game.outcome(&state).unwrap_or(0.0);
        let candidate_moved_last = ((ply - 1) % 2 == 0) == candidate_first;
        Ok(if candidate_moved_last {
            last_mover_outcome
        } else {
            -last_mover_outcome
        })
    }
}
