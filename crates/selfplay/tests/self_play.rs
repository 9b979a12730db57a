//! Self-play driver properties: value targets, the ply cap and symmetry
//! augmentation.

use alphazero_core::{Game, Result, ZeroError};
use alphazero_mcts::{games::TicTacToe, Evaluation, Evaluator, MctsConfig, UniformEvaluator};
use alphazero_selfplay::{play_one_game, SelfPlayConfig};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;

fn config(simulations: usize) -> SelfPlayConfig {
    SelfPlayConfig {
        mcts: MctsConfig::with_simulations(simulations),
        temperature_threshold_ply: 4,
        ..Default::default()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// The last mover's examples get the outcome, the other player's get
    /// its negation.
    #[test]
    fn prop_value_targets_alternate(seed in any::<u64>(), simulations in 4usize..40) {
        let game = TicTacToe;
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let record = play_one_game(&game, UniformEvaluator, &config(simulations), &mut rng).unwrap();

        let plies = record.plies;
        prop_assert_eq!(record.examples.len(), plies);
        for (j, example) in record.examples.iter().enumerate() {
            let expected = if (plies - 1 - j) % 2 == 0 { record.outcome } else { -record.outcome };
            prop_assert_eq!(example.value.get(), expected);
        }

        // Tic-tac-toe is only ever won by the player who just moved
        prop_assert!(record.outcome == 0.0 || record.outcome == 1.0);
        let first_expected = if plies % 2 == 1 { record.outcome } else { -record.outcome };
        prop_assert_eq!(record.first_player_outcome, first_expected);
    }

    /// Recorded states are canonical and their policies only cover legal moves.
    #[test]
    fn prop_examples_are_canonical(seed in any::<u64>()) {
        let game = TicTacToe;
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let record = play_one_game(&game, UniformEvaluator, &config(12), &mut rng).unwrap();

        for example in &record.examples {
            prop_assert_eq!(&game.canonical_form(&example.state), &example.state);
            let legal = game.legal_actions(&example.state);
            for (action, &p) in example.policy.iter().enumerate() {
                prop_assert!(p == 0.0 || legal[action]);
            }
            prop_assert!((example.policy.sum() - 1.0).abs() < 1e-5);
        }
    }
}

#[test]
fn test_symmetry_round_trip() {
    let game = TicTacToe;
    let config = SelfPlayConfig {
        augment_symmetries: true,
        ..config(16)
    };
    let mut rng = ChaCha8Rng::seed_from_u64(17);
    let record = play_one_game(&game, UniformEvaluator, &config, &mut rng).unwrap();
    assert_eq!(record.examples.len(), record.plies * 8);

    for group in record.examples.chunks(8) {
        let class: HashSet<_> = game
            .symmetries(&group[0].state, group[0].policy.as_slice())
            .into_iter()
            .map(|(state, _)| state)
            .collect();

        for variant in group {
            // Re-expanding any variant lands in the same equivalence class
            let again: HashSet<_> = game
                .symmetries(&variant.state, variant.policy.as_slice())
                .into_iter()
                .map(|(state, _)| game.canonical_form(&state))
                .collect();
            assert_eq!(again, class);

            assert_eq!(variant.value, group[0].value);
            let legal = game.legal_actions(&variant.state);
            for (action, &p) in variant.policy.iter().enumerate() {
                assert!(p == 0.0 || legal[action]);
            }
        }
    }
}

/// A game that cycles through three positions forever.
#[derive(Clone)]
struct Carousel;

impl Game for Carousel {
    type State = u8;

    fn initial_state(&self) -> u8 {
        0
    }

    fn num_actions(&self) -> usize {
        2
    }

    fn legal_actions(&self, _state: &u8) -> Vec<bool> {
        vec![true, true]
    }

    fn apply(&self, state: &u8, action: usize) -> u8 {
        (state + action as u8 + 1) % 3
    }

    fn is_terminal(&self, _state: &u8) -> bool {
        false
    }

    fn outcome(&self, _state: &u8) -> Option<f32> {
        None
    }

    fn canonical_form(&self, state: &u8) -> u8 {
        *state
    }
}

#[test]
fn test_endless_game_stops_at_ply_cap() {
    let config = SelfPlayConfig {
        mcts: MctsConfig::with_simulations(6),
        max_ply: 1000,
        ..Default::default()
    };
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    let record = play_one_game(&Carousel, UniformEvaluator, &config, &mut rng).unwrap();

    assert!(record.truncated);
    assert_eq!(record.plies, 1000);
    assert_eq!(record.outcome, 0.0);
    assert_eq!(record.examples.len(), 1000);
    assert!(record.examples.iter().all(|e| e.value.get() == 0.0));
}

/// Puts all prior mass on an illegal action.
struct IllegalPrior;

impl Evaluator<TicTacToe> for IllegalPrior {
    fn evaluate(&self, _game: &TicTacToe, state: &<TicTacToe as Game>::State) -> Result<Evaluation> {
        let mut policy = vec![0.0; 9];
        let occupied = (0..9).find(|&c| state.get(c).is_some()).unwrap_or(0);
        policy[occupied] = 1.0;
        Ok(Evaluation { policy, value: 0.0 })
    }
}

#[test]
fn test_illegal_prior_is_recovered() {
    // The degenerate prior falls back to uniform and the game still finishes
    let game = TicTacToe;
    let mut rng = ChaCha8Rng::seed_from_u64(4);
    let record = play_one_game(&game, IllegalPrior, &config(8), &mut rng).unwrap();
    assert!(!record.truncated);
    assert!(record.plies >= 5);
}

struct Broken;

impl Evaluator<TicTacToe> for Broken {
    fn evaluate(&self, _game: &TicTacToe, _state: &<TicTacToe as Game>::State) -> Result<Evaluation> {
        Err(ZeroError::Evaluator("weights missing".to_string()))
    }
}

#[test]
fn test_evaluator_failure_propagates() {
    let game = TicTacToe;
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    let err = play_one_game(&game, Broken, &config(8), &mut rng).unwrap_err();
    assert!(matches!(err, ZeroError::Evaluator(_)));
}

/// Tic-tac-toe whose point legality check rejects every move, so it
/// disagrees with the mask the search works from.
#[derive(Clone)]
struct RejectingRules;

impl Game for RejectingRules {
    type State = <TicTacToe as Game>::State;

    fn initial_state(&self) -> Self::State {
        TicTacToe.initial_state()
    }

    fn num_actions(&self) -> usize {
        TicTacToe.num_actions()
    }

    fn legal_actions(&self, state: &Self::State) -> Vec<bool> {
        TicTacToe.legal_actions(state)
    }

    fn apply(&self, state: &Self::State, action: usize) -> Self::State {
        TicTacToe.apply(state, action)
    }

    fn is_terminal(&self, state: &Self::State) -> bool {
        TicTacToe.is_terminal(state)
    }

    fn outcome(&self, state: &Self::State) -> Option<f32> {
        TicTacToe.outcome(state)
    }

    fn canonical_form(&self, state: &Self::State) -> Self::State {
        TicTacToe.canonical_form(state)
    }

    fn is_legal(&self, _state: &Self::State, _action: usize) -> bool {
        false
    }
}

#[test]
fn test_illegal_move_aborts_game() {
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let err = play_one_game(&RejectingRules, UniformEvaluator, &config(8), &mut rng).unwrap_err();
    assert!(matches!(err, ZeroError::InvalidAction { ply: 0, .. }), "{err:?}");
}
