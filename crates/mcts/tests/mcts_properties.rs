//! Property-based tests for the MCTS implementation.
//!
//! Invariants checked over random tic-tac-toe positions:
//! - visit counts sum to the simulation count
//! - only legal actions receive visits
//! - every expanded node's priors sum to 1 over legal actions
//! - root value stays in [-1, 1]
//! - same seed, same result

use alphazero_core::Game;
use alphazero_mcts::{
    games::{TicTacToe, TicTacToeState},
    Mcts, MctsConfig, RandomValueEvaluator, RolloutEvaluator,
};
use proptest::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Tolerance for policy sum validation
const POLICY_SUM_TOLERANCE: f32 = 1e-5;

// =============================================================================
// Strategies for generating test inputs
// =============================================================================

/// Generate a random seed for MCTS
fn arb_seed() -> impl Strategy<Value = u64> {
    any::<u64>()
}

/// Generate a random number of simulations (10-200 for fast tests)
fn arb_simulations() -> impl Strategy<Value = usize> {
    10usize..200
}

/// Generate a random tic-tac-toe position by making random moves.
///
/// Only positions with at least two legal moves are kept, since a forced
/// move skips the search entirely.
fn arb_tictactoe_position() -> impl Strategy<Value = TicTacToeState> {
    (0usize..8, arb_seed())
        .prop_map(|(num_moves, seed)| {
            let game = TicTacToe;
            let mut state = game.initial_state();
            let mut rng = ChaCha8Rng::seed_from_u64(seed);

            for _ in 0..num_moves {
                if game.is_terminal(&state) {
                    break;
                }
                let legal: Vec<usize> = (0..9).filter(|&a| game.is_legal(&state, a)).collect();
                state = game.apply(&state, legal[rng.gen_range(0..legal.len())]);
            }
            state
        })
        .prop_filter("needs a real choice", |state| {
            let game = TicTacToe;
            !game.is_terminal(state) && game.legal_count(state) > 1
        })
}

fn rollout_mcts(
    seed: u64,
    simulations: usize,
) -> Mcts<TicTacToe, RolloutEvaluator<ChaCha8Rng>, ChaCha8Rng> {
    let config = MctsConfig::with_simulations(simulations);
    let rng = ChaCha8Rng::seed_from_u64(seed);
    let evaluator = RolloutEvaluator::new(rng.clone(), 20);
    Mcts::new(config, evaluator, rng)
}

proptest! {
    /// Root visit counts sum to exactly the configured simulation count
    #[test]
    fn prop_visits_sum_to_simulations(
        seed in arb_seed(),
        simulations in arb_simulations(),
        state in arb_tictactoe_position()
    ) {
        let game = TicTacToe;
        let mut mcts = rollout_mcts(seed, simulations);
        let result = mcts.search(&game, &state).unwrap();

        prop_assert_eq!(result.total_visits() as usize, simulations);
        prop_assert_eq!(result.simulations, simulations);
    }

    /// Policy should only have non-zero values for legal actions
    #[test]
    fn prop_policy_only_legal_actions(
        seed in arb_seed(),
        simulations in arb_simulations(),
        state in arb_tictactoe_position()
    ) {
        let game = TicTacToe;
        let mut mcts = rollout_mcts(seed, simulations);
        let result = mcts.search(&game, &state).unwrap();
        let legal = game.legal_actions(&state);
        let policy = result.policy(1.0).unwrap();

        for action in 0..game.num_actions() {
            if !legal[action] {
                prop_assert_eq!(result.visit_counts[action], 0);
                prop_assert!(
                    policy[action] == 0.0,
                    "Policy has non-zero value {} for illegal action index {}",
                    policy[action],
                    action
                );
            }
        }
    }

    /// MCTS policy should sum to 1.0 (±1e-5) at every temperature
    #[test]
    fn prop_policy_sums_to_one(
        seed in arb_seed(),
        simulations in arb_simulations(),
        temperature in prop_oneof![Just(0.0f32), 0.05f32..3.0],
        state in arb_tictactoe_position()
    ) {
        let game = TicTacToe;
        let mut mcts = rollout_mcts(seed, simulations);
        let result = mcts.search(&game, &state).unwrap();
        let policy = result.policy(temperature).unwrap();

        prop_assert!(
            (policy.sum() - 1.0).abs() < POLICY_SUM_TOLERANCE,
            "Policy sum {} is not 1.0 (tolerance {})",
            policy.sum(),
            POLICY_SUM_TOLERANCE
        );
        prop_assert!(policy.iter().all(|&p| p >= 0.0));
    }

    /// Priors installed at expansion are a distribution over legal actions
    #[test]
    fn prop_expanded_priors_normalized(
        seed in arb_seed(),
        simulations in arb_simulations(),
        state in arb_tictactoe_position()
    ) {
        let game = TicTacToe;
        let config = MctsConfig::with_simulations(simulations);
        let evaluator = RandomValueEvaluator::new(ChaCha8Rng::seed_from_u64(seed));
        let mut mcts = Mcts::new(config, evaluator, ChaCha8Rng::seed_from_u64(seed));
        mcts.search(&game, &state).unwrap();

        for node in mcts.tree().nodes().filter(|n| n.expanded) {
            let sum: f64 = node.priors().iter().map(|&p| p as f64).sum();
            prop_assert!((sum - 1.0).abs() < 1e-6, "prior sum {}", sum);
            for (edge, &valid) in node.edges.iter().zip(&node.valid) {
                if !valid {
                    prop_assert_eq!(edge.prior, 0.0);
                }
            }
        }
    }

    /// Root value should be in range [-1, 1]
    #[test]
    fn prop_value_in_range(
        seed in arb_seed(),
        simulations in arb_simulations(),
        state in arb_tictactoe_position()
    ) {
        let game = TicTacToe;
        let mut mcts = rollout_mcts(seed, simulations);
        let result = mcts.search(&game, &state).unwrap();

        prop_assert!(
            (-1.0..=1.0).contains(&result.root_value),
            "Root value {} is outside range [-1, 1]",
            result.root_value
        );
    }

    /// Same seed should produce identical results
    #[test]
    fn prop_deterministic(
        seed in arb_seed(),
        simulations in arb_simulations(),
        state in arb_tictactoe_position()
    ) {
        let game = TicTacToe;
        let result1 = rollout_mcts(seed, simulations).search(&game, &state).unwrap();
        let result2 = rollout_mcts(seed, simulations).search(&game, &state).unwrap();

        prop_assert_eq!(result1, result2);
    }

    /// Best action is a max-visit action and the lowest such index
    #[test]
    fn prop_best_action_is_first_max(
        seed in arb_seed(),
        simulations in arb_simulations(),
        state in arb_tictactoe_position()
    ) {
        let game = TicTacToe;
        let mut mcts = rollout_mcts(seed, simulations);
        let result = mcts.search(&game, &state).unwrap();

        let max = *result.visit_counts.iter().max().unwrap();
        let first = result.visit_counts.iter().position(|&n| n == max).unwrap();
        prop_assert_eq!(result.best_action(), first);
        prop_assert!(game.is_legal(&state, result.best_action()));
    }
}
