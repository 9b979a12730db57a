//! Monte Carlo Tree Search for AlphaZero.
//!
//! This crate provides a generic MCTS implementation that can be used with
//! any game implementing the `alphazero_core::Game` trait.
//!
//! # Features
//!
//! - **Generic**: Works with any `Game` implementation
//! - **PUCT Selection**: Uses the PUCT formula for action selection
//! - **Evaluator Abstraction**: A trained model, a uniform prior or random
//!   rollouts can guide the search
//! - **Transpositions**: Nodes are keyed by canonical state and shared
//! - **Dirichlet Noise**: Adds exploration noise at the root node
//! - **Temperature Sampling**: Converts visit counts into move distributions
//!
//! # Example
//!
//! ```
//! use alphazero_mcts::{Mcts, MctsConfig, RolloutEvaluator, games::TicTacToe};
//! use alphazero_core::Game;
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//!
//! let game = TicTacToe;
//! let state = game.initial_state();
//!
//! let config = MctsConfig::with_simulations(100);
//! let rng = ChaCha8Rng::seed_from_u64(42);
//! let evaluator = RolloutEvaluator::new(rng.clone(), 20);
//! let mut mcts = Mcts::new(config, evaluator, rng);
//!
//! let result = mcts.search(&game, &state).unwrap();
//! assert_eq!(result.total_visits(), 100);
//! println!("Best action: {}", result.best_action());
//! println!("Root value: {}", result.root_value);
//!
//! let policy = result.policy(1.0).unwrap();
//! assert!((policy.sum() - 1.0).abs() < 1e-5);
//! ```

pub mod config;
pub mod evaluator;
pub mod games;
pub mod node;
pub mod search;
pub mod tree;

pub use config::MctsConfig;
pub use evaluator::{Evaluation, Evaluator, RandomValueEvaluator, RolloutEvaluator, UniformEvaluator};
pub use node::{EdgeStats, Node, NodeId};
pub use search::{sample_index, visits_to_policy, Mcts, SearchResult};
pub use tree::Tree;
