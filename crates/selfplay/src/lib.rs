//! Self-play, replay buffer, arena gating and the AlphaZero training loop.
//!
//! The pieces, bottom up:
//!
//! - [`play_one_game`] plays the champion against itself and turns every
//!   move into a [`TrainingExample`]
//! - [`ReplayBuffer`] keeps a sliding window of recent examples
//! - [`Model`] is a trainable evaluator; [`TabularModel`] is the reference
//!   implementation
//! - [`Arena`] plays a candidate against the champion with alternating colours
//! - [`run_iteration`] and [`Coach`] tie them into the train-and-gate loop

pub mod arena;
pub mod checkpoint;
pub mod coach;
pub mod config;
pub mod episode;
pub mod example;
pub mod model;
pub mod replay;

pub use arena::{Arena, ArenaReport};
pub use checkpoint::{CheckpointDir, CheckpointMeta};
pub use coach::{run_iteration, Coach, IterationOutcome, IterationSummary, SelfPlayStats};
pub use config::{ArenaConfig, CoachConfig, SelfPlayConfig};
pub use episode::{play_one_game, GameRecord};
pub use example::{assign_outcome, augment, TrainingExample};
pub use model::{policy_cross_entropy, value_squared_error, Model, TabularModel, TrainStats};
pub use replay::ReplayBuffer;
