//! AlphaZero Core - Game abstractions and common types
//!
//! This crate provides the core `Game` trait that defines the interface
//! a two-player board game implements to be searched and trained on.
//!
//! # Types
//!
//! - [`Game`] - Trait for rule engines
//! - [`Policy`] - Probability distribution over actions (sums to 1.0)
//! - [`Value`] - Game value estimate in [-1, 1]
//! - [`ZeroError`] - Error taxonomy shared by search, self-play and training

mod error;
mod game;
mod types;

pub use error::{Result, ZeroError};
pub use game::Game;
pub use types::{Policy, Value};
