//! Small games used to validate the search engine.
//!
//! These games are cheap enough to search exhaustively in tests and to
//! drive the self-play loop end to end.

pub mod tictactoe;

pub use tictactoe::{Player, TicTacToe, TicTacToeState};
