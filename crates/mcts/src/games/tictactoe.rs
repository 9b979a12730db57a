//! Tic-tac-toe implementation for MCTS validation.
//!
//! Tic-tac-toe is a solved game where perfect play always results in a draw.
//! This makes it ideal for validating MCTS correctness:
//! - MCTS should take an immediate win when one exists
//! - MCTS should block an immediate loss
//! - Two equal players should score the same over alternating colours

use alphazero_core::Game;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;

/// Tic-tac-toe player.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
pub enum Player {
    X,
    O,
}

impl Player {
    /// Get the opposing player.
    pub fn opposite(self) -> Self {
        match self {
            Player::X => Player::O,
            Player::O => Player::X,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Player::X => write!(f, "X"),
            Player::O => write!(f, "O"),
        }
    }
}

/// Tic-tac-toe board state.
#[derive(Clone, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
pub struct TicTacToeState {
    /// Board: 9 cells, indexed 0-8 (row-major).
    /// ```text
    /// 0 | 1 | 2
    /// ---------
    /// 3 | 4 | 5
    /// ---------
    /// 6 | 7 | 8
    /// ```
    board: [Option<Player>; 9],

    /// Current player to move.
    current: Player,

    /// Cached winner (if any).
    winner: Option<Player>,
}

impl TicTacToeState {
    /// Create a new empty board with X to move.
    pub fn new() -> Self {
        Self {
            board: [None; 9],
            current: Player::X,
            winner: None,
        }
    }

    /// Build a position from a 9-character row-major string of `X`, `O`
    /// and `.`; the side to move is inferred from the piece counts.
    pub fn from_cells(cells: &str) -> Option<Self> {
        let chars: Vec<char> = cells.chars().filter(|c| !c.is_whitespace()).collect();
        if chars.len() != 9 {
            return None;
        }

        let mut board = [None; 9];
        for (cell, ch) in board.iter_mut().zip(chars) {
            *cell = match ch {
                'X' | 'x' => Some(Player::X),
                'O' | 'o' => Some(Player::O),
                '.' | '-' => None,
                _ => return None,
            };
        }

        let xs = board.iter().filter(|&&c| c == Some(Player::X)).count();
        let os = board.iter().filter(|&&c| c == Some(Player::O)).count();
        let current = match xs.checked_sub(os)? {
            0 => Player::X,
            1 => Player::O,
            _ => return None,
        };

        let mut state = Self {
            board,
            current,
            winner: None,
        };
        state.winner = state.check_winner();
        Some(state)
    }

    /// Get the current player to move.
    pub fn current_player(&self) -> Player {
        self.current
    }

    /// Get the winner, if any.
    pub fn winner(&self) -> Option<Player> {
        self.winner
    }

    /// Get the piece at a cell, if any.
    pub fn get(&self, cell: usize) -> Option<Player> {
        self.board.get(cell).copied().flatten()
    }

    /// Check for a winner on the current board.
    fn check_winner(&self) -> Option<Player> {
        const LINES: [[usize; 3]; 8] = [
            [0, 1, 2], // top row
            [3, 4, 5], // middle row
            [6, 7, 8], // bottom row
            [0, 3, 6], // left column
            [1, 4, 7], // center column
            [2, 5, 8], // right column
            [0, 4, 8], // main diagonal
            [2, 4, 6], // anti-diagonal
        ];

        for line in LINES {
            if let Some(player) = self.board[line[0]] {
                if self.board[line[1]] == Some(player) && self.board[line[2]] == Some(player) {
                    return Some(player);
                }
            }
        }
        None
    }

    /// Check if the board is full (draw if no winner).
    fn is_full(&self) -> bool {
        self.board.iter().all(|c| c.is_some())
    }

    /// Same position with X and O exchanged.
    fn swap_colours(&self) -> Self {
        let mut board = [None; 9];
        for (dst, src) in board.iter_mut().zip(self.board) {
            *dst = src.map(Player::opposite);
        }
        Self {
            board,
            current: self.current.opposite(),
            winner: self.winner.map(Player::opposite),
        }
    }
}

impl Default for TicTacToeState {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TicTacToeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..3 {
            if row > 0 {
                writeln!(f, "-----------")?;
            }
            for col in 0..3 {
                if col > 0 {
                    write!(f, " | ")?;
                }
                let cell = row * 3 + col;
                match self.board[cell] {
                    Some(Player::X) => write!(f, " X ")?,
                    Some(Player::O) => write!(f, " O ")?,
                    None => write!(f, "   ")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Destination of `cell` under dihedral transform `k` (0..8).
///
/// Transforms 0-3 rotate clockwise `k` quarter turns; 4-7 do the same
/// after a left-right mirror.
fn transform_cell(k: usize, cell: usize) -> usize {
    let (mut row, mut col) = (cell / 3, cell % 3);
    if k >= 4 {
        col = 2 - col;
    }
    for _ in 0..k % 4 {
        (row, col) = (col, 2 - row);
    }
    row * 3 + col
}

/// Tic-tac-toe game implementation.
#[derive(Clone, Debug)]
pub struct TicTacToe;

impl Game for TicTacToe {
    type State = TicTacToeState;

    fn initial_state(&self) -> Self::State {
        TicTacToeState::new()
    }

    fn num_actions(&self) -> usize {
        9
    }

    fn legal_actions(&self, state: &Self::State) -> Vec<bool> {
        if state.winner.is_some() {
            return vec![false; 9];
        }
        state.board.iter().map(|cell| cell.is_none()).collect()
    }

    fn apply(&self, state: &Self::State, action: usize) -> Self::State {
        let mut new_state = state.clone();
        new_state.board[action] = Some(state.current);
        new_state.current = state.current.opposite();
        new_state.winner = new_state.check_winner();
        new_state
    }

    fn is_terminal(&self, state: &Self::State) -> bool {
        state.winner.is_some() || state.is_full()
    }

    fn outcome(&self, state: &Self::State) -> Option<f32> {
        if let Some(winner) = state.winner {
            // The winner is whoever just moved unless the state was built by hand
            if winner != state.current {
                Some(1.0)
            } else {
                Some(-1.0)
            }
        } else if state.is_full() {
            Some(0.0)
        } else {
            None
        }
    }

    /// Relabel pieces so that X is always to move.
    fn canonical_form(&self, state: &Self::State) -> Self::State {
        match state.current {
            Player::X => state.clone(),
            Player::O => state.swap_colours(),
        }
    }

    /// The 8 rotations and reflections of the board, policy permuted alike.
    fn symmetries(&self, state: &Self::State, policy: &[f32]) -> Vec<(Self::State, Vec<f32>)> {
        (0..8)
            .map(|k| {
                let mut board = [None; 9];
                let mut permuted = vec![0.0; policy.len()];
                for cell in 0..9 {
                    let dst = transform_cell(k, cell);
                    board[dst] = state.board[cell];
                    if let Some(&p) = policy.get(cell) {
                        permuted[dst] = p;
                    }
                }
                let sym = TicTacToeState {
                    board,
                    current: state.current,
                    winner: state.winner,
                };
                (sym, permuted)
            })
            .collect()
    }
}
