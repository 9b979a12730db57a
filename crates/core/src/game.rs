use std::fmt::Debug;
use std::hash::Hash;

/// A two-player, perfect-information board game.
///
/// Actions are indices into a fixed-size action space `0..num_actions()`.
/// Legality is reported as a boolean mask over that space, which is also the
/// layout of every policy vector exchanged with an evaluator.
pub trait Game: Clone + Send + Sync {
    /// Board position plus side to move. Treated as an immutable value.
    type State: Clone + Debug + Eq + Hash + Send + Sync;

    /// Returns the initial game state
    fn initial_state(&self) -> Self::State;

    /// Total number of action indices (size of policy vectors and masks)
    fn num_actions(&self) -> usize;

    /// Legal-move mask of length `num_actions()`
    fn legal_actions(&self, state: &Self::State) -> Vec<bool>;

    /// Applies a legal action, returning a new state (immutable operation)
    fn apply(&self, state: &Self::State, action: usize) -> Self::State;

    /// Returns true if the game has ended
    fn is_terminal(&self, state: &Self::State) -> bool;

    /// Returns the game outcome from the perspective of the player who just moved:
    /// - `Some(1.0)` if that player won
    /// - `Some(-1.0)` if that player lost
    /// - `Some(0.0)` for a draw
    /// - `None` if the game is not terminal
    fn outcome(&self, state: &Self::State) -> Option<f32>;

    /// Perspective-normalized form of `state`, used as the search tree key.
    ///
    /// Must not permute action indices: a policy over the canonical state is
    /// a policy over the original state.
    fn canonical_form(&self, state: &Self::State) -> Self::State;

    /// All symmetric variants of `(state, policy)`, the identity included.
    fn symmetries(&self, state: &Self::State, policy: &[f32]) -> Vec<(Self::State, Vec<f32>)> {
        vec![(state.clone(), policy.to_vec())]
    }

    /// Number of legal actions in `state`
    fn legal_count(&self, state: &Self::State) -> usize {
        self.legal_actions(state).iter().filter(|&&legal| legal).count()
    }

    /// Whether `action` is legal in `state`
    fn is_legal(&self, state: &Self::State, action: usize) -> bool {
        self.legal_actions(state).get(action).copied().unwrap_or(false)
    }
}
