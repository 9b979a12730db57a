//! Monte Carlo Tree Search implementation.
//!
//! Implements AlphaZero-style MCTS with PUCT selection over a tree keyed by
//! canonical state. Each simulation walks from the root to an unexpanded or
//! terminal node, evaluates it once, and backs the value up the recorded
//! path with alternating sign.

use crate::{
    config::MctsConfig,
    evaluator::Evaluator,
    node::{puct_score, Node, NodeId},
    tree::Tree,
};
use alphazero_core::{Game, Policy, Result, Value, ZeroError};
use rand::Rng;
use rand_distr::{Dirichlet, Distribution};
use std::marker::PhantomData;
use tracing::{trace, warn};

/// Result of an MCTS search.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchResult {
    /// Visit count N(root, a) for every action index.
    pub visit_counts: Vec<u32>,

    /// Value estimate at root (from perspective of player to move).
    pub root_value: f32,

    /// Simulations actually run. Zero when the move was forced.
    pub simulations: usize,
}

impl SearchResult {
    /// Sum of root visit counts.
    pub fn total_visits(&self) -> u32 {
        self.visit_counts.iter().sum()
    }

    /// Action with the most visits; ties go to the lowest index.
    pub fn best_action(&self) -> usize {
        let mut best = 0;
        for (a, &n) in self.visit_counts.iter().enumerate() {
            if n > self.visit_counts[best] {
                best = a;
            }
        }
        best
    }

    /// Move-selection distribution for the given temperature.
    ///
    /// See [`visits_to_policy`].
    pub fn policy(&self, temperature: f32) -> Result<Policy> {
        visits_to_policy(&self.visit_counts, temperature)
    }

    /// Select an action using temperature-based sampling.
    ///
    /// - temperature = 0: always return best action (greedy)
    /// - temperature = 1: sample proportional to visit counts
    /// - temperature > 1: more uniform distribution
    /// - temperature < 1: more peaked distribution
    pub fn select_action<R: Rng>(&self, temperature: f32, rng: &mut R) -> Result<usize> {
        if temperature <= 0.0 {
            return Ok(self.best_action());
        }
        let policy = self.policy(temperature)?;
        Ok(sample_index(policy.as_slice(), rng))
    }
}

/// Convert visit counts into an action distribution.
///
/// For `temperature > 0`: P(a) ∝ N(a)^(1/τ). Counts are scaled by the maximum
/// before exponentiation so small temperatures cannot overflow.
/// For `temperature == 0`: one-hot on the max-visit action, ties to the
/// lowest index.
///
/// # Errors
/// `InvalidPolicy` if every count is zero.
pub fn visits_to_policy(visits: &[u32], temperature: f32) -> Result<Policy> {
    let max = visits.iter().copied().max().unwrap_or(0);
    if max == 0 {
        return Err(ZeroError::InvalidPolicy(
            "no visits to convert into a policy".to_string(),
        ));
    }

    if temperature <= 0.0 {
        let best = visits.iter().position(|&n| n == max).unwrap_or(0);
        let mut one_hot = vec![0.0; visits.len()];
        one_hot[best] = 1.0;
        return Policy::new(one_hot);
    }

    let inv_temp = 1.0 / temperature as f64;
    let adjusted: Vec<f32> = visits
        .iter()
        .map(|&n| (n as f64 / max as f64).powf(inv_temp) as f32)
        .collect();
    Policy::from_unnormalized(adjusted)
}

/// Sample an index from a probability vector.
pub fn sample_index<R: Rng>(probs: &[f32], rng: &mut R) -> usize {
    let sum: f64 = probs.iter().map(|&p| p as f64).sum();
    let threshold = rng.gen::<f64>() * sum;
    let mut cumulative = 0.0;
    let mut last_positive = 0;

    for (i, &p) in probs.iter().enumerate() {
        if p <= 0.0 {
            continue;
        }
        cumulative += p as f64;
        last_positive = i;
        if cumulative > threshold {
            return i;
        }
    }

    // Rounding left the threshold just past the end
    last_positive
}

/// Monte Carlo Tree Search with PUCT selection.
///
/// Generic over:
/// - `G`: The game being played
/// - `E`: The evaluation strategy
/// - `R`: The random number generator (root noise)
pub struct Mcts<G: Game, E: Evaluator<G>, R: Rng> {
    config: MctsConfig,
    evaluator: E,
    rng: R,
    tree: Tree<G::State>,
    _game: PhantomData<G>,
}

impl<G, E, R> Mcts<G, E, R>
where
    G: Game,
    E: Evaluator<G>,
    R: Rng,
{
    /// Create a new MCTS instance.
    pub fn new(config: MctsConfig, evaluator: E, rng: R) -> Self {
        Self {
            config,
            evaluator,
            rng,
            tree: Tree::new(),
            _game: PhantomData,
        }
    }

    pub fn config(&self) -> &MctsConfig {
        &self.config
    }

    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    /// The search tree built so far.
    pub fn tree(&self) -> &Tree<G::State> {
        &self.tree
    }

    /// Run MCTS from the given state, returning root visit counts.
    ///
    /// # Errors
    /// - `TerminalState` if `state` is terminal
    /// - `NoLegalActions` if a non-terminal state has no legal action
    /// - any evaluator error, unchanged
    pub fn search(&mut self, game: &G, state: &G::State) -> Result<SearchResult> {
        if !self.config.reuse_tree {
            self.tree.clear();
        }

        let root = game.canonical_form(state);
        if game.is_terminal(&root) {
            return Err(ZeroError::TerminalState);
        }

        let num_actions = game.num_actions();
        let legal = game.legal_actions(&root);
        let legal_count = legal.iter().filter(|&&l| l).count();
        if legal_count == 0 {
            return Err(ZeroError::NoLegalActions);
        }
        if legal_count == 1 {
            let forced = legal.iter().position(|&l| l).unwrap_or(0);
            let mut visit_counts = vec![0; num_actions];
            visit_counts[forced] = 1;
            trace!(action = forced, "forced move, search skipped");
            return Ok(SearchResult {
                visit_counts,
                root_value: 0.0,
                simulations: 0,
            });
        }

        let root_id = self.node_for(game, &root);
        if !self.tree.get(root_id).expanded {
            self.expand(game, &root, root_id)?;
        }

        let root_priors = if self.config.uses_noise() {
            self.noisy_root_priors(root_id)
        } else {
            None
        };

        for _ in 0..self.config.num_simulations {
            self.simulate(game, &root, root_id, root_priors.as_deref())?;
        }

        let node = self.tree.get(root_id);
        let total = node.visit_count();
        let root_value = if total > 0 {
            node.value_sum() / total as f32
        } else {
            0.0
        };

        trace!(
            simulations = self.config.num_simulations,
            tree_size = self.tree.len(),
            root_value,
            "search complete"
        );

        Ok(SearchResult {
            visit_counts: node.visit_counts(),
            root_value,
            simulations: self.config.num_simulations,
        })
    }

    /// Run a single simulation: select -> expand/evaluate -> backpropagate.
    fn simulate(
        &mut self,
        game: &G,
        root: &G::State,
        root_id: NodeId,
        root_priors: Option<&[f32]>,
    ) -> Result<()> {
        let mut path: Vec<(NodeId, usize)> = Vec::new();
        let mut state = root.clone();
        let mut current = root_id;

        let leaf_value = loop {
            let node = self.tree.get(current);

            // Terminal value is stored from the player-to-move perspective
            if let Some(value) = node.terminal_value {
                break value;
            }

            if !node.expanded {
                break self.expand(game, &state, current)?;
            }

            // A simple path never has more edges than the tree has nodes
            if path.len() > self.tree.len() {
                trace!(depth = path.len(), "selection cycled, backing up a draw");
                break 0.0;
            }

            let priors = if current == root_id { root_priors } else { None };
            let action = self.select_action(current, priors)?;
            path.push((current, action));

            state = game.canonical_form(&game.apply(&state, action));
            current = self.node_for(game, &state);
        };

        self.backpropagate(&path, leaf_value);
        Ok(())
    }

    /// Look up or create the node for a canonical state.
    ///
    /// Terminal states become terminal leaves right away, so they are never
    /// sent to the evaluator.
    fn node_for(&mut self, game: &G, state: &G::State) -> NodeId {
        let num_actions = game.num_actions();
        self.tree.get_or_insert_with(state, || {
            if game.is_terminal(state) {
                // outcome() is from the perspective of the player who just
                // moved; the player to move sees the opposite
                let value = -game.outcome(state).unwrap_or(0.0);
                Node::terminal(num_actions, value)
            } else {
                Node::new(num_actions)
            }
        })
    }

    /// Query the evaluator once and install masked priors.
    ///
    /// Returns the evaluator's value for backpropagation.
    fn expand(&mut self, game: &G, state: &G::State, node_id: NodeId) -> Result<f32> {
        let evaluation = self.evaluator.evaluate(game, state)?;
        let num_actions = game.num_actions();
        if evaluation.policy.len() != num_actions {
            return Err(ZeroError::Evaluator(format!(
                "policy has {} entries, action space has {}",
                evaluation.policy.len(),
                num_actions
            )));
        }

        let legal = game.legal_actions(state);
        let priors = match Policy::masked(&evaluation.policy, &legal) {
            Ok(priors) => priors,
            Err(ZeroError::DegenerateMask { legal: count }) => {
                warn!(
                    legal = count,
                    "evaluator gave no mass to legal actions, using uniform prior"
                );
                Policy::uniform_over(&legal)?
            }
            Err(err) => return Err(err),
        };

        self.tree
            .get_mut(node_id)
            .expand(legal, priors.as_slice());

        Ok(Value::clamped(evaluation.value).get())
    }

    /// Select the valid action maximizing the PUCT score.
    ///
    /// Ties go to the lowest action index.
    fn select_action(&self, node_id: NodeId, priors: Option<&[f32]>) -> Result<usize> {
        let node = self.tree.get(node_id);
        let sqrt_visits = (node.visit_count() as f32).sqrt();

        let mut best = None;
        let mut best_score = f32::NEG_INFINITY;

        for (action, edge) in node.edges.iter().enumerate() {
            if !node.valid[action] {
                continue;
            }
            let prior = priors.map_or(edge.prior, |p| p[action]);
            let score = puct_score(edge, prior, sqrt_visits, self.config.c_puct);
            if best.is_none() || score > best_score {
                best_score = score;
                best = Some(action);
            }
        }

        best.ok_or(ZeroError::NoLegalActions)
    }

    /// Backpropagate value through path.
    ///
    /// `leaf_value` is from the perspective of the player to move at the
    /// leaf. Each edge stores value from its parent's perspective, so the
    /// sign flips before every edge.
    fn backpropagate(&mut self, path: &[(NodeId, usize)], leaf_value: f32) {
        let mut value = leaf_value;
        for &(node_id, action) in path.iter().rev() {
            value = -value;
            self.tree.get_mut(node_id).record(action, value);
        }
    }

    /// Mix Dirichlet noise into the root priors for this search only.
    fn noisy_root_priors(&mut self, root_id: NodeId) -> Option<Vec<f32>> {
        let root = self.tree.get(root_id);
        let valid: Vec<usize> = (0..root.valid.len()).filter(|&a| root.valid[a]).collect();

        // Dirichlet requires at least 2 elements
        if valid.len() < 2 {
            return None;
        }

        let alpha = vec![self.config.dirichlet_alpha; valid.len()];
        let dirichlet = match Dirichlet::new(&alpha) {
            Ok(d) => d,
            Err(err) => {
                warn!(%err, "invalid Dirichlet parameters, root noise skipped");
                return None;
            }
        };
        let noise: Vec<f32> = dirichlet.sample(&mut self.rng);

        let eps = self.config.exploration_fraction;
        let mut priors = root.priors();
        for (&action, n) in valid.iter().zip(noise) {
            priors[action] = (1.0 - eps) * priors[action] + eps * n;
        }
        Some(priors)
    }
}
