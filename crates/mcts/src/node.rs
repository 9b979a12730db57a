//! MCTS node types for tree storage.
//!
//! A node holds the statistics of every outgoing edge, indexed by action.
//! Nodes live in an arena and are referenced by [`NodeId`].

/// Index into the node arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Position of the node in the arena.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Statistics for a single (state, action) edge.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EdgeStats {
    /// N(s, a): number of simulations that selected this edge.
    pub visit_count: u32,

    /// W(s, a): sum of backed-up values, from the perspective of the
    /// player to move at the parent.
    pub value_sum: f32,

    /// P(s, a): prior probability from the evaluator.
    pub prior: f32,
}

impl EdgeStats {
    /// Q(s, a). Returns 0.0 if the edge has never been visited.
    pub fn mean_value(&self) -> f32 {
        if self.visit_count == 0 {
            0.0
        } else {
            self.value_sum / self.visit_count as f32
        }
    }
}

/// A node in the MCTS tree, one per canonical game state.
#[derive(Clone, Debug)]
pub struct Node {
    /// Per-action edge statistics, length `num_actions`.
    pub edges: Vec<EdgeStats>,

    /// Legal-action mask, filled in on expansion.
    pub valid: Vec<bool>,

    /// Whether the evaluator has been queried for this node.
    pub expanded: bool,

    /// Value for the player to move if the state is terminal.
    pub terminal_value: Option<f32>,
}

impl Node {
    /// Create a new unexpanded node.
    pub fn new(num_actions: usize) -> Self {
        Self {
            edges: vec![EdgeStats::default(); num_actions],
            valid: vec![false; num_actions],
            expanded: false,
            terminal_value: None,
        }
    }

    /// Create a terminal leaf. `value` is from the player-to-move perspective.
    pub fn terminal(num_actions: usize, value: f32) -> Self {
        Self {
            terminal_value: Some(value),
            ..Self::new(num_actions)
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal_value.is_some()
    }

    /// Install the legal mask and priors. Called exactly once per node.
    pub fn expand(&mut self, valid: Vec<bool>, priors: &[f32]) {
        debug_assert!(!self.expanded, "node expanded twice");
        for (edge, &prior) in self.edges.iter_mut().zip(priors) {
            edge.prior = prior;
        }
        self.valid = valid;
        self.expanded = true;
    }

    /// Sum of N(s, b) over all actions.
    pub fn visit_count(&self) -> u32 {
        self.edges.iter().map(|e| e.visit_count).sum()
    }

    /// Sum of W(s, b) over all actions.
    pub fn value_sum(&self) -> f32 {
        self.edges.iter().map(|e| e.value_sum).sum()
    }

    /// Visit counts over all actions.
    pub fn visit_counts(&self) -> Vec<u32> {
        self.edges.iter().map(|e| e.visit_count).collect()
    }

    /// Priors over all actions.
    pub fn priors(&self) -> Vec<f32> {
        self.edges.iter().map(|e| e.prior).collect()
    }

    /// Record one backed-up value on the edge for `action`.
    pub fn record(&mut self, action: usize, value: f32) {
        let edge = &mut self.edges[action];
        edge.visit_count += 1;
        edge.value_sum += value;
    }
}

/// PUCT score: Q(s,a) + c_puct * P(s,a) * sqrt(sum_b N(s,b)) / (1 + N(s,a))
#[inline]
pub fn puct_score(edge: &EdgeStats, prior: f32, sqrt_parent_visits: f32, c_puct: f32) -> f32 {
    edge.mean_value() + c_puct * prior * sqrt_parent_visits / (1.0 + edge.visit_count as f32)
}
