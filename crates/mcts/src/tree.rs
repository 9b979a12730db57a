//! Arena-allocated MCTS tree keyed by canonical state.
//!
//! Nodes are stored in a `Vec<Node>` and referenced by index; a hash map
//! from canonical state to index finds the node for a position. There are
//! no parent pointers: backpropagation walks the path recorded during
//! selection. Transpositions share one node.

use crate::node::{Node, NodeId};
use std::collections::HashMap;
use std::hash::Hash;

/// Arena-allocated search tree.
#[derive(Debug)]
pub struct Tree<S: Eq + Hash> {
    nodes: Vec<Node>,
    index: HashMap<S, NodeId>,
}

impl<S: Clone + Eq + Hash> Tree<S> {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Get a reference to a node by ID.
    ///
    /// # Panics
    /// Panics if the NodeId is invalid.
    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Get a mutable reference to a node by ID.
    ///
    /// # Panics
    /// Panics if the NodeId is invalid.
    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Find the node for a canonical state.
    pub fn lookup(&self, state: &S) -> Option<NodeId> {
        self.index.get(state).copied()
    }

    /// Node for a canonical state, if one has been created.
    pub fn node(&self, state: &S) -> Option<&Node> {
        self.lookup(state).map(|id| self.get(id))
    }

    /// Return the node for `state`, creating it with `make` on first sight.
    pub fn get_or_insert_with(&mut self, state: &S, make: impl FnOnce() -> Node) -> NodeId {
        if let Some(id) = self.index.get(state) {
            return *id;
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(make());
        self.index.insert(state.clone(), id);
        id
    }

    /// Drop all nodes.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.index.clear();
    }

    /// Get the number of nodes in the tree.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate over all nodes.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }
}

impl<S: Clone + Eq + Hash> Default for Tree<S> {
    fn default() -> Self {
        Self::new()
    }
}
