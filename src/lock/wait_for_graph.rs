//! Transaction wait-for graph (spec.md §3 `TWFG`, §4.9 deadlock detection).
//!
//! Grounded directly on the teacher's `transaction::wait_for_graph::
//! WaitForGraph` (`HashMap<TransactionID, HashSet<TransactionID>>` +
//! recursive-DFS `exists_cycle`), generalized from page latches to lock
//! resources. The original's stale-edge sequence-number bookkeeping
//! (spec.md §4.9 step 4) has no real analog here: `LockManager` rebuilds
//! the edges touching a resource every time `try_grant` runs rather than
//! maintaining them incrementally across sweeps, so every edge present
//! during a `find_cycle` call is already current.

use std::collections::{HashMap, HashSet};

pub type TranIndex = u32;

/// One node's bookkeeping for a detection pass (spec.md §3 `TWFG`).
#[derive(Debug, Clone, Default)]
struct Node {
    edges: Vec<TranIndex>,
}

pub struct WaitForGraph {
    nodes: HashMap<TranIndex, Node>,
}

impl WaitForGraph {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
        }
    }

    /// Reset every node before a fresh detection sweep (spec.md §4.9
    /// step 1).
    pub fn reset(&mut self) {
        self.nodes.clear();
    }

    /// `add_edge(from, to)`: `from` waits for `to`.
    pub fn add_edge(&mut self, from: TranIndex, to: TranIndex) {
        let from_node = self.nodes.entry(from).or_default();
        if !from_node.edges.contains(&to) {
            from_node.edges.push(to);
        }
        self.nodes.entry(to).or_default();
    }

    pub fn remove_edge(&mut self, from: TranIndex, to: TranIndex) {
        if let Some(node) = self.nodes.get_mut(&from) {
            node.edges.retain(|&e| e != to);
        }
    }

    pub fn remove_transaction(&mut self, tran: TranIndex) {
        self.nodes.remove(&tran);
        for node in self.nodes.values_mut() {
            node.edges.retain(|&e| e != tran);
        }
    }

    /// Find a cycle, if any, returning the participating transaction
    /// indexes in visitation order.
    pub fn find_cycle(&self) -> Option<Vec<TranIndex>> {
        let mut visited = HashSet::new();

        for &start in self.nodes.keys() {
            if visited.contains(&start) {
                continue;
            }
            let mut stack = Vec::new();
            if let Some(cycle) = self.dfs(start, &mut visited, &mut stack) {
                return Some(cycle);
            }
        }
        None
    }

    fn dfs(
        &self,
        tran: TranIndex,
        visited: &mut HashSet<TranIndex>,
        stack: &mut Vec<TranIndex>,
    ) -> Option<Vec<TranIndex>> {
        if let Some(pos) = stack.iter().position(|&t| t == tran) {
            return Some(stack[pos..].to_vec());
        }
        if visited.contains(&tran) {
            return None;
        }

        stack.push(tran);
        if let Some(node) = self.nodes.get(&tran) {
            for &to in &node.edges {
                if let Some(cycle) = self.dfs(to, visited, stack) {
                    return Some(cycle);
                }
            }
        }
        stack.pop();
        visited.insert(tran);
        None
    }
}

impl Default for WaitForGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_cycle_is_detected() {
        let mut g = WaitForGraph::new();
        g.add_edge(1, 2);
        g.add_edge(2, 1);
        let cycle = g.find_cycle().unwrap();
        assert!(cycle.contains(&1));
        assert!(cycle.contains(&2));
    }

    #[test]
    fn no_cycle_on_acyclic_chain() {
        let mut g = WaitForGraph::new();
        g.add_edge(1, 2);
        g.add_edge(2, 3);
        assert!(g.find_cycle().is_none());
    }

    #[test]
    fn removing_transaction_breaks_cycle() {
        let mut g = WaitForGraph::new();
        g.add_edge(1, 2);
        g.add_edge(2, 1);
        g.remove_transaction(2);
        assert!(g.find_cycle().is_none());
    }
}
