//! Cycle-tolerant topological sorting of the dependency edge map.
//!
//! The sorter repeatedly removes every node whose dependencies have all been
//! removed and emits those nodes as one [`EquivalenceClass`]. When no such node
//! exists, the remaining graph contains a cycle: the sorter takes the lowest
//! remaining node, collects everything it can reach, and emits a strongly
//! connected component of that closure that depends on nothing outside itself.
//! Cycle classes carry the edges between their members so callers can report
//! the cycle.
//!
//! Nodes are interned into a `usize` arena in name order, which makes the
//! output independent of hash order and insertion order.

use std::collections::{BTreeMap, BTreeSet};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use super::EdgeMap;
use crate::core::PackageId;

/// One tier of the build order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EquivalenceClass {
    pub members: BTreeSet<PackageId>,
    /// Edges among the members; empty for acyclic classes.
    pub cycle_edges: BTreeMap<PackageId, BTreeSet<PackageId>>,
}

impl EquivalenceClass {
    pub fn is_cycle(&self) -> bool {
        !self.cycle_edges.is_empty()
    }
}

/// Lazy iterator over equivalence classes in dependency order.
///
/// Created by [`sort`]. Each step removes at least one node, so the iterator
/// yields at most as many classes as there are nodes.
#[derive(Debug)]
pub struct TopologicalSort {
    names: Vec<PackageId>,
    depends_on: Vec<BTreeSet<usize>>,
    required_by: Vec<BTreeSet<usize>>,
    candidates: BTreeSet<usize>,
}

impl TopologicalSort {
    fn new(edges: &EdgeMap) -> Self {
        let names: Vec<PackageId> = edges
            .iter()
            .flat_map(|(node, deps)| std::iter::once(node).chain(deps))
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let index: BTreeMap<&PackageId, usize> =
            names.iter().enumerate().map(|(id, name)| (name, id)).collect();

        let mut depends_on = vec![BTreeSet::new(); names.len()];
        let mut required_by = vec![BTreeSet::new(); names.len()];
        for (node, deps) in edges {
            let from = index[node];
            for dep in deps {
                let to = index[dep];
                depends_on[from].insert(to);
                required_by[to].insert(from);
            }
        }

        Self {
            candidates: (0..names.len()).collect(),
            names,
            depends_on,
            required_by,
        }
    }

    fn name_set(&self, ids: &BTreeSet<usize>) -> BTreeSet<PackageId> {
        ids.iter().map(|id| self.names[*id].clone()).collect()
    }

    /// Drop `removed` from the graph; their dependents become candidates.
    fn remove(&mut self, removed: &BTreeSet<usize>) {
        for node in removed {
            self.candidates.remove(node);
            let dependents = std::mem::take(&mut self.required_by[*node]);
            for dependent in dependents {
                if removed.contains(&dependent) {
                    continue;
                }
                self.depends_on[dependent].remove(node);
                self.candidates.insert(dependent);
            }
        }
    }

    /// Everything reachable from `start` through remaining edges.
    fn forward_closure(&self, start: usize) -> BTreeSet<usize> {
        let mut closure = BTreeSet::from([start]);
        let mut work = vec![start];
        while let Some(node) = work.pop() {
            for dep in &self.depends_on[node] {
                if closure.insert(*dep) {
                    work.push(*dep);
                }
            }
        }
        closure
    }

    /// A strongly connected component of `closure` with no edges leaving it.
    fn sink_component(&self, closure: &BTreeSet<usize>) -> BTreeSet<usize> {
        let mut graph: DiGraph<usize, ()> = DiGraph::new();
        let nodes: BTreeMap<usize, NodeIndex> =
            closure.iter().map(|id| (*id, graph.add_node(*id))).collect();
        for (id, from) in &nodes {
            for dep in &self.depends_on[*id] {
                graph.add_edge(*from, nodes[dep], ());
            }
        }
        // Components come out in reverse topological order, sinks first.
        tarjan_scc(&graph)
            .into_iter()
            .next()
            .map(|component| component.into_iter().map(|ix| graph[ix]).collect())
            .unwrap_or_else(|| closure.clone())
    }
}

impl Iterator for TopologicalSort {
    type Item = EquivalenceClass;

    fn next(&mut self) -> Option<EquivalenceClass> {
        let unblocked: BTreeSet<usize> = self
            .candidates
            .iter()
            .copied()
            .filter(|id| self.depends_on[*id].is_empty())
            .collect();

        if !unblocked.is_empty() {
            let class = EquivalenceClass {
                members: self.name_set(&unblocked),
                cycle_edges: BTreeMap::new(),
            };
            self.remove(&unblocked);
            return Some(class);
        }

        let start = *self.candidates.first()?;
        let cycle = self.sink_component(&self.forward_closure(start));
        let cycle_edges = cycle
            .iter()
            .map(|id| (self.names[*id].clone(), self.name_set(&self.depends_on[*id])))
            .collect();
        let class = EquivalenceClass {
            members: self.name_set(&cycle),
            cycle_edges,
        };
        self.remove(&cycle);
        Some(class)
    }
}

/// Sort `edges` into equivalence classes, dependencies first.
pub fn sort(edges: &EdgeMap) -> TopologicalSort {
    TopologicalSort::new(edges)
}

/// Flatten the classes into one order, members alphabetical within a class.
pub fn build_order(edges: &EdgeMap) -> Vec<PackageId> {
    sort(edges).flat_map(|class| class.members).collect()
}
