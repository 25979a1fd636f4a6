//! C2: pure adjacency projections, transitive closure, and cycle detection
//! over the surmise relation. Nothing here mutates a [`Graph`].

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::document::Graph;
use crate::types::{ItemId, SurmiseRelation};

/// Prerequisite/successor adjacency derived from a graph's current edge set.
/// Both projections are total: unknown items yield the empty set.
#[derive(Debug, Default)]
pub struct Adjacency {
    prereqs: HashMap<ItemId, BTreeSet<ItemId>>,
    successors: HashMap<ItemId, BTreeSet<ItemId>>,
}

impl Adjacency {
    pub fn build(graph: &Graph) -> Self {
        let mut prereqs: HashMap<ItemId, BTreeSet<ItemId>> = HashMap::new();
        let mut successors: HashMap<ItemId, BTreeSet<ItemId>> = HashMap::new();
        for edge in graph.edges() {
            prereqs.entry(edge.target.clone()).or_default().insert(edge.prerequisite.clone());
            successors.entry(edge.prerequisite.clone()).or_default().insert(edge.target.clone());
        }
        Self { prereqs, successors }
    }

    pub fn prereqs(&self, item: &str) -> &BTreeSet<ItemId> {
        static EMPTY: BTreeSet<ItemId> = BTreeSet::new();
        self.prereqs.get(item).unwrap_or(&EMPTY)
    }

    pub fn successors(&self, item: &str) -> &BTreeSet<ItemId> {
        static EMPTY: BTreeSet<ItemId> = BTreeSet::new();
        self.successors.get(item).unwrap_or(&EMPTY)
    }
}

/// Computes the missing transitive edges (§4.2). Synthesized edges are not
/// appended to the graph; the caller decides (see `closure --apply`).
///
/// Uses Warshall's algorithm: acceptable at the expected item counts (≤ a
/// few hundred) and simple to keep deterministic.
pub fn transitive_closure(graph: &Graph) -> Vec<SurmiseRelation> {
    let mut item_ids: Vec<ItemId> = graph.items().iter().map(|i| i.id.clone()).collect();
    item_ids.sort();
    let n = item_ids.len();
    let index: HashMap<&str, usize> =
        item_ids.iter().enumerate().map(|(i, id)| (id.as_str(), i)).collect();

    let mut reach = vec![vec![false; n]; n];
    let mut existing: BTreeSet<(ItemId, ItemId)> = BTreeSet::new();
    for edge in graph.edges() {
        if let (Some(&i), Some(&j)) = (index.get(edge.prerequisite.as_str()), index.get(edge.target.as_str())) {
            reach[i][j] = true;
        }
        existing.insert((edge.prerequisite.clone(), edge.target.clone()));
    }

    for k in 0..n {
        for i in 0..n {
            if reach[i][k] {
                for j in 0..n {
                    if reach[k][j] {
                        reach[i][j] = true;
                    }
                }
            }
        }
    }

    let mut synthesized = Vec::new();
    for i in 0..n {
        for j in 0..n {
            if i != j && reach[i][j] {
                let pair = (item_ids[i].clone(), item_ids[j].clone());
                if !existing.contains(&pair) {
                    synthesized.push(pair);
                }
            }
        }
    }
    synthesized.sort();
    debug!(found = synthesized.len(), "computed transitive closure");
    synthesized
        .into_iter()
        .map(|(prerequisite, target)| SurmiseRelation::synthesized(prerequisite, target))
        .collect()
}

/// DFS coloring with an explicit worklist (not native recursion, per the
/// design note about pathological-depth graphs). Returns one cycle per
/// re-encountered gray vertex, each a path from the repeat back to itself.
pub fn detect_cycles(graph: &Graph) -> Vec<Vec<ItemId>> {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Color {
        White,
        Gray,
        Black,
    }

    let adjacency = Adjacency::build(graph);
    let mut item_ids: Vec<ItemId> = graph.items().iter().map(|i| i.id.clone()).collect();
    item_ids.sort();

    let mut color: HashMap<ItemId, Color> =
        item_ids.iter().map(|id| (id.clone(), Color::White)).collect();
    let mut cycles = Vec::new();

    // Each frame: the vertex, and an iterator position over its sorted successors.
    for start in &item_ids {
        if color[start] != Color::White {
            continue;
        }
        let mut path: Vec<ItemId> = Vec::new();
        let mut stack: Vec<(ItemId, Vec<ItemId>, usize)> = Vec::new();
        stack.push((start.clone(), adjacency.successors(start).iter().cloned().collect(), 0));
        color.insert(start.clone(), Color::Gray);
        path.push(start.clone());

        while let Some(top) = stack.len().checked_sub(1) {
            let pos = stack[top].2;
            if pos < stack[top].1.len() {
                let next = stack[top].1[pos].clone();
                stack[top].2 += 1;
                if next == stack[top].0 {
                    // Self-loop: treated as a warning elsewhere, never a cycle.
                    continue;
                }
                match color.get(&next).copied() {
                    Some(Color::Gray) => {
                        let cycle_start = path.iter().position(|v| v == &next).unwrap();
                        let mut cycle = path[cycle_start..].to_vec();
                        cycle.push(next);
                        cycles.push(cycle);
                    }
                    Some(Color::White) => {
                        color.insert(next.clone(), Color::Gray);
                        path.push(next.clone());
                        let next_succs: Vec<ItemId> = adjacency.successors(&next).iter().cloned().collect();
                        stack.push((next, next_succs, 0));
                    }
                    _ => {}
                }
            } else {
                let vertex = stack[top].0.clone();
                color.insert(vertex, Color::Black);
                path.pop();
                stack.pop();
            }
        }
    }

    cycles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;

    fn graph_from(items: &[&str], edges: &[(&str, &str)]) -> Graph {
        let doc = Document {
            items: items.iter().map(|id| serde_json::from_value(serde_json::json!({"id": id})).unwrap()).collect(),
            surmise_relations: edges
                .iter()
                .map(|(p, t)| crate::types::SurmiseRelation {
                    prerequisite: p.to_string(),
                    target: t.to_string(),
                    confidence: None,
                    rationale: None,
                    relation_type: None,
                    source: None,
                    extra: Default::default(),
                })
                .collect(),
            ..Default::default()
        };
        Graph::from_document(doc)
    }

    #[test]
    fn chain_closure_adds_transitive_edge() {
        let graph = graph_from(&["A", "B", "C"], &[("A", "B"), ("B", "C")]);
        let added = transitive_closure(&graph);
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].prerequisite, "A");
        assert_eq!(added[0].target, "C");
        assert_eq!(added[0].confidence, Some(1.0));
    }

    #[test]
    fn diamond_closure_adds_single_edge() {
        let graph = graph_from(&["A", "B", "C", "D"], &[("A", "B"), ("A", "C"), ("B", "D"), ("C", "D")]);
        let added = transitive_closure(&graph);
        assert_eq!(added.len(), 1);
        assert_eq!((added[0].prerequisite.as_str(), added[0].target.as_str()), ("A", "D"));
    }

    #[test]
    fn closure_is_idempotent() {
        let mut graph = graph_from(&["A", "B", "C"], &[("A", "B"), ("B", "C")]);
        let first = transitive_closure(&graph);
        graph.append_edges(first);
        let second = transitive_closure(&graph);
        assert!(second.is_empty());
    }

    #[test]
    fn detects_two_cycle() {
        let graph = graph_from(&["X", "Y"], &[("X", "Y"), ("Y", "X")]);
        let cycles = detect_cycles(&graph);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0], vec!["X".to_string(), "Y".to_string(), "X".to_string()]);
    }

    #[test]
    fn acyclic_graph_has_no_cycles() {
        let graph = graph_from(&["A", "B", "C"], &[("A", "B"), ("B", "C")]);
        assert!(detect_cycles(&graph).is_empty());
    }

    #[test]
    fn self_loop_is_not_a_cycle() {
        let graph = graph_from(&["A"], &[("A", "A")]);
        assert!(detect_cycles(&graph).is_empty());
    }
}
