//! C7: per-item mastery/fringe statistics and Jaccard clustering over
//! attached student snapshots (§4.7).

use std::collections::{HashMap, HashSet};

use tracing::info;

use crate::document::Graph;
use crate::relation::Adjacency;
use crate::types::ItemId;

const CLUSTER_JACCARD_THRESHOLD: f64 = 0.6;

#[derive(Debug, Clone)]
pub struct AnalyticsReport {
    pub student_count: usize,
    pub mastery_rates: HashMap<ItemId, f64>,
    pub outer_fringe_freq: HashMap<ItemId, usize>,
    pub leverage: HashMap<ItemId, usize>,
    pub target_score: HashMap<ItemId, f64>,
    /// Student identifiers per cluster, in founder-then-absorption order.
    pub clusters: Vec<Vec<String>>,
}

/// §7 item 5: analytics on a graph with no student snapshots is a
/// structured "no data" result, not an exception.
#[derive(Debug, Clone)]
pub enum AnalyticsResult {
    Data(AnalyticsReport),
    NoData,
}

fn jaccard(a: &HashSet<&ItemId>, b: &HashSet<&ItemId>) -> f64 {
    let intersection = a.intersection(b).count();
    if intersection == 0 && a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let union = a.union(b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Greedy single-pass partition by input order: each unassigned student
/// founds a cluster and absorbs every later unassigned student whose
/// mastery set exceeds the Jaccard threshold against the founder (§4.7).
fn cluster_students(mastery_sets: &[(String, HashSet<&ItemId>)]) -> Vec<Vec<String>> {
    let mut assigned = vec![false; mastery_sets.len()];
    let mut clusters = Vec::new();
    for i in 0..mastery_sets.len() {
        if assigned[i] {
            continue;
        }
        assigned[i] = true;
        let mut cluster = vec![mastery_sets[i].0.clone()];
        for j in (i + 1)..mastery_sets.len() {
            if assigned[j] {
                continue;
            }
            if jaccard(&mastery_sets[i].1, &mastery_sets[j].1) >= CLUSTER_JACCARD_THRESHOLD {
                assigned[j] = true;
                cluster.push(mastery_sets[j].0.clone());
            }
        }
        clusters.push(cluster);
    }
    clusters
}

pub fn aggregate(graph: &Graph) -> AnalyticsResult {
    let students = graph.student_states();
    if students.is_empty() {
        return AnalyticsResult::NoData;
    }

    let n = students.len() as f64;
    let adjacency = Adjacency::build(graph);
    let item_count = graph.items().len();

    let mut mastery_rates = HashMap::new();
    let mut outer_fringe_freq = HashMap::new();
    let mut leverage = HashMap::new();
    let mut target_score = HashMap::new();

    for item in graph.items() {
        let mastered_count = students.values().filter(|s| s.current_state.iter().any(|id| id == &item.id)).count();
        let rate = mastered_count as f64 / n;
        mastery_rates.insert(item.id.clone(), rate);

        let fringe_count = students.values().filter(|s| s.outer_fringe.iter().any(|id| id == &item.id)).count();
        outer_fringe_freq.insert(item.id.clone(), fringe_count);

        let out_degree = adjacency.successors(&item.id).len();
        leverage.insert(item.id.clone(), out_degree);

        let score = (fringe_count as f64 / n) * (1.0 + out_degree as f64 / item_count as f64) * (1.0 - rate);
        target_score.insert(item.id.clone(), score);
    }

    let mastery_sets: Vec<(String, HashSet<&ItemId>)> =
        students.iter().map(|(student, snapshot)| (student.clone(), snapshot.current_state.iter().collect())).collect();
    let clusters = cluster_students(&mastery_sets);

    info!(students = students.len(), clusters = clusters.len(), "analytics aggregation complete");

    AnalyticsResult::Data(AnalyticsReport {
        student_count: students.len(),
        mastery_rates,
        outer_fringe_freq,
        leverage,
        target_score,
        clusters,
    })
}

impl AnalyticsReport {
    /// Items ranked by `target_score` descending, ties broken by ascending
    /// identifier, for the CLI's "top-10 target items" view (§6).
    pub fn top_targets(&self, n: usize) -> Vec<(ItemId, f64)> {
        let mut scored: Vec<(ItemId, f64)> = self.target_score.iter().map(|(id, &s)| (id.clone(), s)).collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap().then_with(|| a.0.cmp(&b.0)));
        scored.truncate(n);
        scored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;

    fn diamond_with_students() -> Graph {
        let doc: Document = serde_json::from_value(serde_json::json!({
            "items": [{"id": "A"}, {"id": "B"}, {"id": "C"}, {"id": "D"}],
            "surmise_relations": [
                {"prerequisite": "A", "target": "B"},
                {"prerequisite": "A", "target": "C"},
                {"prerequisite": "B", "target": "D"},
                {"prerequisite": "C", "target": "D"},
            ],
            "student_states": {
                "s1": {"current_state": ["A", "B"], "outer_fringe": ["C", "D"]},
                "s2": {"current_state": ["A", "C"], "outer_fringe": ["B", "D"]},
            },
        }))
        .unwrap();
        Graph::from_document(doc)
    }

    #[test]
    fn two_dissimilar_students_form_two_clusters() {
        let graph = diamond_with_students();
        match aggregate(&graph) {
            AnalyticsResult::Data(report) => {
                assert_eq!(report.clusters.len(), 2);
                assert_eq!(*report.mastery_rates.get("A").unwrap(), 1.0);
                assert_eq!(*report.mastery_rates.get("D").unwrap(), 0.0);
            }
            AnalyticsResult::NoData => panic!("expected data"),
        }
    }

    #[test]
    fn no_students_yields_no_data() {
        let doc: Document = serde_json::from_value(serde_json::json!({
            "items": [{"id": "A"}],
            "surmise_relations": [],
        }))
        .unwrap();
        let graph = Graph::from_document(doc);
        assert!(matches!(aggregate(&graph), AnalyticsResult::NoData));
    }

    #[test]
    fn d_has_the_highest_target_score() {
        let graph = diamond_with_students();
        match aggregate(&graph) {
            AnalyticsResult::Data(report) => {
                let top = report.top_targets(1);
                assert_eq!(top[0].0, "D");
            }
            AnalyticsResult::NoData => panic!("expected data"),
        }
    }
}
