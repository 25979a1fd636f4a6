//! C6: structural and pedagogical invariant checks (§4.6).

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::document::Graph;
use crate::relation::{detect_cycles, Adjacency};
use crate::types::ItemId;

const MAX_EXAMPLES: usize = 5;
const MAX_PREREQS_PER_ITEM: usize = 7;
const UNION_CLOSURE_SAMPLE_CEILING: usize = 500;

/// One check's outcome: a human-readable detail, the number of offending
/// instances, and a bounded sample of them for diagnostic brevity (§4.6).
#[derive(Debug, Clone)]
pub struct CheckMessage {
    pub name: String,
    pub detail: String,
    pub count: usize,
    pub examples: Vec<String>,
}

impl CheckMessage {
    fn new(name: &str, detail: impl Into<String>, count: usize, examples: Vec<String>) -> Self {
        let mut examples = examples;
        examples.truncate(MAX_EXAMPLES);
        Self { name: name.to_string(), detail: detail.into(), count, examples }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub fail: Vec<CheckMessage>,
    pub warn: Vec<CheckMessage>,
    pub pass: Vec<CheckMessage>,
}

impl ValidationReport {
    pub fn is_success(&self) -> bool {
        self.fail.is_empty()
    }

    fn fail(&mut self, name: &str, detail: impl Into<String>, count: usize, examples: Vec<String>) {
        self.fail.push(CheckMessage::new(name, detail, count, examples));
    }

    fn warn(&mut self, name: &str, detail: impl Into<String>, count: usize, examples: Vec<String>) {
        self.warn.push(CheckMessage::new(name, detail, count, examples));
    }

    fn pass(&mut self, name: &str, detail: impl Into<String>) {
        self.pass.push(CheckMessage::new(name, detail, 0, Vec::new()));
    }
}

/// Runs every check in §4.6's table and assembles the three buckets.
pub fn validate(graph: &Graph) -> ValidationReport {
    let mut report = ValidationReport::default();

    check_referential_integrity(graph, &mut report);
    check_duplicate_edges(graph, &mut report);
    check_unique_item_ids(graph, &mut report);
    check_acyclicity(graph, &mut report);
    check_transitive_closure_completeness(graph, &mut report);
    check_self_loops(graph, &mut report);
    check_prereq_fanout(graph, &mut report);
    check_orphan_items(graph, &mut report);
    check_bloom_inversion(graph, &mut report);
    check_attached_states(graph, &mut report);

    debug!(fail = report.fail.len(), warn = report.warn.len(), pass = report.pass.len(), "validation complete");
    report
}

fn check_referential_integrity(graph: &Graph, report: &mut ValidationReport) {
    let ids: HashSet<&str> = graph.items().iter().map(|i| i.id.as_str()).collect();
    let mut offenders = Vec::new();
    for edge in graph.edges() {
        if !ids.contains(edge.prerequisite.as_str()) {
            offenders.push(format!("{} (prerequisite)", edge.prerequisite));
        }
        if !ids.contains(edge.target.as_str()) {
            offenders.push(format!("{} (target)", edge.target));
        }
    }
    if offenders.is_empty() {
        report.pass("referential-integrity", "every edge endpoint is a known item");
    } else {
        let count = offenders.len();
        report.fail("referential-integrity", format!("{count} edge endpoint(s) reference unknown items"), count, offenders);
    }
}

fn check_duplicate_edges(graph: &Graph, report: &mut ValidationReport) {
    let mut seen: HashSet<(&str, &str)> = HashSet::new();
    let mut duplicates = Vec::new();
    for edge in graph.edges() {
        if !seen.insert(edge.key()) {
            duplicates.push(format!("{}->{}", edge.prerequisite, edge.target));
        }
    }
    if duplicates.is_empty() {
        report.pass("duplicate-edges", "no duplicate surmise relations");
    } else {
        let count = duplicates.len();
        report.fail("duplicate-edges", format!("{count} duplicate surmise relation(s)"), count, duplicates);
    }
}

fn check_unique_item_ids(graph: &Graph, report: &mut ValidationReport) {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut duplicates = Vec::new();
    for item in graph.items() {
        if !seen.insert(item.id.as_str()) {
            duplicates.push(item.id.clone());
        }
    }
    if duplicates.is_empty() {
        report.pass("unique-item-ids", "all item identifiers are unique");
    } else {
        let count = duplicates.len();
        report.fail("unique-item-ids", format!("{count} duplicate item id(s)"), count, duplicates);
    }
}

fn check_acyclicity(graph: &Graph, report: &mut ValidationReport) {
    let cycles = detect_cycles(graph);
    if cycles.is_empty() {
        report.pass("acyclicity", "no directed cycles");
    } else {
        let count = cycles.len();
        let examples = cycles.iter().map(|c| c.join(" -> ")).collect();
        report.fail("acyclicity", format!("{count} directed cycle(s) found"), count, examples);
    }
}

fn check_transitive_closure_completeness(graph: &Graph, report: &mut ValidationReport) {
    let missing = crate::relation::transitive_closure(graph);
    if missing.is_empty() {
        report.pass("transitive-closure-completeness", "transitive closure is already explicit");
    } else {
        let count = missing.len();
        let examples = missing.iter().map(|e| format!("{}->{}", e.prerequisite, e.target)).collect();
        report.warn("transitive-closure-completeness", format!("{count} implied edge(s) not explicitly present"), count, examples);
    }
}

fn check_self_loops(graph: &Graph, report: &mut ValidationReport) {
    let loops: Vec<String> = graph.edges().iter().filter(|e| e.prerequisite == e.target).map(|e| e.prerequisite.clone()).collect();
    if loops.is_empty() {
        report.pass("self-loops", "no self-loops");
    } else {
        let count = loops.len();
        report.warn("self-loops", format!("{count} self-loop(s)"), count, loops);
    }
}

fn check_prereq_fanout(graph: &Graph, report: &mut ValidationReport) {
    let adjacency = Adjacency::build(graph);
    let mut offenders = Vec::new();
    for item in graph.items() {
        let count = adjacency.prereqs(&item.id).len();
        if count > MAX_PREREQS_PER_ITEM {
            offenders.push(format!("{} ({count} prerequisites)", item.id));
        }
    }
    if offenders.is_empty() {
        report.pass("prereq-fanout", format!("no item exceeds {MAX_PREREQS_PER_ITEM} direct prerequisites"));
    } else {
        let count = offenders.len();
        report.warn("prereq-fanout", format!("{count} item(s) exceed {MAX_PREREQS_PER_ITEM} direct prerequisites"), count, offenders);
    }
}

fn check_orphan_items(graph: &Graph, report: &mut ValidationReport) {
    if graph.items().len() < 2 {
        return;
    }
    let adjacency = Adjacency::build(graph);
    let orphans: Vec<String> = graph
        .items()
        .iter()
        .filter(|item| adjacency.prereqs(&item.id).is_empty() && adjacency.successors(&item.id).is_empty())
        .map(|item| item.id.clone())
        .collect();
    if orphans.is_empty() {
        report.pass("orphan-items", "every item has at least one incident edge");
    } else {
        let count = orphans.len();
        report.warn("orphan-items", format!("{count} orphan item(s) with no incident edges"), count, orphans);
    }
}

fn check_bloom_inversion(graph: &Graph, report: &mut ValidationReport) {
    let levels: HashMap<&str, crate::types::BloomLevel> =
        graph.items().iter().filter_map(|item| item.bloom_level().map(|l| (item.id.as_str(), l))).collect();
    let mut offenders = Vec::new();
    for edge in graph.edges() {
        if let (Some(&prereq_level), Some(&target_level)) = (levels.get(edge.prerequisite.as_str()), levels.get(edge.target.as_str())) {
            if prereq_level > target_level {
                offenders.push(format!("{}({prereq_level})->{}({target_level})", edge.prerequisite, edge.target));
            }
        }
    }
    if offenders.is_empty() {
        report.pass("bloom-inversion", "no prerequisite exceeds its target's Bloom level");
    } else {
        let count = offenders.len();
        report.warn("bloom-inversion", format!("{count} edge(s) invert Bloom level ordering"), count, offenders);
    }
}

fn check_attached_states(graph: &Graph, report: &mut ValidationReport) {
    let records = graph.knowledge_states();
    if records.is_empty() {
        return;
    }

    let has_empty = records.iter().any(|r| r.items.is_empty());
    if has_empty {
        report.pass("attached-states-empty-set", "the empty set is present among attached states");
    } else {
        report.warn("attached-states-empty-set", "the empty set is not present among attached states", 1, Vec::new());
    }

    let item_count = graph.items().len();
    let has_full = records.iter().any(|r| r.items.len() == item_count);
    if has_full {
        report.pass("attached-states-full-set", "the full item set is present among attached states");
    } else {
        report.warn("attached-states-full-set", "the full item set is not present among attached states", 1, Vec::new());
    }

    if records.len() <= UNION_CLOSURE_SAMPLE_CEILING {
        let as_sets: Vec<(String, HashSet<&ItemId>)> =
            records.iter().map(|r| (r.id.clone(), r.items.iter().collect())).collect();
        let mut violations = Vec::new();
        'outer: for (ai, a) in as_sets.iter().enumerate() {
            for b in as_sets.iter().skip(ai + 1) {
                let union: HashSet<&&ItemId> = a.1.union(&b.1).collect();
                let found = as_sets.iter().any(|(_, s)| s.len() == union.len() && union.iter().all(|item| s.contains(**item)));
                if !found {
                    violations.push(format!("{} ∪ {}", a.0, b.0));
                    if violations.len() >= MAX_EXAMPLES {
                        break 'outer;
                    }
                }
            }
        }
        if violations.is_empty() {
            report.pass("attached-states-union-closure", "sampled union closure holds");
        } else {
            let count = violations.len();
            report.fail("attached-states-union-closure", format!("{count} union(s) missing from attached states"), count, violations);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::types::SurmiseRelation;

    fn edge(p: &str, t: &str) -> SurmiseRelation {
        SurmiseRelation { prerequisite: p.into(), target: t.into(), confidence: None, rationale: None, relation_type: None, source: None, extra: Default::default() }
    }

    #[test]
    fn cyclic_graph_fails_acyclicity() {
        let doc: Document = serde_json::from_value(serde_json::json!({
            "items": [{"id": "X"}, {"id": "Y"}],
            "surmise_relations": [{"prerequisite": "X", "target": "Y"}, {"prerequisite": "Y", "target": "X"}],
        }))
        .unwrap();
        let graph = Graph::from_document(doc);
        let report = validate(&graph);
        assert!(!report.is_success());
        assert!(report.fail.iter().any(|m| m.name == "acyclicity"));
    }

    #[test]
    fn referential_integrity_fails_on_unknown_endpoint() {
        let doc = Document {
            items: vec![serde_json::from_value(serde_json::json!({"id": "A"})).unwrap()],
            surmise_relations: vec![edge("A", "Ghost")],
            ..Default::default()
        };
        let graph = Graph::from_document(doc);
        let report = validate(&graph);
        assert!(report.fail.iter().any(|m| m.name == "referential-integrity"));
    }

    #[test]
    fn self_loop_is_warning_not_failure() {
        let doc: Document = serde_json::from_value(serde_json::json!({
            "items": [{"id": "A"}],
            "surmise_relations": [{"prerequisite": "A", "target": "A"}],
        }))
        .unwrap();
        let graph = Graph::from_document(doc);
        let report = validate(&graph);
        assert!(report.is_success());
        assert!(report.warn.iter().any(|m| m.name == "self-loops"));
    }

    #[test]
    fn clean_chain_graph_passes() {
        let doc: Document = serde_json::from_value(serde_json::json!({
            "items": [{"id": "A"}, {"id": "B"}, {"id": "C"}],
            "surmise_relations": [
                {"prerequisite": "A", "target": "B"},
                {"prerequisite": "B", "target": "C"},
                {"prerequisite": "A", "target": "C"},
            ],
        }))
        .unwrap();
        let graph = Graph::from_document(doc);
        let report = validate(&graph);
        assert!(report.is_success());
        assert!(report.warn.is_empty());
    }
}
