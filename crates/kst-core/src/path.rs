//! C4: learning-path synthesis under pluggable scorers (§4.4, §9).

use std::collections::HashMap;

use crate::document::Graph;
use crate::downset::{KnowledgeStructure, StateSet};
use crate::index::ItemIndex;
use crate::types::ItemId;

/// Tag lookups keyed by item index, built once per synthesis run so scorers
/// don't each re-derive `items_by_id` (§9: no module-level caches).
pub struct PathContext<'a> {
    index: &'a ItemIndex,
    tags: Vec<Vec<String>>,
}

impl<'a> PathContext<'a> {
    pub fn build(graph: &Graph, index: &'a ItemIndex) -> Self {
        let by_id = graph.items_by_id();
        let tags = index
            .ids()
            .iter()
            .map(|id| by_id.get(id.as_str()).map(|item| item.tags.clone()).unwrap_or_default())
            .collect();
        Self { index, tags }
    }

    pub fn tags_of(&self, item: usize) -> &[String] {
        &self.tags[item]
    }

    pub fn index(&self) -> &ItemIndex {
        self.index
    }
}

/// The single capability additional scorers must provide (§9 plug-in point);
/// no other part of the synthesizer needs touching to add one.
pub trait PathScorer {
    fn name(&self) -> &'static str;
    fn score(&self, item: usize, state: &StateSet, path_prefix: &[usize], ctx: &PathContext, ks: &KnowledgeStructure) -> f64;
}

/// Count of items that become addable to `K ∪ {item}` but were not addable to `K`.
pub struct MaxUnlockScorer;

impl PathScorer for MaxUnlockScorer {
    fn name(&self) -> &'static str {
        "max-unlock"
    }

    fn score(&self, item: usize, state: &StateSet, _path_prefix: &[usize], _ctx: &PathContext, ks: &KnowledgeStructure) -> f64 {
        let before = ks.outer_fringe(state);
        let mut after_state = state.clone();
        after_state.insert(item);
        let after = ks.outer_fringe(&after_state);
        after.difference(&before).count() as f64
    }
}

/// Size of the tag intersection between `item` and the last item in the path
/// prefix; zero if the prefix is empty.
pub struct DepthFirstScorer;

impl PathScorer for DepthFirstScorer {
    fn name(&self) -> &'static str {
        "depth-first"
    }

    fn score(&self, item: usize, _state: &StateSet, path_prefix: &[usize], ctx: &PathContext, _ks: &KnowledgeStructure) -> f64 {
        match path_prefix.last() {
            None => 0.0,
            Some(&last) => {
                let item_tags: std::collections::HashSet<&String> = ctx.tags_of(item).iter().collect();
                let last_tags: std::collections::HashSet<&String> = ctx.tags_of(last).iter().collect();
                item_tags.intersection(&last_tags).count() as f64
            }
        }
    }
}

/// Negative mean frequency of `item`'s tags among the path prefix's tags;
/// favours under-represented tags. Zero if `item` is untagged.
pub struct BreadthFirstScorer;

impl PathScorer for BreadthFirstScorer {
    fn name(&self) -> &'static str {
        "breadth-first"
    }

    fn score(&self, item: usize, _state: &StateSet, path_prefix: &[usize], ctx: &PathContext, _ks: &KnowledgeStructure) -> f64 {
        let item_tags = ctx.tags_of(item);
        if item_tags.is_empty() {
            return 0.0;
        }
        let mut freq: HashMap<&str, usize> = HashMap::new();
        for &p in path_prefix {
            for tag in ctx.tags_of(p) {
                *freq.entry(tag.as_str()).or_insert(0) += 1;
            }
        }
        let mean: f64 = item_tags.iter().map(|t| *freq.get(t.as_str()).unwrap_or(&0) as f64).sum::<f64>()
            / item_tags.len() as f64;
        -mean
    }
}

/// A synthesized path (§4.4): a sequence of items whose prefixes are each
/// knowledge states. `full` is false when the structure is disconnected or
/// truncated and the synthesizer had to stop short of the universe.
#[derive(Debug, Clone)]
pub struct SynthesizedPath {
    pub strategy: &'static str,
    pub items: Vec<ItemId>,
    pub full: bool,
}

/// Greedily extends from ∅ by repeatedly taking the highest-scoring outer
/// fringe candidate, breaking ties by ascending item identifier (which is
/// ascending index, since indices follow sorted identifiers).
pub fn synthesize_path(ks: &KnowledgeStructure, ctx: &PathContext, scorer: &dyn PathScorer) -> SynthesizedPath {
    let mut state: StateSet = StateSet::new();
    let mut prefix: Vec<usize> = Vec::new();

    loop {
        let candidates = ks.outer_fringe(&state);
        if candidates.is_empty() {
            break;
        }
        let next = candidates
            .iter()
            .copied()
            .map(|item| (item, scorer.score(item, &state, &prefix, ctx, ks)))
            .fold(None::<(usize, f64)>, |best, (item, score)| match best {
                None => Some((item, score)),
                Some((best_item, best_score)) => {
                    if score > best_score || (score == best_score && item < best_item) {
                        Some((item, score))
                    } else {
                        Some((best_item, best_score))
                    }
                }
            })
            .map(|(item, _)| item)
            .expect("candidates is non-empty");
        state.insert(next);
        prefix.push(next);
    }

    SynthesizedPath {
        strategy: scorer.name(),
        items: ctx.index().to_ids(&prefix),
        full: state.len() == ks.index().len(),
    }
}

pub fn default_scorers() -> Vec<Box<dyn PathScorer>> {
    vec![Box::new(MaxUnlockScorer), Box::new(DepthFirstScorer), Box::new(BreadthFirstScorer)]
}

/// Builds up to `k` paths, one per configured strategy (default: the three
/// built-in scorers), per §4.4.
pub fn synthesize_all(graph: &Graph, ks: &KnowledgeStructure, k: usize) -> Vec<SynthesizedPath> {
    let ctx = PathContext::build(graph, ks.index());
    default_scorers().iter().take(k).map(|scorer| synthesize_path(ks, &ctx, scorer.as_ref())).collect()
}
