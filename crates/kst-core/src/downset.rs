//! C3: enumeration of the knowledge structure (the downset lattice over the
//! surmise relation) and fringe computation over it.

use std::cmp::Ordering;
use std::collections::{HashSet, VecDeque};

use tracing::{debug, warn};

use crate::document::Graph;
use crate::index::ItemIndex;
use crate::relation::Adjacency;
use crate::types::{ItemId, KnowledgeStateRecord};

/// A knowledge state, represented as the set of stable item indices it
/// contains (§9: bitset-style representation keyed on item index).
pub type StateSet = std::collections::BTreeSet<usize>;

/// Default ceiling on the number of enumerated states (§4.3).
pub const DEFAULT_MAX_STATES: usize = 10_000;

fn state_cmp(a: &StateSet, b: &StateSet) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// The enumerated knowledge structure for a graph: every downward-closed
/// state, sorted per §4.3, plus the adjacency it was derived from.
#[derive(Debug)]
pub struct KnowledgeStructure {
    index: ItemIndex,
    states: Vec<StateSet>,
    lookup: HashSet<StateSet>,
    truncated: bool,
}

impl KnowledgeStructure {
    pub fn build(graph: &Graph) -> Self {
        Self::build_with_ceiling(graph, DEFAULT_MAX_STATES)
    }

    /// Generation strategy per §4.3: start from ∅, repeatedly extend any
    /// known state by a single addable item, dedupe via the `lookup` set.
    /// Every discovered state is enqueued exactly once; the frontier order
    /// need not be strict BFS for correctness, only for determinism, which
    /// a `VecDeque` fed in ascending-item order already gives us.
    pub fn build_with_ceiling(graph: &Graph, max_states: usize) -> Self {
        let index = ItemIndex::build(graph);
        let adjacency = Adjacency::build(graph);
        // Self-loops are dropped here: enumeration proceeds "as if the
        // self-loop were absent" (§9 design note); a self-referencing
        // prereq would otherwise make the item permanently unaddable.
        let prereq_sets: Vec<StateSet> = (0..index.len())
            .map(|i| {
                adjacency
                    .prereqs(index.id_of(i))
                    .iter()
                    .filter_map(|id| index.index_of(id))
                    .filter(|&j| j != i)
                    .collect()
            })
            .collect();

        let mut lookup: HashSet<StateSet> = HashSet::new();
        let mut frontier: VecDeque<StateSet> = VecDeque::new();
        let empty: StateSet = StateSet::new();
        lookup.insert(empty.clone());
        frontier.push_back(empty);
        let mut truncated = false;

        while let Some(state) = frontier.pop_front() {
            for b in 0..index.len() {
                if state.contains(&b) {
                    continue;
                }
                if !prereq_sets[b].is_subset(&state) {
                    continue;
                }
                if lookup.len() >= max_states {
                    truncated = true;
                    continue;
                }
                let mut next = state.clone();
                next.insert(b);
                if lookup.insert(next.clone()) {
                    frontier.push_back(next);
                }
            }
        }

        if truncated {
            warn!(max_states, "downset enumeration truncated at max_states ceiling");
        }

        let mut states: Vec<StateSet> = lookup.iter().cloned().collect();
        states.sort_by(state_cmp);
        debug!(states = states.len(), items = index.len(), "enumerated knowledge structure");

        Self { index, states, lookup, truncated }
    }

    pub fn index(&self) -> &ItemIndex {
        &self.index
    }

    pub fn states(&self) -> &[StateSet] {
        &self.states
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn truncated(&self) -> bool {
        self.truncated
    }

    pub fn contains(&self, state: &StateSet) -> bool {
        self.lookup.contains(state)
    }

    /// Binary search relies on `states` being sorted by [`state_cmp`].
    pub fn position_of(&self, state: &StateSet) -> Option<usize> {
        self.states.binary_search_by(|probe| state_cmp(probe, state)).ok()
    }

    pub fn state_id(index: usize) -> String {
        format!("state-{index:04}")
    }

    pub fn full_state(&self) -> StateSet {
        (0..self.index.len()).collect()
    }

    /// {b ∈ K : K \ {b} is a knowledge state} (§3).
    pub fn inner_fringe(&self, state: &StateSet) -> StateSet {
        state
            .iter()
            .copied()
            .filter(|b| {
                let mut without = state.clone();
                without.remove(b);
                self.lookup.contains(&without)
            })
            .collect()
    }

    /// {b ∉ K : K ∪ {b} is a knowledge state} (§3).
    pub fn outer_fringe(&self, state: &StateSet) -> StateSet {
        (0..self.index.len())
            .filter(|b| !state.contains(b))
            .filter(|b| {
                let mut with = state.clone();
                with.insert(*b);
                self.lookup.contains(&with)
            })
            .collect()
    }

    pub fn state_ids(&self, state: &StateSet) -> Vec<ItemId> {
        self.index.to_ids(state)
    }

    /// Renders the enumerated states as document records (§6), ready for
    /// `Graph::attach_knowledge_states`.
    pub fn to_records(&self) -> Vec<KnowledgeStateRecord> {
        self.states
            .iter()
            .enumerate()
            .map(|(i, state)| {
                let mut items = self.state_ids(state);
                items.sort();
                let mut inner = self.state_ids(&self.inner_fringe(state));
                inner.sort();
                let mut outer = self.state_ids(&self.outer_fringe(state));
                outer.sort();
                KnowledgeStateRecord {
                    id: Self::state_id(i),
                    items,
                    inner_fringe: inner,
                    outer_fringe: outer,
                }
            })
            .collect()
    }
}
