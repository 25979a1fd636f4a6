//! Stable item<->index mapping shared by C3-C5: every knowledge state is
//! represented as a `BTreeSet<usize>` of indices into this mapping (§9's
//! "bitset keyed on item index" recommendation, using a sorted set instead
//! of a raw bitmask so the item-count ceiling stays unbounded).

use std::collections::HashMap;

use crate::document::Graph;
use crate::types::ItemId;

#[derive(Debug, Clone, Default)]
pub struct ItemIndex {
    ids: Vec<ItemId>,
    position: HashMap<ItemId, usize>,
}

impl ItemIndex {
    /// Indices are assigned by sorted item identifier, matching the
    /// ordering the downset engine and CLI output both rely on.
    pub fn build(graph: &Graph) -> Self {
        let mut ids: Vec<ItemId> = graph.items().iter().map(|item| item.id.clone()).collect();
        ids.sort();
        ids.dedup();
        let position = ids.iter().cloned().enumerate().map(|(i, id)| (id, i)).collect();
        Self { ids, position }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.position.get(id).copied()
    }

    pub fn id_of(&self, index: usize) -> &ItemId {
        &self.ids[index]
    }

    pub fn ids(&self) -> &[ItemId] {
        &self.ids
    }

    pub fn to_ids<'a>(&self, indices: impl IntoIterator<Item = &'a usize>) -> Vec<ItemId> {
        indices.into_iter().map(|&i| self.ids[i].clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;

    #[test]
    fn indexes_by_sorted_identifier() {
        let doc: Document = serde_json::from_value(serde_json::json!({
            "items": [{"id": "C"}, {"id": "A"}, {"id": "B"}],
        }))
        .unwrap();
        let graph = Graph::from_document(doc);
        let index = ItemIndex::build(&graph);
        assert_eq!(index.ids(), &["A".to_string(), "B".to_string(), "C".to_string()]);
        assert_eq!(index.index_of("B"), Some(1));
        assert_eq!(index.id_of(2), "C");
    }
}
