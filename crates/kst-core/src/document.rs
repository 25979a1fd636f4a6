use std::io::Write;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{KstError, Result};
use crate::types::{Item, ItemId, KnowledgeStateRecord, Metadata, StudentSnapshot, SurmiseRelation};

/// The on-disk schema (§6). Unknown top-level fields round-trip via `extra`.
///
/// `student_states` is an [`IndexMap`] rather than a `HashMap`: C7's clustering
/// scans students "in input order", which only a map that preserves insertion
/// order can give deterministically.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default)]
    pub surmise_relations: Vec<SurmiseRelation>,
    #[serde(default)]
    pub knowledge_states: Vec<KnowledgeStateRecord>,
    #[serde(default)]
    pub student_states: IndexMap<String, StudentSnapshot>,
    #[serde(default)]
    pub competences: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Document {
    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self> {
        serde_json::from_reader(reader).map_err(|source| KstError::DocumentParse {
            path: "<reader>".to_string(),
            source,
        })
    }
}

/// C1: the in-memory substrate every other component reads from.
///
/// Construction performs no invariant checking beyond parseability; all
/// semantic checks live in the validator (C6).
#[derive(Debug, Clone)]
pub struct Graph {
    document: Document,
}

impl Graph {
    pub fn from_document(document: Document) -> Self {
        Self { document }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let document: Document =
            serde_json::from_slice(&bytes).map_err(|source| KstError::DocumentParse {
                path: path.display().to_string(),
                source,
            })?;
        debug!(items = document.items.len(), relations = document.surmise_relations.len(), "loaded graph document");
        Ok(Self { document })
    }

    /// Atomic write: serialize to a temp file in the same directory, then rename.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        let json = serde_json::to_string_pretty(&self.document)
            .map_err(|source| KstError::DocumentParse { path: path.display().to_string(), source })?;
        tmp.write_all(json.as_bytes())?;
        tmp.persist(path).map_err(|e| KstError::Io(e.error))?;
        Ok(())
    }

    pub fn items(&self) -> &[Item] {
        &self.document.items
    }

    pub fn edges(&self) -> &[SurmiseRelation] {
        &self.document.surmise_relations
    }

    pub fn metadata(&self) -> &Metadata {
        &self.document.metadata
    }

    pub fn knowledge_states(&self) -> &[KnowledgeStateRecord] {
        &self.document.knowledge_states
    }

    pub fn student_states(&self) -> &IndexMap<String, StudentSnapshot> {
        &self.document.student_states
    }

    pub fn competences(&self) -> &[Value] {
        &self.document.competences
    }

    pub fn items_by_id(&self) -> std::collections::HashMap<&str, &Item> {
        self.document.items.iter().map(|item| (item.id.as_str(), item)).collect()
    }

    /// Appends edges, suppressing duplicates already present (by `(prerequisite, target)`).
    /// Returns the number of edges actually appended.
    pub fn append_edges(&mut self, edges: Vec<SurmiseRelation>) -> usize {
        let mut existing: std::collections::HashSet<(String, String)> = self
            .document
            .surmise_relations
            .iter()
            .map(|r| (r.prerequisite.clone(), r.target.clone()))
            .collect();
        let mut appended = 0;
        for edge in edges {
            let key = (edge.prerequisite.clone(), edge.target.clone());
            if existing.insert(key) {
                self.document.surmise_relations.push(edge);
                appended += 1;
            }
        }
        appended
    }

    pub fn attach_knowledge_states(&mut self, states: Vec<KnowledgeStateRecord>) {
        self.document.knowledge_states = states;
    }

    pub fn into_document(self) -> Document {
        self.document
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_document() -> Document {
        let json = serde_json::json!({
            "metadata": {"domain_name": "test", "version": "1"},
            "items": [{"id": "A"}, {"id": "B"}],
            "surmise_relations": [{"prerequisite": "A", "target": "B"}],
        });
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn round_trips_unknown_fields() {
        let json = serde_json::json!({
            "metadata": {"domain_name": "test", "version": "1", "custom": "keep-me"},
            "items": [{"id": "A", "custom_attr": 7}],
            "surmise_relations": [],
        });
        let doc: Document = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(doc.metadata.extra.get("custom").unwrap(), "keep-me");
        assert_eq!(doc.items[0].extra.get("custom_attr").unwrap(), 7);
        let round_tripped = serde_json::to_value(&doc).unwrap();
        assert_eq!(round_tripped["metadata"]["custom"], "keep-me");
    }

    #[test]
    fn append_edges_suppresses_duplicates() {
        let mut graph = Graph::from_document(sample_document());
        let appended = graph.append_edges(vec![
            SurmiseRelation::synthesized("A".into(), "B".into()),
            SurmiseRelation::synthesized("A".into(), "C".into()),
        ]);
        assert_eq!(appended, 1);
        assert_eq!(graph.edges().len(), 2);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");
        let graph = Graph::from_document(sample_document());
        graph.save(&path).unwrap();
        let reloaded = Graph::load(&path).unwrap();
        assert_eq!(reloaded.items().len(), 2);
    }
}
