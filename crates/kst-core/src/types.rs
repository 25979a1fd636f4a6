use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

pub type ItemId = String;

/// Six-level cognitive-complexity taxonomy used for pedagogical sanity checks.
/// Ordering follows `remember < understand < apply < analyze < evaluate < create`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BloomLevel {
    Remember,
    Understand,
    Apply,
    Analyze,
    Evaluate,
    Create,
}

impl FromStr for BloomLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "remember" => Ok(Self::Remember),
            "understand" => Ok(Self::Understand),
            "apply" => Ok(Self::Apply),
            "analyze" => Ok(Self::Analyze),
            "evaluate" => Ok(Self::Evaluate),
            "create" => Ok(Self::Create),
            other => Err(format!("unknown bloom level: {other}")),
        }
    }
}

impl fmt::Display for BloomLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Remember => "remember",
            Self::Understand => "understand",
            Self::Apply => "apply",
            Self::Analyze => "analyze",
            Self::Evaluate => "evaluate",
            Self::Create => "create",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub bloom_level: Option<String>,
    /// Fields the document carries that the core does not interpret; preserved on round-trip.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Item {
    pub fn bloom_level(&self) -> Option<BloomLevel> {
        self.bloom_level.as_deref().and_then(|s| s.parse().ok())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurmiseRelation {
    pub prerequisite: ItemId,
    pub target: ItemId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SurmiseRelation {
    pub fn key(&self) -> (&str, &str) {
        (self.prerequisite.as_str(), self.target.as_str())
    }

    /// A synthesized edge produced by transitive closure (§4.2).
    pub fn synthesized(prerequisite: ItemId, target: ItemId) -> Self {
        Self {
            prerequisite,
            target,
            confidence: Some(1.0),
            rationale: Some("Transitive closure".to_string()),
            relation_type: Some("prerequisite-of".to_string()),
            source: Some("transitive-closure".to_string()),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeStateRecord {
    pub id: String,
    pub items: Vec<ItemId>,
    #[serde(default)]
    pub inner_fringe: Vec<ItemId>,
    #[serde(default)]
    pub outer_fringe: Vec<ItemId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentSnapshot {
    #[serde(default)]
    pub current_state: Vec<ItemId>,
    #[serde(default)]
    pub outer_fringe: Vec<ItemId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub domain_name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
