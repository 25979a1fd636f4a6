//! Knowledge Space Theory algebraic kernel.
//!
//! `document`/`types` (C1) hold the graph substrate; `relation` (C2) is pure
//! adjacency/closure/cycle algebra over it; `downset` (C3) enumerates the
//! knowledge structure and its fringes; `path` (C4) synthesizes learning
//! paths; `blim` (C5) is the Bayesian inference loop; `validator` (C6) and
//! `analytics` (C7) compose the above into invariant checks and class-wide
//! aggregates.

pub mod analytics;
pub mod blim;
pub mod document;
pub mod downset;
pub mod error;
pub mod index;
pub mod path;
pub mod relation;
pub mod types;
pub mod validator;

pub use analytics::{AnalyticsReport, AnalyticsResult};
pub use blim::{AssessmentSession, BlimParams, Posterior, Response, UpdateOutcome};
pub use document::{Document, Graph};
pub use downset::{KnowledgeStructure, StateSet, DEFAULT_MAX_STATES};
pub use error::{KstError, Result};
pub use index::ItemIndex;
pub use path::{PathContext, PathScorer, SynthesizedPath};
pub use relation::{detect_cycles, transitive_closure, Adjacency};
pub use types::{BloomLevel, Item, ItemId, KnowledgeStateRecord, Metadata, StudentSnapshot, SurmiseRelation};
pub use validator::{CheckMessage, ValidationReport};
