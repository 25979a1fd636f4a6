use thiserror::Error;

#[derive(Error, Debug)]
pub enum KstError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("document parse error in {path}: {source}")]
    DocumentParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("missing required field '{field}' in document")]
    MissingField { field: String },

    #[error("unknown item identifier: {0}")]
    UnknownItem(String),

    #[error("duplicate surmise relation: {prerequisite} -> {target}")]
    DuplicateRelation { prerequisite: String, target: String },

    #[error("invalid BLIM parameter '{name}': {value} is outside [0, 1]")]
    InvalidParameter { name: String, value: f64 },

    #[error("prior distribution over {state_count} states does not sum to 1 (got {sum})")]
    InvalidPrior { state_count: usize, sum: f64 },
}

pub type Result<T> = std::result::Result<T, KstError>;
