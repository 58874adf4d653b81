//! Error types for retrieval.

use thiserror::Error;

/// Errors raised while fitting or applying a principal component basis.
#[derive(Debug, Error)]
pub enum PcaError {
    /// The requested component count does not fit the matrix.
    #[error("cannot extract {requested} components from a {rows}x{cols} matrix")]
    DimensionMismatch {
        requested: usize,
        rows: usize,
        cols: usize,
    },

    /// Every column of the matrix is constant.
    #[error("matrix has zero variance in every column")]
    DegenerateInput,

    /// A vector to project has the wrong number of features.
    #[error("expected {expected} features, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// The small dense SVD did not converge.
    #[error("singular value decomposition did not converge")]
    NoConvergence,
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("PCA error: {0}")]
    Pca(#[from] PcaError),

    /// Neither a query image nor a query melody was supplied.
    #[error("query is empty")]
    EmptyQuery,

    /// The session has not been ingested yet.
    #[error("feature store {} not found; run ingestion first", .0.display())]
    MissingFeatures(std::path::PathBuf),

    /// A melody produced no windows to compare.
    #[error("{0}: melody has no windows")]
    EmptyFingerprint(String),

    #[error(transparent)]
    Ingest(#[from] cantus_etl::IngestError),

    #[error(transparent)]
    Core(#[from] cantus_core::Error),
}

pub type PcaResult<T> = std::result::Result<T, PcaError>;
pub type Result<T> = std::result::Result<T, SearchError>;
