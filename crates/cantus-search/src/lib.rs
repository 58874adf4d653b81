//! Image and melody retrieval for cantus.
//!
//! Image queries are answered by a PCA embedding searched by Euclidean
//! distance; melody queries by weighted cosine similarity of per-window
//! interval histograms. [`fusion`] merges both through the session mapper
//! and [`query`] runs a whole session query end to end.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod audio_retriever;
pub mod error;
pub mod fusion;
pub mod image_retriever;
pub mod pca;
pub mod query;
pub mod similarity;

pub use audio_retriever::{AudioMatch, AudioRanking, AudioRetriever};
pub use error::{PcaError, Result, SearchError};
pub use fusion::ResultFusion;
pub use image_retriever::{ImageMatch, ImageRetriever};
pub use pca::{PcaEngine, PcaModel};
pub use query::{run_query, QueryOptions, QueryOutcome};
pub use similarity::cosine_similarity;
