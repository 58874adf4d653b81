//! Core domain model for cantus.
//!
//! This crate defines the melody, histogram and fingerprint types shared by
//! the ingestion and retrieval crates, the feature matrix used for image
//! embedding, the audio/image cross-reference mapper, the on-disk session
//! layout, and the bounded worker pool that batch work fans out on.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod error;
pub mod model;
pub mod pool;
pub mod session;
pub mod store;

pub use error::{Error, Result};
pub use pool::{ItemFailure, WorkerPool};
pub use session::{SessionId, SessionLayout};
