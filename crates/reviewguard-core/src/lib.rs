//! ReviewGuard Core
//!
//! Core types and utilities shared across ReviewGuard components.
//!
//! This crate provides:
//! - The review input and verdict types exchanged with callers
//! - The error taxonomy surfaced by the classification engine
//! - Ensemble member identifiers

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{BatchSummary, ClassificationResult, ModelKind, RawReview};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::types::{ClassificationResult, ModelKind, RawReview};
}
