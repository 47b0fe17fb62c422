//! Error types for drcal-core.

use crate::hit::HitSchema;
use thiserror::Error;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types.
#[derive(Error, Debug)]
pub enum Error {
    /// A hit's optical payload does not match the collection schema.
    #[error("optical schema mismatch at record {index}: collection is {expected}, hit is {found}")]
    SchemaMismatch {
        expected: HitSchema,
        found: HitSchema,
        index: usize,
    },
}
